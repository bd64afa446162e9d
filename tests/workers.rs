#[path = "helpers.rs"]
mod helpers;

mod embed_all;
