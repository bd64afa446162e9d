#[path = "helpers.rs"]
mod helpers;

mod eras;
mod faces;

mod embeddings;
