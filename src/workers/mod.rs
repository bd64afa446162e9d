pub mod embed_all;
pub mod era_compute;
pub mod faces_all;
pub mod reconcile_all;
