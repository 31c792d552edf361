//! Data models shared between ingestion and search

mod paper;

pub use paper::{Paper, PaperId};
