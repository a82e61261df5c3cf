pub mod engine;
pub mod ingest;
pub mod types;
