pub mod dashboard;
pub mod ingest;
