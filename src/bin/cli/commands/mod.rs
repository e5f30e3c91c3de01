pub mod ask;
pub mod clear;
pub mod ingest;
pub mod search;
pub mod stats;
