//! Aggregation pipeline, snapshot writers and the polling snapshot server

pub mod merge;
pub mod pipeline;
pub mod server;
pub mod writers;

pub use merge::{merge_tables, validate_required};
pub use pipeline::Aggregator;
pub use writers::{FileSystemWriter, ObjectStoreWriter, SnapshotCache, SnapshotWriter};
