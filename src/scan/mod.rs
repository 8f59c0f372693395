//! Label ingestion, dedup, the worker pool, resume, and output sink.
pub mod labels;
pub mod pipeline;
pub mod record;
pub mod resume;
pub mod sink;

pub use pipeline::{run_scan, ScanConfig};
pub use record::{ScanResult, Status};
pub use sink::OutputSink;
