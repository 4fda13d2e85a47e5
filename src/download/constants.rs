//! Constants for the download module (timeouts, concurrency, naming).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default total per-request timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of concurrent downloads.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Minimum allowed concurrency.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency.
pub const MAX_CONCURRENCY: usize = 100;

/// Longest basename we write, leaving room for the `.` + `.part` wrapper
/// under the common 255-byte limit.
pub const MAX_FILENAME_BYTES: usize = 240;

/// Suffix of in-progress download files.
pub const PART_SUFFIX: &str = ".part";

/// Reason recorded for tasks that never started because the phase stopped.
pub const ABORTED_REASON: &str = "aborted";

/// Reason recorded for tasks whose download future panicked or was lost.
pub const INTERNAL_ERROR_REASON: &str = "internal error";
