//! Download engine for streaming discovered files to disk.
//!
//! # Features
//!
//! - Deterministic URL-to-filename mapping with collision suffixes
//! - Existence filter against a one-shot directory snapshot
//! - Bounded-concurrency streaming downloads (30s connect, 5min total by default)
//! - Temporary `.part` files renamed into place only when complete
//! - Exactly one retry pass, after the first pass has finished
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use webdl_core::download::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::default();
//! let url = url::Url::parse("https://example.com/paper.pdf")?;
//! let bytes = client.fetch_to_file(&url, Path::new("./downloads"), "paper.pdf").await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod filename;
mod filter;
mod retry;
mod scheduler;
mod task;

pub use client::{ClientOptions, FileFetcher, HttpClient, part_path};
pub use constants::{DEFAULT_CONCURRENCY, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use engine::{DownloadEngine, EngineError};
pub use error::{DownloadError, FilesystemError};
pub use filename::{assign_filenames, derive_filename};
pub use filter::{ExistingFiles, Partitioned};
pub use retry::RetryCoordinator;
pub use scheduler::{AttemptResult, Attempted, PhaseReport, Scheduler};
pub use task::{Attempt, DownloadTask, Outcome, TaskOutcome, TaskStatus};

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
