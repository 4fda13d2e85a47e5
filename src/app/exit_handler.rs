//! Exit code logic for the webdl process.
//!
//! Single responsibility: map a run result to the process exit outcome.

use std::process::ExitCode;

use webdl_core::{EngineError, PipelineError};

/// Process exit outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// All phases completed, whatever the per-file outcomes.
    Success,
    /// The page could not be fetched or storage failed.
    Failure,
    /// Invalid arguments or configuration.
    Usage,
    /// Interrupted by Ctrl-C.
    Interrupted,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Usage => 2,
            Self::Interrupted => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Determines the process exit outcome for a pipeline error.
pub(crate) fn exit_for_pipeline_error(error: &PipelineError) -> ProcessExit {
    match error {
        PipelineError::Engine(EngineError::InvalidConcurrency { .. })
        | PipelineError::Extraction(_) => ProcessExit::Usage,
        _ => ProcessExit::Failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webdl_core::{ExtractionError, FilesystemError, PageFetchError};

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProcessExit::Success.code(), 0);
        assert_eq!(ProcessExit::Failure.code(), 1);
        assert_eq!(ProcessExit::Usage.code(), 2);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }

    #[test]
    fn test_page_fetch_failure_exits_1() {
        let err = PipelineError::PageFetch(PageFetchError::Render {
            url: "https://example.com/".to_string(),
            reason: "crashed".to_string(),
        });
        assert_eq!(exit_for_pipeline_error(&err), ProcessExit::Failure);
    }

    #[test]
    fn test_storage_failure_exits_1() {
        let err = PipelineError::Filesystem(FilesystemError::StorageExhausted {
            path: "downloads".into(),
            reason: "No space left on device".to_string(),
        });
        assert_eq!(exit_for_pipeline_error(&err), ProcessExit::Failure);
    }

    #[test]
    fn test_configuration_errors_exit_2() {
        let err = PipelineError::Engine(EngineError::InvalidConcurrency { value: 0 });
        assert_eq!(exit_for_pipeline_error(&err), ProcessExit::Usage);

        let err = PipelineError::Extraction(ExtractionError::invalid_file_type("", "empty"));
        assert_eq!(exit_for_pipeline_error(&err), ProcessExit::Usage);
    }
}
