use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type used across the crate.
pub type StatsResult<T> = Result<T, StatsError>;

/// Error type returned by decoding, aggregation, and run-level operations.
///
/// Per-file variants ([`StatsError::FileOpen`], [`StatsError::Read`], [`StatsError::JsonParse`],
/// [`StatsError::Cancelled`]) are recovered by the worker pool and folded into the run's error
/// count. Per-record [`StatsError::InvalidField`] drops a single record. Everything else is
/// fatal to the run.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Invalid arguments (bad thread count, malformed flags, ...).
    #[error("usage error: {message}")]
    Usage { message: String },

    /// The requested attribute is not one of `title`, `author`, `year_published`, `genre`.
    #[error("unsupported attribute '{attribute}' (expected one of: title, author, year_published, genre)")]
    UnsupportedAttribute { attribute: String },

    /// The input directory is missing or not a directory.
    #[error("not a directory: {}", path.display())]
    Directory { path: PathBuf },

    /// Underlying I/O error outside of per-file processing (e.g. directory listing).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A single input file could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was opened but reading it failed partway.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON; the remaining records of the file are abandoned.
    #[error("invalid json in {}: {source}", path.display())]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A per-record constraint violation; the record is dropped.
    #[error("invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// Cooperative cancellation interrupted a task.
    #[error("cancelled while processing {}", path.display())]
    Cancelled { path: PathBuf },

    /// The statistics document could not be written.
    #[error("failed to write statistics to {}: {message}", path.display())]
    OutputWrite { path: PathBuf, message: String },

    /// The worker thread pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl StatsError {
    /// A usage error with a human-readable reason.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for errors that abort a whole run rather than a single file or record.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::FileOpen { .. }
                | Self::Read { .. }
                | Self::JsonParse { .. }
                | Self::InvalidField { .. }
                | Self::Cancelled { .. }
        )
    }

    /// Process exit code used by the CLI for this error.
    ///
    /// `1` for usage problems and a missing directory, `2` for processing failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage { .. } | Self::UnsupportedAttribute { .. } | Self::Directory { .. } => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StatsError;
    use std::path::PathBuf;

    #[test]
    fn usage_and_directory_errors_exit_with_one() {
        let unsupported = StatsError::UnsupportedAttribute {
            attribute: "isbn".to_string(),
        };
        assert_eq!(unsupported.exit_code(), 1);
        assert!(unsupported.to_string().contains("'isbn'"));

        let dir = StatsError::Directory {
            path: PathBuf::from("/no/such/dir"),
        };
        assert_eq!(dir.exit_code(), 1);
        assert!(dir.is_fatal());

        let usage = StatsError::usage("invalid value for '--threads'");
        assert_eq!(usage.exit_code(), 1);
        assert!(usage.is_fatal());
        assert_eq!(usage.to_string(), "usage error: invalid value for '--threads'");
    }

    #[test]
    fn per_file_errors_are_not_fatal() {
        let cancelled = StatsError::Cancelled {
            path: PathBuf::from("a.json"),
        };
        assert!(!cancelled.is_fatal());
        let read = StatsError::Read {
            path: PathBuf::from("a.json"),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"),
        };
        assert!(!read.is_fatal());
        assert_eq!(read.exit_code(), 2);
        assert!(!StatsError::invalid_field("year_published", "must be positive").is_fatal());

        let write = StatsError::OutputWrite {
            path: PathBuf::from("out.xml"),
            message: "disk full".to_string(),
        };
        assert!(write.is_fatal());
        assert_eq!(write.exit_code(), 2);
    }
}
