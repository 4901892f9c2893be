//! Error types for loading, decoding and persisting storm tracks.

use thiserror::Error;

/// Result type for track operations.
pub type TrackResult<T> = Result<T, TrackError>;

/// Every failure aborts the whole load; nothing is partially salvaged.
#[derive(Error, Debug)]
pub enum TrackError {
    /// A declaration, track or point-count marker is missing or unrecognised.
    #[error("format error at line {line}: {reason} (`{content}`)")]
    Format {
        line: usize,
        content: String,
        reason: String,
    },

    /// A token failed numeric or date conversion.
    #[error("parse error at line {line}: {reason} (`{content}`)")]
    Parse {
        line: usize,
        content: String,
        reason: String,
    },

    /// The array container is inconsistent or cannot represent the tracks.
    #[error("container error: {0}")]
    Container(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl TrackError {
    pub fn format(line: usize, content: &str, reason: impl Into<String>) -> Self {
        TrackError::Format {
            line,
            content: content.trim_end().to_string(),
            reason: reason.into(),
        }
    }

    pub fn parse(line: usize, content: &str, reason: impl Into<String>) -> Self {
        TrackError::Parse {
            line,
            content: content.trim_end().to_string(),
            reason: reason.into(),
        }
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_line_and_content() {
        let err = TrackError::parse(12, "2000050600 abc 1.0 2.0\n", "invalid number `abc`");
        let message = err.to_string();

        assert!(message.contains("line 12"));
        assert!(message.contains("2000050600 abc 1.0 2.0`"));
        assert!(message.contains("invalid number"));
    }
}
