//! Error types for the towergraph library.
//!
//! Everything the importer and the bundled sources/sinks can fail with is a
//! variant here, so callers can match on failure modes instead of string
//! matching. The binary wraps these in `anyhow` at its boundary.

use std::io;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

// `NoJunctions` carries a field named `source` (the input file), which
// thiserror would infer as an error source; Display and Error are
// implemented by hand so the field keeps its name.
#[derive(Debug)]
pub enum Error {
    /// File I/O failure while reading a source or graph file.
    Io(io::Error),

    /// A source file could not be decoded.
    Parse { path: String, message: String },

    /// A feature in the source is unusable (missing or malformed stable id).
    InvalidRoad { index: usize, reason: String },

    /// The junction pass scanned the whole source without assigning a
    /// single node. An empty graph is never produced silently.
    NoJunctions { source: String },

    /// A oneway attribute was outside the b/t/f vocabulary. Carries the
    /// road id so the offending feature can be located in the source data.
    InvalidOneway { road_id: i64, value: String },

    /// The source did not replay identically between the junction and edge
    /// passes: a sub-run start was never registered as a node.
    PassMismatch { road_id: i64 },

    /// A graph file has a malformed header or body.
    Format { path: String, message: String },

    /// A graph file's CRC footer does not match its contents.
    ChecksumMismatch {
        path: String,
        stored: u32,
        computed: u32,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Parse { path, message } => {
                write!(f, "Failed to parse '{path}': {message}")
            }
            Error::InvalidRoad { index, reason } => {
                write!(f, "Invalid road feature #{index}: {reason}")
            }
            Error::NoJunctions { source } => {
                write!(f, "No road data found in {source}")
            }
            Error::InvalidOneway { road_id, value } => {
                write!(
                    f,
                    "Unsupported oneway value '{value}' on road {road_id}: expected b, t or f"
                )
            }
            Error::PassMismatch { road_id } => {
                write!(f, "Road {road_id} changed between junction and edge passes")
            }
            Error::Format { path, message } => {
                write!(f, "Invalid graph file '{path}': {message}")
            }
            Error::ChecksumMismatch {
                path,
                stored,
                computed,
            } => {
                write!(
                    f,
                    "Checksum mismatch in '{path}': stored {stored:#010x}, computed {computed:#010x}"
                )
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl Error {
    /// Shorthand for parse failures carrying the file path.
    pub fn parse(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Shorthand for graph-file format failures.
    pub fn format(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_oneway_names_the_road() {
        let err = Error::InvalidOneway {
            road_id: 42,
            value: "x".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("42"), "message must carry the road id: {msg}");
        assert!(msg.contains("'x'"));
    }

    #[test]
    fn test_no_junctions_names_the_source() {
        let err = Error::NoJunctions {
            source: "roads.geojson".to_string(),
        };
        assert_eq!(err.to_string(), "No road data found in roads.geojson");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_checksum_message_is_hex() {
        let err = Error::ChecksumMismatch {
            path: "g.twg".to_string(),
            stored: 0xdead_beef,
            computed: 0x0bad_f00d,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xdeadbeef"));
        assert!(msg.contains("0x0badf00d"));
    }
}
