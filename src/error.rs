use std::path::PathBuf;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the library
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A metadata snapshot or configuration file that could not be decoded
    Snapshot { file: PathBuf, message: String },
    /// A route names a `Type@method` the metadata knows nothing about
    HandlerNotFound(String),
    InvalidConfig(String),
    UnsupportedFormat(String),
    Serialization(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Snapshot { file, message } => {
                write!(f, "Invalid metadata in {}: {}", file.display(), message)
            }
            Error::HandlerNotFound(binding) => write!(f, "Handler not found: {}", binding),
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::UnsupportedFormat(format) => {
                write!(f, "Unsupported output format: {} (expected json or yaml)", format)
            }
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::Snapshot {
            file: PathBuf::from("routes.yaml"),
            message: "missing field `uri`".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid metadata in routes.yaml: missing field `uri`");

        let err = Error::UnsupportedFormat("xml".to_string());
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_io_source() {
        use std::error::Error as _;

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.source().is_some());
        assert!(Error::HandlerNotFound("A@b".to_string()).source().is_none());
    }
}
