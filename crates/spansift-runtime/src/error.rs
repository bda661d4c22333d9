use std::fmt;

/// Result type for spansift-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Bundle artifact could not be read or deserialized
    Bundle(spansift_types::Error),

    /// Development-mode compilation from a spec directory failed
    Compile(String),

    /// Loader already failed once; terminal until an explicit reload
    Degraded(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bundle(err) => write!(f, "Bundle error: {}", err),
            Error::Compile(msg) => write!(f, "Compile error: {}", msg),
            Error::Degraded(msg) => write!(f, "Loader degraded: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Bundle(err) => Some(err),
            Error::Compile(_) | Error::Degraded(_) => None,
        }
    }
}

impl From<spansift_types::Error> for Error {
    fn from(err: spansift_types::Error) -> Self {
        Error::Bundle(err)
    }
}
