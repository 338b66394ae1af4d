//! Error type shared by every fallible table operation.

/// Represents errors that can occur while operating a `RobinHoodMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Key length does not match the key size fixed at construction
    KeySize { expected: usize, actual: usize },

    /// Value length does not match the record size fixed at construction
    ValueSize { expected: usize, actual: usize },

    /// A tunable in `TableConfig` is out of range
    InvalidConfig(&'static str),

    /// The grown capacity (or its byte size) does not fit in `usize`
    CapacityOverflow,

    /// Memory for the grown structures could not be reserved
    AllocationFailed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeySize { expected, actual } => {
                write!(f, "key is {actual} bytes, table expects {expected}")
            }
            Self::ValueSize { expected, actual } => {
                write!(f, "value is {actual} bytes, table expects {expected}")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid table config: {msg}"),
            Self::CapacityOverflow => f.write_str("table capacity overflow"),
            Self::AllocationFailed => f.write_str("failed to allocate grown table"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::AllocationFailed
    }
}

/// Table result
pub type Result<T> = std::result::Result<T, Error>;
