//! List-specific error types.

use std::error::Error;
use std::fmt;

use silt_pool::PoolError;

/// Errors that can occur during list operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListError {
    /// No node carries the requested value.
    ValueNotFound {
        /// The value that was searched for.
        value: u16,
    },
    /// A `NodeId` that no longer refers to a node in this list.
    ///
    /// Node identifiers go stale when the node is removed or the list is
    /// cleared; structural operations re-validate them by traversal
    /// rather than trusting the caller.
    NodeNotFound,
    /// The backing pool rejected an operation (typically exhaustion
    /// during node allocation).
    Pool(PoolError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueNotFound { value } => {
                write!(f, "no node with value {value}")
            }
            Self::NodeNotFound => {
                write!(f, "node id does not refer to a node in this list")
            }
            Self::Pool(err) => {
                write!(f, "pool operation failed: {err}")
            }
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PoolError> for ListError {
    fn from(err: PoolError) -> Self {
        Self::Pool(err)
    }
}
