//! Error types for the container runtime

use crate::lifecycle::{Operation, Status};
use thiserror::Error;

/// Main error type for container registration, lifecycle and dispatch
#[derive(Error, Debug)]
pub enum ContainerError {
    /// An operation was attempted outside its legal lifecycle window.
    /// The container status is left unchanged.
    #[error("{operation} is not allowed while the container is {status}")]
    IllegalState {
        /// The rejected operation
        operation: Operation,
        /// Status at the time of the call
        status: Status,
    },

    /// A restricted operation was attempted while programmatic
    /// context listeners are firing.
    #[error("{operation} is not allowed while the container is in tainted mode")]
    Tainted {
        /// The rejected operation
        operation: Operation,
    },

    /// A handler or filter reported that it cannot serve.
    #[error("{} is {} unavailable: {message}", display_name(.name), permanence(.permanent))]
    Unavailable {
        /// Handler or filter name (empty until the container attributes the failure)
        name: String,
        /// Permanent unavailability removes the handler from service
        permanent: bool,
        /// Human readable reason
        message: String,
        /// Teardown failures raised while releasing the unit
        suppressed: Vec<ContainerError>,
    },

    /// No handler matched a path or name
    #[error("no target for '{0}'")]
    NoTarget(String),

    /// Async dispatch was handed a request chain the engine cannot interpret
    #[error("async dispatch: {0}")]
    AsyncWrapperChain(String),

    /// The request or response passed to `service` is not a container exchange
    #[error("invalid request or response: {0}")]
    InvalidRequest(String),

    /// Invalid argument passed to a registration or facade method
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The response buffer was reset after the response had been committed
    #[error("response {0} is already committed")]
    Committed(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other handler, filter or listener failure
    #[error("handler error: {0}")]
    Handler(#[from] anyhow::Error),
}

fn permanence(permanent: &bool) -> &'static str {
    if *permanent {
        "permanently"
    } else {
        "temporarily"
    }
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "unit"
    } else {
        name
    }
}

impl ContainerError {
    /// Temporary unavailability: the unit stays registered and may recover.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            name: String::new(),
            permanent: false,
            message: message.into(),
            suppressed: Vec::new(),
        }
    }

    /// Permanent unavailability: the unit is removed from service.
    pub fn permanently_unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            name: String::new(),
            permanent: true,
            message: message.into(),
            suppressed: Vec::new(),
        }
    }

    /// True for `Unavailable { permanent: true, .. }`
    #[must_use]
    pub fn is_permanent_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { permanent: true, .. })
    }

    /// True for any `Unavailable` error
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Attach a secondary failure. Only `Unavailable` carries suppressed
    /// errors; any other error is turned into a permanent unavailability
    /// so the secondary failure is never dropped.
    #[must_use]
    pub fn with_suppressed(self, other: ContainerError) -> Self {
        match self {
            Self::Unavailable {
                name,
                permanent,
                message,
                mut suppressed,
            } => {
                suppressed.push(other);
                Self::Unavailable {
                    name,
                    permanent,
                    message,
                    suppressed,
                }
            }
            err => Self::Unavailable {
                name: String::new(),
                permanent: true,
                message: err.to_string(),
                suppressed: vec![other],
            },
        }
    }

    /// Secondary failures attached with [`with_suppressed`](Self::with_suppressed)
    #[must_use]
    pub fn suppressed(&self) -> &[ContainerError] {
        match self {
            Self::Unavailable { suppressed, .. } => suppressed,
            _ => &[],
        }
    }

    /// Stamp the handler or filter name on an `Unavailable` error that
    /// was raised without one.
    #[must_use]
    pub(crate) fn attributed_to(self, unit: &str) -> Self {
        match self {
            Self::Unavailable {
                name,
                permanent,
                message,
                suppressed,
            } if name.is_empty() => Self::Unavailable {
                name: unit.to_string(),
                permanent,
                message,
                suppressed,
            },
            err => err,
        }
    }
}

/// Result type alias for the container runtime
pub type Result<T> = std::result::Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppressed_is_kept_on_unavailable() {
        let err = ContainerError::permanently_unavailable("init failed")
            .with_suppressed(ContainerError::Handler(anyhow::anyhow!("destroy failed")));
        assert!(err.is_permanent_unavailable());
        assert_eq!(err.suppressed().len(), 1);
        assert!(err.suppressed()[0].to_string().contains("destroy failed"));
    }

    #[test]
    fn test_attributed_to_only_fills_empty_name() {
        let err = ContainerError::unavailable("warming up").attributed_to("echo");
        assert_eq!(err.to_string(), "echo is temporarily unavailable: warming up");
        let err = err.attributed_to("other");
        assert!(err.to_string().starts_with("echo"));
    }
}
