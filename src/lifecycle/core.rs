use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::error::{ContainerError, Result};

/// Container status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Initial state; registration tables are open
    Setup,
    /// Declared artifacts are processed; initializers may still register
    InitializedDeclared,
    /// Handlers and filters are initialized; not accepting requests
    Initialized,
    /// Accepting `service` calls
    Servicing,
    /// Startup failed; terminal for this instantiation
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Setup => "SETUP",
            Status::InitializedDeclared => "INITIALIZED_DECLARED",
            Status::Initialized => "INITIALIZED",
            Status::Servicing => "SERVICING",
            Status::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Every container operation whose legality depends on the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddHandler,
    AddFilter,
    AddListener,
    AddInitializer,
    AddMapping,
    SetInitParameter,
    CreateInstance,
    InspectRegistrations,
    DeclaredFinish,
    Initialize,
    Start,
    Stop,
    Destroy,
    Service,
}

impl Operation {
    /// The statuses in which this operation may run.
    #[must_use]
    pub fn legal_in(self) -> &'static [Status] {
        use Status::*;
        match self {
            Operation::AddHandler
            | Operation::AddFilter
            | Operation::AddListener
            | Operation::AddMapping
            | Operation::SetInitParameter => &[Setup, InitializedDeclared],
            Operation::AddInitializer | Operation::DeclaredFinish => &[Setup],
            Operation::Initialize => &[Setup, InitializedDeclared],
            Operation::Start => &[Initialized],
            Operation::Stop | Operation::Service => &[Servicing],
            Operation::Destroy => &[Initialized],
            Operation::CreateInstance | Operation::InspectRegistrations => {
                &[Setup, InitializedDeclared, Initialized, Servicing]
            }
        }
    }

    /// Operations rejected while programmatic context listeners fire.
    #[must_use]
    pub fn blocked_when_tainted(self) -> bool {
        matches!(
            self,
            Operation::AddHandler
                | Operation::AddFilter
                | Operation::AddListener
                | Operation::SetInitParameter
                | Operation::CreateInstance
                | Operation::InspectRegistrations
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::AddHandler => "add_handler",
            Operation::AddFilter => "add_filter",
            Operation::AddListener => "add_listener",
            Operation::AddInitializer => "add_initializer",
            Operation::AddMapping => "add_mapping",
            Operation::SetInitParameter => "set_init_parameter",
            Operation::CreateInstance => "create_instance",
            Operation::InspectRegistrations => "inspect_registrations",
            Operation::DeclaredFinish => "initialize_declared_finish",
            Operation::Initialize => "initialize",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Destroy => "destroy",
            Operation::Service => "service",
        };
        f.write_str(s)
    }
}

/// Status holder plus the single validation function every mutator consults.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    status: Status,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            status: Status::Setup,
        }
    }
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Fail with `IllegalState` unless `operation` is legal in the current status.
    pub fn verify(&self, operation: Operation) -> Result<()> {
        if operation.legal_in().contains(&self.status) {
            Ok(())
        } else {
            Err(ContainerError::IllegalState {
                operation,
                status: self.status,
            })
        }
    }

    /// Verify `operation` and move to `to`.
    pub fn transition(&mut self, operation: Operation, to: Status) -> Result<()> {
        self.verify(operation)?;
        self.set(to);
        Ok(())
    }

    /// Unchecked move; used for the internal startup phases and ERROR.
    pub(crate) fn set(&mut self, to: Status) {
        if self.status != to {
            info!(status_from = %self.status, status_to = %to, "Container status changed");
            self.status = to;
        }
    }

    /// True once initialization finished and the container did not fail.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(self.status, Status::Initialized | Status::Servicing)
    }
}
