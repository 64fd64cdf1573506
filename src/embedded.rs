//! Embedded facade: drive a container in-process without an HTTP front end.
//!
//! ```rust,ignore
//! let mut embedded = EmbeddedContainer::new(container);
//! embedded.initialize()?.start()?;
//! let response = embedded.service_path("/echo/a", &["x", "1"])?;
//! embedded.stop()?.destroy()?;
//! ```

use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::exchange::{Request, Response};

/// Owns a [`Container`] and forwards lifecycle calls with chaining.
#[derive(Debug)]
pub struct EmbeddedContainer {
    container: Container,
}

impl EmbeddedContainer {
    #[must_use]
    pub fn new(container: Container) -> Self {
        Self { container }
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Registration access while the container is still in setup.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn initialize(&mut self) -> Result<&mut Self> {
        self.container.initialize()?;
        Ok(self)
    }

    pub fn start(&mut self) -> Result<&mut Self> {
        self.container.start()?;
        Ok(self)
    }

    pub fn stop(&mut self) -> Result<&mut Self> {
        self.container.stop()?;
        Ok(self)
    }

    pub fn destroy(&mut self) -> Result<&mut Self> {
        self.container.destroy()?;
        Ok(self)
    }

    /// Build a request for `path` (which may carry a query string), add
    /// `parameters` as name/value pairs and service it.
    pub fn service_path(&self, path: &str, parameters: &[&str]) -> Result<Response> {
        if parameters.len() % 2 != 0 {
            return Err(ContainerError::InvalidArgument(format!(
                "parameters come in name/value pairs, got {} values",
                parameters.len()
            )));
        }
        let mut builder = Request::builder()
            .context_path(self.container.context_path())
            .path(path);
        for pair in parameters.chunks_exact(2) {
            builder = builder.parameter(pair[0], pair[1]);
        }
        let request = builder.build();
        let response = Response::new();
        self.container.service(&request, &response)?;
        Ok(response)
    }

    #[must_use]
    pub fn into_inner(self) -> Container {
        self.container
    }
}
