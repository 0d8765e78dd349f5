use std::path::Path;

use async_trait::async_trait;

use crate::error::HostError;

/// Factory for automation host instances.
#[async_trait]
pub trait HostPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Creates (or attaches to) the host registered for `version`.
    async fn launch(&self, version: &str) -> Result<Box<dyn HostApplication>, HostError>;
}

/// A running host instance. Profile activation is global to the instance.
#[async_trait]
pub trait HostApplication: Send {
    async fn set_active_profile(&mut self, profile: &str) -> Result<(), HostError>;

    async fn open_project(&mut self, path: &Path) -> Result<Box<dyn HostProject>, HostError>;
}

/// One project opened inside a host instance.
#[async_trait]
pub trait HostProject: Send {
    /// Executes every runnable unit. Step failures inside the project do not
    /// fail this call; they only show up in the extracted logs.
    async fn run(&mut self) -> Result<(), HostError>;

    async fn save_as(&mut self, target: &Path) -> Result<(), HostError>;

    async fn close(&mut self) -> Result<(), HostError>;
}
