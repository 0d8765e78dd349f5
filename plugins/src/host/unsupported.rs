use async_trait::async_trait;

use egrun_core::api::{HostApplication, HostError, HostPlugin};

/// Stand-in host for platforms without COM automation. Every launch fails.
#[derive(Debug, Default)]
pub struct UnsupportedHost;

#[async_trait]
impl HostPlugin for UnsupportedHost {
    fn name(&self) -> &str {
        "unsupported"
    }

    async fn launch(&self, version: &str) -> Result<Box<dyn HostApplication>, HostError> {
        tracing::debug!(target: "egrun.host", version, "automation host requested on unsupported platform");
        Err(HostError::Unavailable {
            reason: format!(
                "Enterprise Guide {version} automation requires Windows (COM); {} is not supported",
                std::env::consts::OS
            ),
        })
    }
}
