use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::command::{CommandExecutor, CommandInvocation};
use crate::error::ConductorError;

/// Source of the raw status text of a connected hardware wallet.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeviceProbe: Sync + Send {
    /// One status poll, returning the raw vendor-specific payload.
    async fn device_status(&self) -> Result<String, ConductorError>;
}

/// Production probe: one-shot `device version` call on the bridge binary.
pub struct BridgeDeviceProbe {
    executor: CommandExecutor,
    invocation: CommandInvocation,
}

impl BridgeDeviceProbe {
    pub fn new(invocation: CommandInvocation) -> Self {
        Self {
            executor: CommandExecutor::new(),
            invocation,
        }
    }
}

#[async_trait]
impl DeviceProbe for BridgeDeviceProbe {
    async fn device_status(&self) -> Result<String, ConductorError> {
        self.executor.execute(&self.invocation).await
    }
}
