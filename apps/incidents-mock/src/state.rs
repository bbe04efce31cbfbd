use reqwest::Client;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::MockConfig;
use crate::services::interception::MockInstallation;
use crate::time::Clock;

#[derive(Clone)]
pub struct AppState {
    pub config: MockConfig,
    pub clock: Clock,
    pub http: Client,
    installation: Arc<RwLock<Option<Arc<MockInstallation>>>>,
}

impl AppState {
    pub fn new(config: MockConfig, clock: Clock, http: Client) -> Self {
        Self {
            config,
            clock,
            http,
            installation: Arc::new(RwLock::new(None)),
        }
    }

    /// Snapshot of the active installation. Requests keep answering from the
    /// snapshot they took even if a new one is installed meanwhile.
    pub async fn installation(&self) -> Option<Arc<MockInstallation>> {
        self.installation.read().await.clone()
    }

    /// Swaps in a fully built installation, returning the one it replaced.
    pub async fn install(&self, installation: MockInstallation) -> Option<Arc<MockInstallation>> {
        self.installation
            .write()
            .await
            .replace(Arc::new(installation))
    }

    pub async fn teardown(&self) -> Option<Arc<MockInstallation>> {
        self.installation.write().await.take()
    }
}
