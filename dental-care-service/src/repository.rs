use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use wizard_flow::WizardState;

use crate::models::SubmissionInfo;

/// Downstream benefit application API.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Send a completed application and return its confirmation.
    async fn submit(&self, flow: &str, state: &WizardState) -> anyhow::Result<SubmissionInfo>;
}

/// In-process stand-in for the benefit application API, keyed by
/// confirmation code.
#[derive(Clone, Default)]
pub struct InMemoryApplicationRepository {
    applications: Arc<DashMap<String, (String, WizardState)>>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flow and answers stored under `confirmation_code`.
    pub fn get(&self, confirmation_code: &str) -> Option<(String, WizardState)> {
        self.applications
            .get(confirmation_code)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

/// Confirmation codes look like `APP-1A2B3C4D5E6F`.
fn confirmation_code() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("APP-{}", &id[..12])
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn submit(&self, flow: &str, state: &WizardState) -> anyhow::Result<SubmissionInfo> {
        let info = SubmissionInfo {
            confirmation_code: confirmation_code(),
            submitted_on: Utc::now(),
        };
        self.applications.insert(
            info.confirmation_code.clone(),
            (flow.to_string(), state.clone()),
        );

        info!(flow, confirmation_code = %info.confirmation_code, "Application submitted");
        Ok(info)
    }
}
