use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{Result, WizardError},
    state::WizardState,
};

/// Identifier of one in-progress wizard, minted when the flow starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(Uuid);

impl FlowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for FlowId {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| WizardError::InvalidFlowId(s.to_string()))
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session entry name for a flow instance: `{namespace}-flow:{flow_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(namespace: &str, flow_id: &FlowId) -> Self {
        Self(format!("{namespace}-flow:{flow_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for storing and retrieving wizard state
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &SessionKey) -> Result<Option<WizardState>>;
    async fn save(&self, key: &SessionKey, state: WizardState) -> Result<()>;
    async fn delete(&self, key: &SessionKey) -> Result<()>;
}

/// In-memory implementation of SessionStorage
#[derive(Clone, Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, WizardState>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn get(&self, key: &SessionKey) -> Result<Option<WizardState>> {
        Ok(self.sessions.get(key.as_str()).map(|entry| entry.clone()))
    }

    async fn save(&self, key: &SessionKey, state: WizardState) -> Result<()> {
        self.sessions.insert(key.as_str().to_string(), state);
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> Result<()> {
        self.sessions.remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flow_id_parsing() {
        let id = FlowId::new();
        assert_eq!(id.to_string().parse::<FlowId>().unwrap(), id);
        assert!(matches!(
            "not-a-uuid".parse::<FlowId>(),
            Err(WizardError::InvalidFlowId(_))
        ));
    }

    #[test]
    fn test_session_key_format() {
        let id: FlowId = "0f8fad5b-d9cb-469f-a165-70867728950e".parse().unwrap();
        assert_eq!(
            SessionKey::new("apply", &id).as_str(),
            "apply-flow:0f8fad5b-d9cb-469f-a165-70867728950e"
        );
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let storage = InMemorySessionStorage::new();
        let key = SessionKey::new("renew", &FlowId::new());
        let state = WizardState::from_value(json!({ "tax_filing": true })).unwrap();

        assert!(storage.get(&key).await.unwrap().is_none());
        storage.save(&key, state.clone()).await.unwrap();
        assert_eq!(storage.get(&key).await.unwrap(), Some(state));

        storage.delete(&key).await.unwrap();
        assert!(storage.get(&key).await.unwrap().is_none());
        assert!(storage.is_empty());
    }
}
