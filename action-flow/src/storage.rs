use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{Context, error::Result};

/// Progress of one user through one flow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    /// Last step completed; `None` means nothing submitted yet.
    pub previous_flow_action: Option<String>,
    /// Highest step index the user has completed.
    pub highest_current_action_index: Option<u32>,
    /// The last navigation was a `prev`.
    pub prev_navigation: bool,
    /// Values actions asked to keep between steps.
    pub scope: BTreeMap<String, Value>,
}

/// Session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Flow progress keyed by flow package name.
    pub flows: BTreeMap<String, FlowState>,
    pub context: Context,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            flows: BTreeMap::new(),
            context: Context::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_random() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn flow_state(&self, package: &str) -> Option<&FlowState> {
        self.flows.get(package)
    }

    pub fn flow_state_mut(&mut self, package: &str) -> &mut FlowState {
        self.flows.entry(package.to_string()).or_default()
    }

    pub fn clear_flow(&mut self, package: &str) -> Option<FlowState> {
        self.flows.remove(package)
    }

    /// Copy whose context no longer shares data with `self`.
    pub fn detached(&self) -> Self {
        Self {
            context: self.context.detached(),
            ..self.clone()
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage.
///
/// Sessions are copied in and out, so context writes only land through `save`.
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session.detached());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.detached()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
