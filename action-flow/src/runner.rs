//! FlowRunner – loads a session, runs one action of a flow package through the
//! [`ActionFlowInterceptor`], and persists the updated session back to storage.
//!
//! One HTTP request maps to one [`FlowRunner::run`] call. Create the runner once at
//! startup and share it between requests; it only holds two `Arc`s.
//!
//! ```rust,ignore
//! let runner = FlowRunner::new(Arc::new(package), storage.clone());
//! let session_id = runner.start_session().await?;
//! let dispatch = runner.run(&session_id, "next", params).await?;
//! ```
//!
//! Use [`ActionFlowInterceptor::intercept`] directly when the session is
//! loaded and saved elsewhere.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    action::Invocation,
    error::{FlowError, Result},
    interceptor::{ActionFlowInterceptor, Dispatch},
    package::FlowPackage,
    storage::{FlowState, Session, SessionStorage},
};

/// High-level helper that orchestrates the _load → intercept → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    interceptor: ActionFlowInterceptor,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(package: Arc<FlowPackage>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            interceptor: ActionFlowInterceptor::new(package),
            storage,
        }
    }

    pub fn package(&self) -> &Arc<FlowPackage> {
        self.interceptor.package()
    }

    /// Create and persist an empty session, returning its id.
    pub async fn start_session(&self) -> Result<String> {
        let session = Session::new_random();
        let id = session.id.clone();
        self.storage.save(session).await?;
        tracing::debug!(session_id = %id, "Started session");
        Ok(id)
    }

    /// Run `action` for the given session and persist the session afterwards.
    pub async fn run(
        &self,
        session_id: &str,
        action: &str,
        params: HashMap<String, String>,
    ) -> Result<Dispatch> {
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;

        let invocation = Invocation::new(action, params, session.context.clone());
        let dispatch = self.interceptor.intercept(&mut session, invocation).await?;

        session.touch();
        self.storage.save(session).await?;

        tracing::info!(
            session_id,
            package = self.package().name(),
            action = %dispatch.action,
            result = %dispatch.result,
            view = ?dispatch.view_action,
            "Flow request handled"
        );
        Ok(dispatch)
    }

    /// Current progress of the session through this runner's flow.
    pub async fn progress(&self, session_id: &str) -> Result<Option<FlowState>> {
        let session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;
        Ok(session.flow_state(self.package().name()).cloned())
    }

    /// Forget the session's progress through this flow.
    pub async fn reset(&self, session_id: &str) -> Result<()> {
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))?;
        session.clear_flow(self.package().name());
        session.touch();
        self.storage.save(session).await
    }
}
