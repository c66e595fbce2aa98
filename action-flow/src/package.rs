use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    action::{Action, Invocation, ResultCode},
    config::FlowConfig,
    error::{FlowError, Result},
    flow::ActionFlow,
};

/// Which entry point of an action a request maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Form submission, validated then executed.
    Execute,
    /// `<name><view postfix>`, shows the form.
    View,
}

/// A named set of actions whose `<name>-<index>` members form a flow
pub struct FlowPackage {
    name: String,
    config: FlowConfig,
    actions: HashMap<String, Arc<dyn Action>>,
    flow: ActionFlow,
}

impl FlowPackage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn flow(&self) -> &ActionFlow {
        &self.flow
    }

    pub fn get_action(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Find the action serving `name`, either directly or as its view.
    pub fn resolve(&self, name: &str) -> Result<(Arc<dyn Action>, ActionKind)> {
        if let Some(action) = self.actions.get(name) {
            return Ok((action.clone(), ActionKind::Execute));
        }
        name.strip_suffix(self.config.view_action_postfix.as_str())
            .and_then(|base| self.actions.get(base))
            .map(|action| (action.clone(), ActionKind::View))
            .ok_or_else(|| FlowError::ActionNotFound(name.to_string()))
    }

    /// Run an action: validation gates execution, views skip validation.
    pub async fn invoke(
        &self,
        action: &dyn Action,
        kind: ActionKind,
        invocation: &mut Invocation,
    ) -> Result<ResultCode> {
        match kind {
            ActionKind::View => action.view(invocation).await,
            ActionKind::Execute => {
                let mut errors = std::mem::take(invocation.field_errors_mut());
                action.validate(invocation, &mut errors);
                let failed = !errors.is_empty();
                *invocation.field_errors_mut() = errors;
                if failed {
                    tracing::debug!(
                        package = %self.name,
                        action = invocation.action_name(),
                        errors = invocation.field_errors().len(),
                        "Validation failed"
                    );
                    return Ok(ResultCode::Input);
                }
                action.execute(invocation).await
            }
        }
    }
}

/// Builder for creating flow packages
pub struct FlowPackageBuilder {
    name: String,
    config: FlowConfig,
    actions: HashMap<String, Arc<dyn Action>>,
}

impl FlowPackageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: FlowConfig::default(),
            actions: HashMap::new(),
        }
    }

    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_action(mut self, action: Arc<dyn Action>) -> Self {
        let name = action.name().to_string();
        if self.actions.insert(name.clone(), action).is_some() {
            tracing::warn!(package = %self.name, action = %name, "Replacing action registered twice");
        }
        self
    }

    pub fn build(self) -> Result<FlowPackage> {
        self.config.validate()?;
        let flow = ActionFlow::from_action_names(&self.name, self.actions.keys(), &self.config)?;
        Ok(FlowPackage {
            name: self.name,
            config: self.config,
            actions: self.actions,
            flow,
        })
    }
}
