use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FlowError, Result};

/// Name of the synthetic step every flow starts from.
pub const FIRST_FLOW_ACTION: &str = "firstFlowAction";

/// Knobs of the action flow interceptor.
///
/// Every field has a default, so a YAML document only needs the keys it
/// wants to override:
///
/// ```yaml
/// next_action_name: forward
/// force_flow_steps_order: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Action name that moves the flow one step forward.
    pub next_action_name: String,
    /// Action name that moves the flow one step back.
    pub prev_action_name: String,
    /// Suffix appended to a step name to get the action showing its form.
    pub view_action_postfix: String,
    /// Request parameter carrying the step preceding the submitted form.
    pub step_parameter_name: String,
    /// Redirect requests for steps the user has not reached yet.
    pub force_flow_steps_order: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            next_action_name: "next".to_string(),
            prev_action_name: "prev".to_string(),
            view_action_postfix: "View".to_string(),
            step_parameter_name: "step".to_string(),
            force_flow_steps_order: true,
        }
    }
}

impl FlowConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: FlowConfig =
            serde_yaml::from_str(yaml).map_err(|e| FlowError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FlowError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&raw)
    }

    /// Reject configurations under which navigation actions would be
    /// indistinguishable from each other or from views.
    pub fn validate(&self) -> Result<()> {
        if self.next_action_name.is_empty() || self.prev_action_name.is_empty() {
            return Err(FlowError::ConfigError(
                "navigation action names must not be empty".to_string(),
            ));
        }
        if self.next_action_name == self.prev_action_name {
            return Err(FlowError::ConfigError(format!(
                "next and prev actions share the name {}",
                self.next_action_name
            )));
        }
        if self.view_action_postfix.is_empty() {
            return Err(FlowError::ConfigError(
                "view action postfix must not be empty".to_string(),
            ));
        }
        if self.step_parameter_name.is_empty() {
            return Err(FlowError::ConfigError(
                "step parameter name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
