use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::{
    context::Context,
    error::Result,
    flow::StepsData,
    validation::ValidationErrors,
};

/// Outcome of running an action
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultCode {
    /// The action did its work; flow steps advance on this.
    Success,
    /// The submitted data was rejected, show the form again.
    Input,
    Error,
    /// Show the view named by the dispatch instead of the action's own result.
    FlowView,
    Custom(String),
}

impl ResultCode {
    pub fn as_str(&self) -> &str {
        match self {
            ResultCode::Success => "success",
            ResultCode::Input => "input",
            ResultCode::Error => "error",
            ResultCode::FlowView => "actionFlowViewResult",
            ResultCode::Custom(code) => code,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ResultCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "success" => ResultCode::Success,
            "input" => ResultCode::Input,
            "error" => ResultCode::Error,
            "actionFlowViewResult" => ResultCode::FlowView,
            _ => ResultCode::Custom(code),
        }
    }
}

impl From<ResultCode> for String {
    fn from(code: ResultCode) -> Self {
        code.as_str().to_string()
    }
}

/// Everything an action sees while handling one request
#[derive(Debug, Clone)]
pub struct Invocation {
    action_name: String,
    params: HashMap<String, String>,
    context: Context,
    steps: Option<StepsData>,
    step_count: Option<u32>,
    scope: BTreeMap<String, Value>,
    field_errors: ValidationErrors,
}

impl Invocation {
    pub fn new(
        action_name: impl Into<String>,
        params: HashMap<String, String>,
        context: Context,
    ) -> Self {
        Self {
            action_name: action_name.into(),
            params,
            context,
            steps: None,
            step_count: None,
            scope: BTreeMap::new(),
            field_errors: ValidationErrors::new(),
        }
    }

    pub fn action_name(&self) -> &str {
        &self.action_name
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Steps of the flow this action belongs to, set for every action of
    /// a flow package.
    pub fn steps_data(&self) -> Option<&StepsData> {
        self.steps.as_ref()
    }

    pub fn step_count(&self) -> Option<u32> {
        self.step_count
    }

    /// Read a value kept in flow scope by an earlier step.
    pub fn scoped<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.scope
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Keep a value for later steps; it lives until the flow completes.
    /// Only persisted when the step succeeds.
    pub fn put_scoped(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        self.scope.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn field_errors(&self) -> &ValidationErrors {
        &self.field_errors
    }

    pub fn field_errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.field_errors
    }

    pub(crate) fn retarget(&mut self, action_name: impl Into<String>) {
        self.action_name = action_name.into();
    }

    pub(crate) fn set_steps(&mut self, steps: StepsData, step_count: u32) {
        self.steps = Some(steps);
        self.step_count = Some(step_count);
    }

    pub(crate) fn set_scope(&mut self, scope: BTreeMap<String, Value>) {
        self.scope = scope;
    }

    pub(crate) fn scope(&self) -> &BTreeMap<String, Value> {
        &self.scope
    }
}

/// A unit of request handling registered under a name in a flow package
#[async_trait]
pub trait Action: Send + Sync {
    /// Name the action is registered and requested under
    fn name(&self) -> &str;

    /// Handle a submission
    async fn execute(&self, invocation: &mut Invocation) -> Result<ResultCode>;

    /// Show the form of a flow step, requested as `<name><view postfix>`
    async fn view(&self, _invocation: &mut Invocation) -> Result<ResultCode> {
        Ok(ResultCode::Input)
    }

    /// Runs before `execute`; any recorded error turns the request into
    /// [`ResultCode::Input`] without executing.
    fn validate(&self, _invocation: &Invocation, _errors: &mut ValidationErrors) {}

    fn as_flow_aware(&self) -> Option<&dyn ActionFlowAware> {
        None
    }
}

/// Actions that can skip steps of the flow they belong to.
///
/// Returned names that are not steps of the flow, or that do not move in
/// the navigation direction, are ignored.
pub trait ActionFlowAware: Send + Sync {
    /// Step to continue with after `current` succeeded, instead of the
    /// one directly after it.
    fn next_action_flow_action(&self, _current: &str, _invocation: &Invocation) -> Option<String> {
        None
    }

    /// Step to show instead of `current` when the user is walking back.
    fn prev_action_flow_action(&self, _current: &str, _invocation: &Invocation) -> Option<String> {
        None
    }
}
