//! Step ordering, navigation and progress tracking around action
//! invocation.
//!
//! For every request the interceptor works out where the user stands in
//! the flow from the session's [`FlowState`], decides whether the
//! requested action may run at all, runs it, and records progress when a
//! flow step succeeds. Requests it refuses end with
//! [`ResultCode::FlowView`] and the name of the view the user belongs on.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    action::{Invocation, ResultCode},
    config::FIRST_FLOW_ACTION,
    error::Result,
    flow::{ActionFlow, StepsData},
    package::{ActionKind, FlowPackage},
    storage::{FlowState, Session},
    validation::ValidationErrors,
};

/// What the request came to, handed back to the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    /// Action that actually ran, `next` resolves to a flow step.
    pub action: String,
    pub result: ResultCode,
    /// View to show next, set on redirects and after a step succeeded.
    pub view_action: Option<String>,
    pub steps: StepsData,
    pub step_count: u32,
    pub field_errors: ValidationErrors,
    /// The last step succeeded and the flow state was cleared.
    pub completed: bool,
}

#[derive(Clone)]
pub struct ActionFlowInterceptor {
    package: Arc<FlowPackage>,
}

impl ActionFlowInterceptor {
    pub fn new(package: Arc<FlowPackage>) -> Self {
        Self { package }
    }

    pub fn package(&self) -> &Arc<FlowPackage> {
        &self.package
    }

    pub async fn intercept(
        &self,
        session: &mut Session,
        mut invocation: Invocation,
    ) -> Result<Dispatch> {
        let package = self.package.as_ref();
        let flow = package.flow();
        let config = package.config();
        let mut state = session
            .flow_state(package.name())
            .cloned()
            .unwrap_or_default();

        let mut previous = match state.previous_flow_action.as_deref() {
            Some(name) if flow.contains(name) => name.to_string(),
            Some(name) => {
                warn!(
                    package = package.name(),
                    previous = name,
                    "Stored flow action is not part of the flow, restarting"
                );
                FIRST_FLOW_ACTION.to_string()
            }
            None => FIRST_FLOW_ACTION.to_string(),
        };

        // back/forward buttons: the step parameter names the step before
        // the submitted form and may only move progress backwards
        if let Some(step) = invocation.param(&config.step_parameter_name) {
            let step = if step.is_empty() { FIRST_FLOW_ACTION } else { step };
            if let (Some(step_index), Some(previous_index)) =
                (flow.index_of(step), flow.index_of(&previous))
            {
                if step_index < previous_index {
                    debug!(from = %previous, to = step, "Rewinding flow to submitted step");
                    previous = step.to_string();
                    state.previous_flow_action = Some(previous.clone());
                }
            }
        }

        if invocation.action_name() == config.prev_action_name {
            return Ok(self.navigate_back(session, state, &previous));
        }

        if invocation.action_name() == config.next_action_name {
            state.prev_navigation = false;
            match flow.next_of(&previous) {
                Some(target) => {
                    debug!(package = package.name(), target, "Chaining next to flow step");
                    invocation.retarget(target);
                }
                None => {
                    let view = flow.view_action_name(&previous);
                    let steps = flow.steps_data(flow.index_of(&previous).unwrap_or_default());
                    self.store(session, state);
                    return Ok(redirect(flow, config.next_action_name.clone(), view, steps));
                }
            }
        }

        let name = invocation.action_name().to_string();
        let (action, kind) = package.resolve(&name)?;
        let step = match kind {
            ActionKind::Execute if flow.is_step(&name) => Some(name.clone()),
            ActionKind::View => flow.step_of_view(&name).map(str::to_string),
            ActionKind::Execute => None,
        };

        let expected = flow.next_of(&previous).map(str::to_string);
        let expected_index = expected.as_deref().and_then(|e| flow.index_of(e));
        let step_index = step
            .as_deref()
            .and_then(|s| flow.index_of(s))
            .or(expected_index)
            .unwrap_or_else(|| flow.step_count());
        invocation.set_steps(flow.steps_data(step_index), flow.step_count());
        invocation.set_scope(state.scope.clone());

        if let Some(step) = step.as_deref() {
            // walking back: the action may jump further back than one step
            if kind == ActionKind::View && state.prev_navigation {
                state.prev_navigation = false;
                let skip = action
                    .as_flow_aware()
                    .and_then(|aware| aware.prev_action_flow_action(step, &invocation));
                if let Some(skip) = skip.filter(|s| moves_back(flow, step, s)) {
                    info!(package = package.name(), from = step, to = %skip, "Skipping back");
                    state.previous_flow_action = flow.prev_of(&skip).map(str::to_string);
                    let view = flow.view_action_name(&skip);
                    let steps = invocation.steps_data().cloned().unwrap_or_default();
                    self.store(session, state);
                    return Ok(redirect(flow, name, view, steps));
                }
            }

            if config.force_flow_steps_order {
                let expected_view = expected
                    .as_deref()
                    .map(|e| flow.view_action_name(e))
                    .unwrap_or_else(|| flow.view_action_name(flow.first_step()));
                let allowed = match kind {
                    ActionKind::Execute => expected.as_deref() == Some(step),
                    ActionKind::View => {
                        let reached = state.highest_current_action_index.unwrap_or(0).saturating_add(1);
                        step_index <= reached.max(expected_index.unwrap_or(0))
                    }
                };
                if !allowed {
                    info!(
                        package = package.name(),
                        action = %name,
                        expected = %expected_view,
                        "Out of order flow request"
                    );
                    let steps = invocation.steps_data().cloned().unwrap_or_default();
                    self.store(session, state);
                    return Ok(redirect(flow, name, expected_view, steps));
                }
            }
        }

        let result = package.invoke(action.as_ref(), kind, &mut invocation).await?;
        debug!(package = package.name(), action = %name, result = %result, "Action invoked");

        let mut dispatch = Dispatch {
            action: name.clone(),
            result: result.clone(),
            view_action: None,
            steps: invocation.steps_data().cloned().unwrap_or_default(),
            step_count: flow.step_count(),
            field_errors: invocation.field_errors().clone(),
            completed: false,
        };

        let succeeded_step = kind == ActionKind::Execute && step.is_some() && result == ResultCode::Success;
        if !succeeded_step {
            self.store(session, state);
            return Ok(dispatch);
        }

        state.prev_navigation = false;
        state.scope = invocation.scope().clone();

        if flow.is_last(&name) {
            info!(package = package.name(), action = %name, "Action flow completed");
            session.clear_flow(package.name());
            dispatch.completed = true;
            return Ok(dispatch);
        }

        let mut done = name.clone();
        let mut next = flow.next_of(&name).map(str::to_string);
        let skip = action
            .as_flow_aware()
            .and_then(|aware| aware.next_action_flow_action(&name, &invocation));
        if let Some(skip) = skip {
            if moves_forward(flow, &name, &skip) {
                info!(package = package.name(), from = %name, to = %skip, "Skipping forward");
                done = flow.prev_of(&skip).unwrap_or(name.as_str()).to_string();
                next = Some(skip);
            } else {
                debug!(package = package.name(), skip = %skip, "Ignoring skip target");
            }
        }

        let done_index = flow.index_of(&done).unwrap_or_default();
        state.highest_current_action_index = Some(
            state
                .highest_current_action_index
                .map_or(done_index, |h| h.max(done_index)),
        );
        state.previous_flow_action = Some(done);
        dispatch.view_action = next.map(|n| flow.view_action_name(&n));

        self.store(session, state);
        Ok(dispatch)
    }

    fn navigate_back(&self, session: &mut Session, mut state: FlowState, previous: &str) -> Dispatch {
        let package = self.package.as_ref();
        let flow = package.flow();
        state.prev_navigation = true;

        let (view, step_index) = if flow.is_step(previous) {
            state.previous_flow_action = flow.prev_of(previous).map(str::to_string);
            (
                flow.view_action_name(previous),
                flow.index_of(previous).unwrap_or_default(),
            )
        } else {
            (flow.view_action_name(flow.first_step()), 1)
        };
        debug!(package = package.name(), view = %view, "Navigating back");

        self.store(session, state);
        redirect(
            flow,
            package.config().prev_action_name.clone(),
            view,
            flow.steps_data(step_index),
        )
    }

    fn store(&self, session: &mut Session, state: FlowState) {
        *session.flow_state_mut(self.package.name()) = state;
    }
}

fn redirect(flow: &ActionFlow, action: String, view: String, steps: StepsData) -> Dispatch {
    Dispatch {
        action,
        result: ResultCode::FlowView,
        view_action: Some(view),
        steps,
        step_count: flow.step_count(),
        field_errors: ValidationErrors::new(),
        completed: false,
    }
}

fn moves_forward(flow: &ActionFlow, from: &str, to: &str) -> bool {
    flow.is_step(to)
        && matches!((flow.index_of(from), flow.index_of(to)), (Some(f), Some(t)) if t > f)
}

fn moves_back(flow: &ActionFlow, from: &str, to: &str) -> bool {
    flow.is_step(to)
        && matches!((flow.index_of(from), flow.index_of(to)), (Some(f), Some(t)) if t < f)
}
