//! Registration wizard served by the binary: name, phone, email.
//!
//! Sending `skip_phone=true` with the name step jumps straight to the
//! email step, and walking back from there skips the phone step again.
//! The collected registration is written to the session context under
//! [`REGISTRATION_KEY`] when the flow completes.

use action_flow::{
    Action, ActionFlowAware, FlowConfig, FlowPackage, FlowPackageBuilder, Invocation, Result,
    ResultCode, ValidationErrors,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const PACKAGE: &str = "registration";
pub const REGISTRATION_KEY: &str = "registration";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub phone: Option<String>,
    pub email: String,
}

pub fn registration_package(config: FlowConfig) -> Result<FlowPackage> {
    FlowPackageBuilder::new(PACKAGE)
        .config(config)
        .add_action(Arc::new(SaveNameAction))
        .add_action(Arc::new(SavePhoneAction))
        .add_action(Arc::new(SaveEmailAction))
        .add_action(Arc::new(SummaryAction))
        .build()
}

fn required(invocation: &Invocation, errors: &mut ValidationErrors, field: &str) {
    let present = invocation
        .param(field)
        .is_some_and(|value| !value.trim().is_empty());
    errors.check(present, field, "This field is required");
}

fn param(invocation: &Invocation, field: &str) -> String {
    invocation.param(field).unwrap_or_default().trim().to_string()
}

pub struct SaveNameAction;

#[async_trait]
impl Action for SaveNameAction {
    fn name(&self) -> &str {
        "saveName-1"
    }

    fn validate(&self, invocation: &Invocation, errors: &mut ValidationErrors) {
        required(invocation, errors, "name");
    }

    async fn execute(&self, invocation: &mut Invocation) -> Result<ResultCode> {
        let name = param(invocation, "name");
        info!(name = %name, "Saving name");
        let phone_skipped = skips_phone(invocation);
        invocation.put_scoped("name", name)?;
        invocation.put_scoped(PHONE_SKIPPED, phone_skipped)?;
        Ok(ResultCode::Success)
    }

    fn as_flow_aware(&self) -> Option<&dyn ActionFlowAware> {
        Some(self)
    }
}

impl ActionFlowAware for SaveNameAction {
    fn next_action_flow_action(&self, _current: &str, invocation: &Invocation) -> Option<String> {
        skips_phone(invocation).then(|| "saveEmail-3".to_string())
    }
}

const PHONE_SKIPPED: &str = "phone_skipped";

fn skips_phone(invocation: &Invocation) -> bool {
    invocation.param("skip_phone") == Some("true")
}

pub struct SavePhoneAction;

#[async_trait]
impl Action for SavePhoneAction {
    fn name(&self) -> &str {
        "savePhone-2"
    }

    fn validate(&self, invocation: &Invocation, errors: &mut ValidationErrors) {
        required(invocation, errors, "phone");
        let phone = param(invocation, "phone");
        errors.check(
            phone.chars().all(|c| c.is_ascii_digit() || c == '+' || c == ' '),
            "phone",
            "Only digits, spaces and + are allowed",
        );
    }

    async fn execute(&self, invocation: &mut Invocation) -> Result<ResultCode> {
        let phone = param(invocation, "phone");
        invocation.put_scoped("phone", phone)?;
        Ok(ResultCode::Success)
    }

    fn as_flow_aware(&self) -> Option<&dyn ActionFlowAware> {
        Some(self)
    }
}

impl ActionFlowAware for SavePhoneAction {
    fn prev_action_flow_action(&self, _current: &str, invocation: &Invocation) -> Option<String> {
        invocation
            .scoped::<bool>(PHONE_SKIPPED)
            .unwrap_or(false)
            .then(|| "saveName-1".to_string())
    }
}

pub struct SaveEmailAction;

#[async_trait]
impl Action for SaveEmailAction {
    fn name(&self) -> &str {
        "saveEmail-3"
    }

    fn validate(&self, invocation: &Invocation, errors: &mut ValidationErrors) {
        required(invocation, errors, "email");
        errors.check(
            param(invocation, "email").contains('@'),
            "email",
            "Not an email address",
        );
    }

    async fn execute(&self, invocation: &mut Invocation) -> Result<ResultCode> {
        let registration = Registration {
            name: invocation.scoped("name").unwrap_or_default(),
            phone: invocation.scoped("phone"),
            email: param(invocation, "email"),
        };
        info!(name = %registration.name, "Registration complete");
        invocation
            .context()
            .set(REGISTRATION_KEY, &registration)
            .await?;
        Ok(ResultCode::Success)
    }
}

/// Shows the finished registration, outside the flow.
pub struct SummaryAction;

#[async_trait]
impl Action for SummaryAction {
    fn name(&self) -> &str {
        "summary"
    }

    async fn execute(&self, invocation: &mut Invocation) -> Result<ResultCode> {
        let done = invocation
            .context()
            .get::<Registration>(REGISTRATION_KEY)
            .await
            .is_some();
        Ok(if done {
            ResultCode::Success
        } else {
            ResultCode::Custom("incomplete".to_string())
        })
    }
}
