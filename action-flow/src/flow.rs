use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::{
    config::{FIRST_FLOW_ACTION, FlowConfig},
    error::{FlowError, Result},
};

/// Flow steps are named `<name>-<index>`, e.g. `saveName-1`.
static STEP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+-(\d+)$").expect("step pattern is valid"));

/// Position of a single step inside a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub index: u32,
    pub prev_action: Option<String>,
    pub next_action: Option<String>,
}

/// Ordered steps of a flow as handed to actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsData {
    /// Step index to step action name, first step has index 1.
    pub steps: BTreeMap<u32, String>,
    /// Index of the step the current request belongs to.
    pub step_index: u32,
}

/// Ordered map of step name to its position in the flow.
///
/// The synthetic [`FIRST_FLOW_ACTION`] entry sits at index 0 in front of
/// the first real step, so "nothing submitted yet" has a position too.
#[derive(Debug, Clone)]
pub struct ActionFlow {
    configs: HashMap<String, StepConfig>,
    steps: BTreeMap<u32, String>,
    view_postfix: String,
}

impl ActionFlow {
    /// Pick the flow steps out of a package's action names.
    pub fn from_action_names<I, S>(package: &str, names: I, config: &FlowConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut steps: BTreeMap<u32, String> = BTreeMap::new();

        for name in names {
            let name = name.as_ref();
            if name.ends_with(&config.view_action_postfix) {
                continue;
            }
            let Some(index) = STEP_PATTERN
                .captures(name)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
            else {
                continue;
            };
            if index == 0 {
                tracing::warn!(package, action = name, "Ignoring flow step with index 0");
                continue;
            }
            if let Some(existing) = steps.get(&index) {
                if existing != name {
                    return Err(FlowError::DuplicateStepIndex {
                        index,
                        first: existing.clone(),
                        second: name.to_string(),
                    });
                }
                continue;
            }
            steps.insert(index, name.to_string());
        }

        if steps.is_empty() {
            return Err(FlowError::EmptyFlow(package.to_string()));
        }

        let ordered: Vec<&String> = steps.values().collect();
        let mut configs = HashMap::with_capacity(ordered.len() + 1);
        configs.insert(
            FIRST_FLOW_ACTION.to_string(),
            StepConfig {
                index: 0,
                prev_action: None,
                next_action: Some(ordered[0].clone()),
            },
        );
        for (pos, (index, name)) in steps.iter().enumerate() {
            let prev_action = if pos == 0 {
                FIRST_FLOW_ACTION.to_string()
            } else {
                ordered[pos - 1].clone()
            };
            configs.insert(
                name.clone(),
                StepConfig {
                    index: *index,
                    prev_action: Some(prev_action),
                    next_action: ordered.get(pos + 1).map(|n| (*n).clone()),
                },
            );
        }

        tracing::debug!(package, steps = steps.len(), "Built action flow");

        Ok(Self {
            configs,
            steps,
            view_postfix: config.view_action_postfix.clone(),
        })
    }

    /// True for real steps and for the synthetic first action.
    pub fn contains(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    /// True only for steps declared by the application.
    pub fn is_step(&self, name: &str) -> bool {
        name != FIRST_FLOW_ACTION && self.configs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&StepConfig> {
        self.configs.get(name)
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.configs.get(name).map(|c| c.index)
    }

    pub fn next_of(&self, name: &str) -> Option<&str> {
        self.configs.get(name).and_then(|c| c.next_action.as_deref())
    }

    pub fn prev_of(&self, name: &str) -> Option<&str> {
        self.configs.get(name).and_then(|c| c.prev_action.as_deref())
    }

    pub fn is_last(&self, name: &str) -> bool {
        self.is_step(name) && self.next_of(name).is_none()
    }

    pub fn first_step(&self) -> &str {
        self.steps
            .values()
            .next()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn step_count(&self) -> u32 {
        self.steps.len() as u32
    }

    pub fn steps(&self) -> &BTreeMap<u32, String> {
        &self.steps
    }

    pub fn steps_data(&self, step_index: u32) -> StepsData {
        StepsData {
            steps: self.steps.clone(),
            step_index,
        }
    }

    pub fn view_action_name(&self, step: &str) -> String {
        format!("{}{}", step, self.view_postfix)
    }

    /// The step a view action shows, if `name` is the view of a flow step.
    pub fn step_of_view<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_suffix(self.view_postfix.as_str())
            .filter(|step| self.is_step(step))
    }
}
