use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::Result, state::WizardState};

/// A page of a flow, addressed by flow id and step slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub flow: String,
    pub step: String,
}

impl Route {
    pub fn new(flow: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            flow: flow.into(),
            step: step.into(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.flow, self.step)
    }
}

/// Either carry on rendering the requested page or send the user elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Proceed(T),
    RedirectTo(Route),
}

/// A single invalid input, identified by form field and message code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
        }
    }
}

/// What a step gets to look at when the user submits its form.
pub struct StepRequest<'a> {
    pub input: &'a Value,
    pub state: &'a WizardState,
    pub today: NaiveDate,
}

/// Result of submitting a step's form
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// Input was valid; the partial state is merged into the session.
    Accepted(WizardState),
    /// Input was invalid; nothing is saved and the page is shown again.
    Rejected(Vec<FieldError>),
}

impl StepResult {
    pub fn rejected(field: impl Into<String>, code: impl Into<String>) -> Self {
        StepResult::Rejected(vec![FieldError::new(field, code)])
    }
}

/// Core trait that every wizard step implements
#[async_trait]
pub trait Step: Send + Sync {
    /// Slug of the step, unique within a flow
    fn id(&self) -> &str;

    /// Validate the submitted form and produce the answers to store.
    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult>;
}
