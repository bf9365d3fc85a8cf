use std::marker::PhantomData;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use wizard_flow::{Result, Step, StepRequest, StepResult, WizardState};

use super::accept;
use crate::{models::TermsAndConditions, validation::FieldErrors};

/// Yes/no question stored under `field`. A "no" clears the answers that
/// only make sense after a "yes".
pub struct YesNoStep {
    id: &'static str,
    field: &'static str,
    cleared_on_no: &'static [&'static str],
}

impl YesNoStep {
    pub fn new(id: &'static str, field: &'static str) -> Self {
        Self {
            id,
            field,
            cleared_on_no: &[],
        }
    }

    pub fn clearing_on_no(mut self, fields: &'static [&'static str]) -> Self {
        self.cleared_on_no = fields;
        self
    }
}

#[async_trait]
impl Step for YesNoStep {
    fn id(&self) -> &str {
        self.id
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let mut errors = FieldErrors::new();
        let Some(answer) = errors.required_bool(self.field, request.input.get(self.field).and_then(|v| v.as_bool()))
        else {
            return Ok(StepResult::Rejected(errors.into_vec()));
        };

        let mut partial = WizardState::new().with(self.field, answer)?;
        if !answer {
            for field in self.cleared_on_no {
                partial.unset(*field);
            }
        }
        Ok(StepResult::Accepted(partial))
    }
}

/// Single choice among the variants of `T`, stored under `field`.
pub struct ChoiceStep<T> {
    id: &'static str,
    field: &'static str,
    _choice: PhantomData<fn() -> T>,
}

impl<T> ChoiceStep<T> {
    pub fn new(id: &'static str, field: &'static str) -> Self {
        Self {
            id,
            field,
            _choice: PhantomData,
        }
    }
}

#[async_trait]
impl<T> Step for ChoiceStep<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        self.id
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        match request.input.get(self.field).cloned() {
            None => Ok(StepResult::rejected(self.field, "required")),
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(choice) => accept(self.field, choice),
                Err(_) => Ok(StepResult::rejected(self.field, "invalid")),
            },
        }
    }
}

pub struct TermsAndConditionsStep;

#[async_trait]
impl Step for TermsAndConditionsStep {
    fn id(&self) -> &str {
        super::ids::TERMS_AND_CONDITIONS
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let field = |name: &str| request.input.get(name).and_then(|v| v.as_bool());

        let mut errors = FieldErrors::new();
        errors.accepted("acknowledge_terms", field("acknowledge_terms"));
        errors.accepted("acknowledge_privacy", field("acknowledge_privacy"));
        errors.accepted("share_data", field("share_data"));
        if !errors.is_empty() {
            return Ok(StepResult::Rejected(errors.into_vec()));
        }

        accept(
            crate::models::state_keys::TERMS_AND_CONDITIONS,
            TermsAndConditions {
                acknowledge_terms: true,
                acknowledge_privacy: true,
                share_data: true,
            },
        )
    }
}
