use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;
use wizard_flow::{
    AgeCategory, Result, Step, StepRequest, StepResult, age::DATE_FORMAT, age_category_from_age,
    age_in_years,
};

use super::{accept, benefits::parse_dental_benefits, ids};
use crate::{
    household::HouseholdState,
    models::{ChildInformation, ChildState, state_keys},
    validation::{FieldErrors, normalize_sin, parse_form},
};

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ChildrenAction {
    Add,
    Continue,
}

#[derive(Deserialize)]
struct ChildrenForm {
    action: ChildrenAction,
}

/// Children summary. `add` starts a new child record; `continue` moves on
/// with the completed children, discarding any left half-filled.
pub struct ChildrenStep;

#[async_trait]
impl Step for ChildrenStep {
    fn id(&self) -> &str {
        ids::CHILDREN
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: ChildrenForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(_) => return Ok(StepResult::rejected("action", "invalid")),
        };

        let mut children = request.state.children();
        match form.action {
            ChildrenAction::Add => {
                children.push(ChildState::new(Uuid::new_v4().to_string()));
            }
            ChildrenAction::Continue => {
                children.retain(ChildState::is_complete);
                if children.is_empty() {
                    return Ok(StepResult::rejected("children", "required"));
                }
            }
        }
        accept(state_keys::CHILDREN, children)
    }
}

/// Removes one child, then returns to the summary.
pub struct RemoveChildStep;

#[async_trait]
impl Step for RemoveChildStep {
    fn id(&self) -> &str {
        ids::REMOVE_CHILD
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let child_id = request.input.get("child_id").and_then(|v| v.as_str());
        let mut children = request.state.children();
        let before = children.len();
        children.retain(|child| Some(child.id.as_str()) != child_id);

        if children.len() == before {
            return Ok(StepResult::rejected("child_id", "not-found"));
        }
        accept(state_keys::CHILDREN, children)
    }
}

/// Apply `update` to the child named by the form's `child_id`.
fn update_child<F>(request: &StepRequest<'_>, update: F) -> Result<StepResult>
where
    F: FnOnce(&mut ChildState),
{
    let child_id = request.input.get("child_id").and_then(|v| v.as_str());
    let mut children = request.state.children();
    let Some(child) = children.iter_mut().find(|child| Some(child.id.as_str()) == child_id) else {
        return Ok(StepResult::rejected("child_id", "not-found"));
    };
    update(child);
    accept(state_keys::CHILDREN, children)
}

#[derive(Deserialize)]
struct ChildInformationForm {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    is_parent: Option<bool>,
    #[serde(default)]
    social_insurance_number: Option<String>,
}

pub struct ChildInformationStep;

#[async_trait]
impl Step for ChildInformationStep {
    fn id(&self) -> &str {
        ids::CHILD_INFORMATION
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: ChildInformationForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        let first_name = errors.name("first_name", form.first_name.as_deref());
        let last_name = errors.name("last_name", form.last_name.as_deref());
        let date_of_birth = errors.past_date("date_of_birth", form.date_of_birth.as_deref(), request.today);
        let is_parent = errors.required_bool("is_parent", form.is_parent);

        if let Some(date_of_birth) = date_of_birth {
            let age = age_in_years(date_of_birth, request.today);
            if matches!(
                age_category_from_age(f64::from(age))?,
                AgeCategory::Adults | AgeCategory::Seniors
            ) {
                errors.push("date_of_birth", "too-old");
            }
        }
        if is_parent == Some(false) {
            errors.push("is_parent", "must-be-parent");
        }

        let social_insurance_number = match form
            .social_insurance_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(raw) => match normalize_sin(raw) {
                Some(sin) => Some(sin),
                None => {
                    errors.push("social_insurance_number", "invalid");
                    None
                }
            },
            None => None,
        };

        let information = match (first_name, last_name, date_of_birth, is_parent) {
            (Some(first_name), Some(last_name), Some(date_of_birth), Some(is_parent)) if errors.is_empty() => {
                ChildInformation {
                    first_name,
                    last_name,
                    date_of_birth: date_of_birth.format(DATE_FORMAT).to_string(),
                    is_parent,
                    social_insurance_number,
                }
            }
            _ => return Ok(StepResult::Rejected(errors.into_vec())),
        };

        update_child(&request, |child| child.information = Some(information))
    }
}

pub struct ChildDentalInsuranceStep;

#[async_trait]
impl Step for ChildDentalInsuranceStep {
    fn id(&self) -> &str {
        ids::CHILD_DENTAL_INSURANCE
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let Some(dental_insurance) = request.input.get("dental_insurance").and_then(|v| v.as_bool()) else {
            return Ok(StepResult::rejected("dental_insurance", "required"));
        };
        update_child(&request, |child| child.dental_insurance = Some(dental_insurance))
    }
}

pub struct ChildDentalBenefitsStep;

#[async_trait]
impl Step for ChildDentalBenefitsStep {
    fn id(&self) -> &str {
        ids::CHILD_DENTAL_BENEFITS
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        match parse_dental_benefits(request.input) {
            Ok(benefits) => update_child(&request, |child| child.dental_benefits = Some(benefits)),
            Err(errors) => Ok(StepResult::Rejected(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use wizard_flow::{FieldError, WizardState};

    async fn submit(step: &dyn Step, state: &WizardState, input: Value) -> StepResult {
        step.submit(StepRequest {
            input: &input,
            state,
            today: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        })
        .await
        .unwrap()
    }

    fn accepted(result: StepResult) -> WizardState {
        match result {
            StepResult::Accepted(partial) => partial,
            StepResult::Rejected(errors) => panic!("rejected: {errors:?}"),
        }
    }

    #[tokio::test]
    async fn test_child_lifecycle() {
        let mut state = WizardState::new();

        state.merge(accepted(submit(&ChildrenStep, &state, json!({ "action": "add" })).await));
        let children = state.children();
        assert_eq!(children.len(), 1);
        let child_id = children[0].id.clone();

        state.merge(accepted(
            submit(
                &ChildInformationStep,
                &state,
                json!({
                    "child_id": child_id,
                    "first_name": "Noah",
                    "last_name": "Roy",
                    "date_of_birth": "2015-07-01",
                    "is_parent": true
                }),
            )
            .await,
        ));
        state.merge(accepted(
            submit(
                &ChildDentalInsuranceStep,
                &state,
                json!({ "child_id": child_id, "dental_insurance": false }),
            )
            .await,
        ));
        assert!(state.has_incomplete_child());

        state.merge(accepted(
            submit(
                &ChildDentalBenefitsStep,
                &state,
                json!({
                    "child_id": child_id,
                    "has_federal_benefits": false,
                    "has_provincial_territorial_benefits": false
                }),
            )
            .await,
        ));
        assert!(!state.has_incomplete_child());
        assert_eq!(state.complete_children().len(), 1);
    }

    #[tokio::test]
    async fn test_continue_discards_incomplete_children() {
        let state = WizardState::new()
            .with(state_keys::CHILDREN, vec![ChildState::new("draft")])
            .unwrap();
        assert_eq!(
            submit(&ChildrenStep, &state, json!({ "action": "continue" })).await,
            StepResult::rejected("children", "required")
        );
    }

    #[tokio::test]
    async fn test_child_must_be_minor_with_parent_applying() {
        let state = WizardState::new()
            .with(state_keys::CHILDREN, vec![ChildState::new("c1")])
            .unwrap();
        let result = submit(
            &ChildInformationStep,
            &state,
            json!({
                "child_id": "c1",
                "first_name": "Emma",
                "last_name": "Roy",
                "date_of_birth": "2000-01-01",
                "is_parent": false
            }),
        )
        .await;
        assert_eq!(
            result,
            StepResult::Rejected(vec![
                FieldError::new("date_of_birth", "too-old"),
                FieldError::new("is_parent", "must-be-parent"),
            ])
        );
    }

    #[tokio::test]
    async fn test_unknown_child_is_rejected() {
        let state = WizardState::new();
        assert_eq!(
            submit(&ChildDentalInsuranceStep, &state, json!({ "child_id": "nope", "dental_insurance": true })).await,
            StepResult::rejected("child_id", "not-found")
        );
        assert_eq!(
            submit(&RemoveChildStep, &state, json!({ "child_id": "nope" })).await,
            StepResult::rejected("child_id", "not-found")
        );
    }
}
