use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use wizard_flow::{FieldError, Result, Step, StepRequest, StepResult};

use super::{accept, ids};
use crate::{
    models::{DentalBenefits, state_keys},
    validation::{FieldErrors, parse_form},
};

#[derive(Deserialize)]
struct DentalBenefitsForm {
    #[serde(default)]
    has_federal_benefits: Option<bool>,
    #[serde(default)]
    federal_social_program: Option<String>,
    #[serde(default)]
    has_provincial_territorial_benefits: Option<bool>,
    #[serde(default)]
    province: Option<String>,
    #[serde(default)]
    provincial_territorial_social_program: Option<String>,
}

/// Parse the federal / provincial-territorial benefits questions. Programs
/// are only kept when the matching answer is yes.
pub(crate) fn parse_dental_benefits(input: &Value) -> std::result::Result<DentalBenefits, Vec<FieldError>> {
    let form: DentalBenefitsForm = parse_form(input)?;

    let mut errors = FieldErrors::new();
    let has_federal_benefits = errors.required_bool("has_federal_benefits", form.has_federal_benefits);
    let has_provincial_territorial_benefits = errors.required_bool(
        "has_provincial_territorial_benefits",
        form.has_provincial_territorial_benefits,
    );

    let federal_social_program = if has_federal_benefits == Some(true) {
        errors.required_text("federal_social_program", form.federal_social_program.as_deref())
    } else {
        None
    };
    let (province, provincial_territorial_social_program) = if has_provincial_territorial_benefits == Some(true) {
        (
            errors.required_text("province", form.province.as_deref()),
            errors.required_text(
                "provincial_territorial_social_program",
                form.provincial_territorial_social_program.as_deref(),
            ),
        )
    } else {
        (None, None)
    };

    match (has_federal_benefits, has_provincial_territorial_benefits) {
        (Some(has_federal_benefits), Some(has_provincial_territorial_benefits)) if errors.is_empty() => {
            Ok(DentalBenefits {
                has_federal_benefits,
                federal_social_program,
                has_provincial_territorial_benefits,
                province,
                provincial_territorial_social_program,
            })
        }
        _ => Err(errors.into_vec()),
    }
}

pub struct DentalBenefitsStep;

#[async_trait]
impl Step for DentalBenefitsStep {
    fn id(&self) -> &str {
        ids::DENTAL_BENEFITS
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        match parse_dental_benefits(request.input) {
            Ok(benefits) => accept(state_keys::DENTAL_BENEFITS, benefits),
            Err(errors) => Ok(StepResult::Rejected(errors)),
        }
    }
}
