use async_trait::async_trait;
use serde::Deserialize;
use wizard_flow::{
    AgeCategory, Result, Step, StepRequest, StepResult, WizardState, age::DATE_FORMAT,
    age_category_from_age, age_in_years,
};

use super::{accept, ids};
use crate::{
    household::{MaritalStatusCodes, applicant_has_partner},
    models::{ApplicantInformation, PartnerInformation, state_keys},
    validation::{FieldErrors, parse_form},
};

/// Oldest age accepted on a date of birth
const MAX_AGE: i32 = 150;

#[derive(Deserialize)]
struct DateOfBirthForm {
    #[serde(default)]
    date_of_birth: Option<String>,
}

pub struct DateOfBirthStep;

#[async_trait]
impl Step for DateOfBirthStep {
    fn id(&self) -> &str {
        ids::DATE_OF_BIRTH
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: DateOfBirthForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        let Some(date_of_birth) =
            errors.past_date("date_of_birth", form.date_of_birth.as_deref(), request.today)
        else {
            return Ok(StepResult::Rejected(errors.into_vec()));
        };

        let age = age_in_years(date_of_birth, request.today);
        if age > MAX_AGE {
            return Ok(StepResult::rejected("date_of_birth", "invalid"));
        }

        let mut partial = WizardState::new().with(
            state_keys::DATE_OF_BIRTH,
            date_of_birth.format(DATE_FORMAT).to_string(),
        )?;
        if age_category_from_age(f64::from(age))? != AgeCategory::Youth {
            partial.unset(state_keys::LIVING_INDEPENDENTLY);
        }
        Ok(StepResult::Accepted(partial))
    }
}

#[derive(Deserialize)]
struct ApplicantInformationForm {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    social_insurance_number: Option<String>,
    #[serde(default)]
    client_number: Option<String>,
}

/// Names and SIN of the primary applicant. Renewals also ask for the
/// client number printed on the renewal letter.
pub struct ApplicantInformationStep {
    require_client_number: bool,
}

impl ApplicantInformationStep {
    pub fn new() -> Self {
        Self {
            require_client_number: false,
        }
    }

    pub fn for_renewal() -> Self {
        Self {
            require_client_number: true,
        }
    }
}

impl Default for ApplicantInformationStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Step for ApplicantInformationStep {
    fn id(&self) -> &str {
        ids::APPLICANT_INFORMATION
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: ApplicantInformationForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        let first_name = errors.name("first_name", form.first_name.as_deref());
        let last_name = errors.name("last_name", form.last_name.as_deref());
        let sin = errors.sin("social_insurance_number", form.social_insurance_number.as_deref());
        let client_number = if self.require_client_number {
            errors.required_text("client_number", form.client_number.as_deref())
        } else {
            None
        };

        let partner: Option<PartnerInformation> = request.state.get(state_keys::PARTNER_INFORMATION);
        if let (Some(sin), Some(partner)) = (&sin, &partner) {
            if *sin == partner.social_insurance_number {
                errors.push("social_insurance_number", "matches-partner");
            }
        }

        let (Some(first_name), Some(last_name), Some(social_insurance_number)) = (first_name, last_name, sin)
        else {
            return Ok(StepResult::Rejected(errors.into_vec()));
        };
        if !errors.is_empty() {
            return Ok(StepResult::Rejected(errors.into_vec()));
        }

        accept(
            state_keys::APPLICANT_INFORMATION,
            ApplicantInformation {
                first_name,
                last_name,
                social_insurance_number,
                client_number,
            },
        )
    }
}

/// Marital status code. Choosing a status without a partner drops any
/// partner information given earlier.
pub struct MaritalStatusStep {
    codes: MaritalStatusCodes,
}

impl MaritalStatusStep {
    pub fn new(codes: MaritalStatusCodes) -> Self {
        Self { codes }
    }
}

#[async_trait]
impl Step for MaritalStatusStep {
    fn id(&self) -> &str {
        ids::MARITAL_STATUS
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let mut errors = FieldErrors::new();
        let raw = request.input.get("marital_status").and_then(|v| v.as_str());
        let Some(marital_status) = errors.required_text("marital_status", raw) else {
            return Ok(StepResult::Rejected(errors.into_vec()));
        };

        let has_partner = applicant_has_partner(&marital_status, &self.codes);
        let mut partial = WizardState::new().with(state_keys::MARITAL_STATUS, marital_status)?;
        if !has_partner {
            partial.unset(state_keys::PARTNER_INFORMATION);
        }
        Ok(StepResult::Accepted(partial))
    }
}

#[derive(Deserialize)]
struct PartnerInformationForm {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    social_insurance_number: Option<String>,
    #[serde(default)]
    confirm: Option<bool>,
}

pub struct PartnerInformationStep;

#[async_trait]
impl Step for PartnerInformationStep {
    fn id(&self) -> &str {
        ids::PARTNER_INFORMATION
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: PartnerInformationForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        let first_name = errors.name("first_name", form.first_name.as_deref());
        let last_name = errors.name("last_name", form.last_name.as_deref());
        let date_of_birth = errors.past_date("date_of_birth", form.date_of_birth.as_deref(), request.today);
        let sin = errors.sin("social_insurance_number", form.social_insurance_number.as_deref());
        let confirm = errors.accepted("confirm", form.confirm);

        let applicant: Option<ApplicantInformation> = request.state.get(state_keys::APPLICANT_INFORMATION);
        if let (Some(sin), Some(applicant)) = (&sin, &applicant) {
            if *sin == applicant.social_insurance_number {
                errors.push("social_insurance_number", "matches-applicant");
            }
        }

        match (first_name, last_name, date_of_birth, sin) {
            (Some(first_name), Some(last_name), Some(date_of_birth), Some(social_insurance_number))
                if confirm && errors.is_empty() =>
            {
                accept(
                    state_keys::PARTNER_INFORMATION,
                    PartnerInformation {
                        first_name,
                        last_name,
                        date_of_birth: date_of_birth.format(DATE_FORMAT).to_string(),
                        social_insurance_number,
                        confirm,
                    },
                )
            }
            _ => Ok(StepResult::Rejected(errors.into_vec())),
        }
    }
}
