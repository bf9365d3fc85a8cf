use async_trait::async_trait;
use serde::Deserialize;
use wizard_flow::{Result, Step, StepRequest, StepResult};

use super::{accept, ids};
use crate::{
    models::{
        Address, CommunicationPreferences, ContactInformation, PreferredLanguage, PreferredMethod,
        state_keys,
    },
    validation::{CANADA, FieldErrors, USA, is_valid_email, is_valid_phone_number, is_valid_postal_code, parse_form},
};

#[derive(Deserialize)]
struct ContactInformationForm {
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    confirm_email: Option<String>,
}

pub struct ContactInformationStep;

#[async_trait]
impl Step for ContactInformationStep {
    fn id(&self) -> &str {
        ids::CONTACT_INFORMATION
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: ContactInformationForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        let phone_number = non_blank(form.phone_number);
        let email = non_blank(form.email);

        if let Some(phone) = &phone_number {
            if !is_valid_phone_number(phone) {
                errors.push("phone_number", "invalid");
            }
        }
        if let Some(email) = &email {
            if !is_valid_email(email) {
                errors.push("email", "invalid");
            } else if non_blank(form.confirm_email).as_deref() != Some(email.as_str()) {
                errors.push("confirm_email", "mismatch");
            }
        }
        if !errors.is_empty() {
            return Ok(StepResult::Rejected(errors.into_vec()));
        }

        accept(
            state_keys::CONTACT_INFORMATION,
            ContactInformation { phone_number, email },
        )
    }
}

#[derive(Deserialize)]
struct AddressForm {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    apartment: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    province: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

/// Mailing or home address, stored under `field`.
pub struct AddressStep {
    id: &'static str,
    field: &'static str,
}

impl AddressStep {
    pub fn mailing() -> Self {
        Self {
            id: ids::MAILING_ADDRESS,
            field: state_keys::MAILING_ADDRESS,
        }
    }

    pub fn home() -> Self {
        Self {
            id: ids::HOME_ADDRESS,
            field: state_keys::HOME_ADDRESS,
        }
    }
}

#[async_trait]
impl Step for AddressStep {
    fn id(&self) -> &str {
        self.id
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: AddressForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        let address = errors.required_text("address", form.address.as_deref());
        let city = errors.required_text("city", form.city.as_deref());
        let country = errors
            .required_text("country", form.country.as_deref())
            .map(|c| c.to_uppercase());

        let north_american = matches!(country.as_deref(), Some(CANADA) | Some(USA));
        let province = if north_american {
            errors.required_text("province", form.province.as_deref())
        } else {
            non_blank(form.province)
        };
        let postal_code = if north_american {
            errors.required_text("postal_code", form.postal_code.as_deref())
        } else {
            non_blank(form.postal_code)
        };

        if let (Some(country), Some(postal_code)) = (&country, &postal_code) {
            if !is_valid_postal_code(country, postal_code) {
                errors.push("postal_code", "invalid");
            }
        }

        match (address, city, country) {
            (Some(address), Some(city), Some(country)) if errors.is_empty() => accept(
                self.field,
                Address {
                    address,
                    apartment: non_blank(form.apartment),
                    city,
                    province,
                    postal_code: postal_code.map(|p| p.to_uppercase()),
                    country,
                },
            ),
            _ => Ok(StepResult::Rejected(errors.into_vec())),
        }
    }
}

#[derive(Deserialize)]
struct CommunicationPreferencesForm {
    #[serde(default)]
    preferred_language: Option<PreferredLanguage>,
    #[serde(default)]
    preferred_method: Option<PreferredMethod>,
}

/// Letters by email need an email address on file.
pub struct CommunicationPreferencesStep;

#[async_trait]
impl Step for CommunicationPreferencesStep {
    fn id(&self) -> &str {
        ids::COMMUNICATION_PREFERENCES
    }

    async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
        let form: CommunicationPreferencesForm = match parse_form(request.input) {
            Ok(form) => form,
            Err(errors) => return Ok(StepResult::Rejected(errors)),
        };

        let mut errors = FieldErrors::new();
        if form.preferred_language.is_none() {
            errors.push("preferred_language", "required");
        }
        if form.preferred_method.is_none() {
            errors.push("preferred_method", "required");
        }

        let has_email = request
            .state
            .get::<ContactInformation>(state_keys::CONTACT_INFORMATION)
            .and_then(|contact| contact.email)
            .is_some();
        if form.preferred_method == Some(PreferredMethod::Email) && !has_email {
            errors.push("preferred_method", "email-required");
        }

        match (form.preferred_language, form.preferred_method) {
            (Some(preferred_language), Some(preferred_method)) if errors.is_empty() => accept(
                state_keys::COMMUNICATION_PREFERENCES,
                CommunicationPreferences {
                    preferred_language,
                    preferred_method,
                },
            ),
            _ => Ok(StepResult::Rejected(errors.into_vec())),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
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

    #[tokio::test]
    async fn test_canadian_address_needs_province_and_valid_postal_code() {
        let state = WizardState::new();
        let result = submit(
            &AddressStep::mailing(),
            &state,
            json!({ "address": "111 Wellington St", "city": "Ottawa", "country": "can", "postal_code": "12345" }),
        )
        .await;

        assert_eq!(
            result,
            StepResult::Rejected(vec![
                FieldError::new("province", "required"),
                FieldError::new("postal_code", "invalid"),
            ])
        );
    }

    #[tokio::test]
    async fn test_foreign_address_is_free_form() {
        let state = WizardState::new();
        let StepResult::Accepted(partial) = submit(
            &AddressStep::home(),
            &state,
            json!({ "address": "1 Rue de Rivoli", "city": "Paris", "country": "FRA", "postal_code": "75001" }),
        )
        .await
        else {
            panic!("expected accepted");
        };
        let address: Address = partial.get(state_keys::HOME_ADDRESS).unwrap();
        assert_eq!(address.country, "FRA");
        assert_eq!(address.province, None);
    }

    #[tokio::test]
    async fn test_email_confirmation_must_match() {
        let state = WizardState::new();
        let result = submit(
            &ContactInformationStep,
            &state,
            json!({ "email": "a@example.ca", "confirm_email": "b@example.ca" }),
        )
        .await;
        assert_eq!(result, StepResult::rejected("confirm_email", "mismatch"));
    }

    #[tokio::test]
    async fn test_email_preference_needs_email_on_file() {
        let input = json!({ "preferred_language": "fr", "preferred_method": "email" });

        let without_email = WizardState::new();
        assert_eq!(
            submit(&CommunicationPreferencesStep, &without_email, input.clone()).await,
            StepResult::rejected("preferred_method", "email-required")
        );

        let with_email = WizardState::new()
            .with(state_keys::CONTACT_INFORMATION, json!({ "email": "a@example.ca" }))
            .unwrap();
        assert!(matches!(
            submit(&CommunicationPreferencesStep, &with_email, input).await,
            StepResult::Accepted(_)
        ));
    }
}
