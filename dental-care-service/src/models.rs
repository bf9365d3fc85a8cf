use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// Field names of the wizard state, shared by steps, edges and review rules
pub mod state_keys {
    pub const TERMS_AND_CONDITIONS: &str = "terms_and_conditions";
    pub const TAX_FILING: &str = "tax_filing";
    pub const TYPE_OF_APPLICATION: &str = "type_of_application";
    pub const TYPE_OF_RENEWAL: &str = "type_of_renewal";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    /// Derived on load from the date of birth, never submitted.
    pub const AGE_CATEGORY: &str = "age_category";
    pub const LIVING_INDEPENDENTLY: &str = "living_independently";
    pub const APPLICANT_INFORMATION: &str = "applicant_information";
    pub const MARITAL_STATUS: &str = "marital_status";
    pub const HAS_MARITAL_STATUS_CHANGED: &str = "has_marital_status_changed";
    pub const PARTNER_INFORMATION: &str = "partner_information";
    pub const CONTACT_INFORMATION: &str = "contact_information";
    pub const HAS_ADDRESS_CHANGED: &str = "has_address_changed";
    pub const MAILING_ADDRESS: &str = "mailing_address";
    pub const HOME_ADDRESS: &str = "home_address";
    pub const COMMUNICATION_PREFERENCES: &str = "communication_preferences";
    pub const DENTAL_INSURANCE: &str = "dental_insurance";
    pub const HAS_DENTAL_BENEFITS_CHANGED: &str = "has_dental_benefits_changed";
    pub const DENTAL_BENEFITS: &str = "dental_benefits";
    pub const CHILDREN: &str = "children";
    /// Authenticated client, seeded when a protected flow starts.
    pub const CLIENT_NUMBER: &str = "client_number";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsAndConditions {
    pub acknowledge_terms: bool,
    pub acknowledge_privacy: bool,
    pub share_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeOfApplication {
    Adult,
    Child,
    AdultChild,
    Delegate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeOfRenewal {
    Adult,
    AdultChild,
    Child,
    Delegate,
    Ita,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantInformation {
    pub first_name: String,
    pub last_name: String,
    pub social_insurance_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub social_insurance_number: String,
    pub confirm: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredLanguage {
    En,
    Fr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredMethod {
    Email,
    Mail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationPreferences {
    pub preferred_language: PreferredLanguage,
    pub preferred_method: PreferredMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DentalBenefits {
    pub has_federal_benefits: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federal_social_program: Option<String>,
    pub has_provincial_territorial_benefits: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provincial_territorial_social_program: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub is_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_insurance_number: Option<String>,
}

/// One child of the household. The child is complete once every
/// sub-answer has been given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildState {
    pub id: String,
    #[serde(default)]
    pub information: Option<ChildInformation>,
    #[serde(default)]
    pub dental_insurance: Option<bool>,
    #[serde(default)]
    pub dental_benefits: Option<DentalBenefits>,
}

impl ChildState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            information: None,
            dental_insurance: None,
            dental_benefits: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.information.is_some() && self.dental_insurance.is_some() && self.dental_benefits.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionInfo {
    pub confirmation_code: String,
    pub submitted_on: DateTime<Utc>,
}

/// Reference years quoted in page copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationYear {
    pub intake_year: i32,
    pub tax_year: i32,
}

impl ApplicationYear {
    pub fn for_date(today: NaiveDate) -> Self {
        Self {
            intake_year: today.year(),
            tax_year: today.year() - 1,
        }
    }
}
