// Wizard steps shared by the apply, renew and protected flows
pub mod applicant;
pub mod benefits;
pub mod children;
pub mod contact;
pub mod questions;

pub use applicant::{ApplicantInformationStep, DateOfBirthStep, MaritalStatusStep, PartnerInformationStep};
pub use benefits::DentalBenefitsStep;
pub use children::{
    ChildDentalBenefitsStep, ChildDentalInsuranceStep, ChildInformationStep, ChildrenStep, RemoveChildStep,
};
pub use contact::{AddressStep, CommunicationPreferencesStep, ContactInformationStep};
pub use questions::{ChoiceStep, TermsAndConditionsStep, YesNoStep};

use wizard_flow::{StepResult, WizardState};

/// Step and page slugs, as they appear in URLs
pub mod ids {
    pub const TERMS_AND_CONDITIONS: &str = "terms-and-conditions";
    pub const TAX_FILING: &str = "tax-filing";
    pub const TYPE_APPLICATION: &str = "type-application";
    pub const TYPE_RENEWAL: &str = "type-renewal";
    pub const DATE_OF_BIRTH: &str = "date-of-birth";
    pub const LIVING_INDEPENDENTLY: &str = "living-independently";
    pub const APPLICANT_INFORMATION: &str = "applicant-information";
    pub const MARITAL_STATUS: &str = "marital-status";
    pub const HAS_MARITAL_STATUS_CHANGED: &str = "has-marital-status-changed";
    pub const PARTNER_INFORMATION: &str = "partner-information";
    pub const CONTACT_INFORMATION: &str = "contact-information";
    pub const HAS_ADDRESS_CHANGED: &str = "has-address-changed";
    pub const MAILING_ADDRESS: &str = "mailing-address";
    pub const HOME_ADDRESS: &str = "home-address";
    pub const COMMUNICATION_PREFERENCES: &str = "communication-preferences";
    pub const DENTAL_INSURANCE: &str = "dental-insurance";
    pub const HAS_DENTAL_BENEFITS_CHANGED: &str = "has-dental-benefits-changed";
    pub const DENTAL_BENEFITS: &str = "dental-benefits";
    pub const CHILDREN: &str = "children";
    pub const REMOVE_CHILD: &str = "remove-child";
    pub const CHILD_INFORMATION: &str = "child-information";
    pub const CHILD_DENTAL_INSURANCE: &str = "child-dental-insurance";
    pub const CHILD_DENTAL_BENEFITS: &str = "child-dental-benefits";

    // Pages without a form
    pub const FILE_TAXES: &str = "file-taxes";
    pub const PARENT_OR_GUARDIAN: &str = "parent-or-guardian";
    pub const APPLICATION_DELEGATE: &str = "application-delegate";
    pub const RENEWAL_DELEGATE: &str = "renewal-delegate";
}

/// Accept a single answer.
fn accept(key: &str, value: impl serde::Serialize) -> wizard_flow::Result<StepResult> {
    Ok(StepResult::Accepted(WizardState::new().with(key, value)?))
}
