use serde::{Deserialize, Serialize};
use wizard_flow::{AgeCategory, WizardState};

use crate::models::{ChildState, TypeOfApplication, TypeOfRenewal, state_keys};

/// Marital status codes meaning "lives with a partner". Configured per
/// environment, see `MARITAL_STATUS_CODE_MARRIED` / `MARITAL_STATUS_CODE_COMMONLAW`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaritalStatusCodes {
    pub married: String,
    pub common_law: String,
}

impl Default for MaritalStatusCodes {
    fn default() -> Self {
        Self {
            married: "1".to_string(),
            common_law: "2".to_string(),
        }
    }
}

/// True only for the configured married or common-law codes. Unknown codes
/// mean no partner.
pub fn applicant_has_partner(marital_status: &str, codes: &MaritalStatusCodes) -> bool {
    marital_status == codes.married || marital_status == codes.common_law
}

/// Children in original order; incomplete ones are dropped unless asked for.
pub fn children_state(children: &[ChildState], include_incomplete: bool) -> Vec<ChildState> {
    children
        .iter()
        .filter(|child| include_incomplete || child.is_complete())
        .cloned()
        .collect()
}

/// Typed accessors over the answers used for branching.
pub trait HouseholdState {
    fn tax_filing(&self) -> Option<bool>;
    fn type_of_application(&self) -> Option<TypeOfApplication>;
    fn type_of_renewal(&self) -> Option<TypeOfRenewal>;
    fn age_category(&self) -> Option<AgeCategory>;
    fn has_partner(&self, codes: &MaritalStatusCodes) -> bool;
    fn flag(&self, key: &str) -> Option<bool>;
    fn children(&self) -> Vec<ChildState>;

    fn complete_children(&self) -> Vec<ChildState> {
        children_state(&self.children(), false)
    }

    fn has_incomplete_child(&self) -> bool {
        self.children().iter().any(|child| !child.is_complete())
    }
}

impl HouseholdState for WizardState {
    fn tax_filing(&self) -> Option<bool> {
        self.get(state_keys::TAX_FILING)
    }

    fn type_of_application(&self) -> Option<TypeOfApplication> {
        self.get(state_keys::TYPE_OF_APPLICATION)
    }

    fn type_of_renewal(&self) -> Option<TypeOfRenewal> {
        self.get(state_keys::TYPE_OF_RENEWAL)
    }

    fn age_category(&self) -> Option<AgeCategory> {
        self.get(state_keys::AGE_CATEGORY)
    }

    fn has_partner(&self, codes: &MaritalStatusCodes) -> bool {
        self.get::<String>(state_keys::MARITAL_STATUS)
            .is_some_and(|status| applicant_has_partner(&status, codes))
    }

    fn flag(&self, key: &str) -> Option<bool> {
        self.get(key)
    }

    fn children(&self) -> Vec<ChildState> {
        self.get(state_keys::CHILDREN).unwrap_or_default()
    }
}
