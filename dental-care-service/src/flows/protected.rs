use std::sync::Arc;

use wizard_flow::{Flow, FlowBuilder, REVIEW_STEP};

use super::{PROTECTED_RENEW_NAMESPACE, flow_ids, sections};
use crate::{
    household::MaritalStatusCodes,
    models::state_keys,
    steps::{TermsAndConditionsStep, ids},
};

/// Renewal for a signed-in client. Identity comes from the session, so the
/// flow starts with the client number already in its state.
pub fn renew(codes: &MaritalStatusCodes) -> Flow {
    let builder = FlowBuilder::new(flow_ids::PROTECTED_RENEW)
        .namespace(PROTECTED_RENEW_NAMESPACE)
        .add_step(Arc::new(TermsAndConditionsStep))
        .add_edge(ids::TERMS_AND_CONDITIONS, ids::TAX_FILING)
        .require(state_keys::CLIENT_NUMBER, ids::TERMS_AND_CONDITIONS)
        .require(state_keys::TERMS_AND_CONDITIONS, ids::TERMS_AND_CONDITIONS);
    let builder = sections::tax_filing(builder, ids::HAS_MARITAL_STATUS_CHANGED);
    let builder = sections::marital_status_change(builder, codes, ids::HAS_ADDRESS_CHANGED);
    let builder = sections::address_change(builder, ids::DENTAL_INSURANCE);
    let builder = sections::dental_coverage_change(builder, ids::CONTACT_INFORMATION);
    let builder = sections::contact_information(builder, ids::COMMUNICATION_PREFERENCES);
    sections::communication_preferences(builder, REVIEW_STEP).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wizard_flow::WizardState;

    #[test]
    fn test_review_needs_client_number() {
        let flow = renew(&MaritalStatusCodes::default());
        let answers = json!({
            "terms_and_conditions": { "acknowledge_terms": true, "acknowledge_privacy": true, "share_data": true },
            "tax_filing": true,
            "has_marital_status_changed": false,
            "has_address_changed": false,
            "dental_insurance": false,
            "has_dental_benefits_changed": false,
            "contact_information": {},
            "communication_preferences": { "preferred_language": "fr", "preferred_method": "mail" }
        });

        let anonymous = WizardState::from_value(answers).unwrap();
        let rule = flow.first_incomplete(&anonymous).unwrap();
        assert_eq!(rule.field(), Some(state_keys::CLIENT_NUMBER));

        let signed_in = anonymous.with(state_keys::CLIENT_NUMBER, "00000000001").unwrap();
        assert!(flow.first_incomplete(&signed_in).is_none());
    }
}
