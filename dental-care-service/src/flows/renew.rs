use std::sync::Arc;

use wizard_flow::{Flow, FlowBuilder, REVIEW_STEP, Route, WizardState};

use super::{RENEW_NAMESPACE, flow_ids, sections};
use crate::{
    household::{HouseholdState, MaritalStatusCodes},
    models::{TypeOfRenewal, state_keys},
    steps::{ApplicantInformationStep, ChoiceStep, TermsAndConditionsStep, ids},
};

fn is_type(expected: TypeOfRenewal) -> impl Fn(&WizardState) -> bool + Send + Sync + 'static {
    move |state| state.type_of_renewal() == Some(expected)
}

/// Terms, the client being renewed, and the type of renewal. Delegates are
/// turned away before anything else is checked.
fn prefix(flow_id: &str, own_type: TypeOfRenewal) -> FlowBuilder {
    let builder = FlowBuilder::new(flow_id)
        .namespace(RENEW_NAMESPACE)
        .redirect_if(
            Route::new(flow_id, ids::RENEWAL_DELEGATE),
            is_type(TypeOfRenewal::Delegate),
        )
        .add_step(Arc::new(TermsAndConditionsStep))
        .add_step(Arc::new(ApplicantInformationStep::for_renewal()))
        .add_step(Arc::new(ChoiceStep::<TypeOfRenewal>::new(
            ids::TYPE_RENEWAL,
            state_keys::TYPE_OF_RENEWAL,
        )))
        .add_page(ids::RENEWAL_DELEGATE)
        .add_edge(ids::TERMS_AND_CONDITIONS, ids::APPLICANT_INFORMATION)
        .add_edge(ids::APPLICANT_INFORMATION, ids::TYPE_RENEWAL)
        .add_conditional_edge(
            ids::TYPE_RENEWAL,
            Route::new(flow_id, ids::RENEWAL_DELEGATE),
            is_type(TypeOfRenewal::Delegate),
        );

    let branches = [
        (TypeOfRenewal::Adult, flow_ids::RENEW_ADULT),
        (TypeOfRenewal::AdultChild, flow_ids::RENEW_ADULT_CHILD),
        (TypeOfRenewal::Child, flow_ids::RENEW_CHILD),
        (TypeOfRenewal::Ita, flow_ids::RENEW_ITA),
    ];
    let builder = branches.into_iter().fold(builder, |builder, (kind, target)| {
        builder.add_conditional_edge(ids::TYPE_RENEWAL, Route::new(target, ids::TAX_FILING), is_type(kind))
    });

    builder
        .require(state_keys::TERMS_AND_CONDITIONS, ids::TERMS_AND_CONDITIONS)
        .require(state_keys::APPLICANT_INFORMATION, ids::APPLICANT_INFORMATION)
        .require(state_keys::TYPE_OF_RENEWAL, ids::TYPE_RENEWAL)
        .redirect_if(Route::new(flow_id, ids::TYPE_RENEWAL), move |state| {
            state.type_of_renewal() != Some(own_type)
        })
}

/// Adult renewing their own coverage.
pub fn adult(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::RENEW_ADULT, TypeOfRenewal::Adult);
    let builder = sections::tax_filing(builder, ids::HAS_MARITAL_STATUS_CHANGED);
    let builder = sections::marital_status_change(builder, codes, ids::HAS_ADDRESS_CHANGED);
    let builder = sections::address_change(builder, ids::DENTAL_INSURANCE);
    sections::dental_coverage_change(builder, REVIEW_STEP).build()
}

/// Adult renewing for themselves and their children.
pub fn adult_child(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::RENEW_ADULT_CHILD, TypeOfRenewal::AdultChild);
    let builder = sections::tax_filing(builder, ids::HAS_MARITAL_STATUS_CHANGED);
    let builder = sections::marital_status_change(builder, codes, ids::HAS_ADDRESS_CHANGED);
    let builder = sections::address_change(builder, ids::DENTAL_INSURANCE);
    let builder = sections::dental_coverage_change(builder, ids::CHILDREN);
    sections::children(builder, REVIEW_STEP).build()
}

/// Parent or guardian renewing for their children only.
pub fn child(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::RENEW_CHILD, TypeOfRenewal::Child);
    let builder = sections::tax_filing(builder, ids::HAS_MARITAL_STATUS_CHANGED);
    let builder = sections::marital_status_change(builder, codes, ids::HAS_ADDRESS_CHANGED);
    let builder = sections::address_change(builder, ids::CHILDREN);
    sections::children(builder, REVIEW_STEP).build()
}

/// Clients moving over from the interim program. Nothing is on file yet, so
/// marital status, contact details and benefits are always asked.
pub fn ita(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::RENEW_ITA, TypeOfRenewal::Ita);
    let builder = sections::tax_filing(builder, ids::MARITAL_STATUS);
    let builder = sections::marital_status(builder, codes, ids::CONTACT_INFORMATION);
    let builder = sections::contact_information(builder, ids::HAS_ADDRESS_CHANGED);
    let builder = sections::address_change(builder, ids::COMMUNICATION_PREFERENCES);
    let builder = sections::communication_preferences(builder, ids::DENTAL_INSURANCE);
    sections::dental_coverage(builder, REVIEW_STEP).build()
}
