//! Building blocks shared by the flow variants. Each section adds its steps,
//! the edges between them, and its review rules in the order they are asked.

use std::sync::Arc;

use wizard_flow::{AgeCategory, FlowBuilder, Route, WizardState, age_category_from_date_of_birth};

use crate::{
    household::{HouseholdState, MaritalStatusCodes},
    models::state_keys,
    steps::{
        AddressStep, ApplicantInformationStep, ChildDentalBenefitsStep, ChildDentalInsuranceStep,
        ChildInformationStep, ChildrenStep, CommunicationPreferencesStep, ContactInformationStep,
        DateOfBirthStep, DentalBenefitsStep, MaritalStatusStep, PartnerInformationStep, RemoveChildStep,
        YesNoStep, ids,
    },
};

fn is_yes(key: &'static str) -> impl Fn(&WizardState) -> bool + Send + Sync + 'static {
    move |state| state.flag(key) == Some(true)
}

fn is_no(key: &'static str) -> impl Fn(&WizardState) -> bool + Send + Sync + 'static {
    move |state| state.flag(key) == Some(false)
}

fn has_partner(codes: &MaritalStatusCodes) -> impl Fn(&WizardState) -> bool + Send + Sync + 'static {
    let codes = codes.clone();
    move |state| state.has_partner(&codes)
}

/// Derive the age category from the stored date of birth.
pub fn derive_age_category(state: &mut WizardState, today: chrono::NaiveDate) -> wizard_flow::Result<()> {
    if let Some(date_of_birth) = state.get::<String>(state_keys::DATE_OF_BIRTH) {
        let category = age_category_from_date_of_birth(&date_of_birth, today)?;
        state.set(state_keys::AGE_CATEGORY, category)?;
    }
    Ok(())
}

/// Tax filing for the previous year; a "no" ends at the file-taxes page.
pub fn tax_filing(builder: FlowBuilder, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    builder
        .add_step(Arc::new(YesNoStep::new(ids::TAX_FILING, state_keys::TAX_FILING)))
        .add_page(ids::FILE_TAXES)
        .add_conditional_edge(
            ids::TAX_FILING,
            Route::new(&flow, ids::FILE_TAXES),
            is_no(state_keys::TAX_FILING),
        )
        .add_edge(ids::TAX_FILING, next)
        .require(state_keys::TAX_FILING, ids::TAX_FILING)
        .redirect_if(Route::new(&flow, ids::FILE_TAXES), is_no(state_keys::TAX_FILING))
}

/// Applicant's own date of birth. Children cannot apply for themselves;
/// youth only when living independently.
pub fn applicant_age(builder: FlowBuilder, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    let is_child = |state: &WizardState| state.age_category() == Some(AgeCategory::Children);
    let is_youth = |state: &WizardState| state.age_category() == Some(AgeCategory::Youth);

    builder
        .add_step(Arc::new(DateOfBirthStep))
        .add_step(Arc::new(YesNoStep::new(
            ids::LIVING_INDEPENDENTLY,
            state_keys::LIVING_INDEPENDENTLY,
        )))
        .add_page(ids::PARENT_OR_GUARDIAN)
        .add_conditional_edge(ids::DATE_OF_BIRTH, Route::new(&flow, ids::PARENT_OR_GUARDIAN), is_child)
        .add_conditional_edge(ids::DATE_OF_BIRTH, Route::new(&flow, ids::LIVING_INDEPENDENTLY), is_youth)
        .add_edge(ids::DATE_OF_BIRTH, next)
        .add_conditional_edge(
            ids::LIVING_INDEPENDENTLY,
            Route::new(&flow, ids::PARENT_OR_GUARDIAN),
            is_no(state_keys::LIVING_INDEPENDENTLY),
        )
        .add_edge(ids::LIVING_INDEPENDENTLY, next)
        .require(state_keys::DATE_OF_BIRTH, ids::DATE_OF_BIRTH)
        .redirect_if(Route::new(&flow, ids::PARENT_OR_GUARDIAN), is_child)
        .require_if(state_keys::LIVING_INDEPENDENTLY, ids::LIVING_INDEPENDENTLY, is_youth)
        .redirect_if(Route::new(&flow, ids::PARENT_OR_GUARDIAN), move |state| {
            is_youth(state) && state.flag(state_keys::LIVING_INDEPENDENTLY) == Some(false)
        })
}

/// Marital status and, when there is one, the partner.
pub fn marital_status(builder: FlowBuilder, codes: &MaritalStatusCodes, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    builder
        .add_step(Arc::new(MaritalStatusStep::new(codes.clone())))
        .add_step(Arc::new(PartnerInformationStep))
        .add_conditional_edge(
            ids::MARITAL_STATUS,
            Route::new(&flow, ids::PARTNER_INFORMATION),
            has_partner(codes),
        )
        .add_edge(ids::MARITAL_STATUS, next)
        .add_edge(ids::PARTNER_INFORMATION, next)
        .require(state_keys::MARITAL_STATUS, ids::MARITAL_STATUS)
        .require_if(state_keys::PARTNER_INFORMATION, ids::PARTNER_INFORMATION, has_partner(codes))
}

/// Renewal variant: marital status is only asked again when it changed.
pub fn marital_status_change(builder: FlowBuilder, codes: &MaritalStatusCodes, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    let changed = is_yes(state_keys::HAS_MARITAL_STATUS_CHANGED);
    let partner = has_partner(codes);

    builder
        .add_step(Arc::new(
            YesNoStep::new(ids::HAS_MARITAL_STATUS_CHANGED, state_keys::HAS_MARITAL_STATUS_CHANGED)
                .clearing_on_no(&[state_keys::MARITAL_STATUS, state_keys::PARTNER_INFORMATION]),
        ))
        .add_step(Arc::new(MaritalStatusStep::new(codes.clone())))
        .add_step(Arc::new(PartnerInformationStep))
        .add_conditional_edge(
            ids::HAS_MARITAL_STATUS_CHANGED,
            Route::new(&flow, ids::MARITAL_STATUS),
            is_yes(state_keys::HAS_MARITAL_STATUS_CHANGED),
        )
        .add_edge(ids::HAS_MARITAL_STATUS_CHANGED, next)
        .add_conditional_edge(
            ids::MARITAL_STATUS,
            Route::new(&flow, ids::PARTNER_INFORMATION),
            has_partner(codes),
        )
        .add_edge(ids::MARITAL_STATUS, next)
        .add_edge(ids::PARTNER_INFORMATION, next)
        .require(state_keys::HAS_MARITAL_STATUS_CHANGED, ids::HAS_MARITAL_STATUS_CHANGED)
        .require_if(
            state_keys::MARITAL_STATUS,
            ids::MARITAL_STATUS,
            is_yes(state_keys::HAS_MARITAL_STATUS_CHANGED),
        )
        .require_if(
            state_keys::PARTNER_INFORMATION,
            ids::PARTNER_INFORMATION,
            move |state| changed(state) && partner(state),
        )
}

pub fn contact_information(builder: FlowBuilder, next: &str) -> FlowBuilder {
    builder
        .add_step(Arc::new(ContactInformationStep))
        .add_edge(ids::CONTACT_INFORMATION, next)
        .require(state_keys::CONTACT_INFORMATION, ids::CONTACT_INFORMATION)
}

/// Mailing then home address, always asked.
pub fn addresses(builder: FlowBuilder, next: &str) -> FlowBuilder {
    builder
        .add_step(Arc::new(AddressStep::mailing()))
        .add_step(Arc::new(AddressStep::home()))
        .add_edge(ids::MAILING_ADDRESS, ids::HOME_ADDRESS)
        .add_edge(ids::HOME_ADDRESS, next)
        .require(state_keys::MAILING_ADDRESS, ids::MAILING_ADDRESS)
        .require(state_keys::HOME_ADDRESS, ids::HOME_ADDRESS)
}

/// Renewal variant: addresses are only asked when they changed.
pub fn address_change(builder: FlowBuilder, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    builder
        .add_step(Arc::new(
            YesNoStep::new(ids::HAS_ADDRESS_CHANGED, state_keys::HAS_ADDRESS_CHANGED)
                .clearing_on_no(&[state_keys::MAILING_ADDRESS, state_keys::HOME_ADDRESS]),
        ))
        .add_step(Arc::new(AddressStep::mailing()))
        .add_step(Arc::new(AddressStep::home()))
        .add_conditional_edge(
            ids::HAS_ADDRESS_CHANGED,
            Route::new(&flow, ids::MAILING_ADDRESS),
            is_yes(state_keys::HAS_ADDRESS_CHANGED),
        )
        .add_edge(ids::HAS_ADDRESS_CHANGED, next)
        .add_edge(ids::MAILING_ADDRESS, ids::HOME_ADDRESS)
        .add_edge(ids::HOME_ADDRESS, next)
        .require(state_keys::HAS_ADDRESS_CHANGED, ids::HAS_ADDRESS_CHANGED)
        .require_if(
            state_keys::MAILING_ADDRESS,
            ids::MAILING_ADDRESS,
            is_yes(state_keys::HAS_ADDRESS_CHANGED),
        )
        .require_if(
            state_keys::HOME_ADDRESS,
            ids::HOME_ADDRESS,
            is_yes(state_keys::HAS_ADDRESS_CHANGED),
        )
}

pub fn communication_preferences(builder: FlowBuilder, next: &str) -> FlowBuilder {
    builder
        .add_step(Arc::new(CommunicationPreferencesStep))
        .add_edge(ids::COMMUNICATION_PREFERENCES, next)
        .require(state_keys::COMMUNICATION_PREFERENCES, ids::COMMUNICATION_PREFERENCES)
}

/// Applicant identity, household and contact details, in the order asked.
pub fn applicant_details(builder: FlowBuilder, codes: &MaritalStatusCodes, next: &str) -> FlowBuilder {
    let builder = builder
        .add_step(Arc::new(ApplicantInformationStep::new()))
        .add_edge(ids::APPLICANT_INFORMATION, ids::MARITAL_STATUS)
        .require(state_keys::APPLICANT_INFORMATION, ids::APPLICANT_INFORMATION);
    let builder = marital_status(builder, codes, ids::CONTACT_INFORMATION);
    let builder = contact_information(builder, ids::MAILING_ADDRESS);
    let builder = addresses(builder, ids::COMMUNICATION_PREFERENCES);
    communication_preferences(builder, next)
}

/// Private insurance, then public dental benefits.
pub fn dental_coverage(builder: FlowBuilder, next: &str) -> FlowBuilder {
    builder
        .add_step(Arc::new(YesNoStep::new(ids::DENTAL_INSURANCE, state_keys::DENTAL_INSURANCE)))
        .add_step(Arc::new(DentalBenefitsStep))
        .add_edge(ids::DENTAL_INSURANCE, ids::DENTAL_BENEFITS)
        .add_edge(ids::DENTAL_BENEFITS, next)
        .require(state_keys::DENTAL_INSURANCE, ids::DENTAL_INSURANCE)
        .require(state_keys::DENTAL_BENEFITS, ids::DENTAL_BENEFITS)
}

/// Renewal variant: public benefits are only asked again when they changed.
pub fn dental_coverage_change(builder: FlowBuilder, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    builder
        .add_step(Arc::new(YesNoStep::new(ids::DENTAL_INSURANCE, state_keys::DENTAL_INSURANCE)))
        .add_step(Arc::new(
            YesNoStep::new(ids::HAS_DENTAL_BENEFITS_CHANGED, state_keys::HAS_DENTAL_BENEFITS_CHANGED)
                .clearing_on_no(&[state_keys::DENTAL_BENEFITS]),
        ))
        .add_step(Arc::new(DentalBenefitsStep))
        .add_edge(ids::DENTAL_INSURANCE, ids::HAS_DENTAL_BENEFITS_CHANGED)
        .add_conditional_edge(
            ids::HAS_DENTAL_BENEFITS_CHANGED,
            Route::new(&flow, ids::DENTAL_BENEFITS),
            is_yes(state_keys::HAS_DENTAL_BENEFITS_CHANGED),
        )
        .add_edge(ids::HAS_DENTAL_BENEFITS_CHANGED, next)
        .add_edge(ids::DENTAL_BENEFITS, next)
        .require(state_keys::DENTAL_INSURANCE, ids::DENTAL_INSURANCE)
        .require(state_keys::HAS_DENTAL_BENEFITS_CHANGED, ids::HAS_DENTAL_BENEFITS_CHANGED)
        .require_if(
            state_keys::DENTAL_BENEFITS,
            ids::DENTAL_BENEFITS,
            is_yes(state_keys::HAS_DENTAL_BENEFITS_CHANGED),
        )
}

/// Children summary plus the per-child pages. The summary loops into the
/// child pages while a child is incomplete.
pub fn children(builder: FlowBuilder, next: &str) -> FlowBuilder {
    let flow = builder.id().to_string();
    builder
        .add_step(Arc::new(ChildrenStep))
        .add_step(Arc::new(RemoveChildStep))
        .add_step(Arc::new(ChildInformationStep))
        .add_step(Arc::new(ChildDentalInsuranceStep))
        .add_step(Arc::new(ChildDentalBenefitsStep))
        .add_conditional_edge(
            ids::CHILDREN,
            Route::new(&flow, ids::CHILD_INFORMATION),
            |state: &WizardState| state.has_incomplete_child(),
        )
        .add_edge(ids::CHILDREN, next)
        .add_edge(ids::REMOVE_CHILD, ids::CHILDREN)
        .add_edge(ids::CHILD_INFORMATION, ids::CHILD_DENTAL_INSURANCE)
        .add_edge(ids::CHILD_DENTAL_INSURANCE, ids::CHILD_DENTAL_BENEFITS)
        .add_edge(ids::CHILD_DENTAL_BENEFITS, ids::CHILDREN)
        .redirect_if(
            Route::new(&flow, ids::CHILD_INFORMATION),
            |state: &WizardState| state.has_incomplete_child(),
        )
        .redirect_if(Route::new(&flow, ids::CHILDREN), |state: &WizardState| {
            state.complete_children().is_empty()
        })
}
