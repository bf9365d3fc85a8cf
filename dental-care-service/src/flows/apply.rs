use std::sync::Arc;

use wizard_flow::{Flow, FlowBuilder, REVIEW_STEP, Route, WizardState};

use super::{APPLY_NAMESPACE, flow_ids, sections};
use crate::{
    household::{HouseholdState, MaritalStatusCodes},
    models::{TypeOfApplication, state_keys},
    steps::{ChoiceStep, TermsAndConditionsStep, ids},
};

fn is_type(expected: TypeOfApplication) -> impl Fn(&WizardState) -> bool + Send + Sync + 'static {
    move |state| state.type_of_application() == Some(expected)
}

/// Terms, tax filing and the type of application. The type decides which
/// apply flow carries on.
fn prefix(flow_id: &str, own_type: TypeOfApplication) -> FlowBuilder {
    let builder = FlowBuilder::new(flow_id)
        .namespace(APPLY_NAMESPACE)
        .redirect_if(
            Route::new(flow_id, ids::APPLICATION_DELEGATE),
            is_type(TypeOfApplication::Delegate),
        )
        .add_step(Arc::new(TermsAndConditionsStep))
        .add_edge(ids::TERMS_AND_CONDITIONS, ids::TAX_FILING)
        .require(state_keys::TERMS_AND_CONDITIONS, ids::TERMS_AND_CONDITIONS);
    let builder = sections::tax_filing(builder, ids::TYPE_APPLICATION);

    builder
        .add_step(Arc::new(ChoiceStep::<TypeOfApplication>::new(
            ids::TYPE_APPLICATION,
            state_keys::TYPE_OF_APPLICATION,
        )))
        .add_page(ids::APPLICATION_DELEGATE)
        .add_conditional_edge(
            ids::TYPE_APPLICATION,
            Route::new(flow_id, ids::APPLICATION_DELEGATE),
            is_type(TypeOfApplication::Delegate),
        )
        .add_conditional_edge(
            ids::TYPE_APPLICATION,
            Route::new(flow_ids::APPLY_ADULT, ids::DATE_OF_BIRTH),
            is_type(TypeOfApplication::Adult),
        )
        .add_conditional_edge(
            ids::TYPE_APPLICATION,
            Route::new(flow_ids::APPLY_CHILD, ids::CHILDREN),
            is_type(TypeOfApplication::Child),
        )
        .add_conditional_edge(
            ids::TYPE_APPLICATION,
            Route::new(flow_ids::APPLY_ADULT_CHILD, ids::DATE_OF_BIRTH),
            is_type(TypeOfApplication::AdultChild),
        )
        .require(state_keys::TYPE_OF_APPLICATION, ids::TYPE_APPLICATION)
        .redirect_if(Route::new(flow_id, ids::TYPE_APPLICATION), move |state| {
            state.type_of_application() != Some(own_type)
        })
        .normalize_with(sections::derive_age_category)
}

/// Adult applying for themselves.
pub fn adult(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::APPLY_ADULT, TypeOfApplication::Adult);
    let builder = sections::applicant_age(builder, ids::APPLICANT_INFORMATION);
    let builder = sections::applicant_details(builder, codes, ids::DENTAL_INSURANCE);
    sections::dental_coverage(builder, REVIEW_STEP).build()
}

/// Parent or guardian applying for their children only.
pub fn child(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::APPLY_CHILD, TypeOfApplication::Child);
    let builder = sections::children(builder, ids::APPLICANT_INFORMATION);
    sections::applicant_details(builder, codes, REVIEW_STEP).build()
}

/// Adult applying for themselves and their children.
pub fn adult_child(codes: &MaritalStatusCodes) -> Flow {
    let builder = prefix(flow_ids::APPLY_ADULT_CHILD, TypeOfApplication::AdultChild);
    let builder = sections::applicant_age(builder, ids::APPLICANT_INFORMATION);
    let builder = sections::applicant_details(builder, codes, ids::DENTAL_INSURANCE);
    let builder = sections::dental_coverage(builder, ids::CHILDREN);
    sections::children(builder, REVIEW_STEP).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn state(value: Value) -> WizardState {
        let mut state = WizardState::from_value(value).unwrap();
        sections::derive_age_category(&mut state, today()).unwrap();
        state
    }

    fn address() -> Value {
        json!({
            "address": "111 Wellington St",
            "city": "Ottawa",
            "province": "ON",
            "postal_code": "K1A 0A9",
            "country": "CAN"
        })
    }

    fn complete_adult() -> Value {
        json!({
            "terms_and_conditions": { "acknowledge_terms": true, "acknowledge_privacy": true, "share_data": true },
            "tax_filing": true,
            "type_of_application": "adult",
            "date_of_birth": "1980-05-12",
            "applicant_information": { "first_name": "Ada", "last_name": "Roy", "social_insurance_number": "130692544" },
            "marital_status": "3",
            "contact_information": { "email": "ada@example.ca" },
            "mailing_address": address(),
            "home_address": address(),
            "communication_preferences": { "preferred_language": "en", "preferred_method": "email" },
            "dental_insurance": false,
            "dental_benefits": { "has_federal_benefits": false, "has_provincial_territorial_benefits": false }
        })
    }

    #[test]
    fn test_complete_adult_reaches_review() {
        let flow = adult(&MaritalStatusCodes::default());
        assert!(flow.first_incomplete(&state(complete_adult())).is_none());
    }

    #[test]
    fn test_missing_partner_sends_back_to_partner_page() {
        let flow = adult(&MaritalStatusCodes::default());
        let mut answers = complete_adult();
        answers["marital_status"] = json!("1");

        let rule = flow.first_incomplete(&state(answers)).unwrap();
        assert_eq!(rule.route, Route::new(flow_ids::APPLY_ADULT, ids::PARTNER_INFORMATION));
    }

    #[test]
    fn test_youth_not_living_independently_needs_parent() {
        let flow = adult(&MaritalStatusCodes::default());
        let mut answers = complete_adult();
        answers["date_of_birth"] = json!("2010-01-01");

        let rule = flow.first_incomplete(&state(answers.clone())).unwrap();
        assert_eq!(rule.field(), Some(state_keys::LIVING_INDEPENDENTLY));

        answers["living_independently"] = json!(false);
        let rule = flow.first_incomplete(&state(answers.clone())).unwrap();
        assert_eq!(rule.route, Route::new(flow_ids::APPLY_ADULT, ids::PARENT_OR_GUARDIAN));

        answers["living_independently"] = json!(true);
        assert!(flow.first_incomplete(&state(answers)).is_none());
    }

    #[test]
    fn test_other_type_sends_back_to_type_question() {
        let flow = adult(&MaritalStatusCodes::default());
        let mut answers = complete_adult();
        answers["type_of_application"] = json!("child");

        let rule = flow.first_incomplete(&state(answers)).unwrap();
        assert_eq!(rule.route, Route::new(flow_ids::APPLY_ADULT, ids::TYPE_APPLICATION));
    }

    #[test]
    fn test_delegate_review_goes_to_delegate_page() {
        let flow = adult(&MaritalStatusCodes::default());
        let delegate = Route::new(flow_ids::APPLY_ADULT, ids::APPLICATION_DELEGATE);

        let answers = json!({
            "terms_and_conditions": { "acknowledge_terms": true, "acknowledge_privacy": true, "share_data": true },
            "tax_filing": true,
            "type_of_application": "delegate"
        });
        assert_eq!(flow.first_incomplete(&state(answers)).unwrap().route, delegate);

        let answers = json!({ "type_of_application": "delegate" });
        assert_eq!(flow.first_incomplete(&state(answers)).unwrap().route, delegate);
    }

    #[test]
    fn test_type_of_application_picks_the_flow() {
        let flow = adult(&MaritalStatusCodes::default());
        let next = |kind: &str| {
            flow.next_route(ids::TYPE_APPLICATION, &state(json!({ "type_of_application": kind })))
        };

        assert_eq!(next("adult"), Some(Route::new(flow_ids::APPLY_ADULT, ids::DATE_OF_BIRTH)));
        assert_eq!(next("child"), Some(Route::new(flow_ids::APPLY_CHILD, ids::CHILDREN)));
        assert_eq!(
            next("adult-child"),
            Some(Route::new(flow_ids::APPLY_ADULT_CHILD, ids::DATE_OF_BIRTH))
        );
        assert_eq!(
            next("delegate"),
            Some(Route::new(flow_ids::APPLY_ADULT, ids::APPLICATION_DELEGATE))
        );
    }

    #[test]
    fn test_date_of_birth_branches_on_age() {
        let flow = adult(&MaritalStatusCodes::default());
        let next = |dob: &str| flow.next_route(ids::DATE_OF_BIRTH, &state(json!({ "date_of_birth": dob })));

        assert_eq!(next("2015-01-01").unwrap().step, ids::PARENT_OR_GUARDIAN);
        assert_eq!(next("2010-01-01").unwrap().step, ids::LIVING_INDEPENDENTLY);
        assert_eq!(next("1980-01-01").unwrap().step, ids::APPLICANT_INFORMATION);
    }

    #[test]
    fn test_child_flow_needs_a_complete_child() {
        let flow = child(&MaritalStatusCodes::default());
        let mut answers = complete_adult();
        answers["type_of_application"] = json!("child");

        let rule = flow.first_incomplete(&state(answers)).unwrap();
        assert_eq!(rule.route, Route::new(flow_ids::APPLY_CHILD, ids::CHILDREN));
    }

    fn complete_child() -> Value {
        json!({
            "id": "c1",
            "information": {
                "first_name": "Noah",
                "last_name": "Roy",
                "date_of_birth": "2015-07-01",
                "is_parent": true
            },
            "dental_insurance": false,
            "dental_benefits": { "has_federal_benefits": false, "has_provincial_territorial_benefits": false }
        })
    }

    #[test]
    fn test_half_filled_child_goes_back_to_child_pages() {
        let flow = child(&MaritalStatusCodes::default());
        let mut answers = complete_adult();
        answers["type_of_application"] = json!("child");
        answers["children"] = json!([complete_child()]);
        assert!(flow.first_incomplete(&state(answers.clone())).is_none());

        answers["children"] = json!([complete_child(), { "id": "c2" }]);
        let rule = flow.first_incomplete(&state(answers)).unwrap();
        assert_eq!(rule.route, Route::new(flow_ids::APPLY_CHILD, ids::CHILD_INFORMATION));
    }
}
