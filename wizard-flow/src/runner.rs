//! WizardRunner – the load → validate → save pipeline every wizard page goes through.
//!
//! One request touches one flow instance and runs strictly in sequence: the state is
//! loaded, checked against the requested page, and only then (on a form submit) merged
//! back into storage. Nothing here spawns tasks, so two mutations of the same flow id
//! never race inside this code; serialising concurrent requests per flow id is the
//! storage backend's job.
//!
//! Redirects are ordinary return values ([`Outcome::RedirectTo`], [`Submission::Redirect`]).
//! The one condition reported as an error is a missing session entry
//! ([`WizardError::StateNotFound`]), which the HTTP layer turns into a redirect to the
//! flow's landing page.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{Result, WizardError},
    flow::{CONFIRMATION_STEP, Flow},
    state::{EDIT_MODE, SUBMISSION_INFO, WizardState},
    step::{FieldError, Outcome, Route, StepRequest, StepResult},
    storage::{FlowId, SessionKey, SessionStorage},
};

/// Result of posting a step's form
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Answers saved (or the page was not reachable); continue at this route.
    Redirect(Route),
    /// Answers rejected; show the page again with these errors.
    Rejected(Vec<FieldError>),
}

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Drives flows against a [`SessionStorage`].
#[derive(Clone)]
pub struct WizardRunner {
    storage: Arc<dyn SessionStorage>,
    today: Today,
}

impl WizardRunner {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the clock used for age calculations.
    pub fn with_today<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Arc::new(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    /// Mint a flow id, persist `seed` as its initial state and return the entry route.
    pub async fn start(&self, flow: &Flow, seed: WizardState) -> Result<(FlowId, Route)> {
        let flow_id = FlowId::new();
        let entry = flow.entry_route()?;
        self.storage
            .save(&SessionKey::new(flow.namespace(), &flow_id), seed)
            .await?;

        info!(flow = %flow.id, flow_id = %flow_id, "Started wizard flow");
        Ok((flow_id, entry))
    }

    /// Load the state for the page `step` of `flow`.
    ///
    /// A submitted flow only shows its confirmation page, and the confirmation
    /// page is only shown once the flow was submitted.
    pub async fn load(&self, flow: &Flow, flow_id: &FlowId, step: &str) -> Result<Outcome<WizardState>> {
        if !flow.has_page(step) {
            return Err(WizardError::StepNotFound(format!("{}/{}", flow.id, step)));
        }

        let mut state = self.fetch(flow, flow_id).await?;
        let on_confirmation = step == CONFIRMATION_STEP;

        if state.is_submitted() && !on_confirmation {
            debug!(flow = %flow.id, flow_id = %flow_id, step, "Flow already submitted");
            return Ok(Outcome::RedirectTo(flow.confirmation_route()));
        }
        if !state.is_submitted() && on_confirmation {
            debug!(flow = %flow.id, flow_id = %flow_id, "Confirmation requested before submission");
            return Ok(Outcome::RedirectTo(flow.entry_route()?));
        }

        flow.normalize(&mut state, self.today())?;
        Ok(Outcome::Proceed(state))
    }

    /// Merge `partial` into the stored state and persist it.
    pub async fn save(&self, flow: &Flow, flow_id: &FlowId, partial: WizardState) -> Result<()> {
        let key = SessionKey::new(flow.namespace(), flow_id);
        let mut state = self.fetch(flow, flow_id).await?;
        state.merge(partial);
        self.storage.save(&key, state).await
    }

    /// Load the state for the review page and check every required answer.
    ///
    /// The first missing answer, in the flow's declared order, decides the
    /// redirect. Edit mode is switched off before redirecting so the user is
    /// not bounced back to review from a step they never filled in.
    pub async fn review(&self, flow: &Flow, flow_id: &FlowId) -> Result<Outcome<WizardState>> {
        let state = match self.load(flow, flow_id, crate::flow::REVIEW_STEP).await? {
            Outcome::Proceed(state) => state,
            redirect => return Ok(redirect),
        };

        let Some(rule) = flow.first_incomplete(&state) else {
            return Ok(Outcome::Proceed(state));
        };

        debug!(
            flow = %flow.id,
            flow_id = %flow_id,
            field = rule.field().unwrap_or("-"),
            redirect = %rule.route,
            "State incomplete for review"
        );

        if state.edit_mode() {
            self.save(flow, flow_id, WizardState::new().with(EDIT_MODE, false)?)
                .await?;
        }
        Ok(Outcome::RedirectTo(rule.route.clone()))
    }

    /// Run the step's validation on `input`, save the accepted answers and pick the next page.
    pub async fn submit_step(
        &self,
        flow: &Flow,
        flow_id: &FlowId,
        step_id: &str,
        input: &Value,
    ) -> Result<Submission> {
        let state = match self.load(flow, flow_id, step_id).await? {
            Outcome::Proceed(state) => state,
            Outcome::RedirectTo(route) => return Ok(Submission::Redirect(route)),
        };

        let step = flow
            .get_step(step_id)
            .ok_or_else(|| WizardError::StepNotFound(format!("{}/{}", flow.id, step_id)))?;

        let today = self.today();
        let partial = match step
            .submit(StepRequest {
                input,
                state: &state,
                today,
            })
            .await?
        {
            StepResult::Accepted(partial) => partial,
            StepResult::Rejected(errors) => {
                debug!(flow = %flow.id, flow_id = %flow_id, step = step_id, errors = errors.len(), "Step input rejected");
                return Ok(Submission::Rejected(errors));
            }
        };

        self.save(flow, flow_id, partial.clone()).await?;

        let mut next_state = state.merged(partial);
        flow.normalize(&mut next_state, today)?;

        let next = if next_state.edit_mode() {
            flow.review_route()
        } else {
            flow.next_route(step_id, &next_state)
                .ok_or_else(|| WizardError::NoTransition(format!("{}/{}", flow.id, step_id)))?
        };

        info!(flow = %flow.id, flow_id = %flow_id, step = step_id, next = %next, "Step saved");
        Ok(Submission::Redirect(next))
    }

    /// Enter edit mode from the review page and go to `step_id`.
    pub async fn edit(&self, flow: &Flow, flow_id: &FlowId, step_id: &str) -> Result<Route> {
        if flow.get_step(step_id).is_none() {
            return Err(WizardError::StepNotFound(format!("{}/{}", flow.id, step_id)));
        }
        if let Outcome::RedirectTo(route) = self.load(flow, flow_id, crate::flow::REVIEW_STEP).await? {
            return Ok(route);
        }

        self.save(flow, flow_id, WizardState::new().with(EDIT_MODE, true)?)
            .await?;
        Ok(flow.route(step_id))
    }

    /// Record a successful submission. Afterwards only the confirmation page loads.
    pub async fn mark_submitted<T>(&self, flow: &Flow, flow_id: &FlowId, info: T) -> Result<Route>
    where
        T: Serialize + Send,
    {
        let partial = WizardState::new()
            .with(SUBMISSION_INFO, info)?
            .with(EDIT_MODE, false)?;
        self.save(flow, flow_id, partial).await?;

        info!(flow = %flow.id, flow_id = %flow_id, "Flow submitted");
        Ok(flow.confirmation_route())
    }

    /// Drop the flow's session entry.
    pub async fn clear(&self, flow: &Flow, flow_id: &FlowId) -> Result<()> {
        self.storage
            .delete(&SessionKey::new(flow.namespace(), flow_id))
            .await?;
        info!(flow = %flow.id, flow_id = %flow_id, "Cleared wizard flow");
        Ok(())
    }

    /// Stored state as is, without page checks or derived values.
    pub async fn state(&self, flow: &Flow, flow_id: &FlowId) -> Result<WizardState> {
        self.fetch(flow, flow_id).await
    }

    async fn fetch(&self, flow: &Flow, flow_id: &FlowId) -> Result<WizardState> {
        self.storage
            .get(&SessionKey::new(flow.namespace(), flow_id))
            .await?
            .ok_or_else(|| WizardError::StateNotFound {
                namespace: flow.namespace().to_string(),
                flow_id: flow_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        age::age_category_from_date_of_birth,
        flow::{FlowBuilder, REVIEW_STEP},
        step::Step,
        storage::InMemorySessionStorage,
    };
    use async_trait::async_trait;
    use serde_json::json;

    /// Stores the boolean `value` of the input under `field`.
    struct YesNoStep {
        id: &'static str,
        field: &'static str,
    }

    #[async_trait]
    impl Step for YesNoStep {
        fn id(&self) -> &str {
            self.id
        }

        async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
            match request.input.get("value").and_then(Value::as_bool) {
                Some(value) => Ok(StepResult::Accepted(WizardState::new().with(self.field, value)?)),
                None => Ok(StepResult::rejected("value", "required")),
            }
        }
    }

    struct DateOfBirthStep;

    #[async_trait]
    impl Step for DateOfBirthStep {
        fn id(&self) -> &str {
            "date-of-birth"
        }

        async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
            let dob = request.input["date_of_birth"].as_str().unwrap_or_default();
            Ok(StepResult::Accepted(WizardState::new().with("date_of_birth", dob)?))
        }
    }

    fn flow() -> Flow {
        FlowBuilder::new("renew-test")
            .namespace("renew")
            .add_step(Arc::new(YesNoStep { id: "tax-filing", field: "tax_filing" }))
            .add_step(Arc::new(DateOfBirthStep))
            .add_step(Arc::new(YesNoStep {
                id: "dental-insurance",
                field: "dental_insurance",
            }))
            .add_page("file-taxes")
            .add_conditional_edge("tax-filing", Route::new("renew-test", "file-taxes"), |s| {
                s.get::<bool>("tax_filing") == Some(false)
            })
            .add_edge("tax-filing", "date-of-birth")
            .add_edge("date-of-birth", "dental-insurance")
            .add_edge("dental-insurance", REVIEW_STEP)
            .require("tax_filing", "tax-filing")
            .require("date_of_birth", "date-of-birth")
            .require("dental_insurance", "dental-insurance")
            .normalize_with(|state, today| {
                if let Some(dob) = state.get::<String>("date_of_birth") {
                    let category = age_category_from_date_of_birth(&dob, today)?;
                    state.set("age_category", category)?;
                }
                Ok(())
            })
            .build()
    }

    fn runner() -> WizardRunner {
        WizardRunner::new(Arc::new(InMemorySessionStorage::new()))
            .with_today(|| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_missing_state_is_not_found() {
        let result = runner().load(&flow(), &FlowId::new(), "tax-filing").await;
        assert!(matches!(result, Err(WizardError::StateNotFound { .. })));
    }

    #[tokio::test]
    async fn test_unknown_page_is_rejected() {
        let runner = runner();
        let flow = flow();
        let (flow_id, _) = runner.start(&flow, WizardState::new()).await.unwrap();
        let result = runner.load(&flow, &flow_id, "nowhere").await;
        assert!(matches!(result, Err(WizardError::StepNotFound(_))));
    }

    #[tokio::test]
    async fn test_start_returns_entry_route() {
        let runner = runner();
        let flow = flow();
        let (flow_id, entry) = runner.start(&flow, WizardState::new()).await.unwrap();
        assert_eq!(entry, Route::new("renew-test", "tax-filing"));
        assert!(matches!(
            runner.load(&flow, &flow_id, "tax-filing").await.unwrap(),
            Outcome::Proceed(_)
        ));
    }

    #[tokio::test]
    async fn test_confirmation_guards() {
        let runner = runner();
        let flow = flow();
        let (flow_id, entry) = runner.start(&flow, WizardState::new()).await.unwrap();

        let early = runner.load(&flow, &flow_id, CONFIRMATION_STEP).await.unwrap();
        assert_eq!(early, Outcome::RedirectTo(entry));

        runner
            .mark_submitted(&flow, &flow_id, json!({ "confirmation_code": "0123456789" }))
            .await
            .unwrap();

        let stale = runner.load(&flow, &flow_id, "tax-filing").await.unwrap();
        assert_eq!(stale, Outcome::RedirectTo(flow.confirmation_route()));
        assert!(matches!(
            runner.load(&flow, &flow_id, CONFIRMATION_STEP).await.unwrap(),
            Outcome::Proceed(_)
        ));
    }

    #[tokio::test]
    async fn test_load_derives_age_category() {
        let runner = runner();
        let flow = flow();
        let seed = WizardState::new().with("date_of_birth", "1959-01-01").unwrap();
        let (flow_id, _) = runner.start(&flow, seed).await.unwrap();

        let Outcome::Proceed(state) = runner.load(&flow, &flow_id, "tax-filing").await.unwrap() else {
            panic!("expected state");
        };
        assert_eq!(state.get::<String>("age_category").as_deref(), Some("seniors"));
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let runner = runner();
        let flow = flow();
        let (flow_id, _) = runner.start(&flow, WizardState::new()).await.unwrap();
        let partial = WizardState::new().with("tax_filing", true).unwrap();

        runner.save(&flow, &flow_id, partial.clone()).await.unwrap();
        let Outcome::Proceed(once) = runner.load(&flow, &flow_id, "tax-filing").await.unwrap() else {
            panic!("expected state");
        };
        runner.save(&flow, &flow_id, partial).await.unwrap();
        let Outcome::Proceed(twice) = runner.load(&flow, &flow_id, "tax-filing").await.unwrap() else {
            panic!("expected state");
        };
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_submit_step_moves_along_edges() {
        let runner = runner();
        let flow = flow();
        let (flow_id, _) = runner.start(&flow, WizardState::new()).await.unwrap();

        let rejected = runner
            .submit_step(&flow, &flow_id, "tax-filing", &json!({}))
            .await
            .unwrap();
        assert_eq!(rejected, Submission::Rejected(vec![FieldError::new("value", "required")]));

        let next = runner
            .submit_step(&flow, &flow_id, "tax-filing", &json!({ "value": true }))
            .await
            .unwrap();
        assert_eq!(next, Submission::Redirect(Route::new("renew-test", "date-of-birth")));

        let ineligible = runner
            .submit_step(&flow, &flow_id, "tax-filing", &json!({ "value": false }))
            .await
            .unwrap();
        assert_eq!(ineligible, Submission::Redirect(Route::new("renew-test", "file-taxes")));
    }

    #[tokio::test]
    async fn test_review_redirects_to_first_missing_field() {
        let runner = runner();
        let flow = flow();
        let seed = WizardState::new().with("dental_insurance", false).unwrap();
        let (flow_id, _) = runner.start(&flow, seed).await.unwrap();

        let outcome = runner.review(&flow, &flow_id).await.unwrap();
        assert_eq!(outcome, Outcome::RedirectTo(Route::new("renew-test", "tax-filing")));
    }

    #[tokio::test]
    async fn test_review_resets_edit_mode_on_redirect() {
        let runner = runner();
        let flow = flow();
        let seed = WizardState::new()
            .with("tax_filing", true)
            .unwrap()
            .with(EDIT_MODE, true)
            .unwrap();
        let (flow_id, _) = runner.start(&flow, seed).await.unwrap();

        let outcome = runner.review(&flow, &flow_id).await.unwrap();
        assert_eq!(outcome, Outcome::RedirectTo(Route::new("renew-test", "date-of-birth")));

        let Outcome::Proceed(state) = runner.load(&flow, &flow_id, "date-of-birth").await.unwrap() else {
            panic!("expected state");
        };
        assert!(!state.edit_mode());
    }

    #[tokio::test]
    async fn test_edit_mode_returns_to_review() {
        let runner = runner();
        let flow = flow();
        let seed = WizardState::from_value(json!({
            "tax_filing": true,
            "date_of_birth": "1990-06-15",
            "dental_insurance": true
        }))
        .unwrap();
        let (flow_id, _) = runner.start(&flow, seed).await.unwrap();
        assert!(matches!(runner.review(&flow, &flow_id).await.unwrap(), Outcome::Proceed(_)));

        let route = runner.edit(&flow, &flow_id, "tax-filing").await.unwrap();
        assert_eq!(route, Route::new("renew-test", "tax-filing"));

        let next = runner
            .submit_step(&flow, &flow_id, "tax-filing", &json!({ "value": true }))
            .await
            .unwrap();
        assert_eq!(next, Submission::Redirect(flow.review_route()));
    }

    #[tokio::test]
    async fn test_clear_removes_state() {
        let runner = runner();
        let flow = flow();
        let (flow_id, _) = runner.start(&flow, WizardState::new()).await.unwrap();
        runner.clear(&flow, &flow_id).await.unwrap();
        assert!(matches!(
            runner.load(&flow, &flow_id, "tax-filing").await,
            Err(WizardError::StateNotFound { .. })
        ));
    }
}
