pub mod age;
pub mod error;
pub mod flow;
pub mod runner;
pub mod state;
pub mod step;
pub mod storage;
#[cfg(feature = "postgres")]
pub mod storage_postgres;

// Re-export commonly used types
pub use age::{AgeCategory, age_category_from_age, age_category_from_date_of_birth, age_in_years};
pub use error::{Result, WizardError};
pub use flow::{CONFIRMATION_STEP, Flow, FlowBuilder, FlowRegistry, REVIEW_STEP, ReviewRule};
pub use runner::{Submission, WizardRunner};
pub use state::{EDIT_MODE, SUBMISSION_INFO, WizardState};
pub use step::{FieldError, Outcome, Route, Step, StepRequest, StepResult};
pub use storage::{FlowId, InMemorySessionStorage, SessionKey, SessionStorage};
#[cfg(feature = "postgres")]
pub use storage_postgres::PostgresSessionStorage;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct GreetingStep;

    #[async_trait]
    impl Step for GreetingStep {
        fn id(&self) -> &str {
            "greeting"
        }

        async fn submit(&self, request: StepRequest<'_>) -> Result<StepResult> {
            let name = request.input["name"].as_str().unwrap_or_default().trim();
            if name.is_empty() {
                return Ok(StepResult::rejected("name", "required"));
            }
            Ok(StepResult::Accepted(WizardState::new().with("name", name)?))
        }
    }

    #[tokio::test]
    async fn test_single_step_flow() {
        let flow = FlowBuilder::new("hello")
            .add_step(Arc::new(GreetingStep))
            .add_edge("greeting", REVIEW_STEP)
            .require("name", "greeting")
            .build();
        let runner = WizardRunner::new(Arc::new(InMemorySessionStorage::new()));

        let (flow_id, entry) = runner.start(&flow, WizardState::new()).await.unwrap();
        assert_eq!(entry.step, "greeting");

        let review = runner.review(&flow, &flow_id).await.unwrap();
        assert_eq!(review, Outcome::RedirectTo(flow.route("greeting")));

        let submission = runner
            .submit_step(&flow, &flow_id, "greeting", &json!({ "name": "Batman" }))
            .await
            .unwrap();
        assert_eq!(submission, Submission::Redirect(flow.review_route()));

        let Outcome::Proceed(state) = runner.review(&flow, &flow_id).await.unwrap() else {
            panic!("review should render");
        };
        assert_eq!(state.get::<String>("name").as_deref(), Some("Batman"));
    }
}
