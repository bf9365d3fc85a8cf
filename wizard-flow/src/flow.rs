use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    error::{Result, WizardError},
    state::WizardState,
    step::{Route, Step},
};

pub const REVIEW_STEP: &str = "review";
pub const CONFIRMATION_STEP: &str = "confirmation";

/// Type alias for predicates over the collected answers
pub type StateCondition = Arc<dyn Fn(&WizardState) -> bool + Send + Sync>;

/// Derives values (age category and the like) on every load
pub type Normalizer = Arc<dyn Fn(&mut WizardState, NaiveDate) -> Result<()> + Send + Sync>;

/// Transition out of a step after its form was accepted
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: Route,
    pub condition: Option<StateCondition>,
}

#[derive(Clone)]
enum ReviewCheck {
    Required(String),
    RequiredIf(String, StateCondition),
    RedirectIf(StateCondition),
}

/// One entry of the ordered list walked before the review page renders
#[derive(Clone)]
pub struct ReviewRule {
    check: ReviewCheck,
    pub route: Route,
}

impl ReviewRule {
    fn is_violated(&self, state: &WizardState) -> bool {
        match &self.check {
            ReviewCheck::Required(field) => !state.contains(field),
            ReviewCheck::RequiredIf(field, when) => when(state) && !state.contains(field),
            ReviewCheck::RedirectIf(when) => when(state),
        }
    }

    /// Field this rule demands, if it is a field rule.
    pub fn field(&self) -> Option<&str> {
        match &self.check {
            ReviewCheck::Required(field) | ReviewCheck::RequiredIf(field, _) => Some(field.as_str()),
            ReviewCheck::RedirectIf(_) => None,
        }
    }
}

/// A wizard: its steps, how they chain, and what must be answered before review.
pub struct Flow {
    pub id: String,
    namespace: String,
    steps: HashMap<String, Arc<dyn Step>>,
    pages: HashSet<String>,
    edges: Vec<Edge>,
    review_rules: Vec<ReviewRule>,
    entry_step: Option<String>,
    normalizer: Option<Normalizer>,
}

impl Flow {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            namespace: id.clone(),
            id,
            steps: HashMap::new(),
            pages: [REVIEW_STEP, CONFIRMATION_STEP]
                .into_iter()
                .map(String::from)
                .collect(),
            edges: Vec::new(),
            review_rules: Vec::new(),
            entry_step: None,
            normalizer: None,
        }
    }

    /// Session namespace. Flows sharing a namespace share their answers.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn route(&self, step: impl Into<String>) -> Route {
        Route::new(self.id.clone(), step)
    }

    pub fn entry_route(&self) -> Result<Route> {
        self.entry_step
            .as_ref()
            .map(|step| self.route(step.clone()))
            .ok_or_else(|| WizardError::StepNotFound(format!("{} has no steps", self.id)))
    }

    pub fn review_route(&self) -> Route {
        self.route(REVIEW_STEP)
    }

    pub fn confirmation_route(&self) -> Route {
        self.route(CONFIRMATION_STEP)
    }

    pub fn get_step(&self, step_id: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(step_id).cloned()
    }

    /// Whether the slug names a step or a plain page of this flow
    pub fn has_page(&self, step_id: &str) -> bool {
        self.steps.contains_key(step_id) || self.pages.contains(step_id)
    }

    /// Find the next route from `current_step`: conditional edges in
    /// declaration order first, then the unconditional default.
    pub fn next_route(&self, current_step: &str, state: &WizardState) -> Option<Route> {
        let mut default = None;
        for edge in self.edges.iter().filter(|e| e.from == current_step) {
            match &edge.condition {
                Some(condition) => {
                    if condition(state) {
                        return Some(edge.to.clone());
                    }
                }
                None => {
                    if default.is_none() {
                        default = Some(edge.to.clone());
                    }
                }
            }
        }
        default
    }

    /// Walk the review rules in order and return the first one the state breaks.
    pub fn first_incomplete(&self, state: &WizardState) -> Option<&ReviewRule> {
        self.review_rules.iter().find(|rule| rule.is_violated(state))
    }

    pub fn normalize(&self, state: &mut WizardState, today: NaiveDate) -> Result<()> {
        match &self.normalizer {
            Some(normalizer) => normalizer(state, today),
            None => Ok(()),
        }
    }
}

/// Builder for creating flows
pub struct FlowBuilder {
    flow: Flow,
}

impl FlowBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            flow: Flow::new(id),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.flow.namespace = namespace.into();
        self
    }

    /// Add a step. The first step added is the entry step.
    pub fn add_step(mut self, step: Arc<dyn Step>) -> Self {
        let step_id = step.id().to_string();
        if self.flow.entry_step.is_none() {
            self.flow.entry_step = Some(step_id.clone());
        }
        self.flow.steps.insert(step_id, step);
        self
    }

    /// Add a page that renders state but has no form of its own.
    pub fn add_page(mut self, page: impl Into<String>) -> Self {
        self.flow.pages.insert(page.into());
        self
    }

    /// Default transition between two steps of this flow
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let to = self.flow.route(to);
        self.flow.edges.push(Edge {
            from: from.into(),
            to,
            condition: None,
        });
        self
    }

    /// Conditional transition, possibly into another flow
    pub fn add_conditional_edge<F>(mut self, from: impl Into<String>, to: Route, condition: F) -> Self
    where
        F: Fn(&WizardState) -> bool + Send + Sync + 'static,
    {
        self.flow.edges.push(Edge {
            from: from.into(),
            to,
            condition: Some(Arc::new(condition)),
        });
        self
    }

    /// Review requires `field`, owned by `step`.
    pub fn require(mut self, field: impl Into<String>, step: impl Into<String>) -> Self {
        let route = self.flow.route(step);
        self.flow.review_rules.push(ReviewRule {
            check: ReviewCheck::Required(field.into()),
            route,
        });
        self
    }

    /// Review requires `field` only while `when` holds.
    pub fn require_if<F>(mut self, field: impl Into<String>, step: impl Into<String>, when: F) -> Self
    where
        F: Fn(&WizardState) -> bool + Send + Sync + 'static,
    {
        let route = self.flow.route(step);
        self.flow.review_rules.push(ReviewRule {
            check: ReviewCheck::RequiredIf(field.into(), Arc::new(when)),
            route,
        });
        self
    }

    /// Review sends the user to `route` whenever `when` holds.
    pub fn redirect_if<F>(mut self, route: Route, when: F) -> Self
    where
        F: Fn(&WizardState) -> bool + Send + Sync + 'static,
    {
        self.flow.review_rules.push(ReviewRule {
            check: ReviewCheck::RedirectIf(Arc::new(when)),
            route,
        });
        self
    }

    pub fn normalize_with<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(&mut WizardState, NaiveDate) -> Result<()> + Send + Sync + 'static,
    {
        self.flow.normalizer = Some(Arc::new(normalizer));
        self
    }

    /// Current flow id, for building cross-step routes while chaining
    pub fn id(&self) -> &str {
        &self.flow.id
    }

    pub fn build(self) -> Flow {
        self.flow
    }
}

/// Flows available to the service, by id
#[derive(Default)]
pub struct FlowRegistry {
    flows: HashMap<String, Arc<Flow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, flow: Flow) -> &mut Self {
        self.flows.insert(flow.id.clone(), Arc::new(flow));
        self
    }

    pub fn get(&self, flow_id: &str) -> Result<Arc<Flow>> {
        self.flows
            .get(flow_id)
            .cloned()
            .ok_or_else(|| WizardError::FlowNotFound(flow_id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }
}
