//! Flow definitions for the dental care applications.
//!
//! The apply and renew wizards each begin with a shared prefix, then branch on
//! the type of application into a flow of their own. Branches of the same
//! wizard share a session namespace so the answers given before the branch
//! carry over.
pub mod apply;
pub mod protected;
pub mod renew;
pub mod sections;

use wizard_flow::FlowRegistry;

use crate::household::MaritalStatusCodes;

pub const APPLY_NAMESPACE: &str = "apply";
pub const RENEW_NAMESPACE: &str = "renew";
pub const PROTECTED_RENEW_NAMESPACE: &str = "protected-renew";

pub mod flow_ids {
    pub const APPLY_ADULT: &str = "apply-adult";
    pub const APPLY_CHILD: &str = "apply-child";
    pub const APPLY_ADULT_CHILD: &str = "apply-adult-child";
    pub const RENEW_ADULT: &str = "renew-adult";
    pub const RENEW_CHILD: &str = "renew-child";
    pub const RENEW_ADULT_CHILD: &str = "renew-adult-child";
    pub const RENEW_ITA: &str = "renew-ita";
    pub const PROTECTED_RENEW: &str = "protected-renew";
}

/// Flows that require an authenticated client.
pub fn is_protected(flow_id: &str) -> bool {
    flow_id == flow_ids::PROTECTED_RENEW
}

/// Register every flow the service exposes.
pub fn build_registry(codes: &MaritalStatusCodes) -> FlowRegistry {
    let mut registry = FlowRegistry::new();
    registry
        .register(apply::adult(codes))
        .register(apply::child(codes))
        .register(apply::adult_child(codes))
        .register(renew::adult(codes))
        .register(renew::child(codes))
        .register(renew::adult_child(codes))
        .register(renew::ita(codes))
        .register(protected::renew(codes));
    registry
}
