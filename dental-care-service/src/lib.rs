pub mod config;
pub mod flows;
pub mod household;
pub mod messages;
pub mod models;
pub mod repository;
pub mod service;
pub mod steps;
pub mod validation;

pub use config::{LogFormat, ServiceConfig};
pub use flows::build_registry;
pub use repository::{ApplicationRepository, InMemoryApplicationRepository};
pub use service::{AppState, build_router};
