use thiserror::Error;

mod app_config;
pub mod auth;
mod config;
pub mod criteria;
pub mod plan;
pub mod scoring;

pub use app_config::{AppConfig, Environment};
pub use auth::hash_api_key;
pub use config::{load_app_config, load_app_config_from_env};
pub use criteria::{CriteriaError, PricingModel, SearchCriteria, SearchStatus};
pub use plan::Plan;
pub use scoring::{score_opportunity, OpportunityFacts, ScoredCandidate};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
