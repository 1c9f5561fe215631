pub mod annotate;
pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod model;
pub mod platform;
pub mod progress;
pub mod resolver;
pub mod scanner;
pub mod service;

pub use crate::config::AppConfig;
pub use engine::{ImportEngine, RunReport};
pub use error::Error;
pub use model::{AdminCredential, Impersonation, ImportIdentity, Outcome, OutcomeStatus};
pub use progress::{RunReporter, SilentReporter};
