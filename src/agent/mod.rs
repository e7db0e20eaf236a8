//! Agent execution layer - timed, deadline-bounded calls with failures as data

pub mod executor;
pub mod types;

pub use executor::AgentExecutor;
pub use types::{AgentOutcome, AgentRequest, AgentResponse, FailureCause};
