mod activity;
mod coalescer;
mod error;
mod expander;
mod org_state;

pub use activity::{Activity, ActivityResult, ReconciliationInput};
pub use coalescer::Coalescer;
pub use error::EngineError;
pub use expander::Expander;
