pub mod classifier;
pub mod event;
pub mod ids;
pub mod reconciliation_type;
pub mod run;
pub mod scope;
pub mod site_request;

pub use classifier::{determine_reconciliation_type, determine_scope};
pub use event::{Event, EventStatus};
pub use ids::{OrgId, ProjectId, SiteId};
pub use reconciliation_type::ReconciliationType;
pub use run::{ReconciliationRun, RunStatus, RunType};
pub use scope::Scope;
pub use site_request::{Site, SiteReconciliationRequest};
