pub mod authz;
pub mod config;
pub mod console;
pub mod differ;
pub mod errors;
pub mod gateway;
pub mod messages;
pub mod models;
pub mod notifications;
pub mod session;
pub mod workflow;

// Re-export commonly used items for tests and the CLI
pub use authz::{can_perform, can_view};
pub use config::ConsoleConfig;
pub use differ::{unassigned_permissions, unassigned_roles, CandidateOption};
pub use errors::{ConsoleError, ConsoleResult};
pub use gateway::{HttpGateway, InMemoryGateway, MutationGateway, SharedGateway};
pub use session::Session;
pub use workflow::{AssignmentKind, AssignmentWorkflow, SubmitOutcome, WorkflowState};
