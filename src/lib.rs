pub mod error;
pub mod models;
pub mod config;
pub mod mutator;
pub mod elements;  // Element model, pages and page parsing
pub mod redundancy;
pub mod matcher;
pub mod issue;
pub mod trainer;
pub mod session;
pub mod engine;
pub mod queue;
pub mod auth;
pub mod auditor;
pub mod response_analysis;
pub mod reporting;

// Re-export commonly used items
pub use error::{AuditError, TransportError};
pub use models::*;
pub use config::*;
pub use mutator::*;
pub use elements::*;
pub use redundancy::*;
pub use matcher::*;
pub use issue::*;
pub use trainer::*;
pub use session::*;
pub use engine::*;
pub use queue::*;
pub use auth::*;
pub use auditor::*;
pub use response_analysis::*;
pub use reporting::*;
