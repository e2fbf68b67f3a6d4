//! Application layer: use cases around the synchronization engine
//!
//! This layer loads record documents and configuration and drives the domain.

pub mod document;
pub mod error;
pub mod error_ext;
pub mod kinds;
pub mod outline;
pub mod session;

pub use document::{RecordDocument, RecordSpec};
pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use kinds::build_registry;
pub use outline::OutlineRenderer;
pub use session::{MirrorSession, TreeStats};
