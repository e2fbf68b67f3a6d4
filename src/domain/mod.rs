//! Domain layer: type registry, node tree and synchronization engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod build;
pub mod display;
pub mod error;
pub mod forest;
pub mod ids;
mod lifecycle;
pub mod node;
pub mod record;
pub mod registry;
mod sync;
mod traverse;

pub use build::{ElementHandle, ElementSpec, Renderer};
pub use display::TreeNodeConvert;
pub use error::{SyncError, SyncResult};
pub use forest::{Forest, LifecycleEvent, DEFAULT_MAX_SYNC_DEPTH};
pub use ids::{Identity, NodeId, RecordId, Source};
pub use node::{default_registry, Node, NodeBehavior, NodeClass, Phase, PlainBehavior};
pub use record::{RecordStore, StructuralRecord};
pub use registry::{RegistryHost, TagSource, Tagged, TypeRegistry};
