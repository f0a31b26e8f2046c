//! Stratum: Layered Skill Capability Resolution
//!
//! Discovers skill bundles across enterprise, personal, project, and plugin
//! storage tiers, resolves name conflicts by precedence, discloses bundle
//! content progressively, and enforces a skill's restrictions for as long as
//! it is active in an execution unit.

pub mod bundle;
pub mod config;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod index;
pub mod logging;
pub mod storage;
pub mod tooling;
pub mod types;

pub use bundle::{CapabilityBundle, IndexEntry};
pub use error::{ApiError, IndexError, ParseError, ParseErrorKind, StackError};
pub use execution::{ActionCheck, DenyReason, ExecutionUnit};
pub use gateway::{DisclosureGateway, InvokeOutcome};
pub use index::CapabilityIndex;
pub use types::StorageTier;
