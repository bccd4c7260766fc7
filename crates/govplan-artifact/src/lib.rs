//! Govplan Artifact Model
//!
//! Data types for the document → Epic → Feature → Story hierarchy.
//!
//! # Core Concepts
//!
//! - [`Section`]: Addressable unit of a split document
//! - [`SectionSummary`]: Facts extracted from a section
//! - [`Epic`], [`Feature`], [`Story`]: Delivery artifacts
//! - [`GovernanceReference`]: Citation back to source sections
//! - [`ContentHash`]: 32-byte Blake3 hash for content addressing
//!
//! # Example
//!
//! ```rust,ignore
//! use govplan_artifact::ids;
//!
//! let epic = ids::epic_id("access-policy", 0, 1);
//! let feature = ids::feature_id("proj", &epic, 1);
//! assert_eq!(feature, "proj-epic-accesspo-feature-01");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod hash;
pub mod ids;
mod model;

pub use hash::ContentHash;
pub use model::{
    ArtifactSet, DocumentMeta, Epic, Feature, GovernanceReference, Section, SectionSummary, Story,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
