//! Hierarchy validation for derived governance artifacts
//!
//! Pure checks over an [`govplan_artifact::ArtifactSet`]:
//! - identifier formats and uniqueness
//! - epic / feature / story cardinality and orphans
//! - tautology and business value distinctness
//! - generic acceptance criteria and governance reference shape
//!
//! Every finding is a [`Violation`] collected into a [`ValidationReport`].

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod criteria;
pub mod hierarchy;
pub mod ids;
pub mod policy;
pub mod report;
pub mod text;

pub use criteria::{is_generic_criterion, validate_acceptance_criteria, CriteriaCheck};
pub use hierarchy::{
    check_acceptance_criteria, check_cardinality, check_governance_references,
    check_section_coverage, find_duplicate_epic_ids, find_duplicate_feature_ids,
    find_duplicate_story_ids, find_orphans, HierarchyValidator,
};
pub use ids::{
    validate_epic_id_format, validate_feature_id_format, validate_story_id_format,
    validate_subfeature_id_format, validate_top_level_feature_id_format,
};
pub use policy::{ValidationPolicy, DEFAULT_BUSINESS_VALUE_THRESHOLD, DEFAULT_TAUTOLOGY_THRESHOLD};
pub use report::{ValidationReport, Violation};
pub use text::{
    aligned_match_ratio, is_business_value_distinct, is_business_value_distinct_with,
    is_feature_tautological, is_tautological_with, normalize_words,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
