//! SSA construction and maintenance, and HighVariable merging/cover
//! (spec.md §4.2).

pub mod build;
pub mod cover;

pub use build::build_ssa;
pub use cover::{merge_high_variables, Cover, CoverRange, HighVariable};
