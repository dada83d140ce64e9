//! Tree rewrites from logical to renderer-facing structure
//!
//! - [`page_based`]: nested sections and endings to pages, systems and milestones
//! - [`cast_off`]: unmeasured mensural content to barline-aligned measures

pub mod alignment;
pub mod cast_off;
pub mod page_based;

pub use alignment::{element_duration, BarLineAlignment};
pub use cast_off::{CastOffOptions, CastOffSummary, ConvertToCastOffMensuralFunctor};
pub use page_based::{
    logical_outline, page_based_outline, ConvertToPageBasedFunctor, MilestoneError, OutlineNode,
};
