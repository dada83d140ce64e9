//! Transposition of written pitches
//!
//! - [`interval`]: interval and spelled-pitch arithmetic
//! - [`request`]: parsing of transposition requests
//! - [`functor`]: the tree pass, literal or to sounding pitch

pub mod functor;
pub mod harm;
pub mod interval;
pub mod request;
pub mod staff_map;

pub use functor::{KeyContext, TransposeFunctor};
pub use harm::transpose_harm_text;
pub use interval::{Interval, Quality, TransPitch};
pub use request::{Direction, TranspositionError, TranspositionRequest};
pub use staff_map::{StaffMap, ALL_STAVES};
