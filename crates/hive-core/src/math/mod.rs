//! # Mathematical Functions

pub mod amounts;
pub mod bin_math;

pub use amounts::*;
pub use bin_math::*;
