//! Image-difference engine for visual regression review.
//!
//! Given a baseline and a current screenshot, produce a mismatch percentage
//! and a diff image, honouring ignore regions and a [`ComparisonPolicy`].

pub mod batch;
pub mod compare;
pub mod config;
pub mod encode;
pub mod engine;
pub mod error;
pub mod load;
pub mod store;

pub use self::compare::{
    ComparisonPolicy, ComparisonResult, DimensionDifference, ErrorType, IgnoreRegion, Rgb,
    is_significant, is_significant_with,
};
pub use self::encode::ArtifactTarget;
pub use self::engine::{CompareRequest, ComparisonTask, Engine, analyze};
pub use self::error::DiffError;
pub use self::load::{ImageRef, Loader};
