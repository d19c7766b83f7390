pub mod catalog;
pub mod matcher;
pub mod shape;

pub use catalog::{DataLayout, HardwareCatalog, HardwareCategory, HardwareSpec, DEFAULT_PRESSURE_THRESHOLD};
pub use matcher::{HardwareMatcher, MatchResult, MatchTier};
pub use shape::{DataShape, PACKED_DUAL_LEN, PACKED_SINGLE_LEN};
