//! Domain layer for Component Guardian
//!
//! CDD Principle: Domain Model - Pure types for convention conformance
//! - Component units describe what the scanner found on disk
//! - Violations, warnings and reports describe what the rules concluded
//! - Independent of file system walking and output formatting

pub mod unit;
pub mod violations;

// Re-export main domain types for convenience
pub use unit::*;
pub use violations::*;
