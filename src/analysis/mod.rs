//! Result and reporting modules
//!
//! Packages what a synchronization run produced:
//! - Result types and diagnostics
//! - Quality scoring
//! - Match display and edit counting

pub mod quality;
pub mod report;
pub mod result;
