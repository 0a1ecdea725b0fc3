//! BrewLink Core - Controller capability descriptor and version parsing
//!
//! This crate provides the foundational types for BrewLink:
//! - Loose semantic version parsing and comparison
//! - The capability descriptor parsed from a controller's version reply
//! - Board, shield and family lookup tables

pub mod controller;
pub mod version;

pub use controller::{
    Board, ControllerInfo, Family, ParseDiagnostic, ParseOutcome, ReplyFormat, Shield,
};
pub use version::Version;
