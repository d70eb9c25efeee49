//! Markup and JSON extraction
//!
//! Contains the URL filter and the ordered rule engine every adapter
//! runs fetched pages through.

pub mod filter;
pub mod rules;

pub use filter::{ImageFilter, Rejection, image_extension, is_well_formed_image_url};
pub use rules::{ExtractionRule, Extracted, RuleSet};
