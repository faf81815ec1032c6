//! Typed wrappers over the REST resources
//!
//! Each service forwards to [`HttpClient`](crate::HttpClient); they add
//! resource paths, body types and the few resource-specific error rules.

pub mod faculty;
pub mod review;

pub use faculty::{Faculty, FacultyService};
pub use review::{RatingSummary, Review, ReviewService};
