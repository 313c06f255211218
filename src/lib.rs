//! IELTS Review: result review service with a guided feedback tour.

pub mod config;
pub mod error;
pub mod review;
pub mod store;
pub mod tutorial;
