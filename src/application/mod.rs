//! Application services and the collaborator seams they depend on.

pub mod catalog;
pub mod error;
