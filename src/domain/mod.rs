//! Domain layer types and invariants.

pub mod error;
pub mod node;
pub mod route;
pub mod theme;
pub mod widget;
