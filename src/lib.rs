pub mod application;
pub mod ban;
pub mod config;
pub mod domain;
pub mod infra;
