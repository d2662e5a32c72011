//! Spindle Core
//!
//! Core types for the Spindle pipeline generator.
//!
//! This crate contains:
//! - Domain types: the application configuration model and the pipeline
//!   definitions understood by the remote orchestration service
//! - DTOs: payloads exchanged with external collaborators (container registry)

pub mod domain;
pub mod dto;
pub mod error;

pub use error::ConfigError;
