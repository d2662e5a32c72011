//! Core domain types
//!
//! `config` is the declarative input describing one application; `pipeline`
//! is the definition format stored by the remote orchestration service.

pub mod config;
pub mod pipeline;
