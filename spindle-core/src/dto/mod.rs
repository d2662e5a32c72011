//! Data Transfer Objects for external collaborators
//!
//! Payloads returned by services the generator talks to but does not own.

pub mod registry;
