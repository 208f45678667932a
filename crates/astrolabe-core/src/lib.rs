//! Astrolabe Core Types and Definitions
//!
//! This crate provides the foundational types for the Astrolabe statechart
//! generator. It includes:
//!
//! - **Identifiers**: String-interned identifiers for flattened names ([`identifier::Id`])
//! - **Model**: The read-only element arena and its builder ([`model`] module)
//! - **Document**: A serde description of a model, resolved into the arena ([`document`] module)

pub mod document;
pub mod identifier;
pub mod model;
