//! Caller-side use-case services.
//!
//! # Responsibility
//! - Validate input, orchestrate repository calls and map error kinds.
//! - Keep the CLI decoupled from storage details.

pub mod item_service;
