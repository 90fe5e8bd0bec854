//! Shared utilities and common types for the SquadVibe studio backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Image data-URL encoding and decoding
//! - Identifier generation for stored entities
//! - Common validation logic

pub mod ids;
pub mod image;
pub mod validation;
