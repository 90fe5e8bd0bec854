//! Domain layer for the SquadVibe studio backend.
//!
//! This crate contains:
//! - Domain models (Member, Garment, Place, SearchRecord, render types)
//! - The generative stylist capability and its error taxonomy
//! - The studio session state machine (search, detail, compose, result)
//! - Closet helpers and the toast queue

pub mod models;
pub mod services;
