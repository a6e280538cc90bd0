//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate identity resolution and ledger calls into check-in outcomes.
//! - Keep request-handling layers decoupled from storage details.

pub mod check_in_service;
