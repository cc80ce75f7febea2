//! Transaction Test Suite
//!
//! Transactions over the in-memory store: lifecycle and metrics, session
//! rotation after the configured lifetime, and failure handling.

#[path = "../common/mod.rs"]
mod common;

mod lifecycle;
mod rotation;
