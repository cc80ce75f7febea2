//! Write Path Test Suite
//!
//! One-shot (non-transactional) writes through DocSink and ListWriter:
//! decoding, value-tree decomposition, idempotent upserts and error
//! reporting.

#[path = "../common/mod.rs"]
mod common;

mod config;
mod errors;
mod upsert_cases;
mod write_semantics;
