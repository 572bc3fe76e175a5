//! Persistence contracts and their SQLite implementation.
//!
//! # Invariants
//! - Writes validate the board before SQL runs.
//! - Reads reject stored rows that cannot form a valid board instead of
//!   repairing them.

pub mod board_repo;
