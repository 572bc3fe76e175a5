//! Board domain model shared by the markup engine, persistence and UI.
//!
//! # Responsibility
//! - Define the column → group → card → subtask tree.
//! - Provide invariant-preserving edits for the board view.
//!
//! # Invariants
//! - Every child is exclusively owned by its parent.
//! - A card belongs to exactly one container (`Container` sum type).

pub mod board;
pub mod edit;
pub mod ids;
