//! Use-case services over the markup engine and repository.
//!
//! # Responsibility
//! - Keep front ends (CLI, FFI) free of storage and parsing details.
//! - Keep each board's raw-text cache in step with its structure.

pub mod board_service;
