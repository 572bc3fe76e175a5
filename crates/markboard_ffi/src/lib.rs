//! Host-facing bindings for markboard.

pub mod api;
