//! Core of markboard: a task board that is both a structured view and plain
//! outline markup.
//! This crate owns every board invariant; front ends only call into it.

pub mod config;
pub mod db;
pub mod logging;
pub mod markup;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError, LoggingStatus};
pub use markup::{default_template, parse, serialize, ParseMetadata};
pub use model::board::{
    Board, BoardInvariantError, Card, Column, Container, EntityKind, Group, StorageKeys, Subtask,
};
pub use model::edit::{BoardEditError, EditResult};
pub use model::ids::{BoardKey, EntityId, IdentityStrategy};
pub use repo::board_repo::{
    BoardRepoError, BoardRepoResult, BoardRepository, BoardSummary, SqliteBoardRepository,
};
pub use service::board_service::{BoardService, BoardServiceError, BoardServiceResult};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
