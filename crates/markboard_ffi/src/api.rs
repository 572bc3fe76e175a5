//! FFI use-case API for the host UI shell.
//!
//! # Responsibility
//! - Expose board use cases to Dart via FRB as plain strings and envelopes.
//! - Resolve the board database location once per process.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are flattened into `ok = false` plus a message.
//! - Entity identifiers cross the boundary as canonical tokens.

use log::warn;
use markboard_core::db::open_db;
use markboard_core::{
    core_version as core_version_inner, default_template, init_logging as init_logging_inner,
    parse, ping as ping_inner, serialize, Board, BoardEditError, BoardService, BoardServiceResult,
    BoardSummary, Container, EngineConfig, EntityId, IdentityStrategy, LogLevel, ParseMetadata,
    SqliteBoardRepository,
};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const BOARD_DB_FILE_NAME: &str = "markboard.sqlite3";
static BOARD_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Reconfiguration attempts return an error.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = match level.parse::<LogLevel>() {
        Ok(level) => level,
        Err(err) => return err.to_string(),
    };
    match init_logging_inner(level, Path::new(log_dir.trim())) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Seed document for a new board.
#[flutter_rust_bridge::frb(sync)]
pub fn board_template() -> String {
    default_template().to_owned()
}

/// Result envelope for board writes and exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Storage key of the affected board.
    pub board_key: Option<i64>,
    /// Canonical markup of the board after the operation.
    pub markdown: Option<String>,
    /// Board structure as JSON; identifiers use the `phase/value` shape.
    pub board_json: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl BoardActionResponse {
    fn success(message: impl Into<String>, board: &Board) -> Self {
        Self {
            ok: true,
            board_key: board.key,
            markdown: Some(serialize(board)),
            board_json: serde_json::to_string(board).ok(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            board_key: None,
            markdown: None,
            board_json: None,
            message: message.into(),
        }
    }
}

/// One row of the board picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardListItem {
    pub board_key: i64,
    pub title: String,
    /// `fresh|embedded`.
    pub identity: String,
    pub card_count: u32,
    pub completed_card_count: u32,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardListResponse {
    pub ok: bool,
    pub items: Vec<BoardListItem>,
    pub message: String,
}

/// Parse result that is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPreviewResponse {
    pub ok: bool,
    /// Board structure as JSON.
    pub board_json: Option<String>,
    /// Markup as it would be saved.
    pub canonical: Option<String>,
    pub message: String,
}

/// Parses `markdown` without touching storage.
///
/// # FFI contract
/// - Sync call, CPU-only.
/// - `identity`: `fresh|embedded`; `None` uses the configured default.
#[flutter_rust_bridge::frb(sync)]
pub fn board_preview(markdown: String, identity: Option<String>) -> BoardPreviewResponse {
    let failure = |message: String| BoardPreviewResponse {
        ok: false,
        board_json: None,
        canonical: None,
        message,
    };
    let identity = match resolve_identity(identity.as_deref()) {
        Ok(identity) => identity,
        Err(err) => return failure(format!("board_preview failed: {err}")),
    };
    let board = match parse(
        &markdown,
        &ParseMetadata::new("preview").with_identity(identity),
    ) {
        Ok(board) => board,
        Err(err) => return failure(format!("board_preview failed: {err}")),
    };
    match serde_json::to_string(&board) {
        Ok(json) => BoardPreviewResponse {
            ok: true,
            message: format!(
                "{} column(s), {} card(s).",
                board.columns.len(),
                board.card_count()
            ),
            canonical: Some(serialize(&board)),
            board_json: Some(json),
        },
        Err(err) => failure(format!("board_preview failed: {err}")),
    }
}

/// Creates a board seeded from the template.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn board_create(title: String, identity: Option<String>) -> BoardActionResponse {
    let result = resolve_identity(identity.as_deref()).and_then(|identity| {
        with_board_service(|service| service.create_board(&title, identity))
    });
    match result {
        Ok(board) => BoardActionResponse::success("Board created.", &board),
        Err(err) => BoardActionResponse::failure(format!("board_create failed: {err}")),
    }
}

/// Creates a board from user-supplied markup.
#[flutter_rust_bridge::frb(sync)]
pub fn board_import(
    title: String,
    markdown: String,
    identity: Option<String>,
) -> BoardActionResponse {
    let result = resolve_identity(identity.as_deref()).and_then(|identity| {
        with_board_service(|service| service.import_markdown(&title, &markdown, identity))
    });
    match result {
        Ok(board) => BoardActionResponse::success("Board imported.", &board),
        Err(err) => BoardActionResponse::failure(format!("board_import failed: {err}")),
    }
}

/// Rebuilds board structure after the raw text was edited.
#[flutter_rust_bridge::frb(sync)]
pub fn board_reparse(board_key: i64, markdown: String) -> BoardActionResponse {
    match with_board_service(|service| service.reparse_markdown(board_key, &markdown)) {
        Ok(board) => BoardActionResponse::success("Board updated.", &board),
        Err(err) => BoardActionResponse::failure(format!("board_reparse failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_export(board_key: i64) -> BoardActionResponse {
    match with_board_service(|service| service.get_board(board_key)) {
        Ok(board) => BoardActionResponse::success("Board exported.", &board),
        Err(err) => BoardActionResponse::failure(format!("board_export failed: {err}")),
    }
}

/// Appends a column to the board.
#[flutter_rust_bridge::frb(sync)]
pub fn board_add_column(board_key: i64, title: String) -> BoardActionResponse {
    let result = edit_board(board_key, Ok(()), |board, ()| board.add_column(&title));
    respond("board_add_column", "Column added.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_rename_column(board_key: i64, column_id: String, title: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&column_id), |board, column| {
        board.rename_column(column, &title)
    });
    respond("board_rename_column", "Column renamed.", result)
}

/// Moves a column to `index` among its siblings (clamped).
#[flutter_rust_bridge::frb(sync)]
pub fn board_move_column(board_key: i64, column_id: String, index: u32) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&column_id), |board, column| {
        board.move_column(column, index as usize)
    });
    respond("board_move_column", "Column moved.", result)
}

/// Deletes a column with everything under it.
#[flutter_rust_bridge::frb(sync)]
pub fn board_remove_column(board_key: i64, column_id: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&column_id), |board, column| {
        board.remove_column(column)
    });
    respond("board_remove_column", "Column removed.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_add_group(board_key: i64, column_id: String, title: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&column_id), |board, column| {
        board.add_group(column, &title)
    });
    respond("board_add_group", "Group added.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_rename_group(board_key: i64, group_id: String, title: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&group_id), |board, group| {
        board.rename_group(group, &title)
    });
    respond("board_rename_group", "Group renamed.", result)
}

/// Moves a group, with its cards, into `column_id` at `index` (clamped).
#[flutter_rust_bridge::frb(sync)]
pub fn board_move_group(
    board_key: i64,
    group_id: String,
    column_id: String,
    index: u32,
) -> BoardActionResponse {
    let ids = entity_id(&group_id).and_then(|group| Ok((group, entity_id(&column_id)?)));
    let result = edit_board(board_key, ids, |board, (group, column)| {
        board.move_group(group, column, index as usize)
    });
    respond("board_move_group", "Group moved.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_remove_group(board_key: i64, group_id: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&group_id), |board, group| {
        board.remove_group(group)
    });
    respond("board_remove_group", "Group removed.", result)
}

/// Appends a card to a column or group.
///
/// Input semantics:
/// - `container_kind`: `column|group`.
/// - `container_id`: canonical token of that column or group.
#[flutter_rust_bridge::frb(sync)]
pub fn board_add_card(
    board_key: i64,
    container_kind: String,
    container_id: String,
    text: String,
) -> BoardActionResponse {
    let result = edit_board(
        board_key,
        container(&container_kind, &container_id),
        |board, container| board.add_card(container, &text),
    );
    respond("board_add_card", "Card added.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_set_card_text(board_key: i64, card_id: String, text: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&card_id), |board, card| {
        board.set_card_text(card, &text)
    });
    respond("board_set_card_text", "Card updated.", result)
}

/// Flips completion of the card named by `card_id` (canonical token).
#[flutter_rust_bridge::frb(sync)]
pub fn board_toggle_card(board_key: i64, card_id: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&card_id), |board, card| {
        board.toggle_card(card)
    });
    match result {
        Ok((board, completed)) => {
            let message = if completed {
                "Card completed."
            } else {
                "Card reopened."
            };
            BoardActionResponse::success(message, &board)
        }
        Err(err) => BoardActionResponse::failure(format!("board_toggle_card failed: {err}")),
    }
}

/// Moves a card into a column or group at `index` (clamped). Moving into a
/// different container re-parents the card.
#[flutter_rust_bridge::frb(sync)]
pub fn board_move_card(
    board_key: i64,
    card_id: String,
    container_kind: String,
    container_id: String,
    index: u32,
) -> BoardActionResponse {
    let ids = entity_id(&card_id)
        .and_then(|card| Ok((card, container(&container_kind, &container_id)?)));
    let result = edit_board(board_key, ids, |board, (card, container)| {
        board.move_card(card, container, index as usize)
    });
    respond("board_move_card", "Card moved.", result)
}

/// Deletes a card with its subtasks.
#[flutter_rust_bridge::frb(sync)]
pub fn board_remove_card(board_key: i64, card_id: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&card_id), |board, card| {
        board.remove_card(card)
    });
    respond("board_remove_card", "Card removed.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_add_subtask(board_key: i64, card_id: String, text: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&card_id), |board, card| {
        board.add_subtask(card, &text)
    });
    respond("board_add_subtask", "Subtask added.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_set_subtask_text(
    board_key: i64,
    subtask_id: String,
    text: String,
) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&subtask_id), |board, subtask| {
        board.set_subtask_text(subtask, &text)
    });
    respond("board_set_subtask_text", "Subtask updated.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_toggle_subtask(board_key: i64, subtask_id: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&subtask_id), |board, subtask| {
        board.toggle_subtask(subtask)
    });
    match result {
        Ok((board, completed)) => {
            let message = if completed {
                "Subtask completed."
            } else {
                "Subtask reopened."
            };
            BoardActionResponse::success(message, &board)
        }
        Err(err) => BoardActionResponse::failure(format!("board_toggle_subtask failed: {err}")),
    }
}

/// Moves a subtask under `card_id` at `index` (clamped).
#[flutter_rust_bridge::frb(sync)]
pub fn board_move_subtask(
    board_key: i64,
    subtask_id: String,
    card_id: String,
    index: u32,
) -> BoardActionResponse {
    let ids = entity_id(&subtask_id).and_then(|subtask| Ok((subtask, entity_id(&card_id)?)));
    let result = edit_board(board_key, ids, |board, (subtask, card)| {
        board.move_subtask(subtask, card, index as usize)
    });
    respond("board_move_subtask", "Subtask moved.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_remove_subtask(board_key: i64, subtask_id: String) -> BoardActionResponse {
    let result = edit_board(board_key, entity_id(&subtask_id), |board, subtask| {
        board.remove_subtask(subtask)
    });
    respond("board_remove_subtask", "Subtask removed.", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_rename(board_key: i64, title: String) -> BoardActionResponse {
    let result = with_board_service(|service| {
        service.rename_board(board_key, &title)?;
        service.get_board(board_key)
    });
    match result {
        Ok(board) => BoardActionResponse::success("Board renamed.", &board),
        Err(err) => BoardActionResponse::failure(format!("board_rename failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn board_delete(board_key: i64) -> BoardActionResponse {
    match with_board_service(|service| service.delete_board(board_key)) {
        Ok(()) => BoardActionResponse {
            ok: true,
            board_key: Some(board_key),
            markdown: None,
            board_json: None,
            message: "Board deleted.".to_string(),
        },
        Err(err) => BoardActionResponse::failure(format!("board_delete failed: {err}")),
    }
}

/// Lists stored boards, most recently updated first.
#[flutter_rust_bridge::frb(sync)]
pub fn board_list() -> BoardListResponse {
    match with_board_service(|service| service.list_boards()) {
        Ok(summaries) => {
            let items = summaries
                .into_iter()
                .map(to_board_list_item)
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No boards.".to_string()
            } else {
                format!("Found {} board(s).", items.len())
            };
            BoardListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(err) => BoardListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("board_list failed: {err}"),
        },
    }
}

fn resolve_identity(raw: Option<&str>) -> Result<IdentityStrategy, String> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.parse::<IdentityStrategy>(),
        None => Ok(engine_config().identity_strategy),
    }
}

fn container(kind: &str, token: &str) -> Result<Container, String> {
    let id = entity_id(token)?;
    match kind.trim().to_ascii_lowercase().as_str() {
        "column" => Ok(Container::Column(id)),
        "group" => Ok(Container::Group(id)),
        other => Err(format!("unsupported container kind `{other}`; expected column|group")),
    }
}

fn entity_id(token: &str) -> Result<EntityId, String> {
    EntityId::parse_token(token.trim()).ok_or_else(|| format!("invalid entity id `{token}`"))
}

fn engine_config() -> EngineConfig {
    EngineConfig::from_env().unwrap_or_else(|err| {
        warn!("event=config_load module=ffi status=error fallback=default error={err}");
        EngineConfig::default()
    })
}

fn resolve_board_db_path() -> PathBuf {
    BOARD_DB_PATH
        .get_or_init(|| {
            engine_config()
                .db_path
                .unwrap_or_else(|| std::env::temp_dir().join(BOARD_DB_FILE_NAME))
        })
        .clone()
}

fn with_board_service<T>(
    f: impl FnOnce(&BoardService<SqliteBoardRepository<'_>>) -> BoardServiceResult<T>,
) -> Result<T, String> {
    let db_path = resolve_board_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("board DB open failed: {err}"))?;
    let repo = SqliteBoardRepository::try_new(&conn)
        .map_err(|err| format!("board repo init failed: {err}"))?;
    let service = BoardService::new(repo);
    f(&service).map_err(|err| err.to_string())
}

/// Loads board `board_key`, runs `edit` with the decoded `args` and saves.
fn edit_board<A, T>(
    board_key: i64,
    args: Result<A, String>,
    edit: impl FnOnce(&mut Board, A) -> Result<T, BoardEditError>,
) -> Result<(Board, T), String> {
    let args = args?;
    with_board_service(|service| service.apply_edit(board_key, |board| edit(board, args)))
}

fn respond<T>(op: &str, message: &str, result: Result<(Board, T), String>) -> BoardActionResponse {
    match result {
        Ok((board, _)) => BoardActionResponse::success(message, &board),
        Err(err) => BoardActionResponse::failure(format!("{op} failed: {err}")),
    }
}

fn to_board_list_item(summary: BoardSummary) -> BoardListItem {
    BoardListItem {
        board_key: summary.key,
        title: summary.title,
        identity: summary.identity.to_string(),
        card_count: summary.card_count,
        completed_card_count: summary.completed_card_count,
        updated_at: summary.updated_at,
    }
}
