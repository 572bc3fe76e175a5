//! Board use-case service.
//!
//! # Responsibility
//! - Create boards from the seed template or imported markup.
//! - Re-derive structure after a raw-text edit.
//! - Apply board-view edits and persist them.
//!
//! # Invariants
//! - The board model is authoritative; `raw_text` is regenerated from it on
//!   every write and never parsed back implicitly.
//! - One use case is one repository write.
//! - Every board returned from a write carries persisted identifiers only.
//! - A board keeps the identity strategy it was created with.

use crate::markup::{default_template, parse, serialize, ParseMetadata};
use crate::model::board::{normalize_line, Board, BoardInvariantError, StorageKeys};
use crate::model::edit::BoardEditError;
use crate::model::ids::{BoardKey, IdentityStrategy};
use crate::repo::board_repo::{BoardRepoError, BoardRepository, BoardSummary};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum BoardServiceError {
    /// Title is empty after normalization.
    InvalidTitle,
    BoardNotFound(BoardKey),
    Edit(BoardEditError),
    Invariant(BoardInvariantError),
    Repo(BoardRepoError),
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "board title cannot be empty"),
            Self::BoardNotFound(key) => write!(f, "board not found: {key}"),
            Self::Edit(err) => write!(f, "{err}"),
            Self::Invariant(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            Self::Invariant(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::InvalidTitle | Self::BoardNotFound(_) => None,
        }
    }
}

impl From<BoardRepoError> for BoardServiceError {
    fn from(value: BoardRepoError) -> Self {
        match value {
            BoardRepoError::BoardNotFound(key) => Self::BoardNotFound(key),
            BoardRepoError::Invariant(err) => Self::Invariant(err),
            other => Self::Repo(other),
        }
    }
}

impl From<BoardEditError> for BoardServiceError {
    fn from(value: BoardEditError) -> Self {
        Self::Edit(value)
    }
}

impl From<BoardInvariantError> for BoardServiceError {
    fn from(value: BoardInvariantError) -> Self {
        Self::Invariant(value)
    }
}

pub type BoardServiceResult<T> = Result<T, BoardServiceError>;

pub struct BoardService<R: BoardRepository> {
    repo: R,
}

impl<R: BoardRepository> BoardService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a board seeded from the default template.
    pub fn create_board(
        &self,
        title: &str,
        identity: IdentityStrategy,
    ) -> BoardServiceResult<Board> {
        self.import_markdown(title, default_template(), identity)
    }

    /// Creates a board from outline markup.
    pub fn import_markdown(
        &self,
        title: &str,
        text: &str,
        identity: IdentityStrategy,
    ) -> BoardServiceResult<Board> {
        let title = checked_title(title)?;
        let board = parse(text, &ParseMetadata { title, identity })?;
        let board = self.persist(board)?;
        info!(
            "event=board_import module=service status=ok board={} identity={} columns={} cards={}",
            board.key.unwrap_or_default(),
            identity,
            board.columns.len(),
            board.card_count()
        );
        Ok(board)
    }

    /// Replaces the structure of board `key` with the structure of `text`.
    ///
    /// Under `Fresh` every child row is replaced. Under `Embedded` cards and
    /// subtasks whose tokens still name this board's rows keep their keys.
    pub fn reparse_markdown(&self, key: BoardKey, text: &str) -> BoardServiceResult<Board> {
        let current = self.repo.load_board(key)?;
        let metadata = ParseMetadata {
            title: current.title,
            identity: current.identity,
        };
        let mut board = parse(text, &metadata)?;
        board.key = Some(key);
        self.persist(board)
    }

    /// Loads board `key`, runs `edit` on it and saves the result.
    ///
    /// Nothing is written when `edit` fails.
    pub fn apply_edit<T>(
        &self,
        key: BoardKey,
        edit: impl FnOnce(&mut Board) -> Result<T, BoardEditError>,
    ) -> BoardServiceResult<(Board, T)> {
        let mut board = self.repo.load_board(key)?;
        let output = edit(&mut board)?;
        board.validate()?;
        let board = self.persist(board)?;
        Ok((board, output))
    }

    /// Serializes board `key` from its structure.
    pub fn export_markdown(&self, key: BoardKey) -> BoardServiceResult<String> {
        let board = self.repo.load_board(key)?;
        Ok(serialize(&board))
    }

    pub fn get_board(&self, key: BoardKey) -> BoardServiceResult<Board> {
        Ok(self.repo.load_board(key)?)
    }

    pub fn list_boards(&self) -> BoardServiceResult<Vec<BoardSummary>> {
        Ok(self.repo.list_boards()?)
    }

    pub fn rename_board(&self, key: BoardKey, title: &str) -> BoardServiceResult<()> {
        let title = checked_title(title)?;
        self.repo.rename_board(key, &title)?;
        Ok(())
    }

    pub fn delete_board(&self, key: BoardKey) -> BoardServiceResult<()> {
        self.repo.delete_board(key)?;
        Ok(())
    }

    /// Saves `board` and applies the returned keys. The raw-text cache is
    /// rendered from the keyed board inside the same write, so embedded
    /// tokens in storage always name stored rows.
    fn persist(&self, mut board: Board) -> BoardServiceResult<Board> {
        let keys: StorageKeys = self.repo.save_board_rendered(&board, &serialize)?;
        board.apply_storage_keys(&keys)?;
        board.raw_text = Some(serialize(&board));
        Ok(board)
    }
}

fn checked_title(title: &str) -> BoardServiceResult<String> {
    let title = normalize_line(title);
    if title.is_empty() {
        return Err(BoardServiceError::InvalidTitle);
    }
    Ok(title)
}
