//! Board repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist whole boards and hand back the storage keys assigned on write.
//! - Rebuild boards from rows, rejecting rows that cannot form a valid board.
//!
//! # Invariants
//! - Writes call `Board::validate()` before any SQL runs.
//! - One save is one immediate transaction: upsert rows this board owns,
//!   insert everything else, delete owned rows no longer present.
//! - A persisted identifier owned by another board is never updated; it is
//!   inserted as a new row and reported in `StorageKeys`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::board::{
    Board, BoardInvariantError, Card, Column, Container, EntityKind, Group, StorageKeys, Subtask,
};
use crate::model::ids::{BoardKey, EntityId, IdentityStrategy};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const REQUIRED_TABLES: [&str; 5] = ["boards", "board_columns", "card_groups", "cards", "subtasks"];

pub type BoardRepoResult<T> = Result<T, BoardRepoError>;

#[derive(Debug)]
pub enum BoardRepoError {
    Db(DbError),
    BoardNotFound(BoardKey),
    /// The board handed to `save_board` breaks a model invariant.
    Invariant(BoardInvariantError),
    /// Stored rows cannot form a valid board.
    InvalidData(String),
    /// Connection was not opened through `db::open_db*`.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for BoardRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::BoardNotFound(key) => write!(f, "board not found: {key}"),
            Self::Invariant(err) => write!(f, "board rejected: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted board data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "board repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for BoardRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Invariant(err) => Some(err),
            Self::BoardNotFound(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for BoardRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for BoardRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<BoardInvariantError> for BoardRepoError {
    fn from(value: BoardInvariantError) -> Self {
        Self::Invariant(value)
    }
}

/// One row of the board list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub key: BoardKey,
    pub title: String,
    pub identity: IdentityStrategy,
    pub column_count: u32,
    pub card_count: u32,
    pub completed_card_count: u32,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

/// Persistence boundary for boards.
pub trait BoardRepository {
    fn load_board(&self, key: BoardKey) -> BoardRepoResult<Board>;
    /// Writes `board` and returns the keys of every identifier that changed.
    /// The caller applies them with `Board::apply_storage_keys`.
    /// `board.raw_text` is stored as given.
    fn save_board(&self, board: &Board) -> BoardRepoResult<StorageKeys>;
    /// Same as [`BoardRepository::save_board`], but the raw-text cache is
    /// `render` of the board with the new keys applied, written in the same
    /// transaction.
    fn save_board_rendered(
        &self,
        board: &Board,
        render: &dyn Fn(&Board) -> String,
    ) -> BoardRepoResult<StorageKeys>;
    /// Most recently updated first.
    fn list_boards(&self) -> BoardRepoResult<Vec<BoardSummary>>;
    fn delete_board(&self, key: BoardKey) -> BoardRepoResult<()>;
    fn rename_board(&self, key: BoardKey, title: &str) -> BoardRepoResult<()>;
}

pub struct SqliteBoardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardRepository<'conn> {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema is not at the latest
    ///   version or a board table is missing.
    pub fn try_new(conn: &'conn Connection) -> BoardRepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SqliteBoardRepository<'_> {
    fn write(
        &self,
        board: &Board,
        render: Option<&dyn Fn(&Board) -> String>,
    ) -> BoardRepoResult<StorageKeys> {
        let started = Instant::now();
        board.validate()?;
        if board.title.trim().is_empty() {
            return Err(BoardRepoError::InvalidData(
                "board title cannot be empty".to_string(),
            ));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let board_key = write_board_row(&tx, board)?;
        let mut writer = BoardWriter::new(&tx, board_key)?;
        for column in &board.columns {
            writer.column(column)?;
        }
        let pruned = writer.prune()?;
        let keys = writer.keys;
        if let Some(render) = render {
            let mut keyed = board.clone();
            keyed.apply_storage_keys(&keys)?;
            tx.execute(
                "UPDATE boards SET raw_text = ?1 WHERE id = ?2;",
                params![render(&keyed), board_key],
            )?;
        }
        tx.commit()?;

        info!(
            "event=board_save module=repo status=ok board={} inserted={} pruned={} rendered={} duration_ms={}",
            board_key,
            keys.len(),
            pruned,
            render.is_some(),
            started.elapsed().as_millis()
        );
        Ok(keys)
    }
}

impl BoardRepository for SqliteBoardRepository<'_> {
    fn load_board(&self, key: BoardKey) -> BoardRepoResult<Board> {
        let started = Instant::now();
        let result = read_board(self.conn, key);
        match &result {
            Ok(board) => info!(
                "event=board_load module=repo status=ok board={} columns={} cards={} duration_ms={}",
                key,
                board.columns.len(),
                board.card_count(),
                started.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=board_load module=repo status=error board={} duration_ms={} error={}",
                key,
                started.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn save_board(&self, board: &Board) -> BoardRepoResult<StorageKeys> {
        self.write(board, None)
    }

    fn save_board_rendered(
        &self,
        board: &Board,
        render: &dyn Fn(&Board) -> String,
    ) -> BoardRepoResult<StorageKeys> {
        self.write(board, Some(render))
    }

    fn list_boards(&self) -> BoardRepoResult<Vec<BoardSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                b.id,
                b.title,
                b.identity_strategy,
                b.updated_at,
                (SELECT COUNT(*) FROM board_columns c WHERE c.board_id = b.id),
                (SELECT COUNT(*) FROM cards k WHERE k.board_id = b.id),
                (SELECT COUNT(*) FROM cards k WHERE k.board_id = b.id AND k.completed = 1)
             FROM boards b
             ORDER BY b.updated_at DESC, b.id DESC;",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, u32>(6)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (key, title, identity, updated_at, column_count, card_count, completed) = row?;
            summaries.push(BoardSummary {
                key,
                title,
                identity: parse_identity(&identity)?,
                column_count,
                card_count,
                completed_card_count: completed,
                updated_at,
            });
        }
        Ok(summaries)
    }

    fn delete_board(&self, key: BoardKey) -> BoardRepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM boards WHERE id = ?1;", [key])?;
        if changed == 0 {
            return Err(BoardRepoError::BoardNotFound(key));
        }
        info!("event=board_delete module=repo status=ok board={key}");
        Ok(())
    }

    fn rename_board(&self, key: BoardKey, title: &str) -> BoardRepoResult<()> {
        if title.trim().is_empty() {
            return Err(BoardRepoError::InvalidData(
                "board title cannot be empty".to_string(),
            ));
        }
        let changed = self.conn.execute(
            "UPDATE boards
             SET title = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![title, key],
        )?;
        if changed == 0 {
            return Err(BoardRepoError::BoardNotFound(key));
        }
        Ok(())
    }
}

/// Row ids of one board, per entity kind.
#[derive(Debug, Default)]
struct RowSets {
    columns: HashSet<i64>,
    groups: HashSet<i64>,
    cards: HashSet<i64>,
    subtasks: HashSet<i64>,
}

impl RowSets {
    fn of(&self, kind: EntityKind) -> &HashSet<i64> {
        match kind {
            EntityKind::Column => &self.columns,
            EntityKind::Group => &self.groups,
            EntityKind::Card => &self.cards,
            EntityKind::Subtask => &self.subtasks,
        }
    }

    fn of_mut(&mut self, kind: EntityKind) -> &mut HashSet<i64> {
        match kind {
            EntityKind::Column => &mut self.columns,
            EntityKind::Group => &mut self.groups,
            EntityKind::Card => &mut self.cards,
            EntityKind::Subtask => &mut self.subtasks,
        }
    }
}

/// Per-save state: rows owned before the save, rows written by it, and the
/// identifiers that received new keys.
struct BoardWriter<'a> {
    conn: &'a Connection,
    board_key: BoardKey,
    owned: RowSets,
    kept: RowSets,
    keys: StorageKeys,
}

impl<'a> BoardWriter<'a> {
    fn new(conn: &'a Connection, board_key: BoardKey) -> BoardRepoResult<Self> {
        let owned = RowSets {
            columns: row_ids(
                conn,
                "SELECT id FROM board_columns WHERE board_id = ?1;",
                board_key,
            )?,
            groups: row_ids(
                conn,
                "SELECT g.id FROM card_groups g
                 JOIN board_columns c ON c.id = g.column_id
                 WHERE c.board_id = ?1;",
                board_key,
            )?,
            cards: row_ids(conn, "SELECT id FROM cards WHERE board_id = ?1;", board_key)?,
            subtasks: row_ids(
                conn,
                "SELECT s.id FROM subtasks s
                 JOIN cards k ON k.id = s.card_id
                 WHERE k.board_id = ?1;",
                board_key,
            )?,
        };
        Ok(Self {
            conn,
            board_key,
            owned,
            kept: RowSets::default(),
            keys: StorageKeys::new(board_key),
        })
    }

    /// Updates the row behind `id` when this board owns it, otherwise inserts.
    fn upsert(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        update: impl FnOnce(i64) -> rusqlite::Result<usize>,
        insert: impl FnOnce() -> rusqlite::Result<i64>,
    ) -> BoardRepoResult<i64> {
        let owned_row = id
            .persisted()
            .filter(|row| self.owned.of(kind).contains(row));
        let row = match owned_row {
            Some(row) => {
                update(row)?;
                row
            }
            None => {
                let row = insert()?;
                key_map(&mut self.keys, kind).insert(id, row);
                row
            }
        };
        self.kept.of_mut(kind).insert(row);
        Ok(row)
    }

    fn column(&mut self, column: &Column) -> BoardRepoResult<()> {
        let conn = self.conn;
        let board_key = self.board_key;
        let row = self.upsert(
            EntityKind::Column,
            column.id,
            |row| {
                conn.execute(
                    "UPDATE board_columns SET title = ?1, position = ?2, level = ?3 WHERE id = ?4;",
                    params![column.title, column.position, column.level, row],
                )
            },
            || {
                conn.execute(
                    "INSERT INTO board_columns (board_id, title, position, level)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![board_key, column.title, column.position, column.level],
                )?;
                Ok(conn.last_insert_rowid())
            },
        )?;

        for card in &column.cards {
            self.card(card, Some(row), None)?;
        }
        for group in &column.groups {
            self.group(group, row)?;
        }
        Ok(())
    }

    fn group(&mut self, group: &Group, column_row: i64) -> BoardRepoResult<()> {
        let conn = self.conn;
        let row = self.upsert(
            EntityKind::Group,
            group.id,
            |row| {
                conn.execute(
                    "UPDATE card_groups SET column_id = ?1, title = ?2, position = ?3 WHERE id = ?4;",
                    params![column_row, group.title, group.position, row],
                )
            },
            || {
                conn.execute(
                    "INSERT INTO card_groups (column_id, title, position) VALUES (?1, ?2, ?3);",
                    params![column_row, group.title, group.position],
                )?;
                Ok(conn.last_insert_rowid())
            },
        )?;

        for card in &group.cards {
            self.card(card, None, Some(row))?;
        }
        Ok(())
    }

    fn card(
        &mut self,
        card: &Card,
        column_row: Option<i64>,
        group_row: Option<i64>,
    ) -> BoardRepoResult<()> {
        let conn = self.conn;
        let board_key = self.board_key;
        let row = self.upsert(
            EntityKind::Card,
            card.id,
            |row| {
                conn.execute(
                    "UPDATE cards
                     SET column_id = ?1, group_id = ?2, text = ?3, completed = ?4, position = ?5
                     WHERE id = ?6;",
                    params![column_row, group_row, card.text, card.completed, card.position, row],
                )
            },
            || {
                conn.execute(
                    "INSERT INTO cards (board_id, column_id, group_id, text, completed, position)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![
                        board_key,
                        column_row,
                        group_row,
                        card.text,
                        card.completed,
                        card.position
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            },
        )?;

        for subtask in &card.subtasks {
            self.subtask(subtask, row)?;
        }
        Ok(())
    }

    fn subtask(&mut self, subtask: &Subtask, card_row: i64) -> BoardRepoResult<()> {
        let conn = self.conn;
        self.upsert(
            EntityKind::Subtask,
            subtask.id,
            |row| {
                conn.execute(
                    "UPDATE subtasks SET card_id = ?1, text = ?2, completed = ?3, position = ?4
                     WHERE id = ?5;",
                    params![card_row, subtask.text, subtask.completed, subtask.position, row],
                )
            },
            || {
                conn.execute(
                    "INSERT INTO subtasks (card_id, text, completed, position)
                     VALUES (?1, ?2, ?3, ?4);",
                    params![card_row, subtask.text, subtask.completed, subtask.position],
                )?;
                Ok(conn.last_insert_rowid())
            },
        )?;
        Ok(())
    }

    /// Deletes owned rows the saved board no longer contains, leaves first.
    fn prune(&self) -> BoardRepoResult<usize> {
        let plan = [
            (EntityKind::Subtask, "DELETE FROM subtasks WHERE id = ?1;"),
            (EntityKind::Card, "DELETE FROM cards WHERE id = ?1;"),
            (EntityKind::Group, "DELETE FROM card_groups WHERE id = ?1;"),
            (EntityKind::Column, "DELETE FROM board_columns WHERE id = ?1;"),
        ];
        let mut pruned = 0;
        for (kind, sql) in plan {
            let mut stmt = self.conn.prepare(sql)?;
            for row in self.owned.of(kind).difference(self.kept.of(kind)) {
                pruned += stmt.execute([row])?;
            }
        }
        Ok(pruned)
    }
}

fn key_map(keys: &mut StorageKeys, kind: EntityKind) -> &mut HashMap<EntityId, i64> {
    match kind {
        EntityKind::Column => &mut keys.columns,
        EntityKind::Group => &mut keys.groups,
        EntityKind::Card => &mut keys.cards,
        EntityKind::Subtask => &mut keys.subtasks,
    }
}

fn write_board_row(conn: &Connection, board: &Board) -> BoardRepoResult<BoardKey> {
    match board.key {
        Some(key) => {
            let changed = conn.execute(
                "UPDATE boards
                 SET title = ?1,
                     identity_strategy = ?2,
                     raw_text = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4;",
                params![board.title, board.identity.as_str(), board.raw_text, key],
            )?;
            if changed == 0 {
                return Err(BoardRepoError::BoardNotFound(key));
            }
            Ok(key)
        }
        None => {
            conn.execute(
                "INSERT INTO boards (title, identity_strategy, raw_text, created_at, updated_at)
                 VALUES (?1, ?2, ?3, (strftime('%s', 'now') * 1000), (strftime('%s', 'now') * 1000));",
                params![board.title, board.identity.as_str(), board.raw_text],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

fn row_ids(conn: &Connection, sql: &str, board_key: BoardKey) -> BoardRepoResult<HashSet<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([board_key], |row| row.get::<_, i64>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(ids)
}

fn read_board(conn: &Connection, key: BoardKey) -> BoardRepoResult<Board> {
    let header = conn
        .query_row(
            "SELECT title, identity_strategy, raw_text FROM boards WHERE id = ?1;",
            [key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((title, identity, raw_text)) = header else {
        return Err(BoardRepoError::BoardNotFound(key));
    };

    let mut board = Board::new(title, parse_identity(&identity)?);
    board.key = Some(key);
    board.raw_text = raw_text;

    let mut column_index: HashMap<i64, usize> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT id, title, position, level FROM board_columns
         WHERE board_id = ?1
         ORDER BY position, id;",
    )?;
    let mut rows = stmt.query([key])?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let mut column = Column::new(
            EntityId::Persisted(id),
            row.get::<_, String>(1)?,
            position(row.get(2)?)?,
        );
        column.level = u8::try_from(row.get::<_, i64>(3)?).map_err(|_| {
            BoardRepoError::InvalidData(format!("column {id} has out-of-range level"))
        })?;
        column_index.insert(id, board.columns.len());
        board.columns.push(column);
    }

    let mut group_index: HashMap<i64, (usize, usize)> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT g.id, g.column_id, g.title, g.position FROM card_groups g
         JOIN board_columns c ON c.id = g.column_id
         WHERE c.board_id = ?1
         ORDER BY g.position, g.id;",
    )?;
    let mut rows = stmt.query([key])?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let column_row: i64 = row.get(1)?;
        let Some(&ci) = column_index.get(&column_row) else {
            return Err(BoardRepoError::InvalidData(format!(
                "group {id} references unknown column {column_row}"
            )));
        };
        let column = &mut board.columns[ci];
        group_index.insert(id, (ci, column.groups.len()));
        column.groups.push(Group::new(
            EntityId::Persisted(id),
            row.get::<_, String>(2)?,
            position(row.get(3)?)?,
        ));
    }

    let mut subtasks_by_card: HashMap<i64, Vec<Subtask>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT s.id, s.card_id, s.text, s.completed, s.position FROM subtasks s
         JOIN cards k ON k.id = s.card_id
         WHERE k.board_id = ?1
         ORDER BY s.position, s.id;",
    )?;
    let mut rows = stmt.query([key])?;
    while let Some(row) = rows.next()? {
        let card_row: i64 = row.get(1)?;
        subtasks_by_card.entry(card_row).or_default().push(Subtask::new(
            EntityId::Persisted(row.get(0)?),
            row.get::<_, String>(2)?,
            row.get(3)?,
            position(row.get(4)?)?,
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT id, column_id, group_id, text, completed, position FROM cards
         WHERE board_id = ?1
         ORDER BY position, id;",
    )?;
    let mut rows = stmt.query([key])?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let column_row: Option<i64> = row.get(1)?;
        let group_row: Option<i64> = row.get(2)?;
        let (container, cards) = match (column_row, group_row) {
            (Some(column_row), None) => {
                let ci = *column_index
                    .get(&column_row)
                    .ok_or_else(|| unknown_container(id, "column", column_row))?;
                (
                    Container::Column(EntityId::Persisted(column_row)),
                    &mut board.columns[ci].cards,
                )
            }
            (None, Some(group_row)) => {
                let (ci, gi) = *group_index
                    .get(&group_row)
                    .ok_or_else(|| unknown_container(id, "group", group_row))?;
                (
                    Container::Group(EntityId::Persisted(group_row)),
                    &mut board.columns[ci].groups[gi].cards,
                )
            }
            _ => {
                return Err(BoardRepoError::InvalidData(format!(
                    "card {id} must reference exactly one container"
                )))
            }
        };

        let mut card = Card::new(
            EntityId::Persisted(id),
            row.get::<_, String>(3)?,
            row.get(4)?,
            position(row.get(5)?)?,
            container,
        );
        card.subtasks = subtasks_by_card.remove(&id).unwrap_or_default();
        cards.push(card);
    }

    board
        .validate()
        .map_err(|err| BoardRepoError::InvalidData(format!("board {key}: {err}")))?;
    Ok(board)
}

fn unknown_container(card: i64, kind: &str, row: i64) -> BoardRepoError {
    BoardRepoError::InvalidData(format!("card {card} references unknown {kind} {row}"))
}

fn position(value: i64) -> BoardRepoResult<u32> {
    u32::try_from(value)
        .map_err(|_| BoardRepoError::InvalidData(format!("order index out of range: {value}")))
}

fn parse_identity(value: &str) -> BoardRepoResult<IdentityStrategy> {
    value.parse().map_err(BoardRepoError::InvalidData)
}

fn ensure_connection_ready(conn: &Connection) -> BoardRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(BoardRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    for table in REQUIRED_TABLES {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(BoardRepoError::InvalidData(format!(
                "missing required table `{table}`"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BoardRepoError, BoardRepository, SqliteBoardRepository};
    use crate::db::open_db_in_memory;
    use crate::model::board::{Board, Container, EntityKind};
    use crate::model::ids::IdentityStrategy;
    use rusqlite::Connection;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteBoardRepository::try_new(&conn).err().unwrap();
        assert!(matches!(
            err,
            BoardRepoError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn save_rejects_invalid_board_before_writing() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBoardRepository::try_new(&conn).unwrap();
        let mut board = Board::new("B", IdentityStrategy::Fresh);
        let column = board.add_column("A").unwrap();
        board.add_card(Container::Column(column), "x").unwrap();
        board.columns[0].cards[0].position = 4;

        let err = repo.save_board(&board).unwrap_err();
        assert!(matches!(err, BoardRepoError::Invariant(_)));
        assert!(repo.list_boards().unwrap().is_empty());
    }

    #[test]
    fn load_rejects_rows_with_gapped_order() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBoardRepository::try_new(&conn).unwrap();
        let mut board = Board::new("B", IdentityStrategy::Fresh);
        board.add_column("A").unwrap();
        let keys = repo.save_board(&board).unwrap();

        conn.execute("UPDATE board_columns SET position = 2;", [])
            .unwrap();
        let err = repo.load_board(keys.board_key).unwrap_err();
        assert!(matches!(err, BoardRepoError::InvalidData(_)));
    }

    #[test]
    fn foreign_persisted_ids_are_inserted_not_updated() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBoardRepository::try_new(&conn).unwrap();

        let mut first = Board::new("one", IdentityStrategy::Embedded);
        first.add_column("A").unwrap();
        let keys = repo.save_board(&first).unwrap();
        first.apply_storage_keys(&keys).unwrap();
        let foreign = first.columns[0].id;

        let mut second = Board::new("two", IdentityStrategy::Embedded);
        second.add_column("B").unwrap();
        second.columns[0].id = foreign;
        let keys = repo.save_board(&second).unwrap();

        let remapped = keys.resolve(EntityKind::Column, foreign).unwrap();
        assert_ne!(remapped, foreign);
        assert_eq!(repo.load_board(first.key.unwrap()).unwrap().columns[0].title, "A");
    }

    #[test]
    fn rendered_save_stores_text_of_keyed_board() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteBoardRepository::try_new(&conn).unwrap();
        let mut board = Board::new("B", IdentityStrategy::Embedded);
        let column = board.add_column("A").unwrap();
        let card = board.add_card(Container::Column(column), "x").unwrap();
        board.raw_text = Some("stale".to_string());

        let keys = repo
            .save_board_rendered(&board, &|keyed: &Board| {
                format!("{}", keyed.columns[0].cards[0].id)
            })
            .unwrap();
        let row = keys.resolve(EntityKind::Card, card).unwrap();
        let loaded = repo.load_board(keys.board_key).unwrap();
        assert_eq!(loaded.raw_text, Some(row.to_string()));
    }
}
