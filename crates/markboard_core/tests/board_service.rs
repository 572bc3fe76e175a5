use markboard_core::db::open_db_in_memory;
use markboard_core::{
    default_template, Board, BoardEditError, BoardKey, BoardRepoError, BoardRepoResult,
    BoardRepository, BoardService, BoardServiceError, BoardSummary, Container, EntityId,
    IdentityStrategy, SqliteBoardRepository, StorageKeys,
};
use rusqlite::Connection;
use std::cell::Cell;

fn service(conn: &Connection) -> BoardService<SqliteBoardRepository<'_>> {
    BoardService::new(SqliteBoardRepository::try_new(conn).unwrap())
}

#[test]
fn create_board_seeds_template_and_raw_text() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let board = service
        .create_board("  Launch\nplan ", IdentityStrategy::Fresh)
        .unwrap();
    assert_eq!(board.title, "Launch plan");
    assert_eq!(board.raw_text.as_deref(), Some(default_template()));
    assert_eq!(board.columns.len(), 3);

    let stored = service.get_board(board.key.unwrap()).unwrap();
    assert_eq!(stored, board);
}

#[test]
fn create_board_rejects_blank_title() {
    let conn = open_db_in_memory().unwrap();
    assert!(matches!(
        service(&conn).create_board(" \n", IdentityStrategy::Fresh),
        Err(BoardServiceError::InvalidTitle)
    ));
}

#[test]
fn embedded_raw_text_carries_persisted_tokens() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let board = service
        .import_markdown("b", "# A\n- [ ] one\n  - [x] sub\n", IdentityStrategy::Embedded)
        .unwrap();
    let card = &board.columns[0].cards[0];
    let expected = format!(
        "# A\n\n- [ ] {{{}}} one\n  - [x] {{{}}} sub\n",
        card.id, card.subtasks[0].id
    );
    assert!(matches!(card.id, EntityId::Persisted(_)));
    assert_eq!(board.raw_text.as_deref(), Some(expected.as_str()));
    assert_eq!(
        service.get_board(board.key.unwrap()).unwrap().raw_text,
        board.raw_text
    );
}

#[test]
fn reparse_keeps_strategy_and_title() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let board = service
        .import_markdown("b", "# A\n- [ ] one\n", IdentityStrategy::Embedded)
        .unwrap();
    let key = board.key.unwrap();
    let one = board.columns[0].cards[0].id;

    let text = board.raw_text.clone().unwrap().replace("# A", "# Renamed") + "\n# B\n";
    let reparsed = service.reparse_markdown(key, &text).unwrap();

    assert_eq!(reparsed.title, "b");
    assert_eq!(reparsed.identity, IdentityStrategy::Embedded);
    assert_eq!(reparsed.columns[0].title, "Renamed");
    assert_eq!(reparsed.columns[0].cards[0].id, one);
    assert_eq!(reparsed.columns[1].title, "B");
}

#[test]
fn apply_edit_persists_and_refreshes_raw_text() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let board = service
        .import_markdown("b", "# A\n- [ ] one\n", IdentityStrategy::Fresh)
        .unwrap();
    let key = board.key.unwrap();
    let column = board.columns[0].id;
    let card = board.columns[0].cards[0].id;

    let (edited, completed) = service
        .apply_edit(key, |board| {
            board.add_card(Container::Column(column), "two")?;
            board.toggle_card(card)
        })
        .unwrap();
    assert!(completed);
    assert_eq!(
        edited.raw_text.as_deref(),
        Some("# A\n\n- [x] one\n- [ ] two\n")
    );
    assert_eq!(service.export_markdown(key).unwrap(), "# A\n\n- [x] one\n- [ ] two\n");
}

#[test]
fn failed_edit_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let board = service
        .import_markdown("b", "# A\n- [ ] one\n", IdentityStrategy::Fresh)
        .unwrap();
    let key = board.key.unwrap();

    let err = service
        .apply_edit(key, |board| board.toggle_card(EntityId::Persisted(9_999)))
        .unwrap_err();
    assert!(matches!(
        err,
        BoardServiceError::Edit(BoardEditError::CardNotFound(_))
    ));
    assert_eq!(service.get_board(key).unwrap(), board);
}

#[test]
fn list_rename_delete_round() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let board = service.create_board("one", IdentityStrategy::Fresh).unwrap();
    let key = board.key.unwrap();

    service.rename_board(key, "two").unwrap();
    let summaries = service.list_boards().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "two");
    assert_eq!(summaries[0].card_count as usize, board.card_count());

    service.delete_board(key).unwrap();
    assert!(matches!(
        service.export_markdown(key),
        Err(BoardServiceError::BoardNotFound(k)) if k == key
    ));
}

/// Delegates to SQLite and refuses every save after the first `budget`.
struct LimitedSaves<'conn> {
    inner: SqliteBoardRepository<'conn>,
    budget: Cell<usize>,
}

impl<'conn> LimitedSaves<'conn> {
    fn new(conn: &'conn Connection, budget: usize) -> Self {
        Self {
            inner: SqliteBoardRepository::try_new(conn).unwrap(),
            budget: Cell::new(budget),
        }
    }

    fn spend(&self) -> BoardRepoResult<()> {
        match self.budget.get() {
            0 => Err(BoardRepoError::InvalidData("save refused".to_string())),
            left => {
                self.budget.set(left - 1);
                Ok(())
            }
        }
    }
}

impl BoardRepository for LimitedSaves<'_> {
    fn load_board(&self, key: BoardKey) -> BoardRepoResult<Board> {
        self.inner.load_board(key)
    }

    fn save_board(&self, board: &Board) -> BoardRepoResult<StorageKeys> {
        self.spend()?;
        self.inner.save_board(board)
    }

    fn save_board_rendered(
        &self,
        board: &Board,
        render: &dyn Fn(&Board) -> String,
    ) -> BoardRepoResult<StorageKeys> {
        self.spend()?;
        self.inner.save_board_rendered(board, render)
    }

    fn list_boards(&self) -> BoardRepoResult<Vec<BoardSummary>> {
        self.inner.list_boards()
    }

    fn delete_board(&self, key: BoardKey) -> BoardRepoResult<()> {
        self.inner.delete_board(key)
    }

    fn rename_board(&self, key: BoardKey, title: &str) -> BoardRepoResult<()> {
        self.inner.rename_board(key, title)
    }
}

#[test]
fn embedded_import_is_a_single_write_with_keyed_raw_text() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(LimitedSaves::new(&conn, 1));

    let board = service
        .import_markdown("T", "# A\n- [ ] one\n", IdentityStrategy::Embedded)
        .unwrap();
    let card = board.columns[0].cards[0].id;
    assert!(matches!(card, EntityId::Persisted(_)));

    let stored = service.get_board(board.key.unwrap()).unwrap();
    let expected = format!("# A\n\n- [ ] {{{card}}} one\n");
    assert_eq!(stored.raw_text.as_deref(), Some(expected.as_str()));
    assert!(!expected.contains("{t"));
}

#[test]
fn refused_write_leaves_no_board_behind() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(LimitedSaves::new(&conn, 0));

    let result = service.import_markdown("T", "# A\n- [ ] one\n", IdentityStrategy::Embedded);
    assert!(matches!(result, Err(BoardServiceError::Repo(_))));
    assert!(service.list_boards().unwrap().is_empty());
}

#[test]
fn embedded_edit_keeps_stored_text_in_step_with_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = BoardService::new(LimitedSaves::new(&conn, 2));
    let board = service
        .import_markdown("T", "# A\n", IdentityStrategy::Embedded)
        .unwrap();
    let key = board.key.unwrap();
    let column = board.columns[0].id;

    let (board, card) = service
        .apply_edit(key, |board| board.add_card(Container::Column(column), "new"))
        .unwrap();
    assert!(matches!(card, EntityId::Temporary(_)));
    let stored = service.get_board(key).unwrap();
    let persisted = stored.columns[0].cards[0].id;
    assert_eq!(board.columns[0].cards[0].id, persisted);
    assert_eq!(
        stored.raw_text,
        Some(format!("# A\n\n- [ ] {{{persisted}}} new\n"))
    );
}
