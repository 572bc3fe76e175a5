//! Board domain model.
//!
//! # Responsibility
//! - Define the board tree shared by the markup engine, persistence and UI.
//! - Validate structural invariants before a board is serialized or saved.
//! - Apply storage-assigned keys to temporary identifiers all-or-nothing.
//!
//! # Invariants
//! - Order indices in every container are dense, zero-based and match
//!   sequence order.
//! - A card's `container` names the column or group that owns it.
//! - Identifiers are unique per entity kind across the board.
//! - Titles and texts are single-line.

use crate::model::ids::{BoardKey, EntityId, IdentityStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity kind, used in invariant diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Column,
    Group,
    Card,
    Subtask,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Column => "column",
            Self::Group => "group",
            Self::Card => "card",
            Self::Subtask => "subtask",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural invariant violation. Always a programming error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardInvariantError {
    /// Two entities of the same kind share one identifier.
    DuplicateIdentifier { kind: EntityKind, id: EntityId },
    /// A card's container reference does not name its owner.
    ContainerMismatch {
        card: EntityId,
        expected: Container,
        actual: Container,
    },
    /// Order index does not match the entity's sequence position.
    NonDenseOrder {
        kind: EntityKind,
        id: EntityId,
        expected: u32,
        actual: u32,
    },
    /// Title or text contains a line break.
    MultiLineText { kind: EntityKind, id: EntityId },
    /// Column heading level must be at least 1.
    InvalidColumnLevel { id: EntityId, level: u8 },
    /// A temporary identifier has no entry in the storage key map.
    UnmappedTemporaryId { kind: EntityKind, id: EntityId },
}

impl Display for BoardInvariantError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateIdentifier { kind, id } => {
                write!(f, "duplicate {kind} identifier: {id}")
            }
            Self::ContainerMismatch {
                card,
                expected,
                actual,
            } => write!(
                f,
                "card {card} references container {actual} but is owned by {expected}"
            ),
            Self::NonDenseOrder {
                kind,
                id,
                expected,
                actual,
            } => write!(
                f,
                "{kind} {id} has order index {actual}, expected {expected}"
            ),
            Self::MultiLineText { kind, id } => {
                write!(f, "{kind} {id} text must be single-line")
            }
            Self::InvalidColumnLevel { id, level } => {
                write!(f, "column {id} has invalid heading level {level}")
            }
            Self::UnmappedTemporaryId { kind, id } => {
                write!(f, "temporary {kind} identifier {id} has no storage key")
            }
        }
    }
}

impl Error for BoardInvariantError {}

/// Direct container of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Container {
    Column(EntityId),
    Group(EntityId),
}

impl Display for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(id) => write!(f, "column:{id}"),
            Self::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// Leaf task under a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: EntityId,
    pub text: String,
    pub completed: bool,
    pub position: u32,
}

/// Checkbox task, owned by a column or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: EntityId,
    pub text: String,
    pub completed: bool,
    pub position: u32,
    pub container: Container,
    pub subtasks: Vec<Subtask>,
}

/// Second-level section nested in one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: EntityId,
    pub title: String,
    pub position: u32,
    pub cards: Vec<Card>,
}

/// Top-level section of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: EntityId,
    pub title: String,
    pub position: u32,
    /// Heading depth observed in the source (always 1 when parsed).
    pub level: u8,
    pub groups: Vec<Group>,
    /// Ungrouped cards.
    pub cards: Vec<Card>,
}

/// One document's worth of board data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Storage key. `None` until the board is first saved.
    pub key: Option<BoardKey>,
    pub title: String,
    /// Serialized text cache for the raw view. Derived, never authoritative.
    pub raw_text: Option<String>,
    pub identity: IdentityStrategy,
    pub columns: Vec<Column>,
}

/// Result of persisting a board: its key plus every identifier that changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageKeys {
    pub board_key: BoardKey,
    pub columns: HashMap<EntityId, i64>,
    pub groups: HashMap<EntityId, i64>,
    pub cards: HashMap<EntityId, i64>,
    pub subtasks: HashMap<EntityId, i64>,
}

impl StorageKeys {
    pub fn new(board_key: BoardKey) -> Self {
        Self {
            board_key,
            ..Self::default()
        }
    }

    fn map_for(&self, kind: EntityKind) -> &HashMap<EntityId, i64> {
        match kind {
            EntityKind::Column => &self.columns,
            EntityKind::Group => &self.groups,
            EntityKind::Card => &self.cards,
            EntityKind::Subtask => &self.subtasks,
        }
    }

    /// Returns the new identifier of `id`, if it changed on save.
    pub fn resolve(&self, kind: EntityKind, id: EntityId) -> Option<EntityId> {
        self.map_for(kind)
            .get(&id)
            .map(|key| EntityId::Persisted(*key))
    }

    /// Number of remapped identifiers across all kinds.
    pub fn len(&self) -> usize {
        self.columns.len() + self.groups.len() + self.cards.len() + self.subtasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Subtask {
    pub fn new(id: EntityId, text: impl Into<String>, completed: bool, position: u32) -> Self {
        Self {
            id,
            text: text.into(),
            completed,
            position,
        }
    }
}

impl Card {
    pub fn new(
        id: EntityId,
        text: impl Into<String>,
        completed: bool,
        position: u32,
        container: Container,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            completed,
            position,
            container,
            subtasks: Vec::new(),
        }
    }
}

impl Group {
    pub fn new(id: EntityId, title: impl Into<String>, position: u32) -> Self {
        Self {
            id,
            title: title.into(),
            position,
            cards: Vec::new(),
        }
    }
}

impl Column {
    pub fn new(id: EntityId, title: impl Into<String>, position: u32) -> Self {
        Self {
            id,
            title: title.into(),
            position,
            level: 1,
            groups: Vec::new(),
            cards: Vec::new(),
        }
    }

    /// Cards of this column in serialization order: ungrouped first, then by group.
    pub fn all_cards(&self) -> impl Iterator<Item = &Card> {
        self.cards
            .iter()
            .chain(self.groups.iter().flat_map(|group| group.cards.iter()))
    }
}

impl Board {
    /// Creates an empty, unsaved board.
    pub fn new(title: impl Into<String>, identity: IdentityStrategy) -> Self {
        Self {
            key: None,
            title: title.into(),
            raw_text: None,
            identity,
            columns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, id: EntityId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == id)
    }

    pub fn group(&self, id: EntityId) -> Option<&Group> {
        self.columns
            .iter()
            .flat_map(|column| column.groups.iter())
            .find(|group| group.id == id)
    }

    pub fn card(&self, id: EntityId) -> Option<&Card> {
        self.cards().find(|card| card.id == id)
    }

    pub fn subtask(&self, id: EntityId) -> Option<&Subtask> {
        self.cards()
            .flat_map(|card| card.subtasks.iter())
            .find(|subtask| subtask.id == id)
    }

    /// All cards in document order.
    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.columns.iter().flat_map(|column| column.all_cards())
    }

    pub fn card_count(&self) -> usize {
        self.cards().count()
    }

    pub fn completed_card_count(&self) -> usize {
        self.cards().filter(|card| card.completed).count()
    }

    /// Checks every structural invariant.
    pub fn validate(&self) -> Result<(), BoardInvariantError> {
        let mut seen: HashMap<EntityKind, HashSet<EntityId>> = HashMap::new();
        let mut claim = |kind: EntityKind, id: EntityId| {
            if seen.entry(kind).or_default().insert(id) {
                Ok(())
            } else {
                Err(BoardInvariantError::DuplicateIdentifier { kind, id })
            }
        };

        for (index, column) in self.columns.iter().enumerate() {
            claim(EntityKind::Column, column.id)?;
            check_order(EntityKind::Column, column.id, index, column.position)?;
            check_single_line(EntityKind::Column, column.id, &column.title)?;
            if column.level == 0 {
                return Err(BoardInvariantError::InvalidColumnLevel {
                    id: column.id,
                    level: column.level,
                });
            }

            let column_container = Container::Column(column.id);
            for (card_index, card) in column.cards.iter().enumerate() {
                validate_card(card, card_index, column_container, &mut claim)?;
            }

            for (group_index, group) in column.groups.iter().enumerate() {
                claim(EntityKind::Group, group.id)?;
                check_order(EntityKind::Group, group.id, group_index, group.position)?;
                check_single_line(EntityKind::Group, group.id, &group.title)?;

                let group_container = Container::Group(group.id);
                for (card_index, card) in group.cards.iter().enumerate() {
                    validate_card(card, card_index, group_container, &mut claim)?;
                }
            }
        }

        Ok(())
    }

    /// Rewrites every identifier listed in `keys`, including container
    /// references, and records the board key.
    ///
    /// # Errors
    /// - `UnmappedTemporaryId` when any temporary identifier has no entry.
    ///   The board is left untouched in that case.
    pub fn apply_storage_keys(&mut self, keys: &StorageKeys) -> Result<(), BoardInvariantError> {
        for column in &self.columns {
            ensure_mapped(keys, EntityKind::Column, column.id)?;
            for group in &column.groups {
                ensure_mapped(keys, EntityKind::Group, group.id)?;
            }
        }
        for card in self.cards() {
            ensure_mapped(keys, EntityKind::Card, card.id)?;
            for subtask in &card.subtasks {
                ensure_mapped(keys, EntityKind::Subtask, subtask.id)?;
            }
        }

        let remap =
            |kind: EntityKind, id: EntityId| keys.resolve(kind, id).unwrap_or(id);

        for column in &mut self.columns {
            column.id = remap(EntityKind::Column, column.id);
            let column_container = Container::Column(column.id);
            for card in &mut column.cards {
                remap_card(card, column_container, &remap);
            }
            for group in &mut column.groups {
                group.id = remap(EntityKind::Group, group.id);
                let group_container = Container::Group(group.id);
                for card in &mut group.cards {
                    remap_card(card, group_container, &remap);
                }
            }
        }
        self.key = Some(keys.board_key);
        Ok(())
    }
}

fn validate_card(
    card: &Card,
    index: usize,
    owner: Container,
    claim: &mut impl FnMut(EntityKind, EntityId) -> Result<(), BoardInvariantError>,
) -> Result<(), BoardInvariantError> {
    claim(EntityKind::Card, card.id)?;
    check_order(EntityKind::Card, card.id, index, card.position)?;
    check_single_line(EntityKind::Card, card.id, &card.text)?;
    if card.container != owner {
        return Err(BoardInvariantError::ContainerMismatch {
            card: card.id,
            expected: owner,
            actual: card.container,
        });
    }
    for (subtask_index, subtask) in card.subtasks.iter().enumerate() {
        claim(EntityKind::Subtask, subtask.id)?;
        check_order(
            EntityKind::Subtask,
            subtask.id,
            subtask_index,
            subtask.position,
        )?;
        check_single_line(EntityKind::Subtask, subtask.id, &subtask.text)?;
    }
    Ok(())
}

fn check_order(
    kind: EntityKind,
    id: EntityId,
    index: usize,
    position: u32,
) -> Result<(), BoardInvariantError> {
    let expected = index as u32;
    if position != expected {
        return Err(BoardInvariantError::NonDenseOrder {
            kind,
            id,
            expected,
            actual: position,
        });
    }
    Ok(())
}

fn check_single_line(kind: EntityKind, id: EntityId, text: &str) -> Result<(), BoardInvariantError> {
    if text.contains(['\n', '\r']) {
        return Err(BoardInvariantError::MultiLineText { kind, id });
    }
    Ok(())
}

fn ensure_mapped(
    keys: &StorageKeys,
    kind: EntityKind,
    id: EntityId,
) -> Result<(), BoardInvariantError> {
    if id.is_temporary() && keys.resolve(kind, id).is_none() {
        return Err(BoardInvariantError::UnmappedTemporaryId { kind, id });
    }
    Ok(())
}

fn remap_card(card: &mut Card, container: Container, remap: &impl Fn(EntityKind, EntityId) -> EntityId) {
    card.id = remap(EntityKind::Card, card.id);
    card.container = container;
    for subtask in &mut card.subtasks {
        subtask.id = remap(EntityKind::Subtask, subtask.id);
    }
}

/// Collapses line breaks and surrounding whitespace into a single-line value.
pub fn normalize_line(value: &str) -> String {
    value
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_line, Board, BoardInvariantError, Card, Column, Container, EntityKind, Group,
        StorageKeys, Subtask,
    };
    use crate::model::ids::{EntityId, IdentityStrategy};

    fn sample_board() -> Board {
        let mut board = Board::new("Sample", IdentityStrategy::Fresh);
        let mut column = Column::new(EntityId::temporary(), "Todo", 0);
        let mut card = Card::new(
            EntityId::temporary(),
            "write docs",
            false,
            0,
            Container::Column(column.id),
        );
        card.subtasks
            .push(Subtask::new(EntityId::temporary(), "outline", true, 0));
        column.cards.push(card);

        let mut group = Group::new(EntityId::temporary(), "Later", 0);
        group.cards.push(Card::new(
            EntityId::temporary(),
            "ship",
            false,
            0,
            Container::Group(group.id),
        ));
        column.groups.push(group);
        board.columns.push(column);
        board
    }

    #[test]
    fn validate_accepts_well_formed_board() {
        sample_board().validate().unwrap();
    }

    #[test]
    fn validate_rejects_gap_in_order() {
        let mut board = sample_board();
        board.columns[0].cards[0].position = 3;
        let err = board.validate().unwrap_err();
        assert!(matches!(
            err,
            BoardInvariantError::NonDenseOrder {
                kind: EntityKind::Card,
                expected: 0,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_wrong_container() {
        let mut board = sample_board();
        let group_id = board.columns[0].groups[0].id;
        board.columns[0].cards[0].container = Container::Group(group_id);
        let err = board.validate().unwrap_err();
        assert!(matches!(err, BoardInvariantError::ContainerMismatch { .. }));
    }

    #[test]
    fn validate_rejects_duplicate_card_ids_across_containers() {
        let mut board = sample_board();
        let duplicate = board.columns[0].cards[0].id;
        board.columns[0].groups[0].cards[0].id = duplicate;
        let err = board.validate().unwrap_err();
        assert_eq!(
            err,
            BoardInvariantError::DuplicateIdentifier {
                kind: EntityKind::Card,
                id: duplicate,
            }
        );
    }

    #[test]
    fn validate_rejects_multiline_text() {
        let mut board = sample_board();
        board.columns[0].cards[0].subtasks[0].text = "a\nb".to_string();
        let err = board.validate().unwrap_err();
        assert!(matches!(
            err,
            BoardInvariantError::MultiLineText {
                kind: EntityKind::Subtask,
                ..
            }
        ));
    }

    #[test]
    fn apply_storage_keys_is_all_or_nothing() {
        let mut board = sample_board();
        let before = board.clone();
        let mut keys = StorageKeys::new(7);
        keys.columns.insert(board.columns[0].id, 1);

        let err = board.apply_storage_keys(&keys).unwrap_err();
        assert!(matches!(err, BoardInvariantError::UnmappedTemporaryId { .. }));
        assert_eq!(board, before);
    }

    #[test]
    fn apply_storage_keys_rewrites_ids_and_container_references() {
        let mut board = sample_board();
        let column = &board.columns[0];
        let group = &column.groups[0];
        let mut keys = StorageKeys::new(7);
        keys.columns.insert(column.id, 10);
        keys.groups.insert(group.id, 20);
        keys.cards.insert(column.cards[0].id, 30);
        keys.cards.insert(group.cards[0].id, 31);
        keys.subtasks.insert(column.cards[0].subtasks[0].id, 40);

        board.apply_storage_keys(&keys).unwrap();

        assert_eq!(board.key, Some(7));
        let column = &board.columns[0];
        assert_eq!(column.id, EntityId::Persisted(10));
        assert_eq!(column.cards[0].id, EntityId::Persisted(30));
        assert_eq!(
            column.cards[0].container,
            Container::Column(EntityId::Persisted(10))
        );
        assert_eq!(column.cards[0].subtasks[0].id, EntityId::Persisted(40));
        assert_eq!(
            column.groups[0].cards[0].container,
            Container::Group(EntityId::Persisted(20))
        );
        board.validate().unwrap();
    }

    #[test]
    fn normalize_line_collapses_breaks() {
        assert_eq!(normalize_line("  one\n two \r\n"), "one two");
        assert_eq!(normalize_line("   "), "");
    }
}
