//! Direct board edits performed by the board view.
//!
//! # Responsibility
//! - Create, rename, toggle, move and delete entities on an in-memory board.
//! - Keep order indices dense and card container references exact after
//!   every structural change.
//!
//! # Invariants
//! - A failed edit leaves the board unchanged.
//! - Every successful edit clears the raw-text cache.
//! - Deletion cascades through ownership.

use crate::model::board::{
    normalize_line, Board, BoardInvariantError, Card, Column, Container, EntityKind, Group,
    Subtask,
};
use crate::model::ids::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from board edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEditError {
    ColumnNotFound(EntityId),
    GroupNotFound(EntityId),
    CardNotFound(EntityId),
    SubtaskNotFound(EntityId),
    /// A freshly minted identifier collided with an existing one.
    Invariant(BoardInvariantError),
}

impl Display for BoardEditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnNotFound(id) => write!(f, "column not found: {id}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::CardNotFound(id) => write!(f, "card not found: {id}"),
            Self::SubtaskNotFound(id) => write!(f, "subtask not found: {id}"),
            Self::Invariant(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardEditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invariant(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BoardInvariantError> for BoardEditError {
    fn from(value: BoardInvariantError) -> Self {
        Self::Invariant(value)
    }
}

pub type EditResult<T> = Result<T, BoardEditError>;

impl Board {
    /// Appends a new column and returns its id.
    pub fn add_column(&mut self, title: &str) -> EditResult<EntityId> {
        let id = self.mint(EntityKind::Column)?;
        let position = self.columns.len() as u32;
        self.columns
            .push(Column::new(id, normalize_line(title), position));
        self.touch();
        Ok(id)
    }

    /// Appends a new group to `column_id` and returns its id.
    pub fn add_group(&mut self, column_id: EntityId, title: &str) -> EditResult<EntityId> {
        let id = self.mint(EntityKind::Group)?;
        let column = self.column_mut(column_id)?;
        let position = column.groups.len() as u32;
        column
            .groups
            .push(Group::new(id, normalize_line(title), position));
        self.touch();
        Ok(id)
    }

    /// Appends a new incomplete card to `container` and returns its id.
    pub fn add_card(&mut self, container: Container, text: &str) -> EditResult<EntityId> {
        let id = self.mint(EntityKind::Card)?;
        let cards = self.cards_of_mut(container)?;
        let position = cards.len() as u32;
        cards.push(Card::new(id, normalize_line(text), false, position, container));
        self.touch();
        Ok(id)
    }

    /// Appends a new incomplete subtask to `card_id` and returns its id.
    pub fn add_subtask(&mut self, card_id: EntityId, text: &str) -> EditResult<EntityId> {
        let id = self.mint(EntityKind::Subtask)?;
        let card = self.card_mut(card_id)?;
        let position = card.subtasks.len() as u32;
        card.subtasks
            .push(Subtask::new(id, normalize_line(text), false, position));
        self.touch();
        Ok(id)
    }

    pub fn rename_column(&mut self, column_id: EntityId, title: &str) -> EditResult<()> {
        self.column_mut(column_id)?.title = normalize_line(title);
        self.touch();
        Ok(())
    }

    pub fn rename_group(&mut self, group_id: EntityId, title: &str) -> EditResult<()> {
        self.group_mut(group_id)?.title = normalize_line(title);
        self.touch();
        Ok(())
    }

    pub fn set_card_text(&mut self, card_id: EntityId, text: &str) -> EditResult<()> {
        self.card_mut(card_id)?.text = normalize_line(text);
        self.touch();
        Ok(())
    }

    pub fn set_subtask_text(&mut self, subtask_id: EntityId, text: &str) -> EditResult<()> {
        self.subtask_mut(subtask_id)?.text = normalize_line(text);
        self.touch();
        Ok(())
    }

    pub fn set_card_completed(&mut self, card_id: EntityId, completed: bool) -> EditResult<()> {
        self.card_mut(card_id)?.completed = completed;
        self.touch();
        Ok(())
    }

    /// Flips completion and returns the new state.
    pub fn toggle_card(&mut self, card_id: EntityId) -> EditResult<bool> {
        let card = self.card_mut(card_id)?;
        card.completed = !card.completed;
        let completed = card.completed;
        self.touch();
        Ok(completed)
    }

    pub fn set_subtask_completed(
        &mut self,
        subtask_id: EntityId,
        completed: bool,
    ) -> EditResult<()> {
        self.subtask_mut(subtask_id)?.completed = completed;
        self.touch();
        Ok(())
    }

    /// Flips completion and returns the new state.
    pub fn toggle_subtask(&mut self, subtask_id: EntityId) -> EditResult<bool> {
        let subtask = self.subtask_mut(subtask_id)?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;
        self.touch();
        Ok(completed)
    }

    /// Moves a column to `index` (clamped) among its siblings.
    pub fn move_column(&mut self, column_id: EntityId, index: usize) -> EditResult<()> {
        let from = self
            .columns
            .iter()
            .position(|column| column.id == column_id)
            .ok_or(BoardEditError::ColumnNotFound(column_id))?;
        let column = self.columns.remove(from);
        let target = index.min(self.columns.len());
        self.columns.insert(target, column);
        renumber(&mut self.columns, |column, position| column.position = position);
        self.touch();
        Ok(())
    }

    /// Moves a group, with its cards, into `column_id` at `index` (clamped).
    pub fn move_group(
        &mut self,
        group_id: EntityId,
        column_id: EntityId,
        index: usize,
    ) -> EditResult<()> {
        self.column(column_id)
            .ok_or(BoardEditError::ColumnNotFound(column_id))?;
        let (from_column, from_index) = self
            .locate_group(group_id)
            .ok_or(BoardEditError::GroupNotFound(group_id))?;

        let group = self.columns[from_column].groups.remove(from_index);
        renumber(&mut self.columns[from_column].groups, |group, position| {
            group.position = position
        });

        let target = self.column_mut(column_id)?;
        let at = index.min(target.groups.len());
        target.groups.insert(at, group);
        renumber(&mut target.groups, |group, position| group.position = position);
        self.touch();
        Ok(())
    }

    /// Moves a card into `container` at `index` (clamped), re-parenting it
    /// when the container differs.
    pub fn move_card(
        &mut self,
        card_id: EntityId,
        container: Container,
        index: usize,
    ) -> EditResult<()> {
        self.cards_of(container)?;
        let source = self
            .card(card_id)
            .map(|card| card.container)
            .ok_or(BoardEditError::CardNotFound(card_id))?;

        let source_cards = self.cards_of_mut(source)?;
        let from = source_cards
            .iter()
            .position(|card| card.id == card_id)
            .ok_or(BoardEditError::CardNotFound(card_id))?;
        let mut card = source_cards.remove(from);
        renumber(source_cards, |card, position| card.position = position);

        card.container = container;
        let target_cards = self.cards_of_mut(container)?;
        let at = index.min(target_cards.len());
        target_cards.insert(at, card);
        renumber(target_cards, |card, position| card.position = position);
        self.touch();
        Ok(())
    }

    /// Moves a subtask under `card_id` at `index` (clamped).
    pub fn move_subtask(
        &mut self,
        subtask_id: EntityId,
        card_id: EntityId,
        index: usize,
    ) -> EditResult<()> {
        self.card(card_id)
            .ok_or(BoardEditError::CardNotFound(card_id))?;
        let owner = self
            .cards()
            .find(|card| card.subtasks.iter().any(|subtask| subtask.id == subtask_id))
            .map(|card| card.id)
            .ok_or(BoardEditError::SubtaskNotFound(subtask_id))?;

        let source = self.card_mut(owner)?;
        let from = source
            .subtasks
            .iter()
            .position(|subtask| subtask.id == subtask_id)
            .ok_or(BoardEditError::SubtaskNotFound(subtask_id))?;
        let subtask = source.subtasks.remove(from);
        renumber(&mut source.subtasks, |subtask, position| {
            subtask.position = position
        });

        let target = self.card_mut(card_id)?;
        let at = index.min(target.subtasks.len());
        target.subtasks.insert(at, subtask);
        renumber(&mut target.subtasks, |subtask, position| {
            subtask.position = position
        });
        self.touch();
        Ok(())
    }

    /// Deletes a column with its groups, cards and subtasks.
    pub fn remove_column(&mut self, column_id: EntityId) -> EditResult<Column> {
        let index = self
            .columns
            .iter()
            .position(|column| column.id == column_id)
            .ok_or(BoardEditError::ColumnNotFound(column_id))?;
        let removed = self.columns.remove(index);
        renumber(&mut self.columns, |column, position| column.position = position);
        self.touch();
        Ok(removed)
    }

    /// Deletes a group with its cards and subtasks.
    pub fn remove_group(&mut self, group_id: EntityId) -> EditResult<Group> {
        let (column_index, group_index) = self
            .locate_group(group_id)
            .ok_or(BoardEditError::GroupNotFound(group_id))?;
        let groups = &mut self.columns[column_index].groups;
        let removed = groups.remove(group_index);
        renumber(groups, |group, position| group.position = position);
        self.touch();
        Ok(removed)
    }

    /// Deletes a card with its subtasks.
    pub fn remove_card(&mut self, card_id: EntityId) -> EditResult<Card> {
        let container = self
            .card(card_id)
            .map(|card| card.container)
            .ok_or(BoardEditError::CardNotFound(card_id))?;
        let cards = self.cards_of_mut(container)?;
        let index = cards
            .iter()
            .position(|card| card.id == card_id)
            .ok_or(BoardEditError::CardNotFound(card_id))?;
        let removed = cards.remove(index);
        renumber(cards, |card, position| card.position = position);
        self.touch();
        Ok(removed)
    }

    pub fn remove_subtask(&mut self, subtask_id: EntityId) -> EditResult<Subtask> {
        let owner = self
            .cards()
            .find(|card| card.subtasks.iter().any(|subtask| subtask.id == subtask_id))
            .map(|card| card.id)
            .ok_or(BoardEditError::SubtaskNotFound(subtask_id))?;
        let card = self.card_mut(owner)?;
        let index = card
            .subtasks
            .iter()
            .position(|subtask| subtask.id == subtask_id)
            .ok_or(BoardEditError::SubtaskNotFound(subtask_id))?;
        let removed = card.subtasks.remove(index);
        renumber(&mut card.subtasks, |subtask, position| {
            subtask.position = position
        });
        self.touch();
        Ok(removed)
    }

    fn touch(&mut self) {
        self.raw_text = None;
    }

    fn mint(&self, kind: EntityKind) -> Result<EntityId, BoardInvariantError> {
        let id = EntityId::temporary();
        let taken = match kind {
            EntityKind::Column => self.column(id).is_some(),
            EntityKind::Group => self.group(id).is_some(),
            EntityKind::Card => self.card(id).is_some(),
            EntityKind::Subtask => self.subtask(id).is_some(),
        };
        if taken {
            return Err(BoardInvariantError::DuplicateIdentifier { kind, id });
        }
        Ok(id)
    }

    fn locate_group(&self, group_id: EntityId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(column_index, column)| {
            column
                .groups
                .iter()
                .position(|group| group.id == group_id)
                .map(|group_index| (column_index, group_index))
        })
    }

    fn column_mut(&mut self, column_id: EntityId) -> EditResult<&mut Column> {
        self.columns
            .iter_mut()
            .find(|column| column.id == column_id)
            .ok_or(BoardEditError::ColumnNotFound(column_id))
    }

    fn group_mut(&mut self, group_id: EntityId) -> EditResult<&mut Group> {
        self.columns
            .iter_mut()
            .flat_map(|column| column.groups.iter_mut())
            .find(|group| group.id == group_id)
            .ok_or(BoardEditError::GroupNotFound(group_id))
    }

    fn card_mut(&mut self, card_id: EntityId) -> EditResult<&mut Card> {
        self.columns
            .iter_mut()
            .flat_map(|column| {
                column
                    .cards
                    .iter_mut()
                    .chain(column.groups.iter_mut().flat_map(|group| group.cards.iter_mut()))
            })
            .find(|card| card.id == card_id)
            .ok_or(BoardEditError::CardNotFound(card_id))
    }

    fn subtask_mut(&mut self, subtask_id: EntityId) -> EditResult<&mut Subtask> {
        self.columns
            .iter_mut()
            .flat_map(|column| {
                column
                    .cards
                    .iter_mut()
                    .chain(column.groups.iter_mut().flat_map(|group| group.cards.iter_mut()))
            })
            .flat_map(|card| card.subtasks.iter_mut())
            .find(|subtask| subtask.id == subtask_id)
            .ok_or(BoardEditError::SubtaskNotFound(subtask_id))
    }

    fn cards_of(&self, container: Container) -> EditResult<&Vec<Card>> {
        match container {
            Container::Column(id) => self
                .column(id)
                .map(|column| &column.cards)
                .ok_or(BoardEditError::ColumnNotFound(id)),
            Container::Group(id) => self
                .group(id)
                .map(|group| &group.cards)
                .ok_or(BoardEditError::GroupNotFound(id)),
        }
    }

    fn cards_of_mut(&mut self, container: Container) -> EditResult<&mut Vec<Card>> {
        match container {
            Container::Column(id) => Ok(&mut self.column_mut(id)?.cards),
            Container::Group(id) => Ok(&mut self.group_mut(id)?.cards),
        }
    }
}

fn renumber<T>(items: &mut [T], mut set: impl FnMut(&mut T, u32)) {
    for (index, item) in items.iter_mut().enumerate() {
        set(item, index as u32);
    }
}
