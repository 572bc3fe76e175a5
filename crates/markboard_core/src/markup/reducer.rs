//! Hierarchy reducer: generic outline blocks → typed board.
//!
//! # Responsibility
//! - Fold top-level blocks in document order into columns, groups, cards and
//!   subtasks.
//! - Drop malformed or unsupported constructs without raising.
//!
//! # Invariants
//! - Single left-to-right pass; document order alone determines every
//!   order index.
//! - Depth-2 headings only open a group inside an open column.
//! - Only one level of subtasks is modeled.

use crate::markup::identity::IdentityAssigner;
use crate::markup::outline::{Block, Heading, List, ListItem};
use crate::model::board::{
    Board, BoardInvariantError, Card, Column, Container, EntityKind, Group, Subtask,
};
use log::debug;

const COLUMN_DEPTH: u8 = 1;
const GROUP_DEPTH: u8 = 2;

/// Fold accumulator: the board under construction plus the open context.
#[derive(Debug)]
pub struct ReduceState {
    board: Board,
    assigner: IdentityAssigner,
    current_column: Option<usize>,
    current_group: Option<usize>,
    dropped: usize,
}

/// Checkbox marker split from item content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkbox<'a> {
    pub completed: bool,
    /// Content after the marker, trimmed.
    pub rest: &'a str,
}

impl ReduceState {
    /// Starts a fold for `board` (expected to have no columns).
    pub fn new(board: Board) -> Self {
        let assigner = IdentityAssigner::new(board.identity);
        Self {
            board,
            assigner,
            current_column: None,
            current_group: None,
            dropped: 0,
        }
    }

    /// Applies one top-level block.
    pub fn apply(mut self, block: &Block) -> Result<Self, BoardInvariantError> {
        match block {
            Block::Heading(heading) => self.heading(heading)?,
            Block::List(list) => self.list(list)?,
            Block::Paragraph(_) | Block::Code(_) => {}
        }
        Ok(self)
    }

    /// Ends the fold and returns the board.
    pub fn finish(self) -> Board {
        debug!(
            "event=markup_parse module=markup status=ok columns={} cards={} minted={} reused={} dropped={}",
            self.board.columns.len(),
            self.board.card_count(),
            self.assigner.minted(),
            self.assigner.reused(),
            self.dropped
        );
        self.board
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Number of constructs dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn heading(&mut self, heading: &Heading) -> Result<(), BoardInvariantError> {
        match heading.depth {
            COLUMN_DEPTH => {
                let id = self.assigner.mint(EntityKind::Column)?;
                let position = self.board.columns.len() as u32;
                let mut column = Column::new(id, heading.text.clone(), position);
                column.level = heading.depth;
                self.board.columns.push(column);
                self.current_column = Some(self.board.columns.len() - 1);
                self.current_group = None;
            }
            GROUP_DEPTH => {
                let Some(column_index) = self.current_column else {
                    self.drop_construct("group_without_column");
                    return Ok(());
                };
                let id = self.assigner.mint(EntityKind::Group)?;
                let column = &mut self.board.columns[column_index];
                let position = column.groups.len() as u32;
                column
                    .groups
                    .push(Group::new(id, heading.text.clone(), position));
                self.current_group = Some(column.groups.len() - 1);
            }
            _ => self.drop_construct("unsupported_heading_depth"),
        }
        Ok(())
    }

    fn list(&mut self, list: &List) -> Result<(), BoardInvariantError> {
        let Some(column_index) = self.current_column else {
            self.drop_construct("list_without_column");
            return Ok(());
        };

        for item in &list.items {
            let Some(checkbox) = split_checkbox(&item.content) else {
                self.drop_construct("non_checkbox_item");
                continue;
            };
            let card = self.card(item, checkbox, column_index)?;
            let column = &mut self.board.columns[column_index];
            let cards = match self.current_group {
                Some(group_index) => &mut column.groups[group_index].cards,
                None => &mut column.cards,
            };
            cards.push(card);
        }
        Ok(())
    }

    fn card(
        &mut self,
        item: &ListItem,
        checkbox: Checkbox<'_>,
        column_index: usize,
    ) -> Result<Card, BoardInvariantError> {
        let column = &self.board.columns[column_index];
        let (container, position) = match self.current_group {
            Some(group_index) => {
                let group = &column.groups[group_index];
                (Container::Group(group.id), group.cards.len())
            }
            None => (Container::Column(column.id), column.cards.len()),
        };

        let assigned = self.assigner.assign(EntityKind::Card, checkbox.rest)?;
        let mut card = Card::new(
            assigned.id,
            assigned.text,
            checkbox.completed,
            position as u32,
            container,
        );

        for child in &item.children {
            let Some(sub_checkbox) = split_checkbox(&child.content) else {
                self.drop_construct("non_checkbox_subtask");
                continue;
            };
            if !child.children.is_empty() {
                self.drop_construct("nested_below_subtask");
            }
            let assigned = self.assigner.assign(EntityKind::Subtask, sub_checkbox.rest)?;
            let position = card.subtasks.len() as u32;
            card.subtasks.push(Subtask::new(
                assigned.id,
                assigned.text,
                sub_checkbox.completed,
                position,
            ));
        }

        Ok(card)
    }

    fn drop_construct(&mut self, reason: &'static str) {
        self.dropped += 1;
        debug!("event=markup_parse module=markup status=ignored reason={reason}");
    }
}

/// Splits a leading `[ ]` / `[x]` marker from list item content.
///
/// The marker must be followed by whitespace or end the content; `[X]` is
/// not a checkbox.
pub fn split_checkbox(content: &str) -> Option<Checkbox<'_>> {
    let (completed, rest) = if let Some(rest) = content.strip_prefix("[ ]") {
        (false, rest)
    } else if let Some(rest) = content.strip_prefix("[x]") {
        (true, rest)
    } else {
        return None;
    };

    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    Some(Checkbox {
        completed,
        rest: rest.trim(),
    })
}

/// Folds `blocks` into `board`.
pub fn reduce(board: Board, blocks: &[Block]) -> Result<Board, BoardInvariantError> {
    blocks
        .iter()
        .try_fold(ReduceState::new(board), |state, block| state.apply(block))
        .map(ReduceState::finish)
}

#[cfg(test)]
mod tests {
    use super::{split_checkbox, ReduceState};
    use crate::markup::outline::{Block, Heading, List, ListItem};
    use crate::model::board::{Board, Container};
    use crate::model::ids::IdentityStrategy;

    fn state() -> ReduceState {
        ReduceState::new(Board::new("t", IdentityStrategy::Fresh))
    }

    fn checkbox_list(items: &[&str]) -> Block {
        Block::List(List {
            items: items.iter().map(|content| ListItem::new(*content)).collect(),
        })
    }

    #[test]
    fn split_checkbox_accepts_only_lowercase_markers() {
        let open = split_checkbox("[ ] one").unwrap();
        assert!(!open.completed);
        assert_eq!(open.rest, "one");
        assert!(split_checkbox("[x]   two ").unwrap().completed);
        assert_eq!(split_checkbox("[x]").unwrap().rest, "");
        assert!(split_checkbox("[X] upper").is_none());
        assert!(split_checkbox("[x]glued").is_none());
        assert!(split_checkbox("plain").is_none());
    }

    #[test]
    fn column_heading_opens_context_node_by_node() {
        let state = state()
            .apply(&Block::Heading(Heading::new(1, "A")))
            .unwrap();
        assert_eq!(state.board().columns.len(), 1);
        assert_eq!(state.board().columns[0].level, 1);

        let state = state.apply(&checkbox_list(&["[ ] one"])).unwrap();
        let column = &state.board().columns[0];
        assert_eq!(column.cards[0].container, Container::Column(column.id));
    }

    #[test]
    fn group_heading_without_column_is_dropped() {
        let state = state()
            .apply(&Block::Heading(Heading::new(2, "G")))
            .unwrap()
            .apply(&checkbox_list(&["[ ] x"]))
            .unwrap();
        assert!(state.board().columns.is_empty());
        assert_eq!(state.dropped(), 2);
    }

    #[test]
    fn new_column_closes_open_group() {
        let state = state()
            .apply(&Block::Heading(Heading::new(1, "A")))
            .unwrap()
            .apply(&Block::Heading(Heading::new(2, "G")))
            .unwrap()
            .apply(&Block::Heading(Heading::new(1, "B")))
            .unwrap()
            .apply(&checkbox_list(&["[ ] loose"]))
            .unwrap();
        let board = state.board();
        assert_eq!(board.columns[1].cards.len(), 1);
        assert!(board.columns[1].groups.is_empty());
    }

    #[test]
    fn deeper_headings_do_not_change_context() {
        let state = state()
            .apply(&Block::Heading(Heading::new(1, "A")))
            .unwrap()
            .apply(&Block::Heading(Heading::new(2, "G")))
            .unwrap()
            .apply(&Block::Heading(Heading::new(3, "note")))
            .unwrap()
            .apply(&checkbox_list(&["[ ] in group"]))
            .unwrap();
        assert_eq!(state.board().columns[0].groups[0].cards.len(), 1);
        assert_eq!(state.dropped(), 1);
    }

    #[test]
    fn subtasks_keep_one_level_only() {
        let item = ListItem::with_children(
            "[ ] parent",
            vec![
                ListItem::with_children("[x] child", vec![ListItem::new("[ ] grandchild")]),
                ListItem::new("note"),
            ],
        );
        let state = state()
            .apply(&Block::Heading(Heading::new(1, "A")))
            .unwrap()
            .apply(&Block::List(List { items: vec![item] }))
            .unwrap();
        let card = &state.board().columns[0].cards[0];
        assert_eq!(card.subtasks.len(), 1);
        assert_eq!(card.subtasks[0].text, "child");
        assert!(card.subtasks[0].completed);
    }
}
