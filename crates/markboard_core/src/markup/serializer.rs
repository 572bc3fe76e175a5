//! Board → outline tree rendering.
//!
//! # Invariants
//! - Output depends only on the board; no I/O, never fails.
//! - Entities are emitted in sequence order (positions are dense, so this
//!   equals ascending order index).

use crate::markup::identity::render_checkbox;
use crate::markup::outline::{self, Block, Heading, List, ListItem};
use crate::model::board::{Board, Card};
use crate::model::ids::IdentityStrategy;
use log::debug;

/// Builds the generic document tree for `board`.
pub fn to_blocks(board: &Board) -> Vec<Block> {
    let mut blocks = Vec::new();
    for column in &board.columns {
        blocks.push(Block::Heading(Heading::new(1, column.title.clone())));
        if !column.cards.is_empty() {
            blocks.push(card_list(board.identity, &column.cards));
        }
        for group in &column.groups {
            blocks.push(Block::Heading(Heading::new(2, group.title.clone())));
            if !group.cards.is_empty() {
                blocks.push(card_list(board.identity, &group.cards));
            }
        }
    }
    blocks
}

/// Renders `board` to outline markup.
pub fn serialize(board: &Board) -> String {
    let blocks = to_blocks(board);
    let text = outline::render(&blocks);
    debug!(
        "event=markup_serialize module=markup status=ok strategy={} columns={} cards={} bytes={}",
        board.identity,
        board.columns.len(),
        board.card_count(),
        text.len()
    );
    text
}

fn card_list(strategy: IdentityStrategy, cards: &[Card]) -> Block {
    let items = cards
        .iter()
        .map(|card| {
            let subtasks = card
                .subtasks
                .iter()
                .map(|subtask| {
                    ListItem::new(render_checkbox(
                        strategy,
                        subtask.id,
                        subtask.completed,
                        &subtask.text,
                    ))
                })
                .collect();
            ListItem::with_children(
                render_checkbox(strategy, card.id, card.completed, &card.text),
                subtasks,
            )
        })
        .collect();
    Block::List(List { items })
}
