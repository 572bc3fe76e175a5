//! Outline markup ⇄ board translation engine.
//!
//! # Responsibility
//! - `parse`: text → generic outline tree → typed board.
//! - `serialize`: typed board → generic outline tree → text.
//!
//! # Invariants
//! - Malformed markup is never an error; unsupported constructs are dropped.
//! - `serialize(parse(serialize(b))) == serialize(b)` for any parsed board.
//! - Both functions are pure and synchronous.
//!
//! # See also
//! - `outline` for the dialect's line-level rules.
//! - `identity` for the two identity strategies.

pub mod identity;
pub mod outline;
pub mod reducer;
pub mod serializer;

use crate::model::board::{Board, BoardInvariantError};
use crate::model::ids::IdentityStrategy;
use serde::{Deserialize, Serialize};

pub use serializer::serialize;

/// Board-level attributes that do not live in the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub title: String,
    pub identity: IdentityStrategy,
}

impl ParseMetadata {
    /// Metadata with the default (`Fresh`) identity strategy.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            identity: IdentityStrategy::default(),
        }
    }

    pub fn with_identity(mut self, identity: IdentityStrategy) -> Self {
        self.identity = identity;
        self
    }
}

/// Parses outline markup into a new, unsaved board.
///
/// # Errors
/// - `DuplicateIdentifier` when one pass mints the same identifier twice.
pub fn parse(text: &str, metadata: &ParseMetadata) -> Result<Board, BoardInvariantError> {
    let blocks = outline::tokenize(text);
    let board = reducer::reduce(Board::new(metadata.title.clone(), metadata.identity), &blocks)?;
    board.validate()?;
    Ok(board)
}

/// Seed document for newly created boards.
pub fn default_template() -> &'static str {
    "# TODO\n\
     \n\
     - [ ] Task 1\n\
     - [ ] Task 2\n\
     \n\
     ## Task Group A\n\
     \n\
     - [ ] Task A.1\n\
     - [ ] Task A.2\n\
     \n\
     ## Task Group B\n\
     \n\
     - [ ] Task B.1\n\
     \x20 - [ ] Task B.1.1\n\
     \x20 - [ ] Task B.1.2\n\
     - [ ] Task B.2\n\
     \n\
     # In Progress\n\
     \n\
     - [ ] Task 3\n\
     \n\
     # Done\n\
     \n\
     - [x] Task 4\n"
}

#[cfg(test)]
mod tests {
    use super::{default_template, parse, serialize, ParseMetadata};
    use crate::model::board::{Board, Container};
    use crate::model::ids::{EntityId, IdentityStrategy};

    fn parse_fresh(text: &str) -> Board {
        parse(text, &ParseMetadata::new("test")).unwrap()
    }

    /// Structure, text and completion, without identifiers.
    fn shape(board: &Board) -> Vec<String> {
        let mut lines = Vec::new();
        for column in &board.columns {
            lines.push(format!("column {}", column.title));
            let groups = std::iter::once((None, &column.cards))
                .chain(column.groups.iter().map(|g| (Some(&g.title), &g.cards)));
            for (group, cards) in groups {
                if let Some(title) = group {
                    lines.push(format!(" group {title}"));
                }
                for card in cards {
                    lines.push(format!("  card {} {}", card.completed, card.text));
                    for subtask in &card.subtasks {
                        lines.push(format!("   subtask {} {}", subtask.completed, subtask.text));
                    }
                }
            }
        }
        lines
    }

    #[test]
    fn scenario_ungrouped_cards_keep_order_and_state() {
        let board = parse_fresh("# A\n- [ ] one\n- [x] two\n");
        assert_eq!(board.columns.len(), 1);
        let column = &board.columns[0];
        assert_eq!(column.title, "A");
        assert!(column.groups.is_empty());
        let cards: Vec<_> = column
            .cards
            .iter()
            .map(|c| (c.text.as_str(), c.completed, c.position))
            .collect();
        assert_eq!(cards, vec![("one", false, 0), ("two", true, 1)]);
        assert!(column.cards.iter().all(|c| c.subtasks.is_empty()));
    }

    #[test]
    fn heading_indented_under_card_does_not_open_column() {
        let board = parse_fresh("# A\n- [ ] a\n  # not col\n  ## nor group\n- [ ] b\n");
        assert_eq!(board.columns.len(), 1);
        assert!(board.columns[0].groups.is_empty());
        assert_eq!(board.columns[0].cards.len(), 2);
        assert_eq!(serialize(&board), "# A\n\n- [ ] a\n- [ ] b\n");
    }

    #[test]
    fn scenario_group_under_column() {
        let board = parse_fresh("# A\n## G\n- [ ] x\n");
        let column = &board.columns[0];
        assert!(column.cards.is_empty());
        assert_eq!(column.groups.len(), 1);
        let group = &column.groups[0];
        assert_eq!(group.title, "G");
        assert_eq!(group.cards[0].text, "x");
        assert_eq!(group.cards[0].container, Container::Group(group.id));
    }

    #[test]
    fn scenario_group_without_column_is_dropped() {
        let board = parse_fresh("## G\n- [ ] x\n");
        assert!(board.columns.is_empty());
        assert_eq!(serialize(&board), "");
    }

    #[test]
    fn scenario_nested_item_becomes_subtask() {
        let board = parse_fresh("# A\n- [ ] parent\n  - [ ] child\n");
        let card = &board.columns[0].cards[0];
        assert_eq!(card.text, "parent");
        assert_eq!(card.subtasks.len(), 1);
        assert_eq!(card.subtasks[0].text, "child");
    }

    #[test]
    fn scenario_serialize_single_column() {
        let mut board = Board::new("test", IdentityStrategy::Fresh);
        let column = board.add_column("A").unwrap();
        board.add_card(Container::Column(column), "one").unwrap();
        let two = board.add_card(Container::Column(column), "two").unwrap();
        board.set_card_completed(two, true).unwrap();
        assert_eq!(serialize(&board), "# A\n\n- [ ] one\n- [x] two\n");
    }

    #[test]
    fn uppercase_marker_is_not_a_checkbox() {
        let board = parse_fresh("# A\n- [X] shouted\n- [x] done\n- plain\n");
        let texts: Vec<_> = board.columns[0].cards.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["done"]);
    }

    #[test]
    fn unsupported_constructs_are_inert() {
        let text = "intro\n\n- [ ] before any column\n\n# A\n\nprose\n\n### deep\n\n- [ ] kept\n  - note\n  - [x] sub\n    - [ ] too deep\n\n```\n- [ ] fenced\n```\n";
        let board = parse_fresh(text);
        assert_eq!(
            shape(&board),
            vec!["column A", "  card false kept", "   subtask true sub"]
        );
    }

    #[test]
    fn group_attaches_to_nearest_preceding_column() {
        let board = parse_fresh("# A\n# B\n## G\n- [ ] x\n");
        assert!(board.columns[0].groups.is_empty());
        assert_eq!(board.columns[1].groups[0].title, "G");
    }

    #[test]
    fn fresh_round_trip_preserves_shape() {
        let board = parse_fresh(default_template());
        let again = parse_fresh(&serialize(&board));
        assert_eq!(shape(&again), shape(&board));
        assert_ne!(again.columns[0].id, board.columns[0].id);
    }

    #[test]
    fn double_round_trip_is_textually_stable() {
        let messy = "# A\n*   [ ]   spaced  \n1. [x] ordered\n\t- [ ] tabbed child\n## G\n+ [ ]\n";
        let once = serialize(&parse_fresh(messy));
        let twice = serialize(&parse_fresh(&once));
        assert_eq!(once, twice);
        assert_eq!(once, "# A\n\n- [ ] spaced\n- [x] ordered\n  - [ ] tabbed child\n\n## G\n\n- [ ]\n");
    }

    #[test]
    fn embedded_round_trip_preserves_identifiers() {
        let metadata = ParseMetadata::new("test").with_identity(IdentityStrategy::Embedded);
        let first = parse(default_template(), &metadata).unwrap();
        let text = serialize(&first);
        let second = parse(&text, &metadata).unwrap();

        let ids = |board: &Board| -> Vec<EntityId> {
            board
                .cards()
                .flat_map(|card| {
                    std::iter::once(card.id).chain(card.subtasks.iter().map(|s| s.id))
                })
                .collect()
        };
        assert_eq!(ids(&second), ids(&first));
        assert_eq!(shape(&second), shape(&first));
        assert_eq!(serialize(&second), text);
    }

    #[test]
    fn default_template_parses_into_three_columns() {
        let board = parse_fresh(default_template());
        let titles: Vec<_> = board.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["TODO", "In Progress", "Done"]);
        assert_eq!(board.columns[0].groups.len(), 2);
        assert_eq!(board.columns[0].groups[1].cards[0].subtasks.len(), 2);
        assert_eq!(serialize(&board), default_template());
    }
}
