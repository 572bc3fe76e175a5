//! Generic outline-markup document tree.
//!
//! # Responsibility
//! - Tokenize Markdown-style text into headings, lists, fenced code and
//!   paragraphs in one line-oriented pass.
//! - Render the same tree back to text with fixed whitespace conventions.
//!
//! # Invariants
//! - Nothing inside a fenced code block is a heading or list item.
//! - List nesting follows indentation: an item nests under the nearest open
//!   item with a smaller indentation.
//! - `render` output ends with exactly one newline (empty tree renders as an
//!   empty string).
//!
//! This module knows nothing about boards or checkboxes.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("valid heading regex")
});
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([ \t]*)(?:[-*+]|\d{1,9}[.)])(?:[ \t]+(.*?))?[ \t]*$")
        .expect("valid list item regex")
});
static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})(.*)$").expect("valid fence regex"));

const TAB_WIDTH: usize = 4;
const RENDER_INDENT: &str = "  ";

/// One top-level block of an outline document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Heading),
    List(List),
    Paragraph(String),
    Code(CodeBlock),
}

/// ATX heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Number of leading `#` (1..=6).
    pub depth: u8,
    pub text: String,
}

/// Contiguous list; blank lines do not split it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List {
    pub items: Vec<ListItem>,
}

/// List item with its nested items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    /// Item text after the bullet, trimmed.
    pub content: String,
    pub children: Vec<ListItem>,
}

/// Fenced code block, kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub fence: String,
    pub info: String,
    pub lines: Vec<String>,
}

impl Heading {
    pub fn new(depth: u8, text: impl Into<String>) -> Self {
        Self {
            depth,
            text: text.into(),
        }
    }
}

impl ListItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(content: impl Into<String>, children: Vec<ListItem>) -> Self {
        Self {
            content: content.into(),
            children,
        }
    }
}

/// Splits `text` into top-level blocks.
pub fn tokenize(text: &str) -> Vec<Block> {
    let mut tokenizer = Tokenizer::default();
    for line in text.lines() {
        tokenizer.feed(line);
    }
    tokenizer.finish()
}

/// Renders blocks back to text.
pub fn render(blocks: &[Block]) -> String {
    if blocks.is_empty() {
        return String::new();
    }

    let mut out = blocks
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

#[derive(Default)]
struct Tokenizer {
    blocks: Vec<Block>,
    paragraph: Vec<String>,
    list: Vec<(usize, String)>,
    fence: Option<CodeBlock>,
}

impl Tokenizer {
    fn feed(&mut self, line: &str) {
        if let Some(code) = self.fence.as_mut() {
            if closes_fence(line, &code.fence) {
                if let Some(code) = self.fence.take() {
                    self.blocks.push(Block::Code(code));
                }
            } else {
                code.lines.push(line.to_string());
            }
            return;
        }

        if let Some(caps) = LIST_ITEM_RE.captures(line) {
            self.flush_paragraph();
            let indent = indent_width(&caps[1]);
            let content = caps.get(2).map_or("", |m| m.as_str());
            self.list.push((indent, content.to_string()));
            return;
        }

        // Indented lines inside an open list belong to the current item,
        // headings and fences included.
        if !self.list.is_empty() && indent_width(line) > 0 {
            return;
        }

        if let Some(caps) = FENCE_RE.captures(line) {
            self.flush();
            self.fence = Some(CodeBlock {
                fence: caps[1].to_string(),
                info: caps[2].trim().to_string(),
                lines: Vec::new(),
            });
            return;
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            self.flush();
            let text = caps.get(2).map_or("", |m| m.as_str());
            self.blocks
                .push(Block::Heading(Heading::new(caps[1].len() as u8, text)));
            return;
        }

        if line.trim().is_empty() {
            self.flush_paragraph();
            return;
        }

        self.flush_list();
        self.paragraph.push(line.trim().to_string());
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        if let Some(code) = self.fence.take() {
            self.blocks.push(Block::Code(code));
        }
        self.blocks
    }

    fn flush(&mut self) {
        self.flush_paragraph();
        self.flush_list();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.paragraph).join("\n");
        self.blocks.push(Block::Paragraph(text));
    }

    fn flush_list(&mut self) {
        if self.list.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.list);
        self.blocks.push(Block::List(List {
            items: nest_items(entries),
        }));
    }
}

/// Builds the item tree from `(indent, content)` entries in document order.
fn nest_items(entries: Vec<(usize, String)>) -> Vec<ListItem> {
    let mut nodes: Vec<Option<ListItem>> = Vec::with_capacity(entries.len());
    let mut parents: Vec<Option<usize>> = Vec::with_capacity(entries.len());
    let mut open: Vec<(usize, usize)> = Vec::new();

    for (indent, content) in entries {
        while open.last().is_some_and(|(open_indent, _)| indent <= *open_indent) {
            open.pop();
        }
        parents.push(open.last().map(|(_, index)| *index));
        nodes.push(Some(ListItem::new(content)));
        open.push((indent, nodes.len() - 1));
    }

    // Children always follow their parent, so a reverse sweep sees every
    // child before its parent.
    let mut roots = Vec::new();
    for index in (0..nodes.len()).rev() {
        let Some(mut item) = nodes[index].take() else {
            continue;
        };
        item.children.reverse();
        match parents[index].and_then(|parent| nodes[parent].as_mut()) {
            Some(parent) => parent.children.push(item),
            None => roots.push(item),
        }
    }
    roots.reverse();
    roots
}

fn closes_fence(line: &str, fence: &str) -> bool {
    let trimmed = line.trim();
    let Some(marker) = fence.chars().next() else {
        return false;
    };
    trimmed.len() >= fence.len() && trimmed.chars().all(|c| c == marker)
}

fn indent_width(prefix: &str) -> usize {
    let mut width = 0;
    for c in prefix.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += TAB_WIDTH - (width % TAB_WIDTH),
            _ => break,
        }
    }
    width
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading(heading) => {
            let hashes = "#".repeat(usize::from(heading.depth.clamp(1, 6)));
            if heading.text.is_empty() {
                hashes
            } else {
                format!("{hashes} {}", heading.text)
            }
        }
        Block::List(list) => {
            let mut lines = Vec::new();
            for item in &list.items {
                render_item(item, 0, &mut lines);
            }
            lines.join("\n")
        }
        Block::Paragraph(text) => text.clone(),
        Block::Code(code) => {
            let mut lines = Vec::with_capacity(code.lines.len() + 2);
            if code.info.is_empty() {
                lines.push(code.fence.clone());
            } else {
                lines.push(format!("{} {}", code.fence, code.info));
            }
            lines.extend(code.lines.iter().cloned());
            lines.push(code.fence.clone());
            lines.join("\n")
        }
    }
}

fn render_item(item: &ListItem, level: usize, lines: &mut Vec<String>) {
    let indent = RENDER_INDENT.repeat(level);
    if item.content.is_empty() {
        lines.push(format!("{indent}-"));
    } else {
        lines.push(format!("{indent}- {}", item.content));
    }
    for child in &item.children {
        render_item(child, level + 1, lines);
    }
}
