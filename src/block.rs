//! Line-oriented block classification.
//!
//! Content is consumed through a [`LineCursor`] so multi-line constructs
//! (fenced code, tables) pull their lines explicitly instead of the caller
//! doing index arithmetic. Classification is total: every line ends up in
//! some block, with `Paragraph` as the catch-all.

use serde::Serialize;

/// A structurally classified unit of source content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    HorizontalRule,
    Blockquote {
        text: String,
    },
    ChecklistItem {
        indent: usize,
        checked: bool,
        text: String,
    },
    BulletItem {
        indent: usize,
        text: String,
    },
    OrderedItem {
        indent: usize,
        number: String,
        text: String,
    },
    CodeBlock {
        language: Option<String>,
        lines: Vec<String>,
    },
    TableBlock {
        rows: Vec<Vec<String>>,
    },
    ImageBlock {
        alt: String,
        url: String,
    },
    Paragraph {
        text: String,
    },
    Blank,
}

impl Block {
    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            Block::ChecklistItem { .. } | Block::BulletItem { .. } | Block::OrderedItem { .. }
        )
    }
}

/// Pull-based cursor over the lines of a document.
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().collect(),
            pos: 0,
        }
    }

    /// Line `k` positions ahead of the cursor; `peek(0)` is the current line.
    pub fn peek(&self, k: usize) -> Option<&'a str> {
        self.lines.get(self.pos + k).copied()
    }

    pub fn advance(&mut self) -> Option<&'a str> {
        let line = self.peek(0)?;
        self.pos += 1;
        Some(line)
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }
}

/// Classifies the full content into blocks, in source order.
pub fn classify(content: &str) -> Vec<Block> {
    let mut cursor = LineCursor::new(content);
    let mut blocks = Vec::new();

    while let Some(line) = cursor.peek(0) {
        let trimmed = line.trim();

        if let Some(info) = trimmed.strip_prefix("```") {
            cursor.advance();
            blocks.push(take_code_block(&mut cursor, info));
            continue;
        }

        if trimmed.starts_with('|') && cursor.peek(1).is_some_and(is_table_separator) {
            blocks.push(take_table(&mut cursor));
            continue;
        }

        cursor.advance();
        blocks.push(classify_line(line));
    }

    log::debug!("classified {} blocks", blocks.len());
    blocks
}

fn take_code_block(cursor: &mut LineCursor<'_>, info: &str) -> Block {
    let info = info.trim();
    let language = (!info.is_empty()).then(|| info.to_string());
    let mut lines = Vec::new();

    while let Some(line) = cursor.advance() {
        if line.trim().starts_with("```") {
            break;
        }
        lines.push(line.to_string());
    }

    Block::CodeBlock { language, lines }
}

fn take_table(cursor: &mut LineCursor<'_>) -> Block {
    let mut rows = Vec::new();
    while let Some(line) = cursor.peek(0) {
        if !line.contains('|') {
            break;
        }
        cursor.advance();
        rows.push(split_table_row(line));
    }
    Block::TableBlock { rows }
}

/// `^\|[\s:|-]+\|` on the trimmed line.
fn is_table_separator(line: &str) -> bool {
    let trimmed = line.trim();
    let Some(body) = trimmed.strip_prefix('|') else {
        return false;
    };
    let run_len = body
        .find(|c: char| !(c.is_whitespace() || matches!(c, ':' | '|' | '-')))
        .unwrap_or(body.len());
    let run = &body[..run_len];
    // The class must match at least one char before a closing pipe.
    run.char_indices().any(|(idx, c)| c == '|' && idx > 0)
}

/// Splits a table row on `|`, trimming cells and dropping the empty cells
/// produced by leading and trailing pipes.
pub fn split_table_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// True for a row whose every cell matches `^[-:]+$`.
pub fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells
            .iter()
            .all(|cell| !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':'))
}

fn classify_line(line: &str) -> Block {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Block::Blank;
    }

    if let Some(block) = heading(trimmed) {
        return block;
    }

    if matches!(trimmed, "---" | "***" | "___") {
        return Block::HorizontalRule;
    }

    if let Some((alt, url)) = image_line(trimmed) {
        return Block::ImageBlock {
            alt: alt.to_string(),
            url: url.to_string(),
        };
    }

    if let Some(rest) = trimmed.strip_prefix('>') {
        let text = rest.strip_prefix(' ').unwrap_or(rest);
        return Block::Blockquote {
            text: text.trim_end().to_string(),
        };
    }

    let indent = indent_level(line);

    if let Some(rest) = bullet_body(trimmed) {
        if let Some((checked, text)) = checkbox(rest) {
            return Block::ChecklistItem {
                indent,
                checked,
                text: text.to_string(),
            };
        }
        return Block::BulletItem {
            indent,
            text: rest.to_string(),
        };
    }

    if let Some((number, text)) = ordered_body(trimmed) {
        return Block::OrderedItem {
            indent,
            number: number.to_string(),
            text: text.to_string(),
        };
    }

    Block::Paragraph {
        text: trimmed.to_string(),
    }
}

fn heading(trimmed: &str) -> Option<Block> {
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=4).contains(&hashes) {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(Block::Heading {
        level: hashes as u8,
        text: rest.trim().to_string(),
    })
}

/// A line consisting solely of `![alt](url)`.
fn image_line(trimmed: &str) -> Option<(&str, &str)> {
    let body = trimmed.strip_prefix("![")?.strip_suffix(')')?;
    let split = body.find("](")?;
    let alt = &body[..split];
    let url = &body[split + 2..];
    if url.contains(')') {
        return None;
    }
    Some((alt, url.trim()))
}

/// Text after a `-`, `*` or `+` marker followed by whitespace.
fn bullet_body(trimmed: &str) -> Option<&str> {
    let rest = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
        .or_else(|| trimmed.strip_prefix('+'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim_start())
}

fn checkbox(body: &str) -> Option<(bool, &str)> {
    let checked = if body.starts_with("[ ]") {
        false
    } else if body.starts_with("[x]") || body.starts_with("[X]") {
        true
    } else {
        return None;
    };
    Some((checked, body[3..].trim_start()))
}

fn ordered_body(trimmed: &str) -> Option<(&str, &str)> {
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = trimmed[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((&trimmed[..digits], rest.trim_start()))
}

/// Leading whitespace width in columns (tab = 4), two columns per level.
fn indent_level(line: &str) -> usize {
    let columns: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum();
    columns / 2
}
