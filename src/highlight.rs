use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Keyword,
    String,
    Comment,
    Number,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeToken {
    pub text: String,
    pub kind: TokenKind,
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "def",
    "default", "defer", "do", "elif", "else", "enum", "export", "extends", "false", "finally",
    "fn", "for", "from", "func", "function", "go", "if", "impl", "import", "in", "interface",
    "let", "loop", "match", "mod", "mut", "new", "nil", "None", "null", "package", "pass",
    "pub", "raise", "return", "self", "static", "struct", "super", "switch", "this", "throw",
    "trait", "True", "False", "true", "try", "type", "typeof", "undefined", "use", "var",
    "void", "where", "while", "with", "yield",
];

/// Splits one code line into classified tokens in a single left-to-right
/// pass. At each position a comment is tried first, then a string, then a
/// keyword or number word; anything else is plain. Concatenating the token
/// texts reproduces the line.
pub fn highlight_line(line: &str) -> Vec<CodeToken> {
    let mut tokens: Vec<CodeToken> = Vec::new();
    let mut idx = 0;
    while idx < line.len() {
        let rest = &line[idx..];
        let (len, kind) = if let Some(len) = comment_len(rest) {
            (len, TokenKind::Comment)
        } else if let Some(len) = string_len(rest) {
            (len, TokenKind::String)
        } else if let Some(len) = word_len(rest) {
            (len, word_kind(&rest[..len]))
        } else {
            (rest.chars().next().map_or(1, char::len_utf8), TokenKind::Plain)
        };

        let text = &rest[..len];
        match tokens.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(text),
            _ => tokens.push(CodeToken {
                text: text.to_string(),
                kind,
            }),
        }
        idx += len;
    }
    tokens
}

/// `//` or `#` to end of line, or `/* ... */` closed within the line.
fn comment_len(rest: &str) -> Option<usize> {
    if let Some(body) = rest.strip_prefix("/*") {
        if let Some(close) = body.find("*/") {
            return Some(2 + close + 2);
        }
    }
    (rest.starts_with("//") || rest.starts_with('#')).then_some(rest.len())
}

/// A quoted span delimited by `"`, `'` or backtick, honoring backslash
/// escapes. An unterminated quote does not start a string, and neither does
/// one with a comment opening inside it.
fn string_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let quote = *bytes.first()?;
    if !matches!(quote, b'"' | b'\'' | b'`') {
        return None;
    }
    let end = closing_quote(bytes, 1, quote)?;
    let shadowed = (1..end).any(|p| rest.is_char_boundary(p) && comment_len(&rest[p..]).is_some());
    (!shadowed).then_some(end + 1)
}

fn closing_quote(bytes: &[u8], mut idx: usize, quote: u8) -> Option<usize> {
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b if b == quote => return Some(idx),
            _ => idx += 1,
        }
    }
    None
}

/// Length of the word at the start of `rest`: alphanumerics, `_`, and `.`
/// between digits.
fn word_len(rest: &str) -> Option<usize> {
    let mut end = 0;
    let mut prev: Option<char> = None;
    for (idx, ch) in rest.char_indices() {
        let in_word = ch.is_alphanumeric()
            || ch == '_'
            || (ch == '.'
                && prev.is_some_and(|p| p.is_ascii_digit())
                && rest[idx + 1..].starts_with(|n: char| n.is_ascii_digit()));
        if !in_word {
            break;
        }
        end = idx + ch.len_utf8();
        prev = Some(ch);
    }
    (end > 0).then_some(end)
}

fn word_kind(word: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if is_number(word) {
        TokenKind::Number
    } else {
        TokenKind::Plain
    }
}

/// Digits with an optional single fractional part.
fn is_number(word: &str) -> bool {
    let mut parts = word.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let frac = parts.next();
    !whole.is_empty()
        && whole.chars().all(|c| c.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
}
