//! Inline markup: one logical line of text to a sequence of styled runs.
//!
//! The tokenizer walks the line once. At every position it tries the span
//! matchers in priority order (bold, italic, code, strikethrough, image,
//! link); the first one that matches consumes its span, otherwise the
//! character joins the pending plain run. A second pass splits plain runs
//! on bare `http(s)://` URLs. Runs that already carry a style are never
//! rescanned, so `**https://x.com**` stays a single bold run.

use serde::Serialize;

/// A maximal span of text sharing one style combination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyledRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub link: Option<String>,
    pub is_image: bool,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            link: Some(url.into()),
            ..Self::plain(text)
        }
    }

    /// Placeholder run standing in for an image that is not embedded.
    pub fn image_placeholder(alt: &str) -> Self {
        Self {
            is_image: true,
            ..Self::plain(format!("[Image: {}]", alt))
        }
    }

    /// True when the run carries no style, link or image flag.
    pub fn is_plain(&self) -> bool {
        !self.bold
            && !self.italic
            && !self.code
            && !self.strikethrough
            && self.link.is_none()
            && !self.is_image
    }

    /// Same style flags, different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Parses one line of inline markup. Never returns an empty vector.
pub fn parse_inline(text: &str) -> Vec<StyledRun> {
    let mut runs = Vec::new();
    let mut plain = String::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        if let Some((run, consumed)) = match_span(rest) {
            if !plain.is_empty() {
                runs.push(StyledRun::plain(std::mem::take(&mut plain)));
            }
            runs.push(run);
            pos += consumed;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        plain.push(ch);
        pos += ch.len_utf8();
    }

    if !plain.is_empty() {
        runs.push(StyledRun::plain(plain));
    }

    let mut runs = split_bare_urls(runs);
    if runs.is_empty() {
        runs.push(StyledRun::plain(text));
    }
    runs
}

/// Tries every span matcher at the start of `rest`, in priority order.
/// Returns the run and the number of bytes consumed.
fn match_span(rest: &str) -> Option<(StyledRun, usize)> {
    if let Some((inner, len)) = delimited(rest, "**", "**") {
        return Some((StyledRun::bold(inner), len));
    }
    if let Some((inner, len)) = delimited(rest, "*", "*") {
        let run = StyledRun {
            italic: true,
            ..StyledRun::plain(inner)
        };
        return Some((run, len));
    }
    if let Some((inner, len)) = delimited(rest, "`", "`") {
        let run = StyledRun {
            code: true,
            ..StyledRun::plain(inner)
        };
        return Some((run, len));
    }
    if let Some((inner, len)) = delimited(rest, "~~", "~~") {
        let run = StyledRun {
            strikethrough: true,
            ..StyledRun::plain(inner)
        };
        return Some((run, len));
    }
    if let Some(stripped) = rest.strip_prefix('!') {
        if let Some((alt, _url, len)) = bracket_target(stripped, 0) {
            return Some((StyledRun::image_placeholder(alt), len + 1));
        }
    }
    if let Some((label, url, len)) = bracket_target(rest, 1) {
        if !url.is_empty() {
            return Some((StyledRun::link(label, url), len));
        }
    }
    None
}

/// Matches `open` + at least one character + the first following `close`.
fn delimited<'a>(rest: &'a str, open: &str, close: &str) -> Option<(&'a str, usize)> {
    let body = rest.strip_prefix(open)?;
    let first = body.chars().next()?;
    let search_from = first.len_utf8();
    let end = body[search_from..].find(close)? + search_from;
    Some((&body[..end], open.len() + end + close.len()))
}

/// Matches `[label](target)` where the label has at least `min_label`
/// characters. The label ends at the first `](`, the target at the first `)`.
fn bracket_target(rest: &str, min_label: usize) -> Option<(&str, &str, usize)> {
    let body = rest.strip_prefix('[')?;
    let skip: usize = body.chars().take(min_label).map(char::len_utf8).sum();
    if body.chars().count() < min_label {
        return None;
    }
    let label_end = body[skip..].find("](")? + skip;
    let target_start = label_end + 2;
    let target_len = body[target_start..].find(')')?;
    let label = &body[..label_end];
    let target = &body[target_start..target_start + target_len];
    Some((label, target, 1 + target_start + target_len + 1))
}

fn split_bare_urls(runs: Vec<StyledRun>) -> Vec<StyledRun> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if !run.is_plain() {
            out.push(run);
            continue;
        }

        let text = run.text.as_str();
        let mut cursor = 0;
        while let Some((start, end)) = next_url(text, cursor) {
            if start > cursor {
                out.push(StyledRun::plain(&text[cursor..start]));
            }
            let url = &text[start..end];
            out.push(StyledRun::link(url, url));
            cursor = end;
        }
        if cursor < text.len() {
            out.push(StyledRun::plain(&text[cursor..]));
        }
    }
    out
}

/// Finds the next `http://` or `https://` URL at or after `from`; the URL
/// runs to the next whitespace.
fn next_url(text: &str, from: usize) -> Option<(usize, usize)> {
    let haystack = &text[from..];
    let start = ["https://", "http://"]
        .iter()
        .filter_map(|scheme| {
            haystack
                .match_indices(scheme)
                .map(|(idx, _)| idx)
                .find(|&idx| {
                    haystack[idx + scheme.len()..]
                        .chars()
                        .next()
                        .is_some_and(|c| !c.is_whitespace())
                })
        })
        .min()?;
    let start = from + start;
    let end = text[start..]
        .find(char::is_whitespace)
        .map_or(text.len(), |len| start + len);
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(runs: &[StyledRun]) -> Vec<&str> {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_single_plain_run() {
        let runs = parse_inline("");
        assert_eq!(runs, vec![StyledRun::plain("")]);
    }

    #[test]
    fn plain_text_is_one_run() {
        let runs = parse_inline("just words here");
        assert_eq!(runs, vec![StyledRun::plain("just words here")]);
    }

    #[test]
    fn bold_between_plain_runs() {
        let runs = parse_inline("Hello **world** again");
        assert_eq!(texts(&runs), vec!["Hello ", "world", " again"]);
        assert!(runs[1].bold);
        assert!(runs[0].is_plain());
        assert!(runs[2].is_plain());
    }

    #[test]
    fn each_marker_sets_its_flag() {
        let runs = parse_inline("*it* `code` ~~gone~~");
        assert!(runs[0].italic && runs[0].text == "it");
        assert!(runs[2].code && runs[2].text == "code");
        assert!(runs[4].strikethrough && runs[4].text == "gone");
    }

    #[test]
    fn double_star_wins_over_single_star() {
        let runs = parse_inline("**a**");
        assert_eq!(runs.len(), 1);
        assert!(runs[0].bold);
        assert!(!runs[0].italic);
    }

    #[test]
    fn link_keeps_label_and_target() {
        let runs = parse_inline("see [docs](https://example.com/docs) now");
        assert_eq!(texts(&runs), vec!["see ", "docs", " now"]);
        assert_eq!(runs[1].link.as_deref(), Some("https://example.com/docs"));
    }

    #[test]
    fn inline_image_becomes_placeholder() {
        let runs = parse_inline("a ![logo](x.png) b");
        assert_eq!(runs[1].text, "[Image: logo]");
        assert!(runs[1].is_image);
        assert!(runs[1].link.is_none());
    }

    #[test]
    fn image_with_empty_alt_still_matches() {
        let runs = parse_inline("![](x.png)");
        assert_eq!(runs, vec![StyledRun::image_placeholder("")]);
    }

    #[test]
    fn unclosed_markers_stay_plain() {
        let runs = parse_inline("2 * 3 and ~~open");
        assert_eq!(runs, vec![StyledRun::plain("2 * 3 and ~~open")]);
    }

    #[test]
    fn empty_emphasis_is_not_a_span() {
        let runs = parse_inline("****");
        assert!(runs.iter().all(|r| !r.bold || !r.text.is_empty()));
        let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert!(!joined.is_empty());
    }

    #[test]
    fn bare_url_in_plain_text_is_linked() {
        let runs = parse_inline("visit https://example.com today");
        assert_eq!(texts(&runs), vec!["visit ", "https://example.com", " today"]);
        assert_eq!(runs[1].link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn url_inside_bold_stays_a_single_bold_run() {
        let runs = parse_inline("**https://x.com**");
        assert_eq!(runs.len(), 1);
        assert!(runs[0].bold);
        assert!(runs[0].link.is_none());
        assert_eq!(runs[0].text, "https://x.com");
    }

    #[test]
    fn bare_scheme_without_host_is_not_a_link() {
        let runs = parse_inline("ends with http://");
        assert_eq!(runs, vec![StyledRun::plain("ends with http://")]);
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let runs = parse_inline("café **naïve** 日本");
        let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(joined, "café naïve 日本");
    }
}
