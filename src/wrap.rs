//! Greedy line packing for styled runs.
//!
//! Every flowed block (paragraph, quote, list and checklist items, the title
//! and headings) goes through [`wrap_runs`]. It carries no state between
//! calls: the caller supplies the width budget, the indent and a resolver
//! that maps each run to the font face it will be drawn with.

use serde::Serialize;

use crate::fonts::TextMeasure;
use crate::inline::StyledRun;

/// Font face a run is measured and drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FontFace {
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
}

impl FontFace {
    /// The default face for a run, before any block-level overrides.
    /// Links render bold whatever their other flags say.
    pub fn for_run(run: &StyledRun) -> Self {
        Self {
            bold: run.bold || run.link.is_some(),
            italic: run.italic || run.is_image,
            monospace: run.code,
        }
    }
}

/// A run plus its measured width.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedRun {
    pub run: StyledRun,
    pub face: FontFace,
    pub width: f32,
}

/// One visual line. `baseline_y` stays zero until the line is placed on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutLine {
    pub baseline_y: f32,
    pub indent_x: f32,
    pub segments: Vec<PositionedRun>,
}

impl LayoutLine {
    fn empty(indent_x: f32) -> Self {
        Self {
            baseline_y: 0.0,
            indent_x,
            segments: Vec::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.segments.iter().map(|s| s.width).sum()
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.run.text.as_str()).collect()
    }
}

/// Width budget and type size for one wrapping call.
#[derive(Debug, Clone, Copy)]
pub struct FlowParams {
    pub content_width: f32,
    pub indent_x: f32,
    pub font_size: f32,
}

struct LineBuilder {
    lines: Vec<LayoutLine>,
    current: LayoutLine,
    width: f32,
    last_run: Option<usize>,
    indent_x: f32,
}

impl LineBuilder {
    fn new(indent_x: f32) -> Self {
        Self {
            lines: Vec::new(),
            current: LayoutLine::empty(indent_x),
            width: 0.0,
            last_run: None,
            indent_x,
        }
    }

    fn is_empty(&self) -> bool {
        self.current.segments.is_empty()
    }

    fn push(&mut self, run_index: usize, run: &StyledRun, face: FontFace, text: &str, width: f32) {
        self.width += width;
        if self.last_run == Some(run_index) {
            if let Some(last) = self.current.segments.last_mut() {
                last.run.text.push_str(text);
                last.width += width;
                return;
            }
        }
        self.current.segments.push(PositionedRun {
            run: run.with_text(text),
            face,
            width,
        });
        self.last_run = Some(run_index);
    }

    fn flush(&mut self) {
        let line = std::mem::replace(&mut self.current, LayoutLine::empty(self.indent_x));
        self.lines.push(line);
        self.width = 0.0;
        self.last_run = None;
    }

    fn finish(mut self) -> Vec<LayoutLine> {
        if !self.is_empty() || self.lines.is_empty() {
            self.flush();
        }
        self.lines
    }
}

/// Splits on spaces, keeping the space on every word but the last, so the
/// pieces concatenate back to the input.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(' ')
}

/// Packs runs into lines no wider than `params.content_width`.
///
/// Words that alone exceed the width are split character by character,
/// which guarantees progress on unbroken text such as long URLs. Always
/// returns at least one line.
pub fn wrap_runs<T, F>(
    runs: &[StyledRun],
    params: FlowParams,
    measure: &mut T,
    resolve: F,
) -> Vec<LayoutLine>
where
    T: TextMeasure,
    F: Fn(&StyledRun) -> FontFace,
{
    let mut builder = LineBuilder::new(params.indent_x);
    let limit = params.content_width;

    for (run_index, run) in runs.iter().enumerate() {
        let face = resolve(run);
        let mut width_of = |text: &str| {
            measure
                .measure_text(
                    text,
                    params.font_size,
                    face.monospace,
                    face.bold,
                    face.italic,
                    None,
                )
                .0
        };

        for word in words(&run.text) {
            let word_width = width_of(word);

            if !builder.is_empty() && builder.width + word_width > limit {
                builder.flush();
            }

            if word_width <= limit {
                builder.push(run_index, run, face, word, word_width);
                continue;
            }

            let mut piece = String::new();
            let mut piece_width = 0.0;
            for ch in word.chars() {
                let mut buf = [0u8; 4];
                let ch_str = ch.encode_utf8(&mut buf);
                let ch_width = width_of(ch_str);
                let occupied = builder.width + piece_width;
                if occupied + ch_width > limit && (!piece.is_empty() || !builder.is_empty()) {
                    if !piece.is_empty() {
                        builder.push(run_index, run, face, &piece, piece_width);
                    }
                    builder.flush();
                    piece.clear();
                    piece_width = 0.0;
                }
                piece.push(ch);
                piece_width += ch_width;
            }
            if !piece.is_empty() {
                builder.push(run_index, run, face, &piece, piece_width);
            }
        }
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::ApproxMeasure;
    use crate::inline::parse_inline;

    fn params(width: f32) -> FlowParams {
        FlowParams {
            content_width: width,
            indent_x: 10.0,
            font_size: 10.0,
        }
    }

    fn wrap(text: &str, width: f32) -> Vec<LayoutLine> {
        wrap_runs(&parse_inline(text), params(width), &mut ApproxMeasure, FontFace::for_run)
    }

    #[test]
    fn short_text_is_one_line_per_run_segment() {
        let lines = wrap("Hello **world**", 500.0);
        assert_eq!(lines.len(), 1);
        let segs = &lines[0].segments;
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].run.text, "Hello ");
        assert!(!segs[0].face.bold);
        assert_eq!(segs[1].run.text, "world");
        assert!(segs[1].face.bold);
        assert_eq!(lines[0].indent_x, 10.0);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let lines = wrap("aaaa bbbb cccc dddd", 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width() <= 60.0, "line too wide: {}", line.width());
        }
        let joined: String = lines.iter().map(LayoutLine::text).collect();
        assert_eq!(joined, "aaaa bbbb cccc dddd");
    }

    #[test]
    fn hard_splits_long_word() {
        let word = "x".repeat(80);
        let lines = wrap(&word, 50.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width() <= 50.0);
            assert!(!line.segments.is_empty());
        }
        let joined: String = lines.iter().map(LayoutLine::text).collect();
        assert_eq!(joined, word);
    }

    #[test]
    fn long_word_after_short_word_starts_on_new_line() {
        let lines = wrap(&format!("hi {}", "y".repeat(40)), 60.0);
        assert_eq!(lines[0].text(), "hi ");
        assert!(lines[1].text().starts_with('y'));
    }

    #[test]
    fn empty_input_still_yields_a_line() {
        let lines = wrap("", 100.0);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].segments.is_empty());
    }

    #[test]
    fn link_runs_are_bold_by_default() {
        let lines = wrap("[site](https://a.test)", 500.0);
        assert!(lines[0].segments[0].face.bold);
        assert_eq!(lines[0].segments[0].run.link.as_deref(), Some("https://a.test"));
    }

    #[test]
    fn resolver_overrides_face() {
        let runs = parse_inline("quoted words");
        let lines = wrap_runs(&runs, params(500.0), &mut ApproxMeasure, |run| FontFace {
            italic: true,
            ..FontFace::for_run(run)
        });
        assert!(lines[0].segments[0].face.italic);
    }

    #[test]
    fn url_hard_split_keeps_link_on_every_fragment() {
        let url = format!("https://example.com/{}", "segment".repeat(12));
        let lines = wrap(&url, 80.0);
        assert!(lines.len() > 1);
        for line in &lines {
            for seg in &line.segments {
                assert_eq!(seg.run.link.as_deref(), Some(url.as_str()));
            }
        }
    }
}
