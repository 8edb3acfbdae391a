use serde::Serialize;

use crate::fonts::TextMeasure;
use crate::highlight::{CodeToken, TokenKind};
use crate::inline::StyledRun;
use crate::theme::Theme;
use crate::wrap::{FontFace, LayoutLine};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextOp {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub face: FontFace,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Text(TextOp),
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: String,
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        fill: Option<String>,
        stroke: Option<String>,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        color: String,
        width: f32,
    },
    /// Clickable region; drawn invisibly over the link text.
    Link {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        url: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        href: String,
    },
}

/// Draw operations in page coordinates: points from the top-left, text `y`
/// is the baseline. Later operations paint over earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub ops: Vec<DrawOp>,
}

impl Page {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            ops: Vec::new(),
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextOp> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(text) => Some(text),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = (&str, [f32; 4])> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Link {
                x,
                y,
                width,
                height,
                url,
            } => Some((url.as_str(), [*x, *y, *width, *height])),
            _ => None,
        })
    }
}

/// What kind of block a flowed line belongs to; selects the base color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Title,
    Heading,
    Body,
    Quote,
}

fn run_color<'t>(run: &StyledRun, role: TextRole, theme: &'t Theme) -> &'t str {
    if run.link.is_some() {
        &theme.link_color
    } else if run.is_image {
        &theme.muted_color
    } else if run.code {
        &theme.code_text_color
    } else {
        match role {
            TextRole::Title | TextRole::Heading => &theme.heading_color,
            TextRole::Quote => &theme.quote_text_color,
            TextRole::Body => &theme.text_color,
        }
    }
}

/// Draws one placed line: a text op per segment plus code backgrounds,
/// underline and strikethrough strokes and link regions.
pub fn emit_line(page: &mut Page, line: &LayoutLine, font_size: f32, role: TextRole, theme: &Theme) {
    let y = line.baseline_y;
    let mut x = line.indent_x;

    for seg in &line.segments {
        let run = &seg.run;
        let color = run_color(run, role, theme).to_string();

        if run.code {
            page.ops.push(DrawOp::Rect {
                x: x - 1.0,
                y: y - font_size * 0.85,
                width: seg.width + 2.0,
                height: font_size * 1.1,
                radius: 2.0,
                fill: Some(theme.code_bg_color.clone()),
                stroke: None,
            });
        }

        page.ops.push(DrawOp::Text(TextOp {
            x,
            y,
            text: run.text.clone(),
            font_size,
            face: seg.face,
            color: color.clone(),
        }));

        if run.strikethrough {
            let mid = y - font_size * 0.3;
            page.ops.push(stroke(x, mid, x + seg.width, mid, &color, font_size * 0.06));
        }

        if let Some(url) = &run.link {
            let under = y + font_size * 0.15;
            page.ops.push(stroke(x, under, x + seg.width, under, &color, font_size * 0.06));
            page.ops.push(DrawOp::Link {
                x,
                y: y - font_size,
                width: seg.width,
                height: font_size * 1.25,
                url: url.clone(),
            });
        }

        x += seg.width;
    }
}

fn stroke(x1: f32, y1: f32, x2: f32, y2: f32, color: &str, width: f32) -> DrawOp {
    DrawOp::Line {
        x1,
        y1,
        x2,
        y2,
        color: color.to_string(),
        width,
    }
}

/// Plain text op, used for list markers.
pub fn emit_marker(page: &mut Page, x: f32, y: f32, marker: &str, font_size: f32, theme: &Theme) {
    page.ops.push(DrawOp::Text(TextOp {
        x,
        y,
        text: marker.to_string(),
        font_size,
        face: FontFace::default(),
        color: theme.text_color.clone(),
    }));
}

/// Rounded-square checkbox whose bottom edge sits on the baseline `y`.
/// Checked boxes are filled and carry a two-stroke check mark.
pub fn emit_checkbox(page: &mut Page, x: f32, y: f32, size: f32, checked: bool, theme: &Theme) {
    let top = y - size;
    let color = theme.checkbox_color.clone();
    page.ops.push(DrawOp::Rect {
        x,
        y: top,
        width: size,
        height: size,
        radius: size * 0.2,
        fill: checked.then(|| color.clone()),
        stroke: Some(color),
    });

    if checked {
        page.ops.push(DrawOp::Polyline {
            points: vec![
                (x + size * 0.22, top + size * 0.52),
                (x + size * 0.42, top + size * 0.72),
                (x + size * 0.78, top + size * 0.3),
            ],
            color: theme.background_color.clone(),
            width: size * 0.14,
        });
    }
}

pub fn emit_quote_bar(page: &mut Page, x: f32, top: f32, bottom: f32, theme: &Theme) {
    page.ops
        .push(stroke(x, top, x, bottom, &theme.quote_border_color, 2.0));
}

pub fn emit_rule(page: &mut Page, x1: f32, x2: f32, y: f32, theme: &Theme) {
    page.ops
        .push(stroke(x1, y, x2, y, &theme.quote_border_color, 0.75));
}

/// Inserts a code block background at `slot` so it paints beneath the
/// lines already emitted for the fragment.
pub fn emit_code_background(
    page: &mut Page,
    slot: usize,
    rect: [f32; 4],
    theme: &Theme,
) {
    let [x, y, width, height] = rect;
    let slot = slot.min(page.ops.len());
    page.ops.insert(
        slot,
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            radius: 3.0,
            fill: Some(theme.code_bg_color.clone()),
            stroke: None,
        },
    );
}

fn token_color<'t>(kind: TokenKind, theme: &'t Theme) -> &'t str {
    match kind {
        TokenKind::Keyword => &theme.syntax.keyword,
        TokenKind::String => &theme.syntax.string,
        TokenKind::Comment => &theme.syntax.comment,
        TokenKind::Number => &theme.syntax.number,
        TokenKind::Plain => &theme.code_text_color,
    }
}

/// Draws one visual code line; tokens advance by their measured width.
pub fn emit_code_line<T: TextMeasure>(
    page: &mut Page,
    x: f32,
    y: f32,
    tokens: &[CodeToken],
    font_size: f32,
    measure: &mut T,
    theme: &Theme,
) {
    let face = FontFace {
        monospace: true,
        ..FontFace::default()
    };
    let mut x = x;
    for token in tokens {
        let (width, _) = measure.measure_text(&token.text, font_size, true, false, false, None);
        if !token.text.trim().is_empty() {
            page.ops.push(DrawOp::Text(TextOp {
                x,
                y,
                text: token.text.clone(),
                font_size,
                face,
                color: token_color(token.kind, theme).to_string(),
            }));
        }
        x += width;
    }
}

/// Geometry shared by every row of one table.
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub x: f32,
    pub column_width: f32,
    pub row_height: f32,
    pub font_size: f32,
    pub cell_padding: f32,
}

/// Draws one table row whose top edge is at `top`: header shading, the
/// cell texts (truncated to fit), a border per cell and an outer border.
pub fn emit_table_row<T: TextMeasure>(
    page: &mut Page,
    table: &TableLayout,
    top: f32,
    cells: &[String],
    header: bool,
    measure: &mut T,
    theme: &Theme,
) {
    let row_width = table.column_width * cells.len() as f32;

    if header {
        page.ops.push(DrawOp::Rect {
            x: table.x,
            y: top,
            width: row_width,
            height: table.row_height,
            radius: 0.0,
            fill: Some(theme.table_header_bg_color.clone()),
            stroke: None,
        });
    }

    let face = FontFace {
        bold: header,
        ..FontFace::default()
    };
    let text_width = (table.column_width - table.cell_padding * 2.0).max(0.0);
    let baseline = top + (table.row_height + table.font_size * 0.7) / 2.0;

    for (col, cell) in cells.iter().enumerate() {
        let cell_x = table.x + table.column_width * col as f32;
        let text = fit_text(cell, text_width, table.font_size, face, measure);
        if !text.is_empty() {
            page.ops.push(DrawOp::Text(TextOp {
                x: cell_x + table.cell_padding,
                y: baseline,
                text,
                font_size: table.font_size,
                face,
                color: theme.text_color.clone(),
            }));
        }
        page.ops.push(DrawOp::Rect {
            x: cell_x,
            y: top,
            width: table.column_width,
            height: table.row_height,
            radius: 0.0,
            fill: None,
            stroke: Some(theme.table_border_color.clone()),
        });
    }

    page.ops.push(DrawOp::Rect {
        x: table.x,
        y: top,
        width: row_width,
        height: table.row_height,
        radius: 0.0,
        fill: None,
        stroke: Some(theme.table_border_color.clone()),
    });
}

/// Truncates `text` with an ellipsis so it measures within `max_width`.
/// Text that fits is returned unchanged.
///
/// Widths are summed one character at a time, so a long cell costs one
/// measurement per character scanned and only single characters reach a
/// memoizing measurer.
pub fn fit_text<T: TextMeasure>(
    text: &str,
    max_width: f32,
    font_size: f32,
    face: FontFace,
    measure: &mut T,
) -> String {
    let mut width_of = |s: &str| {
        measure
            .measure_text(s, font_size, face.monospace, face.bold, face.italic, None)
            .0
    };

    let ellipsis = width_of("…");
    let mut buf = [0u8; 4];
    let mut total = 0.0;
    // Longest prefix (in bytes) that still leaves room for the ellipsis.
    let mut cut = None;
    for (idx, c) in text.char_indices() {
        if total + ellipsis <= max_width {
            cut = Some(idx);
        }
        total += width_of(c.encode_utf8(&mut buf));
        if total > max_width {
            return match cut {
                Some(end) => format!("{}…", &text[..end]),
                None => String::new(),
            };
        }
    }
    text.to_string()
}

pub fn emit_image(page: &mut Page, rect: [f32; 4], href: String) {
    let [x, y, width, height] = rect;
    page.ops.push(DrawOp::Image {
        x,
        y,
        width,
        height,
        href,
    });
}
