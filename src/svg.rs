use std::fmt::Write;

use crate::paginate::PageGeometry;
use crate::render::{DrawOp, Page, TextOp};

const SANS_FAMILY: &str = "sans-serif";
const MONO_FAMILY: &str = "monospace";

/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

/// Escapes markup characters and drops characters XML cannot carry.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if !is_valid_xml_char(c) {
            continue;
        }
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serializes `page` into an SVG document sized to `geometry`, filled with
/// `background`.
pub fn page_to_svg(page: &Page, geometry: &PageGeometry, background: &str) -> String {
    let mut body = String::new();
    for op in &page.ops {
        write_op(&mut body, op);
    }

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" viewBox="0 0 {w} {h}" width="{w}" height="{h}"><rect width="100%" height="100%" fill="{bg}" />{body}</svg>"#,
        w = geometry.width,
        h = geometry.height,
        bg = escape_xml(background),
        body = body,
    )
}

// Writing into a String cannot fail, so the fmt results are discarded.
fn write_op(out: &mut String, op: &DrawOp) {
    match op {
        DrawOp::Text(text) => write_text(out, text),
        DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            color,
            width,
        } => {
            let _ = write!(
                out,
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}" />"#,
                x1,
                y1,
                x2,
                y2,
                escape_xml(color),
                width
            );
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            radius,
            fill,
            stroke,
        } => {
            let fill = fill.as_deref().map(escape_xml);
            let stroke_attr = stroke
                .as_deref()
                .map(|s| format!(r#" stroke="{}" stroke-width="0.75""#, escape_xml(s)))
                .unwrap_or_default();
            let _ = write!(
                out,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}"{} />"#,
                x,
                y,
                width,
                height,
                radius,
                fill.as_deref().unwrap_or("none"),
                stroke_attr
            );
        }
        DrawOp::Polyline {
            points,
            color,
            width,
        } => {
            let points = points
                .iter()
                .map(|(x, y)| format!("{:.2},{:.2}", x, y))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = write!(
                out,
                r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-linecap="round" stroke-linejoin="round" />"#,
                points,
                escape_xml(color),
                width
            );
        }
        DrawOp::Link {
            x,
            y,
            width,
            height,
            url,
        } => {
            let _ = write!(
                out,
                r#"<a href="{url}" xlink:href="{url}"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="transparent" /></a>"#,
                x,
                y,
                width,
                height,
                url = escape_xml(url)
            );
        }
        DrawOp::Image {
            x,
            y,
            width,
            height,
            href,
        } => {
            let _ = write!(
                out,
                r#"<image x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="xMidYMid meet" href="{href}" xlink:href="{href}" />"#,
                x,
                y,
                width,
                height,
                href = escape_xml(href)
            );
        }
    }
}

fn write_text(out: &mut String, text: &TextOp) {
    let family = if text.face.monospace {
        MONO_FAMILY
    } else {
        SANS_FAMILY
    };
    let weight_attr = if text.face.bold {
        " font-weight=\"700\""
    } else {
        ""
    };
    let style_attr = if text.face.italic {
        " font-style=\"italic\""
    } else {
        ""
    };

    let _ = write!(
        out,
        r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.2}" fill="{}" xml:space="preserve"{}{}>{}</text>"#,
        text.x,
        text.y,
        family,
        text.font_size,
        escape_xml(&text.color),
        weight_attr,
        style_attr,
        escape_xml(&text.text),
    );
}
