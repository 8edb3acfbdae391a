mod common;

use common::{StubImages, all_ops, find_text, layout, layout_with, texts};
use notepress::{ApproxMeasure, Block, DrawOp, PageGeometry, TextMeasure, Theme, classify};

#[test]
fn heading_then_paragraph_with_bold_run() {
    let doc = layout("# Title\n\nHello **world**");
    assert_eq!(doc.page_count(), 1);
    let theme = Theme::default();

    let title = find_text(&doc, "Title").expect("heading text");
    assert_eq!(title.font_size, theme.heading_size(1));
    assert!(title.face.bold);

    let hello = find_text(&doc, "Hello ").expect("plain segment");
    let world = find_text(&doc, "world").expect("bold segment");
    assert!(!hello.face.bold);
    assert!(world.face.bold);
    assert_eq!(hello.y, world.y);
    assert!(world.x > hello.x);
    assert!(hello.y > title.y);
    assert_eq!(hello.font_size, theme.font_size_base);
}

#[test]
fn checklist_glyphs_reflect_state() {
    let doc = layout("- [ ] task one\n- [x] task two");
    let page = &doc.pages[0];

    let boxes: Vec<(f32, bool)> = page
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Rect { x, fill, stroke: Some(_), .. } => Some((*x, fill.is_some())),
            _ => None,
        })
        .collect();
    assert_eq!(boxes.len(), 2);
    assert!(!boxes[0].1, "unchecked box must be outline only");
    assert!(boxes[1].1, "checked box must be filled");
    assert_eq!(boxes[0].0, boxes[1].0);

    let checks = page
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Polyline { .. }))
        .count();
    assert_eq!(checks, 1);

    let one = find_text(&doc, "task one").expect("first item");
    let two = find_text(&doc, "task two").expect("second item");
    assert_eq!(one.x, two.x);
    assert_eq!(one.face, two.face);
    assert!(two.y > one.y);
}

#[test]
fn uppercase_x_is_checked_too() {
    let blocks = classify("- [X] shouting");
    assert_eq!(
        blocks,
        vec![Block::ChecklistItem {
            indent: 0,
            checked: true,
            text: "shouting".into()
        }]
    );
}

#[test]
fn table_header_and_data_rows_without_separator() {
    let content = "|A|B|\n|--|--|\n|1|2|";
    match classify(content).as_slice() {
        [Block::TableBlock { rows }] => assert_eq!(rows.len(), 3),
        other => panic!("expected one table, got {other:?}"),
    }

    let doc = layout(content);
    let cells: Vec<(&str, bool)> = texts(&doc)
        .into_iter()
        .map(|(_, t)| (t.text.as_str(), t.face.bold))
        .collect();
    assert_eq!(cells, vec![("A", true), ("B", true), ("1", false), ("2", false)]);
    assert!(!all_ops(&doc).any(|op| matches!(op, DrawOp::Text(t) if t.text.contains('-'))));
}

#[test]
fn ragged_table_rows_share_one_column_count() {
    let doc = layout("|a|b|c|\n|-|-|\n|1|\n|x|y|z|w|");
    let geometry = PageGeometry::a4();
    let column_width = geometry.content_width() / 4.0;

    let cell_borders = all_ops(&doc)
        .filter(|op| {
            matches!(op, DrawOp::Rect { width, fill: None, stroke: Some(_), .. }
                if (*width - column_width).abs() < 0.01)
        })
        .count();
    assert_eq!(cell_borders, 3 * 4);

    let rendered: Vec<&str> = texts(&doc).into_iter().map(|(_, t)| t.text.as_str()).collect();
    assert_eq!(rendered, vec!["a", "b", "c", "1", "x", "y", "z", "w"]);
}

#[test]
fn long_table_cell_is_truncated_but_visible() {
    let long = "word ".repeat(40);
    let doc = layout(&format!("|{}|b|\n|-|-|\n|1|2|", long.trim()));
    let first = texts(&doc)[0].1.text.clone();
    assert!(first.ends_with('…'));
    assert!(first.len() < long.len());
}

#[test]
fn overflow_produces_multiple_pages_within_margins() {
    let content = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod.\n\n"
        .repeat(300);
    let doc = layout(&content);
    let geometry = PageGeometry::a4();
    assert!(doc.page_count() >= 2);

    for (_, text) in texts(&doc) {
        assert!(text.y >= geometry.margin_top);
        assert!(text.y <= geometry.height - geometry.margin_bottom);
    }
    for (idx, page) in doc.pages.iter().enumerate() {
        assert_eq!(page.number, idx + 1);
    }
}

#[test]
fn page_count_stays_within_atomic_slack() {
    let theme = Theme::default();
    let geometry = PageGeometry::a4();
    let n = 300;
    let content = "Filler sentence for pagination.\n".repeat(n);
    let doc = layout(&content);

    // Empty title line plus its gap, then one line and one trailing gap per
    // paragraph.
    let title = theme.font_size_title * geometry.line_height + theme.font_size_base;
    let per_paragraph = theme.font_size_base * geometry.line_height + theme.font_size_base * 0.25;
    let total = title + per_paragraph * n as f32;
    let bound = (total / geometry.usable_height()).ceil() as usize + 1;

    assert!(doc.page_count() > 1);
    assert!(doc.page_count() <= bound, "{} pages > bound {}", doc.page_count(), bound);
}

#[test]
fn unbroken_url_wraps_with_link_on_every_fragment() {
    let url = format!("https://example.com/{}", "a-very-very-very-long-path-".repeat(8));
    let doc = layout(&url);
    let page = &doc.pages[0];

    let fragments: Vec<_> = page.texts().collect();
    let links: Vec<_> = page.links().collect();
    assert!(fragments.len() > 1);
    assert_eq!(fragments.len(), links.len());

    let joined: String = fragments.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(joined, url);

    let right_edge = PageGeometry::a4().width - PageGeometry::a4().margin_right;
    for (text, (href, [x, y, w, _])) in fragments.iter().zip(&links) {
        assert_eq!(*href, url);
        assert!(text.face.bold);
        assert_eq!(*x, text.x);
        assert!((*y - (text.y - text.font_size)).abs() < 0.01);
        assert!(x + w <= right_edge + 0.01);
    }
}

#[test]
fn url_inside_bold_is_not_linked() {
    let doc = layout("**https://x.com**");
    let runs: Vec<_> = doc.pages[0].texts().collect();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "https://x.com");
    assert!(runs[0].face.bold);
    assert_eq!(doc.pages[0].links().count(), 0);
}

#[test]
fn loaded_image_is_scaled_and_centered() {
    let mut images = StubImages::default();
    let geometry = PageGeometry::a4();
    let doc = layout_with("![chart](ok.png)", geometry, &mut images);
    assert_eq!(images.requested, vec!["ok.png".to_string()]);

    let image = all_ops(&doc).find_map(|op| match op {
        DrawOp::Image { x, width, height, href, .. } => Some((*x, *width, *height, href.clone())),
        _ => None,
    });
    let (x, width, height, href) = image.expect("image op");
    assert!(width <= geometry.content_width() + 0.01);
    assert!(height <= geometry.max_image_height + 0.01);
    assert!((width / height - 2.0).abs() < 0.01);
    assert!((x + width / 2.0 - geometry.width / 2.0).abs() < 0.01);
    assert!(href.starts_with("data:image/png;base64,"));
}

#[test]
fn failed_image_falls_back_to_placeholder_text() {
    let mut images = StubImages::default();
    let doc = layout_with("![a cat](https://example.com/cat.png)", PageGeometry::a4(), &mut images);
    let placeholder = find_text(&doc, "[Image: a cat]").expect("placeholder");
    assert!(placeholder.face.italic);
    assert_eq!(placeholder.color, Theme::default().muted_color);
    assert!(!all_ops(&doc).any(|op| matches!(op, DrawOp::Image { .. })));
}

#[test]
fn quote_is_italic_with_a_side_bar() {
    let doc = layout("> quoted wisdom");
    let text = find_text(&doc, "quoted wisdom").expect("quote text");
    assert!(text.face.italic);
    assert_eq!(text.color, Theme::default().quote_text_color);

    let bar = all_ops(&doc).find_map(|op| match op {
        DrawOp::Line { x1, y1, x2, y2, .. } if x1 == x2 => Some((*x1, *y1, *y2)),
        _ => None,
    });
    let (x, top, bottom) = bar.expect("quote bar");
    assert!(x < text.x);
    assert!(top < text.y && bottom > text.y);
}

#[test]
fn consecutive_quote_lines_share_one_bar() {
    let doc = layout("> one\n> two\n> three");
    let bars: Vec<(f32, f32)> = all_ops(&doc)
        .filter_map(|op| match op {
            DrawOp::Line { x1, y1, x2, y2, .. } if x1 == x2 => Some((*y1, *y2)),
            _ => None,
        })
        .collect();
    assert_eq!(bars.len(), 1, "bars: {bars:?}");

    let (top, bottom) = bars[0];
    for word in ["one", "two", "three"] {
        let text = find_text(&doc, word).expect("quote line");
        assert!(top < text.y && bottom > text.y, "{word} outside the bar");
    }
}

#[test]
fn deeply_indented_items_stay_inside_the_right_margin() {
    let geometry = PageGeometry::a4();
    let right_edge = geometry.width - geometry.margin_right;
    let content = format!(
        "{pad}- deep item\n{pad}- [ ] deep task\n{pad}12. deep number",
        pad = " ".repeat(100)
    );
    let doc = layout(&content);

    let mut measure = ApproxMeasure;
    let placed = texts(&doc);
    assert!(placed.iter().any(|(_, t)| t.text == "•"));
    for (_, text) in placed {
        let (width, _) = measure.measure_text(
            &text.text,
            text.font_size,
            text.face.monospace,
            text.face.bold,
            text.face.italic,
            None,
        );
        assert!(text.x >= geometry.margin_left, "{:?} at {}", text.text, text.x);
        assert!(
            text.x + width <= right_edge + 0.01,
            "{:?} at {} overflows",
            text.text,
            text.x
        );
    }
    let joined: String = texts(&doc).into_iter().map(|(_, t)| t.text.as_str()).collect();
    assert!(joined.contains("deep"));
    assert!(joined.contains("item"));
}

#[test]
fn nested_bullets_indent_further() {
    let doc = layout("- outer\n  - inner");
    let outer = find_text(&doc, "outer").expect("outer");
    let inner = find_text(&doc, "inner").expect("inner");
    assert!(inner.x > outer.x);
    assert_eq!(
        doc.pages[0].texts().filter(|t| t.text == "•").count(),
        2
    );
}

#[test]
fn ordered_markers_keep_their_numbers() {
    let doc = layout("3. third\n4. fourth");
    assert!(find_text(&doc, "3.").is_some());
    assert!(find_text(&doc, "4.").is_some());
}

#[test]
fn code_block_is_highlighted_over_a_background() {
    let theme = Theme::default();
    let doc = layout("```rust\nlet x = 1; // one\n```");
    let page = &doc.pages[0];

    let background = page.ops.iter().position(|op| {
        matches!(op, DrawOp::Rect { fill: Some(fill), .. } if *fill == theme.code_bg_color)
    });
    let keyword = page.ops.iter().position(|op| {
        matches!(op, DrawOp::Text(t) if t.text == "let" && t.color == theme.syntax.keyword)
    });
    let (background, keyword) = (background.expect("background"), keyword.expect("keyword"));
    assert!(background < keyword, "background must paint beneath the code");

    let comment = find_text(&doc, "// one").expect("comment");
    assert_eq!(comment.color, theme.syntax.comment);
    assert!(comment.face.monospace);
}

#[test]
fn code_block_taller_than_a_page_gets_a_background_per_page() {
    let theme = Theme::default();
    let body = (0..120).map(|i| format!("line_{i}")).collect::<Vec<_>>().join("\n");
    let doc = layout(&format!("```\n{body}\n```"));
    assert!(doc.page_count() >= 2);
    for page in &doc.pages {
        let backgrounds = page
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect { fill: Some(fill), .. } if *fill == theme.code_bg_color))
            .count();
        assert_eq!(backgrounds, 1, "page {}", page.number);
    }
    assert!(find_text(&doc, "line_0").is_some());
    assert!(find_text(&doc, "line_119").is_some());
}

#[test]
fn horizontal_rule_draws_across_the_content_width() {
    let geometry = PageGeometry::a4();
    let doc = layout("above\n\n***\n\nbelow");
    let rule = all_ops(&doc).find_map(|op| match op {
        DrawOp::Line { x1, x2, y1, y2, .. } if y1 == y2 => Some((*x1, *x2)),
        _ => None,
    });
    assert_eq!(rule, Some((geometry.margin_left, geometry.width - geometry.margin_right)));
}

#[test]
fn inline_code_and_strikethrough_decorations() {
    let theme = Theme::default();
    let doc = layout("run `cargo` not ~~this~~");
    let code = find_text(&doc, "cargo").expect("code");
    assert!(code.face.monospace);
    assert!(all_ops(&doc).any(|op| {
        matches!(op, DrawOp::Rect { fill: Some(fill), .. } if *fill == theme.code_bg_color)
    }));
    let struck = find_text(&doc, "this").expect("strike");
    assert!(all_ops(&doc).any(|op| {
        matches!(op, DrawOp::Line { y1, y2, .. } if y1 == y2 && *y1 < struck.y)
    }));
}

#[test]
fn title_is_rendered_first_in_title_font() {
    let theme = Theme::default();
    let doc = notepress::layout_document(
        "Weekly plan",
        "body text",
        &theme,
        PageGeometry::letter(),
        &mut notepress::ApproxMeasure,
        &mut notepress::NoImageLoader,
    );
    let first = doc.pages[0].texts().next().expect("title");
    assert_eq!(first.text, "Weekly plan");
    assert_eq!(first.font_size, theme.font_size_title);
    assert_eq!(doc.title, "Weekly plan");
    assert_eq!(doc.geometry.width, 612.0);
}

#[test]
fn every_block_kind_renders_something() {
    let content = "\
# H1
## H2
### H3
#### H4
##### not a heading

para with [link](https://a.test)

> quote
- [ ] todo
- bullet
1. first
---
```
code
```
|x|y|
|-|-|
|1|2|
![alt](nowhere.png)
";
    let doc = layout_with(content, PageGeometry::a4(), &mut StubImages::default());
    for expected in [
        "H1",
        "H2",
        "H3",
        "H4",
        "##### not a heading",
        "link",
        "quote",
        "todo",
        "bullet",
        "first",
        "code",
        "x",
        "[Image: alt]",
    ] {
        assert!(find_text(&doc, expected).is_some(), "missing {expected:?}");
    }
}
