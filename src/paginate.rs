//! Page assembly.
//!
//! [`LayoutEngine::layout`] consumes classified blocks in order and threads
//! one [`PaginationContext`] through every emission function. Before any
//! line, row or image is emitted its height is checked against the space
//! left on the page and a new page is started if it does not fit. Code
//! blocks and tables check their total height first so they move to the
//! next page as a unit when they would otherwise straddle a break.

use serde::Serialize;

use crate::block::{self, Block};
use crate::fonts::TextMeasure;
use crate::highlight::{self, CodeToken};
use crate::image::ImageLoader;
use crate::inline::{self, StyledRun};
use crate::render::{self, Page, TableLayout, TextRole};
use crate::theme::Theme;
use crate::wrap::{self, FlowParams, FontFace, LayoutLine};

const LIST_INDENT: f32 = 18.0;
const LIST_TEXT_OFFSET: f32 = 14.0;
const CHECKBOX_OFFSET: f32 = 16.0;
const QUOTE_INDENT: f32 = 14.0;
const QUOTE_BAR_INSET: f32 = 3.0;
const CELL_PADDING: f32 = 4.0;
const EPSILON: f32 = 0.01;

/// Fixed page configuration, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
    pub table_row_height: f32,
    pub code_block_padding: f32,
    pub max_image_height: f32,
}

impl PageGeometry {
    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin_top: 50.0,
            margin_bottom: 50.0,
            margin_left: 50.0,
            margin_right: 50.0,
            line_height: 1.5,
            table_row_height: 20.0,
            code_block_padding: 8.0,
            max_image_height: 320.0,
        }
    }

    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            ..Self::a4()
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest `y` any emitted element may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.height - self.margin_bottom
    }

    pub fn usable_height(&self) -> f32 {
        self.bottom_limit() - self.margin_top
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Vertical cursor plus the pages produced so far. One per layout pass.
#[derive(Debug)]
pub struct PaginationContext {
    geometry: PageGeometry,
    pages: Vec<Page>,
    y: f32,
}

impl PaginationContext {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Page::new(1)],
            y: geometry.margin_top,
        }
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn page_index(&self) -> usize {
        self.pages.len() - 1
    }

    pub fn at_page_top(&self) -> bool {
        self.y <= self.geometry.margin_top + EPSILON
    }

    pub fn fits(&self, height: f32) -> bool {
        self.y + height <= self.geometry.bottom_limit() + EPSILON
    }

    /// Starts a new page when `height` does not fit below the cursor. A fresh
    /// page is never broken again, so oversized elements overflow in place.
    pub fn ensure(&mut self, height: f32) -> bool {
        if self.fits(height) || self.at_page_top() {
            return false;
        }
        self.new_page();
        true
    }

    pub fn new_page(&mut self) {
        let number = self.pages.len() + 1;
        log::debug!("page break at y={:.1}, starting page {}", self.y, number);
        self.pages.push(Page::new(number));
        self.y = self.geometry.margin_top;
    }

    pub fn advance(&mut self, height: f32) {
        self.y += height.max(0.0);
    }

    /// Vertical spacing; suppressed at the top of a page.
    pub fn gap(&mut self, height: f32) {
        if !self.at_page_top() {
            self.advance(height);
        }
    }

    pub fn page_mut(&mut self) -> &mut Page {
        let idx = self.page_index();
        &mut self.pages[idx]
    }

    pub fn page_at_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

/// Vertical extent a placed line occupies on one page.
#[derive(Debug, Clone, Copy)]
struct Placement {
    page: usize,
    top: f32,
    bottom: f32,
    baseline: f32,
}

/// Result of one layout pass.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    pub geometry: PageGeometry,
    pub background: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Lays out one document. Owns no state beyond the borrowed collaborators.
pub struct LayoutEngine<'a, T: TextMeasure> {
    theme: &'a Theme,
    geometry: PageGeometry,
    measure: &'a mut T,
    images: &'a mut dyn ImageLoader,
}

impl<'a, T: TextMeasure> LayoutEngine<'a, T> {
    pub fn new(
        theme: &'a Theme,
        geometry: PageGeometry,
        measure: &'a mut T,
        images: &'a mut dyn ImageLoader,
    ) -> Self {
        Self {
            theme,
            geometry,
            measure,
            images,
        }
    }

    pub fn layout(&mut self, title: &str, content: &str) -> Document {
        let mut ctx = PaginationContext::new(self.geometry);
        self.emit_title(&mut ctx, title);

        let blocks = block::classify(content);
        let mut iter = blocks.iter().peekable();
        while let Some(block) = iter.next() {
            if let Block::Blockquote { text } = block {
                // Adjacent quote lines share one side bar.
                let mut texts = vec![text.as_str()];
                while let Some(Block::Blockquote { text }) =
                    iter.next_if(|b| matches!(b, Block::Blockquote { .. }))
                {
                    texts.push(text.as_str());
                }
                self.emit_quote(&mut ctx, &texts);
                continue;
            }
            self.emit_block(&mut ctx, block);
            let list_continues = block.is_list_item() && iter.peek().is_some_and(|b| b.is_list_item());
            if block.is_list_item() && !list_continues {
                ctx.gap(self.theme.font_size_base * 0.4);
            }
        }

        let pages = ctx.into_pages();
        log::debug!(
            "laid out {} blocks on {} page(s)",
            blocks.len(),
            pages.len()
        );
        Document {
            title: title.to_string(),
            geometry: self.geometry,
            background: self.theme.background_color.clone(),
            pages,
        }
    }

    fn emit_block(&mut self, ctx: &mut PaginationContext, block: &Block) {
        let base = self.theme.font_size_base;
        match block {
            Block::Heading { level, text } => {
                ctx.gap(base * 0.8);
                let size = self.theme.heading_size(*level);
                let runs = inline::parse_inline(text);
                self.emit_flow(ctx, &runs, size, 0.0, TextRole::Heading, |run| FontFace {
                    bold: true,
                    ..FontFace::for_run(run)
                });
                ctx.gap(base * 0.3);
            }
            Block::Paragraph { text } => {
                let runs = inline::parse_inline(text);
                self.emit_flow(ctx, &runs, base, 0.0, TextRole::Body, FontFace::for_run);
                ctx.gap(base * 0.25);
            }
            Block::Blockquote { text } => self.emit_quote(ctx, &[text.as_str()]),
            Block::BulletItem { indent, text } => {
                self.emit_list_item(ctx, *indent, ListMarker::Bullet, text)
            }
            Block::OrderedItem {
                indent,
                number,
                text,
            } => self.emit_list_item(ctx, *indent, ListMarker::Number(number), text),
            Block::ChecklistItem {
                indent,
                checked,
                text,
            } => self.emit_list_item(ctx, *indent, ListMarker::Checkbox(*checked), text),
            Block::HorizontalRule => self.emit_rule(ctx),
            Block::CodeBlock { lines, .. } => self.emit_code_block(ctx, lines),
            Block::TableBlock { rows } => self.emit_table(ctx, rows),
            Block::ImageBlock { alt, url } => self.emit_image(ctx, alt, url),
            Block::Blank => ctx.gap(base * 0.6),
        }
    }

    fn emit_title(&mut self, ctx: &mut PaginationContext, title: &str) {
        let size = self.theme.font_size_title;
        if title.trim().is_empty() {
            ctx.advance(size * self.geometry.line_height);
        } else {
            let runs = vec![StyledRun::bold(title.trim())];
            self.emit_flow(ctx, &runs, size, 0.0, TextRole::Title, FontFace::for_run);
        }
        ctx.gap(self.theme.font_size_base);
    }

    /// Wraps `runs` into the content area shifted right by `indent` and
    /// places each line, breaking pages as needed.
    fn emit_flow<F>(
        &mut self,
        ctx: &mut PaginationContext,
        runs: &[StyledRun],
        font_size: f32,
        indent: f32,
        role: TextRole,
        resolve: F,
    ) -> Vec<Placement>
    where
        F: Fn(&StyledRun) -> FontFace,
    {
        let indent = indent.clamp(0.0, self.max_indent(font_size));
        let params = FlowParams {
            content_width: self.geometry.content_width() - indent,
            indent_x: self.geometry.margin_left + indent,
            font_size,
        };
        let lines = wrap::wrap_runs(runs, params, &mut *self.measure, resolve);
        self.place_lines(ctx, lines, font_size, role)
    }

    /// Deepest indent that still leaves room for a few characters of text
    /// inside the right margin.
    fn max_indent(&self, font_size: f32) -> f32 {
        (self.geometry.content_width() - font_size * 4.0).max(0.0)
    }

    fn place_lines(
        &mut self,
        ctx: &mut PaginationContext,
        lines: Vec<LayoutLine>,
        font_size: f32,
        role: TextRole,
    ) -> Vec<Placement> {
        let line_height = font_size * self.geometry.line_height;
        let mut placements = Vec::with_capacity(lines.len());

        for mut line in lines {
            ctx.ensure(line_height);
            let top = ctx.y();
            line.baseline_y = top + font_size;
            render::emit_line(ctx.page_mut(), &line, font_size, role, self.theme);
            ctx.advance(line_height);
            placements.push(Placement {
                page: ctx.page_index(),
                top,
                bottom: ctx.y(),
                baseline: line.baseline_y,
            });
        }
        placements
    }

    fn emit_quote(&mut self, ctx: &mut PaginationContext, texts: &[&str]) {
        let base = self.theme.font_size_base;
        let mut placements = Vec::new();
        for text in texts {
            let runs = inline::parse_inline(text);
            placements.extend(self.emit_flow(ctx, &runs, base, QUOTE_INDENT, TextRole::Quote, |run| {
                FontFace {
                    italic: true,
                    ..FontFace::for_run(run)
                }
            }));
        }

        let bar_x = self.geometry.margin_left + QUOTE_BAR_INSET;
        for (page, top, bottom) in page_spans(&placements) {
            if let Some(page) = ctx.page_at_mut(page) {
                render::emit_quote_bar(page, bar_x, top, bottom, self.theme);
            }
        }
        ctx.gap(base * 0.25);
    }

    fn emit_list_item(
        &mut self,
        ctx: &mut PaginationContext,
        indent: usize,
        marker: ListMarker<'_>,
        text: &str,
    ) {
        let base = self.theme.font_size_base;
        let nesting = indent as f32 * LIST_INDENT;
        let text_offset = match marker {
            ListMarker::Bullet => LIST_TEXT_OFFSET,
            ListMarker::Number(number) => {
                let label = format!("{}.", number);
                let (width, _) = self.measure.measure_text(&label, base, false, false, false, None);
                LIST_TEXT_OFFSET.max(width + 4.0)
            }
            ListMarker::Checkbox(_) => CHECKBOX_OFFSET,
        };

        let marker_offset = nesting.min((self.max_indent(base) - text_offset).max(0.0));
        let runs = inline::parse_inline(text);
        let placements = self.emit_flow(
            ctx,
            &runs,
            base,
            marker_offset + text_offset,
            TextRole::Body,
            FontFace::for_run,
        );

        let Some(first) = placements.first() else {
            return;
        };
        let marker_x = self.geometry.margin_left + marker_offset;
        let Some(page) = ctx.page_at_mut(first.page) else {
            return;
        };
        match marker {
            ListMarker::Bullet => {
                render::emit_marker(page, marker_x, first.baseline, "•", base, self.theme)
            }
            ListMarker::Number(number) => render::emit_marker(
                page,
                marker_x,
                first.baseline,
                &format!("{}.", number),
                base,
                self.theme,
            ),
            ListMarker::Checkbox(checked) => {
                let size = base * 0.85;
                render::emit_checkbox(page, marker_x, first.baseline, size, checked, self.theme)
            }
        }
    }

    fn emit_rule(&mut self, ctx: &mut PaginationContext) {
        let height = self.theme.font_size_base * 1.2;
        ctx.ensure(height);
        let y = ctx.y() + height / 2.0;
        let left = self.geometry.margin_left;
        let right = self.geometry.width - self.geometry.margin_right;
        render::emit_rule(ctx.page_mut(), left, right, y, self.theme);
        ctx.advance(height);
    }

    /// Places a block of `total` height as a unit: if it fits on a fresh
    /// page but not in the space left, break first.
    fn keep_together(&self, ctx: &mut PaginationContext, total: f32) {
        if !ctx.fits(total) && total <= self.geometry.usable_height() && !ctx.at_page_top() {
            ctx.new_page();
        }
    }

    fn emit_code_block(&mut self, ctx: &mut PaginationContext, lines: &[String]) {
        let size = self.theme.font_size_code;
        let pad = self.geometry.code_block_padding;
        let x = self.geometry.margin_left;
        let width = self.geometry.content_width();
        let inner_width = (width - pad * 2.0).max(size);
        let line_height = size * self.geometry.line_height;

        let mut visual: Vec<Vec<CodeToken>> = Vec::new();
        for line in lines {
            let tokens = highlight::highlight_line(line);
            visual.extend(wrap_code_tokens(tokens, inner_width, size, &mut *self.measure));
        }
        if visual.is_empty() {
            visual.push(Vec::new());
        }

        let total = pad * 2.0 + visual.len() as f32 * line_height;
        ctx.gap(size * 0.5);
        self.keep_together(ctx, total);
        ctx.ensure(pad + line_height);

        let mut fragment_top = ctx.y();
        let mut slot = ctx.page_mut().ops.len();
        ctx.advance(pad);

        for tokens in &visual {
            if !ctx.fits(line_height) && !ctx.at_page_top() {
                // Close the fragment on this page before breaking.
                let rect = [x, fragment_top, width, ctx.y() - fragment_top];
                render::emit_code_background(ctx.page_mut(), slot, rect, self.theme);
                ctx.new_page();
                fragment_top = ctx.y();
                slot = 0;
            }
            let baseline = ctx.y() + size;
            render::emit_code_line(
                ctx.page_mut(),
                x + pad,
                baseline,
                tokens,
                size,
                &mut *self.measure,
                self.theme,
            );
            ctx.advance(line_height);
        }

        ctx.advance(pad);
        let rect = [x, fragment_top, width, ctx.y() - fragment_top];
        render::emit_code_background(ctx.page_mut(), slot, rect, self.theme);
        ctx.gap(size * 0.5);
    }

    fn emit_table(&mut self, ctx: &mut PaginationContext, rows: &[Vec<String>]) {
        let has_header = rows.get(1).is_some_and(|row| block::is_separator_row(row));
        let data: Vec<&Vec<String>> = rows
            .iter()
            .filter(|row| !block::is_separator_row(row))
            .collect();
        if data.is_empty() {
            return;
        }

        let columns = data.iter().map(|row| row.len()).max().unwrap_or(1).max(1);
        let row_height = self.geometry.table_row_height;
        let table = TableLayout {
            x: self.geometry.margin_left,
            column_width: self.geometry.content_width() / columns as f32,
            row_height,
            font_size: self.theme.font_size_base * 0.9,
            cell_padding: CELL_PADDING,
        };

        let base = self.theme.font_size_base;
        ctx.gap(base * 0.5);
        self.keep_together(ctx, row_height * data.len() as f32);

        for (index, row) in data.iter().enumerate() {
            let cells = normalize_row(row, columns);
            ctx.ensure(row_height);
            let top = ctx.y();
            let header = has_header && index == 0;
            render::emit_table_row(
                ctx.page_mut(),
                &table,
                top,
                &cells,
                header,
                &mut *self.measure,
                self.theme,
            );
            ctx.advance(row_height);
        }
        ctx.gap(base * 0.5);
    }

    fn emit_image(&mut self, ctx: &mut PaginationContext, alt: &str, url: &str) {
        let base = self.theme.font_size_base;
        match self.images.load(url) {
            Ok(image) => {
                let max_height = self
                    .geometry
                    .max_image_height
                    .min(self.geometry.usable_height());
                let (width, height) = image.fit_within(self.geometry.content_width(), max_height);
                ctx.gap(base * 0.3);
                ctx.ensure(height);
                let x = self.geometry.margin_left + (self.geometry.content_width() - width) / 2.0;
                let rect = [x, ctx.y(), width, height];
                render::emit_image(ctx.page_mut(), rect, image.data_uri());
                ctx.advance(height);
                ctx.gap(base * 0.5);
            }
            Err(err) => {
                log::warn!("image '{}' replaced by placeholder: {}", url, err);
                let runs = [StyledRun::image_placeholder(alt)];
                self.emit_flow(ctx, &runs, base, 0.0, TextRole::Body, FontFace::for_run);
                ctx.gap(base * 0.25);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ListMarker<'a> {
    Bullet,
    Number(&'a str),
    Checkbox(bool),
}

/// Groups consecutive placements by page into `(page, top, bottom)` spans.
fn page_spans(placements: &[Placement]) -> Vec<(usize, f32, f32)> {
    let mut spans: Vec<(usize, f32, f32)> = Vec::new();
    for p in placements {
        match spans.last_mut() {
            Some(span) if span.0 == p.page => span.2 = p.bottom,
            _ => spans.push((p.page, p.top, p.bottom)),
        }
    }
    spans
}

/// Pads with empty cells or truncates to exactly `columns` cells.
fn normalize_row(row: &[String], columns: usize) -> Vec<String> {
    let mut cells: Vec<String> = row
        .iter()
        .take(columns)
        .map(|cell| {
            inline::parse_inline(cell)
                .into_iter()
                .map(|run| run.text)
                .collect()
        })
        .collect();
    cells.resize(columns, String::new());
    cells
}

/// Splits one highlighted source line into visual lines no wider than
/// `max_width`, breaking between characters. An empty line stays one empty
/// visual line.
fn wrap_code_tokens<T: TextMeasure>(
    tokens: Vec<CodeToken>,
    max_width: f32,
    font_size: f32,
    measure: &mut T,
) -> Vec<Vec<CodeToken>> {
    let mut lines: Vec<Vec<CodeToken>> = vec![Vec::new()];
    let mut width = 0.0;

    for token in tokens {
        for ch in token.text.chars() {
            let mut buf = [0u8; 4];
            let (ch_width, _) =
                measure.measure_text(ch.encode_utf8(&mut buf), font_size, true, false, false, None);
            let line_empty = lines.last().is_none_or(|l| l.is_empty());
            if width + ch_width > max_width && !line_empty {
                lines.push(Vec::new());
                width = 0.0;
            }
            let Some(line) = lines.last_mut() else {
                continue;
            };
            match line.last_mut() {
                Some(last) if last.kind == token.kind => last.text.push(ch),
                _ => line.push(CodeToken {
                    text: ch.to_string(),
                    kind: token.kind,
                }),
            }
            width += ch_width;
        }
    }
    lines
}

/// Lays out `content` under `title` into pages.
pub fn layout_document<T: TextMeasure>(
    title: &str,
    content: &str,
    theme: &Theme,
    geometry: PageGeometry,
    measure: &mut T,
    images: &mut dyn ImageLoader,
) -> Document {
    LayoutEngine::new(theme, geometry, measure, images).layout(title, content)
}
