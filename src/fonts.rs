use std::collections::HashMap;
use std::path::Path;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    font_size_bits: u32,
    is_code: bool,
    is_bold: bool,
    is_italic: bool,
    max_width_bits: Option<u32>,
}

/// Measures rendered text extents in page units.
///
/// Returns `(width, height)`. Implementations must be deterministic for a
/// given input, the flow engine relies on repeated measurements agreeing.
pub trait TextMeasure {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_code: bool,
        is_bold: bool,
        is_italic: bool,
        max_width: Option<f32>,
    ) -> (f32, f32);
}

/// Glyph-accurate measurement backed by cosmic-text and the system fonts.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: HashMap<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        let mut font_system = FontSystem::new();
        let local_fonts = Path::new("fonts");
        if local_fonts.is_dir() {
            font_system.db_mut().load_fonts_dir(local_fonts);
        }
        log::debug!("font system loaded {} faces", font_system.db().len());

        Self {
            font_system,
            cache: HashMap::new(),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_code: bool,
        is_bold: bool,
        is_italic: bool,
        max_width: Option<f32>,
    ) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            font_size_bits: font_size.to_bits(),
            is_code,
            is_bold,
            is_italic,
            max_width_bits: max_width.map(f32::to_bits),
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font_size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size,
                line_height,
            },
        );

        buffer.set_size(&mut self.font_system, max_width, None);

        let attrs = Attrs::new()
            .family(if is_code {
                Family::Monospace
            } else {
                Family::SansSerif
            })
            .weight(if is_bold {
                Weight::BOLD
            } else {
                Weight::NORMAL
            })
            .style(if is_italic {
                Style::Italic
            } else {
                Style::Normal
            });

        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;

        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        let measured = (total_width, total_height);
        self.cache.insert(key, measured);
        measured
    }
}

/// Font-free width estimate from per-character advance classes.
///
/// Used when no fonts are available and by the test suite, where exact
/// glyph metrics would make layout assertions host-dependent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl ApproxMeasure {
    fn advance(ch: char, is_code: bool) -> f32 {
        if is_code {
            return 0.6;
        }
        match ch {
            ' ' => 0.28,
            'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.28,
            'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.36,
            'm' | 'w' | 'M' | 'W' | '@' => 0.82,
            c if c.is_ascii_uppercase() => 0.66,
            c if c.is_ascii() => 0.52,
            _ => 0.9,
        }
    }
}

impl TextMeasure for ApproxMeasure {
    fn measure_text(
        &mut self,
        text: &str,
        font_size: f32,
        is_code: bool,
        is_bold: bool,
        _is_italic: bool,
        _max_width: Option<f32>,
    ) -> (f32, f32) {
        let weight = if is_bold && !is_code { 1.06 } else { 1.0 };
        let width: f32 = text
            .chars()
            .map(|ch| Self::advance(ch, is_code) * font_size * weight)
            .sum();
        (width, font_size * 1.2)
    }
}

/// Family names chosen as generic-family fallbacks for a font database.
#[derive(Debug, Default)]
pub(crate) struct FallbackFamilies {
    pub sans: Option<String>,
    pub serif: Option<String>,
    pub mono: Option<String>,
}

/// Picks sans, serif and monospace families by name from the faces found,
/// falling back to the first family seen.
pub(crate) fn pick_fallback_families<'a>(
    families: impl Iterator<Item = &'a str>,
) -> FallbackFamilies {
    let mut sans_family: Option<String> = None;
    let mut serif_family: Option<String> = None;
    let mut mono_family: Option<String> = None;
    let mut first_family: Option<String> = None;

    for family in families {
        if first_family.is_none() {
            first_family = Some(family.to_string());
        }

        let lower = family.to_ascii_lowercase();
        if sans_family.is_none() && lower.contains("sans") {
            sans_family = Some(family.to_string());
        }
        if serif_family.is_none() && lower.contains("serif") && !lower.contains("sans") {
            serif_family = Some(family.to_string());
        }
        if mono_family.is_none() && (lower.contains("mono") || lower.contains("code")) {
            mono_family = Some(family.to_string());
        }
    }

    FallbackFamilies {
        mono: mono_family
            .clone()
            .or_else(|| sans_family.clone())
            .or_else(|| first_family.clone()),
        serif: serif_family.or_else(|| first_family.clone()),
        sans: sans_family.or(first_family),
    }
}
