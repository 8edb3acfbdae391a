use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const GITHUB_LIGHT_BACKGROUND: &str = "#ffffff";
const GITHUB_LIGHT_TEXT: &str = "#24292f";
const GITHUB_LIGHT_HEADING: &str = "#1b1f23";
const GITHUB_LIGHT_LINK: &str = "#0969da";
const GITHUB_LIGHT_CODE_BG: &str = "#f6f8fa";
const GITHUB_LIGHT_CODE_TEXT: &str = "#24292f";
const GITHUB_LIGHT_MUTED: &str = "#6e7781";
const GITHUB_LIGHT_RULE: &str = "#d0d7de";
const GITHUB_LIGHT_KEYWORD: &str = "#cf222e";
const GITHUB_LIGHT_STRING: &str = "#0a3069";
const GITHUB_LIGHT_COMMENT: &str = "#6e7781";
const GITHUB_LIGHT_NUMBER: &str = "#0550ae";

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("github_light", include_str!("../themes/github_light.toml")),
    ("gruvbox_light", include_str!("../themes/gruvbox_light.toml")),
    ("nord", include_str!("../themes/nord.toml")),
    ("solarized_light", include_str!("../themes/solarized_light.toml")),
];

const FONT_SIZE_TITLE: f32 = 22.0;
const FONT_SIZE_BASE: f32 = 11.0;
const FONT_SIZE_CODE: f32 = 9.5;

/// Colors and type sizes used by the emitter and the page serializer.
///
/// Every field has a serde default so a partial theme file only needs the
/// keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default = "default_text")]
    pub text_color: String,
    #[serde(default = "default_heading")]
    pub heading_color: String,
    #[serde(default = "default_link")]
    pub link_color: String,
    #[serde(default = "default_code_bg")]
    pub code_bg_color: String,
    #[serde(default = "default_code_text")]
    pub code_text_color: String,
    #[serde(default = "default_rule")]
    pub quote_border_color: String,
    #[serde(default = "default_muted")]
    pub quote_text_color: String,
    #[serde(default = "default_muted")]
    pub muted_color: String,
    #[serde(default = "default_rule")]
    pub table_border_color: String,
    #[serde(default = "default_code_bg")]
    pub table_header_bg_color: String,
    #[serde(default = "default_link")]
    pub checkbox_color: String,

    #[serde(default)]
    pub syntax: SyntaxColors,

    #[serde(default = "default_font_size_title")]
    pub font_size_title: f32,
    #[serde(default = "default_font_size_base")]
    pub font_size_base: f32,
    #[serde(default = "default_font_size_code")]
    pub font_size_code: f32,
}

/// Foreground colors for the highlighter's token categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxColors {
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_string")]
    pub string: String,
    #[serde(default = "default_comment")]
    pub comment: String,
    #[serde(default = "default_number")]
    pub number: String,
}

impl Default for SyntaxColors {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            string: default_string(),
            comment: default_comment(),
            number: default_number(),
        }
    }
}

fn default_background() -> String {
    GITHUB_LIGHT_BACKGROUND.to_string()
}
fn default_text() -> String {
    GITHUB_LIGHT_TEXT.to_string()
}
fn default_heading() -> String {
    GITHUB_LIGHT_HEADING.to_string()
}
fn default_link() -> String {
    GITHUB_LIGHT_LINK.to_string()
}
fn default_code_bg() -> String {
    GITHUB_LIGHT_CODE_BG.to_string()
}
fn default_code_text() -> String {
    GITHUB_LIGHT_CODE_TEXT.to_string()
}
fn default_rule() -> String {
    GITHUB_LIGHT_RULE.to_string()
}
fn default_muted() -> String {
    GITHUB_LIGHT_MUTED.to_string()
}
fn default_keyword() -> String {
    GITHUB_LIGHT_KEYWORD.to_string()
}
fn default_string() -> String {
    GITHUB_LIGHT_STRING.to_string()
}
fn default_comment() -> String {
    GITHUB_LIGHT_COMMENT.to_string()
}
fn default_number() -> String {
    GITHUB_LIGHT_NUMBER.to_string()
}
fn default_font_size_title() -> f32 {
    FONT_SIZE_TITLE
}
fn default_font_size_base() -> f32 {
    FONT_SIZE_BASE
}
fn default_font_size_code() -> f32 {
    FONT_SIZE_CODE
}

impl Default for Theme {
    fn default() -> Self {
        Self::github_light()
    }
}

#[derive(Debug, Deserialize)]
struct AlacrittyColors {
    primary: AlacrittyPrimary,
    normal: AlacrittyNormal,
}

#[derive(Debug, Deserialize)]
struct AlacrittyPrimary {
    background: String,
    foreground: String,
}

#[derive(Debug, Deserialize)]
struct AlacrittyNormal {
    black: String,
    blue: String,
    cyan: String,
    white: String,
    red: Option<String>,
    green: Option<String>,
    yellow: Option<String>,
    magenta: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlacrittyTheme {
    colors: AlacrittyColors,
}

impl Theme {
    pub fn github_light() -> Self {
        Theme {
            background_color: GITHUB_LIGHT_BACKGROUND.to_string(),
            text_color: GITHUB_LIGHT_TEXT.to_string(),
            heading_color: GITHUB_LIGHT_HEADING.to_string(),
            link_color: GITHUB_LIGHT_LINK.to_string(),
            code_bg_color: GITHUB_LIGHT_CODE_BG.to_string(),
            code_text_color: GITHUB_LIGHT_CODE_TEXT.to_string(),
            quote_border_color: GITHUB_LIGHT_RULE.to_string(),
            quote_text_color: GITHUB_LIGHT_MUTED.to_string(),
            muted_color: GITHUB_LIGHT_MUTED.to_string(),
            table_border_color: GITHUB_LIGHT_RULE.to_string(),
            table_header_bg_color: GITHUB_LIGHT_CODE_BG.to_string(),
            checkbox_color: GITHUB_LIGHT_LINK.to_string(),
            syntax: SyntaxColors::default(),

            font_size_title: FONT_SIZE_TITLE,
            font_size_base: FONT_SIZE_BASE,
            font_size_code: FONT_SIZE_CODE,
        }
    }

    /// Font size for a heading level; levels outside 1..=4 fall back to body size.
    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.font_size_base * 1.8,
            2 => self.font_size_base * 1.5,
            3 => self.font_size_base * 1.3,
            4 => self.font_size_base * 1.15,
            _ => self.font_size_base,
        }
    }

    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                Error::Theme(format!(
                    "Unknown built-in theme '{}'. Available: {}",
                    name,
                    Self::list_builtins().join(", ")
                ))
            })?;
        Self::from_file_content(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    /// Parses a theme file: Alacritty TOML, then Alacritty YAML, then a
    /// native notepress TOML theme.
    pub fn from_file_content(content: &str) -> Result<Self> {
        if let Ok(theme) = Self::from_alacritty_toml(content) {
            return Ok(theme);
        }
        if let Ok(theme) = Self::from_alacritty_yaml(content) {
            return Ok(theme);
        }
        toml::from_str(content).map_err(|_| {
            Error::Theme("Failed to parse theme file as Alacritty TOML/YAML or notepress TOML".into())
        })
    }

    pub fn from_alacritty_yaml(content: &str) -> Result<Self> {
        let alacritty: AlacrittyTheme = serde_yaml::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse Alacritty YAML: {}", e)))?;

        Ok(Self::from_alacritty_theme(alacritty))
    }

    pub fn from_alacritty_toml(content: &str) -> Result<Self> {
        let alacritty: AlacrittyTheme = toml::from_str(content)
            .map_err(|e| Error::Theme(format!("Failed to parse Alacritty TOML: {}", e)))?;

        Ok(Self::from_alacritty_theme(alacritty))
    }

    fn from_alacritty_theme(alacritty: AlacrittyTheme) -> Self {
        let colors = alacritty.colors;
        let normal = colors.normal;

        let syntax = SyntaxColors {
            keyword: normal.magenta.unwrap_or_else(default_keyword),
            string: normal.green.unwrap_or_else(default_string),
            comment: normal.white.clone(),
            number: normal
                .yellow
                .or(normal.red)
                .unwrap_or_else(default_number),
        };

        Theme {
            background_color: colors.primary.background,
            text_color: colors.primary.foreground.clone(),
            heading_color: normal.blue.clone(),
            link_color: normal.cyan,
            code_bg_color: normal.black.clone(),
            code_text_color: colors.primary.foreground,
            quote_border_color: normal.white.clone(),
            quote_text_color: normal.white.clone(),
            muted_color: normal.white.clone(),
            table_border_color: normal.white,
            table_header_bg_color: normal.black,
            checkbox_color: normal.blue,
            syntax,

            font_size_title: FONT_SIZE_TITLE,
            font_size_base: FONT_SIZE_BASE,
            font_size_code: FONT_SIZE_CODE,
        }
    }
}
