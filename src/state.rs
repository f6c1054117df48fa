//! Explicit application state.
//!
//! Everything that influences how a diagram is rendered or exported lives in
//! [`AppState`] and is passed by reference to the pipeline and the exporter.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::i18n::Lang;

/// Seed used for hand-drawn strokes unless the user asks for random ones.
pub const DEFAULT_SEED: u32 = 42;
/// Exclusive upper bound for random seeds.
pub const SEED_RANGE: u32 = 10_000;

/// Font stack appended after the hand-drawn preset so CJK text still looks
/// handwritten.
const HAND_FALLBACK: &str = "'LXGW WenKai TC', 'KaiTi', 'STKaiti', cursive";
/// Font stack for the classic look.
pub const NORMAL_FONT: &str = "system-ui, -apple-system, sans-serif";
/// Font size for the classic look.
pub const NORMAL_FONT_SIZE_PX: f32 = 14.0;

#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
    Base,
}

impl ThemeName {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::Default),
            "dark" => Some(Self::Dark),
            "forest" => Some(Self::Forest),
            "neutral" => Some(Self::Neutral),
            "base" => Some(Self::Base),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Neutral => "neutral",
            Self::Base => "base",
        }
    }
}

/// Rendering look requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Look {
    Classic,
    HandDrawn,
}

/// Hand-drawn font presets.
#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HandFont {
    #[default]
    Virgil,
    Caveat,
    Kalam,
}

impl HandFont {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "virgil" => Some(Self::Virgil),
            "caveat" => Some(Self::Caveat),
            "kalam" => Some(Self::Kalam),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Virgil => "virgil",
            Self::Caveat => "caveat",
            Self::Kalam => "kalam",
        }
    }

    /// CSS family name of the preset.
    pub const fn family(self) -> &'static str {
        match self {
            Self::Virgil => "Virgil",
            Self::Caveat => "Caveat",
            Self::Kalam => "Kalam",
        }
    }

    /// Where the font file can be downloaded for embedding, if anywhere.
    pub const fn download_url(self) -> Option<&'static str> {
        match self {
            Self::Virgil => Some("https://cdn.jsdelivr.net/gh/excalidraw/virgil/Virgil.woff2"),
            Self::Caveat | Self::Kalam => None,
        }
    }

    /// Full font stack for the hand-drawn look.
    pub fn font_stack(self) -> String {
        format!("'{}', {HAND_FALLBACK}", self.family())
    }
}

#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl FontSize {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    pub const fn px(self) -> f32 {
        match self {
            Self::Small => 15.0,
            Self::Medium => 17.0,
            Self::Large => 20.0,
        }
    }
}

#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SeedMode {
    #[default]
    Fixed,
    Random,
}

impl SeedMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "random" => Some(Self::Random),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
        }
    }
}

/// Preview surface background; also decides the export background.
#[derive(
    clap::ValueEnum, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PreviewBackground {
    #[default]
    White,
    Black,
    Checker,
    Grid,
}

impl PreviewBackground {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Some(Self::White),
            "black" => Some(Self::Black),
            "checker" => Some(Self::Checker),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Checker => "checker",
            Self::Grid => "grid",
        }
    }

    /// CSS color used when exporting with this preview background.
    pub const fn export_color(self) -> &'static str {
        match self {
            Self::Black => "#1a1a1a",
            Self::Checker => "transparent",
            Self::White | Self::Grid => "#ffffff",
        }
    }
}

/// Style inputs for one render, snapshotted from [`AppState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderStyle {
    pub theme: ThemeName,
    pub look: Look,
    pub hand_font: HandFont,
    pub font_size: FontSize,
    pub seed: u32,
}

impl RenderStyle {
    pub const fn is_hand_drawn(&self) -> bool {
        matches!(self.look, Look::HandDrawn)
    }

    pub fn font_family(&self) -> String {
        match self.look {
            Look::HandDrawn => self.hand_font.font_stack(),
            Look::Classic => NORMAL_FONT.to_string(),
        }
    }

    pub const fn font_size_px(&self) -> f32 {
        match self.look {
            Look::HandDrawn => self.font_size.px(),
            Look::Classic => NORMAL_FONT_SIZE_PX,
        }
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        AppState::default().snapshot_style()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub theme: ThemeName,
    pub hand_drawn: bool,
    pub hand_font: HandFont,
    pub font_size: FontSize,
    pub seed_mode: SeedMode,
    pub seed: u32,
    pub background: PreviewBackground,
    pub lang: Lang,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            theme: ThemeName::Default,
            hand_drawn: true,
            hand_font: HandFont::Virgil,
            font_size: FontSize::Medium,
            seed_mode: SeedMode::Fixed,
            seed: DEFAULT_SEED,
            background: PreviewBackground::White,
            lang: Lang::En,
        }
    }
}

impl AppState {
    pub const fn look(&self) -> Look {
        if self.hand_drawn {
            Look::HandDrawn
        } else {
            Look::Classic
        }
    }

    /// Style for the next render. Random seed mode draws a fresh seed.
    pub fn render_style(&mut self) -> RenderStyle {
        if self.seed_mode == SeedMode::Random {
            self.reshuffle_seed();
        }
        self.snapshot_style()
    }

    /// Style for the current state without touching the seed.
    pub fn snapshot_style(&self) -> RenderStyle {
        RenderStyle {
            theme: self.theme,
            look: self.look(),
            hand_font: self.hand_font,
            font_size: self.font_size,
            seed: self.seed,
        }
    }

    pub fn reshuffle_seed(&mut self) -> u32 {
        self.seed = rand::rng().random_range(0..SEED_RANGE);
        self.seed
    }

    pub fn toggle_hand_drawn(&mut self) {
        self.hand_drawn = !self.hand_drawn;
    }
}
