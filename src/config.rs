use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::i18n::Lang;
use crate::state::{AppState, FontSize, HandFont, Look, PreviewBackground, SeedMode, ThemeName};

/// Flags that can be saved as defaults.
///
/// Switches merge with OR, options with "later wins".
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub perf: bool,
    pub random_seed: bool,
    pub theme: Option<ThemeName>,
    pub look: Option<Look>,
    pub hand_font: Option<HandFont>,
    pub font_size: Option<FontSize>,
    pub seed: Option<u32>,
    pub scale: Option<f32>,
    pub background: Option<PreviewBackground>,
    pub lang: Option<Lang>,
    pub base_url: Option<String>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    pub fn union(&self, other: &Self) -> Self {
        Self {
            perf: self.perf || other.perf,
            random_seed: self.random_seed || other.random_seed,
            theme: other.theme.or(self.theme),
            look: other.look.or(self.look),
            hand_font: other.hand_font.or(self.hand_font),
            font_size: other.font_size.or(self.font_size),
            seed: other.seed.or(self.seed),
            scale: other.scale.or(self.scale),
            background: other.background.or(self.background),
            lang: other.lang.or(self.lang),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    /// Overlay the flags that were given onto `state`.
    pub fn apply_to(&self, state: &mut AppState) {
        if let Some(theme) = self.theme {
            state.theme = theme;
        }
        if let Some(look) = self.look {
            state.hand_drawn = look == Look::HandDrawn;
        }
        if let Some(font) = self.hand_font {
            state.hand_font = font;
        }
        if let Some(size) = self.font_size {
            state.font_size = size;
        }
        if let Some(seed) = self.seed {
            state.seed = seed;
            state.seed_mode = SeedMode::Fixed;
        }
        if self.random_seed {
            state.seed_mode = SeedMode::Random;
        }
        if let Some(background) = self.background {
            state.background = background;
        }
        if let Some(lang) = self.lang {
            state.lang = lang;
        }
    }
}

fn app_dir_config(base: PathBuf) -> PathBuf {
    base.join("mermaidpad").join("config")
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return app_dir_config(PathBuf::from(appdata));
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return app_dir_config(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support"),
            );
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return app_dir_config(PathBuf::from(xdg));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return app_dir_config(PathBuf::from(home).join(".config"));
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".mermaidpadrc")
}

/// Load flags from a file; a missing file yields no flags.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// Global flags overlaid with the local override file.
///
/// # Errors
///
/// Returns an error if either file exists but cannot be read.
pub fn load_effective_flags() -> Result<ConfigFlags> {
    let global = load_config_flags(&global_config_path())?;
    let local = load_config_flags(&local_override_path())?;
    Ok(global.union(&local))
}

/// Write `flags` as defaults, one per line.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# mermaidpad defaults (saved with --save)".to_string()];
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    match flags.look {
        Some(Look::HandDrawn) => lines.push("--hand-drawn".to_string()),
        Some(Look::Classic) => lines.push("--classic".to_string()),
        None => {}
    }
    if let Some(font) = flags.hand_font {
        lines.push(format!("--hand-font {}", font.as_str()));
    }
    if let Some(size) = flags.font_size {
        lines.push(format!("--font-size {}", size.as_str()));
    }
    if let Some(seed) = flags.seed {
        lines.push(format!("--seed {seed}"));
    }
    if flags.random_seed {
        lines.push("--random-seed".to_string());
    }
    if let Some(scale) = flags.scale {
        lines.push(format!("--scale {scale}"));
    }
    if let Some(background) = flags.background {
        lines.push(format!("--background {}", background.as_str()));
    }
    if let Some(lang) = flags.lang {
        lines.push(format!("--lang {}", lang.code()));
    }
    if let Some(url) = &flags.base_url {
        lines.push(format!("--base-url {url}"));
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove saved defaults; a missing file is fine.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Value of an option given as `--name value` or `--name=value`.
///
/// Advances `i` past a separate value token.
fn option_value<'a>(tokens: &'a [String], i: &mut usize, name: &str) -> Option<&'a str> {
    let token = tokens.get(*i)?;
    let rest = token.strip_prefix(name)?;
    if rest.is_empty() {
        let value = tokens.get(*i + 1)?;
        *i += 1;
        return Some(value);
    }
    rest.strip_prefix('=')
}

fn parsed<T>(value: &str, flag: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let result = parse(value);
    if result.is_none() {
        tracing::warn!(flag, value, "ignoring invalid config value");
    }
    result
}

/// Pick known flags out of a token list; anything else is ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "--perf" => flags.perf = true,
            "--random-seed" => flags.random_seed = true,
            "--hand-drawn" => flags.look = Some(Look::HandDrawn),
            "--classic" => flags.look = Some(Look::Classic),
            _ => {
                if let Some(v) = option_value(tokens, &mut i, "--theme") {
                    flags.theme = parsed(v, "--theme", ThemeName::parse).or(flags.theme);
                } else if let Some(v) = option_value(tokens, &mut i, "--hand-font") {
                    flags.hand_font = parsed(v, "--hand-font", HandFont::parse).or(flags.hand_font);
                } else if let Some(v) = option_value(tokens, &mut i, "--font-size") {
                    flags.font_size = parsed(v, "--font-size", FontSize::parse).or(flags.font_size);
                } else if let Some(v) = option_value(tokens, &mut i, "--seed") {
                    flags.seed = parsed(v, "--seed", |s| s.parse().ok()).or(flags.seed);
                } else if let Some(v) = option_value(tokens, &mut i, "--scale") {
                    flags.scale = parsed(v, "--scale", parse_scale).or(flags.scale);
                } else if let Some(v) = option_value(tokens, &mut i, "--background") {
                    flags.background =
                        parsed(v, "--background", PreviewBackground::parse).or(flags.background);
                } else if let Some(v) = option_value(tokens, &mut i, "--lang") {
                    flags.lang = parsed(v, "--lang", Lang::parse).or(flags.lang);
                } else if let Some(v) = option_value(tokens, &mut i, "--base-url") {
                    flags.base_url = Some(v.to_string());
                } else if let Some(v) = option_value(tokens, &mut i, "--render-debug-log") {
                    flags.render_debug_log = Some(PathBuf::from(v));
                }
            }
        }
        i += 1;
    }
    flags
}

fn parse_scale(s: &str) -> Option<f32> {
    s.parse::<f32>().ok().filter(|v| v.is_finite() && *v > 0.0)
}
