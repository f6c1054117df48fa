use std::path::PathBuf;

use crate::app::Message;
use crate::export::ExportFormat;
use crate::i18n::Lang;
use crate::state::{FontSize, HandFont, PreviewBackground, SeedMode, ThemeName};

/// Step used by `left`/`right`/`up`/`down` pan commands, in screen pixels.
const PAN_STEP: f64 = 40.0;

pub(super) const HELP: &str = "\
commands:
  r, render                 render now
  f, format                 reindent and save the source
  hand                      toggle hand-drawn / classic look
  theme NAME                default | neutral | dark | forest | base
  font NAME                 virgil | caveat | kalam
  size NAME                 small | medium | large
  seed [fixed|random]       reshuffle the sketch seed, or set the seed mode
  bg NAME                   white | black | checker | grid
  lang CODE                 en | zh
  + / - / 0                 zoom in, zoom out, reset view
  pan DX DY | left|right|up|down
  svg [PATH], png [PATH]    export to the clipboard or to PATH
  link | embed | prompt     copy a share link, embed code or AI prompt
  jump | dismiss            go to the error line, hide the error panel
  q, quit";

impl Message {
    /// Parse one line typed on stdin into a message.
    ///
    /// Returns `None` for blank lines and unknown commands.
    pub fn parse_command(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = words.next()?.to_ascii_lowercase();
        let arg = words.next();
        let msg = match command.as_str() {
            "r" | "render" => Self::RenderNow,
            "f" | "fmt" | "format" => Self::Format,
            "hand" | "look" => Self::ToggleHandDrawn,
            "theme" => Self::SetTheme(ThemeName::parse(arg?)?),
            "font" => Self::SetHandFont(HandFont::parse(arg?)?),
            "size" => Self::SetFontSize(FontSize::parse(arg?)?),
            "seed" => match arg {
                None => Self::ReshuffleSeed,
                Some(mode) => Self::SetSeedMode(SeedMode::parse(mode)?),
            },
            "bg" | "background" => Self::SetBackground(PreviewBackground::parse(arg?)?),
            "lang" => Self::SetLang(Lang::parse(arg?)?),
            "+" | "zoom-in" => Self::ZoomIn,
            "-" | "zoom-out" => Self::ZoomOut,
            "0" | "reset" => Self::ZoomReset,
            "pan" => {
                let dx = arg?.parse().ok()?;
                let dy = words.next()?.parse().ok()?;
                Self::Pan(dx, dy)
            }
            "left" => Self::Pan(-PAN_STEP, 0.0),
            "right" => Self::Pan(PAN_STEP, 0.0),
            "up" => Self::Pan(0.0, -PAN_STEP),
            "down" => Self::Pan(0.0, PAN_STEP),
            "svg" => Self::Export(ExportFormat::Svg, arg.map(PathBuf::from)),
            "png" => Self::Export(ExportFormat::Png, arg.map(PathBuf::from)),
            "link" | "share" => Self::CopyShareLink,
            "embed" => Self::CopyEmbed,
            "prompt" | "ai" => Self::CopyAiPrompt,
            "jump" => Self::JumpToError,
            "dismiss" => Self::DismissError,
            "?" | "h" | "help" => Self::ShowHelp,
            "q" | "quit" | "exit" => Self::Quit,
            _ => return None,
        };
        Some(msg)
    }
}
