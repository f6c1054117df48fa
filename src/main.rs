//! mermaidpad - live editor and exporter for Mermaid diagrams.
//!
//! # Usage
//!
//! ```bash
//! mermaidpad watch flow.mmd -o flow.svg
//! mermaidpad render flow.mmd -o flow.png --scale 2
//! mermaidpad share flow.mmd --embed
//! mermaidpad open 'https://example.com/#eNpLL0...' -o flow.mmd
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use mermaidpad::app::App;
use mermaidpad::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    save_config_flags,
};
use mermaidpad::editor::EditorBuffer;
use mermaidpad::embed::EmbedView;
use mermaidpad::engine::MermaidEngine;
use mermaidpad::export::fonts::FontCache;
use mermaidpad::export::{Background, Destination, ExportFormat, ExportJob, Exporter};
use mermaidpad::format::{DiagramType, format_source};
use mermaidpad::i18n::Lang;
use mermaidpad::notice::NoticeLevel;
use mermaidpad::perf;
use mermaidpad::pipeline::RenderPipeline;
use mermaidpad::preview::{Preview, PreviewContent};
use mermaidpad::samples;
use mermaidpad::share::link;
use mermaidpad::state::{AppState, FontSize, HandFont, Look, PreviewBackground, ThemeName};

/// Live editor and exporter for Mermaid diagrams
#[derive(Parser, Debug)]
#[command(name = "mermaidpad", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    defaults: DefaultFlags,
}

/// Flags that can be saved as defaults with `--save`.
#[derive(Args, Debug)]
struct DefaultFlags {
    /// Diagram theme
    #[arg(long, global = true, value_enum)]
    theme: Option<ThemeName>,

    /// Sketchy hand-drawn look (default)
    #[arg(long, global = true, conflicts_with = "classic")]
    hand_drawn: bool,

    /// Plain look
    #[arg(long, global = true)]
    classic: bool,

    /// Font preset for the hand-drawn look
    #[arg(long, global = true, value_enum)]
    hand_font: Option<HandFont>,

    /// Font size for the hand-drawn look
    #[arg(long, global = true, value_enum)]
    font_size: Option<FontSize>,

    /// Fixed sketch seed
    #[arg(long, global = true, value_name = "N")]
    seed: Option<u32>,

    /// Draw a new sketch seed for every render
    #[arg(long, global = true)]
    random_seed: bool,

    /// PNG export scale
    #[arg(long, global = true, value_name = "FACTOR", value_parser = parse_scale)]
    scale: Option<f32>,

    /// Preview background; also decides the export background
    #[arg(long, global = true, value_enum)]
    background: Option<PreviewBackground>,

    /// Interface language
    #[arg(long, global = true, value_enum)]
    lang: Option<Lang>,

    /// Page the share links point at
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Enable performance logging
    #[arg(long, global = true)]
    perf: bool,

    /// Write detailed render/export debug events to a file
    #[arg(long, global = true, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save the flags on this command line as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

impl DefaultFlags {
    /// The style and session flags given on this command line.
    fn to_config_flags(&self) -> ConfigFlags {
        let look = if self.classic {
            Some(Look::Classic)
        } else if self.hand_drawn {
            Some(Look::HandDrawn)
        } else {
            None
        };
        ConfigFlags {
            perf: self.perf,
            random_seed: self.random_seed,
            theme: self.theme,
            look,
            hand_font: self.hand_font,
            font_size: self.font_size,
            seed: self.seed,
            scale: self.scale,
            background: self.background,
            lang: self.lang,
            base_url: self.base_url.clone(),
            render_debug_log: self.render_debug_log.clone(),
        }
    }
}

fn parse_scale(value: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .ok()
        .filter(|scale| scale.is_finite() && *scale > 0.0)
        .ok_or_else(|| format!("expected a positive number, got `{value}`"))
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reindent a diagram source file
    Format {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Rewrite the file instead of printing the result
        #[arg(short, long)]
        write: bool,
        /// Exit with an error if the file is not formatted
        #[arg(long, conflicts_with = "write")]
        check: bool,
    },
    /// Validate a diagram and report errors with their line
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print a JSON report on stdout instead
        #[arg(long)]
        json: bool,
    },
    /// Render a diagram to SVG or PNG
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file; the clipboard when omitted
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        /// Output format; guessed from the output extension when omitted
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// PNG background as a CSS color or `transparent`
        #[arg(long, value_name = "COLOR")]
        fill: Option<String>,
    },
    /// Edit interactively: re-render on file changes and typed commands
    Watch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Re-export here after every successful render
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// Do not watch the file for external changes
        #[arg(long)]
        no_watch: bool,
    },
    /// Print a share link for a diagram
    Share {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print iframe embed code instead
        #[arg(long, conflicts_with = "ai_prompt")]
        embed: bool,
        /// Print instructions for AI assistants instead
        #[arg(long)]
        ai_prompt: bool,
        /// Also copy the result to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Recover the diagram source from a share link or token
    Open {
        #[arg(value_name = "LINK")]
        link: String,
        /// Write the source here instead of printing it
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Render a share link as a standalone HTML page
    Embed {
        #[arg(value_name = "LINK")]
        link: String,
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// List the built-in examples, or print one
    Examples {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = cli.defaults.to_config_flags();

    if cli.defaults.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.defaults.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.defaults.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = perf::debug_log_path(effective.render_debug_log.as_deref());
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        eprintln!(
            "[warn] Failed to initialize render debug log {}: {}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            err
        );
    }

    let mut state = AppState {
        lang: Lang::from_env(),
        ..AppState::default()
    };
    effective.apply_to(&mut state);
    let base_url = link::base_url(effective.base_url.as_deref()).context("Invalid --base-url")?;
    let scale = effective.scale.unwrap_or(mermaidpad::export::raster::DEFAULT_SCALE);

    match cli.command {
        Command::Format { file, write, check } => run_format(&file, write, check),
        Command::Check { file, json } => run_check(&file, &state, json),
        Command::Render {
            file,
            output,
            format,
            fill,
        } => {
            let format = format.unwrap_or_else(|| format_for(output.as_deref()));
            let background = match fill.as_deref() {
                Some(color) => Background::parse(color)
                    .with_context(|| format!("Invalid fill color: {color}"))?,
                None => Background::for_preview(state.background),
            };
            run_render(&file, output, format, background, scale, &mut state)
        }
        Command::Watch {
            file,
            output,
            format,
            no_watch,
        } => {
            let format = format.unwrap_or_else(|| format_for(output.as_deref()));
            let fonts = Arc::new(FontCache::http());
            let mut app = App::new(file, Arc::new(MermaidEngine), fonts)
                .with_state(state)
                .with_base_url(base_url)
                .with_output(output, format)
                .with_scale(scale)
                .with_watch(!no_watch);
            app.run().context("Session error")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Share {
            file,
            embed,
            ai_prompt,
            copy,
        } => {
            let source = read_source(&file)?;
            let strings = state.lang.strings();
            let (text, done) = if embed {
                let url = link::embed_url(&base_url, &source).context("Invalid --base-url")?;
                (link::embed_snippet(&url), strings.embed_copied)
            } else if ai_prompt {
                (link::ai_prompt(&base_url, &source), strings.ai_prompt_copied)
            } else {
                (link::share_url(&base_url, &source).to_string(), strings.link_copied)
            };
            println!("{text}");
            if copy {
                let mut exporter = Exporter::new(Arc::new(FontCache::http()));
                return Ok(report_notice(&exporter.copy_text(&text, done, &state)));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Open { link: input, output } => {
            let source = link::source_from_link(&input).context("Link carries no diagram")?;
            match output {
                Some(path) => std::fs::write(&path, &source)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{source}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Embed { link: input, output } => {
            let html = EmbedView::open(&input, &MermaidEngine, &state).to_html(state.lang);
            match output {
                Some(path) => std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{html}"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Examples { name } => run_examples(name.as_deref(), state.lang),
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn format_for(output: Option<&Path>) -> ExportFormat {
    match output.and_then(Path::extension).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("svg") => ExportFormat::Svg,
        _ => ExportFormat::Png,
    }
}

fn report_notice(notice: &mermaidpad::notice::Notice) -> ExitCode {
    eprintln!("{notice}");
    match notice.level {
        NoticeLevel::Info => ExitCode::SUCCESS,
        NoticeLevel::Warning | NoticeLevel::Error => ExitCode::FAILURE,
    }
}

fn run_format(path: &Path, write: bool, check: bool) -> Result<ExitCode> {
    let source = read_source(path)?;
    let formatted = format_source(&source);
    if check {
        if formatted == source {
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{} is not formatted", path.display());
        return Ok(ExitCode::FAILURE);
    }
    if write {
        if formatted != source {
            std::fs::write(path, &formatted)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(formatted.as_bytes())?;
        if !formatted.ends_with('\n') {
            writeln!(stdout)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// One render of a source file, the way the editor would show it.
struct Checked {
    source: String,
    preview: Preview,
    editor: EditorBuffer,
}

impl Checked {
    fn is_ok(&self) -> bool {
        self.preview.scene().is_some()
    }

    /// Report problems on stderr with `file:line` locations.
    fn print_problems(&self, path: &Path, lang: Lang) {
        let strings = lang.strings();
        if self.preview.look_warning() {
            eprintln!("{}", strings.look_unsupported);
        }
        match self.preview.content() {
            PreviewContent::Diagram(_) => {}
            PreviewContent::Placeholder => eprintln!("{}: {}", path.display(), strings.placeholder),
            PreviewContent::Error(panel) => {
                let location = panel.line.map_or_else(
                    || path.display().to_string(),
                    |line| format!("{}:{line}", path.display()),
                );
                eprintln!("{location}: {}", panel.title(lang));
                eprintln!("  {}", panel.message);
                if let Some(hint) = &panel.hint {
                    eprintln!("  {}: {hint}", strings.error_tip);
                }
            }
        }
    }
}

fn render_once(path: &Path, state: &mut AppState, fonts: Option<&FontCache>) -> Result<Checked> {
    let source = read_source(path)?;
    let mut editor = EditorBuffer::from_text(&source);
    let mut preview = Preview::default();
    let mut pipeline = RenderPipeline::new(state.lang);
    let style = state.render_style();
    pipeline.render(&mut editor, &mut preview, &style, &MermaidEngine, fonts, 0);
    Ok(Checked {
        source,
        preview,
        editor,
    })
}

fn run_check(path: &Path, state: &AppState, json: bool) -> Result<ExitCode> {
    let mut state = state.clone();
    let checked = render_once(path, &mut state, None)?;
    let diagram = DiagramType::detect(&checked.source);

    if json {
        let report = serde_json::json!({
            "file": path.display().to_string(),
            "ok": checked.is_ok(),
            "diagramType": diagram.label(),
            "lookDowngraded": checked.preview.look_warning(),
            "error": checked.preview.error(),
            "diagnostics": checked.editor.diagnostics(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if checked.is_ok() {
        println!(
            "{}: {} ({})",
            path.display(),
            state.lang.strings().render_ok,
            diagram.label()
        );
    } else {
        checked.print_problems(path, state.lang);
    }

    Ok(if checked.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_render(
    path: &Path,
    output: Option<PathBuf>,
    format: ExportFormat,
    background: Background,
    scale: f32,
    state: &mut AppState,
) -> Result<ExitCode> {
    let fonts = Arc::new(FontCache::http());
    let checked = render_once(path, state, Some(fonts.as_ref()))?;
    if !checked.is_ok() {
        checked.print_problems(path, state.lang);
        return Ok(ExitCode::FAILURE);
    }
    let destination = output.map_or(Destination::Clipboard, Destination::File);
    let mut job = ExportJob::new(checked.preview.scene(), format, destination, state);
    job.background = background;
    job.scale = scale;
    let mut exporter = Exporter::new(fonts);
    Ok(report_notice(&exporter.run(&job, state)))
}

fn run_examples(name: Option<&str>, lang: Lang) -> Result<ExitCode> {
    match name {
        Some(name) => {
            let sample = samples::find(name)
                .with_context(|| format!("Unknown example: {name} (run `mermaidpad examples`)"))?;
            println!("{}", sample.source);
        }
        None => {
            let width = samples::EXAMPLES
                .iter()
                .map(|sample| sample.name.len())
                .max()
                .unwrap_or(0);
            for sample in samples::EXAMPLES {
                println!("{:width$}  {}", sample.name, sample.label_for(lang));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(args: &[&str]) -> ConfigFlags {
        Cli::try_parse_from(args).unwrap().defaults.to_config_flags()
    }

    #[test]
    fn test_command_line_flags_become_config_flags() {
        let flags = flags(&[
            "mermaidpad",
            "render",
            "flow.mmd",
            "--theme",
            "dark",
            "--classic",
            "--seed",
            "7",
            "--scale",
            "3",
            "--perf",
        ]);
        assert_eq!(flags.theme, Some(ThemeName::Dark));
        assert_eq!(flags.look, Some(Look::Classic));
        assert_eq!(flags.seed, Some(7));
        assert_eq!(flags.scale, Some(3.0));
        assert!(flags.perf);
        assert!(!flags.random_seed);
        assert_eq!(flags.base_url, None);
    }

    #[test]
    fn test_no_look_flag_leaves_look_unset() {
        assert_eq!(flags(&["mermaidpad", "check", "a.mmd"]).look, None);
        assert_eq!(
            flags(&["mermaidpad", "check", "a.mmd", "--hand-drawn"]).look,
            Some(Look::HandDrawn)
        );
    }

    #[test]
    fn test_scale_must_be_positive() {
        assert!(Cli::try_parse_from(["mermaidpad", "render", "a.mmd", "--scale", "-2"]).is_err());
        assert!(Cli::try_parse_from(["mermaidpad", "render", "a.mmd", "--scale", "x"]).is_err());
    }

    #[test]
    fn test_hand_drawn_conflicts_with_classic() {
        let parsed =
            Cli::try_parse_from(["mermaidpad", "check", "a.mmd", "--hand-drawn", "--classic"]);
        assert!(parsed.is_err());
    }
}
