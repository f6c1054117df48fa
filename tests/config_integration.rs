use std::path::PathBuf;

use mermaidpad::config::{ConfigFlags, load_config_flags, parse_flag_tokens};
use mermaidpad::i18n::Lang;
use mermaidpad::state::{AppState, HandFont, Look, SeedMode, ThemeName};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mermaidpadrc");
    let content = r"
# comment
--classic

--theme forest

--render-debug-log=render.log
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert_eq!(flags.look, Some(Look::Classic));
    assert_eq!(flags.theme, Some(ThemeName::Forest));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mermaidpadrc");
    let content = "--perf\n--theme neutral\n--hand-font caveat\n--render-debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args: Vec<String> = ["mermaidpad", "watch", "--theme", "dark", "--lang", "zh"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.perf, "file switches should remain enabled");
    assert_eq!(effective.lang, Some(Lang::Zh), "cli options should be applied");
    assert_eq!(effective.theme, Some(ThemeName::Dark), "cli should override theme");
    assert_eq!(effective.hand_font, Some(HandFont::Caveat));
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_effective_flags_drive_app_state() {
    let file = ConfigFlags {
        seed: Some(77),
        ..ConfigFlags::default()
    };
    let cli = parse_flag_tokens(&["--random-seed".to_string()]);
    let mut state = AppState::default();
    file.union(&cli).apply_to(&mut state);
    assert_eq!(state.seed_mode, SeedMode::Random);
    assert_eq!(state.seed, 77);
}
