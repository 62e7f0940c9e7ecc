use std::path::PathBuf;

use notebridge::config::{ConfigFlags, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".notebridgerc");
    let content = r"
# comment
--perf

--monaco-version 0.21.2

--debug-log=boot.log
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.perf);
    assert_eq!(flags.monaco_version.as_deref(), Some("0.21.2"));
    assert_eq!(flags.debug_log, Some(PathBuf::from("boot.log")));
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".notebridgerc");
    let content = "--module notes.wasm\n--font Iosevka\n--debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "notebridge".to_string(),
        "run".to_string(),
        "--font".to_string(),
        "Noto Serif JP".to_string(),
        "--perf".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert_eq!(effective.module, Some(PathBuf::from("notes.wasm")));
    assert!(effective.perf, "cli flags should be applied");
    assert_eq!(effective.font.as_deref(), Some("Noto Serif JP"), "cli should override font");
    assert_eq!(
        effective.debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );

    let settings = effective.settings();
    assert_eq!(settings.module_path, PathBuf::from("notes.wasm"));
    assert_eq!(settings.options.font_family, "Noto Serif JP");
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "notebridge".to_string(),
        "--cdn-base=https://mirror.example/monaco".to_string(),
        "--container=note-editor".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.cdn_base.as_deref(), Some("https://mirror.example/monaco"));
    assert_eq!(flags.container.as_deref(), Some("note-editor"));
    assert_eq!(flags.settings().container, "note-editor");
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        perf: true,
        ..ConfigFlags::default()
    };
    let cli = ConfigFlags {
        entry: Some("start".to_string()),
        ..ConfigFlags::default()
    };
    let merged = file.union(&cli);
    assert!(merged.perf);
    assert_eq!(merged.entry.as_deref(), Some("start"));
}
