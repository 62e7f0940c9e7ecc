use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::assets::{CdnAssets, DEFAULT_CDN_BASE, DEFAULT_MONACO_VERSION};
use crate::options::EditorOptions;

/// Module asset, relative to the working directory on native hosts.
pub const DEFAULT_MODULE_PATH: &str = "scrapnote_bg.wasm";
/// Module asset as the browser page fetches it, from the site root.
pub const PAGE_MODULE_URL: &str = "/scrapnote_bg.wasm";
/// Export invoked once the module is initialized.
pub const DEFAULT_ENTRY: &str = "run_app";
/// Element id the editor is mounted into.
pub const DEFAULT_CONTAINER: &str = "editor";

/// Flags as they appear on the command line or in an rc file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub module: Option<PathBuf>,
    pub entry: Option<String>,
    pub cdn_base: Option<String>,
    pub monaco_version: Option<String>,
    pub font: Option<String>,
    pub language: Option<String>,
    pub container: Option<String>,
    pub perf: bool,
    pub debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Layer `other` on top of `self`; values set in `other` win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            module: other.module.clone().or_else(|| self.module.clone()),
            entry: other.entry.clone().or_else(|| self.entry.clone()),
            cdn_base: other.cdn_base.clone().or_else(|| self.cdn_base.clone()),
            monaco_version: other
                .monaco_version
                .clone()
                .or_else(|| self.monaco_version.clone()),
            font: other.font.clone().or_else(|| self.font.clone()),
            language: other.language.clone().or_else(|| self.language.clone()),
            container: other.container.clone().or_else(|| self.container.clone()),
            perf: self.perf || other.perf,
            debug_log: other.debug_log.clone().or_else(|| self.debug_log.clone()),
        }
    }

    /// Resolve unset flags to the built-in defaults.
    pub fn settings(&self) -> ShellSettings {
        let defaults = ShellSettings::default();
        let mut options = defaults.options;
        if let Some(font) = &self.font {
            options = options.with_font_family(font.clone());
        }
        if let Some(language) = &self.language {
            options = options.with_language(language.clone());
        }
        ShellSettings {
            module_path: self.module.clone().unwrap_or(defaults.module_path),
            entry: self.entry.clone().unwrap_or(defaults.entry),
            assets: CdnAssets::new(
                self.cdn_base.as_deref().unwrap_or(DEFAULT_CDN_BASE),
                self.monaco_version
                    .as_deref()
                    .unwrap_or(DEFAULT_MONACO_VERSION),
            ),
            options,
            container: self.container.clone().unwrap_or(defaults.container),
        }
    }
}

/// Everything the sequencer needs to know about the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSettings {
    pub module_path: PathBuf,
    pub entry: String,
    pub assets: CdnAssets,
    pub options: EditorOptions,
    pub container: String,
}

impl ShellSettings {
    /// Defaults for the browser page, where the module is served from the
    /// site root rather than relative to the page URL.
    pub fn for_page() -> Self {
        Self {
            module_path: PathBuf::from(PAGE_MODULE_URL),
            ..Self::default()
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(DEFAULT_MODULE_PATH),
            entry: DEFAULT_ENTRY.to_string(),
            assets: CdnAssets::default(),
            options: EditorOptions::default(),
            container: DEFAULT_CONTAINER.to_string(),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("notebridge").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("notebridge")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("notebridge").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("notebridge")
                .join("config");
        }
    }

    PathBuf::from(".notebridgerc")
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".notebridgerc")
}

/// Read flags from an rc file. A missing file yields no flags.
///
/// # Errors
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
        .flat_map(line_tokens)
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// One rc line is a flag and, optionally, a value running to end of line.
fn line_tokens(line: &str) -> Vec<String> {
    match line.split_once(char::is_whitespace) {
        Some((flag, value)) if !flag.contains('=') => {
            vec![flag.to_string(), value.trim().to_string()]
        }
        _ => vec![line.to_string()],
    }
}

/// Write `flags` to an rc file, one flag per line.
///
/// # Errors
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# notebridge defaults (saved with --save)".to_string()];
    if let Some(module) = &flags.module {
        lines.push(format!("--module {}", module.display()));
    }
    let valued = [
        ("--entry", &flags.entry),
        ("--cdn-base", &flags.cdn_base),
        ("--monaco-version", &flags.monaco_version),
        ("--font", &flags.font),
        ("--language", &flags.language),
        ("--container", &flags.container),
    ];
    for (flag, value) in valued {
        if let Some(value) = value {
            lines.push(format!("{flag} {value}"));
        }
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(path) = &flags.debug_log {
        lines.push(format!("--debug-log {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove a saved rc file if present.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of a token list; anything else is ignored.
///
/// Accepts both `--flag value` and `--flag=value`.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--perf" {
            flags.perf = true;
            i += 1;
            continue;
        }
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (token, None),
        };
        if !is_valued_flag(name) {
            i += 1;
            continue;
        }
        let value = match inline {
            Some(value) => Some(value),
            None => {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            }
        };
        if let Some(value) = value {
            apply_valued_flag(&mut flags, name, value);
        }
        i += 1;
    }
    flags
}

fn is_valued_flag(name: &str) -> bool {
    matches!(
        name,
        "--module"
            | "--entry"
            | "--cdn-base"
            | "--monaco-version"
            | "--font"
            | "--language"
            | "--container"
            | "--debug-log"
    )
}

fn apply_valued_flag(flags: &mut ConfigFlags, name: &str, value: String) {
    match name {
        "--module" => flags.module = Some(PathBuf::from(value)),
        "--entry" => flags.entry = Some(value),
        "--cdn-base" => flags.cdn_base = Some(value),
        "--monaco-version" => flags.monaco_version = Some(value),
        "--font" => flags.font = Some(value),
        "--language" => flags.language = Some(value),
        "--container" => flags.container = Some(value),
        "--debug-log" => flags.debug_log = Some(PathBuf::from(value)),
        _ => {}
    }
}
