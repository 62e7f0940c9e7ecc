//! Notebridge - boot a wasm note page against the Monaco editor.
//!
//! # Usage
//!
//! ```bash
//! notebridge inspect scrapnote_bg.wasm
//! notebridge worker-proxy --monaco-version 0.21.2
//! notebridge run --module app.wasm --editable --text "hello"
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    cli::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};

    use notebridge::bootstrap::{Sequencer, ShellContext};
    use notebridge::config::{
        ConfigFlags, ShellSettings, clear_config_flags, global_config_path, load_config_flags,
        local_override_path, parse_flag_tokens, save_config_flags,
    };
    use notebridge::environment::worker_proxy_script;
    use notebridge::module::{AssetLoader, ModuleManifest};
    use notebridge::perf;
    use notebridge::widget::{HeadlessLoader, HeadlessPage, KeyCode};

    /// Boot a wasm note page against the Monaco editor
    #[derive(Parser, Debug)]
    #[command(name = "notebridge", version, about, long_about = None)]
    struct Cli {
        #[command(subcommand)]
        command: Command,

        /// Application module asset
        #[arg(long, global = true, value_name = "PATH")]
        module: Option<PathBuf>,

        /// Export called once the module is initialized
        #[arg(long, global = true, value_name = "NAME")]
        entry: Option<String>,

        /// CDN root serving the editor distribution
        #[arg(long, global = true, value_name = "URL")]
        cdn_base: Option<String>,

        /// Editor release to pin asset URLs to
        #[arg(long, global = true, value_name = "VERSION")]
        monaco_version: Option<String>,

        /// Editor font family
        #[arg(long, global = true, value_name = "NAME")]
        font: Option<String>,

        /// Editor language id
        #[arg(long, global = true, value_name = "ID")]
        language: Option<String>,

        /// Element id the editor is mounted into
        #[arg(long, global = true, value_name = "ID")]
        container: Option<String>,

        /// Enable start-up timing
        #[arg(long, global = true)]
        perf: bool,

        /// Write bootstrap events to a file
        #[arg(long, global = true, value_name = "PATH")]
        debug_log: Option<PathBuf>,

        /// Save current command-line flags as defaults
        #[arg(long, global = true)]
        save: bool,

        /// Clear saved defaults
        #[arg(long, global = true)]
        clear: bool,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Print a module's header and exports
        Inspect {
            #[arg(value_name = "ASSET")]
            asset: PathBuf,
        },
        /// Print the worker proxy script
        WorkerProxy,
        /// Print the editor construction options
        Options,
        /// Boot against the headless editor and print the result
        Run {
            /// Text to load into the editor after start-up
            #[arg(long)]
            text: Option<String>,

            /// Make the editor editable after start-up
            #[arg(long)]
            editable: bool,
        },
    }

    pub fn main() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::WARN.into()),
            )
            .init();

        let raw_args = std::env::args().collect::<Vec<_>>();
        let cli = Cli::parse();
        let global_path = global_config_path();
        let local_path = local_override_path();
        let cli_flags = parse_flag_tokens(&raw_args);

        if cli.clear {
            clear_config_flags(&global_path)?;
        }
        if cli.save {
            save_config_flags(&global_path, &cli_flags)?;
        }

        let file_flags = if cli.clear {
            ConfigFlags::default()
        } else {
            let global_flags = load_config_flags(&global_path)?;
            let local_flags = load_config_flags(&local_path)?;
            global_flags.union(&local_flags)
        };
        let effective = file_flags.union(&cli_flags);

        perf::set_enabled(effective.perf);
        let debug_log_path = effective
            .debug_log
            .clone()
            .or_else(|| std::env::var_os("NOTEBRIDGE_DEBUG_LOG").map(PathBuf::from));
        if let Err(err) = perf::set_debug_log_path(debug_log_path.as_deref()) {
            tracing::warn!(
                path = %debug_log_path
                    .as_ref()
                    .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
                %err,
                "failed to initialize debug log"
            );
        }

        let settings = effective.settings();
        match cli.command {
            Command::Inspect { asset } => inspect(&asset, &settings.entry),
            Command::WorkerProxy => {
                print!("{}", worker_proxy_script(&settings.assets));
                Ok(())
            }
            Command::Options => {
                let json = serde_json::to_string_pretty(&settings.options)
                    .context("Failed to serialize editor options")?;
                println!("{json}");
                Ok(())
            }
            Command::Run { text, editable } => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .build()
                    .context("Failed to start runtime")?;
                runtime.block_on(run(settings, text, editable))
            }
        }
    }

    fn inspect(asset: &Path, entry: &str) -> Result<()> {
        let bytes = std::fs::read(asset)
            .with_context(|| format!("Failed to read module {}", asset.display()))?;
        let manifest = ModuleManifest::parse(&bytes)
            .with_context(|| format!("Invalid module {}", asset.display()))?;
        println!("{}: {} bytes, version {}", asset.display(), manifest.size, manifest.version);
        for export in &manifest.exports {
            println!("  {:<32} {:?} #{}", export.name, export.kind, export.index);
        }
        let found = if manifest.function(entry).is_some() {
            "present"
        } else {
            "missing"
        };
        println!("entry `{entry}`: {found}");
        Ok(())
    }

    async fn run(settings: ShellSettings, text: Option<String>, editable: bool) -> Result<()> {
        let page = Rc::new(HeadlessPage::new());
        let container = settings.container.clone();
        let mount_page = Rc::clone(&page);
        let modules = AssetLoader::new(settings.entry.clone(), move |_: &ShellContext| {
            mount_page.mount(&container);
            tracing::info!(container = %container, "entry rendered page");
        });
        let widgets = HeadlessLoader::new().on_page(page);

        let shell = Rc::new(ShellContext::new());
        let mut escapes = shell.subscribe_keys();
        let sequencer = Sequencer::new(Rc::clone(&shell), modules, widgets).with_settings(settings);
        let adapter = sequencer.run().await.context("Bootstrap failed")?;

        if editable {
            adapter.set_editable(true)?;
        }
        if let Some(text) = text {
            adapter.set_value(&text)?;
        }
        adapter.focus()?;

        if let Some(editor) = sequencer.widgets().editor() {
            editor.press(KeyCode::Escape);
        }
        let mut bridged = 0;
        while escapes.try_recv().is_ok() {
            bridged += 1;
        }

        println!("stage: {:?}", shell.stage());
        println!("escape events: {bridged}");
        println!("{}", adapter.get_value()?);
        Ok(())
    }
}
