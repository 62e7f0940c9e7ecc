//! Bootstrap sequencer.
//!
//! Orders the page start-up: the module must be initialized before its
//! entry runs, the entry renders the editor's container, and the editor
//! environment must be installed before the editor is constructed. Stage
//! changes go through [`advance`], a pure transition function, so the
//! ordering is checked rather than assumed.

mod context;

pub use context::ShellContext;

use std::rc::Rc;

use crate::adapter::EditorAdapter;
use crate::config::ShellSettings;
use crate::environment::{EditorEnvironment, MemoryObjectUrls, ObjectUrls};
use crate::error::BootstrapError;
use crate::keybridge::install_escape_bridge;
use crate::module::{BinaryModule, ModuleLoader};
use crate::widget::WidgetLoader;

/// Where the page is in its start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BootStage {
    #[default]
    Unstarted,
    ModuleLoading,
    ModuleReady,
    EntryInvoked,
    EditorLoading,
    EditorReady,
}

/// Things that move the page forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootEvent {
    ModuleRequested,
    ModuleInitialized,
    EntryReturned,
    EditorRequested,
    EditorConstructed,
}

/// The single legal successor of `stage` under `event`.
///
/// # Errors
/// [`BootstrapError::InvalidTransition`] for any other pairing; stages
/// never move backward.
pub fn advance(stage: BootStage, event: BootEvent) -> Result<BootStage, BootstrapError> {
    match (stage, event) {
        (BootStage::Unstarted, BootEvent::ModuleRequested) => Ok(BootStage::ModuleLoading),
        (BootStage::ModuleLoading, BootEvent::ModuleInitialized) => Ok(BootStage::ModuleReady),
        (BootStage::ModuleReady, BootEvent::EntryReturned) => Ok(BootStage::EntryInvoked),
        (BootStage::EntryInvoked, BootEvent::EditorRequested) => Ok(BootStage::EditorLoading),
        (BootStage::EditorLoading, BootEvent::EditorConstructed) => Ok(BootStage::EditorReady),
        (stage, event) => Err(BootstrapError::InvalidTransition { stage, event }),
    }
}

/// Drives one page from `Unstarted` to `EditorReady`.
pub struct Sequencer<M, W> {
    shell: Rc<ShellContext>,
    settings: ShellSettings,
    modules: M,
    widgets: W,
    object_urls: Rc<dyn ObjectUrls>,
}

impl<M, W> Sequencer<M, W>
where
    M: ModuleLoader,
    W: WidgetLoader,
{
    pub fn new(shell: Rc<ShellContext>, modules: M, widgets: W) -> Self {
        Self {
            shell,
            settings: ShellSettings::default(),
            modules,
            widgets,
            object_urls: Rc::new(MemoryObjectUrls::default()),
        }
    }

    pub fn with_settings(mut self, settings: ShellSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registry used to turn the worker proxy script into a URL.
    pub fn with_object_urls(mut self, urls: Rc<dyn ObjectUrls>) -> Self {
        self.object_urls = urls;
        self
    }

    pub fn shell(&self) -> &Rc<ShellContext> {
        &self.shell
    }

    pub const fn widgets(&self) -> &W {
        &self.widgets
    }

    /// Run the whole start-up and return an adapter whose calls are safe.
    ///
    /// On failure the stage stays where the failing step began.
    ///
    /// # Errors
    /// Module, entry, environment and construction failures, or
    /// [`BootstrapError::AlreadyStarted`] if this shell was booted before.
    pub async fn run(&self) -> Result<EditorAdapter, BootstrapError> {
        let _total = crate::perf::scope("bootstrap.total");
        if self.shell.stage() != BootStage::Unstarted {
            return Err(BootstrapError::AlreadyStarted(self.shell.stage()));
        }

        self.step(BootEvent::ModuleRequested)?;
        let module = {
            let _scope = crate::perf::scope("bootstrap.module_init");
            self.modules
                .load(&self.settings.module_path)
                .await
                .inspect_err(|err| {
                    tracing::error!(
                        path = %self.settings.module_path.display(),
                        %err,
                        "module initialization failed"
                    );
                })?
        };
        self.step(BootEvent::ModuleInitialized)?;

        {
            let _scope = crate::perf::scope("bootstrap.entry");
            crate::page::install(&self.shell);
            module.run_entry(&self.shell).inspect_err(|err| {
                tracing::error!(entry = module.entry_name(), %err, "entry operation failed");
            })?;
        }
        self.step(BootEvent::EntryReturned)?;

        let env = EditorEnvironment::install(&self.settings.assets, &*self.object_urls)?;
        let env = self.shell.install_environment(env);
        self.step(BootEvent::EditorRequested)?;

        let widget = {
            let _scope = crate::perf::scope("bootstrap.editor_construct");
            self.widgets
                .create(&self.settings.container, &self.settings.options, env)
                .await
                .inspect_err(|err| tracing::error!(%err, "editor construction failed"))?
        };
        install_escape_bridge(&*widget, self.shell.keys(), &self.settings.container)?;
        if self.shell.editor_slot().fill(widget).is_err() {
            tracing::warn!("editor slot was already filled; keeping the first editor");
        }
        self.step(BootEvent::EditorConstructed)?;

        Ok(self.shell.adapter())
    }

    fn step(&self, event: BootEvent) -> Result<(), BootstrapError> {
        let from = self.shell.stage();
        let to = advance(from, event)?;
        self.shell.set_stage(to);
        tracing::info!(?from, ?to, "bootstrap stage");
        crate::perf::log_event("bootstrap.stage", format!("{from:?} -> {to:?}"));
        Ok(())
    }
}

impl<M, W> std::fmt::Debug for Sequencer<M, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("stage", &self.shell.stage())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
