//! Monaco construction against an abstract page host.
//!
//! The order of calls into the page is what makes the editor find its
//! worker: `MonacoEnvironment` must be published before the main bundle
//! loads, and the bundle must be loaded before `monaco.editor.create`.
//! [`MonacoHost`] is that page surface; the `web` feature implements it over
//! `wasm_bindgen`.

use std::future::Future;
use std::rc::Rc;

use super::{
    CommandHandler, EDITOR_WORKER_LABEL, EDITOR_WORKER_MODULE, EditorWidget, KeyCode, WhenClause,
    WidgetLoader,
};
use crate::assets::EDITOR_MAIN_MODULE;
use crate::environment::EditorEnvironment;
use crate::error::WidgetError;
use crate::options::{EditorOptions, OptionsUpdate};

/// The page globals Monaco is loaded and created through.
pub trait MonacoHost {
    type Editor: MonacoEditorHandle + 'static;

    /// Set `self.MonacoEnvironment.getWorkerUrl` to resolve to `worker_url`.
    ///
    /// # Errors
    /// [`WidgetError::WorkerUnavailable`] if the global cannot be set.
    fn publish_environment(&self, worker_url: &str) -> Result<(), WidgetError>;

    /// Pass `config` to the AMD loader's `require.config`.
    ///
    /// # Errors
    /// Returns an error if the loader rejects the configuration.
    fn configure_loader(&self, config: &serde_json::Value) -> Result<(), WidgetError>;

    /// Resolve once the AMD `module` has loaded.
    fn load_module(&self, module: &str) -> impl Future<Output = Result<(), WidgetError>>;

    /// `monaco.editor.create` on the element with id `container`.
    ///
    /// # Errors
    /// [`WidgetError::ContainerMissing`] if there is no such element, or the
    /// editor's own construction error.
    fn create_editor(
        &self,
        container: &str,
        options: &serde_json::Value,
    ) -> Result<Self::Editor, WidgetError>;
}

/// Methods of a constructed `IStandaloneCodeEditor`.
pub trait MonacoEditorHandle {
    fn get_value(&self) -> String;

    fn set_value(&self, value: &str);

    fn focus(&self);

    fn update_options(&self, options: &serde_json::Value);

    /// `editor.addCommand(keybinding, handler, context)`.
    ///
    /// # Errors
    /// Returns an error if the handler cannot be handed to the editor.
    fn add_command(
        &self,
        keybinding: u32,
        context: Option<&str>,
        handler: CommandHandler,
    ) -> Result<(), WidgetError>;
}

/// A constructed Monaco editor behind the [`EditorWidget`] seam.
pub struct MonacoWidget<E> {
    editor: E,
}

impl<E> MonacoWidget<E> {
    pub const fn new(editor: E) -> Self {
        Self { editor }
    }

    pub const fn editor(&self) -> &E {
        &self.editor
    }
}

impl<E: MonacoEditorHandle> EditorWidget for MonacoWidget<E> {
    fn value(&self) -> String {
        self.editor.get_value()
    }

    fn set_value(&self, text: &str) {
        self.editor.set_value(text);
    }

    fn focus(&self) {
        self.editor.focus();
    }

    fn update_options(&self, update: OptionsUpdate) {
        match serde_json::to_value(update) {
            Ok(options) => self.editor.update_options(&options),
            Err(err) => tracing::warn!(%err, "options update dropped"),
        }
    }

    fn add_command(
        &self,
        key: KeyCode,
        when: Option<&str>,
        handler: CommandHandler,
    ) -> Result<(), WidgetError> {
        let code = key.monaco_code().ok_or_else(|| {
            WidgetError::ConstructionFailed(format!("{key:?} has no editor key code"))
        })?;
        if let Some(when) = when {
            when.parse::<WhenClause>()?;
        }
        self.editor.add_command(code, when, handler)
    }
}

/// Loads the editor bundle through a [`MonacoHost`] and builds the widget.
#[derive(Debug, Default)]
pub struct MonacoLoader<H> {
    host: H,
}

impl<H> MonacoLoader<H> {
    pub const fn new(host: H) -> Self {
        Self { host }
    }

    pub const fn host(&self) -> &H {
        &self.host
    }
}

impl<H: MonacoHost> WidgetLoader for MonacoLoader<H> {
    async fn create(
        &self,
        container: &str,
        options: &EditorOptions,
        env: &EditorEnvironment,
    ) -> Result<Rc<dyn EditorWidget>, WidgetError> {
        let worker_url = env.worker_url(EDITOR_WORKER_MODULE, EDITOR_WORKER_LABEL);
        if worker_url.is_empty() {
            return Err(WidgetError::WorkerUnavailable(EDITOR_WORKER_LABEL.to_string()));
        }
        self.host.publish_environment(worker_url)?;
        self.host.configure_loader(&env.loader_config())?;
        self.host.load_module(EDITOR_MAIN_MODULE).await?;

        let editor = self.host.create_editor(container, &options.to_json())?;
        tracing::debug!(container, worker_url, "monaco editor constructed");
        Ok(Rc::new(MonacoWidget::new(editor)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::adapter::{EditorAdapter, EditorSlot};
    use crate::assets::CdnAssets;
    use crate::environment::MemoryObjectUrls;
    use crate::keybridge::{KeyBridge, install_escape_bridge};

    type Calls = Rc<RefCell<Vec<String>>>;

    struct RecordedCommand {
        keybinding: u32,
        context: Option<String>,
        handler: CommandHandler,
    }

    #[derive(Default)]
    struct RecordingEditor {
        calls: Calls,
        text: RefCell<String>,
        commands: Rc<RefCell<Vec<RecordedCommand>>>,
    }

    impl MonacoEditorHandle for RecordingEditor {
        fn get_value(&self) -> String {
            self.text.borrow().clone()
        }

        fn set_value(&self, value: &str) {
            *self.text.borrow_mut() = value.to_string();
        }

        fn focus(&self) {
            self.calls.borrow_mut().push("focus".to_string());
        }

        fn update_options(&self, options: &serde_json::Value) {
            self.calls.borrow_mut().push(format!("updateOptions {options}"));
        }

        fn add_command(
            &self,
            keybinding: u32,
            context: Option<&str>,
            handler: CommandHandler,
        ) -> Result<(), WidgetError> {
            self.commands.borrow_mut().push(RecordedCommand {
                keybinding,
                context: context.map(str::to_string),
                handler,
            });
            Ok(())
        }
    }

    /// Records every page call in order.
    #[derive(Default)]
    struct RecordingHost {
        calls: Calls,
        containers: Vec<String>,
        commands: Rc<RefCell<Vec<RecordedCommand>>>,
    }

    impl RecordingHost {
        fn with_container(id: &str) -> Self {
            Self {
                containers: vec![id.to_string()],
                ..Self::default()
            }
        }
    }

    impl MonacoHost for RecordingHost {
        type Editor = RecordingEditor;

        fn publish_environment(&self, worker_url: &str) -> Result<(), WidgetError> {
            self.calls.borrow_mut().push(format!("environment {worker_url}"));
            Ok(())
        }

        fn configure_loader(&self, config: &serde_json::Value) -> Result<(), WidgetError> {
            self.calls.borrow_mut().push(format!("require.config {config}"));
            Ok(())
        }

        async fn load_module(&self, module: &str) -> Result<(), WidgetError> {
            self.calls.borrow_mut().push(format!("require {module}"));
            Ok(())
        }

        fn create_editor(
            &self,
            container: &str,
            options: &serde_json::Value,
        ) -> Result<RecordingEditor, WidgetError> {
            if !self.containers.iter().any(|id| id == container) {
                return Err(WidgetError::ContainerMissing(container.to_string()));
            }
            self.calls.borrow_mut().push(format!(
                "create {container} readOnly={}",
                options["readOnly"]
            ));
            Ok(RecordingEditor {
                calls: Rc::clone(&self.calls),
                commands: Rc::clone(&self.commands),
                ..RecordingEditor::default()
            })
        }
    }

    fn installed_env() -> EditorEnvironment {
        EditorEnvironment::install(&CdnAssets::default(), &MemoryObjectUrls::default()).unwrap()
    }

    #[tokio::test]
    async fn test_worker_url_is_published_before_editor_is_created() {
        let env = installed_env();
        let loader = MonacoLoader::new(RecordingHost::with_container("editor"));
        loader
            .create("editor", &EditorOptions::default(), &env)
            .await
            .unwrap();

        let worker_url = env.worker_url(EDITOR_WORKER_MODULE, EDITOR_WORKER_LABEL);
        assert_eq!(
            loader.host().calls.borrow().as_slice(),
            [
                format!("environment {worker_url}"),
                format!("require.config {}", env.loader_config()),
                "require vs/editor/editor.main".to_string(),
                "create editor readOnly=true".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_container_fails_after_environment_is_set() {
        let env = installed_env();
        let loader = MonacoLoader::new(RecordingHost::default());
        let result = loader.create("editor", &EditorOptions::default(), &env).await;

        assert!(matches!(result, Err(WidgetError::ContainerMissing(ref id)) if id == "editor"));
        assert_eq!(loader.host().calls.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_escape_binds_to_monaco_keycode_nine() {
        let env = installed_env();
        let loader = MonacoLoader::new(RecordingHost::with_container("editor"));
        let widget = loader
            .create("editor", &EditorOptions::default(), &env)
            .await
            .unwrap();
        let bridge = KeyBridge::new();
        let mut keys = bridge.subscribe();
        install_escape_bridge(&*widget, &bridge, "editor").unwrap();

        let commands = loader.host().commands.borrow();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].keybinding, 9);
        assert_eq!(commands[0].context.as_deref(), Some("!suggestWidgetVisible"));

        (commands[0].handler)();
        let key = keys.try_recv().unwrap();
        assert_eq!(key.key, "Escape");
        assert_eq!(key.target, "editor");
    }

    #[tokio::test]
    async fn test_bad_command_never_reaches_the_editor() {
        let env = installed_env();
        let loader = MonacoLoader::new(RecordingHost::with_container("editor"));
        let widget = loader
            .create("editor", &EditorOptions::default(), &env)
            .await
            .unwrap();

        let unbound = widget.add_command(KeyCode::Char('#'), None, Box::new(|| {}));
        assert!(matches!(unbound, Err(WidgetError::ConstructionFailed(_))));
        let bad_when = widget.add_command(KeyCode::Escape, Some("&& a"), Box::new(|| {}));
        assert!(matches!(bad_when, Err(WidgetError::When(_))));
        assert!(loader.host().commands.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_adapter_operations_map_to_editor_methods() {
        let env = installed_env();
        let loader = MonacoLoader::new(RecordingHost::with_container("editor"));
        let widget = loader
            .create("editor", &EditorOptions::default(), &env)
            .await
            .unwrap();
        let slot = Rc::new(EditorSlot::new());
        assert!(slot.fill(widget).is_ok());
        let adapter = EditorAdapter::new(slot);

        adapter.set_value("note").unwrap();
        adapter.set_editable(true).unwrap();
        adapter.focus().unwrap();
        assert_eq!(adapter.get_value().unwrap(), "note");

        let calls = loader.host().calls.borrow();
        assert_eq!(
            &calls[4..],
            [
                r#"updateOptions {"readOnly":false}"#.to_string(),
                "focus".to_string(),
            ]
        );
    }
}
