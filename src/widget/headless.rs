//! An in-process editor widget for native hosts and tests.
//!
//! Behaves like the browser widget where the bootstrap contract can see it:
//! it honors `readOnly`, drops undo history on `set_value`, runs key
//! commands gated by `when` clauses, and lets Escape close the suggestion
//! overlay when no command claims the key.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use super::{
    CommandHandler, ContextKeys, EDITOR_WORKER_LABEL, EDITOR_WORKER_MODULE, EditorWidget, KeyCode,
    SUGGEST_WIDGET_VISIBLE, WhenClause, WidgetLoader,
};
use crate::editor::{Cursor, Direction, EditorBuffer};
use crate::environment::EditorEnvironment;
use crate::error::WidgetError;
use crate::options::{EditorOptions, OptionsUpdate};

/// What happened to a key sent through [`HeadlessEditor::press`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// A registered command claimed the key.
    Command,
    /// The key changed the text.
    Edited,
    /// The key would have edited, but the editor is read-only.
    Rejected,
    /// Built-in non-editing behavior ran (caret movement, or the
    /// suggestion overlay handling the key).
    Native,
    /// Nothing to do.
    Ignored,
}

struct KeyCommand {
    key: KeyCode,
    when: Option<WhenClause>,
    handler: Rc<dyn Fn()>,
}

/// The stand-in widget.
pub struct HeadlessEditor {
    container: String,
    worker_url: String,
    options: RefCell<EditorOptions>,
    buffer: RefCell<EditorBuffer>,
    context: RefCell<ContextKeys>,
    commands: RefCell<Vec<KeyCommand>>,
    focused: Cell<bool>,
}

impl HeadlessEditor {
    fn new(container: &str, options: &EditorOptions, worker_url: &str) -> Self {
        Self {
            container: container.to_string(),
            worker_url: worker_url.to_string(),
            options: RefCell::new(options.clone()),
            buffer: RefCell::new(EditorBuffer::empty()),
            context: RefCell::new(ContextKeys::default()),
            commands: RefCell::new(Vec::new()),
            focused: Cell::new(false),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// The worker script URL resolved at construction time.
    pub fn worker_url(&self) -> &str {
        &self.worker_url
    }

    pub fn options(&self) -> EditorOptions {
        self.options.borrow().clone()
    }

    pub fn is_read_only(&self) -> bool {
        self.options.borrow().read_only
    }

    pub fn has_focus(&self) -> bool {
        self.focused.get()
    }

    pub fn blur(&self) {
        self.focused.set(false);
    }

    pub fn command_count(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn show_suggestions(&self) {
        self.context.borrow_mut().set(SUGGEST_WIDGET_VISIBLE, true);
    }

    pub fn hide_suggestions(&self) {
        self.context.borrow_mut().set(SUGGEST_WIDGET_VISIBLE, false);
    }

    pub fn suggestions_visible(&self) -> bool {
        self.context.borrow().get(SUGGEST_WIDGET_VISIBLE)
    }

    /// Type `text` one character at a time, as the input path would.
    ///
    /// Returns `false` if the editor is read-only and nothing changed.
    pub fn type_text(&self, text: &str) -> bool {
        let mut edited = false;
        for ch in text.chars() {
            let key = if ch == '\n' {
                KeyCode::Enter
            } else {
                KeyCode::Char(ch)
            };
            edited |= self.press(key) == KeyOutcome::Edited;
        }
        edited
    }

    /// Deliver one key press.
    pub fn press(&self, key: KeyCode) -> KeyOutcome {
        if let Some(handler) = self.matching_command(key) {
            handler();
            return KeyOutcome::Command;
        }

        match key {
            KeyCode::Escape | KeyCode::Enter if self.suggestions_visible() => {
                self.hide_suggestions();
                KeyOutcome::Native
            }
            KeyCode::Up | KeyCode::Down if self.suggestions_visible() => KeyOutcome::Native,
            KeyCode::Left => self.move_caret(Direction::Left),
            KeyCode::Right => self.move_caret(Direction::Right),
            KeyCode::Up => self.move_caret(Direction::Up),
            KeyCode::Down => self.move_caret(Direction::Down),
            KeyCode::Escape => KeyOutcome::Ignored,
            _ if self.is_read_only() => KeyOutcome::Rejected,
            KeyCode::Enter => {
                self.buffer.borrow_mut().split_line();
                KeyOutcome::Edited
            }
            KeyCode::Backspace => edited_if(self.buffer.borrow_mut().delete_back()),
            KeyCode::Delete => edited_if(self.buffer.borrow_mut().delete_forward()),
            KeyCode::Char(ch) => {
                self.buffer.borrow_mut().insert_char(ch);
                KeyOutcome::Edited
            }
        }
    }

    /// Revert the last edit. Read-only editors refuse.
    pub fn undo(&self) -> bool {
        !self.is_read_only() && self.buffer.borrow_mut().undo()
    }

    pub fn can_undo(&self) -> bool {
        self.buffer.borrow().can_undo()
    }

    pub fn caret(&self) -> Cursor {
        self.buffer.borrow().cursor()
    }

    fn move_caret(&self, direction: Direction) -> KeyOutcome {
        self.buffer.borrow_mut().move_cursor(direction);
        KeyOutcome::Native
    }

    fn matching_command(&self, key: KeyCode) -> Option<Rc<dyn Fn()>> {
        let context = self.context.borrow();
        // Later bindings shadow earlier ones.
        self.commands
            .borrow()
            .iter()
            .rev()
            .find(|cmd| {
                cmd.key == key && cmd.when.as_ref().is_none_or(|when| when.evaluate(&context))
            })
            .map(|cmd| Rc::clone(&cmd.handler))
    }
}

const fn edited_if(changed: bool) -> KeyOutcome {
    if changed {
        KeyOutcome::Edited
    } else {
        KeyOutcome::Ignored
    }
}

impl EditorWidget for HeadlessEditor {
    fn value(&self) -> String {
        self.buffer.borrow().text()
    }

    fn set_value(&self, text: &str) {
        self.buffer.borrow_mut().replace_all(text);
    }

    fn focus(&self) {
        self.focused.set(true);
    }

    fn update_options(&self, update: OptionsUpdate) {
        self.options.borrow_mut().read_only = update.read_only;
    }

    fn add_command(
        &self,
        key: KeyCode,
        when: Option<&str>,
        handler: CommandHandler,
    ) -> Result<(), WidgetError> {
        let when = when.map(str::parse::<WhenClause>).transpose()?;
        self.commands.borrow_mut().push(KeyCommand {
            key,
            when,
            handler: Rc::from(handler),
        });
        Ok(())
    }
}

impl std::fmt::Debug for HeadlessEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessEditor")
            .field("container", &self.container)
            .field("read_only", &self.is_read_only())
            .field("focused", &self.focused.get())
            .field("commands", &self.command_count())
            .finish_non_exhaustive()
    }
}

/// Element ids that exist on the simulated page.
#[derive(Debug, Default)]
pub struct HeadlessPage {
    containers: RefCell<BTreeSet<String>>,
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an element with `id`, as the application's first render would.
    pub fn mount(&self, id: &str) {
        self.containers.borrow_mut().insert(id.to_string());
    }

    pub fn has(&self, id: &str) -> bool {
        self.containers.borrow().contains(id)
    }
}

/// Constructs [`HeadlessEditor`]s.
///
/// Keeps a handle to each editor it builds so hosts can drive the input
/// path the adapter does not expose.
#[derive(Debug, Default)]
pub struct HeadlessLoader {
    page: Option<Rc<HeadlessPage>>,
    failure: Option<String>,
    built: RefCell<Vec<Rc<HeadlessEditor>>>,
}

impl HeadlessLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the container to exist on `page` at construction time.
    pub fn on_page(mut self, page: Rc<HeadlessPage>) -> Self {
        self.page = Some(page);
        self
    }

    /// Make every construction fail with `reason`.
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// The most recently constructed editor.
    pub fn editor(&self) -> Option<Rc<HeadlessEditor>> {
        self.built.borrow().last().cloned()
    }

    pub fn construct_count(&self) -> usize {
        self.built.borrow().len()
    }
}

impl WidgetLoader for HeadlessLoader {
    async fn create(
        &self,
        container: &str,
        options: &EditorOptions,
        env: &EditorEnvironment,
    ) -> Result<Rc<dyn EditorWidget>, WidgetError> {
        if let Some(reason) = &self.failure {
            return Err(WidgetError::ConstructionFailed(reason.clone()));
        }
        if let Some(page) = &self.page
            && !page.has(container)
        {
            return Err(WidgetError::ContainerMissing(container.to_string()));
        }
        let worker_url = env.worker_url(EDITOR_WORKER_MODULE, EDITOR_WORKER_LABEL);
        if worker_url.is_empty() {
            return Err(WidgetError::WorkerUnavailable(EDITOR_WORKER_LABEL.to_string()));
        }

        let editor = Rc::new(HeadlessEditor::new(container, options, worker_url));
        self.built.borrow_mut().push(Rc::clone(&editor));
        tracing::debug!(container, worker_url, "headless editor constructed");
        Ok(editor)
    }
}
