//! The seam between this crate and the third-party editor widget.
//!
//! [`EditorWidget`] is the slice of the editor's native surface the adapter
//! and key bridge use. [`WidgetLoader`] is the editor's own asynchronous
//! constructor. Both have a headless implementation for native hosts and
//! tests. The Monaco implementation drives a [`MonacoHost`], which the `web`
//! feature binds to the browser page.

mod headless;
mod monaco;
mod when;

pub use headless::{HeadlessEditor, HeadlessLoader, HeadlessPage, KeyOutcome};
pub use monaco::{MonacoEditorHandle, MonacoHost, MonacoLoader, MonacoWidget};
pub use when::{ContextKeys, WhenClause, WhenParseError};

use std::future::Future;
use std::rc::Rc;

use crate::environment::EditorEnvironment;
use crate::error::WidgetError;
use crate::options::{EditorOptions, OptionsUpdate};

/// Context key set while the completion overlay is open.
pub const SUGGEST_WIDGET_VISIBLE: &str = "suggestWidgetVisible";

/// Worker label the editor resolves first during construction.
pub(crate) const EDITOR_WORKER_LABEL: &str = "editorWorkerService";
pub(crate) const EDITOR_WORKER_MODULE: &str = "vs/base/worker/workerMain";

/// Keys the bridge and the headless input path understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Escape,
    Enter,
    Backspace,
    Delete,
    Left,
    Up,
    Right,
    Down,
    Char(char),
}

impl KeyCode {
    /// Numeric key code in the editor's `KeyCode` enum.
    pub const fn monaco_code(self) -> Option<u32> {
        match self {
            Self::Backspace => Some(1),
            Self::Enter => Some(3),
            Self::Escape => Some(9),
            Self::Left => Some(15),
            Self::Up => Some(16),
            Self::Right => Some(17),
            Self::Down => Some(18),
            Self::Delete => Some(20),
            Self::Char(c) if c.is_ascii_digit() => Some(21 + (c as u32 - '0' as u32)),
            Self::Char(c) if c.is_ascii_alphabetic() => {
                Some(31 + (c.to_ascii_uppercase() as u32 - 'A' as u32))
            }
            Self::Char(_) => None,
        }
    }
}

/// Callback run when a registered key command fires.
pub type CommandHandler = Box<dyn Fn()>;

/// Native operations of a constructed editor widget.
pub trait EditorWidget {
    /// Full current text.
    fn value(&self) -> String;

    /// Replace all content. The widget also drops its undo history.
    fn set_value(&self, text: &str);

    fn focus(&self);

    fn update_options(&self, update: OptionsUpdate);

    /// Bind `key` to `handler`, active only while `when` holds.
    ///
    /// # Errors
    /// Returns an error if the key cannot be bound or `when` does not parse.
    fn add_command(
        &self,
        key: KeyCode,
        when: Option<&str>,
        handler: CommandHandler,
    ) -> Result<(), WidgetError>;
}

/// The editor's own asynchronous constructor.
pub trait WidgetLoader {
    /// Build a widget inside `container`.
    ///
    /// `env` must already be installed; the loader resolves worker scripts
    /// through it.
    fn create(
        &self,
        container: &str,
        options: &EditorOptions,
        env: &EditorEnvironment,
    ) -> impl Future<Output = Result<Rc<dyn EditorWidget>, WidgetError>>;
}
