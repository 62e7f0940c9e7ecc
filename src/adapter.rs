//! The four editor operations the application module calls.
//!
//! The adapter never owns the widget. Each call looks up the shared
//! [`EditorSlot`], so a call that arrives before construction has resolved
//! fails with [`AdapterError::NotReady`] instead of reaching a widget that
//! does not exist yet.

use std::cell::OnceCell;
use std::rc::Rc;

use crate::error::AdapterError;
use crate::options::OptionsUpdate;
use crate::widget::EditorWidget;

/// Write-once home of the constructed editor.
#[derive(Default)]
pub struct EditorSlot {
    widget: OnceCell<Rc<dyn EditorWidget>>,
}

impl EditorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the editor. A second fill hands the widget back unchanged.
    ///
    /// # Errors
    /// Returns `widget` if the slot is already occupied.
    pub fn fill(&self, widget: Rc<dyn EditorWidget>) -> Result<(), Rc<dyn EditorWidget>> {
        self.widget.set(widget)
    }

    pub fn is_ready(&self) -> bool {
        self.widget.get().is_some()
    }

    fn lookup(&self, op: &'static str) -> Result<&dyn EditorWidget, AdapterError> {
        self.widget
            .get()
            .map(|widget| &**widget)
            .ok_or(AdapterError::NotReady(op))
    }
}

impl std::fmt::Debug for EditorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Passthrough operations over the editor slot.
#[derive(Debug, Clone)]
pub struct EditorAdapter {
    slot: Rc<EditorSlot>,
}

impl EditorAdapter {
    pub const fn new(slot: Rc<EditorSlot>) -> Self {
        Self { slot }
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// The editor's full current text.
    ///
    /// # Errors
    /// [`AdapterError::NotReady`] before the editor exists.
    pub fn get_value(&self) -> Result<String, AdapterError> {
        Ok(self.slot.lookup("get_value")?.value())
    }

    /// Replace the editor's content. The widget resets its undo history.
    ///
    /// # Errors
    /// [`AdapterError::NotReady`] before the editor exists.
    pub fn set_value(&self, text: &str) -> Result<(), AdapterError> {
        self.slot.lookup("set_value")?.set_value(text);
        Ok(())
    }

    /// Move input focus into the editor.
    ///
    /// # Errors
    /// [`AdapterError::NotReady`] before the editor exists.
    pub fn focus(&self) -> Result<(), AdapterError> {
        self.slot.lookup("focus")?.focus();
        Ok(())
    }

    /// Allow (`true`) or forbid (`false`) edits through the editor's input path.
    ///
    /// # Errors
    /// [`AdapterError::NotReady`] before the editor exists.
    pub fn set_editable(&self, editable: bool) -> Result<(), AdapterError> {
        self.slot
            .lookup("set_editable")?
            .update_options(OptionsUpdate {
                read_only: !editable,
            });
        Ok(())
    }
}
