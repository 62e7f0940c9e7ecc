//! Page-wide editor handles for code that cannot hold a [`ShellContext`].
//!
//! The compiled application module only reaches the host through exported
//! functions, so the sequencer publishes the booted shell's adapter and key
//! bridge here before the entry runs. A page has one shell; installing again
//! replaces the previous handles.

use std::cell::RefCell;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::adapter::EditorAdapter;
use crate::bootstrap::ShellContext;
use crate::error::AdapterError;
use crate::keybridge::{BridgedKey, KeyBridge};

#[derive(Debug, Clone)]
struct PageHandles {
    adapter: EditorAdapter,
    keys: KeyBridge,
}

thread_local! {
    static CURRENT: RefCell<Option<PageHandles>> = const { RefCell::new(None) };
}

/// Publish `shell`'s adapter and key bridge as the page's handles.
pub fn install(shell: &ShellContext) {
    let handles = PageHandles {
        adapter: shell.adapter(),
        keys: shell.keys().clone(),
    };
    CURRENT.with(|current| *current.borrow_mut() = Some(handles));
    tracing::debug!("page handles installed");
}

/// Forget the installed handles.
pub fn clear() {
    CURRENT.with(|current| *current.borrow_mut() = None);
}

pub fn is_installed() -> bool {
    CURRENT.with(|current| current.borrow().is_some())
}

// Cloned out of the cell so editor callbacks may re-enter.
fn adapter(op: &'static str) -> Result<EditorAdapter, AdapterError> {
    CURRENT
        .with(|current| current.borrow().as_ref().map(|h| h.adapter.clone()))
        .ok_or(AdapterError::NotReady(op))
}

/// # Errors
/// [`AdapterError::NotReady`] before a shell is installed or its editor exists.
pub fn get_value() -> Result<String, AdapterError> {
    adapter("get_value")?.get_value()
}

/// # Errors
/// [`AdapterError::NotReady`] before a shell is installed or its editor exists.
pub fn set_value(text: &str) -> Result<(), AdapterError> {
    adapter("set_value")?.set_value(text)
}

/// # Errors
/// [`AdapterError::NotReady`] before a shell is installed or its editor exists.
pub fn focus() -> Result<(), AdapterError> {
    adapter("focus")?.focus()
}

/// # Errors
/// [`AdapterError::NotReady`] before a shell is installed or its editor exists.
pub fn set_editable(editable: bool) -> Result<(), AdapterError> {
    adapter("set_editable")?.set_editable(editable)
}

/// Subscribe to keys the editor hands back, if a shell is installed.
pub fn subscribe_keys() -> Option<UnboundedReceiver<BridgedKey>> {
    CURRENT.with(|current| current.borrow().as_ref().map(|h| h.keys.subscribe()))
}
