use std::cell::{Cell, OnceCell};
use std::rc::Rc;

use super::BootStage;
use crate::adapter::{EditorAdapter, EditorSlot};
use crate::environment::EditorEnvironment;
use crate::keybridge::{BridgedKey, KeyBridge};

/// Everything the page shares between the sequencer, the application
/// module, and the adapter.
///
/// Built once per page and passed by reference; there is no global lookup.
#[derive(Debug, Default)]
pub struct ShellContext {
    editor: Rc<EditorSlot>,
    environment: OnceCell<EditorEnvironment>,
    keys: KeyBridge,
    stage: Cell<BootStage>,
}

impl ShellContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter over this context's editor slot.
    ///
    /// Valid to obtain at any time; its calls fail until the editor exists.
    pub fn adapter(&self) -> EditorAdapter {
        EditorAdapter::new(Rc::clone(&self.editor))
    }

    pub fn editor_slot(&self) -> &EditorSlot {
        &self.editor
    }

    pub fn stage(&self) -> BootStage {
        self.stage.get()
    }

    pub(super) fn set_stage(&self, stage: BootStage) {
        self.stage.set(stage);
    }

    /// The installed editor environment, once configured.
    pub fn environment(&self) -> Option<&EditorEnvironment> {
        self.environment.get()
    }

    /// First install wins; later installs are ignored.
    pub(super) fn install_environment(&self, env: EditorEnvironment) -> &EditorEnvironment {
        self.environment.get_or_init(|| env)
    }

    pub fn keys(&self) -> &KeyBridge {
        &self.keys
    }

    /// Subscribe to keys the editor hands back to the page.
    pub fn subscribe_keys(&self) -> tokio::sync::mpsc::UnboundedReceiver<BridgedKey> {
        self.keys.subscribe()
    }
}
