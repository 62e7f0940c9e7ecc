#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions
)]

//! # Notebridge
//!
//! Start-up sequencing and an editor adapter for a note-taking page whose
//! application logic lives in a compiled WebAssembly module and whose text
//! editing is delegated to the Monaco editor.
//!
//! ## Architecture
//!
//! The page moves through a fixed set of stages:
//! - **Module**: initialize the application module, then call its entry
//! - **Environment**: point the editor's worker loader at a same-origin proxy
//! - **Editor**: construct the widget inside the container the entry rendered
//! - **Bridge**: republish Escape from inside the editor to the page
//!
//! Transitions go through [`bootstrap::advance`]. The application reaches the
//! editor only through [`adapter::EditorAdapter`], whose calls fail with
//! [`error::AdapterError::NotReady`] until construction has finished.
//!
//! ## Modules
//!
//! - [`bootstrap`]: Stage machine, sequencer and shared page context
//! - [`adapter`]: The four editor operations exposed to the application
//! - [`module`]: Module loading and export-section inspection
//! - [`environment`]: Worker proxy script and object URLs
//! - [`widget`]: Editor widget seam and its headless implementation
//! - [`keybridge`]: Escape-key republishing
//! - [`page`]: The booted shell's handles, for the module's exported calls
//! - [`config`]: Flags, rc files and resolved settings

pub mod adapter;
pub mod assets;
pub mod bootstrap;
pub mod config;
pub mod editor;
pub mod environment;
pub mod error;
pub mod keybridge;
pub mod module;
pub mod options;
pub mod page;
pub mod perf;
pub mod widget;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
#[allow(unsafe_code)]
pub mod web;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::adapter::EditorAdapter;
    pub use crate::bootstrap::{BootStage, Sequencer, ShellContext};
    pub use crate::config::ShellSettings;
    pub use crate::error::{AdapterError, BootstrapError};
    pub use crate::keybridge::BridgedKey;
    pub use crate::widget::{EditorWidget, WidgetLoader};
}
