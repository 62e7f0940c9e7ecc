//! Error types for the bootstrap path and the editor adapter.

use std::path::PathBuf;

use thiserror::Error;

use crate::bootstrap::{BootEvent, BootStage};
use crate::widget::WhenParseError;

/// Failures while loading or invoking the binary application module.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("module asset not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read module asset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("not a wasm module (bad magic)")]
    BadMagic,
    #[error("unsupported wasm version {0}")]
    UnsupportedVersion(u32),
    #[error("module truncated at byte {offset} while reading {what}")]
    Truncated { offset: usize, what: &'static str },
    #[error("malformed {what} at byte {offset}")]
    Malformed { offset: usize, what: &'static str },
    #[error("export name at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),
    #[error("module instantiation failed: {0}")]
    Instantiate(String),
    #[error("module does not export entry `{0}`")]
    MissingEntry(String),
    #[error("entry `{name}` failed: {reason}")]
    EntryFailed { name: String, reason: String },
}

/// Failures raised by a widget loader while constructing the editor.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("editor container `{0}` does not exist")]
    ContainerMissing(String),
    #[error("no worker url for label `{0}`")]
    WorkerUnavailable(String),
    #[error(transparent)]
    When(#[from] WhenParseError),
    #[error("could not create object url: {0}")]
    ObjectUrl(String),
    #[error("editor construction failed: {0}")]
    ConstructionFailed(String),
}

/// Failures returned by the editor adapter operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AdapterError {
    /// The editor slot is still empty; construction has not resolved.
    #[error("editor `{0}` called before the editor was ready")]
    NotReady(&'static str),
}

/// Failures of the bootstrap sequence as a whole.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("module initialization failed")]
    Module(#[from] ModuleError),
    #[error("editor construction failed")]
    Widget(#[from] WidgetError),
    #[error("bootstrap already started (stage {0:?})")]
    AlreadyStarted(BootStage),
    #[error("event {event:?} is not valid in stage {stage:?}")]
    InvalidTransition { stage: BootStage, event: BootEvent },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instantiation_failure_is_a_module_init_error() {
        let err = BootstrapError::from(ModuleError::Instantiate(
            "LinkError: import env.get_value missing".to_string(),
        ));
        assert!(matches!(err, BootstrapError::Module(ModuleError::Instantiate(_))));
        assert_eq!(err.to_string(), "module initialization failed");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("module instantiation failed: LinkError: import env.get_value missing")
        );
    }
}
