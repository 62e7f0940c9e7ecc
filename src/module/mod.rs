//! Loading the binary application module and calling its entry export.

mod manifest;

pub use manifest::{Export, ExportKind, ModuleManifest, WASM_MAGIC, WASM_VERSION};

use std::future::Future;
use std::path::Path;

use crate::bootstrap::ShellContext;
use crate::error::ModuleError;

/// An initialized module, ready for its entry call.
pub trait BinaryModule {
    fn entry_name(&self) -> &str;

    /// Run the module's entry operation once.
    ///
    /// # Errors
    /// Returns [`ModuleError::EntryFailed`] if the entry raised.
    fn run_entry(&self, shell: &ShellContext) -> Result<(), ModuleError>;
}

/// Fetches and initializes a module from an asset path.
pub trait ModuleLoader {
    type Module: BinaryModule;

    /// Resolve once the module's memory and exports are usable.
    fn load(&self, path: &Path) -> impl Future<Output = Result<Self::Module, ModuleError>>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{AssetLoader, LoadedModule};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};

    use super::{BinaryModule, ModuleLoader, ModuleManifest};
    use crate::bootstrap::ShellContext;
    use crate::error::ModuleError;

    /// Reads a wasm asset from disk and checks it exports the entry.
    ///
    /// A native host cannot execute the module itself, so the entry's
    /// behavior is supplied by `entry`.
    #[derive(Debug, Clone)]
    pub struct AssetLoader<E> {
        entry_name: String,
        entry: E,
    }

    impl<E> AssetLoader<E>
    where
        E: Fn(&ShellContext) + Clone,
    {
        pub fn new(entry_name: impl Into<String>, entry: E) -> Self {
            Self {
                entry_name: entry_name.into(),
                entry,
            }
        }
    }

    impl<E> ModuleLoader for AssetLoader<E>
    where
        E: Fn(&ShellContext) + Clone,
    {
        type Module = LoadedModule<E>;

        async fn load(&self, path: &Path) -> Result<Self::Module, ModuleError> {
            let bytes = tokio::fs::read(path).await.map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ModuleError::Missing(path.to_path_buf())
                } else {
                    ModuleError::Io {
                        path: path.to_path_buf(),
                        source,
                    }
                }
            })?;
            let manifest = ModuleManifest::parse(&bytes)?;
            manifest.require_entry(&self.entry_name)?;
            tracing::debug!(
                path = %path.display(),
                size = manifest.size,
                exports = manifest.exports.len(),
                "module asset verified"
            );
            Ok(LoadedModule {
                path: path.to_path_buf(),
                manifest,
                entry_name: self.entry_name.clone(),
                entry: self.entry.clone(),
            })
        }
    }

    /// A verified asset plus the host-side entry behavior.
    #[derive(Debug)]
    pub struct LoadedModule<E> {
        path: PathBuf,
        manifest: ModuleManifest,
        entry_name: String,
        entry: E,
    }

    impl<E> LoadedModule<E> {
        pub fn path(&self) -> &Path {
            &self.path
        }

        pub const fn manifest(&self) -> &ModuleManifest {
            &self.manifest
        }
    }

    impl<E> BinaryModule for LoadedModule<E>
    where
        E: Fn(&ShellContext),
    {
        fn entry_name(&self) -> &str {
            &self.entry_name
        }

        fn run_entry(&self, shell: &ShellContext) -> Result<(), ModuleError> {
            (self.entry)(shell);
            Ok(())
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn wasm_exporting(name: &str) -> Vec<u8> {
        let mut body = vec![1, u8::try_from(name.len()).unwrap()];
        body.extend_from_slice(name.as_bytes());
        body.extend_from_slice(&[0, 0]);
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&WASM_VERSION.to_le_bytes());
        bytes.push(7);
        bytes.push(u8::try_from(body.len()).unwrap());
        bytes.extend_from_slice(&body);
        bytes
    }

    #[tokio::test]
    async fn test_load_verifies_entry_and_runs_host_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.bin");
        std::fs::write(&path, wasm_exporting("run_app")).unwrap();

        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        let loader = AssetLoader::new("run_app", move |_: &ShellContext| seen.set(seen.get() + 1));
        let module = loader.load(&path).await.unwrap();
        assert_eq!(module.entry_name(), "run_app");
        assert_eq!(module.path(), path.as_path());
        assert_eq!(module.manifest().exports.len(), 1);
        assert_eq!(calls.get(), 0, "loading must not run the entry");

        module.run_entry(&ShellContext::new()).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_missing_asset_is_reported_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AssetLoader::new("run_app", |_: &ShellContext| {});
        let err = loader.load(&dir.path().join("nope.wasm")).await.err().unwrap();
        assert!(matches!(err, ModuleError::Missing(_)));
    }

    #[tokio::test]
    async fn test_asset_without_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.bin");
        std::fs::write(&path, wasm_exporting("main")).unwrap();
        let loader = AssetLoader::new("run_app", |_: &ShellContext| {});
        let err = loader.load(&path).await.err().unwrap();
        assert!(matches!(err, ModuleError::MissingEntry(name) if name == "run_app"));
    }
}
