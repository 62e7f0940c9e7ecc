//! Editor environment: where the editor's loader finds its background worker.
//!
//! Worker scripts must be same-origin, but the editor is served from a CDN.
//! The proxy is a tiny inline script, registered as an object URL, whose
//! only job is to `importScripts` the real worker bundle.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use crate::assets::CdnAssets;
use crate::error::WidgetError;

/// MIME type of the worker proxy blob.
pub const PROXY_MIME: &str = "text/javascript";

/// An in-memory script body waiting to be turned into an object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlob {
    pub mime: String,
    pub body: String,
}

/// Turns blobs into same-origin URLs.
pub trait ObjectUrls {
    /// Register `blob` and return a URL that resolves to it.
    ///
    /// # Errors
    /// Returns [`WidgetError::ObjectUrl`] when the host refuses the blob.
    fn create(&self, blob: ScriptBlob) -> Result<String, WidgetError>;

    /// Release a URL previously returned by [`ObjectUrls::create`].
    fn revoke(&self, url: &str);
}

/// Object URL registry for hosts without a browser.
#[derive(Debug)]
pub struct MemoryObjectUrls {
    origin: String,
    next_id: Cell<u64>,
    blobs: RefCell<BTreeMap<String, ScriptBlob>>,
}

impl MemoryObjectUrls {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            next_id: Cell::new(1),
            blobs: RefCell::new(BTreeMap::new()),
        }
    }

    /// The blob behind `url`, if it has not been revoked.
    pub fn resolve(&self, url: &str) -> Option<ScriptBlob> {
        self.blobs.borrow().get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.blobs.borrow().len()
    }
}

impl Default for MemoryObjectUrls {
    fn default() -> Self {
        Self::new("http://127.0.0.1")
    }
}

impl ObjectUrls for MemoryObjectUrls {
    fn create(&self, blob: ScriptBlob) -> Result<String, WidgetError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let url = format!("blob:{}/{id:016x}", self.origin);
        self.blobs.borrow_mut().insert(url.clone(), blob);
        Ok(url)
    }

    fn revoke(&self, url: &str) {
        self.blobs.borrow_mut().remove(url);
    }
}

/// The inline worker redirect script for `assets`.
pub fn worker_proxy_script(assets: &CdnAssets) -> String {
    // JSON string literals are valid JS string literals.
    let base_url = serde_json::Value::String(assets.min_root()).to_string();
    let worker = serde_json::Value::String(assets.worker_main_url()).to_string();
    format!(
        "self.MonacoEnvironment = {{\n    baseUrl: {base_url}\n}};\nimportScripts({worker});\n"
    )
}

/// Process-wide editor configuration installed before construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorEnvironment {
    worker_url: String,
    amd_vs_path: String,
}

impl EditorEnvironment {
    /// Synthesize the worker proxy, register it, and build the environment.
    ///
    /// # Errors
    /// Propagates the registry's failure to create the object URL.
    pub fn install(assets: &CdnAssets, urls: &dyn ObjectUrls) -> Result<Self, WidgetError> {
        let worker_url = urls.create(ScriptBlob {
            mime: PROXY_MIME.to_string(),
            body: worker_proxy_script(assets),
        })?;
        tracing::debug!(%worker_url, version = assets.version(), "worker proxy registered");
        Ok(Self {
            worker_url,
            amd_vs_path: assets.vs_path(),
        })
    }

    /// Resolve the worker script for any editor worker.
    ///
    /// Every label (`editorWorkerService`, language workers) shares one proxy.
    pub fn worker_url(&self, _module_id: &str, _label: &str) -> &str {
        &self.worker_url
    }

    /// Where the AMD loader maps `vs`.
    pub fn amd_vs_path(&self) -> &str {
        &self.amd_vs_path
    }

    /// The object handed to the AMD loader's `require.config`.
    pub fn loader_config(&self) -> serde_json::Value {
        serde_json::json!({ "paths": { "vs": self.amd_vs_path } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_script_imports_pinned_worker() {
        let script = worker_proxy_script(&CdnAssets::default());
        assert!(script.contains(
            "importScripts(\"https://cdnjs.cloudflare.com/ajax/libs/monaco-editor/0.21.2/min/vs/base/worker/workerMain.min.js\");"
        ));
        assert!(script.contains(
            "baseUrl: \"https://cdnjs.cloudflare.com/ajax/libs/monaco-editor/0.21.2/min\""
        ));
    }

    #[test]
    fn test_proxy_script_escapes_quotes_in_base() {
        let script = worker_proxy_script(&CdnAssets::new("https://x/'\"", "1"));
        assert!(script.contains(r#"baseUrl: "https://x/'\"/1/min""#));
    }

    #[test]
    fn test_install_registers_one_blob_per_call() {
        let urls = MemoryObjectUrls::default();
        let env = EditorEnvironment::install(&CdnAssets::default(), &urls).unwrap();
        let url = env.worker_url("vs/base/worker/workerMain", "editorWorkerService");
        assert!(url.starts_with("blob:http://127.0.0.1/"));
        assert_eq!(urls.live_count(), 1);

        let blob = urls.resolve(url).unwrap();
        assert_eq!(blob.mime, PROXY_MIME);
        assert!(blob.body.contains("importScripts"));
    }

    #[test]
    fn test_every_label_resolves_to_the_proxy() {
        let urls = MemoryObjectUrls::default();
        let env = EditorEnvironment::install(&CdnAssets::default(), &urls).unwrap();
        assert_eq!(
            env.worker_url("a", "editorWorkerService"),
            env.worker_url("b", "markdown")
        );
    }

    #[test]
    fn test_loader_config_maps_vs_to_cdn() {
        let urls = MemoryObjectUrls::default();
        let assets = CdnAssets::new("https://mirror.example/", "0.21.2");
        let env = EditorEnvironment::install(&assets, &urls).unwrap();
        assert_eq!(
            env.loader_config(),
            serde_json::json!({ "paths": { "vs": "https://mirror.example/0.21.2/min/vs" } })
        );
    }

    #[test]
    fn test_revoke_releases_blob() {
        let urls = MemoryObjectUrls::default();
        let url = urls
            .create(ScriptBlob {
                mime: PROXY_MIME.to_string(),
                body: String::new(),
            })
            .unwrap();
        urls.revoke(&url);
        assert!(urls.resolve(&url).is_none());
        assert_eq!(urls.live_count(), 0);
    }
}
