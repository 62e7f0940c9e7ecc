//! Remote editor assets served from a pinned CDN release.

/// Default CDN root for the Monaco distribution.
pub const DEFAULT_CDN_BASE: &str = "https://cdnjs.cloudflare.com/ajax/libs/monaco-editor";

/// Monaco release every asset URL is pinned to.
pub const DEFAULT_MONACO_VERSION: &str = "0.21.2";

/// AMD module id of the editor entry bundle.
pub const EDITOR_MAIN_MODULE: &str = "vs/editor/editor.main";

/// Location of the editor's scripts on the CDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnAssets {
    base: String,
    version: String,
}

impl CdnAssets {
    pub fn new(base: impl Into<String>, version: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
            version: version.into(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Root of the minified distribution (`.../<version>/min`).
    pub fn min_root(&self) -> String {
        format!("{}/{}/min", self.base, self.version)
    }

    /// Path the AMD loader maps the `vs` prefix to.
    pub fn vs_path(&self) -> String {
        format!("{}/vs", self.min_root())
    }

    /// The background worker bundle the proxy script imports.
    pub fn worker_main_url(&self) -> String {
        format!("{}/base/worker/workerMain.min.js", self.vs_path())
    }
}

impl Default for CdnAssets {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_BASE, DEFAULT_MONACO_VERSION)
    }
}
