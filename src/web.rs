//! Browser host: Monaco through its AMD loader, object URLs through
//! `URL.createObjectURL`, and the application module through `fetch` and
//! `WebAssembly.instantiate` (or its own wasm-bindgen `init`).
//!
//! The application module reaches the editor through the free exports
//! below (`get_value`, `set_value`, `focus`, `set_editable`, `on_escape`),
//! named as a module built against an `ace.js`-style import shim expects.
//! They act on the shell the sequencer published in [`crate::page`] before
//! the module's entry ran, so the shim can re-export them:
//!
//! ```js
//! import init, * as bridge from "./notebridge.js";
//! import appInit from "./scrapnote.js"; // its ace.js shim re-exports bridge
//! await init();
//! const editor = await bridge.boot(appInit);
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect, Uint8Array};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, HtmlElement, Response, Url};

use crate::adapter::EditorAdapter;
use crate::bootstrap::{Sequencer, ShellContext};
use crate::config::ShellSettings;
use crate::environment::{ObjectUrls, ScriptBlob};
use crate::error::{AdapterError, ModuleError, WidgetError};
use crate::keybridge::BridgedKey;
use crate::module::{BinaryModule, ModuleLoader, ModuleManifest};
use crate::widget::{CommandHandler, MonacoEditorHandle, MonacoHost, MonacoLoader};

#[wasm_bindgen]
extern "C" {
    /// A constructed `monaco.editor.IStandaloneCodeEditor`.
    pub type MonacoEditor;

    #[wasm_bindgen(js_namespace = ["monaco", "editor"], js_name = create, catch)]
    fn monaco_create(container: &HtmlElement, options: &JsValue) -> Result<MonacoEditor, JsValue>;

    #[wasm_bindgen(method, js_name = getValue)]
    fn get_value(this: &MonacoEditor) -> String;

    #[wasm_bindgen(method, js_name = setValue)]
    fn set_value(this: &MonacoEditor, value: &str);

    #[wasm_bindgen(method)]
    fn focus(this: &MonacoEditor);

    #[wasm_bindgen(method, js_name = updateOptions)]
    fn update_options(this: &MonacoEditor, options: &JsValue);

    #[wasm_bindgen(method, js_name = addCommand)]
    fn add_command(this: &MonacoEditor, keybinding: u32, handler: &Function, context: &JsValue);

    #[wasm_bindgen(js_name = require)]
    fn amd_require(modules: &Array, on_load: &Function);

    #[wasm_bindgen(js_namespace = require, js_name = config, catch)]
    fn amd_config(config: &JsValue) -> Result<(), JsValue>;
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn to_js(value: &serde_json::Value) -> Result<JsValue, JsValue> {
    js_sys::JSON::parse(&value.to_string())
}

fn not_ready(err: AdapterError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Object URLs backed by the browser's blob store.
#[derive(Debug, Default)]
pub struct WebObjectUrls;

impl ObjectUrls for WebObjectUrls {
    fn create(&self, blob: ScriptBlob) -> Result<String, WidgetError> {
        let parts = Array::of1(&JsValue::from_str(&blob.body));
        let props = BlobPropertyBag::new();
        props.set_type(&blob.mime);
        let blob = Blob::new_with_str_sequence_and_options(&parts, &props)
            .map_err(|err| WidgetError::ObjectUrl(describe(&err)))?;
        Url::create_object_url_with_blob(&blob).map_err(|err| WidgetError::ObjectUrl(describe(&err)))
    }

    fn revoke(&self, url: &str) {
        if let Err(err) = Url::revoke_object_url(url) {
            tracing::warn!(url, err = %describe(&err), "revoking object url failed");
        }
    }
}

impl MonacoEditorHandle for MonacoEditor {
    fn get_value(&self) -> String {
        Self::get_value(self)
    }

    fn set_value(&self, value: &str) {
        Self::set_value(self, value);
    }

    fn focus(&self) {
        Self::focus(self);
    }

    fn update_options(&self, options: &serde_json::Value) {
        match to_js(options) {
            Ok(options) => Self::update_options(self, &options),
            Err(err) => tracing::warn!(err = %describe(&err), "options update dropped"),
        }
    }

    fn add_command(
        &self,
        keybinding: u32,
        context: Option<&str>,
        handler: CommandHandler,
    ) -> Result<(), WidgetError> {
        let context = context.map_or(JsValue::UNDEFINED, JsValue::from_str);
        let handler = Closure::<dyn Fn()>::wrap(handler);
        Self::add_command(self, keybinding, handler.as_ref().unchecked_ref(), &context);
        // Commands live as long as the editor, which lives as long as the page.
        handler.forget();
        Ok(())
    }
}

/// The real page: `window`, the AMD loader and the `monaco` global.
#[derive(Debug, Default)]
pub struct BrowserHost;

impl MonacoHost for BrowserHost {
    type Editor = MonacoEditor;

    fn publish_environment(&self, worker_url: &str) -> Result<(), WidgetError> {
        let window = web_sys::window()
            .ok_or_else(|| WidgetError::WorkerUnavailable("no window".to_string()))?;
        let worker_url = JsValue::from_str(worker_url);
        let get_worker_url =
            Closure::<dyn Fn(JsValue, JsValue) -> JsValue>::new(move |_: JsValue, _: JsValue| {
                worker_url.clone()
            })
            .into_js_value();
        let environment = Object::new();
        Reflect::set(&environment, &"getWorkerUrl".into(), &get_worker_url)
            .and_then(|_| Reflect::set(&window, &"MonacoEnvironment".into(), &environment))
            .map(|_| ())
            .map_err(|err| WidgetError::WorkerUnavailable(describe(&err)))
    }

    fn configure_loader(&self, config: &serde_json::Value) -> Result<(), WidgetError> {
        to_js(config)
            .and_then(|config| amd_config(&config))
            .map_err(|err| WidgetError::ConstructionFailed(describe(&err)))
    }

    async fn load_module(&self, module: &str) -> Result<(), WidgetError> {
        let module = JsValue::from_str(module);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let on_load = Closure::once_into_js(move || {
                let _ = resolve.call0(&JsValue::NULL);
            });
            amd_require(&Array::of1(&module), on_load.unchecked_ref());
        });
        JsFuture::from(promise)
            .await
            .map(|_| ())
            .map_err(|err| WidgetError::ConstructionFailed(describe(&err)))
    }

    fn create_editor(
        &self,
        container: &str,
        options: &serde_json::Value,
    ) -> Result<MonacoEditor, WidgetError> {
        let element = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(container))
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| WidgetError::ContainerMissing(container.to_string()))?;
        let options =
            to_js(options).map_err(|err| WidgetError::ConstructionFailed(describe(&err)))?;
        monaco_create(&element, &options)
            .map_err(|err| WidgetError::ConstructionFailed(describe(&err)))
    }
}

/// How the application module is instantiated.
#[derive(Debug, Clone)]
pub enum ModuleSource {
    /// `WebAssembly.instantiate(bytes, imports)`.
    Imports(Object),
    /// The module's wasm-bindgen `init`, called with the fetched bytes; its
    /// promise resolves to the export object.
    Init(Function),
}

impl ModuleSource {
    /// A function is taken as `init`, an object as the import object, and
    /// anything else as no imports.
    pub fn from_js(value: JsValue) -> Self {
        match value.dyn_into::<Function>() {
            Ok(init) => Self::Init(init),
            Err(value) => Self::Imports(value.dyn_into::<Object>().unwrap_or_default()),
        }
    }

    async fn instantiate(&self, bytes: &[u8]) -> Result<JsValue, JsValue> {
        match self {
            Self::Imports(imports) => {
                let instantiated =
                    JsFuture::from(js_sys::WebAssembly::instantiate_buffer(bytes, imports))
                        .await?;
                Reflect::get(&instantiated, &"instance".into())
                    .and_then(|instance| Reflect::get(&instance, &"exports".into()))
            }
            Self::Init(init) => {
                let options = Object::new();
                Reflect::set(
                    &options,
                    &"module_or_path".into(),
                    &Uint8Array::from(bytes).into(),
                )?;
                let promise = init.call1(&JsValue::NULL, &options)?;
                JsFuture::from(js_sys::Promise::resolve(&promise)).await
            }
        }
    }
}

impl Default for ModuleSource {
    fn default() -> Self {
        Self::Imports(Object::new())
    }
}

/// Fetches and instantiates the application module.
#[derive(Debug)]
pub struct WebModuleLoader {
    entry_name: String,
    source: ModuleSource,
}

impl WebModuleLoader {
    pub fn new(entry_name: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            source: ModuleSource::default(),
        }
    }

    pub fn with_source(mut self, source: ModuleSource) -> Self {
        self.source = source;
        self
    }
}

fn fetch_failed(path: &Path, err: &JsValue) -> ModuleError {
    ModuleError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::other(describe(err)),
    }
}

impl ModuleLoader for WebModuleLoader {
    type Module = WasmModule;

    async fn load(&self, path: &Path) -> Result<Self::Module, ModuleError> {
        let window = web_sys::window().ok_or_else(|| ModuleError::Missing(path.to_path_buf()))?;
        let url = path.to_string_lossy();
        let response: Response = JsFuture::from(window.fetch_with_str(&url))
            .await
            .and_then(JsCast::dyn_into)
            .map_err(|err| fetch_failed(path, &err))?;
        if !response.ok() {
            return Err(ModuleError::Missing(path.to_path_buf()));
        }
        let buffer = response
            .array_buffer()
            .map(JsFuture::from)
            .map_err(|err| fetch_failed(path, &err))?
            .await
            .map_err(|err| fetch_failed(path, &err))?;
        let bytes = Uint8Array::new(&buffer).to_vec();

        let manifest = ModuleManifest::parse(&bytes)?;
        manifest.require_entry(&self.entry_name)?;

        let exports = self
            .source
            .instantiate(&bytes)
            .await
            .map_err(|err| ModuleError::Instantiate(describe(&err)))?;
        tracing::debug!(%url, size = manifest.size, "module instantiated");
        Ok(WasmModule {
            path: path.to_path_buf(),
            entry_name: self.entry_name.clone(),
            exports,
        })
    }
}

/// An instantiated module and its export object.
#[derive(Debug)]
pub struct WasmModule {
    path: PathBuf,
    entry_name: String,
    exports: JsValue,
}

impl BinaryModule for WasmModule {
    fn entry_name(&self) -> &str {
        &self.entry_name
    }

    fn run_entry(&self, shell: &ShellContext) -> Result<(), ModuleError> {
        let failed = |err: &JsValue| ModuleError::EntryFailed {
            name: self.entry_name.clone(),
            reason: describe(err),
        };
        let entry: Function = Reflect::get(&self.exports, &self.entry_name.as_str().into())
            .and_then(JsCast::dyn_into)
            .map_err(|err| failed(&err))?;
        tracing::debug!(
            path = %self.path.display(),
            entry = %self.entry_name,
            page_handles = crate::page::is_installed(),
            stage = ?shell.stage(),
            "running entry"
        );
        entry.call0(&JsValue::NULL).map(|_| ()).map_err(|err| failed(&err))
    }
}

fn forward_keys(mut keys: tokio::sync::mpsc::UnboundedReceiver<BridgedKey>, callback: Function) {
    wasm_bindgen_futures::spawn_local(async move {
        while let Some(key) = keys.recv().await {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_str(&key.target)) {
                tracing::warn!(err = %describe(&err), "escape listener failed");
            }
        }
    });
}

/// The booted page's editor text.
///
/// # Errors
/// `NotReady` before the editor exists.
#[wasm_bindgen(js_name = get_value)]
pub fn page_get_value() -> Result<String, JsValue> {
    crate::page::get_value().map_err(not_ready)
}

/// # Errors
/// `NotReady` before the editor exists.
#[wasm_bindgen(js_name = set_value)]
pub fn page_set_value(text: &str) -> Result<(), JsValue> {
    crate::page::set_value(text).map_err(not_ready)
}

/// # Errors
/// `NotReady` before the editor exists.
#[wasm_bindgen(js_name = focus)]
pub fn page_focus() -> Result<(), JsValue> {
    crate::page::focus().map_err(not_ready)
}

/// # Errors
/// `NotReady` before the editor exists.
#[wasm_bindgen(js_name = set_editable)]
pub fn page_set_editable(editable: bool) -> Result<(), JsValue> {
    crate::page::set_editable(editable).map_err(not_ready)
}

/// Call `callback(containerId)` for every Escape the editor hands back.
///
/// # Errors
/// `NotReady` if no page has started booting.
#[wasm_bindgen(js_name = on_escape)]
pub fn page_on_escape(callback: Function) -> Result<(), JsValue> {
    let keys = crate::page::subscribe_keys()
        .ok_or_else(|| not_ready(AdapterError::NotReady("on_escape")))?;
    forward_keys(keys, callback);
    Ok(())
}

/// The editor operations as seen from page script.
#[wasm_bindgen]
pub struct PageEditor {
    shell: Rc<ShellContext>,
    adapter: EditorAdapter,
}

#[wasm_bindgen]
impl PageEditor {
    #[wasm_bindgen(js_name = getValue)]
    pub fn get_value(&self) -> Result<String, JsValue> {
        self.adapter.get_value().map_err(not_ready)
    }

    #[wasm_bindgen(js_name = setValue)]
    pub fn set_value(&self, text: &str) -> Result<(), JsValue> {
        self.adapter.set_value(text).map_err(not_ready)
    }

    pub fn focus(&self) -> Result<(), JsValue> {
        self.adapter.focus().map_err(not_ready)
    }

    #[wasm_bindgen(js_name = setEditable)]
    pub fn set_editable(&self, editable: bool) -> Result<(), JsValue> {
        self.adapter.set_editable(editable).map_err(not_ready)
    }

    /// Call `callback(containerId)` for every Escape the editor hands back.
    #[wasm_bindgen(js_name = onEscape)]
    pub fn on_escape(&self, callback: Function) {
        forward_keys(self.shell.subscribe_keys(), callback);
    }
}

/// Boot the page with the page defaults.
///
/// `module` is the application module's wasm-bindgen `init` function, or
/// the import object for a plain `WebAssembly.instantiate`; `undefined`
/// instantiates without imports.
///
/// # Errors
/// The bootstrap failure, as a string.
#[wasm_bindgen]
pub async fn boot(module: JsValue) -> Result<PageEditor, JsValue> {
    let settings = ShellSettings::for_page();
    let shell = Rc::new(ShellContext::new());
    let sequencer = Sequencer::new(
        Rc::clone(&shell),
        WebModuleLoader::new(settings.entry.clone()).with_source(ModuleSource::from_js(module)),
        MonacoLoader::new(BrowserHost),
    )
    .with_settings(settings)
    .with_object_urls(Rc::new(WebObjectUrls));
    let adapter = sequencer
        .run()
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(PageEditor { shell, adapter })
}
