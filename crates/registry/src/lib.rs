//! Process-wide cache of loaded shared libraries, plus typed imports
//! for the two kinds of plugin this crate knows how to bind: stage
//! factories and task callbacks.
//!
//! Every `unsafe` operation in this crate funnels through `Library`
//! loading, raw symbol lookup, and the `Box::from_raw` recovery of a
//! plugin-exported trait object — this module is the crate's sole
//! unsafe boundary.

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CString};
use std::sync::{Arc, Mutex, OnceLock};

use libloading::{Library, Symbol};
use object::Object;

use dagflow_core::stage::TaskStage;
use dagflow_core::task::TaskCallbackPlugin;

type CallbackFnSymbol = unsafe extern "C" fn(bool);

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to load library {path}: {source}")]
    LoadFailed { path: String, source: libloading::Error },

    #[error("symbol {name} not found in {path} (available: {available:?})")]
    SymbolNotFound {
        path: String,
        name: String,
        available: Vec<String>,
    },
}

/// Namespaces the exported-symbol naming convention a library is
/// expected to follow: `dagflow_stage_<name>` or `dagflow_taskcb_<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    TaskCb,
    Stages,
}

impl Section {
    fn symbol_name(self, name: &str) -> String {
        match self {
            Section::TaskCb => format!("dagflow_taskcb_{name}"),
            Section::Stages => format!("dagflow_stage_{name}"),
        }
    }
}

/// Lists the exported symbol names a shared library advertises, for
/// embedding in a `SymbolNotFound` error. Reads the library file
/// straight off disk with `object` (the same binary-format reader the
/// pack's other plugin-loading code uses) rather than through
/// `libloading`, which has no symbol-enumeration API of its own.
/// Returns an empty list if the file can't be read or parsed as a
/// recognized object format — the caller already knows the library
/// loaded successfully, so this is best-effort diagnostics, not a
/// second load attempt.
fn available_exports(path: &str) -> Vec<String> {
    let Ok(data) = std::fs::read(path) else {
        return Vec::new();
    };
    let Ok(file) = object::File::parse(&*data) else {
        return Vec::new();
    };
    match file.exports() {
        Ok(exports) => exports
            .iter()
            .map(|export| String::from_utf8_lossy(export.name()).into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn registry() -> &'static Mutex<HashMap<String, Arc<Library>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Library>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// A cheap, cloneable reference to a loaded library. Libraries are
/// never unloaded once registered; handles simply outlive the point
/// they were imported from for the remainder of the process.
#[derive(Clone)]
pub struct LibraryHandle {
    path: String,
    lib: Arc<Library>,
}

impl LibraryHandle {
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Loads `path`, or returns the cached handle if it was already
/// loaded by an earlier call.
pub fn register(path: &str) -> Result<LibraryHandle, RegistryError> {
    let mut guard = registry().lock().expect("registry mutex poisoned");
    if let Some(lib) = guard.get(path) {
        tracing::debug!(path, "library already loaded, reusing handle");
        return Ok(LibraryHandle {
            path: path.to_string(),
            lib: Arc::clone(lib),
        });
    }

    tracing::debug!(path, "loading library");
    let lib = unsafe { Library::new(path) }.map_err(|source| RegistryError::LoadFailed {
        path: path.to_string(),
        source,
    })?;
    let lib = Arc::new(lib);
    guard.insert(path.to_string(), Arc::clone(&lib));
    Ok(LibraryHandle {
        path: path.to_string(),
        lib,
    })
}

/// Attempts to resolve `name` in `section` without keeping the symbol
/// alive; used to verify a plugin is present before committing to an
/// import.
pub fn resolve(handle: &LibraryHandle, section: Section, name: &str) -> bool {
    let symbol_name = section.symbol_name(name);
    let found = unsafe { handle.lib.get::<*const ()>(symbol_name.as_bytes()) }.is_ok();
    if !found {
        tracing::warn!(path = handle.path(), symbol = symbol_name, "symbol not found");
    }
    found
}

type StageCtor = unsafe extern "C" fn(*const c_char) -> *mut c_void;
type CallbackPluginCtor = unsafe extern "C" fn() -> *mut c_void;

/// A typed handle to an imported `dagflow_stage_<name>` export,
/// callable to construct fresh stage instances.
pub struct StageFactory {
    library: Arc<Library>,
    ctor: StageCtor,
    name: String,
}

impl StageFactory {
    /// Invokes the exported constructor with `label`, then recovers
    /// the boxed trait object the plugin handed back across the FFI
    /// boundary.
    pub fn create(&self, label: &str) -> Box<dyn TaskStage> {
        let c_label = CString::new(label).unwrap_or_else(|_| CString::new("stage").unwrap());
        let raw = unsafe { (self.ctor)(c_label.as_ptr()) };
        let boxed: Box<Box<dyn TaskStage>> = unsafe { Box::from_raw(raw as *mut Box<dyn TaskStage>) };
        *boxed
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A typed handle to an imported `dagflow_taskcb_<name>` plugin
/// export, callable to construct fresh callback instances.
pub struct CallbackBinding {
    library: Arc<Library>,
    ctor: CallbackPluginCtor,
    name: String,
}

impl CallbackBinding {
    pub fn create(&self) -> Box<dyn TaskCallbackPlugin> {
        let raw = unsafe { (self.ctor)() };
        let boxed: Box<Box<dyn TaskCallbackPlugin>> =
            unsafe { Box::from_raw(raw as *mut Box<dyn TaskCallbackPlugin>) };
        *boxed
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub fn import_stage_factory(handle: &LibraryHandle, name: &str) -> Result<StageFactory, RegistryError> {
    let symbol_name = Section::Stages.symbol_name(name);
    let ctor: StageCtor = unsafe {
        let symbol: Symbol<StageCtor> =
            handle
                .lib
                .get(symbol_name.as_bytes())
                .map_err(|_| RegistryError::SymbolNotFound {
                    path: handle.path.clone(),
                    name: symbol_name.clone(),
                    available: available_exports(&handle.path),
                })?;
        *symbol
    };
    Ok(StageFactory {
        library: Arc::clone(&handle.lib),
        ctor,
        name: name.to_string(),
    })
}

/// Imports a `void(bool)` function-pointer export from the `TaskCb`
/// section (the `Function` callback type, as opposed to `Plugin`).
pub fn import_callback_function(
    handle: &LibraryHandle,
    name: &str,
) -> Result<Arc<dyn Fn(bool) + Send + Sync>, RegistryError> {
    let symbol_name = Section::TaskCb.symbol_name(name);
    let func: CallbackFnSymbol = unsafe {
        let symbol: Symbol<CallbackFnSymbol> =
            handle
                .lib
                .get(symbol_name.as_bytes())
                .map_err(|_| RegistryError::SymbolNotFound {
                    path: handle.path.clone(),
                    name: symbol_name.clone(),
                    available: available_exports(&handle.path),
                })?;
        *symbol
    };
    Ok(Arc::new(move |status: bool| unsafe { func(status) }))
}

pub fn import_callback(handle: &LibraryHandle, name: &str) -> Result<CallbackBinding, RegistryError> {
    let symbol_name = Section::TaskCb.symbol_name(name);
    let ctor: CallbackPluginCtor = unsafe {
        let symbol: Symbol<CallbackPluginCtor> =
            handle
                .lib
                .get(symbol_name.as_bytes())
                .map_err(|_| RegistryError::SymbolNotFound {
                    path: handle.path.clone(),
                    name: symbol_name.clone(),
                    available: available_exports(&handle.path),
                })?;
        *symbol
    };
    Ok(CallbackBinding {
        library: Arc::clone(&handle.lib),
        ctor,
        name: name.to_string(),
    })
}
