//! In-memory registry of generated CSS modules.
//!
//! Entries are grouped per source file and replaced wholesale every time that
//! file is transformed again, so incremental rebuilds never see stale CSS.

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxHashSet, FxHasher};

use crate::hash::hash;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Prefix of the import form of every virtual CSS module.
pub const VIRTUAL_PREFIX: &str = "virtual:styled-static/";
/// Bundler convention marking an id as owned by a plugin.
const CANONICAL_MARKER: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssModuleEntry {
    /// Import form, as written into transformed code.
    pub virtual_id: String,
    pub css: String,
    /// [`hash`] of `css`; lets injected styles skip no-op updates.
    pub content_hash: String,
    pub source_file: String,
    pub emission_index: usize,
}

/// Normalize bundler/debugger style ids to a plain forward-slash path.
pub fn normalize_source_id(id: &str) -> String {
    let id = id.trim_start_matches(CANONICAL_MARKER);
    let id = id.split_once('?').map_or(id, |(path, _)| path);
    let mut s = id.replace('\\', "/");
    if let Some(rest) = s.strip_prefix("file:///") {
        s = format!("/{rest}");
    } else if let Some(rest) = s.strip_prefix("file://") {
        s = rest.to_string();
    }
    s
}

/// `virtual:styled-static/<path>/<index>.css`; unique per `(file, index)` and
/// identical across re-transforms of the same file.
pub fn virtual_id(source_file: &str, index: usize) -> String {
    format!(
        "{VIRTUAL_PREFIX}{}/{index}.css",
        normalize_source_id(source_file).trim_start_matches('/')
    )
}

pub fn is_virtual_id(id: &str) -> bool {
    id.trim_start_matches(CANONICAL_MARKER).starts_with(VIRTUAL_PREFIX)
}

/// Import form -> canonical form (`\0`-prefixed). Already canonical ids are
/// returned unchanged.
pub fn canonical_id(id: &str) -> Option<String> {
    if !is_virtual_id(id) {
        return None;
    }
    let import = id.trim_start_matches(CANONICAL_MARKER);
    let import = import.split_once('?').map_or(import, |(path, _)| path);
    Some(format!("{CANONICAL_MARKER}{import}"))
}

/// Canonical or import form -> import form.
fn import_id(id: &str) -> &str {
    id.trim_start_matches(CANONICAL_MARKER)
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Entries per normalized source file, in emission order.
    files: FxIndexMap<String, Vec<CssModuleEntry>>,
}

impl RegistryState {
    fn find(&self, id: &str) -> Option<&CssModuleEntry> {
        let id = import_id(id);
        self.files.values().flatten().find(|e| e.virtual_id == id)
    }
}

/// Owned by one build session; shared across worker threads behind a mutex.
#[derive(Debug, Default)]
pub struct CssRegistry {
    state: Mutex<RegistryState>,
}

impl CssRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite the module at `index` for `source_file`.
    pub fn register(&self, source_file: &str, index: usize, css: String) -> String {
        let source_file = normalize_source_id(source_file);
        let entry = CssModuleEntry {
            virtual_id: virtual_id(&source_file, index),
            content_hash: hash(&css),
            css,
            source_file: source_file.clone(),
            emission_index: index,
        };
        let id = entry.virtual_id.clone();
        log::trace!("register {id}");

        let mut state = self.state.lock();
        let entries = state.files.entry(source_file).or_default();
        match entries.iter_mut().find(|e| e.emission_index == index) {
            Some(existing) => *existing = entry,
            None => {
                entries.push(entry);
                entries.sort_by_key(|e| e.emission_index);
            }
        }
        id
    }

    /// Drop every previous entry of `source_file` and register `css` in
    /// order, under one lock. Returns the new virtual ids.
    pub fn replace_file(&self, source_file: &str, css: Vec<String>) -> Vec<String> {
        let source_file = normalize_source_id(source_file);
        let entries: Vec<CssModuleEntry> = css
            .into_iter()
            .enumerate()
            .map(|(index, css)| CssModuleEntry {
                virtual_id: virtual_id(&source_file, index),
                content_hash: hash(&css),
                css,
                source_file: source_file.clone(),
                emission_index: index,
            })
            .collect();
        let ids = entries.iter().map(|e| e.virtual_id.clone()).collect();

        let mut state = self.state.lock();
        if entries.is_empty() {
            state.files.shift_remove(&source_file);
        } else {
            log::trace!("replace {} css modules of {source_file}", entries.len());
            state.files.insert(source_file, entries);
        }
        ids
    }

    pub fn load(&self, id: &str) -> Option<String> {
        self.state.lock().find(id).map(|e| e.css.clone())
    }

    pub fn entry(&self, id: &str) -> Option<CssModuleEntry> {
        self.state.lock().find(id).cloned()
    }

    /// Remove all entries of `source_file`, returning their canonical ids.
    pub fn invalidate(&self, source_file: &str) -> Vec<String> {
        let source_file = normalize_source_id(source_file);
        let removed = self.state.lock().files.shift_remove(&source_file);
        let ids: Vec<String> = removed
            .unwrap_or_default()
            .into_iter()
            .map(|e| format!("{CANONICAL_MARKER}{}", e.virtual_id))
            .collect();
        if !ids.is_empty() {
            log::trace!("invalidated {} css modules of {source_file}", ids.len());
        }
        ids
    }

    pub fn entries_for(&self, source_file: &str) -> Vec<CssModuleEntry> {
        let source_file = normalize_source_id(source_file);
        self.state
            .lock()
            .files
            .get(&source_file)
            .cloned()
            .unwrap_or_default()
    }

    /// Concatenate the CSS of every module a chunk is built from. `module_ids`
    /// may name source files or virtual modules; output follows their order
    /// and each module appears once.
    pub fn aggregate_by_output_chunk<S: AsRef<str>>(&self, module_ids: &[S]) -> String {
        let state = self.state.lock();
        let mut seen = FxHashSet::default();
        let mut parts = Vec::new();
        for id in module_ids {
            let id = id.as_ref();
            if is_virtual_id(id) {
                if let Some(entry) = state.find(id) {
                    if seen.insert(entry.virtual_id.as_str()) {
                        parts.push(entry.css.as_str());
                    }
                }
                continue;
            }
            if let Some(entries) = state.files.get(&normalize_source_id(id)) {
                for entry in entries {
                    if seen.insert(entry.virtual_id.as_str()) {
                        parts.push(entry.css.as_str());
                    }
                }
            }
        }
        parts.join("\n")
    }

    /// Number of registered modules across all files.
    pub fn len(&self) -> usize {
        self.state.lock().files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything; used when the build session ends.
    pub fn clear(&self) {
        self.state.lock().files.clear();
    }
}
