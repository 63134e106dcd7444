use crate::{compiler::compile, error::CompileError};
use keel_schema::{Schema, TypeDesc};

use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};
use tracing::trace;

struct Entry {
    // Holding the description keeps its address from being reused.
    _key:   Arc<TypeDesc>,
    result: Result<Arc<Schema>, CompileError>,
}

/// Compiled schemas keyed by the identity of their type description.
///
/// Compiling the same `Arc<TypeDesc>` twice returns the same `Arc<Schema>`.
/// Failures are cached too, so a bad description is reported with the same
/// error on every use without recompiling.
#[derive(Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<usize, Entry>>,
}

fn key(desc: &Arc<TypeDesc>) -> usize {
    Arc::as_ptr(desc) as usize
}

impl SchemaCache {
    pub fn new() -> SchemaCache {
        SchemaCache::default()
    }

    pub fn get_or_compile(&self, desc: &Arc<TypeDesc>) -> Result<Arc<Schema>, CompileError> {
        let id = key(desc);
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&id) {
                trace!(ty = %desc, "schema cache hit");
                return entry.result.clone();
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have compiled it between the two locks.
        if let Some(entry) = entries.get(&id) {
            trace!(ty = %desc, "schema cache hit");
            return entry.result.clone();
        }
        trace!(ty = %desc, "schema cache miss");
        let result = compile(desc).map(Arc::new);
        entries.insert(
            id,
            Entry {
                _key:   desc.clone(),
                result: result.clone(),
            },
        );
        result
    }

    /// Drops the cached schema for `desc`, returning whether one was present.
    pub fn remove(&self, desc: &Arc<TypeDesc>) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key(desc))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    static ref GLOBAL: SchemaCache = SchemaCache::new();
}

/// The process-wide cache used by the top-level `decode`/`encode` helpers.
pub fn global_cache() -> &'static SchemaCache {
    &GLOBAL
}
