//! Typed service map injected into request handling.
//!
//! Content behaviors resolve optional collaborators (for example
//! [`JsonOptions`]) from here. A missing entry is not an error, callers fall
//! back to defaults.

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default, Clone)]
pub struct ServiceMap {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the instance for type `T`.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ServiceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceMap")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Serializer settings used by JSON content.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonOptions {
    /// Emit indented JSON
    #[serde(default)]
    pub pretty: bool,
}
