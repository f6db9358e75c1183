//! Backend, collection and field metadata.
//!
//! The catalog is computed once from the backends and then shared
//! read-only by the compiler, executor and assembler.

use crate::core::types::{BackendId, CollectionId};
use serde::{Deserialize, Serialize};

/// Value type of a metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Date,
    Number,
}

/// A metadata field declared by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Searchable only where business fields are enabled
    #[serde(default)]
    pub business: bool,
}

impl FieldDescriptor {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text,
            business: false,
        }
    }

    pub fn date(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Date,
            business: false,
        }
    }

    pub fn number(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Number,
            business: false,
        }
    }

    pub fn business(mut self) -> Self {
        self.business = true;
        self
    }
}

/// An authorization-scoped subset of a backend's records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub id: CollectionId,
    pub name: String,
}

/// Metadata of one backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: BackendId,
    pub name: String,
    #[serde(default)]
    pub collections: Vec<CollectionDescriptor>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl BackendDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn has_collection(&self, collection: CollectionId) -> bool {
        self.collections.iter().any(|c| c.id == collection)
    }
}

/// All known backends, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCatalog {
    backends: Vec<BackendDescriptor>,
}

impl BackendCatalog {
    pub fn new(backends: Vec<BackendDescriptor>) -> Self {
        Self { backends }
    }

    pub fn backends(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    pub fn backend_ids(&self) -> Vec<BackendId> {
        self.backends.iter().map(|b| b.id).collect()
    }

    pub fn get(&self, id: BackendId) -> Option<&BackendDescriptor> {
        self.backends.iter().find(|b| b.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Backend owning a collection
    pub fn backend_of(&self, collection: CollectionId) -> Option<BackendId> {
        self.backends
            .iter()
            .find(|b| b.has_collection(collection))
            .map(|b| b.id)
    }

    /// True when the backend exists and owns the collection
    pub fn resolves(&self, backend: BackendId, collection: CollectionId) -> bool {
        self.get(backend)
            .map(|b| b.has_collection(collection))
            .unwrap_or(false)
    }

    /// Collections of `backend` the caller may see, in backend order
    pub fn authorized_collections(
        &self,
        backend: BackendId,
        allowed: &[CollectionId],
    ) -> Vec<CollectionId> {
        self.get(backend)
            .map(|b| {
                b.collections
                    .iter()
                    .filter(|c| allowed.contains(&c.id))
                    .map(|c| c.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct date field names across all backends
    pub fn date_fields(&self) -> Vec<String> {
        self.distinct_fields(|kind| kind == FieldKind::Date)
    }

    /// Distinct sortable (date or number) field names across all backends
    pub fn sort_fields(&self) -> Vec<String> {
        self.distinct_fields(|kind| matches!(kind, FieldKind::Date | FieldKind::Number))
    }

    fn distinct_fields(&self, keep: impl Fn(FieldKind) -> bool) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for field in self.backends.iter().flat_map(|b| b.fields.iter()) {
            if keep(field.kind) && !names.contains(&field.name) {
                names.push(field.name.clone());
            }
        }
        names
    }
}
