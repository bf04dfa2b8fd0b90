//! Filter-based repository over the document store, with a Mongo backend for
//! deployments and an in-process backend for tests and local tooling.

mod filter;
mod memory;
mod mongo;

pub use filter::{FieldValue, Filter, Patch};
pub use memory::MemoryCollection;
pub use mongo::MongoCollection;

use mongodb::{Client, Database};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortDir)>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn sorted(field: impl Into<String>, dir: SortDir) -> Self {
        Self {
            sort: Some((field.into(), dir)),
            ..Self::default()
        }
    }

    pub fn paginate(mut self, skip: u64, limit: i64) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
}

/// Whether a bulk insert ran inside a server transaction. Callers that need
/// all-or-nothing semantics must check this instead of assuming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atomicity {
    Transactional,
    BestEffort,
}

impl Serialize for Atomicity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Atomicity::Transactional => serializer.serialize_str("transactional"),
            Atomicity::BestEffort => serializer.serialize_str("best-effort"),
        }
    }
}

#[derive(Debug)]
pub struct BulkInsert {
    pub inserted: usize,
    pub atomicity: Atomicity,
}

/// One logical collection; the variant is picked once at state construction.
pub enum Repository<T: Send + Sync> {
    Mongo(MongoCollection<T>),
    Memory(MemoryCollection<T>),
}

impl<T: Send + Sync> Clone for Repository<T> {
    fn clone(&self) -> Self {
        match self {
            Repository::Mongo(c) => Repository::Mongo(c.clone()),
            Repository::Memory(c) => Repository::Memory(c.clone()),
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin,
{
    pub fn mongo(client: Client, db: &Database, name: &str, transactional: bool) -> Self {
        Repository::Mongo(MongoCollection::new(client, db.collection(name), transactional))
    }

    pub fn in_memory() -> Self {
        Repository::Memory(MemoryCollection::new())
    }

    pub async fn get_one(&self, filter: Filter) -> AppResult<Option<T>> {
        match self {
            Repository::Mongo(c) => c.get_one(&filter).await,
            Repository::Memory(c) => c.get_one(&filter),
        }
    }

    pub async fn get_many(&self, filter: Filter, options: FindOptions) -> AppResult<Page<T>> {
        match self {
            Repository::Mongo(c) => c.get_many(&filter, &options).await,
            Repository::Memory(c) => c.get_many(&filter, &options),
        }
    }

    /// Inserts `data` unless `unique_filter` already matches an existing
    /// document, in which case `None` is returned and nothing is written.
    pub async fn create(&self, data: T, unique_filter: Option<Filter>) -> AppResult<Option<T>> {
        match self {
            Repository::Mongo(c) => c.create(data, unique_filter.as_ref()).await,
            Repository::Memory(c) => c.create(data, unique_filter.as_ref()),
        }
    }

    /// Single-document conditional update; returns the post-image, or `None`
    /// when no document matched the filter. Atomic on both backends.
    pub async fn update(&self, filter: Filter, patch: Patch) -> AppResult<Option<T>> {
        match self {
            Repository::Mongo(c) => c.update(&filter, &patch).await,
            Repository::Memory(c) => c.update(&filter, &patch),
        }
    }

    /// Upsert-by-filter with a full replacement document.
    pub async fn replace(&self, filter: Filter, data: &T) -> AppResult<Option<T>> {
        match self {
            Repository::Mongo(c) => c.replace(&filter, data).await,
            Repository::Memory(c) => c.replace(&filter, data),
        }
    }

    pub async fn update_many(&self, filter: Filter, patch: Patch) -> AppResult<u64> {
        match self {
            Repository::Mongo(c) => c.update_many(&filter, &patch).await,
            Repository::Memory(c) => c.update_many(&filter, &patch),
        }
    }

    pub async fn delete(&self, filter: Filter) -> AppResult<Option<T>> {
        match self {
            Repository::Mongo(c) => c.delete(&filter).await,
            Repository::Memory(c) => c.delete(&filter),
        }
    }

    pub async fn delete_many(&self, filter: Filter) -> AppResult<u64> {
        match self {
            Repository::Mongo(c) => c.delete_many(&filter).await,
            Repository::Memory(c) => c.delete_many(&filter),
        }
    }

    pub async fn count(&self, filter: Filter) -> AppResult<u64> {
        match self {
            Repository::Mongo(c) => c.count(&filter).await,
            Repository::Memory(c) => c.count(&filter),
        }
    }

    pub async fn insert_many(&self, items: &[T]) -> AppResult<BulkInsert> {
        match self {
            Repository::Mongo(c) => c.insert_many(items).await,
            Repository::Memory(c) => c.insert_many(items),
        }
    }
}
