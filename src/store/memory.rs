use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppResult;
use crate::store::filter::{Filter, Patch};
use crate::store::{Atomicity, BulkInsert, FindOptions, Page, SortDir};

/// In-process backend holding documents as serialized JSON. Every operation
/// runs under a single lock acquisition, so conditional updates are atomic
/// the same way a single findAndModify is on the server.
pub struct MemoryCollection<T> {
    documents: Arc<RwLock<Vec<Value>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for MemoryCollection<T> {
    fn clone(&self) -> Self {
        Self {
            documents: Arc::clone(&self.documents),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
            _marker: PhantomData,
        }
    }
}

impl<T> MemoryCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.documents.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.documents.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_one(&self, filter: &Filter) -> AppResult<Option<T>> {
        let docs = self.read();
        for doc in docs.iter() {
            if filter.matches(doc) {
                return Ok(Some(serde_json::from_value(doc.clone())?));
            }
        }
        Ok(None)
    }

    pub fn get_many(&self, filter: &Filter, options: &FindOptions) -> AppResult<Page<T>> {
        let docs = self.read();
        let mut matching: Vec<&Value> = docs.iter().filter(|doc| filter.matches(doc)).collect();
        let total = matching.len() as u64;

        if let Some((field, dir)) = &options.sort {
            matching.sort_by(|a, b| {
                let ordering = compare_fields(a.get(field), b.get(field));
                match dir {
                    SortDir::Asc => ordering,
                    SortDir::Desc => ordering.reverse(),
                }
            });
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = options.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        let data = matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| serde_json::from_value(doc.clone()))
            .collect::<Result<Vec<T>, _>>()?;

        Ok(Page { data, total })
    }

    pub fn create(&self, data: T, unique_filter: Option<&Filter>) -> AppResult<Option<T>> {
        let mut docs = self.write();
        if let Some(unique) = unique_filter
            && docs.iter().any(|doc| unique.matches(doc))
        {
            return Ok(None);
        }
        docs.push(serde_json::to_value(&data)?);
        Ok(Some(data))
    }

    pub fn update(&self, filter: &Filter, patch: &Patch) -> AppResult<Option<T>> {
        let mut docs = self.write();
        for doc in docs.iter_mut() {
            if filter.matches(doc) {
                patch.apply(doc);
                return Ok(Some(serde_json::from_value(doc.clone())?));
            }
        }
        Ok(None)
    }

    pub fn replace(&self, filter: &Filter, data: &T) -> AppResult<Option<T>> {
        let mut docs = self.write();
        let replacement = serde_json::to_value(data)?;
        if let Some(doc) = docs.iter_mut().find(|doc| filter.matches(doc)) {
            *doc = replacement.clone();
        } else {
            docs.push(replacement.clone());
        }
        Ok(Some(serde_json::from_value(replacement)?))
    }

    pub fn update_many(&self, filter: &Filter, patch: &Patch) -> AppResult<u64> {
        let mut docs = self.write();
        let mut modified = 0;
        for doc in docs.iter_mut() {
            if filter.matches(doc) {
                patch.apply(doc);
                modified += 1;
            }
        }
        Ok(modified)
    }

    pub fn delete(&self, filter: &Filter) -> AppResult<Option<T>> {
        let mut docs = self.write();
        if let Some(index) = docs.iter().position(|doc| filter.matches(doc)) {
            let removed = docs.remove(index);
            return Ok(Some(serde_json::from_value(removed)?));
        }
        Ok(None)
    }

    pub fn delete_many(&self, filter: &Filter) -> AppResult<u64> {
        let mut docs = self.write();
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    pub fn count(&self, filter: &Filter) -> AppResult<u64> {
        let docs = self.read();
        Ok(docs.iter().filter(|doc| filter.matches(doc)).count() as u64)
    }

    pub fn insert_many(&self, items: &[T]) -> AppResult<BulkInsert> {
        let values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        let mut docs = self.write();
        let inserted = values.len();
        docs.extend(values);
        Ok(BulkInsert {
            inserted,
            atomicity: Atomicity::Transactional,
        })
    }
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                a.cmp(&b)
            } else if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
                a.cmp(b)
            } else {
                Ordering::Equal
            }
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
