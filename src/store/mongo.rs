use futures::TryStreamExt;
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppResult;
use crate::store::filter::{Filter, Patch};
use crate::store::{Atomicity, BulkInsert, FindOptions, Page, SortDir};

/// Mongo-backed collection. `transactional` is decided at connection time
/// (replica-set deployments only) and surfaces through the `atomicity` flag
/// of bulk inserts rather than downgrading silently.
pub struct MongoCollection<T: Send + Sync> {
    client: Client,
    collection: Collection<T>,
    transactional: bool,
}

impl<T: Send + Sync> Clone for MongoCollection<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            collection: self.collection.clone(),
            transactional: self.transactional,
        }
    }
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + Unpin,
{
    pub fn new(client: Client, collection: Collection<T>, transactional: bool) -> Self {
        Self {
            client,
            collection,
            transactional,
        }
    }

    pub async fn get_one(&self, filter: &Filter) -> AppResult<Option<T>> {
        Ok(self.collection.find_one(filter.to_document()).await?)
    }

    pub async fn get_many(&self, filter: &Filter, options: &FindOptions) -> AppResult<Page<T>> {
        let query = filter.to_document();
        let total = self.collection.count_documents(query.clone()).await?;

        let mut find = self.collection.find(query);
        if let Some((field, dir)) = &options.sort {
            let direction: i32 = match dir {
                SortDir::Asc => 1,
                SortDir::Desc => -1,
            };
            let mut sort = mongodb::bson::Document::new();
            sort.insert(field, direction);
            find = find.sort(sort);
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(limit);
        }

        let data = find.await?.try_collect().await?;
        Ok(Page { data, total })
    }

    pub async fn create(&self, data: T, unique_filter: Option<&Filter>) -> AppResult<Option<T>> {
        if let Some(unique) = unique_filter
            && self
                .collection
                .find_one(unique.to_document())
                .await?
                .is_some()
        {
            return Ok(None);
        }
        self.collection.insert_one(&data).await?;
        Ok(Some(data))
    }

    pub async fn update(&self, filter: &Filter, patch: &Patch) -> AppResult<Option<T>> {
        Ok(self
            .collection
            .find_one_and_update(filter.to_document(), patch.to_document())
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn replace(&self, filter: &Filter, data: &T) -> AppResult<Option<T>> {
        Ok(self
            .collection
            .find_one_and_replace(filter.to_document(), data)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn update_many(&self, filter: &Filter, patch: &Patch) -> AppResult<u64> {
        let result = self
            .collection
            .update_many(filter.to_document(), patch.to_document())
            .await?;
        Ok(result.modified_count)
    }

    pub async fn delete(&self, filter: &Filter) -> AppResult<Option<T>> {
        Ok(self
            .collection
            .find_one_and_delete(filter.to_document())
            .await?)
    }

    pub async fn delete_many(&self, filter: &Filter) -> AppResult<u64> {
        let result = self.collection.delete_many(filter.to_document()).await?;
        Ok(result.deleted_count)
    }

    pub async fn count(&self, filter: &Filter) -> AppResult<u64> {
        Ok(self.collection.count_documents(filter.to_document()).await?)
    }

    pub async fn insert_many(&self, items: &[T]) -> AppResult<BulkInsert> {
        if !self.transactional {
            let result = self.collection.insert_many(items).await?;
            return Ok(BulkInsert {
                inserted: result.inserted_ids.len(),
                atomicity: Atomicity::BestEffort,
            });
        }

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        match self
            .collection
            .insert_many(items)
            .session(&mut session)
            .await
        {
            Ok(result) => {
                session.commit_transaction().await?;
                Ok(BulkInsert {
                    inserted: result.inserted_ids.len(),
                    atomicity: Atomicity::Transactional,
                })
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "failed to abort bulk insert transaction");
                }
                Err(err.into())
            }
        }
    }
}
