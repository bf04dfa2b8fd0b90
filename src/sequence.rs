use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use mongodb::bson::doc;
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub name: String,
    pub seq: i64,
}

/// Named monotonic counters for generated codes. The Mongo variant uses a
/// single upsert-increment, so codes stay collision-free under concurrent
/// callers.
#[derive(Clone)]
pub enum SequenceGenerator {
    Mongo(Collection<Counter>),
    Memory(Arc<Mutex<HashMap<String, i64>>>),
}

impl SequenceGenerator {
    pub fn mongo(db: &Database) -> Self {
        SequenceGenerator::Mongo(db.collection("counters"))
    }

    pub fn in_memory() -> Self {
        SequenceGenerator::Memory(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Returns the next zero-padded code for `prefix`, e.g. `"PE000123"`.
    pub async fn generate_code(&self, prefix: &str, min_pad: usize) -> AppResult<String> {
        let seq = match self {
            SequenceGenerator::Mongo(counters) => counters
                .find_one_and_update(doc! { "_id": prefix }, doc! { "$inc": { "seq": 1_i64 } })
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await?
                .map(|counter| counter.seq)
                .ok_or_else(|| {
                    AppError::Internal(anyhow!("counter upsert returned no document"))
                })?,
            SequenceGenerator::Memory(counters) => {
                let mut counters = counters.lock().await;
                let entry = counters.entry(prefix.to_string()).or_insert(0);
                *entry += 1;
                *entry
            }
        };
        Ok(format!("{prefix}{seq:0min_pad$}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn codes_are_prefixed_padded_and_monotonic() {
        let sequences = SequenceGenerator::in_memory();
        assert_eq!(sequences.generate_code("PE", 6).await.unwrap(), "PE000001");
        assert_eq!(sequences.generate_code("PE", 6).await.unwrap(), "PE000002");
        assert_eq!(sequences.generate_code("PS", 6).await.unwrap(), "PS000001");
    }

    #[tokio::test]
    async fn padding_does_not_truncate_large_sequences() {
        let sequences = SequenceGenerator::in_memory();
        for _ in 0..1233 {
            sequences.generate_code("X", 2).await.unwrap();
        }
        assert_eq!(sequences.generate_code("X", 2).await.unwrap(), "X1234");
    }
}
