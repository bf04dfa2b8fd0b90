//! Object storage wrapper. Multi-step operations stage their uploads under a
//! session prefix and only rename into place once every store write has
//! succeeded, so a failed operation never strands files at final paths.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub file_name: String,
    pub key: String,
}

#[derive(Clone)]
pub enum ObjectStorage {
    S3(Arc<AmazonS3>),
    LocalFs(Arc<LocalFileSystem>),
    Memory(Arc<InMemory>),
}

impl ObjectStorage {
    pub fn in_memory() -> Self {
        ObjectStorage::Memory(Arc::new(InMemory::new()))
    }

    pub fn as_generic(&self) -> Arc<dyn ObjectStore> {
        match self {
            ObjectStorage::S3(store) => store.clone() as Arc<dyn ObjectStore>,
            ObjectStorage::LocalFs(store) => store.clone() as Arc<dyn ObjectStore>,
            ObjectStorage::Memory(store) => store.clone() as Arc<dyn ObjectStore>,
        }
    }

    pub async fn upload_single_file(
        &self,
        file: &FileUpload,
        folder_path: &str,
        distinctive_id: &str,
    ) -> AppResult<UploadedFile> {
        let key = object_key(folder_path, distinctive_id, &file.file_name);
        put_object(&self.as_generic(), &Path::from(key.clone()), file).await?;
        Ok(UploadedFile {
            file_name: file.file_name.clone(),
            key,
        })
    }

    pub async fn upload_multiple_files(
        &self,
        files: &[FileUpload],
        folder_path: &str,
        distinctive_id: &str,
    ) -> AppResult<Vec<UploadedFile>> {
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            uploaded.push(
                self.upload_single_file(file, folder_path, distinctive_id)
                    .await?,
            );
        }
        Ok(uploaded)
    }

    /// Best-effort recursive delete of one folder; failures are logged and
    /// swallowed.
    pub async fn delete_folder(&self, folder_path: &str, distinctive_id: &str) {
        let prefix = Path::from(format!("{distinctive_id}/{folder_path}"));
        if let Err(err) = delete_prefix(&self.as_generic(), &prefix).await {
            tracing::warn!(error = %err, prefix = %prefix, "folder delete failed");
        }
    }

    /// Whether an object exists at `key`. Mainly useful for tooling and tests.
    pub async fn contains(&self, key: &str) -> bool {
        self.as_generic().head(&Path::from(key)).await.is_ok()
    }
}

/// Tracks uploads for one multi-step operation. Files land under
/// `staging/<session>/...` until `commit` renames them to their final keys;
/// `abort` sweeps the staging prefix.
pub struct UploadSession {
    storage: ObjectStorage,
    session_id: Uuid,
    staged: Vec<(Path, Path)>,
}

impl UploadSession {
    pub fn new(storage: &ObjectStorage) -> Self {
        Self {
            storage: storage.clone(),
            session_id: Uuid::new_v4(),
            staged: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub async fn stage_file(
        &mut self,
        file: &FileUpload,
        folder_path: &str,
        distinctive_id: &str,
    ) -> AppResult<UploadedFile> {
        let final_key = object_key(folder_path, distinctive_id, &file.file_name);
        let staged_key = format!("staging/{}/{final_key}", self.session_id);
        put_object(&self.storage.as_generic(), &Path::from(staged_key.clone()), file).await?;
        self.staged
            .push((Path::from(staged_key), Path::from(final_key.clone())));
        Ok(UploadedFile {
            file_name: file.file_name.clone(),
            key: final_key,
        })
    }

    /// Renames every staged object to its final key. Call only after all
    /// store writes of the operation have succeeded.
    pub async fn commit(self) -> AppResult<()> {
        let store = self.storage.as_generic();
        for (staged, final_key) in &self.staged {
            store.rename(staged, final_key).await?;
        }
        Ok(())
    }

    /// Best-effort sweep of the staging prefix; errors are logged and
    /// swallowed so the original failure stays the one the caller sees.
    pub async fn abort(self) {
        if self.staged.is_empty() {
            return;
        }
        let prefix = Path::from(format!("staging/{}", self.session_id));
        if let Err(err) = delete_prefix(&self.storage.as_generic(), &prefix).await {
            tracing::warn!(error = %err, prefix = %prefix, "staging sweep failed");
        }
    }
}

fn object_key(folder_path: &str, distinctive_id: &str, file_name: &str) -> String {
    format!("{distinctive_id}/{folder_path}/{file_name}")
}

async fn put_object(
    store: &Arc<dyn ObjectStore>,
    path: &Path,
    file: &FileUpload,
) -> Result<(), object_store::Error> {
    let attributes = Attributes::from_iter([(
        Attribute::ContentType,
        AttributeValue::from(file.content_type.clone()),
    )]);
    store
        .put_opts(
            path,
            PutPayload::from(file.bytes.clone()),
            PutOptions {
                attributes,
                ..PutOptions::default()
            },
        )
        .await?;
    Ok(())
}

async fn delete_prefix(
    store: &Arc<dyn ObjectStore>,
    prefix: &Path,
) -> Result<(), object_store::Error> {
    let locations = store.list(Some(prefix)).map_ok(|meta| meta.location).boxed();
    store
        .delete_stream(locations)
        .try_collect::<Vec<Path>>()
        .await?;
    Ok(())
}
