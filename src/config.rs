use std::env;
use std::path::PathBuf;

use anyhow::bail;

#[derive(Debug, Clone)]
pub enum StorageConfig {
    S3 { bucket: String, region: String },
    LocalFs { root: PathBuf },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo_url: String,
    pub mongo_db: String,
    /// Replica-set deployments support multi-document transactions; this
    /// decides the atomicity capability reported by bulk inserts.
    pub mongo_replica_set: bool,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mongo_url = env::var("MONGO_URL")?;
        let mongo_db = env::var("MONGO_DB").unwrap_or_else(|_| "commerce".to_string());
        let mongo_replica_set = env::var("MONGO_REPLICA_SET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let storage = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageConfig::S3 {
                bucket: env::var("S3_BUCKET")?,
                region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            },
            Ok("local") => StorageConfig::LocalFs {
                root: PathBuf::from(env::var("STORAGE_ROOT")?),
            },
            Ok("memory") | Err(_) => StorageConfig::Memory,
            Ok(other) => bail!("unknown STORAGE_BACKEND: {other}"),
        };

        Ok(Self {
            mongo_url,
            mongo_db,
            mongo_replica_set,
            storage,
        })
    }
}
