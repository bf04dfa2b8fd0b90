use std::sync::Arc;

use mongodb::Client;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;

use crate::config::{AppConfig, StorageConfig};
use crate::models::{
    AuditLog, CartItem, Product, ProductDetail, ProductPromotion, Promotion, PromotionUserLimit,
};
use crate::sequence::SequenceGenerator;
use crate::storage::ObjectStorage;
use crate::store::Repository;

#[derive(Clone)]
pub struct AppState {
    pub products: Repository<Product>,
    pub product_details: Repository<ProductDetail>,
    pub promotions: Repository<Promotion>,
    pub product_promotions: Repository<ProductPromotion>,
    pub promotion_limits: Repository<PromotionUserLimit>,
    pub cart_items: Repository<CartItem>,
    pub audit_logs: Repository<AuditLog>,
    pub storage: ObjectStorage,
    pub sequences: SequenceGenerator,
}

impl AppState {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(&config.mongo_url).await?;
        let db = client.database(&config.mongo_db);
        let txn = config.mongo_replica_set;

        let storage = match &config.storage {
            StorageConfig::S3 { bucket, region } => ObjectStorage::S3(Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_region(region)
                    .build()?,
            )),
            StorageConfig::LocalFs { root } => {
                ObjectStorage::LocalFs(Arc::new(LocalFileSystem::new_with_prefix(root)?))
            }
            StorageConfig::Memory => ObjectStorage::in_memory(),
        };

        Ok(Self {
            products: Repository::mongo(client.clone(), &db, "products", txn),
            product_details: Repository::mongo(client.clone(), &db, "product_details", txn),
            promotions: Repository::mongo(client.clone(), &db, "promotions", txn),
            product_promotions: Repository::mongo(client.clone(), &db, "product_promotions", txn),
            promotion_limits: Repository::mongo(client.clone(), &db, "promotion_user_limits", txn),
            cart_items: Repository::mongo(client.clone(), &db, "cart_items", txn),
            audit_logs: Repository::mongo(client.clone(), &db, "audit_logs", txn),
            sequences: SequenceGenerator::mongo(&db),
            storage,
        })
    }

    /// Fully in-process state; used by tests and local tooling.
    pub fn in_memory() -> Self {
        Self {
            products: Repository::in_memory(),
            product_details: Repository::in_memory(),
            promotions: Repository::in_memory(),
            product_promotions: Repository::in_memory(),
            promotion_limits: Repository::in_memory(),
            cart_items: Repository::in_memory(),
            audit_logs: Repository::in_memory(),
            storage: ObjectStorage::in_memory(),
            sequences: SequenceGenerator::in_memory(),
        }
    }
}
