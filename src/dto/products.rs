use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Product;

/// One entry of the declared variant list, as submitted in the
/// `product_extend` JSON blob. The position inside the list aligns it with
/// the positional image uploads.
#[derive(Debug, Deserialize)]
pub struct DeclaredVariant {
    pub extend: VariantSpec,
}

#[derive(Debug, Deserialize)]
pub struct VariantSpec {
    /// Present when the entry targets an already-persisted variant.
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductFamilyRequest {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    /// Declared variant list, JSON-encoded; absent means a family with no
    /// variants.
    pub product_extend: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductFamily {
    pub source: Product,
    pub variants: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct VariantSyncOutcome {
    pub created: Vec<Product>,
    pub updated: Vec<Product>,
    /// Previously-persisted variants soft-deleted by the family prune.
    pub pruned: u64,
}

/// Consolidated family summary stored on the source document's
/// `product_extend` field.
#[derive(Debug, Serialize, Deserialize)]
pub struct FamilyDescriptor {
    pub gallery: Vec<String>,
    pub variants: Vec<VariantSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VariantSummary {
    pub product_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub title: String,
    pub price: Option<i64>,
    pub image: Option<String>,
}
