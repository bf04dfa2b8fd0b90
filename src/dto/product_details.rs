use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ProductDetail;
use crate::store::Atomicity;

#[derive(Debug, Deserialize)]
pub struct ProductDetailInput {
    pub tenant_id: Uuid,
    pub price: i64,
    pub quantity: i64,
    pub entry_date: Option<DateTime<Utc>>,
    pub exit_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailBatch {
    pub details: Vec<ProductDetail>,
    /// Whether the batch was written inside a store transaction; callers
    /// needing all-or-nothing semantics must check this.
    pub atomicity: Atomicity,
}
