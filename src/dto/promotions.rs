use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchase intent of a verification batch.
#[derive(Debug, Deserialize, Clone)]
pub struct PurchaseIntent {
    pub promotion_id: Uuid,
    pub product_promotion_id: Uuid,
    pub amount: i64,
}

/// Verification result for one failing intent; intents that pass every
/// check are omitted from the response.
#[derive(Debug, Serialize)]
pub struct IntentReport {
    pub promotion_id: Uuid,
    pub product_promotion_id: Uuid,
    pub valid: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReserveLimitRequest {
    pub promotion_id: Uuid,
    pub phone: String,
    pub amount: i64,
}
