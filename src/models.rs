use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Position of a document inside a product family. Every document sharing a
/// `reference_key` belongs to one family; exactly one member is `Source`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ProductType {
    #[serde(rename = "product-source")]
    Source,
    #[serde(rename = "product-extend")]
    Extend,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Source => "product-source",
            ProductType::Extend => "product-extend",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub product_id: Uuid,
    pub product_code: String,
    pub reference_key: String,
    pub product_type: ProductType,
    pub name: String,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    /// Primary image key; variants carry exactly one.
    pub image: Option<String>,
    pub gallery: Vec<String>,
    /// Consolidated family descriptor (JSON), present on source products only.
    pub product_extend: Option<String>,
    pub category_id: Option<Uuid>,
    /// Variant-level price; source products leave this unset and price
    /// through tenant-scoped details.
    pub price: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tenant-scoped stock-keeping unit derived from a product.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductDetail {
    pub detail_id: Uuid,
    pub product_id: Uuid,
    pub tenant_id: Uuid,
    pub price: i64,
    pub quantity: i64,
    pub entry_date: Option<DateTime<Utc>>,
    pub exit_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Promotion {
    pub promotion_id: Uuid,
    pub code_name: String,
    pub tenant_id: Uuid,
    pub status: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Per-user cumulative purchase cap; `None` means uncapped.
    pub limit_items: Option<i64>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status
            && !self.is_deleted
            && self.start_time.is_some_and(|s| s <= now)
            && self.end_time.is_none_or(|e| e >= now)
    }
}

/// Binds one product detail to one promotion with an allotted quantity.
/// Invariant: `sold <= quantity_promotion`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProductPromotion {
    pub product_promotion_id: Uuid,
    pub promotion_id: Uuid,
    pub product_detail_id: Uuid,
    pub price_promotion: i64,
    pub percent_discount: i64,
    pub quantity_promotion: i64,
    pub sold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductPromotion {
    pub fn remaining(&self) -> i64 {
        self.quantity_promotion - self.sold
    }
}

/// Cumulative purchase tracker for one (promotion, phone) pair. Created
/// lazily on first reservation, incremented afterwards, never decremented.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PromotionUserLimit {
    pub promotion_id: Uuid,
    pub phone: String,
    pub amount: i64,
    pub last_purchase_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CartItem {
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub product_detail_id: Uuid,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditLog {
    pub audit_id: Uuid,
    pub actor: Option<String>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promotion(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Promotion {
        let now = Utc::now();
        Promotion {
            promotion_id: Uuid::new_v4(),
            code_name: "summer".to_string(),
            tenant_id: Uuid::new_v4(),
            status: true,
            start_time: start,
            end_time: end,
            limit_items: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn promotion_activity_needs_a_started_window() {
        let now = Utc::now();
        let live = promotion(Some(now - Duration::days(1)), Some(now + Duration::days(1)));
        assert!(live.is_active(now));

        let unstarted = promotion(Some(now + Duration::hours(1)), None);
        assert!(!unstarted.is_active(now));

        let no_start = promotion(None, Some(now + Duration::days(1)));
        assert!(!no_start.is_active(now));

        let mut deleted = promotion(Some(now - Duration::days(1)), None);
        deleted.is_deleted = true;
        assert!(!deleted.is_active(now));
    }

    #[test]
    fn product_type_serializes_to_its_wire_names() {
        assert_eq!(
            serde_json::to_value(ProductType::Source).unwrap(),
            serde_json::json!("product-source")
        );
        assert_eq!(
            serde_json::to_value(ProductType::Extend).unwrap(),
            serde_json::json!(ProductType::Extend.as_str())
        );
    }
}
