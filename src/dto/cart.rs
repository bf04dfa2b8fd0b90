use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ProductDetail;

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_detail_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct CartList {
    pub items: Vec<CartItemDto>,
}

#[derive(Debug, Serialize)]
pub struct CartItemDto {
    pub id: Uuid,
    pub detail: ProductDetail,
    pub quantity: i64,
}
