use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartItemDto, CartList},
    dto::params::Pagination,
    error::{AppError, AppResult},
    models::CartItem,
    response::{ApiResponse, Meta},
    state::AppState,
    store::{Filter, FindOptions, Patch, SortDir},
};

pub async fn list_cart(
    state: &AppState,
    user_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, per_page, offset) = pagination.normalize();
    let entries = state
        .cart_items
        .get_many(
            Filter::new().eq("user_id", user_id),
            FindOptions::sorted("created_at", SortDir::Desc).paginate(offset as u64, per_page),
        )
        .await?;

    let mut items = Vec::with_capacity(entries.data.len());
    for entry in entries.data {
        let detail = state
            .product_details
            .get_one(Filter::new().eq("detail_id", entry.product_detail_id))
            .await?;
        if let Some(detail) = detail {
            items.push(CartItemDto {
                id: entry.cart_id,
                detail,
                quantity: entry.quantity,
            });
        }
    }

    let meta = Meta::new(page, per_page, entries.total as i64);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let detail = state
        .product_details
        .get_one(
            Filter::new()
                .eq("detail_id", payload.product_detail_id)
                .eq("is_deleted", false),
        )
        .await?;
    if detail.is_none() {
        return Err(AppError::BadRequest("product detail not found".to_string()));
    }

    let existing = state
        .cart_items
        .get_one(
            Filter::new()
                .eq("user_id", user_id)
                .eq("product_detail_id", payload.product_detail_id),
        )
        .await?;

    let cart_item = match existing {
        Some(item) => state
            .cart_items
            .update(
                Filter::new().eq("cart_id", item.cart_id),
                Patch::new()
                    .set("quantity", payload.quantity)
                    .set("updated_at", Utc::now()),
            )
            .await?
            .ok_or_else(|| AppError::NotFound("cart item not found".to_string()))?,
        None => {
            let now = Utc::now();
            let fresh = CartItem {
                cart_id: Uuid::new_v4(),
                user_id,
                product_detail_id: payload.product_detail_id,
                quantity: payload.quantity,
                created_at: now,
                updated_at: now,
            };
            let unique = Filter::new()
                .eq("user_id", user_id)
                .eq("product_detail_id", payload.product_detail_id);
            state
                .cart_items
                .create(fresh, Some(unique))
                .await?
                .ok_or_else(|| AppError::Conflict("item is already in the cart".to_string()))?
        }
    };

    if let Err(err) = log_audit(
        &state.audit_logs,
        Some(&user_id.to_string()),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({
            "product_detail_id": payload.product_detail_id,
            "quantity": payload.quantity,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user_id: Uuid,
    product_detail_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let removed = state
        .cart_items
        .delete(
            Filter::new()
                .eq("user_id", user_id)
                .eq("product_detail_id", product_detail_id),
        )
        .await?;
    if removed.is_none() {
        return Err(AppError::NotFound("cart item not found".to_string()));
    }

    if let Err(err) = log_audit(
        &state.audit_logs,
        Some(&user_id.to_string()),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "product_detail_id": product_detail_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
