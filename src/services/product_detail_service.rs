use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::product_details::{ProductDetailBatch, ProductDetailInput},
    error::{AppError, AppResult},
    models::ProductDetail,
    response::ApiResponse,
    state::AppState,
    store::{Atomicity, Filter},
};

/// Bulk-creates tenant-scoped details for one product. The batch is written
/// through the store's bulk insert; whether it ran inside a transaction is
/// reported back in the response rather than assumed.
pub async fn create_product_details(
    state: &AppState,
    product_id: Uuid,
    inputs: Vec<ProductDetailInput>,
) -> AppResult<ApiResponse<ProductDetailBatch>> {
    if inputs.is_empty() {
        return Err(AppError::BadRequest(
            "at least one product detail is required".to_string(),
        ));
    }

    let product = state
        .products
        .get_one(
            Filter::new()
                .eq("product_id", product_id)
                .eq("is_deleted", false),
        )
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound("product not found".to_string()));
    }

    let now = Utc::now();
    let details: Vec<ProductDetail> = inputs
        .into_iter()
        .map(|input| ProductDetail {
            detail_id: Uuid::new_v4(),
            product_id,
            tenant_id: input.tenant_id,
            price: input.price,
            quantity: input.quantity,
            entry_date: input.entry_date,
            exit_date: input.exit_date,
            expiration_date: input.expiration_date,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let bulk = state.product_details.insert_many(&details).await?;
    if bulk.atomicity == Atomicity::BestEffort {
        tracing::debug!(
            inserted = bulk.inserted,
            "product detail batch written without a transaction"
        );
    }

    if let Err(err) = log_audit(
        &state.audit_logs,
        None,
        "product_details_created",
        Some("product_details"),
        Some(serde_json::json!({
            "product_id": product_id,
            "count": bulk.inserted,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Created",
        ProductDetailBatch {
            details,
            atomicity: bulk.atomicity,
        },
        None,
    ))
}
