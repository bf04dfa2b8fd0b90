use anyhow::anyhow;
use chrono::Utc;
use serde_json::json;

use crate::{
    audit::log_audit,
    dto::promotions::{IntentReport, PurchaseIntent, ReserveLimitRequest},
    error::{AppError, AppResult},
    i18n::t,
    models::PromotionUserLimit,
    response::{ApiResponse, Meta},
    state::AppState,
    store::{Filter, Patch},
};

const RESERVE_ATTEMPTS: usize = 3;

/// Read-only dry run over a batch of purchase intents. Every intent is
/// evaluated against all three checks; intents that pass every check are
/// omitted, so an empty result means the whole batch is valid.
pub async fn verify_promotions(
    state: &AppState,
    lang: &str,
    phone: &str,
    intents: &[PurchaseIntent],
) -> AppResult<ApiResponse<Vec<IntentReport>>> {
    let now = Utc::now();
    let mut reports = Vec::new();

    for intent in intents {
        let mut reasons = Vec::new();

        let promotion = state
            .promotions
            .get_one(Filter::new().eq("promotion_id", intent.promotion_id))
            .await?;

        match &promotion {
            None => reasons.push(t(lang, "promotion.not-found", None)),
            Some(promotion) => {
                if promotion.is_deleted {
                    reasons.push(t(lang, "promotion.not-found", None));
                }
                if promotion.end_time.is_some_and(|end| end < now) {
                    reasons.push(t(lang, "promotion.expired", None));
                }
                if promotion.start_time.is_none_or(|start| start > now) {
                    reasons.push(t(lang, "promotion.not-started", None));
                }
            }
        }

        match state
            .product_promotions
            .get_one(Filter::new().eq("product_promotion_id", intent.product_promotion_id))
            .await?
        {
            None => reasons.push(t(lang, "promotion.product-missing", None)),
            Some(product_promotion) => {
                let remaining = product_promotion.remaining();
                if remaining < intent.amount {
                    reasons.push(
                        t(lang, "promotion.out-of-stock", None)
                            .replace("{remaining}", &remaining.to_string()),
                    );
                }
            }
        }

        if let Some(promotion) = promotion.as_ref()
            && let Some(cap) = promotion.limit_items
        {
            if intent.amount > cap {
                reasons.push(t(lang, "promotion.limit-per-order", None));
            }
            let used = state
                .promotion_limits
                .get_one(
                    Filter::new()
                        .eq("promotion_id", intent.promotion_id)
                        .eq("phone", phone),
                )
                .await?
                .map(|limit| limit.amount)
                .unwrap_or(0);
            if used + intent.amount > cap {
                reasons.push(t(lang, "promotion.limit-cumulative", None));
            }
        }

        if !reasons.is_empty() {
            reports.push(IntentReport {
                promotion_id: intent.promotion_id,
                product_promotion_id: intent.product_promotion_id,
                valid: false,
                reasons,
            });
        }
    }

    Ok(ApiResponse::success("Ok", reports, Some(Meta::empty())))
}

/// Durably reserves purchase-limit usage for one (promotion, phone) pair.
/// The cumulative-cap guard rides in the update filter, so two concurrent
/// reservations cannot both slip past the cap; creation of the first record
/// races through the unique filter and falls back to the increment.
pub async fn create_promotion_user_limit(
    state: &AppState,
    lang: &str,
    request: &ReserveLimitRequest,
) -> AppResult<ApiResponse<PromotionUserLimit>> {
    if request.amount <= 0 {
        return Err(AppError::BadRequest(
            "amount must be greater than 0".to_string(),
        ));
    }

    let promotion = state
        .promotions
        .get_one(
            Filter::new()
                .eq("promotion_id", request.promotion_id)
                .eq("is_deleted", false),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(t(lang, "promotion.not-found", None)))?;

    if let Some(cap) = promotion.limit_items
        && request.amount > cap
    {
        return Err(AppError::Conflict(t(lang, "promotion.limit-per-order", None)));
    }

    let now = Utc::now();

    for _ in 0..RESERVE_ATTEMPTS {
        let mut filter = Filter::new()
            .eq("promotion_id", request.promotion_id)
            .eq("phone", request.phone.as_str());
        if let Some(cap) = promotion.limit_items {
            filter = filter.lte("amount", cap - request.amount);
        }
        let patch = Patch::new()
            .inc("amount", request.amount)
            .set("last_purchase_at", now);
        if let Some(updated) = state.promotion_limits.update(filter, patch).await? {
            audit_reservation(state, request, &updated).await;
            return Ok(ApiResponse::success("Ok", updated, Some(Meta::empty())));
        }

        let existing = state
            .promotion_limits
            .get_one(
                Filter::new()
                    .eq("promotion_id", request.promotion_id)
                    .eq("phone", request.phone.as_str()),
            )
            .await?;
        match existing {
            Some(existing) => {
                // `amount` only ever grows, so an observed overflow is final.
                if let Some(cap) = promotion.limit_items
                    && existing.amount + request.amount > cap
                {
                    return Err(AppError::Conflict(t(lang, "promotion.limit-cumulative", None)));
                }
                // The record appeared after the increment attempt; try again.
            }
            None => {
                let fresh = PromotionUserLimit {
                    promotion_id: request.promotion_id,
                    phone: request.phone.clone(),
                    amount: request.amount,
                    last_purchase_at: now,
                    created_at: now,
                };
                let unique = Filter::new()
                    .eq("promotion_id", request.promotion_id)
                    .eq("phone", request.phone.as_str());
                if let Some(created) = state.promotion_limits.create(fresh, Some(unique)).await? {
                    audit_reservation(state, request, &created).await;
                    return Ok(ApiResponse::success("Ok", created, Some(Meta::empty())));
                }
                // Lost the creation race; retry the increment.
            }
        }
    }

    Err(AppError::Internal(anyhow!(
        "reservation retries exhausted for promotion {}",
        request.promotion_id
    )))
}

async fn audit_reservation(
    state: &AppState,
    request: &ReserveLimitRequest,
    record: &PromotionUserLimit,
) {
    if let Err(err) = log_audit(
        &state.audit_logs,
        Some(&request.phone),
        "promotion_limit_reserved",
        Some("promotion_user_limits"),
        Some(json!({
            "promotion_id": record.promotion_id,
            "amount": request.amount,
            "total": record.amount,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}
