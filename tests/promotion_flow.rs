use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use commerce_core::dto::promotions::{PurchaseIntent, ReserveLimitRequest};
use commerce_core::error::AppError;
use commerce_core::models::{ProductPromotion, Promotion};
use commerce_core::services::promotion_service;
use commerce_core::state::AppState;
use commerce_core::store::Filter;

// Verification is a read-only dry run over a batch of intents; reservation
// durably increments the per-phone usage behind an atomic conditional update.

#[tokio::test]
async fn expired_promotion_fails_verification() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_promotion(
        &state,
        Some(10),
        Some(Utc::now() - Duration::days(7)),
        Some(Utc::now() - Duration::days(1)),
    )
    .await?;
    let product_promotion = seed_product_promotion(&state, &promotion, 100, 0).await?;

    let reports = verify(
        &state,
        "0901234567",
        &[intent(&promotion, &product_promotion, 1)],
    )
    .await?;

    assert_eq!(reports.len(), 1);
    assert!(!reports[0].valid);
    assert!(
        reports[0].reasons.iter().any(|r| r.contains("expired")),
        "expected an expired reason, got {:?}",
        reports[0].reasons
    );
    Ok(())
}

#[tokio::test]
async fn stock_check_uses_remaining_quantity() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, None).await?;
    let product_promotion = seed_product_promotion(&state, &promotion, 10, 8).await?;

    let reports = verify(
        &state,
        "0901234567",
        &[intent(&promotion, &product_promotion, 5)],
    )
    .await?;
    assert_eq!(reports.len(), 1);
    assert!(
        reports[0].reasons.iter().any(|r| r.contains("(2)")),
        "expected the remaining quantity in the reason, got {:?}",
        reports[0].reasons
    );

    let reports = verify(
        &state,
        "0901234567",
        &[intent(&promotion, &product_promotion, 2)],
    )
    .await?;
    assert!(reports.is_empty(), "2 of 2 remaining should be allowed");
    Ok(())
}

#[tokio::test]
async fn verification_reports_every_invalid_intent() -> anyhow::Result<()> {
    let state = setup_state();
    let valid_promotion = seed_active_promotion(&state, Some(10)).await?;
    let valid_pp = seed_product_promotion(&state, &valid_promotion, 100, 0).await?;
    let exhausted_pp = seed_product_promotion(&state, &valid_promotion, 5, 5).await?;

    let missing = PurchaseIntent {
        promotion_id: Uuid::new_v4(),
        product_promotion_id: Uuid::new_v4(),
        amount: 1,
    };

    let reports = verify(
        &state,
        "0901234567",
        &[
            intent(&valid_promotion, &valid_pp, 1),
            intent(&valid_promotion, &exhausted_pp, 1),
            missing,
        ],
    )
    .await?;

    assert_eq!(reports.len(), 2, "one valid intent must be omitted");
    for report in &reports {
        assert!(!report.valid);
        assert!(!report.reasons.is_empty());
        assert!(report.reasons.iter().all(|r| !r.is_empty()));
    }
    Ok(())
}

#[tokio::test]
async fn verification_is_idempotent_and_side_effect_free() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(3)).await?;
    let product_promotion = seed_product_promotion(&state, &promotion, 10, 8).await?;
    let intents = [
        intent(&promotion, &product_promotion, 5),
        intent(&promotion, &product_promotion, 1),
    ];

    let first = verify(&state, "0901234567", &intents).await?;
    let second = verify(&state, "0901234567", &intents).await?;

    assert_eq!(
        serde_json::to_value(&first)?,
        serde_json::to_value(&second)?
    );
    let limits = state
        .promotion_limits
        .count(Filter::new().eq("promotion_id", promotion.promotion_id))
        .await?;
    assert_eq!(limits, 0, "verification must not create limit records");
    Ok(())
}

#[tokio::test]
async fn first_purchase_equal_to_the_cap_is_allowed() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(3)).await?;
    let product_promotion = seed_product_promotion(&state, &promotion, 100, 0).await?;

    let reports = verify(
        &state,
        "0901234567",
        &[intent(&promotion, &product_promotion, 3)],
    )
    .await?;
    assert!(reports.is_empty());

    let reports = verify(
        &state,
        "0901234567",
        &[intent(&promotion, &product_promotion, 4)],
    )
    .await?;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].reasons.len() >= 2, "per-order and cumulative");
    Ok(())
}

#[tokio::test]
async fn verification_counts_existing_usage_against_the_cap() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(3)).await?;
    let product_promotion = seed_product_promotion(&state, &promotion, 100, 0).await?;
    reserve(&state, &promotion, "0901234567", 2).await?;

    let reports = verify(
        &state,
        "0901234567",
        &[intent(&promotion, &product_promotion, 2)],
    )
    .await?;
    assert_eq!(reports.len(), 1, "2 used + 2 requested exceeds cap 3");

    let reports = verify(
        &state,
        "0987654321",
        &[intent(&promotion, &product_promotion, 2)],
    )
    .await?;
    assert!(reports.is_empty(), "another phone has its own usage");
    Ok(())
}

#[tokio::test]
async fn failed_reservation_leaves_the_stored_amount_untouched() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(3)).await?;

    let first = reserve(&state, &promotion, "0901234567", 2).await?;
    assert_eq!(first.amount, 2);

    let err = reserve(&state, &promotion, "0901234567", 2)
        .await
        .expect_err("2 + 2 exceeds the cap of 3");
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    let stored = state
        .promotion_limits
        .get_one(
            Filter::new()
                .eq("promotion_id", promotion.promotion_id)
                .eq("phone", "0901234567"),
        )
        .await?
        .expect("record from the first reservation");
    assert_eq!(stored.amount, 2);
    Ok(())
}

#[tokio::test]
async fn reservation_can_fill_the_cap_exactly() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(3)).await?;

    reserve(&state, &promotion, "0901234567", 2).await?;
    let second = reserve(&state, &promotion, "0901234567", 1).await?;
    assert_eq!(second.amount, 3);

    let err = reserve(&state, &promotion, "0901234567", 1)
        .await
        .expect_err("the cap is already filled");
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn reservation_rejects_oversized_single_purchases_upfront() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(3)).await?;

    let err = reserve(&state, &promotion, "0901234567", 5)
        .await
        .expect_err("5 exceeds the per-user cap of 3");
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(err.is_business());

    let count = state
        .promotion_limits
        .count(Filter::new().eq("promotion_id", promotion.promotion_id))
        .await?;
    assert_eq!(count, 0, "no record may be created on a rejected attempt");
    Ok(())
}

#[tokio::test]
async fn reservation_requires_an_existing_promotion() -> anyhow::Result<()> {
    let state = setup_state();
    let request = ReserveLimitRequest {
        promotion_id: Uuid::new_v4(),
        phone: "0901234567".to_string(),
        amount: 1,
    };
    let err = promotion_service::create_promotion_user_limit(&state, "en", &request)
        .await
        .expect_err("promotion does not exist");
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn uncapped_promotions_still_record_usage() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, None).await?;

    reserve(&state, &promotion, "0901234567", 5).await?;
    let record = reserve(&state, &promotion, "0901234567", 7).await?;
    assert_eq!(record.amount, 12);
    Ok(())
}

#[tokio::test]
async fn concurrent_reservations_cannot_exceed_the_cap() -> anyhow::Result<()> {
    let state = setup_state();
    let promotion = seed_active_promotion(&state, Some(5)).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = state.clone();
        let promotion = promotion.clone();
        handles.push(tokio::spawn(async move {
            reserve(&state, &promotion, "0901234567", 1).await.is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await? {
            successes += 1;
        }
    }
    assert_eq!(successes, 5);

    let stored = state
        .promotion_limits
        .get_one(
            Filter::new()
                .eq("promotion_id", promotion.promotion_id)
                .eq("phone", "0901234567"),
        )
        .await?
        .expect("limit record");
    assert_eq!(stored.amount, 5);
    Ok(())
}

fn setup_state() -> AppState {
    commerce_core::init_tracing();
    AppState::in_memory()
}

async fn seed_promotion(
    state: &AppState,
    limit_items: Option<i64>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
) -> anyhow::Result<Promotion> {
    let now = Utc::now();
    let promotion = Promotion {
        promotion_id: Uuid::new_v4(),
        code_name: format!("promo-{}", Uuid::new_v4()),
        tenant_id: Uuid::new_v4(),
        status: true,
        start_time,
        end_time,
        limit_items,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };
    state.promotions.create(promotion.clone(), None).await?;
    Ok(promotion)
}

async fn seed_active_promotion(
    state: &AppState,
    limit_items: Option<i64>,
) -> anyhow::Result<Promotion> {
    seed_promotion(
        state,
        limit_items,
        Some(Utc::now() - Duration::days(1)),
        Some(Utc::now() + Duration::days(7)),
    )
    .await
}

async fn seed_product_promotion(
    state: &AppState,
    promotion: &Promotion,
    quantity_promotion: i64,
    sold: i64,
) -> anyhow::Result<ProductPromotion> {
    let now = Utc::now();
    let product_promotion = ProductPromotion {
        product_promotion_id: Uuid::new_v4(),
        promotion_id: promotion.promotion_id,
        product_detail_id: Uuid::new_v4(),
        price_promotion: 900,
        percent_discount: 10,
        quantity_promotion,
        sold,
        created_at: now,
        updated_at: now,
    };
    state
        .product_promotions
        .create(product_promotion.clone(), None)
        .await?;
    Ok(product_promotion)
}

fn intent(
    promotion: &Promotion,
    product_promotion: &ProductPromotion,
    amount: i64,
) -> PurchaseIntent {
    PurchaseIntent {
        promotion_id: promotion.promotion_id,
        product_promotion_id: product_promotion.product_promotion_id,
        amount,
    }
}

async fn verify(
    state: &AppState,
    phone: &str,
    intents: &[PurchaseIntent],
) -> anyhow::Result<Vec<commerce_core::dto::promotions::IntentReport>> {
    let response = promotion_service::verify_promotions(state, "en", phone, intents).await?;
    Ok(response.data.expect("verification payload"))
}

async fn reserve(
    state: &AppState,
    promotion: &Promotion,
    phone: &str,
    amount: i64,
) -> Result<commerce_core::models::PromotionUserLimit, AppError> {
    let request = ReserveLimitRequest {
        promotion_id: promotion.promotion_id,
        phone: phone.to_string(),
        amount,
    };
    let response = promotion_service::create_promotion_user_limit(state, "en", &request).await?;
    Ok(response.data.expect("reservation payload"))
}
