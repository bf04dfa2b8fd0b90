use chrono::Utc;
use uuid::Uuid;

use commerce_core::dto::cart::AddToCartRequest;
use commerce_core::dto::params::Pagination;
use commerce_core::dto::product_details::ProductDetailInput;
use commerce_core::error::AppError;
use commerce_core::models::{Product, ProductType};
use commerce_core::services::{cart_service, product_detail_service};
use commerce_core::state::AppState;
use commerce_core::store::Atomicity;

#[tokio::test]
async fn add_update_list_and_remove_cart_items() -> anyhow::Result<()> {
    let state = setup_state();
    let user_id = Uuid::new_v4();
    let product = seed_product(&state).await?;
    let batch = product_detail_service::create_product_details(
        &state,
        product.product_id,
        vec![detail_input(1000), detail_input(2500)],
    )
    .await?
    .data
    .expect("batch payload");
    let detail = &batch.details[0];

    let added = cart_service::add_to_cart(
        &state,
        user_id,
        AddToCartRequest {
            product_detail_id: detail.detail_id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("cart payload");
    assert_eq!(added.quantity, 2);

    // Adding the same detail again replaces the quantity.
    let updated = cart_service::add_to_cart(
        &state,
        user_id,
        AddToCartRequest {
            product_detail_id: detail.detail_id,
            quantity: 5,
        },
    )
    .await?
    .data
    .expect("cart payload");
    assert_eq!(updated.cart_id, added.cart_id);
    assert_eq!(updated.quantity, 5);

    let list = cart_service::list_cart(&state, user_id, Pagination::default())
        .await?
        .data
        .expect("cart list");
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].detail.detail_id, detail.detail_id);
    assert_eq!(list.items[0].quantity, 5);

    cart_service::remove_from_cart(&state, user_id, detail.detail_id).await?;
    let err = cart_service::remove_from_cart(&state, user_id, detail.detail_id)
        .await
        .expect_err("already removed");
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn cart_rejects_unknown_details_and_bad_quantities() -> anyhow::Result<()> {
    let state = setup_state();
    let user_id = Uuid::new_v4();

    let err = cart_service::add_to_cart(
        &state,
        user_id,
        AddToCartRequest {
            product_detail_id: Uuid::new_v4(),
            quantity: 1,
        },
    )
    .await
    .expect_err("detail does not exist");
    assert!(matches!(err, AppError::BadRequest(_)));

    let product = seed_product(&state).await?;
    let batch = product_detail_service::create_product_details(
        &state,
        product.product_id,
        vec![detail_input(1000)],
    )
    .await?
    .data
    .expect("batch payload");

    let err = cart_service::add_to_cart(
        &state,
        user_id,
        AddToCartRequest {
            product_detail_id: batch.details[0].detail_id,
            quantity: 0,
        },
    )
    .await
    .expect_err("zero quantity");
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn detail_batches_report_their_atomicity() -> anyhow::Result<()> {
    let state = setup_state();
    let product = seed_product(&state).await?;

    let batch = product_detail_service::create_product_details(
        &state,
        product.product_id,
        vec![detail_input(1000), detail_input(2000), detail_input(3000)],
    )
    .await?
    .data
    .expect("batch payload");

    assert_eq!(batch.details.len(), 3);
    assert_eq!(batch.atomicity, Atomicity::Transactional);
    for detail in &batch.details {
        assert_eq!(detail.product_id, product.product_id);
    }

    let err = product_detail_service::create_product_details(&state, Uuid::new_v4(), vec![
        detail_input(1000),
    ])
    .await
    .expect_err("unknown product");
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

fn setup_state() -> AppState {
    commerce_core::init_tracing();
    AppState::in_memory()
}

fn detail_input(price: i64) -> ProductDetailInput {
    ProductDetailInput {
        tenant_id: Uuid::new_v4(),
        price,
        quantity: 50,
        entry_date: Some(Utc::now()),
        exit_date: None,
        expiration_date: None,
    }
}

async fn seed_product(state: &AppState) -> anyhow::Result<Product> {
    let now = Utc::now();
    let code = state.sequences.generate_code("PS", 6).await?;
    let product = Product {
        product_id: Uuid::new_v4(),
        product_code: code.clone(),
        reference_key: code,
        product_type: ProductType::Source,
        name: "Mineral Water".to_string(),
        title: "Crate".to_string(),
        slug: "mineral-water-crate".to_string(),
        description: None,
        image: None,
        gallery: Vec::new(),
        product_extend: None,
        category_id: None,
        price: None,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };
    state.products.create(product.clone(), None).await?;
    Ok(product)
}
