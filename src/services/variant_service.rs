use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        CreateProductFamilyRequest, DeclaredVariant, FamilyDescriptor, ProductFamily, VariantSpec,
        VariantSummary, VariantSyncOutcome,
    },
    error::{AppError, AppResult},
    models::{Product, ProductType},
    response::{ApiResponse, Meta},
    state::AppState,
    storage::{FileUpload, UploadSession},
    store::{Filter, Patch},
};

const SOURCE_CODE_PREFIX: &str = "PS";
const VARIANT_CODE_PREFIX: &str = "PE";
const CODE_PAD: usize = 6;

/// Reconciles a source product's declared variant list against its persisted
/// variants. Declared entries carrying the id of a live variant are updated
/// in place, the rest are created fresh, and any persisted family member
/// absent from the declaration is soft-deleted. Image uploads are staged and
/// only committed once every store write has succeeded.
///
/// A `None` (or blank) declaration leaves the family untouched; an empty
/// array prunes every variant.
pub async fn sync_variants(
    state: &AppState,
    source: &Product,
    declared_json: Option<&str>,
    images: &[Option<FileUpload>],
) -> AppResult<ApiResponse<VariantSyncOutcome>> {
    let Some(declared) = parse_declared(declared_json)? else {
        let outcome = VariantSyncOutcome {
            created: Vec::new(),
            updated: Vec::new(),
            pruned: 0,
        };
        return Ok(ApiResponse::success("Ok", outcome, Some(Meta::empty())));
    };

    let mut session = UploadSession::new(&state.storage);
    match apply_sync(state, &mut session, source, &declared, images).await {
        Ok(outcome) => {
            session.commit().await?;
            if let Err(err) = log_audit(
                &state.audit_logs,
                None,
                "variants_synced",
                Some("products"),
                Some(json!({
                    "reference_key": source.reference_key,
                    "created": outcome.created.len(),
                    "updated": outcome.updated.len(),
                    "pruned": outcome.pruned,
                })),
            )
            .await
            {
                tracing::warn!(error = %err, "audit log failed");
            }
            Ok(ApiResponse::success("Ok", outcome, Some(Meta::empty())))
        }
        Err(err) => {
            session.abort().await;
            Err(err)
        }
    }
}

/// Creates a whole product family: the source document plus every declared
/// variant, with the consolidated `product_extend` descriptor recomputed and
/// stored on the source.
pub async fn create_product_family(
    state: &AppState,
    request: &CreateProductFamilyRequest,
    source_images: &[FileUpload],
    variant_images: &[Option<FileUpload>],
) -> AppResult<ApiResponse<ProductFamily>> {
    let declared = parse_declared(request.product_extend.as_deref())?.unwrap_or_default();

    let mut session = UploadSession::new(&state.storage);
    match apply_create(
        state,
        &mut session,
        request,
        &declared,
        source_images,
        variant_images,
    )
    .await
    {
        Ok(family) => {
            session.commit().await?;
            if let Err(err) = log_audit(
                &state.audit_logs,
                None,
                "product_family_created",
                Some("products"),
                Some(json!({
                    "reference_key": family.source.reference_key,
                    "variants": family.variants.len(),
                })),
            )
            .await
            {
                tracing::warn!(error = %err, "audit log failed");
            }
            Ok(ApiResponse::success("Created", family, Some(Meta::empty())))
        }
        Err(err) => {
            session.abort().await;
            Err(err)
        }
    }
}

async fn apply_sync(
    state: &AppState,
    session: &mut UploadSession,
    source: &Product,
    declared: &[DeclaredVariant],
    images: &[Option<FileUpload>],
) -> AppResult<VariantSyncOutcome> {
    let now = Utc::now();
    let mut to_create: Vec<Product> = Vec::new();
    let mut to_update: Vec<Product> = Vec::new();

    for (index, entry) in declared.iter().enumerate() {
        let spec = &entry.extend;
        let image = images.get(index).and_then(Option::as_ref);

        let existing = match spec.id {
            Some(id) => {
                state
                    .products
                    .get_one(
                        Filter::new()
                            .eq("product_id", id)
                            .eq("product_type", ProductType::Extend.as_str())
                            .eq("is_deleted", false),
                    )
                    .await?
            }
            None => None,
        };

        match existing {
            Some(current) => {
                to_update.push(merge_variant(session, source, current, spec, image, now).await?);
            }
            None => {
                to_create.push(synthesize_variant(state, session, source, spec, image, now).await?);
            }
        }
    }

    for variant in &to_update {
        state
            .products
            .replace(Filter::new().eq("product_id", variant.product_id), variant)
            .await?;
    }
    if !to_create.is_empty() {
        state.products.insert_many(&to_create).await?;
    }

    let kept: Vec<Uuid> = to_update
        .iter()
        .chain(to_create.iter())
        .map(|variant| variant.product_id)
        .collect();
    let pruned = state
        .products
        .update_many(
            Filter::new()
                .prefix("reference_key", &source.reference_key)
                .eq("product_type", ProductType::Extend.as_str())
                .eq("is_deleted", false)
                .not_in("product_id", kept),
            Patch::new().set("is_deleted", true).set("updated_at", now),
        )
        .await?;
    if pruned > 0 {
        tracing::debug!(reference_key = %source.reference_key, pruned, "family pruned");
    }

    Ok(VariantSyncOutcome {
        created: to_create,
        updated: to_update,
        pruned,
    })
}

async fn apply_create(
    state: &AppState,
    session: &mut UploadSession,
    request: &CreateProductFamilyRequest,
    declared: &[DeclaredVariant],
    source_images: &[FileUpload],
    variant_images: &[Option<FileUpload>],
) -> AppResult<ProductFamily> {
    let now = Utc::now();
    let product_code = state
        .sequences
        .generate_code(SOURCE_CODE_PREFIX, CODE_PAD)
        .await?;
    let reference_key = product_code.clone();

    let mut gallery = Vec::with_capacity(source_images.len());
    for file in source_images {
        let uploaded = session
            .stage_file(file, &format!("products/{product_code}"), &reference_key)
            .await?;
        gallery.push(uploaded.key);
    }

    let mut source = Product {
        product_id: Uuid::new_v4(),
        product_code,
        reference_key: reference_key.clone(),
        product_type: ProductType::Source,
        name: request.name.clone(),
        title: request.title.clone(),
        slug: build_slug(&request.name, &request.title),
        description: request.description.clone(),
        image: gallery.first().cloned(),
        gallery,
        product_extend: None,
        category_id: request.category_id,
        price: None,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };

    let mut variants = Vec::with_capacity(declared.len());
    for (index, entry) in declared.iter().enumerate() {
        let image = variant_images.get(index).and_then(Option::as_ref);
        variants.push(synthesize_variant(state, session, &source, &entry.extend, image, now).await?);
    }

    let descriptor = FamilyDescriptor {
        gallery: source.gallery.clone(),
        variants: variants.iter().map(variant_summary).collect(),
    };
    source.product_extend = Some(serde_json::to_string(&descriptor)?);

    let unique = Filter::new()
        .eq("slug", source.slug.as_str())
        .eq("is_deleted", false);
    let created = state
        .products
        .create(source, Some(unique))
        .await?
        .ok_or_else(|| AppError::Conflict("a product with this slug already exists".to_string()))?;

    if !variants.is_empty() {
        state.products.insert_many(&variants).await?;
    }

    Ok(ProductFamily {
        source: created,
        variants,
    })
}

async fn merge_variant(
    session: &mut UploadSession,
    source: &Product,
    mut variant: Product,
    spec: &VariantSpec,
    image: Option<&FileUpload>,
    now: DateTime<Utc>,
) -> AppResult<Product> {
    if let Some(name) = &spec.name {
        variant.name = name.clone();
    }
    if let Some(title) = &spec.title {
        variant.title = title.clone();
    }
    if spec.description.is_some() {
        variant.description = spec.description.clone();
    }
    if spec.price.is_some() {
        variant.price = spec.price;
    }
    variant.reference_key = source.reference_key.clone();
    variant.category_id = source.category_id;
    variant.slug = build_slug(&variant.name, &variant.title);
    if let Some(file) = image {
        let uploaded = session
            .stage_file(
                file,
                &format!("products/{}", variant.product_code),
                &source.reference_key,
            )
            .await?;
        variant.image = Some(uploaded.key.clone());
        variant.gallery = vec![uploaded.key];
    }
    variant.updated_at = now;
    Ok(variant)
}

async fn synthesize_variant(
    state: &AppState,
    session: &mut UploadSession,
    source: &Product,
    spec: &VariantSpec,
    image: Option<&FileUpload>,
    now: DateTime<Utc>,
) -> AppResult<Product> {
    let product_code = state
        .sequences
        .generate_code(VARIANT_CODE_PREFIX, CODE_PAD)
        .await?;
    let name = spec.name.clone().unwrap_or_else(|| source.name.clone());
    let title = spec.title.clone().unwrap_or_else(|| source.title.clone());

    let mut variant = Product {
        product_id: Uuid::new_v4(),
        product_code,
        reference_key: source.reference_key.clone(),
        product_type: ProductType::Extend,
        slug: build_slug(&name, &title),
        name,
        title,
        description: spec.description.clone().or_else(|| source.description.clone()),
        image: None,
        gallery: Vec::new(),
        product_extend: None,
        category_id: source.category_id,
        price: spec.price,
        is_deleted: false,
        created_at: now,
        updated_at: now,
    };

    if let Some(file) = image {
        let uploaded = session
            .stage_file(
                file,
                &format!("products/{}", variant.product_code),
                &source.reference_key,
            )
            .await?;
        variant.image = Some(uploaded.key.clone());
        variant.gallery = vec![uploaded.key];
    }

    Ok(variant)
}

fn variant_summary(variant: &Product) -> VariantSummary {
    VariantSummary {
        product_id: variant.product_id,
        product_code: variant.product_code.clone(),
        name: variant.name.clone(),
        title: variant.title.clone(),
        price: variant.price,
        image: variant.image.clone(),
    }
}

fn parse_declared(raw: Option<&str>) -> AppResult<Option<Vec<DeclaredVariant>>> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Ok(Some(serde_json::from_str(s)?)),
    }
}

fn build_slug(name: &str, title: &str) -> String {
    let name = slugify(name);
    let title = slugify(title);
    match (name.is_empty(), title.is_empty()) {
        (false, false) => format!("{name}-{title}"),
        (false, true) => name,
        (true, false) => title,
        (true, true) => String::new(),
    }
}

fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_separator = false;
    for c in input.trim().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_joins_name_and_title() {
        assert_eq!(build_slug("Mineral Water", "6 Pack"), "mineral-water-6-pack");
    }

    #[test]
    fn slug_degrades_to_the_non_empty_segment() {
        assert_eq!(build_slug("Mineral Water", "  "), "mineral-water");
        assert_eq!(build_slug("", "6 Pack"), "6-pack");
        assert_eq!(build_slug(" ", ""), "");
    }

    #[test]
    fn slug_collapses_repeated_separators() {
        assert_eq!(build_slug("Trà  Xanh!!", "Hộp (x4)"), "trà-xanh-hộp-x4");
    }
}
