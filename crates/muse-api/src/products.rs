use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use muse_db::Database;
use muse_db::models::{ImageRow, ProductFilter, ProductPatch, ProductRow};
use muse_types::api::{
    CategoryRef, CreateProductRequest, ImageResponse, NumberInput, ProductQuery, ProductResponse,
    SubCategoryResponse, UpdateProductRequest,
};
use muse_types::models::{self, StockStatus};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::{AppState, non_empty, run_blocking};

const PRICE_MESSAGE: &str = "Price must be a positive number.";
const DISCOUNT_MESSAGE: &str = "Discount must be a number between 0 and 100.";

/// POST /products
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let (Some(product_name), Some(category_id), Some(sub_category_id), Some(price)) = (
        non_empty(req.product_name),
        non_empty(req.category_id),
        non_empty(req.sub_category_id),
        req.price,
    ) else {
        return Err(ApiError::bad_request("Missing required product fields."));
    };

    let price = parse_price(&price)?;
    let discount = req.discount.as_ref().map(parse_discount).transpose()?.unwrap_or(0.0);
    let stock = req.stock.as_deref().map(parse_stock).transpose()?.unwrap_or_default();
    let encoded_images = req.images.unwrap_or_default();
    validate_images(&encoded_images)?;

    let product_id = Uuid::new_v4().to_string();
    let stamp = Utc::now().timestamp_millis();
    let images: Vec<ImageRow> = encoded_images
        .into_iter()
        .enumerate()
        .map(|(i, blob)| ImageRow {
            id: Uuid::new_v4().to_string(),
            image_name: format!("product_{stamp}_{i}.png"),
            blob,
            product_id: product_id.clone(),
        })
        .collect();

    let response = run_blocking(&state, move |db| {
        let invalid = || ApiError::bad_request("Invalid category or subcategory ID.");
        let category = db.get_category(&category_id)?.ok_or_else(invalid)?;
        let sub_category = db.get_sub_category(&sub_category_id)?.ok_or_else(invalid)?;
        if sub_category.category_id != category.id {
            return Err(ApiError::bad_request(
                "Subcategory does not belong to the selected category.",
            ));
        }

        let product = ProductRow {
            id: product_id,
            product_name,
            category_id: category.id,
            category_name: category.category_name,
            sub_category_id: sub_category.id,
            sub_category_name: sub_category.sub_category_name,
            price,
            discount,
            stock,
            product_owner_id: claims.sub,
            product_owner_name: claims.name,
            created_at: Utc::now(),
        };
        db.create_product(&product, &images)?;

        Ok(product_response(product, images))
    })
    .await?;

    info!(
        "Product {} '{}' listed by {}",
        response.id, response.product_name, response.product_owner_id
    );

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /my-products
pub async fn my_products(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let products = run_blocking(&state, move |db| {
        let rows = db.list_products_by_owner(&claims.sub)?;
        with_images(db, rows)
    })
    .await?;

    Ok(Json(products))
}

/// PUT /products/{id}. Only the owner may change price, discount, stock or images.
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let response = run_blocking(&state, move |db| {
        let product = db
            .get_product(&product_id)?
            .ok_or_else(|| ApiError::not_found("Product not found."))?;

        if product.product_owner_id != claims.sub {
            return Err(ApiError::forbidden("You are not authorized to update this product."));
        }

        let mut patch = ProductPatch {
            price: req.price.as_ref().map(parse_price).transpose()?,
            discount: req.discount.as_ref().map(parse_discount).transpose()?,
            stock: req.stock.as_deref().map(parse_stock).transpose()?,
            images: None,
        };

        if let Some(encoded) = req.images.filter(|images| !images.is_empty()) {
            validate_images(&encoded)?;
            let stamp = Utc::now().timestamp_millis();
            patch.images = Some(
                encoded
                    .into_iter()
                    .enumerate()
                    .map(|(i, blob)| ImageRow {
                        id: Uuid::new_v4().to_string(),
                        image_name: format!("product_{}_{stamp}_{i}.png", product.id),
                        blob,
                        product_id: product.id.clone(),
                    })
                    .collect(),
            );
        }

        db.update_product(&product.id, &patch)?;

        let updated = db
            .get_product(&product.id)?
            .ok_or_else(|| anyhow::anyhow!("product {} vanished during update", product.id))?;
        let images = db.get_images_for_products(&[updated.id.clone()])?;
        Ok(product_response(updated, images))
    })
    .await?;

    info!("Product {} updated by {}", response.id, response.product_owner_id);

    Ok(Json(response))
}

/// GET /products. Public catalog search, newest first.
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let filter = parse_filter(query)?;

    let products = run_blocking(&state, move |db| {
        let rows = db.list_products(&filter)?;
        with_images(db, rows)
    })
    .await?;

    Ok(Json(products))
}

/// GET /products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = run_blocking(&state, move |db| {
        let row = db
            .get_product(&product_id)?
            .ok_or_else(|| ApiError::not_found("Product not found."))?;
        let images = db.get_images_for_products(&[row.id.clone()])?;
        Ok(product_response(row, images))
    })
    .await?;

    Ok(Json(product))
}

fn parse_filter(query: ProductQuery) -> Result<ProductFilter, ApiError> {
    let bound = |raw: Option<String>, name: &str| -> Result<Option<f64>, ApiError> {
        non_empty(raw)
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| ApiError::bad_request(format!("{name} must be a number.")))
            })
            .transpose()
    };

    Ok(ProductFilter {
        min_price: bound(query.min_price, "minPrice")?,
        max_price: bound(query.max_price, "maxPrice")?,
        stock: non_empty(query.stock).as_deref().map(parse_stock).transpose()?,
        product_name: non_empty(query.product_name),
        category_id: non_empty(query.category_id),
        sub_category_id: non_empty(query.sub_category_id),
    })
}

fn parse_price(input: &NumberInput) -> Result<f64, ApiError> {
    input
        .as_f64()
        .filter(|p| models::is_valid_price(*p))
        .ok_or_else(|| ApiError::bad_request(PRICE_MESSAGE))
}

fn parse_discount(input: &NumberInput) -> Result<f64, ApiError> {
    input
        .as_f64()
        .filter(|d| models::is_valid_discount(*d))
        .ok_or_else(|| ApiError::bad_request(DISCOUNT_MESSAGE))
}

fn parse_stock(raw: &str) -> Result<StockStatus, ApiError> {
    raw.parse::<StockStatus>()
        .map_err(|_| ApiError::bad_request("Invalid stock status."))
}

fn validate_images(images: &[String]) -> Result<(), ApiError> {
    if images.iter().all(|image| is_encoded_image(image)) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Images must be base64 encoded."))
    }
}

/// Accepts bare base64 or a `data:<mime>;base64,<payload>` URL.
fn is_encoded_image(image: &str) -> bool {
    let payload = match image.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => return false,
        },
        None => image,
    };
    !payload.is_empty() && B64.decode(payload.trim()).is_ok()
}

/// Attach images to a batch of products with a single image query.
fn with_images(db: &Database, rows: Vec<ProductRow>) -> Result<Vec<ProductResponse>, ApiError> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let mut images_by_product: HashMap<String, Vec<ImageRow>> = HashMap::new();
    for image in db.get_images_for_products(&ids)? {
        images_by_product.entry(image.product_id.clone()).or_default().push(image);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let images = images_by_product.remove(&row.id).unwrap_or_default();
            product_response(row, images)
        })
        .collect())
}

pub(crate) fn image_response(image: ImageRow) -> ImageResponse {
    ImageResponse {
        id: image.id,
        image_name: image.image_name,
        blob: image.blob,
        product_id: image.product_id,
    }
}

fn product_response(row: ProductRow, images: Vec<ImageRow>) -> ProductResponse {
    ProductResponse {
        discounted_price: models::discounted_price(row.price, row.discount),
        category: CategoryRef {
            id: row.category_id.clone(),
            category_name: row.category_name.clone(),
        },
        sub_category: SubCategoryResponse {
            id: row.sub_category_id.clone(),
            sub_category_name: row.sub_category_name.clone(),
            category_id: row.category_id.clone(),
        },
        images: images.into_iter().map(image_response).collect(),
        id: row.id,
        product_name: row.product_name,
        category_id: row.category_id,
        category_name: row.category_name,
        sub_category_id: row.sub_category_id,
        sub_category_name: row.sub_category_name,
        price: row.price,
        discount: row.discount,
        stock: row.stock,
        product_owner_id: row.product_owner_id,
        product_owner_name: row.product_owner_name,
        created_at: row.created_at,
    }
}
