use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use muse_db::Database;
use muse_db::models::{OrderListingRow, OrderRow};
use muse_types::api::{
    BuyerContact, ImageResponse, OrderProductSummary, OrderResponse, PlaceOrderRequest,
    UpdateOrderStatusRequest,
};
use muse_types::models::{self, OrderStatus, PaymentType, StockStatus};

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::products::image_response;
use crate::{AppState, non_empty, run_blocking};

/// POST /orders
///
/// Checks run in order: required fields and payment type (400), product
/// exists (404), product in stock (400), buyer is not the owner (403).
pub async fn place_order(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let (Some(product_id), Some(address), Some(pincode), Some(phone_number), Some(payment_type)) = (
        non_empty(req.product_id),
        non_empty(req.address),
        non_empty(req.pincode),
        non_empty(req.phone_number),
        non_empty(req.payment_type),
    ) else {
        return Err(ApiError::bad_request("Missing required order fields."));
    };
    let payment_type: PaymentType = payment_type.parse()?;

    let order = run_blocking(&state, move |db| {
        let product = db
            .get_product(&product_id)?
            .ok_or_else(|| ApiError::not_found("Product not found."))?;

        if product.stock == StockStatus::OutOfStock {
            return Err(ApiError::bad_request(
                "Product is out of stock and cannot be ordered.",
            ));
        }

        if product.product_owner_id == claims.sub {
            return Err(ApiError::forbidden("You cannot place an order for your own product."));
        }

        let order = OrderRow {
            id: Uuid::new_v4().to_string(),
            product_id: product.id,
            buyer_id: claims.sub,
            buyer_name: claims.name,
            address,
            pincode,
            phone_number,
            payment_type,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        db.create_order(&order)?;
        Ok(order)
    })
    .await?;

    info!(
        "Order {} placed by {} for product {} ({})",
        order.id, order.buyer_id, order.product_id, order.payment_type
    );

    Ok((StatusCode::CREATED, Json(order_response(order))))
}

/// GET /my-orders. Orders the caller placed, newest first.
pub async fn my_orders(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = run_blocking(&state, move |db| {
        let rows = db.list_orders_by_buyer(&claims.sub)?;
        listing_responses(db, rows, false)
    })
    .await?;

    Ok(Json(orders))
}

/// GET /received-orders. The seller's fulfillment queue: orders against any
/// product the caller owns, with buyer contact details, newest first.
pub async fn received_orders(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = run_blocking(&state, move |db| {
        let rows = db.list_orders_for_owner(&claims.sub)?;
        listing_responses(db, rows, true)
    })
    .await?;

    Ok(Json(orders))
}

/// PATCH /orders/{id}/status. Only the owner of the ordered product may set
/// the status; any of the five values is accepted regardless of the current one.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    AuthUser(claims): AuthUser,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let status: OrderStatus = non_empty(req.status)
        .ok_or_else(|| ApiError::bad_request("Missing status field."))?
        .parse()?;

    let order = run_blocking(&state, move |db| {
        let (order, owner_id) = db
            .get_order_with_product_owner(&order_id)?
            .ok_or_else(|| ApiError::not_found("Order not found."))?;

        if owner_id != claims.sub {
            return Err(ApiError::forbidden(
                "You are not authorized to update this order status.",
            ));
        }

        if !db.update_order_status(&order.id, status)? {
            return Err(ApiError::not_found("Order not found."));
        }

        Ok(OrderRow { status, ..order })
    })
    .await?;

    info!("Order {} set to {}", order.id, order.status);

    Ok(Json(order_response(order)))
}

fn order_response(order: OrderRow) -> OrderResponse {
    OrderResponse {
        id: order.id,
        product_id: order.product_id,
        buyer_id: order.buyer_id,
        buyer_name: order.buyer_name,
        address: order.address,
        pincode: order.pincode,
        phone_number: order.phone_number,
        payment_type: order.payment_type,
        status: order.status,
        created_at: order.created_at,
        product: None,
        buyer: None,
    }
}

/// Join listings with product images (one batch query) and, for the seller
/// view, buyer contact details.
fn listing_responses(
    db: &Database,
    rows: Vec<OrderListingRow>,
    include_buyer: bool,
) -> Result<Vec<OrderResponse>, ApiError> {
    let mut product_ids: Vec<String> = rows.iter().map(|r| r.order.product_id.clone()).collect();
    product_ids.sort();
    product_ids.dedup();

    let mut images_by_product: HashMap<String, Vec<ImageResponse>> = HashMap::new();
    for image in db.get_images_for_products(&product_ids)? {
        images_by_product
            .entry(image.product_id.clone())
            .or_default()
            .push(image_response(image));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let images = images_by_product
                .get(&row.order.product_id)
                .cloned()
                .unwrap_or_default();

            let product = OrderProductSummary {
                id: row.order.product_id.clone(),
                product_name: row.product_name,
                price: row.price,
                discount: row.discount,
                discounted_price: models::discounted_price(row.price, row.discount),
                images,
            };

            let buyer = include_buyer.then(|| BuyerContact {
                id: row.order.buyer_id.clone(),
                name: row.buyer_account_name,
                email: row.buyer_email,
                phone: row.buyer_phone,
            });

            OrderResponse {
                product: Some(product),
                buyer,
                ..order_response(row.order)
            }
        })
        .collect())
}
