use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{OrderStatus, PaymentType, StockStatus};

// -- JWT Claims --

/// Identity embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: usize,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

// -- Auth --

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

// -- Catalog --

/// A number the web client may send either as a JSON number or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// `None` when the value is not a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for NumberInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub product_name: Option<String>,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub price: Option<NumberInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<NumberInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<NumberInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<NumberInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

/// Query string of `GET /products`. Values arrive as raw strings; empty
/// strings count as unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub id: String,
    pub image_name: String,
    pub blob: String,
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: String,
    pub category_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryResponse {
    pub id: String,
    pub sub_category_name: String,
    pub category_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    pub id: String,
    pub category_name: String,
    pub sub_categories: Vec<SubCategoryResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub product_name: String,
    pub category_id: String,
    pub category_name: String,
    pub sub_category_id: String,
    pub sub_category_name: String,
    pub price: f64,
    pub discount: f64,
    pub discounted_price: f64,
    pub stock: StockStatus,
    pub product_owner_id: String,
    pub product_owner_name: String,
    pub created_at: DateTime<Utc>,
    pub category: CategoryRef,
    pub sub_category: SubCategoryResponse,
    pub images: Vec<ImageResponse>,
}

// -- Orders --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub product_id: Option<String>,
    pub address: Option<String>,
    pub pincode: Option<String>,
    pub phone_number: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: Option<String>,
}

/// Product display fields attached to order listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductSummary {
    pub id: String,
    pub product_name: String,
    pub price: f64,
    pub discount: f64,
    pub discounted_price: f64,
    pub images: Vec<ImageResponse>,
}

/// Buyer contact fields attached to the seller's fulfillment queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerContact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub product_id: String,
    pub buyer_id: String,
    pub buyer_name: String,
    pub address: String,
    pub pincode: String,
    pub phone_number: String,
    pub payment_type: PaymentType,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<OrderProductSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<BuyerContact>,
}
