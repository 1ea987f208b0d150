//! Database row types. These map directly to SQLite rows and are kept apart
//! from the wire types in `muse_types::api`.

use chrono::{DateTime, Utc};
use muse_types::models::{OrderStatus, PaymentType, StockStatus};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct CategoryRow {
    pub id: String,
    pub category_name: String,
}

pub struct SubCategoryRow {
    pub id: String,
    pub sub_category_name: String,
    pub category_id: String,
}

/// Product with the category, subcategory and owner names copied in at creation.
pub struct ProductRow {
    pub id: String,
    pub product_name: String,
    pub category_id: String,
    pub category_name: String,
    pub sub_category_id: String,
    pub sub_category_name: String,
    pub price: f64,
    pub discount: f64,
    pub stock: StockStatus,
    pub product_owner_id: String,
    pub product_owner_name: String,
    pub created_at: DateTime<Utc>,
}

/// Images keep the order they were supplied in.
pub struct ImageRow {
    pub id: String,
    pub image_name: String,
    pub blob: String,
    pub product_id: String,
}

/// Partial product update. `images`, when present and non-empty, replaces the
/// whole image set.
#[derive(Default)]
pub struct ProductPatch {
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub stock: Option<StockStatus>,
    pub images: Option<Vec<ImageRow>>,
}

/// Catalog search. Unset fields impose no constraint.
#[derive(Debug, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub product_name: Option<String>,
    pub category_id: Option<String>,
    pub sub_category_id: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub stock: Option<StockStatus>,
}

pub struct OrderRow {
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
}

/// An order joined with its product's display fields and the buyer's
/// current contact details.
pub struct OrderListingRow {
    pub order: OrderRow,
    pub product_name: String,
    pub price: f64,
    pub discount: f64,
    pub buyer_account_name: String,
    pub buyer_email: String,
    pub buyer_phone: Option<String>,
}
