//! Fixtures shared by the query tests.

use chrono::{DateTime, Duration, Utc};
use muse_types::models::{OrderStatus, PaymentType, StockStatus};
use uuid::Uuid;

use crate::Database;
use crate::models::{ImageRow, OrderRow, ProductRow, UserRow};

pub fn open() -> Database {
    Database::open_in_memory().unwrap()
}

pub fn id() -> String {
    Uuid::new_v4().to_string()
}

pub fn new_user(name: &str, email: &str) -> UserRow {
    UserRow {
        id: id(),
        name: name.to_string(),
        email: email.to_string(),
        password: "$argon2id$not-a-real-hash".to_string(),
        phone: Some("555-0100".to_string()),
        created_at: Utc::now(),
    }
}

pub struct Catalog {
    pub category_id: String,
    pub sub_category_id: String,
}

/// Seeds "Pottery" / "Stoneware".
pub fn seed_catalog(db: &Database) -> Catalog {
    let category_id = id();
    let sub_category_id = id();
    db.create_category(&category_id, "Pottery").unwrap();
    db.create_sub_category(&sub_category_id, "Stoneware", &category_id).unwrap();
    Catalog {
        category_id,
        sub_category_id,
    }
}

pub fn new_product(
    catalog: &Catalog,
    owner: &UserRow,
    name: &str,
    price: f64,
    created_at: DateTime<Utc>,
) -> ProductRow {
    ProductRow {
        id: id(),
        product_name: name.to_string(),
        category_id: catalog.category_id.clone(),
        category_name: "Pottery".to_string(),
        sub_category_id: catalog.sub_category_id.clone(),
        sub_category_name: "Stoneware".to_string(),
        price,
        discount: 0.0,
        stock: StockStatus::InStock,
        product_owner_id: owner.id.clone(),
        product_owner_name: owner.name.clone(),
        created_at,
    }
}

pub fn image(product_id: &str, name: &str) -> ImageRow {
    ImageRow {
        id: id(),
        image_name: name.to_string(),
        blob: "data:image/png;base64,aGVsbG8=".to_string(),
        product_id: product_id.to_string(),
    }
}

pub fn new_order(product: &ProductRow, buyer: &UserRow, age: Duration) -> OrderRow {
    OrderRow {
        id: id(),
        product_id: product.id.clone(),
        buyer_id: buyer.id.clone(),
        buyer_name: buyer.name.clone(),
        address: "1 Kiln Lane".to_string(),
        pincode: "560001".to_string(),
        phone_number: "555-0199".to_string(),
        payment_type: PaymentType::CashOnDelivery,
        status: OrderStatus::Pending,
        created_at: Utc::now() - age,
    }
}
