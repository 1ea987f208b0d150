use anyhow::Result;
use chrono::{DateTime, Utc};
use muse_types::models::OrderStatus;
use rusqlite::{Connection, Row};

use crate::models::{OrderListingRow, OrderRow};
use crate::{Database, OptionalExt, format_timestamp, parse_enum, parse_timestamp};

const ORDER_COLUMNS: &str = "o.id, o.product_id, o.buyer_id, o.buyer_name, o.address, o.pincode, \
     o.phone_number, o.payment_type, o.status, o.created_at";

impl Database {
    pub fn create_order(&self, order: &OrderRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO orders (id, product_id, buyer_id, buyer_name, address, pincode,
                                     phone_number, payment_type, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    order.id,
                    order.product_id,
                    order.buyer_id,
                    order.buyer_name,
                    order.address,
                    order.pincode,
                    order.phone_number,
                    order.payment_type.as_str(),
                    order.status.as_str(),
                    format_timestamp(order.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_order(&self, id: &str) -> Result<Option<OrderRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders o WHERE o.id = ?1"),
                [id],
                map_order,
            )
            .optional()
        })
    }

    /// The order together with the id of the user who owns its product.
    pub fn get_order_with_product_owner(&self, id: &str) -> Result<Option<(OrderRow, String)>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {ORDER_COLUMNS}, p.product_owner_id
                     FROM orders o
                     JOIN products p ON p.id = o.product_id
                     WHERE o.id = ?1"
                ),
                [id],
                |row| Ok((map_order(row)?, row.get(10)?)),
            )
            .optional()
        })
    }

    /// Sets the status unconditionally. Returns false when no such order exists.
    pub fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = ?1 WHERE id = ?2",
                (status.as_str(), id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Orders placed by `buyer_id`, newest first.
    pub fn list_orders_by_buyer(&self, buyer_id: &str) -> Result<Vec<OrderListingRow>> {
        self.with_conn(|conn| query_listings(conn, "o.buyer_id = ?1", buyer_id))
    }

    /// Orders against any product owned by `owner_id`, newest first.
    pub fn list_orders_for_owner(&self, owner_id: &str) -> Result<Vec<OrderListingRow>> {
        self.with_conn(|conn| query_listings(conn, "p.product_owner_id = ?1", owner_id))
    }

    /// Moves every PENDING order created before `cutoff` to CANCELLED in a
    /// single statement. Returns how many orders changed.
    pub fn cancel_stale_orders(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE orders SET status = ?1 WHERE status = ?2 AND created_at < ?3",
                (
                    OrderStatus::Cancelled.as_str(),
                    OrderStatus::Pending.as_str(),
                    format_timestamp(cutoff),
                ),
            )?;
            Ok(changed)
        })
    }
}

fn query_listings(conn: &Connection, filter: &str, value: &str) -> Result<Vec<OrderListingRow>> {
    // One JOIN for product display fields and buyer contact details
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS}, p.product_name, p.price, p.discount,
                u.name, u.email, u.phone
         FROM orders o
         JOIN products p ON p.id = o.product_id
         JOIN users u ON u.id = o.buyer_id
         WHERE {filter}
         ORDER BY o.created_at DESC, o.rowid DESC"
    ))?;

    let rows = stmt
        .query_map([value], |row| {
            Ok(OrderListingRow {
                order: map_order(row)?,
                product_name: row.get(10)?,
                price: row.get(11)?,
                discount: row.get(12)?,
                buyer_account_name: row.get(13)?,
                buyer_email: row.get(14)?,
                buyer_phone: row.get(15)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_order(row: &Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        id: row.get(0)?,
        product_id: row.get(1)?,
        buyer_id: row.get(2)?,
        buyer_name: row.get(3)?,
        address: row.get(4)?,
        pincode: row.get(5)?,
        phone_number: row.get(6)?,
        payment_type: parse_enum(7, row.get(7)?)?,
        status: parse_enum(8, row.get(8)?)?,
        created_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
    })
}
