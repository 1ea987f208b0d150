use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                phone       TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE categories (
                id              TEXT PRIMARY KEY,
                category_name   TEXT NOT NULL UNIQUE
            );

            CREATE TABLE sub_categories (
                id                  TEXT PRIMARY KEY,
                sub_category_name   TEXT NOT NULL UNIQUE,
                category_id         TEXT NOT NULL REFERENCES categories(id)
            );

            CREATE INDEX idx_sub_categories_category
                ON sub_categories(category_id);

            CREATE TABLE products (
                id                  TEXT PRIMARY KEY,
                product_name        TEXT NOT NULL,
                category_id         TEXT NOT NULL REFERENCES categories(id),
                category_name       TEXT NOT NULL,
                sub_category_id     TEXT NOT NULL REFERENCES sub_categories(id),
                sub_category_name   TEXT NOT NULL,
                price               REAL NOT NULL CHECK (price > 0),
                discount            REAL NOT NULL DEFAULT 0 CHECK (discount BETWEEN 0 AND 100),
                stock               TEXT NOT NULL DEFAULT 'IN_STOCK'
                                    CHECK (stock IN ('IN_STOCK', 'OUT_OF_STOCK')),
                product_owner_id    TEXT NOT NULL REFERENCES users(id),
                product_owner_name  TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_products_owner
                ON products(product_owner_id, created_at);

            CREATE INDEX idx_products_created
                ON products(created_at);

            CREATE TABLE images (
                id          TEXT PRIMARY KEY,
                image_name  TEXT NOT NULL,
                content     TEXT NOT NULL,
                position    INTEGER NOT NULL,
                product_id  TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_images_product
                ON images(product_id, position);

            CREATE TABLE orders (
                id              TEXT PRIMARY KEY,
                product_id      TEXT NOT NULL REFERENCES products(id),
                buyer_id        TEXT NOT NULL REFERENCES users(id),
                buyer_name      TEXT NOT NULL,
                address         TEXT NOT NULL,
                pincode         TEXT NOT NULL,
                phone_number    TEXT NOT NULL,
                payment_type    TEXT NOT NULL CHECK (payment_type IN (
                                    'CREDIT_CARD', 'DEBIT_CARD', 'UPI',
                                    'NET_BANKING', 'CASH_ON_DELIVERY', 'WALLET')),
                status          TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN (
                                    'PENDING', 'PROCESSING', 'SHIPPED',
                                    'DELIVERED', 'CANCELLED')),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_orders_buyer
                ON orders(buyer_id, created_at);

            CREATE INDEX idx_orders_product
                ON orders(product_id);

            -- Sweeper filter
            CREATE INDEX idx_orders_status_created
                ON orders(status, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
