use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};

use crate::models::{CategoryRow, ImageRow, ProductFilter, ProductPatch, ProductRow, SubCategoryRow};
use crate::{Database, OptionalExt, format_timestamp, parse_enum, parse_timestamp};

const PRODUCT_COLUMNS: &str = "id, product_name, category_id, category_name, sub_category_id, \
     sub_category_name, price, discount, stock, product_owner_id, product_owner_name, created_at";

impl Database {
    // -- Categories --

    pub fn create_category(&self, id: &str, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories (id, category_name) VALUES (?1, ?2)",
                (id, name),
            )?;
            Ok(())
        })
    }

    pub fn create_sub_category(&self, id: &str, name: &str, category_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sub_categories (id, sub_category_name, category_id) VALUES (?1, ?2, ?3)",
                (id, name, category_id),
            )?;
            Ok(())
        })
    }

    pub fn get_category(&self, id: &str) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, category_name FROM categories WHERE id = ?1",
                [id],
                map_category,
            )
            .optional()
        })
    }

    pub fn get_sub_category(&self, id: &str) -> Result<Option<SubCategoryRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, sub_category_name, category_id FROM sub_categories WHERE id = ?1",
                [id],
                map_sub_category,
            )
            .optional()
        })
    }

    /// Alphabetical by name.
    pub fn list_categories(&self) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, category_name FROM categories ORDER BY category_name ASC")?;
            let rows = stmt
                .query_map([], map_category)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Subcategories of one category (or of all categories when `None`),
    /// alphabetical by name.
    pub fn list_sub_categories(&self, category_id: Option<&str>) -> Result<Vec<SubCategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sub_category_name, category_id FROM sub_categories
                 WHERE ?1 IS NULL OR category_id = ?1
                 ORDER BY sub_category_name ASC",
            )?;
            let rows = stmt
                .query_map([category_id], map_sub_category)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Products --

    /// Inserts the product and its images in one transaction.
    pub fn create_product(&self, product: &ProductRow, images: &[ImageRow]) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO products ({PRODUCT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                rusqlite::params![
                    product.id,
                    product.product_name,
                    product.category_id,
                    product.category_name,
                    product.sub_category_id,
                    product.sub_category_name,
                    product.price,
                    product.discount,
                    product.stock.as_str(),
                    product.product_owner_id,
                    product.product_owner_name,
                    format_timestamp(product.created_at),
                ],
            )?;
            insert_images(&tx, images)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                [id],
                map_product,
            )
            .optional()
        })
    }

    /// Newest first.
    pub fn list_products(&self, filter: &ProductFilter) -> Result<Vec<ProductRow>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        let mut push = |clause: &str, value: Box<dyn ToSql>| {
            params.push(value);
            clauses.push(clause.replace('?', &format!("?{}", params.len())));
        };

        if let Some(name) = &filter.product_name {
            push("instr(lower(product_name), lower(?)) > 0", Box::new(name.clone()));
        }
        if let Some(category_id) = &filter.category_id {
            push("category_id = ?", Box::new(category_id.clone()));
        }
        if let Some(sub_category_id) = &filter.sub_category_id {
            push("sub_category_id = ?", Box::new(sub_category_id.clone()));
        }
        if let Some(min) = filter.min_price {
            push("price >= ?", Box::new(min));
        }
        if let Some(max) = filter.max_price {
            push("price <= ?", Box::new(max));
        }
        if let Some(stock) = filter.stock {
            push("stock = ?", Box::new(stock.as_str()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products {where_sql}
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_product)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Products owned by `owner_id`, newest first.
    pub fn list_products_by_owner(&self, owner_id: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_owner_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map([owner_id], map_product)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Applies the supplied fields in one transaction. A non-empty image list
    /// deletes every existing image of the product before inserting the new set.
    pub fn update_product(&self, id: &str, patch: &ProductPatch) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(price) = patch.price {
                tx.execute("UPDATE products SET price = ?1 WHERE id = ?2", rusqlite::params![price, id])?;
            }
            if let Some(discount) = patch.discount {
                tx.execute(
                    "UPDATE products SET discount = ?1 WHERE id = ?2",
                    rusqlite::params![discount, id],
                )?;
            }
            if let Some(stock) = patch.stock {
                tx.execute(
                    "UPDATE products SET stock = ?1 WHERE id = ?2",
                    rusqlite::params![stock.as_str(), id],
                )?;
            }
            if let Some(images) = patch.images.as_deref().filter(|images| !images.is_empty()) {
                tx.execute("DELETE FROM images WHERE product_id = ?1", [id])?;
                insert_images(&tx, images)?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    // -- Images --

    /// Batch-fetch images for a set of product IDs, in supplied order per product.
    pub fn get_images_for_products(&self, product_ids: &[String]) -> Result<Vec<ImageRow>> {
        if product_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=product_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, image_name, content, product_id FROM images
                 WHERE product_id IN ({})
                 ORDER BY product_id, position",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(product_ids.iter()), |row| {
                    Ok(ImageRow {
                        id: row.get(0)?,
                        image_name: row.get(1)?,
                        blob: row.get(2)?,
                        product_id: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn insert_images(conn: &Connection, images: &[ImageRow]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO images (id, image_name, content, position, product_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, image) in images.iter().enumerate() {
        stmt.execute(rusqlite::params![
            image.id,
            image.image_name,
            image.blob,
            position as i64,
            image.product_id,
        ])?;
    }
    Ok(())
}

fn map_category(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        category_name: row.get(1)?,
    })
}

fn map_sub_category(row: &Row<'_>) -> rusqlite::Result<SubCategoryRow> {
    Ok(SubCategoryRow {
        id: row.get(0)?,
        sub_category_name: row.get(1)?,
        category_id: row.get(2)?,
    })
}

fn map_product(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        product_name: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        sub_category_id: row.get(4)?,
        sub_category_name: row.get(5)?,
        price: row.get(6)?,
        discount: row.get(7)?,
        stock: parse_enum(8, row.get(8)?)?,
        product_owner_id: row.get(9)?,
        product_owner_name: row.get(10)?,
        created_at: parse_timestamp(11, &row.get::<_, String>(11)?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use muse_types::models::StockStatus;

    use crate::models::{ProductFilter, ProductPatch};
    use crate::test_support::{id, image, new_product, new_user, open, seed_catalog};

    #[test]
    fn categories_and_subcategories_are_alphabetical() {
        let db = open();
        let weaving = id();
        let glass = id();
        db.create_category(&weaving, "Weaving").unwrap();
        db.create_category(&glass, "Glass Art").unwrap();
        db.create_sub_category(&id(), "Tapestry Weaving", &weaving).unwrap();
        db.create_sub_category(&id(), "Basket Weaving", &weaving).unwrap();
        db.create_sub_category(&id(), "Blown Glass", &glass).unwrap();

        let names: Vec<_> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.category_name)
            .collect();
        assert_eq!(names, ["Glass Art", "Weaving"]);

        let subs: Vec<_> = db
            .list_sub_categories(Some(&weaving))
            .unwrap()
            .into_iter()
            .map(|s| s.sub_category_name)
            .collect();
        assert_eq!(subs, ["Basket Weaving", "Tapestry Weaving"]);

        assert_eq!(db.list_sub_categories(None).unwrap().len(), 3);
        assert!(db.list_sub_categories(Some("unknown")).unwrap().is_empty());
    }

    #[test]
    fn create_product_with_images_in_order() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();

        let product = new_product(&catalog, &owner, "Blue Vase", 40.0, Utc::now());
        let images = vec![image(&product.id, "first.png"), image(&product.id, "second.png")];
        db.create_product(&product, &images).unwrap();

        let stored = db.get_product(&product.id).unwrap().unwrap();
        assert_eq!(stored.product_name, "Blue Vase");
        assert_eq!(stored.category_name, "Pottery");
        assert_eq!(stored.product_owner_name, "Potter");
        assert_eq!(stored.stock, StockStatus::InStock);

        let names: Vec<_> = db
            .get_images_for_products(&[product.id.clone()])
            .unwrap()
            .into_iter()
            .map(|i| i.image_name)
            .collect();
        assert_eq!(names, ["first.png", "second.png"]);
    }

    #[test]
    fn invalid_price_is_rejected_by_the_schema() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();

        let mut product = new_product(&catalog, &owner, "Free Vase", 0.0, Utc::now());
        assert!(db.create_product(&product, &[]).is_err());

        product.price = 10.0;
        product.discount = 120.0;
        assert!(db.create_product(&product, &[]).is_err());
        assert!(db.get_product(&product.id).unwrap().is_none());
    }

    #[test]
    fn list_products_applies_every_filter() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();

        let now = Utc::now();
        let cheap = new_product(&catalog, &owner, "Tiny Bowl", 5.0, now - Duration::minutes(3));
        let mid = new_product(&catalog, &owner, "Blue VASE", 50.0, now - Duration::minutes(2));
        let mut pricey = new_product(&catalog, &owner, "Grand Vase", 500.0, now - Duration::minutes(1));
        pricey.stock = StockStatus::OutOfStock;
        for p in [&cheap, &mid, &pricey] {
            db.create_product(p, &[]).unwrap();
        }

        let all = db.list_products(&ProductFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, [pricey.id.as_str(), mid.id.as_str(), cheap.id.as_str()]);

        let vases = db
            .list_products(&ProductFilter {
                product_name: Some("vase".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(vases.len(), 2);

        let bounded = db
            .list_products(&ProductFilter {
                min_price: Some(5.0),
                max_price: Some(50.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(bounded.len(), 2, "price bounds are inclusive");

        let in_stock_vases = db
            .list_products(&ProductFilter {
                product_name: Some("VASE".into()),
                stock: Some(StockStatus::InStock),
                category_id: Some(catalog.category_id.clone()),
                sub_category_id: Some(catalog.sub_category_id.clone()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(in_stock_vases.len(), 1);
        assert_eq!(in_stock_vases[0].id, mid.id);

        let other_category = db
            .list_products(&ProductFilter {
                category_id: Some("other".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(other_category.is_empty());
    }

    #[test]
    fn name_filter_treats_wildcards_literally() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();
        db.create_product(&new_product(&catalog, &owner, "Bowl", 5.0, Utc::now()), &[])
            .unwrap();

        let hits = db
            .list_products(&ProductFilter {
                product_name: Some("%".into()),
                ..Default::default()
            })
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn products_by_owner_only_returns_own() {
        let db = open();
        let catalog = seed_catalog(&db);
        let a = new_user("A", "a@example.com");
        let b = new_user("B", "b@example.com");
        db.create_user(&a).unwrap();
        db.create_user(&b).unwrap();
        db.create_product(&new_product(&catalog, &a, "A1", 1.0, Utc::now()), &[]).unwrap();
        db.create_product(&new_product(&catalog, &b, "B1", 1.0, Utc::now()), &[]).unwrap();

        let mine = db.list_products_by_owner(&a.id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].product_name, "A1");
    }

    #[test]
    fn update_replaces_images_wholesale() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();
        let product = new_product(&catalog, &owner, "Vase", 40.0, Utc::now());
        db.create_product(&product, &[image(&product.id, "a.png"), image(&product.id, "b.png")])
            .unwrap();

        db.update_product(
            &product.id,
            &ProductPatch {
                price: Some(45.0),
                stock: Some(StockStatus::OutOfStock),
                images: Some(vec![image(&product.id, "c.png")]),
                ..Default::default()
            },
        )
        .unwrap();

        let stored = db.get_product(&product.id).unwrap().unwrap();
        assert_eq!(stored.price, 45.0);
        assert_eq!(stored.discount, 0.0);
        assert_eq!(stored.stock, StockStatus::OutOfStock);

        let names: Vec<_> = db
            .get_images_for_products(&[product.id.clone()])
            .unwrap()
            .into_iter()
            .map(|i| i.image_name)
            .collect();
        assert_eq!(names, ["c.png"]);
    }

    #[test]
    fn empty_image_list_keeps_existing_images() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();
        let product = new_product(&catalog, &owner, "Vase", 40.0, Utc::now());
        db.create_product(&product, &[image(&product.id, "a.png")]).unwrap();

        db.update_product(
            &product.id,
            &ProductPatch {
                discount: Some(15.0),
                images: Some(vec![]),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(db.get_product(&product.id).unwrap().unwrap().discount, 15.0);
        assert_eq!(db.get_images_for_products(&[product.id]).unwrap().len(), 1);
    }

    #[test]
    fn failed_update_leaves_product_untouched() {
        let db = open();
        let catalog = seed_catalog(&db);
        let owner = new_user("Potter", "potter@example.com");
        db.create_user(&owner).unwrap();
        let product = new_product(&catalog, &owner, "Vase", 40.0, Utc::now());
        db.create_product(&product, &[image(&product.id, "a.png")]).unwrap();

        let res = db.update_product(
            &product.id,
            &ProductPatch {
                price: Some(60.0),
                discount: Some(150.0),
                images: Some(vec![image(&product.id, "b.png")]),
                ..Default::default()
            },
        );
        assert!(res.is_err());

        let stored = db.get_product(&product.id).unwrap().unwrap();
        assert_eq!(stored.price, 40.0);
        assert_eq!(stored.discount, 0.0);
        let images = db.get_images_for_products(&[product.id]).unwrap();
        assert_eq!(images[0].image_name, "a.png");
    }
}
