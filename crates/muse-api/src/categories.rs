use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use muse_db::models::SubCategoryRow;
use muse_types::api::{CategoryResponse, SubCategoryResponse};

use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// GET /categories. Each category carries its subcategories; both levels are
/// alphabetical.
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = run_blocking(&state, |db| {
        let categories = db.list_categories()?;

        // list_sub_categories is already name-ordered, so grouping keeps that order
        let mut subs_by_category: HashMap<String, Vec<SubCategoryResponse>> = HashMap::new();
        for sub in db.list_sub_categories(None)? {
            subs_by_category
                .entry(sub.category_id.clone())
                .or_default()
                .push(sub_category_response(sub));
        }

        Ok(categories
            .into_iter()
            .map(|c| CategoryResponse {
                sub_categories: subs_by_category.remove(&c.id).unwrap_or_default(),
                id: c.id,
                category_name: c.category_name,
            })
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(categories))
}

/// GET /categories/{category_id}/subcategories. An unknown category yields an
/// empty list.
pub async fn list_subcategories(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let subs = run_blocking(&state, move |db| {
        Ok(db
            .list_sub_categories(Some(&category_id))?
            .into_iter()
            .map(sub_category_response)
            .collect::<Vec<_>>())
    })
    .await?;

    Ok(Json(subs))
}

fn sub_category_response(row: SubCategoryRow) -> SubCategoryResponse {
    SubCategoryResponse {
        id: row.id,
        sub_category_name: row.sub_category_name,
        category_id: row.category_id,
    }
}
