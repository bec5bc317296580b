use anyhow::Result;
use serde_json::Value;
use sqlx::PgPool;

use super::models::*;

pub async fn create_photo(pool: &PgPool, photo: &NewPhoto) -> Result<Photo> {
    let photo = sqlx::query_as::<_, Photo>(
        "INSERT INTO photos (user_id, filename, original_name, file_path, file_size, mime_type, source)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING *",
    )
    .bind(photo.user_id)
    .bind(&photo.filename)
    .bind(&photo.original_name)
    .bind(&photo.file_path)
    .bind(photo.file_size)
    .bind(&photo.mime_type)
    .bind(&photo.source)
    .fetch_one(pool)
    .await?;

    Ok(photo)
}

pub async fn get_photo_by_id(pool: &PgPool, photo_id: i64) -> Result<Option<Photo>> {
    let photo = sqlx::query_as::<_, Photo>("SELECT * FROM photos WHERE id = $1")
        .bind(photo_id)
        .fetch_optional(pool)
        .await?;

    Ok(photo)
}

pub async fn get_recent_photos(pool: &PgPool, user_id: i64, limit: i64) -> Result<Vec<Photo>> {
    let photos = sqlx::query_as::<_, Photo>(
        "SELECT * FROM photos WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(photos)
}

/// Attach an analysis result to a photo. Result and status land in one
/// statement, so a record is never left half-updated. Returns false when the
/// photo does not exist.
pub async fn update_photo_analysis(
    pool: &PgPool,
    photo_id: i64,
    results: &Value,
    status: &str,
) -> Result<bool> {
    let affected = sqlx::query(
        "UPDATE photos SET analysis_results = $1, analysis_status = $2 WHERE id = $3",
    )
    .bind(results)
    .bind(status)
    .bind(photo_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Partial update restricted to tags/analysis_status/analysis_results.
/// COALESCE keeps any column whose bind is NULL untouched.
pub async fn update_photo(
    pool: &PgPool,
    photo_id: i64,
    update: &PhotoUpdate,
) -> Result<Option<Photo>> {
    let photo = sqlx::query_as::<_, Photo>(
        "UPDATE photos
         SET tags = COALESCE($1, tags),
             analysis_status = COALESCE($2, analysis_status),
             analysis_results = COALESCE($3, analysis_results)
         WHERE id = $4
         RETURNING *",
    )
    .bind(&update.tags)
    .bind(&update.analysis_status)
    .bind(&update.analysis_results)
    .bind(photo_id)
    .fetch_optional(pool)
    .await?;

    Ok(photo)
}

/// Returns false when the photo does not exist.
pub async fn delete_photo(pool: &PgPool, photo_id: i64) -> Result<bool> {
    let affected = sqlx::query("DELETE FROM photos WHERE id = $1")
        .bind(photo_id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}
