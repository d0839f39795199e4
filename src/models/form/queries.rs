use sqlx::PgPool;
use sqlx::types::Json;

use super::types::{Form, FormInput, FormRow};

const SELECT_FORM: &str = "\
    SELECT id, name, fields, categories, sub_fields, pdf_description, pdf_image, created_at, updated_at \
    FROM forms";

/// All forms, most recently updated first.
pub async fn find_all(pool: &PgPool) -> Result<Vec<Form>, sqlx::Error> {
    let rows = sqlx::query_as::<_, FormRow>(&format!("{SELECT_FORM} ORDER BY updated_at DESC, id DESC"))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Form::from).collect())
}

/// Forms restricted to the given ids, most recently updated first.
pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Form>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let rows = sqlx::query_as::<_, FormRow>(&format!(
        "{SELECT_FORM} WHERE id = ANY($1) ORDER BY updated_at DESC, id DESC"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Form::from).collect())
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Form>, sqlx::Error> {
    let row = sqlx::query_as::<_, FormRow>(&format!("{SELECT_FORM} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Form::from))
}

/// Which of the given ids name an existing form.
pub async fn existing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    sqlx::query_scalar("SELECT id FROM forms WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM forms").fetch_one(pool).await
}

pub async fn create(pool: &PgPool, input: &FormInput) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO forms (name, fields, categories, sub_fields, pdf_description, pdf_image) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
    )
    .bind(&input.name)
    .bind(Json(&input.fields))
    .bind(Json(&input.categories))
    .bind(Json(&input.sub_fields))
    .bind(input.pdf_description.as_deref())
    .bind(input.pdf_image.as_deref())
    .fetch_one(pool)
    .await
}

/// Replace the definition. Returns false when the form does not exist.
pub async fn update(pool: &PgPool, id: i64, input: &FormInput) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE forms SET name = $2, fields = $3, categories = $4, sub_fields = $5, \
            pdf_description = $6, pdf_image = $7, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&input.name)
    .bind(Json(&input.fields))
    .bind(Json(&input.categories))
    .bind(Json(&input.sub_fields))
    .bind(input.pdf_description.as_deref())
    .bind(input.pdf_image.as_deref())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a form; its entries go with it (FK cascade).
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM forms WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
