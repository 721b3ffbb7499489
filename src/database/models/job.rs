use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::database::sql::{bind_value, build_partial_update, update_fields};
use crate::database::DbError;

const ALIASES: &[(&str, &str)] = &[("companyHandle", "company_handle")];

const COLUMNS: &str = "id, title, salary, equity, company_handle";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub salary: Option<i32>,
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobNew {
    pub title: String,
    #[serde(default)]
    pub salary: Option<i32>,
    #[serde(default)]
    pub equity: Option<Decimal>,
    pub company_handle: String,
}

/// Id and company handle are fixed at creation; neither is updatable.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equity: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSearch {
    pub title: Option<String>,
    pub min_salary: Option<i32>,
    pub has_equity: Option<bool>,
}

impl JobSearch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.min_salary.is_none() && self.has_equity.is_none()
    }
}

impl Job {
    pub async fn create(pool: &PgPool, data: JobNew) -> Result<Job, DbError> {
        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (title, salary, equity, company_handle) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, title, salary, equity, company_handle",
        )
        .bind(&data.title)
        .bind(data.salary)
        .bind(data.equity)
        .bind(&data.company_handle)
        .fetch_one(pool)
        .await?;

        Ok(job)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Job>, DbError> {
        let jobs =
            sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs ORDER BY id", COLUMNS))
                .fetch_all(pool)
                .await?;

        Ok(jobs)
    }

    /// Filtered listing. Conditions are ANDed; all values are parameterized.
    pub async fn search(pool: &PgPool, filters: &JobSearch) -> Result<Vec<Job>, DbError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(title) = &filters.title {
            params.push(Value::String(format!("%{}%", title)));
            conditions.push(format!("title ILIKE ${}", params.len()));
        }
        if let Some(min) = filters.min_salary {
            params.push(Value::from(min));
            conditions.push(format!("salary >= ${}", params.len()));
        }
        if filters.has_equity == Some(true) {
            conditions.push("equity > 0".to_string());
        }

        let mut sql = format!("SELECT {} FROM jobs", COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query_as::<_, Job>(&sql);
        for value in &params {
            query = bind_value(query, value);
        }

        Ok(query.fetch_all(pool).await?)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<Job, DbError> {
        sqlx::query_as::<_, Job>(&format!("SELECT {} FROM jobs WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("No job: {}", id)))
    }

    pub async fn find_by_company(pool: &PgPool, handle: &str) -> Result<Vec<Job>, DbError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE company_handle = $1 ORDER BY id",
            COLUMNS
        ))
        .bind(handle)
        .fetch_all(pool)
        .await?;

        Ok(jobs)
    }

    /// Sparse update: only the fields present in `data` are touched.
    pub async fn update(pool: &PgPool, id: i32, data: JobUpdate) -> Result<Job, DbError> {
        let fields = update_fields(serde_json::to_value(&data)?);
        let fragment = build_partial_update(&fields, ALIASES)?;

        let sql = format!(
            "UPDATE jobs SET {} WHERE id = ${} RETURNING {}",
            fragment.set_clause,
            fragment.values.len() + 1,
            COLUMNS
        );

        let mut query = sqlx::query_as::<_, Job>(&sql);
        for value in &fragment.values {
            query = bind_value(query, value);
        }

        query
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("No job: {}", id)))
    }

    pub async fn remove(pool: &PgPool, id: i32) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("No job: {}", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_payload_feeds_the_fragment_builder() {
        let data: JobUpdate =
            serde_json::from_value(json!({ "title": "Boss", "salary": 120000 })).unwrap();
        let fields = update_fields(serde_json::to_value(&data).unwrap());

        let fragment = build_partial_update(&fields, ALIASES).unwrap();
        assert_eq!(fragment.set_clause, r#""title"=$1, "salary"=$2"#);
    }

    #[test]
    fn update_payload_rejects_company_handle_changes() {
        let result = serde_json::from_value::<JobUpdate>(json!({ "companyHandle": "apple" }));
        assert!(result.is_err());
    }

    #[test]
    fn equity_deserializes_as_decimal() {
        let data: JobNew = serde_json::from_value(json!({
            "title": "Engineer",
            "equity": "0.125",
            "companyHandle": "apple"
        }))
        .unwrap();
        assert_eq!(data.equity, Some(Decimal::new(125, 3)));
    }
}
