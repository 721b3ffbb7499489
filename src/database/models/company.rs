use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::database::sql::{bind_value, build_partial_update, update_fields};
use crate::database::DbError;

/// JSON field name -> column name, for fields whose names differ.
const ALIASES: &[(&str, &str)] = &[
    ("numEmployees", "num_employees"),
    ("logoUrl", "logo_url"),
];

const COLUMNS: &str = "handle, name, description, num_employees, logo_url";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub num_employees: Option<i32>,
    pub logo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyNew {
    pub handle: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub num_employees: Option<i32>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompanyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_employees: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySearch {
    pub name: Option<String>,
    pub min_employees: Option<i32>,
    pub max_employees: Option<i32>,
}

impl CompanySearch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.min_employees.is_none() && self.max_employees.is_none()
    }
}

impl Company {
    pub async fn create(pool: &PgPool, data: CompanyNew) -> Result<Company, DbError> {
        let company = sqlx::query_as::<_, Company>(
            "INSERT INTO companies (handle, name, description, num_employees, logo_url) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING handle, name, description, num_employees, logo_url",
        )
        .bind(&data.handle)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.num_employees)
        .bind(&data.logo_url)
        .fetch_one(pool)
        .await?;

        Ok(company)
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<Company>, DbError> {
        let companies = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies ORDER BY name",
            COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        Ok(companies)
    }

    /// Filtered listing. Conditions are ANDed; all values are parameterized.
    pub async fn search(pool: &PgPool, filters: &CompanySearch) -> Result<Vec<Company>, DbError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(name) = &filters.name {
            params.push(Value::String(format!("%{}%", name)));
            conditions.push(format!("name ILIKE ${}", params.len()));
        }
        if let Some(min) = filters.min_employees {
            params.push(Value::from(min));
            conditions.push(format!("num_employees >= ${}", params.len()));
        }
        if let Some(max) = filters.max_employees {
            params.push(Value::from(max));
            conditions.push(format!("num_employees <= ${}", params.len()));
        }

        let mut sql = format!("SELECT {} FROM companies", COLUMNS);
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY name");

        let mut query = sqlx::query_as::<_, Company>(&sql);
        for value in &params {
            query = bind_value(query, value);
        }

        Ok(query.fetch_all(pool).await?)
    }

    pub async fn get(pool: &PgPool, handle: &str) -> Result<Company, DbError> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE handle = $1",
            COLUMNS
        ))
        .bind(handle)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("No company: {}", handle)))
    }

    /// Sparse update: only the fields present in `data` are touched.
    pub async fn update(
        pool: &PgPool,
        handle: &str,
        data: CompanyUpdate,
    ) -> Result<Company, DbError> {
        let fields = update_fields(serde_json::to_value(&data)?);
        let fragment = build_partial_update(&fields, ALIASES)?;

        let sql = format!(
            "UPDATE companies SET {} WHERE handle = ${} RETURNING {}",
            fragment.set_clause,
            fragment.values.len() + 1,
            COLUMNS
        );

        let mut query = sqlx::query_as::<_, Company>(&sql);
        for value in &fragment.values {
            query = bind_value(query, value);
        }

        query
            .bind(handle)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("No company: {}", handle)))
    }

    pub async fn remove(pool: &PgPool, handle: &str) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM companies WHERE handle = $1")
            .bind(handle)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("No company: {}", handle)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_payload_serializes_only_provided_fields() {
        let data: CompanyUpdate =
            serde_json::from_value(json!({ "name": "Apple", "numEmployees": 50 })).unwrap();
        let fields = update_fields(serde_json::to_value(&data).unwrap());

        let fragment = build_partial_update(&fields, ALIASES).unwrap();
        assert_eq!(fragment.set_clause, r#""name"=$1, "num_employees"=$2"#);
        assert_eq!(fragment.values, vec![json!("Apple"), json!(50)]);
    }

    #[test]
    fn update_payload_rejects_unknown_fields() {
        let result =
            serde_json::from_value::<CompanyUpdate>(json!({ "handle": "not-allowed" }));
        assert!(result.is_err());
    }

    #[test]
    fn empty_update_payload_fails_as_bad_request() {
        let data: CompanyUpdate = serde_json::from_value(json!({})).unwrap();
        let fields = update_fields(serde_json::to_value(&data).unwrap());

        let err = build_partial_update(&fields, ALIASES).unwrap_err();
        assert!(matches!(err, DbError::EmptyUpdate));
    }
}
