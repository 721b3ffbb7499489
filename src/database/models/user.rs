use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use crate::config;
use crate::database::sql::{bind_value, build_partial_update, update_fields};
use crate::database::DbError;

const ALIASES: &[(&str, &str)] = &[
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("isAdmin", "is_admin"),
];

const COLUMNS: &str = "username, first_name, last_name, email, is_admin";

/// A user row without the password hash. This is the only shape that leaves
/// the model layer.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, FromRow)]
struct UserWithPassword {
    username: String,
    first_name: String,
    last_name: String,
    email: String,
    is_admin: bool,
    password: String,
}

impl From<UserWithPassword> for User {
    fn from(row: UserWithPassword) -> Self {
        Self {
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            is_admin: row.is_admin,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserNew {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Username is fixed; the admin flag is not self-service (see the routes).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl User {
    /// Create a user with a freshly hashed password.
    pub async fn register(pool: &PgPool, data: UserNew) -> Result<User, DbError> {
        let hashed = hash_password(data.password).await?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password, first_name, last_name, email, is_admin) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING username, first_name, last_name, email, is_admin",
        )
        .bind(&data.username)
        .bind(&hashed)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(&data.email)
        .bind(data.is_admin)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Check credentials. `Ok(None)` means unknown user or wrong password;
    /// the caller decides how to report that.
    pub async fn authenticate(
        pool: &PgPool,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {}, password FROM users WHERE username = $1",
            COLUMNS
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if verify_password(password.to_string(), row.password.clone()).await? {
            Ok(Some(row.into()))
        } else {
            Ok(None)
        }
    }

    pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, DbError> {
        let users =
            sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY username", COLUMNS))
                .fetch_all(pool)
                .await?;

        Ok(users)
    }

    pub async fn get(pool: &PgPool, username: &str) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            COLUMNS
        ))
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("No user: {}", username)))
    }

    /// Sparse update. A new password is hashed before it reaches the
    /// statement; everything else passes through the fragment builder as-is.
    pub async fn update(
        pool: &PgPool,
        username: &str,
        mut data: UserUpdate,
    ) -> Result<User, DbError> {
        let password = data.password.take();
        let mut fields = update_fields(serde_json::to_value(&data)?);
        if let Some(password) = password {
            fields.insert("password".to_string(), Value::String(hash_password(password).await?));
        }

        let fragment = build_partial_update(&fields, ALIASES)?;

        let sql = format!(
            "UPDATE users SET {} WHERE username = ${} RETURNING {}",
            fragment.set_clause,
            fragment.values.len() + 1,
            COLUMNS
        );

        let mut query = sqlx::query_as::<_, User>(&sql);
        for value in &fragment.values {
            query = bind_value(query, value);
        }

        query
            .bind(username)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("No user: {}", username)))
    }

    pub async fn remove(pool: &PgPool, username: &str) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("No user: {}", username)));
        }

        Ok(())
    }
}

// bcrypt is CPU-bound, so both directions run on the blocking pool.

async fn hash_password(password: String) -> Result<String, DbError> {
    let cost = config::config().security.bcrypt_cost;

    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| DbError::Hash(e.to_string()))?
        .map_err(|e| DbError::Hash(e.to_string()))
}

async fn verify_password(password: String, hash: String) -> Result<bool, DbError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| DbError::Hash(e.to_string()))?
        .map_err(|e| DbError::Hash(e.to_string()))
}
