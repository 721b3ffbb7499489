use serde_json::{Map, Value};
use sqlx::postgres::PgArguments;
use sqlx::FromRow;

use crate::database::DbError;

/// SET clause plus its bind values, in matching order.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub set_clause: String,
    pub values: Vec<Value>,
}

/// Build the SET clause and bind list for a sparse UPDATE.
///
/// Each key in `data` becomes a `"column"=$N` assignment, where the column
/// name is looked up in `aliases` and falls back to the key itself. Positions
/// are 1-based and follow the key order of `data`, as do the returned values.
/// Callers append their own bind parameters (the row identifier) after the
/// values, at placeholder `values.len() + 1`.
///
/// Only values are parameterized. Column names go into the statement as-is,
/// so `data` keys must come from a trusted field set.
///
/// {firstName: "Aliya", age: 32} => "first_name"=$1, "age"=$2
pub fn build_partial_update(
    data: &Map<String, Value>,
    aliases: &[(&str, &str)],
) -> Result<SqlFragment, DbError> {
    if data.is_empty() {
        return Err(DbError::EmptyUpdate);
    }

    let mut clauses = Vec::with_capacity(data.len());
    let mut values = Vec::with_capacity(data.len());

    for (idx, (field, value)) in data.iter().enumerate() {
        let column = aliases
            .iter()
            .find(|(name, _)| *name == field.as_str())
            .map(|(_, column)| *column)
            .unwrap_or(field.as_str());

        clauses.push(format!("\"{}\"=${}", column, idx + 1));
        values.push(value.clone());
    }

    Ok(SqlFragment {
        set_clause: clauses.join(", "),
        values,
    })
}

/// Flatten a serialized update payload into its field map.
///
/// Update payload structs skip `None` fields when serializing, so the map
/// holds exactly the fields the client sent.
pub fn update_fields(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Append a JSON value to a query's bind arguments.
pub fn bind_value<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Non-scalar values only reach here through JSONB columns
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn aliases_map_to_physical_columns() {
        let frag = build_partial_update(
            &fields(json!({ "firstName": "Aliya", "age": 32 })),
            &[("firstName", "first_name")],
        )
        .unwrap();

        assert_eq!(frag.set_clause, r#""first_name"=$1, "age"=$2"#);
        assert_eq!(frag.values, vec![json!("Aliya"), json!(32)]);
    }

    #[test]
    fn unaliased_keys_pass_through_verbatim() {
        let frag =
            build_partial_update(&fields(json!({ "name": "Apple", "description": null })), &[])
                .unwrap();

        assert_eq!(frag.set_clause, r#""name"=$1, "description"=$2"#);
        assert_eq!(frag.values, vec![json!("Apple"), Value::Null]);
    }

    #[test]
    fn placeholders_count_and_order_follow_the_keys() {
        let data = fields(json!({
            "title": "Boss",
            "salary": 100000,
            "equity": 0.25,
            "active": true
        }));
        let frag = build_partial_update(&data, &[]).unwrap();

        assert_eq!(frag.values.len(), data.len());
        assert_eq!(
            frag.set_clause,
            r#""title"=$1, "salary"=$2, "equity"=$3, "active"=$4"#
        );
        // A caller-appended row identifier lands at the next position
        assert_eq!(frag.values.len() + 1, 5);
    }

    #[test]
    fn empty_data_is_rejected() {
        let err = build_partial_update(&Map::new(), &[]).unwrap_err();
        assert!(matches!(err, DbError::EmptyUpdate));

        let err =
            build_partial_update(&Map::new(), &[("firstName", "first_name")]).unwrap_err();
        assert!(matches!(err, DbError::EmptyUpdate));
    }

    #[test]
    fn update_fields_flattens_serialized_payloads() {
        let map = update_fields(json!({ "name": "Apple" }));
        assert_eq!(map.len(), 1);

        assert!(update_fields(Value::Null).is_empty());
    }
}
