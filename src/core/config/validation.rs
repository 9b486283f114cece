use serde_json::{Map, Value};
use crate::core::errors::ApiError;

/// Upper bound on the candidate pool of a single vector search.
pub const MAX_NUM_CANDIDATES: u64 = 10_000;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(app) = expect_optional_object(root, "app")? {
        validate_u64_field(app, "app.max_steps", "max_steps", 1, 10_000)?;
        validate_u64_field(app, "app.step_timeout_secs", "step_timeout_secs", 1, 86_400)?;
        validate_u64_field(
            app,
            "app.max_input_length",
            "max_input_length",
            1,
            10_000_000,
        )?;
    }

    if let Some(database) = expect_optional_object(root, "database")? {
        validate_optional_string_field(database, "database.path", "path")?;
        validate_identifier_field(database, "database.full_collection", "full_collection")?;
        validate_identifier_field(database, "database.vs_collection", "vs_collection")?;
        validate_optional_string_field(database, "database.vector_index", "vector_index")?;

        let full = database.get("full_collection").and_then(|v| v.as_str());
        let passages = database.get("vs_collection").and_then(|v| v.as_str());
        if full.is_some() && full == passages {
            return Err(ApiError::BadRequest(
                "Invalid config at 'database': full_collection and vs_collection must differ"
                    .to_string(),
            ));
        }
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 1, 8_192)?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 1_000)?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 86_400)?;
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(
            retrieval,
            "retrieval.num_candidates",
            "num_candidates",
            1,
            MAX_NUM_CANDIDATES,
        )?;
        validate_u64_field(retrieval, "retrieval.limit", "limit", 1, MAX_NUM_CANDIDATES)?;

        let num_candidates = retrieval
            .get("num_candidates")
            .and_then(|v| v.as_u64())
            .unwrap_or(150);
        let limit = retrieval.get("limit").and_then(|v| v.as_u64()).unwrap_or(5);
        if limit > num_candidates {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'retrieval.limit': {} exceeds num_candidates ({})",
                limit, num_candidates
            )));
        }
    }

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_u64_field(
            server,
            "server.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
    }

    Ok(())
}

/// Collection names double as SQLite table names.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_identifier_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !is_valid_identifier(text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': '{}' is not a valid collection name",
            path, text
        )));
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_is_valid() {
        assert!(validate_config(&json!({})).is_ok());
    }

    #[test]
    fn root_must_be_object() {
        assert!(validate_config(&json!([1, 2])).is_err());
    }

    #[test]
    fn limit_cannot_exceed_candidate_pool() {
        let err = validate_config(&json!({
            "retrieval": { "num_candidates": 10, "limit": 11 }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("retrieval.limit"));

        assert!(validate_config(&json!({ "retrieval": { "limit": 151 } })).is_err());
        assert!(validate_config(&json!({ "retrieval": { "num_candidates": 200, "limit": 151 } })).is_ok());
    }

    #[test]
    fn collection_names_must_be_identifiers() {
        assert!(validate_config(&json!({ "database": { "vs_collection": "chunked docs" } })).is_err());
        assert!(validate_config(&json!({ "database": { "full_collection": "1docs" } })).is_err());
        assert!(validate_config(&json!({ "database": { "full_collection": "pages" } })).is_ok());
    }

    #[test]
    fn collections_must_differ() {
        let err = validate_config(&json!({
            "database": { "full_collection": "docs", "vs_collection": "docs" }
        }))
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn numeric_ranges_and_types_are_checked() {
        assert!(validate_config(&json!({ "app": { "max_steps": 0 } })).is_err());
        assert!(validate_config(&json!({ "app": { "max_steps": "many" } })).is_err());
        assert!(validate_config(&json!({ "llm": { "temperature": 3.5 } })).is_err());
        assert!(validate_config(&json!({ "embedding": { "dimensions": 512 } })).is_ok());
        assert!(validate_config(&json!({ "llm": { "api_key": null } })).is_ok());
        assert!(validate_config(&json!({ "llm": { "api_key": "" } })).is_err());
    }

    #[test]
    fn identifier_rules() {
        assert!(is_valid_identifier("chunked_docs"));
        assert!(is_valid_identifier("_x1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("drop;table"));
    }
}
