// JSON request body helpers
//
// Bodies are parsed into a loose JSON object first so that missing keys and
// wrong types can be reported with the messages clients already expect.

use serde_json::{Map, Value};

use super::handlers::ApiError;

/// A request body that parsed as a JSON object
#[derive(Debug)]
pub struct JsonBody {
    fields: Map<String, Value>,
}

impl JsonBody {
    /// Parse a body whose main key is `primary_key`
    ///
    /// Anything other than a JSON object is reported as a missing body.
    pub fn parse(bytes: &[u8], primary_key: &str) -> Result<Self, ApiError> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            _ => Err(ApiError::MissingBody(format!(
                "Missing JSON body with key '{}'",
                primary_key
            ))),
        }
    }

    /// Value of `key`, with JSON null treated as absent
    fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn required_str(&self, key: &str) -> Result<String, ApiError> {
        match self.get(key) {
            None => Err(ApiError::missing_key(key)),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ApiError::invalid_value(key, "string")),
        }
    }

    pub fn optional_str(&self, key: &str, default: &str) -> Result<String, ApiError> {
        match self.get(key) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ApiError::invalid_value(key, "string")),
        }
    }

    pub fn optional_positive_u32(&self, key: &str, default: u32) -> Result<u32, ApiError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ApiError::invalid_value(key, "positive integer")),
        }
    }
}
