use serde_json::Value;

/// Storage quota
pub mod quota;

/// Server status
pub mod server_status;

/// User account
pub mod user;

pub use quota::Quota;
pub use server_status::ServerStatus;
pub use user::{BackendCapabilities, User};

// Lenient field readers: absent or wrongly typed fields read as empty, zero or false.

fn str_of(json: &Value, key: &str) -> String {
  json.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn bool_of(json: &Value, key: &str) -> bool {
  json.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn f64_of(json: &Value, key: &str) -> f64 {
  json.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn i64_of(json: &Value, key: &str) -> i64 {
  f64_of(json, key) as i64
}

fn strings_of(json: &Value, key: &str) -> Vec<String> {
  json.get(key)
      .and_then(Value::as_array)
      .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
      .unwrap_or_default()
}
