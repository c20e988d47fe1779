use serde_json::{json, Value};

use super::{f64_of, i64_of};

/// Storage quota of a user. Byte counts are signed; the server reports
/// negative values for unlimited quotas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quota {
  free: i64,
  used: i64,
  quota: i64,
  total: i64,
  relative: f64,
}

impl Quota {
  /// Quota from its parts. Negative `free` is clamped to `0`, `relative` to `0..=100`.
  pub fn new(free: i64, used: i64, quota: i64, total: i64, relative: f64) -> Self {
    Self { free: free.max(0),
           used,
           quota,
           total,
           relative: relative.max(0.0).min(100.0) }
  }

  /// Quota from the `quota` object of a user. An empty object has no quota.
  pub fn from_json(json: &Value) -> Option<Self> {
    match json.as_object() {
      | Some(obj) if !obj.is_empty() => Some(Self::new(i64_of(json, "free"),
                                                      i64_of(json, "used"),
                                                      i64_of(json, "quota"),
                                                      i64_of(json, "total"),
                                                      f64_of(json, "relative"))),
      | _ => None,
    }
  }

  /// JSON shaped like the server's `quota` object
  pub fn to_json(&self) -> Value {
    json!({
      "free": self.free,
      "used": self.used,
      "total": self.total,
      "relative": self.relative,
      "quota": self.quota,
    })
  }

  /// Free bytes
  pub fn free(&self) -> i64 {
    self.free
  }

  /// Used bytes
  pub fn used(&self) -> i64 {
    self.used
  }

  /// Quota in bytes
  pub fn quota(&self) -> i64 {
    self.quota
  }

  /// Total bytes (free + used)
  pub fn total(&self) -> i64 {
    self.total
  }

  /// Percentage used
  pub fn relative(&self) -> f64 {
    self.relative
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clamps() {
    let q = Quota::new(-3, 10, -3, 10, 150.0);
    assert_eq!(q.free(), 0);
    assert_eq!(q.quota(), -3);
    assert_eq!(q.relative(), 100.0);
    assert_eq!(Quota::new(0, 0, 0, 0, -1.0).relative(), 0.0);
  }

  #[test]
  fn json() {
    let src = json!({"free": 209639130, "used": 76070, "total": 209715200, "relative": 0.04, "quota": 209715200});
    let q = Quota::from_json(&src).unwrap();
    assert_eq!(q.used(), 76070);
    assert_eq!(q.to_json(), src);

    assert_eq!(Quota::from_json(&json!({})), None);
    assert_eq!(Quota::from_json(&Value::Null), None);
  }
}
