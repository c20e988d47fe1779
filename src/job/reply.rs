use bytes::Bytes;
use serde_json::Value;

use super::{endpoint::{self, ContentType, Endpoint},
            lifecycle::Output,
            request::{Failure, FailureKind, Reply}};
use crate::{error::{Error, ErrorCode, Result},
            extra::str::StrExtra,
            result_extra::ResultExtra};

/// Generic checks of a 2xx reply against the expected content
pub fn check_output(expected: ContentType, reply: &Reply) -> Result<Output> {
  if expected != ContentType::Empty && reply.body.is_empty() {
    return Err(ErrorCode::EmptyReply.into());
  }

  let json = match expected.is_json() {
    | true => Some(parse_json(expected, &reply.body)?),
    | false => None,
  };

  if expected == ContentType::Image && !reply.content_type.to_lowercase().contains("image") {
    return Err(Error::with_text(ErrorCode::InvalidImageType, &reply.content_type));
  }

  let meta_status = match (expected, &json) {
    | (ContentType::JsonObject, Some(json)) => meta_failure_status(json),
    | _ => 0,
  };

  Ok(Output { json,
              body: reply.body.clone(),
              meta_status })
}

fn parse_json(expected: ContentType, body: &[u8]) -> Result<Value> {
  serde_json::from_slice::<Value>(body).map_err(|e| Error::with_text(ErrorCode::JsonParseError, e))
                                       .filter(|json| !is_empty(json), |_| ErrorCode::EmptyJson.into())
                                       .filter(|json| match expected {
                                                 | ContentType::JsonArray => json.is_array(),
                                                 | _ => json.is_object(),
                                               },
                                               |_| ErrorCode::WrongOutputType.into())
}

fn is_empty(json: &Value) -> bool {
  match json {
    | Value::Null => true,
    | Value::Array(a) => a.is_empty(),
    | Value::Object(o) => o.is_empty(),
    | _ => false,
  }
}

/// `ocs.meta.statuscode` if `ocs.meta.status` is "failure", `0` otherwise
pub fn meta_failure_status(json: &Value) -> i32 {
  let meta = match json.pointer("/ocs/meta") {
    | Some(meta) => meta,
    | None => return 0,
  };

  let failed = meta.get("status")
                   .and_then(Value::as_str)
                   .map(|status| status.loose_eq("failure"))
                   .unwrap_or(false);

  if !failed {
    return 0;
  }

  meta.get("statuscode")
      .and_then(|code| code.as_i64().or_else(|| code.as_str().and_then(|s| s.trim().parse().ok())))
      .unwrap_or(0) as i32
}

/// Turn the result of sending a request into the job's outcome.
///
/// Timeouts and TLS failures are final; other failures go through
/// `Endpoint::extract_error`, which may accept them as an empty success.
pub fn classify(endpoint: &dyn Endpoint, sent: core::result::Result<Reply, Failure>) -> Result<Output> {
  match sent {
    | Ok(reply) if reply.is_success() => {
      let output = check_output(endpoint.expected_content(), &reply)?;
      endpoint.check_output(&output)?;
      Ok(output)
    },
    | Ok(reply) => failed(endpoint, &Failure::http(&reply.url, reply.status), reply.body),
    | Err(failure) => failed(endpoint, &failure, Bytes::new()),
  }
}

fn failed(endpoint: &dyn Endpoint, failure: &Failure, body: Bytes) -> Result<Output> {
  let accepted = match failure.kind {
    | FailureKind::TimedOut(_) | FailureKind::Tls => endpoint::extract_error(failure),
    | FailureKind::Http | FailureKind::Transport => endpoint.extract_error(failure),
  };

  accepted.map(|()| Output { json: None,
                             body,
                             meta_status: 0 })
}

#[cfg(test)]
mod tests {
  use reqwest::Url;
  use serde_json::json;

  use super::*;

  fn reply(status: u16, content_type: &str, body: &str) -> Reply {
    Reply { url: Url::parse("https://cloud.example.net/ocs/v1.php/x").unwrap(),
            status,
            content_type: content_type.into(),
            content_length: Some(body.len() as u64),
            body: Bytes::from(body.to_string()) }
  }

  fn code(r: Result<Output>) -> ErrorCode {
    r.unwrap_err().code
  }

  #[test]
  fn json_failures() {
    let obj = ContentType::JsonObject;
    assert_eq!(code(check_output(obj, &reply(200, "", ""))), ErrorCode::EmptyReply);
    assert_eq!(code(check_output(obj, &reply(200, "", "{nope"))), ErrorCode::JsonParseError);
    assert_eq!(code(check_output(obj, &reply(200, "", "{}"))), ErrorCode::EmptyJson);
    assert_eq!(code(check_output(obj, &reply(200, "", "null"))), ErrorCode::EmptyJson);
    assert_eq!(code(check_output(obj, &reply(200, "", "[1]"))), ErrorCode::WrongOutputType);
    assert_eq!(code(check_output(ContentType::JsonArray, &reply(200, "", r#"{"a": 1}"#))),
               ErrorCode::WrongOutputType);
  }

  #[test]
  fn parse_error_carries_parser_message() {
    let err = check_output(ContentType::JsonObject, &reply(200, "", "{nope")).unwrap_err();
    assert!(!err.text.is_empty());
  }

  #[test]
  fn empty_content_accepts_anything() {
    let out = check_output(ContentType::Empty, &reply(200, "", "")).unwrap();
    assert_eq!(out.json, None);
  }

  #[test]
  fn image_content_type() {
    let err = check_output(ContentType::Image, &reply(200, "text/html", "<html/>")).unwrap_err();
    assert_eq!(err, Error::with_text(ErrorCode::InvalidImageType, "text/html"));
    assert!(check_output(ContentType::Image, &reply(200, "image/png", "\u{89}PNG")).is_ok());
  }

  #[test]
  fn meta_status_of_failed_envelope() {
    let failed = json!({"ocs": {"meta": {"status": "Failure", "statuscode": 404}, "data": []}});
    let ok = json!({"ocs": {"meta": {"status": "ok", "statuscode": 100}, "data": {}}});
    let text = json!({"ocs": {"meta": {"status": "failure", "statuscode": "997"}}});

    assert_eq!(meta_failure_status(&failed), 404);
    assert_eq!(meta_failure_status(&ok), 0);
    assert_eq!(meta_failure_status(&text), 997);

    let out = check_output(ContentType::JsonObject, &reply(200, "", &failed.to_string())).unwrap();
    assert_eq!(out.meta_status, 404);
  }

  #[test]
  fn classification_is_deterministic() {
    let a = check_output(ContentType::JsonObject, &reply(200, "", r#"{"x": 1}"#));
    let b = check_output(ContentType::JsonObject, &reply(200, "", r#"{"x": 1}"#));
    assert_eq!(a, b);
  }
}
