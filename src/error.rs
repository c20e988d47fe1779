/// Job result
pub type Result<T> = core::result::Result<T, self::Error>;

/// Closed set of job error kinds.
///
/// Codes are flat integers: `0` means success, `1` is reserved for killed jobs
/// and every kind raised by a request starts after `100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
  /// No error occurred
  NoError = 0,
  /// The job was killed before it could finish
  Killed = 1,
  /// Neither the job nor the context has a configuration
  MissingConfig = 101,
  /// The configuration has no host name
  MissingHost,
  /// The endpoint needs authentication but no user name is configured
  MissingUser,
  /// The endpoint needs authentication but no password is configured
  MissingPassword,
  /// HTTP 401
  AuthNFailed,
  /// HTTP 403
  AuthZFailed,
  /// The generated request URL is not valid
  InvalidRequestUrl,
  /// No reply within the request timeout
  RequestTimedOut,
  /// The reply body is not valid JSON
  JsonParseError,
  /// JSON array where an object was expected, or the other way round
  WrongOutputType,
  /// The reply body parsed to empty JSON
  EmptyJson,
  /// The reply body is empty
  EmptyReply,
  /// Any other transport or HTTP failure
  NetworkError,
  /// TLS handshake or certificate failure
  SslError,
  /// An image was expected but the server sent something else
  InvalidImageType,
  /// The target user id is empty
  EmptyUser,
  /// The requested entity does not exist
  NotFound,
  /// The credentials are already an application password
  AlreadyAppPassword,
  /// The server reported a failure the client can not interpret
  UnknownError,
}

const UNKNOWN: &str = "Sorry, but unfortunately an unknown error has occurred.";

impl ErrorCode {
  /// Integer value of this code
  pub fn code(self) -> i32 {
    self as i32
  }

  /// Map an integer back to a kind. Integers that name no kind map to `UnknownError`.
  pub fn from_code(code: i32) -> Self {
    use ErrorCode::*;

    [NoError,
     Killed,
     MissingConfig,
     MissingHost,
     MissingUser,
     MissingPassword,
     AuthNFailed,
     AuthZFailed,
     InvalidRequestUrl,
     RequestTimedOut,
     JsonParseError,
     WrongOutputType,
     EmptyJson,
     EmptyReply,
     NetworkError,
     SslError,
     InvalidImageType,
     EmptyUser,
     NotFound,
     AlreadyAppPassword,
     UnknownError].iter()
                  .copied()
                  .find(|kind| kind.code() == code)
                  .unwrap_or(UnknownError)
  }

  /// Human readable message for this kind.
  ///
  /// Kinds carrying a parameter substitute `text` into their template;
  /// network and TLS failures use `text` as the message.
  pub fn message(self, text: &str) -> String {
    use ErrorCode::*;

    match self {
      | NoError => String::new(),
      | Killed => "The job was killed.".into(),
      | MissingConfig => "No configuration set.".into(),
      | MissingHost => "Missing remote host name.".into(),
      | MissingUser => "Missing username.".into(),
      | MissingPassword => "Missing user password.".into(),
      | AuthNFailed => {
        "Authentication failed at the remote server, please check your username and password.".into()
      },
      | AuthZFailed => "Authorization failed, you are not allowed to perform this request.".into(),
      | InvalidRequestUrl => format!("The URL ({}) generated to perform the request is not valid, please check your input values.",
                                     text),
      | RequestTimedOut => format!("The request timed out after {} seconds.", text),
      | JsonParseError => format!("Failed to parse the received JSON data: {}", text),
      | WrongOutputType => "Unexpected JSON type in received data.".into(),
      | EmptyJson | EmptyReply => "Unexpected empty reply data.".into(),
      | NetworkError | SslError if !text.is_empty() => text.into(),
      | SslError => "Can not perform API request. An unknown SSL error has occured.".into(),
      | InvalidImageType => format!("Expected reply content of type image, but received content of type “{}”.", text),
      | EmptyUser => "The requested user id is empty.".into(),
      | NotFound => format!("The requested entity “{}” was not found.", text),
      | AlreadyAppPassword => "The password used is already an application password.".into(),
      | NetworkError | UnknownError => UNKNOWN.into(),
    }
  }
}

/// A job error: the kind plus a free-form text that parameterises the message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}", .code.message(.text))]
pub struct Error {
  /// Error kind
  pub code: ErrorCode,
  /// Kind-specific detail (URL, timeout seconds, parser message, id, ...)
  pub text: String,
}

impl Error {
  /// Error without a text
  pub fn new(code: ErrorCode) -> Self {
    Self { code,
           text: String::new() }
  }

  /// Error carrying a text
  pub fn with_text(code: ErrorCode, text: impl ToString) -> Self {
    Self { code,
           text: text.to_string() }
  }
}

impl From<ErrorCode> for Error {
  fn from(code: ErrorCode) -> Self {
    Self::new(code)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_round_trip_through_integers() {
    assert_eq!(ErrorCode::from_code(0), ErrorCode::NoError);
    assert_eq!(ErrorCode::from_code(1), ErrorCode::Killed);
    assert_eq!(ErrorCode::MissingConfig.code(), 101);
    assert_eq!(ErrorCode::from_code(ErrorCode::SslError.code()), ErrorCode::SslError);
    assert_eq!(ErrorCode::from_code(4711), ErrorCode::UnknownError);
  }

  #[test]
  fn every_failure_has_a_message() {
    for code in 1..=130 {
      let kind = ErrorCode::from_code(code);
      assert!(!kind.message("").is_empty(), "{:?} has no message", kind);
    }
  }

  #[test]
  fn parameterised_messages_carry_text() {
    assert_eq!(Error::with_text(ErrorCode::RequestTimedOut, 300).to_string(),
               "The request timed out after 300 seconds.");
    assert!(Error::with_text(ErrorCode::InvalidRequestUrl, "http://in valid").to_string()
                                                                              .contains("http://in valid"));
    assert_eq!(Error::with_text(ErrorCode::NetworkError, "connection refused").to_string(),
               "connection refused");
    assert_eq!(Error::new(ErrorCode::UnknownError).to_string(), UNKNOWN);
  }
}
