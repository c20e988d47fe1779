/// Extra result methods
pub trait ResultExtra<T, E> {
  /// Give an `Err` a second chance: `f` may recover it into `Ok` or replace the error.
  fn and_then_err<R>(self, f: impl FnOnce(E) -> Result<T, R>) -> Result<T, R>;

  /// Keep an `Ok` only if it satisfies `pred`, otherwise turn the value into an error.
  fn filter(self, pred: impl FnOnce(&T) -> bool, err: impl FnOnce(T) -> E) -> Result<T, E>;
}

impl<T, E> ResultExtra<T, E> for Result<T, E> {
  fn and_then_err<R>(self, f: impl FnOnce(E) -> Result<T, R>) -> Result<T, R> {
    match self {
      | Ok(t) => Ok(t),
      | Err(e) => f(e),
    }
  }

  fn filter(self, pred: impl FnOnce(&T) -> bool, err: impl FnOnce(T) -> E) -> Result<T, E> {
    self.and_then(|t| match pred(&t) {
          | true => Ok(t),
          | false => Err(err(t)),
        })
  }
}

#[cfg(test)]
mod tests {
  use super::ResultExtra;

  #[test]
  fn filter_rejects_values() {
    let ok: Result<u8, String> = Ok(3);
    assert_eq!(ok.clone().filter(|n| *n > 2, |n| n.to_string()), Ok(3));
    assert_eq!(ok.filter(|n| *n > 5, |n| n.to_string()), Err("3".to_string()));
  }

  #[test]
  fn and_then_err_recovers() {
    let err: Result<u8, u16> = Err(404);
    assert_eq!(err.and_then_err(|code| if code == 404 { Ok(0) } else { Err(code) }),
               Ok::<u8, u16>(0));
  }
}
