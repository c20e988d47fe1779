/// Extra string stuff
pub trait StrExtra {
  /// Equal after trimming and ignoring case
  fn loose_eq<O: AsRef<str>>(&self, other: O) -> bool;
}

impl<T: AsRef<str>> StrExtra for T {
  fn loose_eq<O: AsRef<str>>(&self, other: O) -> bool {
    self.as_ref().trim().to_lowercase() == other.as_ref().trim().to_lowercase()
  }
}

#[cfg(test)]
mod tests {
  use super::StrExtra;

  #[test]
  fn loose_eq_ignores_case_and_padding() {
    assert!("Failure".loose_eq(" failure "));
    assert!(!"ok".loose_eq("failure"));
  }
}
