/// String comparisons
pub mod str;
