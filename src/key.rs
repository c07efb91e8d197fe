//! Key normalization.
//!
//! Every key is turned into its `Display` string before it touches the map,
//! so `5`, `5u64` and `"5"` all address the same slot.

use std::fmt::Display;

/// Normalize a caller-supplied key into the string used for storage.
#[inline]
pub fn normalize_key(key: impl Display) -> String {
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_key;

    #[test]
    fn numbers_and_strings_collide() {
        assert_eq!(normalize_key(5), normalize_key("5"));
        assert_eq!(normalize_key(5u64), "5");
        assert_eq!(normalize_key(-12i32), "-12");
    }

    #[test]
    fn owned_and_borrowed_strings_agree() {
        let owned = String::from("guild:1");
        assert_eq!(normalize_key(&owned), normalize_key("guild:1"));
        assert_eq!(normalize_key(owned), "guild:1");
    }

    #[test]
    fn chars_and_bools() {
        assert_eq!(normalize_key('x'), "x");
        assert_eq!(normalize_key(true), "true");
    }
}
