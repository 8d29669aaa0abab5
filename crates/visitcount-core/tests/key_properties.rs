//! Property tests for page key derivation.

use proptest::prelude::*;
use visitcount_core::derive_page_key;

proptest! {
    #[test]
    fn derived_keys_use_a_safe_alphabet(path in ".{0,64}") {
        let key = derive_page_key(&path);
        prop_assert!(!key.is_empty());
        prop_assert!(key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(!key.starts_with('-'));
        prop_assert!(!key.ends_with('-'));
        prop_assert!(!key.contains("--"));
    }

    #[test]
    fn derivation_is_idempotent(path in "[/a-zA-Z0-9_.~ -]{0,48}") {
        let once = derive_page_key(&path);
        prop_assert_eq!(derive_page_key(&once), once.clone());
    }

    #[test]
    fn trailing_slash_does_not_change_the_key(path in "(/[a-z0-9]{1,8}){1,4}") {
        let with_slash = format!("{path}/");
        prop_assert_eq!(derive_page_key(&path), derive_page_key(&with_slash));
    }
}
