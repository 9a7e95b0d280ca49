//! Naming rules for record ids and collection names.
//!
//! - Record ids must be non-empty, at most [`MAX_NAME_LEN`] characters, and
//!   must not contain `/`
//! - `parentid` / `predecessorid` references share the length bound but
//!   carry no character restriction of their own
//! - Collection names are at most [`MAX_NAME_LEN`] characters
//!
//! Lengths are counted in characters, not bytes.

/// Maximum length of a record id, reference id, or collection name.
pub const MAX_NAME_LEN: usize = 64;

/// Returns `true` if `id` is acceptable as a record id.
///
/// # Examples
///
/// ```
/// use wsync_types::names::is_valid_record_id;
///
/// assert!(is_valid_record_id("{a1b2c3}"));
/// assert!(!is_valid_record_id(""));
/// assert!(!is_valid_record_id("a/b"));
/// ```
pub fn is_valid_record_id(id: &str) -> bool {
    !id.is_empty() && within_limit(id) && !id.contains('/')
}

/// Returns `true` if `id` fits the length bound for parent/predecessor links.
pub fn is_valid_reference_id(id: &str) -> bool {
    within_limit(id)
}

/// Returns `true` if `name` fits the length bound for collection names.
pub fn is_valid_collection_name(name: &str) -> bool {
    within_limit(name)
}

fn within_limit(s: &str) -> bool {
    s.chars().count() <= MAX_NAME_LEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn record_id_boundaries() {
        assert!(is_valid_record_id(&"x".repeat(64)));
        assert!(!is_valid_record_id(&"x".repeat(65)));
        assert!(!is_valid_record_id("/"));
    }

    #[test]
    fn multibyte_ids_count_characters() {
        let id = "é".repeat(64);
        assert!(id.len() > 64);
        assert!(is_valid_record_id(&id));
    }

    #[test]
    fn reference_ids_may_be_empty_or_contain_slash() {
        assert!(is_valid_reference_id(""));
        assert!(is_valid_reference_id("a/b"));
        assert!(!is_valid_reference_id(&"p".repeat(65)));
    }

    #[test]
    fn collection_name_length() {
        assert!(is_valid_collection_name("bookmarks"));
        assert!(!is_valid_collection_name(&"c".repeat(65)));
    }

    proptest! {
        #[test]
        fn ids_with_slash_are_never_valid(prefix in "[a-z0-9]{0,30}", suffix in "[a-z0-9]{0,30}") {
            let id = format!("{prefix}/{suffix}");
            prop_assert!(!is_valid_record_id(&id));
        }

        #[test]
        fn short_slashless_ids_are_valid(id in "[A-Za-z0-9_{}-]{1,64}") {
            prop_assert!(is_valid_record_id(&id));
        }
    }
}
