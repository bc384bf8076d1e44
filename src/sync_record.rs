//! Per-root bookkeeping kept in the site key-value table.
//!
//! Two entries per root record the last successful sync:
//! - `librarian_build_menu_<root>`: comma-joined ids of the rows it created
//! - `librarian_build_menu_<root>_nav`: fingerprint of the manifest it used

use crate::storage::traits::MenuId;

const KEY_PREFIX: &str = "librarian_build_menu_";

/// Key holding the id list of a root's last sync.
pub fn menu_ids_key(root_key: &str) -> String {
    format!("{}{}", KEY_PREFIX, root_key)
}

/// Key holding the manifest fingerprint of a root's last sync.
pub fn menu_nav_key(root_key: &str) -> String {
    format!("{}{}_nav", KEY_PREFIX, root_key)
}

pub fn encode_ids(ids: &[MenuId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

/// Parse a stored id list. Blank segments are skipped; anything else that
/// is not an integer is reported back as `Err(segment)`.
pub fn decode_ids(value: &str) -> Result<Vec<MenuId>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<MenuId>().map_err(|_| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(menu_ids_key("def"), "librarian_build_menu_def");
        assert_eq!(menu_nav_key("def"), "librarian_build_menu_def_nav");
        assert_eq!(menu_nav_key("v2"), "librarian_build_menu_v2_nav");
    }

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode_ids(&[3, 4, 10]), "3,4,10");
        assert_eq!(encode_ids(&[]), "");
        assert_eq!(decode_ids("3,4,10"), Ok(vec![3, 4, 10]));
        assert_eq!(decode_ids(""), Ok(vec![]));
        assert_eq!(decode_ids(" 1, 2 ,"), Ok(vec![1, 2]));
        assert_eq!(decode_ids("1,x"), Err("x".to_string()));
    }
}
