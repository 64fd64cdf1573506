use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation.
/// Most requests have ≤16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered, multi-valued parameter storage.
///
/// A repeated name is stored as repeated pairs, so the values of a name are
/// the values of its pairs in appearance order.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Header storage; names are matched case-insensitively.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Parse an `application/x-www-form-urlencoded` query string.
///
/// Keys and values are percent-decoded (`+` is a space). A pair without `=`
/// yields an empty value. Repeated keys append.
#[must_use]
pub fn parse_query_string(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// All values recorded for `name`, in appearance order.
#[must_use]
pub fn values_of(params: &ParamVec, name: &str) -> Vec<String> {
    params
        .iter()
        .filter(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.clone())
        .collect()
}

/// Distinct parameter names in first-appearance order.
#[must_use]
pub fn names_of(params: &ParamVec) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (k, _) in params {
        if !names.iter().any(|n| n == k.as_ref()) {
            names.push(k.to_string());
        }
    }
    names
}

/// Split a dispatch target such as `/b?x=9` into its path and query string.
///
/// An empty query (`/b?`) is treated as no query.
#[must_use]
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) if !query.trim().is_empty() => (path, Some(query)),
        Some((path, _)) => (path, None),
        None => (target, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_accumulate_in_order() {
        let params = parse_query_string("a=1&b=x&a=2");
        assert_eq!(values_of(&params, "a"), vec!["1", "2"]);
        assert_eq!(values_of(&params, "b"), vec!["x"]);
        assert_eq!(names_of(&params), vec!["a", "b"]);
    }

    #[test]
    fn test_decoding_and_missing_values() {
        let params = parse_query_string("q=hello+world&p=%2Fpath&flag");
        assert_eq!(values_of(&params, "q"), vec!["hello world"]);
        assert_eq!(values_of(&params, "p"), vec!["/path"]);
        assert_eq!(values_of(&params, "flag"), vec![""]);
        assert!(values_of(&params, "missing").is_empty());
    }

    #[test]
    fn test_split_target() {
        assert_eq!(split_target("/b?x=9"), ("/b", Some("x=9")));
        assert_eq!(split_target("/b"), ("/b", None));
        assert_eq!(split_target("/b?"), ("/b", None));
        assert_eq!(split_target("/b?x=1?y"), ("/b", Some("x=1?y")));
    }
}
