//! Structured value encoding, path joining and query merging.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

/// Ordered key/value pairs produced by the structured encoder.
pub type Pairs = Vec<(String, String)>;

/// Encode a struct or map into key/value pairs.
///
/// Scalars become one pair each and `None` fields are skipped. A sequence
/// of scalars repeats its key once per element (`tag=a&tag=b`) and a nested
/// struct prefixes its keys with the parent's (`page[size]=10`). A list of
/// `(key, value)` tuples is accepted as well. Any other top-level shape,
/// such as a bare number, is rejected.
pub fn encode_pairs<T: Serialize + ?Sized>(value: &T) -> Result<Pairs, String> {
    let mut pairs = Pairs::new();
    match serde_json::to_value(value).map_err(|e| e.to_string())? {
        Value::Null => {}
        Value::Object(fields) => {
            for (key, value) in fields {
                push_field(&mut pairs, key, value)?;
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        if let (Some(Value::String(key)), Some(value)) = (pair.next(), pair.next()) {
                            push_field(&mut pairs, key, value)?;
                            continue;
                        }
                        return Err("expected (key, value) pairs with string keys".to_string());
                    }
                    other => {
                        return Err(format!("expected (key, value) pairs, found {}", kind(&other)))
                    }
                }
            }
        }
        other => return Err(format!("expected a struct or map, found {}", kind(&other))),
    }
    Ok(pairs)
}

fn push_field(pairs: &mut Pairs, key: String, value: Value) -> Result<(), String> {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Null => {}
                    Value::Array(_) | Value::Object(_) => {
                        return Err(format!("field {key:?}: sequence of {}", kind(&item)));
                    }
                    scalar => pairs.push((key.clone(), scalar_text(scalar))),
                }
            }
        }
        Value::Object(fields) => {
            for (child, value) in fields {
                push_field(pairs, format!("{key}[{child}]"), value)?;
            }
        }
        scalar => pairs.push((key, scalar_text(scalar))),
    }
    Ok(())
}

fn scalar_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "sequences",
        Value::Object(_) => "structs",
    }
}

/// Encode pairs in canonical form: stably sorted by key, escaped as
/// `application/x-www-form-urlencoded`.
pub fn encode_canonical<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<_> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Whether a value serializes to nothing at all (`None`, unit).
pub(crate) fn is_absent<T: Serialize + ?Sized>(value: &T) -> bool {
    matches!(serde_json::to_value(value), Ok(serde_json::Value::Null))
}

/// Join path segments onto a base path.
///
/// Exactly one `/` separates every segment regardless of the slashes the
/// caller supplied. `.` segments are dropped and `..` removes the segment
/// before it; the result is always rooted and never ends with `/`.
pub fn join_path<'a, I>(base: &'a str, segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parts: Vec<&str> = Vec::new();

    for piece in std::iter::once(base).chain(segments) {
        for part in piece.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                part => parts.push(part),
            }
        }
    }

    format!("/{}", parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Search {
        q: String,
        page: u32,
        draft: Option<bool>,
    }

    #[test]
    fn test_encode_struct_pairs() {
        let search = Search {
            q: "rust lang".to_string(),
            page: 2,
            draft: None,
        };

        let pairs = encode_pairs(&search).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "rust lang".to_string()),
            ]
        );
    }

    #[derive(Serialize)]
    struct Tags<'a> {
        tag: Vec<&'a str>,
        page: u32,
    }

    #[test]
    fn test_encode_sequence_repeats_key() {
        let tags = Tags {
            tag: vec!["a", "b"],
            page: 1,
        };

        let pairs = encode_pairs(&tags).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("page".to_string(), "1".to_string()),
                ("tag".to_string(), "a".to_string()),
                ("tag".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(
            encode_canonical(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            "page=1&tag=a&tag=b"
        );
    }

    #[test]
    fn test_encode_nested_struct_brackets_keys() {
        #[derive(Serialize)]
        struct Paging {
            size: u32,
            last: Option<String>,
        }
        #[derive(Serialize)]
        struct Listing {
            draft: bool,
            page: Paging,
        }

        let listing = Listing {
            draft: false,
            page: Paging {
                size: 10,
                last: None,
            },
        };
        assert_eq!(
            encode_pairs(&listing).unwrap(),
            vec![
                ("draft".to_string(), "false".to_string()),
                ("page[size]".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_encode_tuple_list_keeps_order() {
        let pairs = encode_pairs(&[("z", "1"), ("a", "2"), ("z", "3")]).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("z".to_string(), "1".to_string()),
                ("a".to_string(), "2".to_string()),
                ("z".to_string(), "3".to_string()),
            ]
        );
        assert!(encode_pairs(&[1, 2]).is_err());
    }

    #[test]
    fn test_encode_rejects_nested_sequences() {
        let mut map = BTreeMap::new();
        map.insert("grid", vec![vec![1, 2], vec![3]]);

        let err = encode_pairs(&map).unwrap_err();
        assert!(err.contains("grid"), "{err}");
    }

    #[test]
    fn test_encode_map_pairs() {
        let mut map = BTreeMap::new();
        map.insert("b", "2");
        map.insert("a", "1");

        let pairs = encode_pairs(&map).unwrap();
        assert_eq!(pairs[0], ("a".to_string(), "1".to_string()));
        assert_eq!(pairs[1], ("b".to_string(), "2".to_string()));
    }

    #[test]
    fn test_encode_rejects_scalar() {
        assert!(encode_pairs(&42).is_err());
        assert!(encode_pairs("plain").is_err());
        assert!(encode_pairs(&None::<Search>).unwrap().is_empty());
    }

    #[test]
    fn test_canonical_sorts_by_key_and_keeps_value_order() {
        let encoded = encode_canonical(vec![("z", "1"), ("a", "x y"), ("m", "2"), ("a", "&")]);
        assert_eq!(encoded, "a=x+y&a=%26&m=2&z=1");
    }

    #[test]
    fn test_is_absent() {
        assert!(is_absent(&None::<Search>));
        assert!(is_absent(&()));
        assert!(!is_absent(&Some(1)));
        assert!(!is_absent(&BTreeMap::<String, String>::new()));
    }

    #[test]
    fn test_join_path_normalizes_slashes() {
        assert_eq!(join_path("", ["users"]), "/users");
        assert_eq!(join_path("/", ["/users/", "/cizixs/"]), "/users/cizixs");
        assert_eq!(join_path("/api/", ["v1", "repos"]), "/api/v1/repos");
        assert_eq!(join_path("/api", ["//double//slash"]), "/api/double/slash");
    }

    #[test]
    fn test_join_path_cleans_dot_segments() {
        assert_eq!(join_path("/api/v1", ["../v2", "./items"]), "/api/v2/items");
        assert_eq!(join_path("/", [".."]), "/");
    }

    proptest! {
        #[test]
        fn test_join_path_single_separator(
            base in "[a-z]{0,6}",
            a in "[a-z]{1,8}",
            b in "[a-z]{1,8}",
            lead_a in prop::bool::ANY,
            trail_a in prop::bool::ANY,
            lead_b in prop::bool::ANY,
            trail_b in prop::bool::ANY,
        ) {
            let wrap = |s: &str, lead: bool, trail: bool| {
                format!("{}{}{}", if lead { "/" } else { "" }, s, if trail { "/" } else { "" })
            };
            let seg_a = wrap(&a, lead_a, trail_a);
            let seg_b = wrap(&b, lead_b, trail_b);
            let base_path = format!("/{base}");

            let joined = join_path(&base_path, [seg_a.as_str(), seg_b.as_str()]);

            let expected = if base.is_empty() {
                format!("/{a}/{b}")
            } else {
                format!("/{base}/{a}/{b}")
            };
            prop_assert_eq!(joined, expected);
        }
    }
}
