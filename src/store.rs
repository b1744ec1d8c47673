//! Auto-store-data: folding submitted fields into session data.
//!
//! Every request's form body and query string are merged into the session,
//! body first and query second, so a query value wins over a body value for
//! the same key. The rules, per incoming key:
//!
//! | Incoming | Effect on session data |
//! |---|---|
//! | key starts with `_` | ignored (CSRF tokens, kit-internal fields) |
//! | `"_unchecked"` | key removed |
//! | sequence | replaced, with every `"_unchecked"` element dropped |
//! | mapping | merged key by key, recursively |
//! | anything else | overwritten |

use crate::value::{SessionData, Value};

/// Merges `input` into `data` in place.
///
/// Total over every [`SessionData`]: there is nothing to fail on.
///
/// ```rust
/// use protokit::{SessionData, Value, store};
///
/// let input: SessionData = [
///     ("name".to_owned(), Value::from("John")),
///     ("_csrf".to_owned(), Value::from("x")),
/// ].into_iter().collect();
///
/// let mut data = SessionData::new();
/// store::merge(&input, &mut data);
///
/// assert_eq!(data.len(), 1);
/// assert_eq!(data["name"], Value::from("John"));
/// ```
pub fn merge(input: &SessionData, data: &mut SessionData) {
    for (key, value) in input {
        if key.starts_with('_') {
            continue;
        }

        match value {
            v if v.is_unchecked() => {
                data.shift_remove(key);
            }
            Value::Sequence(items) => {
                let kept = items.iter().filter(|item| !item.is_unchecked()).cloned().collect();
                data.insert(key.clone(), Value::Sequence(kept));
            }
            Value::Mapping(nested) => {
                let slot = data
                    .entry(key.clone())
                    .or_insert_with(|| Value::Mapping(SessionData::new()));
                if !matches!(slot, Value::Mapping(_)) {
                    *slot = Value::Mapping(SessionData::new());
                }
                if let Value::Mapping(target) = slot {
                    merge(nested, target);
                }
            }
            scalar => {
                data.insert(key.clone(), scalar.clone());
            }
        }
    }
}

/// Merges a request's decoded body and then its query into `data`.
pub fn store_request_data(body: &SessionData, query: &SessionData, data: &mut SessionData) {
    merge(body, data);
    merge(query, data);
}

/// Fills top-level keys missing from `data` with `defaults`.
///
/// Existing session values win. The result lists the default keys first, in
/// their own order, followed by session keys the defaults do not mention.
pub fn apply_defaults(defaults: &SessionData, data: &mut SessionData) {
    if defaults.is_empty() {
        return;
    }
    let mut merged = defaults.clone();
    for (key, value) in data.drain(..) {
        merged.insert(key, value);
    }
    *data = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::UNCHECKED;
    use serde_json::json;

    fn data(value: serde_json::Value) -> SessionData {
        serde_json::from_value(value).unwrap()
    }

    fn keys(data: &SessionData) -> Vec<&str> {
        data.keys().map(String::as_str).collect()
    }

    #[test]
    fn stores_scalars_sequences_and_mappings() {
        let mut target = SessionData::new();
        merge(
            &data(json!({
                "firstName": "John",
                "colors": ["red", "blue"],
                "address": { "street": "123 Main St", "city": "London" }
            })),
            &mut target,
        );

        assert_eq!(
            target,
            data(json!({
                "firstName": "John",
                "colors": ["red", "blue"],
                "address": { "street": "123 Main St", "city": "London" }
            }))
        );
    }

    #[test]
    fn end_to_end_checkbox_submission() {
        let mut target = SessionData::new();
        merge(
            &data(json!({ "name": "John", "tags": ["a", UNCHECKED, "b"], "_csrf": "x" })),
            &mut target,
        );

        assert_eq!(target, data(json!({ "name": "John", "tags": ["a", "b"] })));
        assert_eq!(keys(&target), ["name", "tags"]);
    }

    #[test]
    fn ignores_underscore_fields_at_every_level() {
        let mut target = data(json!({ "_csrf": "kept", "user": { "_token": "kept" } }));
        merge(
            &data(json!({ "_csrf": "new", "_internal": "x", "user": { "_token": "new", "name": "Ann" } })),
            &mut target,
        );

        assert_eq!(target["_csrf"], Value::from("kept"));
        assert!(!target.contains_key("_internal"));
        assert_eq!(
            target["user"],
            Value::Mapping(data(json!({ "_token": "kept", "name": "Ann" })))
        );
    }

    #[test]
    fn unchecked_removes_the_key() {
        let mut target = data(json!({ "terms": "yes", "other": "stays" }));
        merge(&data(json!({ "terms": UNCHECKED })), &mut target);

        assert_eq!(target, data(json!({ "other": "stays" })));
    }

    #[test]
    fn unchecked_on_absent_key_is_a_no_op() {
        let mut target = data(json!({ "other": "stays" }));
        merge(&data(json!({ "terms": UNCHECKED })), &mut target);

        assert_eq!(target, data(json!({ "other": "stays" })));
    }

    #[test]
    fn removal_keeps_the_order_of_remaining_keys() {
        let mut target = data(json!({ "a": "1", "b": "2", "c": "3" }));
        merge(&data(json!({ "b": UNCHECKED })), &mut target);

        assert_eq!(keys(&target), ["a", "c"]);
    }

    #[test]
    fn all_unchecked_sequence_keeps_an_empty_key() {
        let mut target = data(json!({ "colors": ["red"] }));
        merge(&data(json!({ "colors": [UNCHECKED] })), &mut target);

        assert_eq!(target["colors"], Value::Sequence(vec![]));
    }

    #[test]
    fn sequences_replace_rather_than_append() {
        let mut target = data(json!({ "colors": ["red", "green"] }));
        merge(&data(json!({ "colors": ["blue"] })), &mut target);

        assert_eq!(target["colors"], Value::Sequence(vec!["blue".into()]));
    }

    #[test]
    fn nested_mappings_merge_key_by_key() {
        let mut target = data(json!({ "u": { "a": 1 } }));
        merge(&data(json!({ "u": { "b": 2 } })), &mut target);

        assert_eq!(target, data(json!({ "u": { "a": 1, "b": 2 } })));
    }

    #[test]
    fn nested_unchecked_removes_only_the_nested_key() {
        let mut target = data(json!({ "prefs": { "email": "yes", "sms": "yes" } }));
        merge(&data(json!({ "prefs": { "sms": UNCHECKED } })), &mut target);

        assert_eq!(target, data(json!({ "prefs": { "email": "yes" } })));
    }

    #[test]
    fn mapping_replaces_a_scalar_or_sequence() {
        let mut target = data(json!({ "a": "flat", "b": ["x"] }));
        merge(&data(json!({ "a": { "k": "v" }, "b": { "k": "v" } })), &mut target);

        assert_eq!(target, data(json!({ "a": { "k": "v" }, "b": { "k": "v" } })));
    }

    #[test]
    fn scalar_replaces_a_mapping() {
        let mut target = data(json!({ "a": { "k": "v" } }));
        merge(&data(json!({ "a": "flat" })), &mut target);

        assert_eq!(target["a"], Value::from("flat"));
    }

    #[test]
    fn query_wins_over_body() {
        let mut target = SessionData::new();
        store_request_data(
            &data(json!({ "value": "from-body", "nested": { "a": "body", "b": "body" } })),
            &data(json!({ "value": "from-query", "nested": { "a": "query" } })),
            &mut target,
        );

        assert_eq!(target["value"], Value::from("from-query"));
        assert_eq!(
            target["nested"],
            Value::Mapping(data(json!({ "a": "query", "b": "body" })))
        );
    }

    #[test]
    fn query_can_untick_what_the_body_ticked() {
        let mut target = SessionData::new();
        store_request_data(
            &data(json!({ "terms": "yes" })),
            &data(json!({ "terms": UNCHECKED })),
            &mut target,
        );

        assert!(target.is_empty());
    }

    #[test]
    fn defaults_fill_gaps_without_overriding() {
        let mut target = data(json!({ "name": "Ann", "extra": "x" }));
        apply_defaults(&data(json!({ "name": "Default", "country": "UK" })), &mut target);

        assert_eq!(target, data(json!({ "name": "Ann", "country": "UK", "extra": "x" })));
        assert_eq!(keys(&target), ["name", "country", "extra"]);
    }

    #[test]
    fn defaults_are_left_untouched() {
        let defaults = data(json!({ "list": ["a"] }));
        let mut target = SessionData::new();
        apply_defaults(&defaults, &mut target);
        merge(&data(json!({ "list": ["b"] })), &mut target);

        assert_eq!(defaults, data(json!({ "list": ["a"] })));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_key() -> impl Strategy<Value = String> {
            "_?[a-d]{1,2}"
        }

        fn arb_value(sentinel: bool) -> impl Strategy<Value = Value> {
            let scalar = prop_oneof![
                "[a-c]{0,2}".prop_map(Value::from),
                any::<bool>().prop_map(Value::Bool),
                (0_i64..100).prop_map(Value::from),
                Just(Value::from(if sentinel { UNCHECKED } else { "plain" })),
            ];
            scalar.prop_recursive(3, 32, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Sequence),
                    prop::collection::vec((arb_key(), inner), 0..4)
                        .prop_map(|entries| Value::Mapping(entries.into_iter().collect())),
                ]
            })
        }

        fn arb_data(sentinel: bool) -> impl Strategy<Value = SessionData> {
            prop::collection::vec((arb_key(), arb_value(sentinel)), 0..6)
                .prop_map(|entries| entries.into_iter().collect())
        }

        proptest! {
            /// Underscore keys in the input never change the target.
            #[test]
            fn underscore_keys_never_written(input in arb_data(true), before in arb_data(true)) {
                let mut after = before.clone();
                merge(&input, &mut after);
                for key in input.keys().filter(|k| k.starts_with('_')) {
                    prop_assert_eq!(after.get(key), before.get(key));
                }
            }

            /// The sentinel removes whatever was there.
            #[test]
            fn unchecked_always_removes(key in "[a-d]{1,3}", value in arb_value(true), mut target in arb_data(true)) {
                target.insert(key.clone(), value);
                let input: SessionData = [(key.clone(), Value::from(UNCHECKED))].into_iter().collect();
                merge(&input, &mut target);
                prop_assert!(!target.contains_key(&key));
            }

            /// Sentinel elements vanish; the survivors keep their order; the key stays.
            #[test]
            fn sequences_lose_only_the_sentinel(
                key in "[a-d]{1,3}",
                items in prop::collection::vec(prop_oneof![Just(UNCHECKED.to_owned()), "[a-c]{1,2}"], 0..8),
                mut target in arb_data(true),
            ) {
                let seq: Vec<Value> = items.iter().map(|s| Value::from(s.as_str())).collect();
                let input: SessionData = [(key.clone(), Value::Sequence(seq))].into_iter().collect();
                merge(&input, &mut target);

                let expected: Vec<Value> = items.iter()
                    .filter(|s| *s != UNCHECKED)
                    .map(|s| Value::from(s.as_str()))
                    .collect();
                prop_assert_eq!(target.get(&key), Some(&Value::Sequence(expected)));
            }

            /// Merging the same input twice changes nothing the first merge did not.
            #[test]
            fn merge_is_idempotent(input in arb_data(false), target in arb_data(false)) {
                let mut once = target.clone();
                merge(&input, &mut once);
                let mut twice = once.clone();
                merge(&input, &mut twice);
                prop_assert_eq!(
                    once.iter().collect::<Vec<_>>(),
                    twice.iter().collect::<Vec<_>>()
                );
            }
        }
    }
}
