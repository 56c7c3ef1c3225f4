//! Property-based test generators using proptest.

use entaudit_core::ChangeRecord;
use entaudit_driver::Value;
use proptest::prelude::*;

/// Strategy for scalar values that survive diff encoding unchanged.
pub fn diffable_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for invoice amounts.
pub fn amount_strategy() -> impl Strategy<Value = i64> {
    0i64..1_000_000
}

/// Strategy for change records over the given fields.
///
/// Every generated record changes at least one field.
pub fn change_record_strategy(
    fields: &'static [&'static str],
) -> impl Strategy<Value = ChangeRecord> {
    prop::sample::subsequence(fields, 1..=fields.len()).prop_flat_map(|chosen| {
        let n = chosen.len();
        prop::collection::vec((diffable_value_strategy(), diffable_value_strategy()), n).prop_map(
            move |pairs| {
                chosen
                    .iter()
                    .zip(pairs)
                    .map(|(field, pair)| ((*field).to_string(), pair))
                    .collect()
            },
        )
    })
}
