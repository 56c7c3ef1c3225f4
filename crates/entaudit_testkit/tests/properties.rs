//! Flush-level properties.

use entaudit_testkit::prelude::*;
use proptest::prelude::*;

const INVOICE_FIELDS: &[&str] = &["amount", "order", "notes"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn update_diff_lists_exactly_the_changed_fields(
        changes in change_record_strategy(INVOICE_FIELDS)
    ) {
        let mut host = FlushHarness::billing();
        let invoice = host.uow_mut().manage(INVOICE, invoice_data(1, None));
        host.flush(Flush::new().insert(&invoice)).unwrap();

        host.flush(Flush::new().update(&invoice, changes.clone())).unwrap();

        let row = host.conn().rows("invoice_audit").last().unwrap().clone();
        let encoded = row.get("diff").unwrap();
        let diff = decode_diff(encoded.as_text().unwrap()).unwrap();
        let encoder = DiffEncoder::new(&host.listener().config().datetime_format);

        prop_assert_eq!(diff.len(), changes.len());
        for (field, old, new) in changes.iter() {
            prop_assert_eq!(diff.get(field), Some(&(encoder.render(old), encoder.render(new))));
        }
    }

    #[test]
    fn a_flush_opens_at_most_one_revision(
        amounts in prop::collection::vec(amount_strategy(), 0..6)
    ) {
        let mut host = FlushHarness::billing();
        let mut flush = Flush::new();
        for amount in &amounts {
            let invoice = host.uow_mut().manage(INVOICE, invoice_data(*amount, None));
            flush = flush.insert(&invoice);
        }

        let outcome = host.flush(flush).unwrap();

        let expected = usize::from(!amounts.is_empty());
        prop_assert_eq!(host.conn().row_count("revisions"), expected);
        prop_assert_eq!(outcome.revision.is_some(), !amounts.is_empty());
        prop_assert_eq!(host.conn().row_count("invoice_audit"), amounts.len());
        let revisions: Vec<_> = host
            .conn()
            .rows("invoice_audit")
            .iter()
            .map(|row| row.get("rev"))
            .collect();
        prop_assert!(revisions.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
