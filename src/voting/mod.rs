use log::debug;

use crate::models::{Selection, VoteRecord};

// Unknown ids are dropped, but the submission still counts toward the total.
pub fn apply_selections(record: &VoteRecord, selection: &Selection) -> VoteRecord {
    let mut next = record.clone();

    for item in selection.known() {
        next.increment(item);
    }
    for raw in selection.unknown() {
        debug!("Ignoring unknown item id '{}'", raw);
    }

    next.total += 1;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemId;

    fn item(key: &str) -> ItemId {
        ItemId::parse(key).unwrap()
    }

    #[test]
    fn worked_example_from_persisted_record() {
        let mut record = VoteRecord::default();
        record.set_count(item("item1"), 2);
        record.set_count(item("item12"), 1);
        record.total = 3;

        let selection = Selection::new(&["item1", "item3", "item5"]).unwrap();
        let next = apply_selections(&record, &selection);

        assert_eq!(next.count(item("item1")), 3);
        assert_eq!(next.count(item("item3")), 1);
        assert_eq!(next.count(item("item5")), 1);
        assert_eq!(next.count(item("item12")), 1);
        assert_eq!(next.count(item("item2")), 0);
        assert_eq!(next.total, 4);
    }

    #[test]
    fn unselected_items_are_unchanged() {
        let mut record = VoteRecord::default();
        for (n, id) in ItemId::all().enumerate() {
            record.set_count(id, n as u64 * 10);
        }
        record.total = 40;

        let selection = Selection::new(&["item4", "item8", "item11"]).unwrap();
        let next = apply_selections(&record, &selection);

        for id in ItemId::all() {
            let expected = if ["item4", "item8", "item11"].contains(&id.key().as_str()) {
                record.count(id) + 1
            } else {
                record.count(id)
            };
            assert_eq!(next.count(id), expected, "{}", id);
        }
        assert_eq!(next.total, record.total + 1);
    }

    #[test]
    fn unknown_ids_still_count_the_submission() {
        let record = VoteRecord::default();
        let selection = Selection::new(&["item2", "nope", "item99"]).unwrap();
        let next = apply_selections(&record, &selection);

        assert_eq!(next.item_sum(), 1);
        assert_eq!(next.count(item("item2")), 1);
        assert_eq!(next.total, 1);
    }

    #[test]
    fn input_record_is_not_mutated() {
        let record = VoteRecord::default();
        let selection = Selection::new(&["item1", "item2", "item3"]).unwrap();
        let _ = apply_selections(&record, &selection);
        assert_eq!(record, VoteRecord::default());
    }
}
