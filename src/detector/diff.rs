use crate::types::ListingSet;

/// Listings in `current` that are newer than everything in `previous`.
///
/// High-water mark, not set difference by id: a listing is new iff its
/// timestamp is strictly greater than the max timestamp of `previous`.
/// Assumes listings never reappear with an older timestamp and that the
/// snapshot holds every listing above the mark. An empty `previous` has no
/// mark, so every current listing counts as new.
///
/// Output keeps `current`'s order.
pub fn new_listings(previous: &ListingSet, current: &ListingSet) -> ListingSet {
    match previous.high_water_mark() {
        Some(latest) => current
            .iter()
            .filter(|l| l.timestamp > latest)
            .cloned()
            .collect(),
        None => current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_listing;

    fn set(timestamps: &[i64]) -> ListingSet {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| test_listing(i as u64 + 1, ts))
            .collect()
    }

    fn timestamps(set: &ListingSet) -> Vec<i64> {
        set.iter().map(|l| l.timestamp).collect()
    }

    #[test]
    fn only_listings_above_high_water_mark_are_new() {
        let previous = set(&[10, 20, 30]);
        let current = set(&[15, 25, 35, 40]);
        assert_eq!(timestamps(&new_listings(&previous, &current)), vec![35, 40]);
    }

    #[test]
    fn equal_timestamp_is_not_new() {
        let previous = set(&[30]);
        let current = set(&[30, 31]);
        assert_eq!(timestamps(&new_listings(&previous, &current)), vec![31]);
    }

    #[test]
    fn empty_previous_makes_everything_new() {
        let current = set(&[40, 5, 17]);
        assert_eq!(new_listings(&ListingSet::default(), &current), current);
    }

    #[test]
    fn nothing_new_yields_empty() {
        let previous = set(&[50]);
        let current = set(&[50, 49, 10]);
        assert!(new_listings(&previous, &current).is_empty());
    }

    #[test]
    fn keeps_current_order() {
        let previous = set(&[10]);
        let current = set(&[40, 5, 35, 20]);
        assert_eq!(timestamps(&new_listings(&previous, &current)), vec![40, 35, 20]);
    }

    #[test]
    fn repeated_runs_agree_and_leave_inputs_untouched() {
        let previous = set(&[10, 20, 30]);
        let current = set(&[15, 25, 35, 40]);
        let (prev_before, curr_before) = (previous.clone(), current.clone());

        let first = new_listings(&previous, &current);
        let second = new_listings(&previous, &current);
        assert_eq!(first, second);
        assert_eq!(previous, prev_before);
        assert_eq!(current, curr_before);
    }
}
