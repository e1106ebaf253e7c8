//! Live substring filtering over a fixed set of labelled items.
//!
//! The controller is constructed with the full item collection up front and
//! owns nothing else; the caller re-invokes [`LiveFilter::apply`] with the
//! current query on every change. Matching is case-insensitive substring
//! containment, so an empty query shows every item.

/// One filterable entry: an immutable label plus a visibility flag that only
/// [`LiveFilter::apply`] writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterItem {
    label: String,
    visible: bool,
}

impl FilterItem {
    fn new(label: String) -> Self {
        Self {
            label,
            visible: true,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Recomputes per-item visibility from scratch on every query.
///
/// The item set is fixed at construction; an empty set is valid and the
/// filter then has no observable effect.
#[derive(Debug, Clone, Default)]
pub struct LiveFilter {
    items: Vec<FilterItem>,
}

impl LiveFilter {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: labels
                .into_iter()
                .map(|label| FilterItem::new(label.into()))
                .collect(),
        }
    }

    /// Whether `label` should be shown under `query`.
    pub fn matches(label: &str, query: &str) -> bool {
        label.to_lowercase().contains(&query.to_lowercase())
    }

    /// Recompute visibility for every item against `query`. Runs to
    /// completion synchronously; repeated calls with the same query are
    /// idempotent.
    pub fn apply(&mut self, query: &str) {
        let query = query.to_lowercase();
        for item in &mut self.items {
            item.visible = item.label.to_lowercase().contains(&query);
        }
    }

    /// All items in enumeration order, visible or not.
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// Labels of the currently visible items, in enumeration order.
    pub fn visible_labels(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|item| item.visible)
            .map(FilterItem::label)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculators() -> LiveFilter {
        LiveFilter::new(["Mortgage Calculator", "Tip Calculator", "BMI Calculator"])
    }

    fn visible(filter: &LiveFilter) -> Vec<&str> {
        filter.visible_labels().collect()
    }

    #[test]
    fn all_items_start_visible() {
        let filter = calculators();
        assert_eq!(visible(&filter).len(), 3);
    }

    #[test]
    fn empty_query_shows_all_items() {
        let mut filter = calculators();
        filter.apply("tip");
        filter.apply("");
        assert_eq!(
            visible(&filter),
            vec!["Mortgage Calculator", "Tip Calculator", "BMI Calculator"]
        );
    }

    #[test]
    fn substring_query_narrows_to_matching_items() {
        let mut filter = calculators();
        filter.apply("tip");
        assert_eq!(visible(&filter), vec!["Tip Calculator"]);

        filter.apply("mortgage");
        assert_eq!(visible(&filter), vec!["Mortgage Calculator"]);
    }

    #[test]
    fn query_is_case_insensitive() {
        let mut upper = calculators();
        let mut lower = calculators();
        upper.apply("CALCULATOR");
        lower.apply("calculator");
        assert_eq!(visible(&upper), visible(&lower));
        assert_eq!(visible(&upper).len(), 3);
    }

    #[test]
    fn full_label_query_matches_its_item() {
        let mut filter = calculators();
        filter.apply("bmi calculator");
        assert_eq!(visible(&filter), vec!["BMI Calculator"]);
    }

    #[test]
    fn unmatched_query_hides_everything() {
        let mut filter = calculators();
        filter.apply("xyz");
        assert!(visible(&filter).is_empty());
    }

    #[test]
    fn reapplying_the_same_query_is_idempotent() {
        let mut filter = calculators();
        filter.apply("tip");
        let first: Vec<bool> = filter.items().iter().map(FilterItem::is_visible).collect();
        filter.apply("tip");
        let second: Vec<bool> = filter.items().iter().map(FilterItem::is_visible).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn labels_are_never_mutated() {
        let mut filter = calculators();
        filter.apply("tip");
        assert_eq!(
            filter
                .items()
                .iter()
                .map(FilterItem::label)
                .collect::<Vec<_>>(),
            vec!["Mortgage Calculator", "Tip Calculator", "BMI Calculator"]
        );
    }

    #[test]
    fn empty_collection_is_valid_and_inert() {
        let mut filter = LiveFilter::new(Vec::<String>::new());
        assert!(filter.is_empty());
        filter.apply("anything");
        assert_eq!(filter.visible_labels().count(), 0);
    }

    #[test]
    fn matches_predicate_agrees_with_apply() {
        let mut filter = calculators();
        filter.apply("calc");
        for item in filter.items() {
            assert_eq!(item.is_visible(), LiveFilter::matches(item.label(), "calc"));
        }
    }
}
