//! Evaluation
//!
//! Prices a selection (`key -> value` pairs submitted by an order form)
//! against a [`PriceIndex`].
//!
//! Keys and values are trimmed and lowercased. Disabled values are dropped,
//! unknown keys are ignored. Items in a section with a price of its own are
//! covered by that price: the section is charged once, however many of its
//! items are selected, and the covered items add nothing themselves. An item
//! reached through both its form id and its inventory id is charged once; when
//! several options of one group are selected, the most expensive one is kept.
//! Both the total and the breakdown are independent of selection order.

use std::{
    borrow::Cow,
    collections::{BTreeMap, btree_map::Entry},
};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    index::PriceIndex,
    items::LineItem,
    policy::{Waiver, normalize},
};

/// A charged entry of an evaluation breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultItem {
    /// Order form identifier, `section-<id>` for section charges
    pub id: String,

    /// Inventory identifier, `section_<id>` for section charges
    pub inventory_id: String,

    /// Human-readable name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Help link
    pub help: String,

    /// Selected value, empty for section charges
    pub value: String,

    /// Amount charged
    pub price: i64,

    /// Section the charge belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
}

impl ResultItem {
    fn from_line_item(item: &LineItem, value: &str) -> Self {
        Self {
            id: item.form_id.clone(),
            inventory_id: item.inventory_id.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            help: item.help.clone(),
            value: value.to_string(),
            price: item.price,
            section_id: item.section_id.clone(),
        }
    }
}

/// Total price and per-entry breakdown of a selection.
///
/// Breakdown entries are keyed by section id for section charges and by
/// inventory id for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    total: i64,
    breakdown: FxHashMap<String, ResultItem>,
}

impl Evaluation {
    /// Total price.
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Charged entries by key.
    pub fn breakdown(&self) -> &FxHashMap<String, ResultItem> {
        &self.breakdown
    }

    /// Lookup a breakdown entry.
    pub fn get(&self, key: &str) -> Option<&ResultItem> {
        self.breakdown.get(key)
    }

    /// Number of breakdown entries.
    pub fn len(&self) -> usize {
        self.breakdown.len()
    }

    /// Whether nothing was charged.
    pub fn is_empty(&self) -> bool {
        self.breakdown.is_empty()
    }

    /// Split into total and breakdown.
    pub fn into_parts(self) -> (i64, FxHashMap<String, ResultItem>) {
        (self.total, self.breakdown)
    }

    fn charge(&mut self, key: String, entry: ResultItem) {
        self.total = self.total.saturating_add(entry.price);
        self.breakdown.insert(key, entry);
    }
}

impl PriceIndex {
    /// Total price of a selection.
    pub fn total<I, K, V>(&self, selection: I) -> i64
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.evaluate_verbose(selection).total()
    }

    /// Price a selection and explain every charge.
    ///
    /// Never fails: unknown keys and disabled values are skipped.
    pub fn evaluate_verbose<I, K, V>(&self, selection: I) -> Evaluation
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let selections = self.normalize_selection(selection);

        // One candidate per inventory id: an item reached through several keys
        // is charged once, and conflicting options of one group keep the most
        // expensive.
        let mut resolved: BTreeMap<&str, (&LineItem, &str)> = BTreeMap::new();

        for (key, value) in &selections {
            let Some(item) = self.find(key, value) else {
                trace!(%key, %value, "selection does not match any item");
                continue;
            };

            let candidate = (item, value.as_str());

            match resolved.entry(item.inventory_id.as_str()) {
                Entry::Vacant(entry) => {
                    entry.insert(candidate);
                }
                Entry::Occupied(mut entry) => {
                    trace!(
                        item = %item.inventory_id,
                        %key,
                        %value,
                        "item selected more than once"
                    );

                    if outranks(candidate, *entry.get()) {
                        entry.insert(candidate);
                    }
                }
            }
        }

        // Waivers depend on the whole selection, so triggers are collected first.
        let selected: FxHashSet<&str> = resolved.keys().copied().collect();

        let mut evaluation = Evaluation::default();
        let mut charged_sections: FxHashSet<String> = FxHashSet::default();

        for &(item, value) in resolved.values() {
            let waiver = self.policy().waivers().iter().find(|waiver| {
                waiver.waived == item.inventory_id && selected.contains(waiver.trigger.as_str())
            });

            let (item, value) = match waiver {
                Some(waiver) => (Cow::Owned(waive(item, waiver)), waiver.value.as_str()),
                None => (Cow::Borrowed(item), value),
            };

            if let Some(section_id) = item.priced_section() {
                if charged_sections.insert(section_id.to_string()) {
                    debug!(section = %section_id, price = item.section_price, "charging section");

                    evaluation.charge(section_id.to_string(), self.section_entry(&item, section_id));
                }

                continue;
            }

            evaluation.charge(
                item.inventory_id.clone(),
                ResultItem::from_line_item(&item, value),
            );
        }

        evaluation
    }

    fn normalize_selection<I, K, V>(&self, selection: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selections: Vec<(String, String)> = selection
            .into_iter()
            .map(|(key, value)| (normalize(key.as_ref()), normalize(value.as_ref())))
            .collect();

        for default in self.policy().defaults() {
            if !selections.iter().any(|(key, _)| *key == default.key) {
                selections.push((default.key.clone(), default.value.clone()));
            }
        }

        selections.retain(|(key, value)| {
            let disabled = self.policy().is_disabled(value);

            if disabled {
                trace!(%key, %value, "skipping disabled selection");
            }

            !disabled
        });

        selections
    }

    fn section_entry(&self, item: &LineItem, section_id: &str) -> ResultItem {
        let meta = self.section(section_id).cloned().unwrap_or_default();

        ResultItem {
            id: format!("section-{section_id}"),
            inventory_id: format!("section_{section_id}"),
            name: meta.name,
            description: meta.description,
            help: meta.help,
            value: String::new(),
            price: item.section_price,
            section_id: Some(section_id.to_string()),
        }
    }
}

fn outranks(
    (item, value): (&LineItem, &str),
    (current, current_value): (&LineItem, &str),
) -> bool {
    (item.price, item.section_price, value) > (current.price, current.section_price, current_value)
}

fn waive(item: &LineItem, waiver: &Waiver) -> LineItem {
    debug!(item = %item.inventory_id, trigger = %waiver.trigger, "waiving item price");

    let name = if item.name.is_empty() {
        format!("({})", waiver.note)
    } else {
        format!("{} ({})", item.name, waiver.note)
    };

    LineItem {
        name,
        price: 0,
        section_price: 0,
        ..item.clone()
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;
    use testresult::TestResult;

    use crate::{
        index::IndexBuilder,
        items::{LineItem, SectionMeta},
        policy::PricingPolicy,
    };

    use super::*;

    fn two_item_index() -> PriceIndex {
        let mut builder = IndexBuilder::new();
        builder.insert_flat(LineItem::flag("item1", "inv1", 100).in_section("section1", 200));
        builder.insert_flat(
            LineItem::flag("item2", "inv2", 150)
                .with_value("no")
                .in_section("section2", 0),
        );
        builder.build(PricingPolicy::default())
    }

    fn hosted_index() -> PriceIndex {
        let mut builder = IndexBuilder::new();
        builder.section("matrix_bridges", SectionMeta::named("Matrix bridges"));
        builder.insert_flat(LineItem::flag("base", "etke_base_matrix", 5).in_section("bases", 0));
        builder.insert_flat(
            LineItem::flag("email", "etke_service_email", 7)
                .with_name("Email service")
                .in_section("additional", 0),
        );
        builder.insert_flat(
            LineItem::flag("smtp-relay", "exim_relay_relay_use", 3)
                .with_name("SMTP relay")
                .in_section("relay", 4),
        );
        builder.insert_flat(
            LineItem::flag("telegram", "bridge_telegram", 100).in_section("matrix_bridges", 200),
        );
        builder.insert_flat(
            LineItem::flag("signal", "bridge_signal", 150).in_section("matrix_bridges", 200),
        );
        builder.insert_option(
            LineItem::flag("support", "etke_support", 0)
                .with_name("Support (Basic)")
                .with_value("basic")
                .in_section("support", 0),
        );
        builder.insert_option(
            LineItem::flag("support", "etke_support", 500)
                .with_name("Support (Dedicated)")
                .with_value("dedicated")
                .in_section("support", 0),
        );
        builder.build(PricingPolicy::hosted())
    }

    #[test]
    fn charges_section_price_once_and_skips_disabled_and_unknown() -> TestResult {
        let index = two_item_index();
        let selection = [("item1", "yes"), ("item2", "no"), ("item3", "maybe")];

        let evaluation = index.evaluate_verbose(selection);

        assert_eq!(evaluation.total(), 200);
        assert_eq!(evaluation.len(), 1);

        let section = evaluation.get("section1").ok_or("missing section entry")?;

        assert_eq!(section.id, "section-section1");
        assert_eq!(section.inventory_id, "section_section1");
        assert_eq!(section.price, 200);
        assert_eq!(index.total(selection), 200);

        Ok(())
    }

    #[test]
    fn unresolvable_selection_costs_nothing() {
        let index = two_item_index();

        let evaluation = index.evaluate_verbose([("nope", "yes"), ("missing", "large")]);

        assert_eq!(evaluation.total(), 0);
        assert!(evaluation.is_empty());
    }

    #[test]
    fn empty_selection_costs_nothing() {
        let index = two_item_index();
        let selection: [(&str, &str); 0] = [];

        assert_eq!(index.total(selection), 0);
    }

    #[test]
    fn disabled_values_are_ignored_in_any_case() {
        let mut builder = IndexBuilder::new();
        builder.insert_flat(LineItem::flag("apps", "inv_apps", 10));
        let index = builder.build(PricingPolicy::default());

        for value in ["no", " NO ", "No", "false", "False", "\tFALSE\n"] {
            let evaluation = index.evaluate_verbose([("apps", value)]);

            assert_eq!(evaluation.total(), 0, "value {value:?} should be disabled");
            assert!(evaluation.is_empty(), "value {value:?} should be disabled");
        }
    }

    #[test]
    fn keys_and_values_are_normalized() -> TestResult {
        let index = hosted_index();

        let evaluation = index.evaluate_verbose([(" SUPPORT ", " Dedicated ")]);

        let support = evaluation.get("etke_support").ok_or("missing support")?;

        assert_eq!(support.value, "dedicated");
        assert_eq!(support.price, 500);

        Ok(())
    }

    #[test]
    fn custom_disabled_values_replace_defaults() {
        let mut builder = IndexBuilder::new();
        builder.insert_flat(LineItem::flag("apps", "inv_apps", 10));
        let index = builder.build(PricingPolicy::with_disabled_values(["off"]));

        assert_eq!(index.total([("apps", "off")]), 0);
        assert_eq!(index.total([("apps", "no")]), 10);
    }

    #[test]
    fn same_section_items_share_one_charge() {
        let index = hosted_index();

        let evaluation =
            index.evaluate_verbose([("telegram", "yes"), ("signal", "yes"), ("etke_base_matrix", "no")]);

        assert_eq!(evaluation.total(), 200);
        assert_eq!(evaluation.len(), 1);
        assert_eq!(
            evaluation.get("matrix_bridges").map(|entry| entry.name.as_str()),
            Some("Matrix bridges")
        );
    }

    #[test]
    fn totals_do_not_depend_on_selection_order() {
        let index = hosted_index();
        let selection = [
            ("telegram", "yes"),
            ("signal", "yes"),
            ("email", "yes"),
            ("smtp-relay", "yes"),
            ("support", "dedicated"),
        ];

        let expected = index.evaluate_verbose(selection);

        let mut reversed = selection;
        reversed.reverse();
        let mut rotated = selection;
        rotated.rotate_left(2);

        for permutation in [reversed, rotated] {
            let evaluation = index.evaluate_verbose(permutation);

            assert_eq!(evaluation.total(), expected.total());
            assert_eq!(evaluation, expected);
        }
    }

    fn breakdown_sum(evaluation: &Evaluation) -> i64 {
        evaluation.breakdown().values().map(|entry| entry.price).sum()
    }

    #[test]
    fn item_selected_by_both_ids_is_charged_once() -> TestResult {
        let index = hosted_index();
        let selection = [
            ("email", "yes"),
            ("etke_service_email", "yes"),
            ("etke_base_matrix", "no"),
        ];

        let expected = index.evaluate_verbose(selection);

        assert_eq!(expected.total(), 7);
        assert_eq!(expected.len(), 1);
        assert_eq!(breakdown_sum(&expected), expected.total());

        let email = expected.get("etke_service_email").ok_or("missing email entry")?;

        assert_eq!(email.price, 7);

        for permutation in [[1_usize, 0, 2], [2, 1, 0], [0, 2, 1], [1, 2, 0], [2, 0, 1]] {
            let evaluation = index.evaluate_verbose(permutation.map(|i| selection[i]));

            assert_eq!(evaluation, expected);
        }

        Ok(())
    }

    #[test]
    fn conflicting_options_keep_the_most_expensive() -> TestResult {
        let index = hosted_index();
        let selection = [("support", "basic"), ("etke_support", "dedicated")];

        let mut reversed = selection;
        reversed.reverse();

        let forward = index.evaluate_verbose(selection);
        let backward = index.evaluate_verbose(reversed);

        assert_eq!(forward, backward);
        assert_eq!(forward.total(), 505);
        assert_eq!(breakdown_sum(&forward), forward.total());

        let support = forward.get("etke_support").ok_or("missing support entry")?;

        assert_eq!(support.value, "dedicated");
        assert_eq!(support.price, 500);

        Ok(())
    }

    #[test]
    fn waived_item_selected_by_both_ids_stays_free() {
        let index = hosted_index();
        let selection = [
            ("smtp-relay", "yes"),
            ("exim_relay_relay_use", "yes"),
            ("email", "yes"),
            ("etke_base_matrix", "no"),
        ];

        let evaluation = index.evaluate_verbose(selection);

        assert_eq!(evaluation.total(), 7);
        assert_eq!(evaluation.len(), 2);
        assert_eq!(breakdown_sum(&evaluation), evaluation.total());
    }

    #[test]
    fn repeated_evaluation_is_idempotent() {
        let index = hosted_index();
        let selection: FxHashMap<String, String> = [
            ("telegram".to_string(), "yes".to_string()),
            ("support".to_string(), "basic".to_string()),
        ]
        .into_iter()
        .collect();

        let first = index.total(&selection);
        let second = index.total(&selection);

        assert_eq!(first, second);
        assert_eq!(first, 205);
    }

    #[test]
    fn relay_is_free_with_email_service() -> TestResult {
        let index = hosted_index();

        let evaluation = index.evaluate_verbose([
            ("smtp-relay", "yes"),
            ("email", "yes"),
            ("etke_base_matrix", "no"),
        ]);

        assert_eq!(evaluation.total(), 7);

        let relay = evaluation
            .get("exim_relay_relay_use")
            .ok_or("missing relay entry")?;

        assert_eq!(relay.price, 0);
        assert_eq!(relay.name, "SMTP relay (free with email service)");
        assert_eq!(relay.value, "with email service");
        assert!(evaluation.get("relay").is_none(), "relay section must not be charged");

        Ok(())
    }

    #[test]
    fn relay_is_charged_without_email_service() -> TestResult {
        let index = hosted_index();

        let evaluation = index.evaluate_verbose([("smtp-relay", "yes"), ("etke_base_matrix", "no")]);

        assert_eq!(evaluation.total(), 4);

        let section = evaluation.get("relay").ok_or("missing relay section")?;

        assert_eq!(section.id, "section-relay");
        assert_eq!(section.name, "");

        Ok(())
    }

    #[test]
    fn waiver_does_not_modify_the_index() -> TestResult {
        let index = hosted_index();

        index.evaluate_verbose([("smtp-relay", "yes"), ("email", "yes")]);

        let relay = index
            .find("exim_relay_relay_use", "yes")
            .ok_or("relay missing from index")?;

        assert_eq!(relay.price, 3);
        assert_eq!(relay.section_price, 4);
        assert_eq!(relay.name, "SMTP relay");

        Ok(())
    }

    #[test]
    fn default_selection_is_injected_when_missing() -> TestResult {
        let index = hosted_index();

        let evaluation = index.evaluate_verbose([("support", "basic")]);

        assert_eq!(evaluation.total(), 5);

        let base = evaluation.get("etke_base_matrix").ok_or("missing base")?;

        assert_eq!(base.value, "yes");

        Ok(())
    }

    #[test]
    fn explicit_disable_overrides_default_selection() {
        let index = hosted_index();

        let evaluation = index.evaluate_verbose([("ETKE_BASE_MATRIX ", "No")]);

        assert_eq!(evaluation.total(), 0);
        assert!(evaluation.is_empty());
    }

    #[test]
    fn caller_selection_is_left_untouched() {
        let index = hosted_index();
        let selection: FxHashMap<String, String> =
            [("support".to_string(), "basic".to_string())].into_iter().collect();

        index.evaluate_verbose(&selection);

        assert_eq!(selection.len(), 1);
        assert!(!selection.contains_key("base"));
    }

    #[test]
    fn into_parts_returns_total_and_breakdown() {
        let index = two_item_index();

        let (total, breakdown) = index.evaluate_verbose([("inv1", "yes")]).into_parts();

        assert_eq!(total, 200);
        assert!(breakdown.contains_key("section1"));
    }
}
