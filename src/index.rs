//! Price Index
//!
//! Flattens a [`Catalog`] into uniform [`LineItem`]s and keeps two lookup
//! tables over them: one by order form id and one by inventory id. Flat items
//! are registered under their bare ids; sectioned group options under the
//! parent id concatenated with the option value.

use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::{
    catalog::{Catalog, CatalogGroup, CatalogItem, CatalogSection},
    items::{FLAG_VALUE, LineItem, LineItemKey, SectionMeta},
    policy::PricingPolicy,
};

/// Accumulates line items and their lookup keys.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    items: SlotMap<LineItemKey, LineItem>,
    by_form_id: FxHashMap<String, LineItemKey>,
    by_inventory_id: FxHashMap<String, LineItemKey>,
    sections: FxHashMap<String, SectionMeta>,
}

impl IndexBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every group of a catalog in catalog order.
    #[must_use]
    pub fn catalog(mut self, catalog: &Catalog) -> Self {
        for group in catalog.groups() {
            match group {
                CatalogGroup::Flat {
                    section_id,
                    section_name,
                    section_price,
                    items,
                } => {
                    self.section(section_id, SectionMeta::named(section_name));
                    self.push_flat_items(items, section_id, section_price);
                }
                CatalogGroup::Sectioned {
                    section_id,
                    section_name,
                    section,
                } => {
                    let name = if section.name.is_empty() {
                        section_name
                    } else {
                        section.name.as_str()
                    };

                    self.section(
                        section_id,
                        SectionMeta {
                            name: name.to_string(),
                            description: section.description.clone(),
                            help: section.help.clone(),
                        },
                    );
                    self.push_sectioned_group(section, section_id, 0);
                }
            }
        }

        self
    }

    /// Set display metadata for a section.
    pub fn section(&mut self, section_id: &str, meta: SectionMeta) -> &mut Self {
        self.sections.insert(section_id.to_string(), meta);
        self
    }

    /// Add one flag-style line item per flat catalog item.
    pub fn push_flat_items(
        &mut self,
        items: &[CatalogItem],
        section_id: &str,
        section_price: i64,
    ) -> &mut Self {
        for source in items {
            self.insert_flat(LineItem {
                form_id: source.id.clone(),
                inventory_id: source.inventory_id.clone(),
                name: source.name.clone(),
                description: source.description.clone(),
                help: source.help.clone(),
                value: FLAG_VALUE.to_string(),
                price: source.price,
                section_id: Some(section_id.to_string()),
                section_price,
            });
        }

        self
    }

    /// Add one line item per option of a sectioned group.
    ///
    /// Options inherit the group's ids and use their own id as the value.
    pub fn push_sectioned_group(
        &mut self,
        section: &CatalogSection,
        section_id: &str,
        section_price: i64,
    ) -> &mut Self {
        for option in &section.options {
            let name = match (section.name.is_empty(), option.name.is_empty()) {
                (false, false) => format!("{} ({})", section.name, option.name),
                (false, true) => section.name.clone(),
                (true, _) => option.name.clone(),
            };

            self.insert_option(LineItem {
                form_id: section.id.clone(),
                inventory_id: section.inventory_id.clone(),
                name,
                description: fallback(&section.description, &option.description),
                help: fallback(&section.help, &option.help),
                value: option.id.clone(),
                price: option.price,
                section_id: Some(section_id.to_string()),
                section_price,
            });
        }

        self
    }

    /// Register an item under its bare form and inventory ids.
    pub fn insert_flat(&mut self, item: LineItem) -> LineItemKey {
        let form_key = item.form_id.clone();
        let inventory_key = item.inventory_id.clone();

        self.insert(item, form_key, inventory_key)
    }

    /// Register an item under its form and inventory ids joined with its value.
    pub fn insert_option(&mut self, item: LineItem) -> LineItemKey {
        let form_key = format!("{}{}", item.form_id, item.value);
        let inventory_key = format!("{}{}", item.inventory_id, item.value);

        self.insert(item, form_key, inventory_key)
    }

    fn insert(&mut self, item: LineItem, form_key: String, inventory_key: String) -> LineItemKey {
        let key = self.items.insert(item);

        register(&mut self.by_form_id, form_key, key, "form id");
        register(&mut self.by_inventory_id, inventory_key, key, "inventory id");

        key
    }

    /// Finish building with the given policy.
    pub fn build(self, policy: PricingPolicy) -> PriceIndex {
        debug!(
            items = self.items.len(),
            form_keys = self.by_form_id.len(),
            inventory_keys = self.by_inventory_id.len(),
            "built price index"
        );

        PriceIndex {
            items: self.items,
            by_form_id: self.by_form_id,
            by_inventory_id: self.by_inventory_id,
            sections: self.sections,
            policy,
        }
    }
}

// Empty keys are never looked up, so items without an id in one of the
// tables are only reachable through the other.
fn register(
    table: &mut FxHashMap<String, LineItemKey>,
    lookup: String,
    key: LineItemKey,
    kind: &'static str,
) {
    if lookup.is_empty() {
        return;
    }

    match table.entry(lookup) {
        Entry::Occupied(mut entry) => {
            let previous = entry.insert(key);
            warn!(key = %entry.key(), ?previous, kind, "lookup key registered twice, keeping the latest");
        }
        Entry::Vacant(entry) => {
            entry.insert(key);
        }
    }
}

fn fallback(preferred: &str, other: &str) -> String {
    if preferred.is_empty() {
        other.to_string()
    } else {
        preferred.to_string()
    }
}

/// Immutable lookup index over a catalog's line items.
///
/// Evaluation only reads from the index, so one index can price any number of
/// selections, including from several threads at once.
#[derive(Debug)]
pub struct PriceIndex {
    items: SlotMap<LineItemKey, LineItem>,
    by_form_id: FxHashMap<String, LineItemKey>,
    by_inventory_id: FxHashMap<String, LineItemKey>,
    sections: FxHashMap<String, SectionMeta>,
    policy: PricingPolicy,
}

impl PriceIndex {
    /// Build an index from a catalog.
    pub fn build(catalog: &Catalog, policy: PricingPolicy) -> Self {
        IndexBuilder::new().catalog(catalog).build(policy)
    }

    /// Find the line item for a selection.
    ///
    /// Tries, in order: the key as a form id, the key as an inventory id, the
    /// key joined with the value as a form id, then as an inventory id.
    pub fn find(&self, key: &str, value: &str) -> Option<&LineItem> {
        let joined = format!("{key}{value}");

        self.by_form_id
            .get(key)
            .or_else(|| self.by_inventory_id.get(key))
            .or_else(|| self.by_form_id.get(&joined))
            .or_else(|| self.by_inventory_id.get(&joined))
            .and_then(|item_key| self.items.get(*item_key))
    }

    /// Iterate over all line items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.values()
    }

    /// Number of line items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the index has no line items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Display metadata for a section, if known.
    pub fn section(&self, section_id: &str) -> Option<&SectionMeta> {
        self.sections.get(section_id)
    }

    /// The policy applied during evaluation.
    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }
}
