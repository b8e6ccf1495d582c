//! Items

use slotmap::new_key_type;

new_key_type! {
    /// Line Item Key
    pub struct LineItemKey;
}

/// Value recorded for flag-style items.
pub const FLAG_VALUE: &str = "yes";

/// A single priced entry in the index.
///
/// Flat catalog items become one line item with the [`FLAG_VALUE`] value. Each
/// option of a sectioned group becomes one line item that shares the parent's
/// identifiers and carries the option identifier as its value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineItem {
    /// Order form identifier
    pub form_id: String,

    /// Inventory identifier
    pub inventory_id: String,

    /// Human-readable name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Help link or path
    pub help: String,

    /// Selection value this entry represents
    pub value: String,

    /// Price charged when this entry is selected on its own
    pub price: i64,

    /// Section this entry belongs to
    pub section_id: Option<String>,

    /// Price charged once per section, zero for none
    pub section_price: i64,
}

impl LineItem {
    /// Create a flag-style item with the given identifiers and price.
    pub fn flag(form_id: impl Into<String>, inventory_id: impl Into<String>, price: i64) -> Self {
        Self {
            form_id: form_id.into(),
            inventory_id: inventory_id.into(),
            value: FLAG_VALUE.to_string(),
            price,
            ..Self::default()
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the selection value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Place the item in a section with the given shared price.
    #[must_use]
    pub fn in_section(mut self, section_id: impl Into<String>, section_price: i64) -> Self {
        self.section_id = Some(section_id.into());
        self.section_price = section_price;
        self
    }

    /// Returns the section id when the section carries a price of its own.
    pub fn priced_section(&self) -> Option<&str> {
        if self.section_price > 0 {
            self.section_id.as_deref()
        } else {
            None
        }
    }
}

/// Display metadata for a section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionMeta {
    /// Section name
    pub name: String,

    /// Section description
    pub description: String,

    /// Help link or path
    pub help: String,
}

impl SectionMeta {
    /// Create section metadata with only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_items_use_flag_value() {
        let item = LineItem::flag("item1", "inv1", 100);

        assert_eq!(item.value, FLAG_VALUE);
        assert_eq!(item.price, 100);
        assert_eq!(item.section_id, None);
    }

    #[test]
    fn priced_section_requires_positive_price() {
        let free = LineItem::flag("a", "a", 1).in_section("apps", 0);
        let paid = LineItem::flag("b", "b", 1).in_section("bridges", 200);
        let orphan = LineItem {
            section_price: 200,
            ..LineItem::flag("c", "c", 1)
        };

        assert_eq!(free.priced_section(), None);
        assert_eq!(paid.priced_section(), Some("bridges"));
        assert_eq!(orphan.priced_section(), None);
    }
}
