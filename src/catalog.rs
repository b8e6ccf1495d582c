//! Catalog
//!
//! The structured document an order form is priced from. Several schema
//! revisions of the catalog exist; the types below accept the superset of
//! their fields and default anything that is missing.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The bytes are not valid JSON or do not match the catalog shape.
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A priced entry of a flat item list or a sectioned group option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    /// Order form identifier
    pub id: String,

    /// Inventory identifier
    #[serde(rename = "iid")]
    pub inventory_id: String,

    /// Human-readable name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Help link, usually a path rather than a full URL
    pub help: String,

    /// Price
    pub price: i64,
}

/// A group exposing several options under one form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Order form identifier shared by every option
    pub id: String,

    /// Inventory identifier shared by every option
    #[serde(rename = "iid")]
    pub inventory_id: String,

    /// Human-readable name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Help link
    pub help: String,

    /// Selectable options
    pub options: Vec<CatalogItem>,
}

/// The catalog document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Catalog {
    /// Base platform items
    pub bases: Vec<CatalogItem>,

    /// Instance sizes
    pub instances: CatalogSection,

    /// Support levels
    pub support: CatalogSection,

    /// Matrix apps
    pub matrix_apps: Vec<CatalogItem>,

    /// Matrix bots
    pub matrix_bots: Vec<CatalogItem>,

    /// Matrix bridges
    pub matrix_bridges: Vec<CatalogItem>,

    /// Shared price charged once when any bridge is selected
    pub matrix_bridges_price: i64,

    /// Additional Matrix services
    #[serde(rename = "additionalMatrixServices")]
    pub matrix_additional: Vec<CatalogItem>,

    /// Additional services
    pub additional_services: Vec<CatalogItem>,

    /// Advanced services
    pub advanced_services: Vec<CatalogItem>,
}

/// A catalog group in normalization order.
#[derive(Debug, Clone, Copy)]
pub enum CatalogGroup<'a> {
    /// A list of independent flag-style items
    Flat {
        /// Section the items belong to
        section_id: &'static str,

        /// Section display name
        section_name: &'static str,

        /// Shared section price
        section_price: i64,

        /// Group items
        items: &'a [CatalogItem],
    },

    /// A group whose options share one form field
    Sectioned {
        /// Section the options belong to
        section_id: &'static str,

        /// Section display name, used when the group has none
        section_name: &'static str,

        /// The group
        section: &'a CatalogSection,
    },
}

impl<'a> CatalogGroup<'a> {
    fn flat(
        section_id: &'static str,
        section_name: &'static str,
        section_price: i64,
        items: &'a [CatalogItem],
    ) -> Self {
        CatalogGroup::Flat {
            section_id,
            section_name,
            section_price,
            items,
        }
    }
}

impl Catalog {
    /// Parse a catalog from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] if the bytes are not a JSON object of the
    /// expected shape.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Iterate over every group in the order the index is built from.
    pub fn groups(&self) -> impl Iterator<Item = CatalogGroup<'_>> {
        [
            CatalogGroup::flat("bases", "Base", 0, &self.bases),
            CatalogGroup::Sectioned {
                section_id: "instances",
                section_name: "Instance",
                section: &self.instances,
            },
            CatalogGroup::Sectioned {
                section_id: "support",
                section_name: "Support",
                section: &self.support,
            },
            CatalogGroup::flat("matrix_apps", "Matrix apps", 0, &self.matrix_apps),
            CatalogGroup::flat("matrix_bots", "Matrix bots", 0, &self.matrix_bots),
            CatalogGroup::flat(
                "matrix_bridges",
                "Matrix bridges",
                self.matrix_bridges_price,
                &self.matrix_bridges,
            ),
            CatalogGroup::flat(
                "matrix_additional",
                "Additional Matrix services",
                0,
                &self.matrix_additional,
            ),
            CatalogGroup::flat(
                "additional",
                "Additional services",
                0,
                &self.additional_services,
            ),
            CatalogGroup::flat("advanced", "Advanced services", 0, &self.advanced_services),
        ]
        .into_iter()
    }
}

/// Parse a catalog from raw JSON bytes.
///
/// # Errors
///
/// Returns [`CatalogError::Parse`] if the bytes cannot be parsed.
pub fn load(bytes: &[u8]) -> Result<Catalog, CatalogError> {
    Catalog::from_slice(bytes)
}
