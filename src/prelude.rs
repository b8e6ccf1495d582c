//! Pricelist prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    catalog::{Catalog, CatalogError, CatalogItem, CatalogSection},
    evaluation::{Evaluation, ResultItem},
    index::{IndexBuilder, PriceIndex},
    items::{LineItem, LineItemKey, SectionMeta},
    policy::{DefaultSelection, PolicyError, PricingPolicy, Waiver},
    receipt::{Receipt, ReceiptError},
    sources::{
        CatalogSource, FileSource, HttpSource, LoadError, RetrievalError, StaticSource,
        fetch_catalog, source_for,
    },
};
