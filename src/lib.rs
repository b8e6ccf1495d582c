//! Pricelist
//!
//! Pricelist prices hosted service order forms. A remote catalog of items,
//! sectioned option groups and shared section prices is flattened into a
//! [`PriceIndex`](index::PriceIndex), which then turns `option -> value`
//! selections into a total and a per-item breakdown.

pub mod catalog;
pub mod evaluation;
pub mod index;
pub mod items;
pub mod policy;
pub mod prelude;
pub mod receipt;
pub mod sources;
