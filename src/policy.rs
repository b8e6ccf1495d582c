//! Pricing Policy
//!
//! Catalog-specific rules applied on top of plain index lookups: which
//! selection values mean "disabled", which selections are implied when the
//! caller omits them, and which items become free when another item is
//! selected alongside them.

use std::{fs, path::Path};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use smallvec::SmallVec;
use thiserror::Error;

/// Values treated as "explicitly disabled" unless a policy says otherwise.
pub const DEFAULT_DISABLED_VALUES: [&str; 2] = ["no", "false"];

/// Errors that can occur while loading a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// IO error reading the policy file
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse policy: {0}")]
    Yaml(#[from] serde_norway::Error),
}

/// A selection injected when the caller did not provide the key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefaultSelection {
    /// Selection key
    pub key: String,

    /// Selection value
    pub value: String,
}

/// Makes one item free whenever another item is selected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Waiver {
    /// Inventory id whose selection enables the waiver
    pub trigger: String,

    /// Inventory id of the item priced at zero
    pub waived: String,

    /// Appended to the waived item's name in parentheses
    pub note: String,

    /// Value reported for the waived item
    pub value: String,
}

impl Waiver {
    /// Create a waiver.
    pub fn new(
        trigger: impl Into<String>,
        waived: impl Into<String>,
        note: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            waived: waived.into(),
            note: note.into(),
            value: value.into(),
        }
    }
}

/// Policy file as written in YAML
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    #[serde(default = "default_disabled_values")]
    disabled_values: Vec<String>,

    #[serde(default)]
    defaults: Vec<DefaultSelection>,

    #[serde(default)]
    waivers: Vec<Waiver>,
}

fn default_disabled_values() -> Vec<String> {
    DEFAULT_DISABLED_VALUES.map(String::from).to_vec()
}

/// Rules applied while evaluating a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingPolicy {
    disabled_values: FxHashSet<String>,
    defaults: Vec<DefaultSelection>,
    waivers: SmallVec<[Waiver; 2]>,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::with_disabled_values(DEFAULT_DISABLED_VALUES)
    }
}

impl PricingPolicy {
    /// Create a policy with the given disabled values and no other rules.
    pub fn with_disabled_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            disabled_values: values
                .into_iter()
                .map(|value| normalize(value.as_ref()))
                .collect(),
            defaults: Vec::new(),
            waivers: SmallVec::new(),
        }
    }

    /// Policy for the hosted Matrix service catalog.
    ///
    /// The base platform is always implied and the SMTP relay is free when the
    /// email service is part of the order.
    pub fn hosted() -> Self {
        Self::default()
            .with_default("etke_base_matrix", "yes")
            .with_waiver(Waiver::new(
                "etke_service_email",
                "exim_relay_relay_use",
                "free with email service",
                "with email service",
            ))
    }

    /// Add a default selection.
    #[must_use]
    pub fn with_default(mut self, key: &str, value: &str) -> Self {
        self.defaults.push(DefaultSelection {
            key: normalize(key),
            value: normalize(value),
        });
        self
    }

    /// Add a waiver.
    #[must_use]
    pub fn with_waiver(mut self, waiver: Waiver) -> Self {
        self.waivers.push(waiver);
        self
    }

    /// Parse a policy from YAML.
    ///
    /// Omitting `disabled_values` keeps the defaults; an empty list disables
    /// filtering entirely.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Yaml`] if the document is malformed.
    pub fn from_yaml_str(contents: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = serde_norway::from_str(contents)?;

        let policy = file.defaults.iter().fold(
            Self::with_disabled_values(&file.disabled_values),
            |policy, default| policy.with_default(&default.key, &default.value),
        );

        Ok(file.waivers.into_iter().fold(policy, Self::with_waiver))
    }

    /// Load a policy from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Whether a normalized value marks its selection as disabled.
    pub fn is_disabled(&self, value: &str) -> bool {
        self.disabled_values.contains(value)
    }

    /// Selections injected when missing.
    pub fn defaults(&self) -> &[DefaultSelection] {
        &self.defaults
    }

    /// Configured waivers.
    pub fn waivers(&self) -> &[Waiver] {
        &self.waivers
    }
}

/// Trim and lowercase a selection key or value.
pub(crate) fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}
