pub mod defaults;
pub mod layers;
pub mod remote;
pub mod resolver;
pub mod store;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

pub use defaults::default_flags;
pub use layers::{merge_layers, parse_override_param, FlagLayer, FlagOverride};
pub use remote::{FlagSource, HttpFlagSource};
pub use resolver::{FlagResolver, FlagResolverBuilder};
pub use store::{FlagStore, MemoryFlagStore, RedisFlagStore};

/// Query parameter carrying `key:value` overrides.
pub const URL_OVERRIDE_PARAM: &str = "ff";

/// Resolved flags, keyed by the dotted flag name.
/// A `BTreeMap` keeps serialization and equality deterministic.
pub type FeatureFlagSet = BTreeMap<String, FlagState>;

// ─── Flag state ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagState {
    pub enabled: bool,
    /// 0–100. Carried through but not used for sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout_percentage: Option<u8>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl FlagState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            rollout_percentage: None,
            description: String::new(),
            tags: BTreeSet::new(),
        }
    }
}

// ─── Known flag identifiers ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlagKey {
    CatalogPublicBrowse,
    SearchEnabled,
    RfqEnabled,
    QuoteVendorConsole,
    OrdersCheckout,
    PaymentsGateway1,
    WalletBasic,
    InvoiceVat,
    LoyaltyCore,
    CreditControls,
}

impl FlagKey {
    pub const ALL: [FlagKey; 10] = [
        FlagKey::CatalogPublicBrowse,
        FlagKey::SearchEnabled,
        FlagKey::RfqEnabled,
        FlagKey::QuoteVendorConsole,
        FlagKey::OrdersCheckout,
        FlagKey::PaymentsGateway1,
        FlagKey::WalletBasic,
        FlagKey::InvoiceVat,
        FlagKey::LoyaltyCore,
        FlagKey::CreditControls,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FlagKey::CatalogPublicBrowse => "catalog.publicBrowse",
            FlagKey::SearchEnabled => "search.enabled",
            FlagKey::RfqEnabled => "rfq.enabled",
            FlagKey::QuoteVendorConsole => "quote.vendorConsole",
            FlagKey::OrdersCheckout => "orders.checkout",
            FlagKey::PaymentsGateway1 => "payments.gateway1",
            FlagKey::WalletBasic => "wallet.basic",
            FlagKey::InvoiceVat => "invoice.vat",
            FlagKey::LoyaltyCore => "loyalty.core",
            FlagKey::CreditControls => "credit.controls",
        }
    }
}

impl AsRef<str> for FlagKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlagKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("unknown feature flag '{s}'")))
    }
}
