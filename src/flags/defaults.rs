use super::{FeatureFlagSet, FlagKey, FlagState};

/// Compiled-in default table: (key, enabled, description, tags).
static DEFAULTS: &[(FlagKey, bool, &str, &[&str])] = &[
    (
        FlagKey::CatalogPublicBrowse,
        true,
        "Enable public catalog browsing functionality",
        &["catalog", "public"],
    ),
    (
        FlagKey::SearchEnabled,
        true,
        "Enable search functionality",
        &["search", "public"],
    ),
    (
        FlagKey::RfqEnabled,
        true,
        "Enable RFQ functionality",
        &["rfq", "negotiation"],
    ),
    (
        FlagKey::QuoteVendorConsole,
        true,
        "Enable the vendor quote console",
        &["quotes", "vendor"],
    ),
    // Off until the payment system is ready
    (
        FlagKey::OrdersCheckout,
        false,
        "Enable checkout and order functionality",
        &["orders", "checkout"],
    ),
    (
        FlagKey::PaymentsGateway1,
        false,
        "Enable first payment gateway integration",
        &["payments", "gateway"],
    ),
    (
        FlagKey::WalletBasic,
        false,
        "Enable basic corporate wallet functionality",
        &["wallet", "payments"],
    ),
    (
        FlagKey::InvoiceVat,
        false,
        "Enable VAT invoice generation",
        &["invoicing", "vat"],
    ),
    (
        FlagKey::LoyaltyCore,
        false,
        "Enable loyalty program functionality",
        &["loyalty", "rewards"],
    ),
    (
        FlagKey::CreditControls,
        false,
        "Enable credit limit and dunning functionality",
        &["credit", "finance"],
    ),
];

/// Builds the default flag set. Every `FlagKey` has an entry.
pub fn default_flags() -> FeatureFlagSet {
    DEFAULTS
        .iter()
        .map(|(key, enabled, description, tags)| {
            let state = FlagState {
                enabled: *enabled,
                rollout_percentage: None,
                description: (*description).to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            };
            (key.as_str().to_string(), state)
        })
        .collect()
}
