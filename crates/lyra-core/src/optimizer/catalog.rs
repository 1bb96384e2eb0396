//! Seed data for the revenue optimizer.

use std::collections::BTreeMap;

use super::RevenueOpportunity;

/// Legacy market-condition names and the category each one adjusts.
pub const MARKET_CONDITION_ALIASES: &[(&str, &str)] = &[
    ("subscription-market-growth", "subscription"),
    ("virtual-currency-demand", "virtual-currency"),
    ("advertising-market-saturation", "advertising"),
    ("content-monetization-trend", "content"),
    ("marketplace-competition", "marketplace"),
    ("data-privacy-concerns", "data"),
    ("virtual-land-bubble", "real-estate"),
];

pub const IMPLEMENTATION_STEPS: &[&str] = &[
    "Define pricing structure and feature set",
    "Create user interface components",
    "Set up payment processing integration",
    "Develop backend API endpoints",
    "Test with sample users",
    "Launch and monitor performance",
];

/// Resolve a market-condition key to its category. Unknown keys are treated as categories.
pub fn condition_category(key: &str) -> &str {
    MARKET_CONDITION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, category)| *category)
        .unwrap_or(key)
}

pub fn default_market_conditions() -> BTreeMap<String, f64> {
    [
        ("subscription", 1.2),
        ("virtual-currency", 1.5),
        ("advertising", 0.8),
        ("content", 1.3),
        ("marketplace", 0.9),
        ("data", 0.7),
        ("real-estate", 1.1),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn default_catalog() -> Vec<RevenueOpportunity> {
    vec![
        RevenueOpportunity::new("premium-subscription", "Premium Membership Tiers", "subscription")
            .revenue(5000.0)
            .complexity(6)
            .days_to_revenue(14)
            .risk(3)
            .synergies(["marketplace-fees", "exclusive-content"]),
        RevenueOpportunity::new("linden-exchange", "Linden Dollar Exchange", "virtual-currency")
            .revenue(8000.0)
            .complexity(7)
            .days_to_revenue(30)
            .risk(5)
            .synergies(["marketplace-fees", "virtual-land"]),
        RevenueOpportunity::new("marketplace-fees", "Marketplace Transaction Fees", "marketplace")
            .revenue(6000.0)
            .complexity(5)
            .days_to_revenue(21)
            .risk(4)
            .synergies(["premium-subscription", "linden-exchange"]),
        RevenueOpportunity::new("targeted-ads", "Targeted Advertising Platform", "advertising")
            .revenue(4500.0)
            .complexity(6)
            .days_to_revenue(28)
            .risk(4)
            .synergies(["data-analytics"]),
        RevenueOpportunity::new("exclusive-content", "Exclusive Content Monetization", "content")
            .revenue(3500.0)
            .complexity(3)
            .days_to_revenue(7)
            .risk(2)
            .synergies(["premium-subscription"]),
        RevenueOpportunity::new("virtual-land", "Virtual Land Leasing", "real-estate")
            .revenue(7500.0)
            .complexity(8)
            .days_to_revenue(45)
            .risk(6)
            .synergies(["linden-exchange"]),
        RevenueOpportunity::new("data-analytics", "User Data Analytics Service", "data")
            .revenue(5500.0)
            .complexity(7)
            .days_to_revenue(60)
            .risk(7)
            .synergies(["targeted-ads"]),
        RevenueOpportunity::new("affiliate-program", "Affiliate Marketing Program", "marketing")
            .revenue(3000.0)
            .complexity(4)
            .days_to_revenue(21)
            .risk(3)
            .synergies(["marketplace-fees"]),
        RevenueOpportunity::new("creator-tools", "Creator Tools Subscription", "tools")
            .revenue(2500.0)
            .complexity(5)
            .days_to_revenue(30)
            .risk(3)
            .synergies(["premium-subscription", "exclusive-content"]),
    ]
}
