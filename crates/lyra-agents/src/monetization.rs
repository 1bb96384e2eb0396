//! Monetization agent: revenue strategies, advertiser matching, optimizer runs and projections.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use lyra_core::{
    Agent, AgentError, AgentResult, BusHandle, IntelligenceKind, IntelligenceMessage, OptimizationParams,
    QueryOutcome, RevenueOptimizer,
};

pub const AGENT_NAME: &str = "monetization";

const DEFAULT_USER_COUNT: f64 = 1000.0;
const DEFAULT_ACTIVE_PCT: f64 = 25.0;

static OPTIMIZE_INTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(optimi[sz]\w*|plan|plans|planning)\b").expect("valid regex"));
static PROJECTION_INTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(project\w*|forecast\w*)\b").expect("valid regex"));
static CURRENCY_INTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(linden\w*|currenc\w*|crypto\w*)\b").expect("valid regex"));
/// Demographic phrase after "for" or "targeting", e.g. "advertisers for land owners".
static DEMOGRAPHIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:for|targeting)\s+([a-z][a-z\s-]*[a-z])").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
pub struct Strategy {
    pub kind: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub estimated_revenue: &'static str,
    pub implementation_complexity: &'static str,
    pub requirements: &'static [&'static str],
}

#[derive(Debug, Clone, Serialize)]
pub struct Advertiser {
    pub name: &'static str,
    pub industry: &'static str,
    pub budget: u32,
    pub target_demographic: &'static str,
    pub preferred_placement: &'static [&'static str],
}

const STRATEGIES: &[Strategy] = &[
    Strategy {
        kind: "subscription",
        name: "Premium Membership",
        description: "Recurring subscription model with tiered benefits",
        estimated_revenue: "High with good retention",
        implementation_complexity: "medium",
        requirements: &["Payment processor", "Member benefits", "Content gating"],
    },
    Strategy {
        kind: "virtual-currency",
        name: "Virtual Currency Exchange",
        description: "Exchange between platform currency and fiat with a transaction spread",
        estimated_revenue: "High with strong user adoption",
        implementation_complexity: "medium",
        requirements: &["Exchange API integration", "Secure wallet management", "Transaction monitoring"],
    },
    Strategy {
        kind: "marketplace",
        name: "Transaction Fees",
        description: "Commission on marketplace sales between users",
        estimated_revenue: "High with active marketplace",
        implementation_complexity: "medium",
        requirements: &["Marketplace functionality", "Payment escrow", "Dispute resolution"],
    },
    Strategy {
        kind: "advertising",
        name: "Targeted Display Ads",
        description: "Banner and interstitial ads based on user preferences",
        estimated_revenue: "Medium with high traffic",
        implementation_complexity: "low",
        requirements: &["Ad network integration", "User analytics"],
    },
    Strategy {
        kind: "content",
        name: "Premium Content Access",
        description: "Pay-per-view or premium access to exclusive content",
        estimated_revenue: "Medium with quality content",
        implementation_complexity: "low",
        requirements: &["Content gating", "Payment processor"],
    },
    Strategy {
        kind: "real-estate",
        name: "Virtual Land Leasing",
        description: "Lease parcels of virtual land to users for monthly fees",
        estimated_revenue: "Very high with prime locations",
        implementation_complexity: "high",
        requirements: &["Land management system", "Automated billing", "Zoning regulations"],
    },
    Strategy {
        kind: "tools",
        name: "Premium Creator Tools",
        description: "Advanced tools for content creators with subscription fee",
        estimated_revenue: "Medium with creator adoption",
        implementation_complexity: "medium",
        requirements: &["Tool development", "Creator support", "Regular updates"],
    },
];

const ADVERTISERS: &[Advertiser] = &[
    Advertiser {
        name: "VirtualFashion Inc.",
        industry: "Virtual Apparel",
        budget: 5000,
        target_demographic: "Fashion-conscious users aged 18-35",
        preferred_placement: &["Profile pages", "Virtual events"],
    },
    Advertiser {
        name: "DigitalRealEstate Group",
        industry: "Virtual Land",
        budget: 12000,
        target_demographic: "High net worth users interested in virtual property",
        preferred_placement: &["Homepage", "Marketplace listings"],
    },
    Advertiser {
        name: "CryptoWallet Pro",
        industry: "Cryptocurrency",
        budget: 8000,
        target_demographic: "Crypto enthusiasts and investors",
        preferred_placement: &["Transaction pages", "Currency exchange screens"],
    },
    Advertiser {
        name: "AvatarCustomize",
        industry: "Character Customization",
        budget: 3500,
        target_demographic: "New users and customization enthusiasts",
        preferred_placement: &["User profile editor", "Social hubs"],
    },
    Advertiser {
        name: "Builders Guild",
        industry: "Design & Construction",
        budget: 7500,
        target_demographic: "Land owners and design enthusiasts",
        preferred_placement: &["Real estate listings", "Design showcases"],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueBreakdown {
    pub subscriptions: f64,
    pub advertising: f64,
    pub transactions: f64,
    pub currency_exchange: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueProjection {
    pub user_count: f64,
    pub active_users: f64,
    pub total_monthly: f64,
    pub breakdown: RevenueBreakdown,
    pub growth_opportunities: Vec<String>,
}

/// Monthly revenue for `user_count` users of which `active_pct` percent are active.
///
/// 5% of active users subscribe at $9.99, every active user yields $0.50 in ads,
/// 20% transact with a $2 average fee and 15% exchange currency with a $3 average fee.
pub fn revenue_projection(user_count: f64, active_pct: f64) -> RevenueProjection {
    let active_users = user_count * (active_pct / 100.0);
    let breakdown = RevenueBreakdown {
        subscriptions: active_users * 0.05 * 9.99,
        advertising: active_users * 0.5,
        transactions: active_users * 0.2 * 2.0,
        currency_exchange: active_users * 0.15 * 3.0,
    };
    RevenueProjection {
        user_count,
        active_users,
        total_monthly: breakdown.subscriptions + breakdown.advertising + breakdown.transactions + breakdown.currency_exchange,
        breakdown,
        growth_opportunities: vec![
            "Increase subscription conversion by 2% with improved onboarding".to_string(),
            "Implement targeted ads for 30% higher CPM rates".to_string(),
            "Add premium marketplace options with 5% higher transaction fees".to_string(),
            "Optimize currency exchange rates for 20% higher volume".to_string(),
        ],
    }
}

/// Advertisers whose target demographic mentions `demographic` (case-insensitive).
pub fn match_advertisers(demographic: &str) -> Vec<&'static Advertiser> {
    let needle = demographic.to_lowercase();
    ADVERTISERS
        .iter()
        .filter(|a| a.target_demographic.to_lowercase().contains(&needle))
        .collect()
}

/// Demographic named in an advertiser query, if any.
fn requested_demographic(query: &str) -> Option<&str> {
    DEMOGRAPHIC
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|d| !d.is_empty())
}

/// First bare number in `query` is the user count, a number followed by `%` the active share.
/// Thousands separators (`5,000`, `5_000`) are accepted.
fn projection_inputs(query: &str) -> AgentResult<(f64, f64)> {
    let mut users = None;
    let mut active = None;
    for token in query.split_whitespace() {
        let token = token.trim_matches(|c: char| c == ',' || c == '.' || c == '?');
        let (digits, is_pct) = match token.strip_suffix('%') {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '_' | ',')) {
            continue;
        }
        let value: f64 = digits
            .replace(['_', ','], "")
            .parse()
            .map_err(|_| AgentError::InvalidQuery(format!("'{}' is not a number", token)))?;
        if is_pct {
            active.get_or_insert(value);
        } else {
            users.get_or_insert(value);
        }
    }

    let active = active.unwrap_or(DEFAULT_ACTIVE_PCT);
    if !(0.0..=100.0).contains(&active) {
        return Err(AgentError::InvalidQuery(format!(
            "active share must be between 0% and 100%, got {}%",
            active
        )));
    }
    Ok((users.unwrap_or(DEFAULT_USER_COUNT), active))
}

pub struct MonetizationAgent {
    optimizer: Arc<RevenueOptimizer>,
    bus: BusHandle,
}

impl MonetizationAgent {
    pub fn new(optimizer: Arc<RevenueOptimizer>, bus: BusHandle) -> Self {
        Self { optimizer, bus }
    }

    pub fn optimizer(&self) -> &Arc<RevenueOptimizer> {
        &self.optimizer
    }

    /// Advertisers for the demographic named in `query`, or the whole roster.
    fn advertisers(&self, query: &str) -> QueryOutcome {
        let demographic = requested_demographic(query);
        let matched = demographic.map(match_advertisers).unwrap_or_default();
        let message = match demographic {
            Some(d) if !matched.is_empty() => format!("{} advertisers target {}.", matched.len(), d),
            Some(d) => format!("No advertisers target {} yet; here is everyone buying placements.", d),
            None => "I can help you connect with potential advertisers and optimize your ad strategy.".to_string(),
        };
        let advertisers: Vec<&Advertiser> = if matched.is_empty() {
            ADVERTISERS.iter().collect()
        } else {
            matched
        };
        debug!(target: "lyra::agents", agent = AGENT_NAME, ?demographic, count = advertisers.len(), "advertisers selected");

        QueryOutcome::answer(message)
            .with_data(json!({
                "demographic": demographic,
                "potential_advertisers": advertisers,
                "recommended_placements": [
                    { "location": "Homepage banner", "estimated_cpm": "$2.50" },
                    { "location": "Profile sidebar", "estimated_cpm": "$1.75" },
                    { "location": "Marketplace listings", "estimated_cpm": "$3.20" },
                ],
            }))
            .with_suggestions(["Create an advertising package", "Optimize ad placements"])
    }

    fn optimize(&self) -> QueryOutcome {
        let result = self.optimizer.run_optimization(OptimizationParams::default());
        let data = serde_json::to_value(&result).unwrap_or(Value::Null);
        self.bus.publish(
            IntelligenceMessage::new(IntelligenceKind::OptimizationResult, data.clone()),
            &["intelligence"],
        );

        if result.is_empty() {
            return QueryOutcome::answer("No opportunities fit the current risk, horizon and budget constraints.")
                .with_data(data)
                .with_suggestions(["Raise the budget", "Extend the time horizon"]);
        }
        QueryOutcome::answer(format!(
            "Selected {} opportunities worth an estimated ${:.2} per month.",
            result.opportunities.len(),
            result.estimated_total_revenue
        ))
        .with_data(data)
        .with_suggestions(["Forecast revenue for 10000 users at 20% active", "Show advertisers"])
    }
}

#[async_trait]
impl Agent for MonetizationAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "Monetization Assistant: helps optimize revenue streams through various monetization channels"
    }

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome> {
        let q = query.to_lowercase();
        debug!(target: "lyra::agents", agent = AGENT_NAME, query, "processing query");

        if OPTIMIZE_INTENT.is_match(&q) {
            return Ok(self.optimize());
        }

        if PROJECTION_INTENT.is_match(&q) {
            let (users, active) = projection_inputs(&q)?;
            let projection = revenue_projection(users, active);
            return Ok(QueryOutcome::answer(format!(
                "Projected monthly revenue: ${:.2} from {:.0} active users.",
                projection.total_monthly, projection.active_users
            ))
            .with_data(json!(projection)));
        }

        if q.contains("revenue") || q.contains("money") || q.contains("monetiz") {
            return Ok(QueryOutcome::answer("I've analyzed potential monetization strategies for your platform.")
                .with_data(json!({
                    "recommended_strategies": &STRATEGIES[..3],
                    "estimated_monthly_revenue": "$5,000 - $15,000 depending on user activity and implementation",
                    "key_recommendation": "Combine currency exchange, subscriptions and transaction fees",
                }))
                .with_suggestions([
                    "Show me subscription models",
                    "Optimize my revenue plan",
                    "Forecast revenue for 5000 users",
                ]));
        }

        if q.contains("advertis") || q.contains("sponsor") {
            return Ok(self.advertisers(&q));
        }

        if CURRENCY_INTENT.is_match(&q) {
            return Ok(QueryOutcome::answer(
                "Here are strategies for virtual currency integration and cryptocurrency options.",
            )
            .with_data(json!({
                "currency_integration": {
                    "official_exchange": true,
                    "exchange_rate": "L$250 = $1 USD",
                    "implementation_complexity": "medium",
                    "revenue_model": "Transaction fees + premium exchange rates",
                    "estimated_monthly_revenue": "$2,500 - $7,500 depending on volume",
                },
                "key_benefits": [
                    "Seamless integration with the in-world economy",
                    "Established user trust and familiarity",
                    "Lower regulatory hurdles compared to cryptocurrency",
                    "Potential for high transaction volume",
                ],
                "implementation_steps": [
                    "Establish an official exchange partnership",
                    "Implement secure wallet system",
                    "Create transaction monitoring dashboard",
                    "Set competitive exchange rates and fee structure",
                ],
            }))
            .with_suggestions([
                "Set up a currency exchange",
                "Implement crypto payments",
                "Create subscription packages",
            ]));
        }

        Ok(QueryOutcome::answer(
            "I can help you maximize revenue through various monetization channels. What specific aspect are you interested in?",
        )
        .with_suggestions([
            "Show monetization options",
            "Find potential advertisers",
            "Forecast potential revenue",
            "Optimize my revenue plan",
        ]))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        match message.kind {
            IntelligenceKind::MarketTrends => {
                let Some(conditions) = message.data.get("market_conditions").and_then(Value::as_object) else {
                    debug!(target: "lyra::agents", agent = AGENT_NAME, "market trends without conditions");
                    return;
                };
                let updates: Vec<(String, f64)> = conditions
                    .iter()
                    .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                    .collect();
                info!(target: "lyra::agents", agent = AGENT_NAME, updated = updates.len(), "market conditions refreshed from intelligence");
                self.optimizer.update_market_conditions(updates);
            }
            ref kind => {
                debug!(target: "lyra::agents", agent = AGENT_NAME, %kind, "intelligence noted");
            }
        }
    }
}
