//! Revenue Optimization Engine.
//!
//! Constrained greedy selection over a fixed opportunity catalog:
//! filter by horizon and risk, rank by market/preference adjusted efficiency, accept while the
//! budget allows, then credit synergy boosts between accepted partners. Scoring is
//! deterministic for fixed inputs. Exactly one result is cached; each run overwrites it.

mod catalog;

pub use catalog::{
    condition_category, default_catalog, default_market_conditions, IMPLEMENTATION_STEPS,
    MARKET_CONDITION_ALIASES,
};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::OptimizerConfig;
use crate::shorthand::{log_short, ShortLevel};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueOpportunity {
    pub id: String,
    pub name: String,
    pub category: String,
    /// Estimated monthly revenue (USD).
    pub potential_revenue: f64,
    /// 1..=10
    pub implementation_complexity: u32,
    /// Days until revenue starts.
    pub time_to_revenue: u32,
    /// 1..=10
    pub risk_factor: u32,
    pub synergies: Vec<String>,
}

impl RevenueOpportunity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            potential_revenue: 0.0,
            implementation_complexity: 1,
            time_to_revenue: 0,
            risk_factor: 1,
            synergies: Vec::new(),
        }
    }

    pub fn revenue(mut self, revenue: f64) -> Self {
        self.potential_revenue = revenue;
        self
    }

    pub fn complexity(mut self, complexity: u32) -> Self {
        self.implementation_complexity = complexity;
        self
    }

    pub fn days_to_revenue(mut self, days: u32) -> Self {
        self.time_to_revenue = days;
        self
    }

    pub fn risk(mut self, risk: u32) -> Self {
        self.risk_factor = risk;
        self
    }

    pub fn synergies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synergies = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Optional run parameters. Omitted fields fall back to [`OptimizerConfig`] defaults;
/// supplied values are used as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParams {
    pub risk_tolerance: Option<f64>,
    pub time_horizon: Option<f64>,
    pub initial_budget: Option<f64>,
}

impl OptimizationParams {
    pub fn risk_tolerance(mut self, value: f64) -> Self {
        self.risk_tolerance = Some(value);
        self
    }

    pub fn time_horizon(mut self, days: f64) -> Self {
        self.time_horizon = Some(days);
        self
    }

    pub fn initial_budget(mut self, budget: f64) -> Self {
        self.initial_budget = Some(budget);
        self
    }
}

/// Parameters actually used for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParams {
    pub risk_tolerance: f64,
    pub time_horizon: f64,
    pub initial_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Accepted opportunities in acceptance order.
    pub opportunities: Vec<RevenueOpportunity>,
    pub estimated_total_revenue: f64,
    /// Accepted ids ordered by ascending `time_to_revenue`.
    pub implementation_order: Vec<String>,
    /// Max `time_to_revenue` among accepted, 0 if none.
    pub timeline_estimate: u32,
    pub confidence_score: f64,
    pub remaining_budget: f64,
    pub params: ResolvedParams,
    pub run: u64,
    pub computed_at: DateTime<Utc>,
}

impl OptimizationResult {
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }

    pub fn selected_ids(&self) -> Vec<&str> {
        self.opportunities.iter().map(|o| o.id.as_str()).collect()
    }
}

/// Derived metrics for a single catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityAnalysis {
    pub opportunity: RevenueOpportunity,
    pub market_adjusted_revenue: f64,
    pub preference_adjusted_revenue: f64,
    pub implementation_cost: f64,
    pub return_on_investment: f64,
    pub breakeven_days: f64,
    pub recommended_implementation_steps: Vec<String>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RevenueOptimizer {
    catalog: Vec<RevenueOpportunity>,
    defaults: OptimizerConfig,
    market_conditions: RwLock<BTreeMap<String, f64>>,
    preferences: RwLock<HashMap<String, f64>>,
    last_result: RwLock<Option<OptimizationResult>>,
    run_count: AtomicU64,
}

impl RevenueOptimizer {
    /// Engine over the built-in catalog and market conditions.
    pub fn new(defaults: OptimizerConfig) -> Self {
        Self::with_catalog(defaults, default_catalog(), default_market_conditions())
    }

    pub fn with_catalog(
        defaults: OptimizerConfig,
        catalog: Vec<RevenueOpportunity>,
        market_conditions: BTreeMap<String, f64>,
    ) -> Self {
        log_short(ShortLevel::Info, "revenue optimizer initialized");
        info!(
            target: "lyra::optimizer",
            opportunities = catalog.len(),
            conditions = market_conditions.len(),
            "revenue optimizer ready"
        );
        Self {
            catalog,
            defaults,
            market_conditions: RwLock::new(market_conditions),
            preferences: RwLock::new(HashMap::new()),
            last_result: RwLock::new(None),
            run_count: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &[RevenueOpportunity] {
        &self.catalog
    }

    pub fn run_count(&self) -> u64 {
        self.run_count.load(Ordering::Relaxed)
    }

    /// Merge market multipliers. Keys may be categories or legacy condition names.
    pub fn update_market_conditions<I, K>(&self, updates: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut market = self.market_conditions.write().unwrap_or_else(|e| e.into_inner());
        let mut touched = Vec::new();
        for (key, value) in updates {
            let category = condition_category(key.as_ref()).to_string();
            touched.push(category.clone());
            market.insert(category, value);
        }
        debug!(target: "lyra::optimizer", categories = ?touched, "market conditions updated");
    }

    pub fn market_conditions(&self) -> BTreeMap<String, f64> {
        self.market_conditions.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Merge per-category preference weights.
    pub fn set_user_preferences<I, K>(&self, updates: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut prefs = self.preferences.write().unwrap_or_else(|e| e.into_inner());
        for (key, value) in updates {
            prefs.insert(key.into(), value);
        }
        debug!(target: "lyra::optimizer", preferences = prefs.len(), "user preferences updated");
    }

    pub fn last_result(&self) -> Option<OptimizationResult> {
        self.last_result.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn resolve(&self, params: OptimizationParams) -> ResolvedParams {
        ResolvedParams {
            risk_tolerance: params.risk_tolerance.unwrap_or(self.defaults.risk_tolerance),
            time_horizon: params.time_horizon.unwrap_or(self.defaults.time_horizon_days),
            initial_budget: params.initial_budget.unwrap_or(self.defaults.initial_budget),
        }
    }

    /// Run the selection and cache the result.
    pub fn run_optimization(&self, params: OptimizationParams) -> OptimizationResult {
        let params = self.resolve(params);
        let run = self.run_count.fetch_add(1, Ordering::Relaxed) + 1;
        log_short(ShortLevel::Info, &format!("running revenue optimize pass #{}", run));
        debug!(
            target: "lyra::optimizer",
            run,
            risk_tolerance = params.risk_tolerance,
            time_horizon = params.time_horizon,
            budget = params.initial_budget,
            "optimization parameters"
        );

        let market = self.market_conditions.read().unwrap_or_else(|e| e.into_inner()).clone();
        let prefs = self.preferences.read().unwrap_or_else(|e| e.into_inner()).clone();

        // 1 + 2: filter and score
        let mut scored: Vec<(&RevenueOpportunity, f64)> = self
            .catalog
            .iter()
            .filter(|o| {
                f64::from(o.time_to_revenue) <= params.time_horizon
                    && f64::from(o.risk_factor) <= params.risk_tolerance
            })
            .map(|o| {
                let market_factor = market.get(&o.category).copied().unwrap_or(1.0);
                let preference = prefs.get(&o.category).copied().unwrap_or(1.0);
                let divisor = f64::from(o.implementation_complexity) * f64::from(o.risk_factor);
                let score = o.potential_revenue * market_factor * preference / divisor.max(f64::EPSILON);
                (o, score)
            })
            .collect();

        // 3: stable descending sort keeps catalog order on ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        // 4: greedy acceptance under budget
        let mut remaining = params.initial_budget;
        let mut accepted: Vec<RevenueOpportunity> = Vec::new();
        for (opportunity, _) in scored {
            let cost = self.implementation_cost(opportunity);
            if cost <= remaining {
                remaining -= cost;
                accepted.push(opportunity.clone());
            }
        }

        let accepted_ids: HashSet<&str> = accepted.iter().map(|o| o.id.as_str()).collect();
        let estimated_total_revenue: f64 = accepted
            .iter()
            .map(|o| o.potential_revenue * self.synergy_boost(o, &accepted_ids))
            .sum();

        // 5: implementation order by time to revenue
        let mut ordered: Vec<&RevenueOpportunity> = accepted.iter().collect();
        ordered.sort_by_key(|o| o.time_to_revenue);
        let implementation_order = ordered.iter().map(|o| o.id.clone()).collect();

        // 6
        let timeline_estimate = accepted.iter().map(|o| o.time_to_revenue).max().unwrap_or(0);

        // 7
        let confidence_score = confidence_score(&accepted, &market);

        let result = OptimizationResult {
            opportunities: accepted,
            estimated_total_revenue,
            implementation_order,
            timeline_estimate,
            confidence_score,
            remaining_budget: remaining,
            params,
            run,
            computed_at: Utc::now(),
        };

        log_short(
            ShortLevel::Info,
            &format!(
                "optimize completed: {} opportunities, ${:.2}/month projected",
                result.opportunities.len(),
                result.estimated_total_revenue
            ),
        );

        *self.last_result.write().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());
        result
    }

    /// Pure read: derived ROI and breakeven metrics for one catalog entry.
    pub fn opportunity_analysis(&self, id: &str) -> Option<OpportunityAnalysis> {
        let opportunity = self.catalog.iter().find(|o| o.id == id)?;
        let market_factor = self
            .market_conditions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&opportunity.category)
            .copied()
            .unwrap_or(1.0);
        let preference = self
            .preferences
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&opportunity.category)
            .copied()
            .unwrap_or(1.0);

        let cost = self.implementation_cost(opportunity);
        let daily_revenue = opportunity.potential_revenue / 30.0;

        Some(OpportunityAnalysis {
            market_adjusted_revenue: opportunity.potential_revenue * market_factor,
            preference_adjusted_revenue: opportunity.potential_revenue * preference,
            implementation_cost: cost,
            return_on_investment: if cost > 0.0 { opportunity.potential_revenue / cost } else { 0.0 },
            breakeven_days: if daily_revenue > 0.0 { cost / daily_revenue } else { f64::INFINITY },
            recommended_implementation_steps: IMPLEMENTATION_STEPS.iter().map(|s| s.to_string()).collect(),
            opportunity: opportunity.clone(),
        })
    }

    fn implementation_cost(&self, opportunity: &RevenueOpportunity) -> f64 {
        f64::from(opportunity.implementation_complexity) * self.defaults.cost_per_complexity
    }

    fn synergy_boost(&self, opportunity: &RevenueOpportunity, accepted: &HashSet<&str>) -> f64 {
        let partners = opportunity
            .synergies
            .iter()
            .filter(|s| s.as_str() != opportunity.id && accepted.contains(s.as_str()))
            .count();
        1.0 + self.defaults.synergy_boost * partners as f64
    }
}

/// `0.4·(1 − avgRisk/10) + 0.4·mean(market) + 0.2·synergyDensity`. Not clamped.
fn confidence_score(accepted: &[RevenueOpportunity], market: &BTreeMap<String, f64>) -> f64 {
    if accepted.is_empty() {
        return 0.0;
    }

    let avg_risk = accepted.iter().map(|o| f64::from(o.risk_factor)).sum::<f64>() / accepted.len() as f64;
    let risk_confidence = 1.0 - avg_risk / 10.0;

    let market_confidence = if market.is_empty() {
        1.0
    } else {
        market.values().sum::<f64>() / market.len() as f64
    };

    let synergy_density = if accepted.len() > 1 {
        let distinct: BTreeSet<&str> = accepted
            .iter()
            .flat_map(|o| o.synergies.iter().map(String::as_str))
            .collect();
        let slots: usize = accepted.iter().map(|o| o.synergies.len()).sum();
        if slots == 0 {
            0.0
        } else {
            distinct.len() as f64 / slots as f64
        }
    } else {
        0.5
    };

    risk_confidence * 0.4 + market_confidence * 0.4 + synergy_density * 0.2
}
