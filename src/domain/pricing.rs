//! Subscription pricing.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::entities::enums::Plan;

pub const MIN_DURATION_MONTHS: u32 = 1;
pub const MAX_DURATION_MONTHS: u32 = 36;

const HALF_YEAR_DISCOUNT: f64 = 0.9;
const YEARLY_DISCOUNT: f64 = 0.85;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid duration: {0} months (must be between 1 and 36)")]
    InvalidDuration(u32),
}

/// Tabulated prices for the standard durations (1, 3 and 12 months).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanPrices {
    pub monthly: i64,
    pub quarterly: i64,
    pub yearly: i64,
}

#[must_use]
pub const fn plan_prices(plan: Plan) -> PlanPrices {
    match plan {
        Plan::Basic => PlanPrices {
            monthly: 299,
            quarterly: 799,
            yearly: 2999,
        },
        Plan::Premium => PlanPrices {
            monthly: 599,
            quarterly: 1599,
            yearly: 5999,
        },
        Plan::Enterprise => PlanPrices {
            monthly: 999,
            quarterly: 2699,
            yearly: 9999,
        },
    }
}

pub fn parse_plan(name: &str) -> Result<Plan, PricingError> {
    name.parse::<Plan>().map_err(PricingError::InvalidPlan)
}

pub fn validate_duration(months: u32) -> Result<u32, PricingError> {
    if (MIN_DURATION_MONTHS..=MAX_DURATION_MONTHS).contains(&months) {
        Ok(months)
    } else {
        Err(PricingError::InvalidDuration(months))
    }
}

/// Price of `months` of `plan` in whole currency units.
///
/// Standard durations use the table. Anything else is the monthly price times
/// the duration, reduced by 10% from six months and then by a further 15% from
/// twelve months, rounded to the nearest unit.
pub fn price(plan: Plan, months: u32) -> Result<i64, PricingError> {
    let months = validate_duration(months)?;
    let prices = plan_prices(plan);

    match months {
        1 => return Ok(prices.monthly),
        3 => return Ok(prices.quarterly),
        12 => return Ok(prices.yearly),
        _ => {}
    }

    let mut total = prices.monthly as f64 * f64::from(months);
    if months >= 6 {
        total *= HALF_YEAR_DISCOUNT;
    }
    if months >= 12 {
        total *= YEARLY_DISCOUNT;
    }

    Ok(total.round() as i64)
}

/// Same as [`price`], for a plan name coming from user input.
pub fn calculate_price(plan: &str, months: u32) -> Result<i64, PricingError> {
    price(parse_plan(plan)?, months)
}

/// All plans with their tabulated prices, keyed by plan name.
#[must_use]
pub fn price_table() -> BTreeMap<&'static str, PlanPrices> {
    [Plan::Basic, Plan::Premium, Plan::Enterprise]
        .into_iter()
        .map(|plan| (plan.as_str(), plan_prices(plan)))
        .collect()
}
