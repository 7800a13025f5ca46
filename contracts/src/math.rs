//! Fixed-point arithmetic and pure policy functions.
//!
//! Everything here is free of ledger state so the contracts stay thin and
//! the policy can be tested directly.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::{
    PriorityParams, PriorityScore, RedemptionLane, PRIORITY_FLAG_AGE_OLD,
    PRIORITY_FLAG_RISK_HIGH, PRIORITY_FLAG_SIZE_LARGE,
};

/// Basis points scale (100% = 10000 bps)
pub const BPS_SCALE: u32 = 10_000;

/// Parts-per-million scale
pub const PPM_SCALE: u32 = 1_000_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Seconds in a year (365 days)
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Windowed-lane strike period (30 days)
pub const WINDOW_PERIOD_SECONDS: u64 = 30 * SECONDS_PER_DAY;

/// Token has 18 decimals, USDC has 6
pub const USDC_TO_TOKEN_DECIMALS: usize = 12;

/// A component at or above this value raises its diagnostic flag
pub const PRIORITY_FLAG_THRESHOLD: u32 = 5_000;

/// 1e27
pub fn ray() -> U256 {
    U256::exp10(27)
}

fn usdc_scale() -> U256 {
    U256::exp10(USDC_TO_TOKEN_DECIMALS)
}

/// `amount * bps / 10000`
pub fn apply_bps(amount: U256, bps: u32) -> U256 {
    amount * U256::from(bps) / U256::from(BPS_SCALE)
}

/// `value * (10000 - haircut) / 10000`, saturating at zero
pub fn apply_haircut(value: U256, haircut_bps: u32) -> U256 {
    apply_bps(value, BPS_SCALE.saturating_sub(haircut_bps))
}

/// Tokens bought by `usdc` at `nav_ray`; `None` when NAV is zero or the
/// product overflows.
pub fn usdc_to_tokens(usdc: U256, nav_ray: U256) -> Option<U256> {
    if nav_ray.is_zero() {
        return None;
    }
    usdc.checked_mul(usdc_scale())
        .and_then(|v| v.checked_mul(ray()))
        .map(|v| v / nav_ray)
}

/// USDC value of `tokens` at `nav_ray`
pub fn tokens_to_usdc(tokens: U256, nav_ray: U256) -> U256 {
    tokens
        .checked_mul(nav_ray)
        .map(|v| v / ray() / usdc_scale())
        .unwrap_or(U256::zero())
}

/// Soft cap of a sovereign: `util_cap * (1 - haircut)`
pub fn effective_capacity_bps(util_cap_bps: u32, haircut_bps: u32) -> u32 {
    let damped = (util_cap_bps as u64) * (BPS_SCALE.saturating_sub(haircut_bps) as u64)
        / (BPS_SCALE as u64);
    damped as u32
}

/// Outcome of the sovereign capacity check
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SovereignAllowance {
    /// Utilization is above the hard cap
    HardCapExceeded,
    /// Tokens still issuable against this sovereign
    Allowed(U256),
}

/// Linear damping between the soft cap and the hard cap.
///
/// Below the soft cap the whole `headroom` is usable. Between soft and hard
/// cap the usable headroom shrinks linearly to zero at the hard cap. Above
/// the hard cap nothing is usable.
pub fn sovereign_allowance(
    headroom: U256,
    util_bps: u32,
    soft_cap_bps: u32,
    hard_cap_bps: u32,
) -> SovereignAllowance {
    if util_bps > hard_cap_bps {
        return SovereignAllowance::HardCapExceeded;
    }
    if util_bps <= soft_cap_bps || hard_cap_bps <= soft_cap_bps {
        return SovereignAllowance::Allowed(headroom);
    }
    let span = hard_cap_bps - soft_cap_bps;
    let remaining = hard_cap_bps - util_bps;
    SovereignAllowance::Allowed(headroom * U256::from(remaining) / U256::from(span))
}

/// Whether `next` lies within `max_jump_bps` of `prev` (inclusive)
pub fn nav_within_jump(prev: U256, next: U256, max_jump_bps: u32) -> bool {
    if prev.is_zero() {
        return true;
    }
    let hi = apply_bps(prev, BPS_SCALE + max_jump_bps);
    let lo = apply_bps(prev, BPS_SCALE.saturating_sub(max_jump_bps));
    next >= lo && next <= hi
}

/// UTC day bucket of a timestamp
pub fn day_index(now_sec: u64) -> u64 {
    now_sec / SECONDS_PER_DAY
}

/// Next periodic strike strictly after `now_sec`
pub fn next_strike(now_sec: u64) -> u64 {
    (now_sec / WINDOW_PERIOD_SECONDS + 1) * WINDOW_PERIOD_SECONDS
}

/// `min(1e27, funds * 1e27 / total)`; a window with nothing requested
/// settles at 100%.
pub fn settlement_ray(funds_provided: U256, total_requested: U256) -> U256 {
    if total_requested.is_zero() {
        return ray();
    }
    let fraction = funds_provided
        .checked_mul(ray())
        .map(|v| v / total_requested)
        .unwrap_or(ray());
    fraction.min(ray())
}

/// `amount * settlement / 1e27`, rounded down
pub fn pro_rata_payout(amount: U256, settlement_ray: U256) -> U256 {
    amount * settlement_ray / ray()
}

/// Route a redemption. Instant only when both limits hold.
pub fn route_lane(amount: U256, per_tx_limit: U256, remaining_today: U256) -> RedemptionLane {
    if amount <= per_tx_limit && amount <= remaining_today {
        RedemptionLane::Instant
    } else {
        RedemptionLane::Window
    }
}

/// Price an instant redemption realizes, in bps of the quorum NAV:
/// the degradation haircut compounded with the instant fee
pub fn instant_price_bps(fee_bps: u32, haircut_bps: u32) -> u32 {
    let after_haircut = u64::from(BPS_SCALE.saturating_sub(haircut_bps));
    let after_fee = u64::from(BPS_SCALE.saturating_sub(fee_bps));
    (after_haircut * after_fee / u64::from(BPS_SCALE)) as u32
}

/// Risk adjustment normalized to the max APY, in bps
pub fn risk_component(risk_adjustment_bps: u32, max_apy_bps: u32) -> u32 {
    if max_apy_bps == 0 {
        return 0;
    }
    let scaled = (risk_adjustment_bps as u64) * (BPS_SCALE as u64) / (max_apy_bps as u64);
    scaled.min(BPS_SCALE as u64) as u32
}

/// 0 below `min_age_sec`, ramping to 10000 at one year
pub fn age_component(age_sec: u64, min_age_sec: u64) -> u32 {
    if age_sec < min_age_sec {
        return 0;
    }
    if min_age_sec >= SECONDS_PER_YEAR {
        return BPS_SCALE;
    }
    let span = SECONDS_PER_YEAR - min_age_sec;
    let elapsed = (age_sec - min_age_sec).min(span);
    (elapsed * BPS_SCALE as u64 / span) as u32
}

/// 0 below `threshold`, ramping to 10000 at ten times the threshold
pub fn size_component(amount: U256, threshold: U256) -> u32 {
    if threshold.is_zero() || amount < threshold {
        return 0;
    }
    let span = threshold * U256::from(9u8);
    let over = (amount - threshold).min(span);
    (over * U256::from(BPS_SCALE) / span).as_u32()
}

/// Weighted diagnostic score; weights are expected to sum to at most 10000.
pub fn priority_score(risk: u32, age: u32, size: u32, params: &PriorityParams) -> PriorityScore {
    let weighted = (risk as u64) * (params.risk_weight_bps as u64)
        + (age as u64) * (params.age_weight_bps as u64)
        + (size as u64) * (params.size_weight_bps as u64);

    let mut flags = 0u8;
    if risk >= PRIORITY_FLAG_THRESHOLD {
        flags |= PRIORITY_FLAG_RISK_HIGH;
    }
    if size >= PRIORITY_FLAG_THRESHOLD {
        flags |= PRIORITY_FLAG_SIZE_LARGE;
    }
    if age >= PRIORITY_FLAG_THRESHOLD {
        flags |= PRIORITY_FLAG_AGE_OLD;
    }

    PriorityScore {
        score: (weighted / BPS_SCALE as u64) as u32,
        flags,
        risk_component: risk,
        age_component: age,
        size_component: size,
    }
}
