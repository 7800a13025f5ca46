//! Common types shared across the engine contracts.

use odra::prelude::*;
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::{PublicKey, U256};

/// Protocol-wide emergency level
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum EmergencyLevel {
    Normal,
    Yellow,
    Orange,
    Red,
}

/// Current emergency state (owned by the config registry)
#[odra::odra_type]
pub struct EmergencyState {
    pub level: EmergencyLevel,
    pub reason: String,
    pub since_ts: u64,
}

/// Per-sovereign capacity configuration
#[odra::odra_type]
pub struct SovereignConfig {
    /// Sovereign code, e.g. "ZA"
    pub code: String,
    /// Hard utilization cap in bps
    pub util_cap_bps: u32,
    /// Haircut applied to the hard cap to obtain the soft cap, in bps
    pub haircut_bps: u32,
    /// Pool weight in bps
    pub weight_bps: u32,
    pub enabled: bool,
}

/// Last quorum-accepted NAV
#[odra::odra_type]
pub struct NavRecord {
    /// NAV per token (1e27 = 1.0)
    pub value_ray: U256,
    pub timestamp_sec: u64,
    pub model_hash: [u8; 32],
    pub nonce: u64,
}

/// Freshness classification of the NAV read path
#[odra::odra_type]
#[derive(Copy)]
pub enum NavStatus {
    /// No NAV accepted yet
    Uninitialized,
    Fresh,
    /// Older than tier-1 threshold
    Degraded1,
    /// Older than tier-2 threshold
    Degraded2,
    /// Older than tier-3 threshold
    Degraded3,
    /// Emergency override in force
    EmergencyOverride,
}

impl NavStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, NavStatus::Degraded1 | NavStatus::Degraded2 | NavStatus::Degraded3)
    }
}

/// NAV as seen by pricing consumers
#[odra::odra_type]
pub struct NavQuote {
    /// Value to price with (emergency or post-haircut)
    pub value_ray: U256,
    /// Last quorum-accepted value
    pub raw_value_ray: U256,
    pub status: NavStatus,
    pub haircut_bps: u32,
    pub age_sec: u64,
    pub nonce: u64,
}

/// One signer attestation over the canonical NAV message
#[odra::odra_type]
pub struct NavSignature {
    pub signer: PublicKey,
    pub signature: Bytes,
}

/// Detachment band as seen by readers
#[odra::odra_type]
pub struct DetachmentStatus {
    /// Effective detachment (voided raises reverted, expansion applied)
    pub detachment_bps: u32,
    /// Value that applies if the pending raise is voided
    pub prior_bps: u32,
    /// Ratification deadline, 0 when nothing is pending
    pub pending_ratify_until: u64,
    /// A raise is pending and its deadline has passed
    pub raise_expired: bool,
    pub last_raise_ts: u64,
    /// Active emergency expansion target, 0 when inactive
    pub expansion_bps: u32,
    pub expansion_until: u64,
}

/// Issuance controller state snapshot
#[odra::odra_type]
pub struct IssuanceState {
    pub super_senior_cap: U256,
    pub detachment_bps: u32,
    pub last_detachment_raise_ts: u64,
    pub locked: bool,
    pub pending_ratify_until: u64,
    pub total_issued: U256,
}

/// Why an issuance request was rejected
#[odra::odra_type]
#[derive(Copy)]
pub enum RejectReason {
    None,
    InvalidAmount,
    EmergencyHalt,
    IssuanceLocked,
    RatificationExpired,
    TailCorrelationTooHigh,
    UnknownSovereign,
    SovereignDisabled,
    SovereignHardCapExceeded,
    SovereignCapacityExceeded,
    NavUnavailable,
    BufferUnhealthy,
    CapExceeded,
}

impl RejectReason {
    /// Error a mint fails with for this rejection
    pub fn as_error(&self) -> Option<crate::errors::SstError> {
        use crate::errors::SstError;
        match self {
            RejectReason::None => None,
            RejectReason::InvalidAmount => Some(SstError::InvalidAmount),
            RejectReason::EmergencyHalt => Some(SstError::IssuanceHalted),
            RejectReason::IssuanceLocked => Some(SstError::IssuanceLocked),
            RejectReason::RatificationExpired => Some(SstError::RatificationExpired),
            RejectReason::TailCorrelationTooHigh => Some(SstError::TailCorrelationTooHigh),
            RejectReason::UnknownSovereign => Some(SstError::UnknownSovereign),
            RejectReason::SovereignDisabled => Some(SstError::SovereignDisabled),
            RejectReason::SovereignHardCapExceeded => Some(SstError::SovereignHardCapExceeded),
            RejectReason::SovereignCapacityExceeded => Some(SstError::SovereignCapacityExceeded),
            RejectReason::NavUnavailable => Some(SstError::NavUnavailable),
            RejectReason::BufferUnhealthy => Some(SstError::BufferUnhealthy),
            RejectReason::CapExceeded => Some(SstError::CapExceeded),
        }
    }
}

/// Result of the issuance admission gate
#[odra::odra_type]
pub struct IssuanceDecision {
    pub ok: bool,
    pub reason: RejectReason,
    /// Tokens the request would mint at the current NAV (0 if unknown)
    pub tokens: U256,
}

impl IssuanceDecision {
    pub fn accept(tokens: U256) -> Self {
        Self { ok: true, reason: RejectReason::None, tokens }
    }

    pub fn reject(reason: RejectReason) -> Self {
        Self { ok: false, reason, tokens: U256::zero() }
    }
}

/// Read-only view over live buffer balances
#[odra::odra_type]
pub struct BufferSnapshot {
    /// Pre-tranche (first-loss cash) balance, USDC units
    pub pre_tranche_balance: U256,
    /// Instant redemption buffer balance, USDC units
    pub instant_buffer_balance: U256,
    /// Target for the current emergency level, USDC units
    pub target: U256,
    /// Outstanding token supply
    pub outstanding_supply: U256,
    pub level: EmergencyLevel,
}

impl BufferSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.pre_tranche_balance + self.instant_buffer_balance >= self.target
    }
}

/// Redemption routing lane
#[odra::odra_type]
#[derive(Copy)]
pub enum RedemptionLane {
    Instant,
    Window,
}

/// Windowed redemption bucket
#[odra::odra_type]
#[derive(Default)]
pub struct WindowState {
    pub strike_ts: u64,
    /// Sum of quoted USDC across requests
    pub total_requested: U256,
    /// Sum of burned tokens across requests
    pub total_tokens: U256,
    pub funds_provided: U256,
    /// Fraction paid (1e27 = 100%), fixed at finalize
    pub settlement_ray: U256,
    pub finalized: bool,
    pub claimed_total: U256,
    pub request_count: u32,
}

/// One account's position in a window
#[odra::odra_type]
pub struct WindowRequest {
    pub account: Address,
    pub amount_tokens: U256,
    /// USDC value quoted at request time
    pub quoted_usdc: U256,
    pub requested_at: u64,
    pub claimed: bool,
}

/// Diagnostic priority of a queued request
#[odra::odra_type]
#[derive(Default)]
pub struct PriorityScore {
    /// Weighted score in bps
    pub score: u32,
    /// Bit-set of `PRIORITY_FLAG_*`
    pub flags: u8,
    pub risk_component: u32,
    pub age_component: u32,
    pub size_component: u32,
}

pub const PRIORITY_FLAG_RISK_HIGH: u8 = 0b001;
pub const PRIORITY_FLAG_SIZE_LARGE: u8 = 0b010;
pub const PRIORITY_FLAG_AGE_OLD: u8 = 0b100;

/// Queue listing row
#[odra::odra_type]
pub struct QueueEntry {
    pub account: Address,
    pub amount_tokens: U256,
    pub quoted_usdc: U256,
    pub priority: PriorityScore,
}

/// Instant-lane spend for one UTC day
#[odra::odra_type]
#[derive(Default)]
pub struct DailySpend {
    pub day_index: u64,
    pub spent: U256,
}

/// Keys of the registry parameter store
#[odra::odra_type]
#[derive(Copy)]
pub enum ParamKey {
    MaxTailCorrelationPpm,
    InstantPerTxLimit,
    InstantDailyCap,
    InstantFeeBps,
    BufferTargetNormalBps,
    BufferTargetYellowBps,
    BufferTargetOrangeBps,
    BufferTargetRedBps,
    IssuanceThrottleNormalBps,
    IssuanceThrottleYellowBps,
    IssuanceThrottleOrangeBps,
    PriceBandNormalBps,
    PriceBandYellowBps,
    PriceBandOrangeBps,
    PriceBandRedBps,
    RiskWeightBps,
    AgeWeightBps,
    SizeWeightBps,
    PriorityMinAgeSec,
    PrioritySizeThreshold,
}

impl ParamKey {
    /// Stable name used in `ParamSet` events
    pub const fn name(&self) -> &'static str {
        match self {
            ParamKey::MaxTailCorrelationPpm => "max_tail_correlation_ppm",
            ParamKey::InstantPerTxLimit => "instant_per_tx_limit",
            ParamKey::InstantDailyCap => "instant_daily_cap",
            ParamKey::InstantFeeBps => "instant_fee_bps",
            ParamKey::BufferTargetNormalBps => "buffer_target_normal_bps",
            ParamKey::BufferTargetYellowBps => "buffer_target_yellow_bps",
            ParamKey::BufferTargetOrangeBps => "buffer_target_orange_bps",
            ParamKey::BufferTargetRedBps => "buffer_target_red_bps",
            ParamKey::IssuanceThrottleNormalBps => "issuance_throttle_normal_bps",
            ParamKey::IssuanceThrottleYellowBps => "issuance_throttle_yellow_bps",
            ParamKey::IssuanceThrottleOrangeBps => "issuance_throttle_orange_bps",
            ParamKey::PriceBandNormalBps => "price_band_normal_bps",
            ParamKey::PriceBandYellowBps => "price_band_yellow_bps",
            ParamKey::PriceBandOrangeBps => "price_band_orange_bps",
            ParamKey::PriceBandRedBps => "price_band_red_bps",
            ParamKey::RiskWeightBps => "risk_weight_bps",
            ParamKey::AgeWeightBps => "age_weight_bps",
            ParamKey::SizeWeightBps => "size_weight_bps",
            ParamKey::PriorityMinAgeSec => "priority_min_age_sec",
            ParamKey::PrioritySizeThreshold => "priority_size_threshold",
        }
    }

    pub fn is_weight(&self) -> bool {
        matches!(
            self,
            ParamKey::RiskWeightBps | ParamKey::AgeWeightBps | ParamKey::SizeWeightBps
        )
    }
}

/// Parameters read by the issuance controller
#[odra::odra_type]
pub struct IssuanceParams {
    pub level: EmergencyLevel,
    pub max_tail_correlation_ppm: u32,
    /// Share of the super-senior cap usable at this level
    pub throttle_bps: u32,
}

/// Parameters read by the redemption queue
#[odra::odra_type]
pub struct RedemptionParams {
    pub per_tx_limit: U256,
    pub daily_cap: U256,
    pub fee_bps: u32,
}

/// Bounds fixed by an emergency level
#[odra::odra_type]
pub struct LevelParams {
    pub level: EmergencyLevel,
    pub buffer_target_bps: u32,
    pub issuance_throttle_bps: u32,
    pub price_band_bps: u32,
}

/// Weights and ramps for queue priority scoring
#[odra::odra_type]
pub struct PriorityParams {
    pub risk_weight_bps: u32,
    pub age_weight_bps: u32,
    pub size_weight_bps: u32,
    pub min_age_sec: u64,
    pub size_threshold: U256,
}
