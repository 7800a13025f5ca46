//! Config Registry Contract
//!
//! Bounds-checked parameter store shared by the engine:
//! - Emergency state machine (NORMAL / YELLOW / ORANGE / RED)
//! - Sovereign capacity table, insertion-ordered for enumeration
//! - Keyed parameters with per-key bounds and defaults
//! - Per-level bounds: buffer target, issuance throttle, price band

use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{require_role, ROLE_EMERGENCY, ROLE_GOVERNANCE};
use crate::errors::SstError;
use crate::events::{
    EmergencyLevelChanged, ParamSet, SovereignAdded, SovereignEnabledSet, SovereignUpdated,
};
use crate::math::{effective_capacity_bps, BPS_SCALE, PPM_SCALE, SECONDS_PER_DAY, SECONDS_PER_YEAR};
use crate::types::{
    EmergencyLevel, EmergencyState, IssuanceParams, LevelParams, ParamKey, PriorityParams,
    RedemptionParams, SovereignConfig,
};

/// Upper bound for any token-denominated parameter (1e36)
fn max_amount() -> U256 {
    U256::exp10(36)
}

fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

/// Value a parameter reads as before governance ever sets it
pub fn default_param(key: ParamKey) -> U256 {
    match key {
        // 65%
        ParamKey::MaxTailCorrelationPpm => U256::from(650_000u32),
        ParamKey::InstantPerTxLimit => tokens(100_000),
        ParamKey::InstantDailyCap => tokens(1_000_000),
        ParamKey::InstantFeeBps => U256::zero(),
        ParamKey::BufferTargetNormalBps => U256::from(300u32),
        ParamKey::BufferTargetYellowBps => U256::from(500u32),
        ParamKey::BufferTargetOrangeBps => U256::from(800u32),
        ParamKey::BufferTargetRedBps => U256::from(1_200u32),
        ParamKey::IssuanceThrottleNormalBps => U256::from(10_000u32),
        ParamKey::IssuanceThrottleYellowBps => U256::from(7_500u32),
        ParamKey::IssuanceThrottleOrangeBps => U256::from(5_000u32),
        ParamKey::PriceBandNormalBps => U256::from(200u32),
        ParamKey::PriceBandYellowBps => U256::from(100u32),
        ParamKey::PriceBandOrangeBps => U256::from(25u32),
        ParamKey::PriceBandRedBps => U256::from(25u32),
        ParamKey::RiskWeightBps => U256::from(5_000u32),
        ParamKey::AgeWeightBps => U256::from(3_000u32),
        ParamKey::SizeWeightBps => U256::from(2_000u32),
        ParamKey::PriorityMinAgeSec => U256::from(SECONDS_PER_DAY),
        ParamKey::PrioritySizeThreshold => tokens(10_000),
    }
}

/// Inclusive upper bound a parameter may be set to
pub fn param_upper_bound(key: ParamKey) -> U256 {
    match key {
        ParamKey::MaxTailCorrelationPpm => U256::from(PPM_SCALE),
        ParamKey::InstantPerTxLimit
        | ParamKey::InstantDailyCap
        | ParamKey::PrioritySizeThreshold => max_amount(),
        ParamKey::PriorityMinAgeSec => U256::from(SECONDS_PER_YEAR),
        _ => U256::from(BPS_SCALE),
    }
}

fn bound_error(key: ParamKey) -> SstError {
    match key {
        ParamKey::MaxTailCorrelationPpm
        | ParamKey::InstantPerTxLimit
        | ParamKey::InstantDailyCap
        | ParamKey::PrioritySizeThreshold
        | ParamKey::PriorityMinAgeSec => SstError::ParamOutOfBounds,
        _ => SstError::BpsOutOfRange,
    }
}

/// Config Registry Contract
#[odra::module(events = [EmergencyLevelChanged, ParamSet, SovereignAdded, SovereignUpdated, SovereignEnabledSet])]
pub struct ConfigRegistry {
    /// Access control contract address
    access_control: Var<Address>,
    /// Current emergency state
    emergency: Var<EmergencyState>,
    /// Explicitly set parameters; unset keys read as their default
    params: Mapping<ParamKey, U256>,
    /// Sovereign configs by code
    sovereigns: Mapping<String, SovereignConfig>,
    /// Insertion order: index -> code
    sovereign_codes: Mapping<u32, String>,
    sovereign_count: Var<u32>,
}

#[odra::module]
impl ConfigRegistry {
    /// Initialize the registry at NORMAL with default parameters
    pub fn init(&mut self, access_control: Address) {
        self.access_control.set(access_control);
        self.emergency.set(EmergencyState {
            level: EmergencyLevel::Normal,
            reason: String::new(),
            since_ts: self.now_secs(),
        });
        self.sovereign_count.set(0);
    }

    // ========== Emergency State ==========

    /// Move to any emergency level (emergency only)
    pub fn set_emergency_level(&mut self, level: EmergencyLevel, reason: String) {
        self.require(ROLE_EMERGENCY);
        let previous = self.get_emergency_state();
        let since_ts = self.now_secs();
        self.emergency.set(EmergencyState {
            level,
            reason: reason.clone(),
            since_ts,
        });
        self.env().emit_event(EmergencyLevelChanged {
            from: previous.level,
            to: level,
            reason,
            since_ts,
        });
    }

    pub fn get_emergency_state(&self) -> EmergencyState {
        self.emergency.get().unwrap_or(EmergencyState {
            level: EmergencyLevel::Normal,
            reason: String::new(),
            since_ts: 0,
        })
    }

    pub fn get_emergency_level(&self) -> EmergencyLevel {
        self.get_emergency_state().level
    }

    // ========== Parameters ==========

    /// Set a keyed parameter (governance only)
    pub fn set_param(&mut self, key: ParamKey, value: U256) {
        self.require(ROLE_GOVERNANCE);
        if value > param_upper_bound(key) {
            self.env().revert(bound_error(key));
        }
        if key.is_weight() {
            let others = [ParamKey::RiskWeightBps, ParamKey::AgeWeightBps, ParamKey::SizeWeightBps]
                .iter()
                .filter(|k| **k != key)
                .fold(U256::zero(), |acc, k| acc + self.get_param(*k));
            if others + value > U256::from(BPS_SCALE) {
                self.env().revert(SstError::WeightsExceedTotal);
            }
        }

        let old_value = self.get_param(key);
        self.params.set(&key, value);
        self.env().emit_event(ParamSet {
            key: key.name().to_string(),
            old_value,
            new_value: value,
        });
    }

    pub fn get_param(&self, key: ParamKey) -> U256 {
        self.params.get(&key).unwrap_or_else(|| default_param(key))
    }

    // ========== Sovereigns ==========

    /// Register a new sovereign (governance only)
    pub fn add_sovereign(&mut self, code: String, util_cap_bps: u32, haircut_bps: u32, weight_bps: u32) {
        self.require(ROLE_GOVERNANCE);
        self.validate_sovereign(&code, util_cap_bps, haircut_bps, weight_bps);
        if self.sovereigns.get(&code).is_some() {
            self.env().revert(SstError::SovereignExists);
        }

        let index = self.sovereign_count.get().unwrap_or(0);
        self.sovereign_codes.set(&index, code.clone());
        self.sovereign_count.set(index + 1);
        self.sovereigns.set(&code, SovereignConfig {
            code: code.clone(),
            util_cap_bps,
            haircut_bps,
            weight_bps,
            enabled: true,
        });
        self.env().emit_event(SovereignAdded {
            code,
            util_cap_bps,
            haircut_bps,
            weight_bps,
        });
    }

    /// Update caps of an existing sovereign (governance only)
    pub fn update_sovereign(&mut self, code: String, util_cap_bps: u32, haircut_bps: u32, weight_bps: u32) {
        self.require(ROLE_GOVERNANCE);
        self.validate_sovereign(&code, util_cap_bps, haircut_bps, weight_bps);
        let mut config = self.sovereign_or_revert(&code);
        config.util_cap_bps = util_cap_bps;
        config.haircut_bps = haircut_bps;
        config.weight_bps = weight_bps;
        self.sovereigns.set(&code, config);
        self.env().emit_event(SovereignUpdated {
            code,
            util_cap_bps,
            haircut_bps,
            weight_bps,
        });
    }

    /// Enable or disable a sovereign (governance only)
    pub fn set_sovereign_enabled(&mut self, code: String, enabled: bool) {
        self.require(ROLE_GOVERNANCE);
        let mut config = self.sovereign_or_revert(&code);
        config.enabled = enabled;
        self.sovereigns.set(&code, config);
        self.env().emit_event(SovereignEnabledSet { code, enabled });
    }

    pub fn get_sovereign(&self, code: String) -> Option<SovereignConfig> {
        self.sovereigns.get(&code)
    }

    pub fn sovereign_count(&self) -> u32 {
        self.sovereign_count.get().unwrap_or(0)
    }

    pub fn sovereign_code_at(&self, index: u32) -> Option<String> {
        self.sovereign_codes.get(&index)
    }

    /// All sovereign codes in insertion order
    pub fn get_sovereign_codes(&self) -> Vec<String> {
        (0..self.sovereign_count())
            .filter_map(|i| self.sovereign_codes.get(&i))
            .collect()
    }

    /// Soft cap of a sovereign, 0 if unknown
    pub fn effective_capacity_bps(&self, code: String) -> u32 {
        self.sovereigns
            .get(&code)
            .map(|s| effective_capacity_bps(s.util_cap_bps, s.haircut_bps))
            .unwrap_or(0)
    }

    // ========== Aggregate Views ==========

    pub fn get_issuance_params(&self) -> IssuanceParams {
        let level = self.get_emergency_level();
        IssuanceParams {
            level,
            max_tail_correlation_ppm: self.param_u32(ParamKey::MaxTailCorrelationPpm),
            throttle_bps: self.throttle_bps(level),
        }
    }

    pub fn get_redemption_params(&self) -> RedemptionParams {
        RedemptionParams {
            per_tx_limit: self.get_param(ParamKey::InstantPerTxLimit),
            daily_cap: self.get_param(ParamKey::InstantDailyCap),
            fee_bps: self.param_u32(ParamKey::InstantFeeBps),
        }
    }

    /// Bounds fixed by the current emergency level
    pub fn get_level_params(&self) -> LevelParams {
        let level = self.get_emergency_level();
        let (buffer_key, band_key) = match level {
            EmergencyLevel::Normal => (ParamKey::BufferTargetNormalBps, ParamKey::PriceBandNormalBps),
            EmergencyLevel::Yellow => (ParamKey::BufferTargetYellowBps, ParamKey::PriceBandYellowBps),
            EmergencyLevel::Orange => (ParamKey::BufferTargetOrangeBps, ParamKey::PriceBandOrangeBps),
            EmergencyLevel::Red => (ParamKey::BufferTargetRedBps, ParamKey::PriceBandRedBps),
        };
        LevelParams {
            level,
            buffer_target_bps: self.param_u32(buffer_key),
            issuance_throttle_bps: self.throttle_bps(level),
            price_band_bps: self.param_u32(band_key),
        }
    }

    pub fn get_priority_params(&self) -> PriorityParams {
        PriorityParams {
            risk_weight_bps: self.param_u32(ParamKey::RiskWeightBps),
            age_weight_bps: self.param_u32(ParamKey::AgeWeightBps),
            size_weight_bps: self.param_u32(ParamKey::SizeWeightBps),
            min_age_sec: self.get_param(ParamKey::PriorityMinAgeSec).as_u64(),
            size_threshold: self.get_param(ParamKey::PrioritySizeThreshold),
        }
    }

    /// Whether a quoted price (bps of NAV) lies inside the current level's band
    pub fn lane_pretrade_check(&self, price_bps: u32) -> bool {
        let band = self.get_level_params().price_band_bps;
        within_band(price_bps, band)
    }

    // ========== Internal Functions ==========

    fn throttle_bps(&self, level: EmergencyLevel) -> u32 {
        match level {
            EmergencyLevel::Normal => self.param_u32(ParamKey::IssuanceThrottleNormalBps),
            EmergencyLevel::Yellow => self.param_u32(ParamKey::IssuanceThrottleYellowBps),
            EmergencyLevel::Orange => self.param_u32(ParamKey::IssuanceThrottleOrangeBps),
            EmergencyLevel::Red => 0,
        }
    }

    /// Read a bps/ppm-bounded parameter; bounds guarantee it fits in u32
    fn param_u32(&self, key: ParamKey) -> u32 {
        self.get_param(key).as_u32()
    }

    fn validate_sovereign(&self, code: &str, util_cap_bps: u32, haircut_bps: u32, weight_bps: u32) {
        if code.is_empty() {
            self.env().revert(SstError::InvalidConfig);
        }
        if util_cap_bps > BPS_SCALE || haircut_bps > BPS_SCALE || weight_bps > BPS_SCALE {
            self.env().revert(SstError::BpsOutOfRange);
        }
    }

    fn sovereign_or_revert(&self, code: &String) -> SovereignConfig {
        match self.sovereigns.get(code) {
            Some(config) => config,
            None => self.env().revert(SstError::UnknownSovereign),
        }
    }

    fn require(&self, role_id: u8) {
        let access_control = match self.access_control.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        };
        require_role(&self.env(), access_control, role_id);
    }

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / 1000
    }
}

/// `|price - 10000| <= band`
pub fn within_band(price_bps: u32, band_bps: u32) -> bool {
    price_bps.abs_diff(BPS_SCALE) <= band_bps
}
