//! Issuance Controller Contract
//!
//! Admission gate for new super-senior tokens. `can_issue` evaluates, in
//! order and stopping at the first failure:
//! 1. emergency level is not RED
//! 2. issuance is not manually locked
//! 3. no lapsed, unratified detachment raise
//! 4. tail correlation and sovereign capacity (soft/hard cap damping)
//! 5. liquidity buffer is healthy
//! 6. resulting supply stays within the throttled super-senior cap
//!
//! `mint_for` enforces the same gate and records why the mint went through.
//! `adjust_by_triggers` is the automated first response to risk events and
//! only ever tightens.

use odra::prelude::*;
use odra::casper_types::{runtime_args, RuntimeArgs, U256};
use odra::CallDef;
use crate::access_control::{
    require_role, ROLE_EMERGENCY, ROLE_GOVERNANCE, ROLE_OPERATOR,
};
use crate::errors::SstError;
use crate::events::{IssuanceLockSet, MintExecuted, SuperSeniorCapSet, TriggerFired};
use crate::math::{
    apply_bps, effective_capacity_bps, sovereign_allowance, usdc_to_tokens, SovereignAllowance,
    BPS_SCALE,
};
use crate::types::{
    DetachmentStatus, EmergencyLevel, IssuanceDecision, IssuanceParams, IssuanceState,
    RejectReason, SovereignConfig,
};

/// Defaults above this trip the trigger matrix (5%)
pub const TRIGGER_DEFAULTS_BPS: u32 = 500;
/// Sovereign guarantee usage above this trips the trigger matrix (20%)
pub const TRIGGER_SOVEREIGN_USAGE_BPS: u32 = 2_000;
/// Correlation above this trips the trigger matrix (65%)
pub const TRIGGER_CORRELATION_BPS: u32 = 6_500;
/// Cap reduction applied when a trigger fires (10%)
pub const TRIGGER_CAP_CUT_BPS: u32 = 1_000;
/// Detachment increment applied when a trigger fires
pub const TRIGGER_DETACHMENT_NUDGE_BPS: u32 = 100;

/// Whether any risk input crosses its threshold
pub fn triggers_fired(defaults_bps: u32, sovereign_usage_bps: u32, correlation_bps: u32) -> bool {
    defaults_bps > TRIGGER_DEFAULTS_BPS
        || sovereign_usage_bps > TRIGGER_SOVEREIGN_USAGE_BPS
        || correlation_bps > TRIGGER_CORRELATION_BPS
}

/// Everything the admission gate looks at, gathered from the collaborators
#[derive(Debug, Clone)]
pub struct IssuanceInputs {
    pub usdc_amount: U256,
    pub params: IssuanceParams,
    pub locked: bool,
    pub raise_expired: bool,
    pub tail_correlation_ppm: u32,
    pub sovereign: Option<SovereignConfig>,
    pub sovereign_util_bps: u32,
    /// Effective NAV (0 when unavailable)
    pub nav_ray: U256,
    pub buffer_healthy: bool,
    pub total_issued: U256,
    pub super_senior_cap: U256,
}

/// Ordered admission checks; the first failing one names the rejection.
pub fn evaluate_issuance(inputs: &IssuanceInputs) -> IssuanceDecision {
    if inputs.usdc_amount.is_zero() {
        return IssuanceDecision::reject(RejectReason::InvalidAmount);
    }
    if inputs.params.level == EmergencyLevel::Red {
        return IssuanceDecision::reject(RejectReason::EmergencyHalt);
    }
    if inputs.locked {
        return IssuanceDecision::reject(RejectReason::IssuanceLocked);
    }
    if inputs.raise_expired {
        return IssuanceDecision::reject(RejectReason::RatificationExpired);
    }
    if inputs.tail_correlation_ppm > inputs.params.max_tail_correlation_ppm {
        return IssuanceDecision::reject(RejectReason::TailCorrelationTooHigh);
    }

    let sovereign = match &inputs.sovereign {
        Some(sovereign) => sovereign,
        None => return IssuanceDecision::reject(RejectReason::UnknownSovereign),
    };
    if !sovereign.enabled {
        return IssuanceDecision::reject(RejectReason::SovereignDisabled);
    }
    if inputs.sovereign_util_bps > sovereign.util_cap_bps {
        return IssuanceDecision::reject(RejectReason::SovereignHardCapExceeded);
    }

    if inputs.nav_ray.is_zero() {
        return IssuanceDecision::reject(RejectReason::NavUnavailable);
    }
    let tokens = match usdc_to_tokens(inputs.usdc_amount, inputs.nav_ray) {
        Some(tokens) => tokens,
        None => return IssuanceDecision::reject(RejectReason::InvalidAmount),
    };

    let throttled_cap = apply_bps(inputs.super_senior_cap, inputs.params.throttle_bps);
    let headroom = throttled_cap.saturating_sub(inputs.total_issued);
    let soft_cap = effective_capacity_bps(sovereign.util_cap_bps, sovereign.haircut_bps);
    match sovereign_allowance(headroom, inputs.sovereign_util_bps, soft_cap, sovereign.util_cap_bps) {
        SovereignAllowance::HardCapExceeded => {
            return IssuanceDecision::reject(RejectReason::SovereignHardCapExceeded);
        }
        // Damping only binds between soft and hard cap; plain cap overflow is reported below
        SovereignAllowance::Allowed(allowed) if allowed < headroom && tokens > allowed => {
            return IssuanceDecision::reject(RejectReason::SovereignCapacityExceeded);
        }
        SovereignAllowance::Allowed(_) => {}
    }

    if !inputs.buffer_healthy {
        return IssuanceDecision::reject(RejectReason::BufferUnhealthy);
    }
    match inputs.total_issued.checked_add(tokens) {
        Some(issued_after) if issued_after <= throttled_cap => {}
        _ => return IssuanceDecision::reject(RejectReason::CapExceeded),
    }

    IssuanceDecision::accept(tokens)
}

/// Issuance Controller Contract
#[odra::module(events = [MintExecuted, TriggerFired, IssuanceLockSet, SuperSeniorCapSet])]
pub struct IssuanceController {
    /// Access control contract address
    access_control: Var<Address>,
    /// Config registry contract address
    config_registry: Var<Address>,
    /// NAV oracle contract address
    nav_oracle: Var<Address>,
    /// Tranche manager contract address
    tranche_manager: Var<Address>,
    /// Buffer coordinator contract address
    buffer_coordinator: Var<Address>,
    /// Super-senior token contract address
    token: Var<Address>,
    /// Maximum super-senior supply, in tokens
    super_senior_cap: Var<U256>,
    /// Manual issuance lock
    locked: Var<bool>,
    /// Reentrancy guard
    entered: Var<bool>,
    /// USDC funding accepted (all time)
    total_usdc_funded: Var<U256>,
}

#[odra::module]
impl IssuanceController {
    /// Initialize the controller
    pub fn init(
        &mut self,
        access_control: Address,
        config_registry: Address,
        nav_oracle: Address,
        tranche_manager: Address,
        buffer_coordinator: Address,
        token: Address,
        super_senior_cap: U256,
    ) {
        self.access_control.set(access_control);
        self.config_registry.set(config_registry);
        self.nav_oracle.set(nav_oracle);
        self.tranche_manager.set(tranche_manager);
        self.buffer_coordinator.set(buffer_coordinator);
        self.token.set(token);
        self.super_senior_cap.set(super_senior_cap);
        self.locked.set(false);
        self.entered.set(false);
        self.total_usdc_funded.set(U256::zero());
    }

    // ========== Admission Gate ==========

    /// Would a mint of `usdc_amount` be admitted right now?
    pub fn can_issue(
        &self,
        usdc_amount: U256,
        tail_correlation_ppm: u32,
        sovereign_util_bps: u32,
        sovereign_code: String,
    ) -> IssuanceDecision {
        let inputs = self.gather_inputs(usdc_amount, tail_correlation_ppm, sovereign_util_bps, sovereign_code);
        evaluate_issuance(&inputs)
    }

    /// Mint tokens against `usdc_amount` of funding (operator only).
    /// Returns the number of tokens minted.
    pub fn mint_for(
        &mut self,
        to: Address,
        usdc_amount: U256,
        tail_correlation_ppm: u32,
        sovereign_util_bps: u32,
        sovereign_code: String,
    ) -> U256 {
        self.require(ROLE_OPERATOR);
        self.enter();

        let inputs = self.gather_inputs(
            usdc_amount,
            tail_correlation_ppm,
            sovereign_util_bps,
            sovereign_code.clone(),
        );
        let decision = evaluate_issuance(&inputs);
        if let Some(error) = decision.reason.as_error() {
            self.env().revert(error);
        }

        let tokens = decision.tokens;
        let funded = match self.get_total_usdc_funded().checked_add(usdc_amount) {
            Some(funded) => funded,
            None => self.env().revert(SstError::InvalidAmount),
        };
        self.total_usdc_funded.set(funded);

        let mint_args = runtime_args! {
            "to" => to,
            "amount" => tokens,
        };
        let mint_call = CallDef::new("mint", true, mint_args);
        self.env().call_contract::<()>(self.token_address(), mint_call);

        self.env().emit_event(MintExecuted {
            to,
            usdc_amount,
            tokens,
            nav_ray: inputs.nav_ray,
            level: inputs.params.level,
            sovereign_code,
        });

        self.exit();
        tokens
    }

    // ========== Trigger Matrix ==========

    /// Tighten issuance when any risk input crosses its threshold (emergency only).
    /// Returns whether the trigger fired; below-threshold inputs change nothing.
    pub fn adjust_by_triggers(
        &mut self,
        defaults_bps: u32,
        sovereign_usage_bps: u32,
        correlation_bps: u32,
    ) -> bool {
        self.require(ROLE_EMERGENCY);
        if !triggers_fired(defaults_bps, sovereign_usage_bps, correlation_bps) {
            return false;
        }

        let old_cap = self.get_super_senior_cap();
        let new_cap = apply_bps(old_cap, BPS_SCALE - TRIGGER_CAP_CUT_BPS);
        self.super_senior_cap.set(new_cap);

        let nudge_args = runtime_args! {
            "increment_bps" => TRIGGER_DETACHMENT_NUDGE_BPS,
        };
        let nudge_call = CallDef::new("apply_trigger_nudge", true, nudge_args);
        self.env()
            .call_contract::<u32>(self.tranche_address(), nudge_call);

        self.env().emit_event(TriggerFired {
            defaults_bps,
            sovereign_usage_bps,
            correlation_bps,
            old_cap,
            new_cap,
        });
        true
    }

    // ========== Governance Functions ==========

    /// Set the super-senior cap in tokens (governance only)
    pub fn set_super_senior_cap(&mut self, new_cap: U256) {
        self.require(ROLE_GOVERNANCE);
        let old_cap = self.get_super_senior_cap();
        self.super_senior_cap.set(new_cap);
        self.env().emit_event(SuperSeniorCapSet { old_cap, new_cap });
    }

    /// Lock or unlock issuance (emergency only)
    pub fn set_locked(&mut self, locked: bool) {
        self.require(ROLE_EMERGENCY);
        self.locked.set(locked);
        self.env().emit_event(IssuanceLockSet {
            locked,
            by: self.env().caller(),
        });
    }

    // ========== Views ==========

    pub fn get_super_senior_cap(&self) -> U256 {
        self.super_senior_cap.get().unwrap_or_default()
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get().unwrap_or(false)
    }

    pub fn get_total_usdc_funded(&self) -> U256 {
        self.total_usdc_funded.get().unwrap_or_default()
    }

    /// Outstanding supply, which is what counts against the cap
    pub fn total_issued(&self) -> U256 {
        let call_def = CallDef::new("total_supply", false, RuntimeArgs::new());
        self.env().call_contract(self.token_address(), call_def)
    }

    /// Cap after the current emergency level's throttle
    pub fn effective_cap(&self) -> U256 {
        apply_bps(self.get_super_senior_cap(), self.issuance_params().throttle_bps)
    }

    pub fn get_state(&self) -> IssuanceState {
        let detachment = self.detachment_status();
        IssuanceState {
            super_senior_cap: self.get_super_senior_cap(),
            detachment_bps: detachment.detachment_bps,
            last_detachment_raise_ts: detachment.last_raise_ts,
            locked: self.is_locked(),
            pending_ratify_until: detachment.pending_ratify_until,
            total_issued: self.total_issued(),
        }
    }

    // ========== Internal Functions ==========

    fn gather_inputs(
        &self,
        usdc_amount: U256,
        tail_correlation_ppm: u32,
        sovereign_util_bps: u32,
        sovereign_code: String,
    ) -> IssuanceInputs {
        let registry = self.registry_address();
        let sovereign_call = CallDef::new(
            "get_sovereign",
            false,
            runtime_args! { "code" => sovereign_code },
        );
        let sovereign: Option<SovereignConfig> = self.env().call_contract(registry, sovereign_call);

        let nav_call = CallDef::new("latest_nav_ray", false, RuntimeArgs::new());
        let nav_ray: U256 = self.env().call_contract(self.oracle_address(), nav_call);

        let buffer_call = CallDef::new("is_healthy", false, RuntimeArgs::new());
        let buffer_healthy: bool = self.env().call_contract(self.buffer_address(), buffer_call);

        IssuanceInputs {
            usdc_amount,
            params: self.issuance_params(),
            locked: self.is_locked(),
            raise_expired: self.detachment_status().raise_expired,
            tail_correlation_ppm,
            sovereign,
            sovereign_util_bps,
            nav_ray,
            buffer_healthy,
            total_issued: self.total_issued(),
            super_senior_cap: self.get_super_senior_cap(),
        }
    }

    fn issuance_params(&self) -> IssuanceParams {
        let call_def = CallDef::new("get_issuance_params", false, RuntimeArgs::new());
        self.env().call_contract(self.registry_address(), call_def)
    }

    fn detachment_status(&self) -> DetachmentStatus {
        let call_def = CallDef::new("get_detachment_status", false, RuntimeArgs::new());
        self.env().call_contract(self.tranche_address(), call_def)
    }

    fn enter(&mut self) {
        if self.entered.get().unwrap_or(false) {
            self.env().revert(SstError::Reentrancy);
        }
        self.entered.set(true);
    }

    fn exit(&mut self) {
        self.entered.set(false);
    }

    fn registry_address(&self) -> Address {
        match self.config_registry.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        }
    }

    fn oracle_address(&self) -> Address {
        match self.nav_oracle.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        }
    }

    fn tranche_address(&self) -> Address {
        match self.tranche_manager.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        }
    }

    fn buffer_address(&self) -> Address {
        match self.buffer_coordinator.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        }
    }

    fn token_address(&self) -> Address {
        match self.token.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        }
    }

    fn require(&self, role_id: u8) {
        let access_control = match self.access_control.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        };
        require_role(&self.env(), access_control, role_id);
    }
}
