//! Tranche Manager Contract
//!
//! State machine over the detachment band (leverage of the super-senior
//! tranche):
//! - Raise: strictly increasing, discrete steps, minimum spacing, opens a
//!   ratification window; an unratified raise reads as reverted once its
//!   deadline passes
//! - Lower: strictly decreasing, only after the cooldown since the last
//!   raise and with nothing pending
//! - Emergency soft-cap expansion: RED + sovereign guarantee + attestation
//!   quorum, time-boxed
//! - Trigger nudges from the issuance controller
//! - Risk inputs (APY components) read by the redemption queue
//!
//! Every governance mutation requires a usable NAV.

use odra::prelude::*;
use odra::casper_types::RuntimeArgs;
use odra::CallDef;
use crate::access_control::{require_role, ROLE_EMERGENCY, ROLE_GOVERNANCE, ROLE_PROTOCOL};
use crate::errors::SstError;
use crate::events::{
    DetachmentLowered, DetachmentNudged, DetachmentRaiseVoided, DetachmentRaised,
    DetachmentRatified, ExpansionActivated, ExpansionAttested, SovereignGuaranteeSet,
};
use crate::math::{BPS_SCALE, SECONDS_PER_DAY};
use crate::types::{DetachmentStatus, EmergencyLevel, NavStatus};

/// Detachment band configuration
#[odra::odra_type]
pub struct TrancheConfig {
    pub min_detachment_bps: u32,
    pub max_detachment_bps: u32,
    /// Raises and lowers move in multiples of this
    pub step_bps: u32,
    /// Minimum time between two raises
    pub min_raise_spacing_seconds: u64,
    /// Ratification window opened by a raise
    pub ratify_window_seconds: u64,
    /// Governance votes needed to ratify
    pub ratify_quorum: u32,
    /// Time after the last raise before a lower is allowed
    pub lower_cooldown_seconds: u64,
    /// Ceiling of the emergency expansion
    pub emergency_soft_cap_bps: u32,
    /// Lifetime of an activated expansion
    pub expansion_window_seconds: u64,
    /// Governance attestations needed to activate an expansion
    pub expansion_attestation_threshold: u32,
    /// Whether a degraded (but not emergency) NAV is good enough to mutate the band
    pub allow_degraded_nav: bool,
}

impl Default for TrancheConfig {
    fn default() -> Self {
        Self {
            min_detachment_bps: 10_000,
            max_detachment_bps: 10_300,
            step_bps: 100,
            min_raise_spacing_seconds: SECONDS_PER_DAY,
            ratify_window_seconds: SECONDS_PER_DAY,
            ratify_quorum: 1,
            lower_cooldown_seconds: 7 * SECONDS_PER_DAY,
            emergency_soft_cap_bps: 10_500,
            expansion_window_seconds: 14 * SECONDS_PER_DAY,
            expansion_attestation_threshold: 2,
            allow_degraded_nav: false,
        }
    }
}

impl TrancheConfig {
    pub fn is_valid(&self) -> bool {
        self.min_detachment_bps <= self.max_detachment_bps
            && self.step_bps > 0
            && self.ratify_quorum > 0
            && self.ratify_window_seconds > 0
            && self.emergency_soft_cap_bps >= self.max_detachment_bps
            && self.expansion_attestation_threshold > 0
            && self.expansion_window_seconds > 0
    }

    /// Move from `from` to `to` is a whole number of steps inside the band
    pub fn is_valid_move(&self, from: u32, to: u32) -> bool {
        to >= self.min_detachment_bps
            && to <= self.max_detachment_bps
            && from.abs_diff(to) % self.step_bps == 0
    }
}

/// Detachment a reader should see, and whether a pending raise has lapsed
pub fn resolve_detachment(current: u32, prior: u32, pending_until: u64, now: u64) -> (u32, bool) {
    if pending_until != 0 && now > pending_until {
        (prior, true)
    } else {
        (current, false)
    }
}

/// Tranche Manager Contract
#[odra::module(events = [
    DetachmentRaised,
    DetachmentRatified,
    DetachmentRaiseVoided,
    DetachmentLowered,
    DetachmentNudged,
    SovereignGuaranteeSet,
    ExpansionAttested,
    ExpansionActivated
])]
pub struct TrancheManager {
    /// Access control contract address
    access_control: Var<Address>,
    /// Config registry contract address
    config_registry: Var<Address>,
    /// NAV oracle contract address
    nav_oracle: Var<Address>,
    /// Band configuration
    config: Var<TrancheConfig>,
    /// Stored detachment, including an unratified raise
    detachment_bps: Var<u32>,
    /// Value restored if the pending raise is voided
    prior_bps: Var<u32>,
    /// Ratification deadline, 0 when nothing is pending
    pending_ratify_until: Var<u64>,
    last_raise_ts: Var<u64>,
    /// Incremented on every raise; scopes ratification votes
    raise_id: Var<u64>,
    ratify_votes: Mapping<(u64, Address), bool>,
    ratify_vote_count: Var<u32>,
    /// Set by the emergency committee once the sovereign guarantee is confirmed
    sovereign_guarantee_confirmed: Var<bool>,
    /// Current attestation round; bumped after each activation
    expansion_round: Var<u64>,
    /// (round, target, attestor) -> attested
    expansion_attestations: Mapping<(u64, u32, Address), bool>,
    /// (round, target) -> attestations; each target is tallied on its own
    expansion_attestation_counts: Mapping<(u64, u32), u32>,
    /// Active expansion target, 0 when inactive
    expansion_bps: Var<u32>,
    expansion_until: Var<u64>,
    /// Risk inputs, bps
    base_apy_bps: Var<u32>,
    risk_adjustment_bps: Var<u32>,
    max_apy_bps: Var<u32>,
}

#[odra::module]
impl TrancheManager {
    /// Initialize the band at `initial_detachment_bps`
    pub fn init(
        &mut self,
        access_control: Address,
        config_registry: Address,
        nav_oracle: Address,
        initial_detachment_bps: u32,
    ) {
        let config = TrancheConfig::default();
        if initial_detachment_bps < config.min_detachment_bps
            || initial_detachment_bps > config.max_detachment_bps
        {
            self.env().revert(SstError::InvalidDetachment);
        }
        self.access_control.set(access_control);
        self.config_registry.set(config_registry);
        self.nav_oracle.set(nav_oracle);
        self.config.set(config);
        self.detachment_bps.set(initial_detachment_bps);
        self.prior_bps.set(initial_detachment_bps);
        self.pending_ratify_until.set(0);
        self.last_raise_ts.set(0);
        self.raise_id.set(0);
        self.ratify_vote_count.set(0);
        self.sovereign_guarantee_confirmed.set(false);
        self.expansion_round.set(0);
        self.expansion_bps.set(0);
        self.expansion_until.set(0);
        self.base_apy_bps.set(0);
        self.risk_adjustment_bps.set(0);
        self.max_apy_bps.set(0);
    }

    // ========== Raise / Ratify / Lower ==========

    /// Raise the detachment and open a ratification window (governance only)
    pub fn raise_detachment(&mut self, new_bps: u32) {
        self.require(ROLE_GOVERNANCE);
        self.require_usable_nav();
        self.settle_if_expired();

        if self.pending_ratify_until.get().unwrap_or(0) != 0 {
            self.env().revert(SstError::PendingRatification);
        }

        let config = self.get_config();
        let current = self.detachment_bps.get().unwrap_or(config.min_detachment_bps);
        if new_bps <= current || !config.is_valid_move(current, new_bps) {
            self.env().revert(SstError::InvalidDetachment);
        }

        let now = self.now_secs();
        let last_raise = self.last_raise_ts.get().unwrap_or(0);
        if last_raise != 0 && now < last_raise + config.min_raise_spacing_seconds {
            self.env().revert(SstError::RaiseTooSoon);
        }

        let ratify_until = now + config.ratify_window_seconds;
        self.prior_bps.set(current);
        self.detachment_bps.set(new_bps);
        self.pending_ratify_until.set(ratify_until);
        self.last_raise_ts.set(now);
        self.raise_id.set(self.raise_id.get().unwrap_or(0) + 1);
        self.ratify_vote_count.set(0);

        self.env().emit_event(DetachmentRaised {
            from_bps: current,
            to_bps: new_bps,
            ratify_until,
        });
    }

    /// Vote to ratify the pending raise (governance only)
    pub fn ratify_detachment(&mut self) {
        self.require(ROLE_GOVERNANCE);
        self.require_usable_nav();

        let pending_until = self.pending_ratify_until.get().unwrap_or(0);
        if pending_until == 0 {
            self.env().revert(SstError::NoPendingRatification);
        }
        if self.now_secs() > pending_until {
            self.env().revert(SstError::RatificationExpired);
        }

        let voter = self.env().caller();
        let raise_id = self.raise_id.get().unwrap_or(0);
        if self.ratify_votes.get(&(raise_id, voter)).unwrap_or(false) {
            self.env().revert(SstError::AlreadyVoted);
        }
        self.ratify_votes.set(&(raise_id, voter), true);
        let votes = self.ratify_vote_count.get().unwrap_or(0) + 1;
        self.ratify_vote_count.set(votes);

        if votes >= self.get_config().ratify_quorum {
            let detachment_bps = self.detachment_bps.get().unwrap_or(0);
            self.prior_bps.set(detachment_bps);
            self.pending_ratify_until.set(0);
            self.env().emit_event(DetachmentRatified {
                detachment_bps,
                votes,
            });
        }
    }

    /// Lower the detachment after the cooldown (governance only)
    pub fn lower_detachment(&mut self, new_bps: u32) {
        self.require(ROLE_GOVERNANCE);
        self.require_usable_nav();
        self.settle_if_expired();

        if self.pending_ratify_until.get().unwrap_or(0) != 0 {
            self.env().revert(SstError::PendingRatification);
        }

        let config = self.get_config();
        let current = self.detachment_bps.get().unwrap_or(config.min_detachment_bps);
        if new_bps >= current || !config.is_valid_move(current, new_bps) {
            self.env().revert(SstError::InvalidDetachment);
        }

        let last_raise = self.last_raise_ts.get().unwrap_or(0);
        if last_raise != 0 && self.now_secs() < last_raise + config.lower_cooldown_seconds {
            self.env().revert(SstError::CooldownActive);
        }

        self.detachment_bps.set(new_bps);
        self.prior_bps.set(new_bps);
        self.env().emit_event(DetachmentLowered {
            from_bps: current,
            to_bps: new_bps,
        });
    }

    /// Persist the void of a lapsed raise. Returns whether one was voided.
    pub fn settle_expired_raise(&mut self) -> bool {
        self.settle_if_expired()
    }

    // ========== Trigger Nudge ==========

    /// Tighten the band by `increment_bps`, bounded by the band max (protocol only).
    /// Moves the fallback value too, so voiding a raise keeps the nudge.
    pub fn apply_trigger_nudge(&mut self, increment_bps: u32) -> u32 {
        self.require(ROLE_PROTOCOL);
        let config = self.get_config();
        let current = self.detachment_bps.get().unwrap_or(config.min_detachment_bps);
        let prior = self.prior_bps.get().unwrap_or(current);

        let nudged = current.saturating_add(increment_bps).min(config.max_detachment_bps).max(current);
        let nudged_prior = prior.saturating_add(increment_bps).min(config.max_detachment_bps).max(prior);
        self.detachment_bps.set(nudged);
        self.prior_bps.set(nudged_prior);

        if nudged != current {
            self.env().emit_event(DetachmentNudged {
                from_bps: current,
                to_bps: nudged,
            });
        }
        nudged
    }

    // ========== Emergency Expansion ==========

    /// Record whether the sovereign guarantee has been confirmed (emergency only)
    pub fn confirm_sovereign_guarantee(&mut self, confirmed: bool) {
        self.require(ROLE_EMERGENCY);
        self.sovereign_guarantee_confirmed.set(confirmed);
        self.env().emit_event(SovereignGuaranteeSet { confirmed });
    }

    /// Attest an emergency expansion to `target_bps` (governance only).
    /// Activates once the attestation threshold is met; expires on its own.
    pub fn attest_expansion(&mut self, target_bps: u32) {
        self.require(ROLE_GOVERNANCE);
        self.require_usable_nav();

        if self.get_emergency_level() != EmergencyLevel::Red
            || !self.sovereign_guarantee_confirmed.get().unwrap_or(false)
        {
            self.env().revert(SstError::ExpansionNotAllowed);
        }

        let config = self.get_config();
        let base = self.base_detachment();
        if target_bps <= base || target_bps > config.emergency_soft_cap_bps {
            self.env().revert(SstError::InvalidDetachment);
        }

        let round = self.expansion_round.get().unwrap_or(0);
        let attestor = self.env().caller();
        if self
            .expansion_attestations
            .get(&(round, target_bps, attestor))
            .unwrap_or(false)
        {
            self.env().revert(SstError::AlreadyVoted);
        }
        self.expansion_attestations
            .set(&(round, target_bps, attestor), true);
        let attestations = self
            .expansion_attestation_counts
            .get(&(round, target_bps))
            .unwrap_or(0)
            + 1;
        self.expansion_attestation_counts
            .set(&(round, target_bps), attestations);

        self.env().emit_event(ExpansionAttested {
            round,
            target_bps,
            attestor,
            attestations,
        });

        if attestations >= config.expansion_attestation_threshold {
            let expires_at = self.now_secs() + config.expansion_window_seconds;
            self.expansion_bps.set(target_bps);
            self.expansion_until.set(expires_at);
            // Renewal needs a fresh round
            self.expansion_round.set(round + 1);
            self.env().emit_event(ExpansionActivated {
                round,
                target_bps,
                expires_at,
            });
        }
    }

    pub fn is_sovereign_guarantee_confirmed(&self) -> bool {
        self.sovereign_guarantee_confirmed.get().unwrap_or(false)
    }

    // ========== Views ==========

    /// Band as readers should see it: a lapsed raise reads as voided and an
    /// active expansion lifts the effective value.
    pub fn get_detachment_status(&self) -> DetachmentStatus {
        let now = self.now_secs();
        let current = self.detachment_bps.get().unwrap_or(0);
        let prior = self.prior_bps.get().unwrap_or(current);
        let pending_until = self.pending_ratify_until.get().unwrap_or(0);
        let (resolved, raise_expired) = resolve_detachment(current, prior, pending_until, now);

        let expansion_until = self.expansion_until.get().unwrap_or(0);
        let expansion_bps = if now < expansion_until {
            self.expansion_bps.get().unwrap_or(0)
        } else {
            0
        };

        DetachmentStatus {
            detachment_bps: resolved.max(expansion_bps),
            prior_bps: prior,
            pending_ratify_until: pending_until,
            raise_expired,
            last_raise_ts: self.last_raise_ts.get().unwrap_or(0),
            expansion_bps,
            expansion_until: if expansion_bps == 0 { 0 } else { expansion_until },
        }
    }

    /// Effective detachment in bps
    pub fn get_detachment_bps(&self) -> u32 {
        self.get_detachment_status().detachment_bps
    }

    // ========== Risk Inputs ==========

    /// Set APY components used for redemption priority (governance only)
    pub fn set_risk_params(&mut self, base_apy_bps: u32, risk_adjustment_bps: u32, max_apy_bps: u32) {
        self.require(ROLE_GOVERNANCE);
        if base_apy_bps > BPS_SCALE || risk_adjustment_bps > BPS_SCALE || max_apy_bps > BPS_SCALE {
            self.env().revert(SstError::BpsOutOfRange);
        }
        self.base_apy_bps.set(base_apy_bps);
        self.risk_adjustment_bps.set(risk_adjustment_bps);
        self.max_apy_bps.set(max_apy_bps);
    }

    /// `min(base + risk adjustment, max)`
    pub fn effective_apy_bps(&self) -> u32 {
        let base = self.base_apy_bps.get().unwrap_or(0);
        let adjustment = self.risk_adjustment_bps.get().unwrap_or(0);
        (base + adjustment).min(self.max_apy_bps.get().unwrap_or(0))
    }

    /// (risk adjustment, max APY) in bps
    pub fn get_risk_inputs(&self) -> (u32, u32) {
        (
            self.risk_adjustment_bps.get().unwrap_or(0),
            self.max_apy_bps.get().unwrap_or(0),
        )
    }

    // ========== Configuration Functions ==========

    pub fn get_config(&self) -> TrancheConfig {
        self.config.get().unwrap_or_default()
    }

    /// Update band configuration (governance only)
    pub fn set_config(&mut self, config: TrancheConfig) {
        self.require(ROLE_GOVERNANCE);
        if !config.is_valid() {
            self.env().revert(SstError::InvalidConfig);
        }
        self.config.set(config);
    }

    // ========== Internal Functions ==========

    /// Detachment with a lapsed raise voided, ignoring any expansion
    fn base_detachment(&self) -> u32 {
        let current = self.detachment_bps.get().unwrap_or(0);
        let prior = self.prior_bps.get().unwrap_or(current);
        let pending_until = self.pending_ratify_until.get().unwrap_or(0);
        resolve_detachment(current, prior, pending_until, self.now_secs()).0
    }

    fn settle_if_expired(&mut self) -> bool {
        let current = self.detachment_bps.get().unwrap_or(0);
        let prior = self.prior_bps.get().unwrap_or(current);
        let pending_until = self.pending_ratify_until.get().unwrap_or(0);
        let (_, expired) = resolve_detachment(current, prior, pending_until, self.now_secs());
        if !expired {
            return false;
        }
        self.detachment_bps.set(prior);
        self.pending_ratify_until.set(0);
        self.ratify_vote_count.set(0);
        self.env().emit_event(DetachmentRaiseVoided {
            voided_bps: current,
            restored_bps: prior,
        });
        true
    }

    /// Revert with `OracleStale` unless the NAV can be trusted for band changes
    fn require_usable_nav(&self) {
        let oracle = match self.nav_oracle.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        };
        let call_def = CallDef::new("get_nav_status", false, RuntimeArgs::new());
        let status: NavStatus = self.env().call_contract(oracle, call_def);
        let usable = match status {
            NavStatus::Fresh | NavStatus::EmergencyOverride => true,
            NavStatus::Degraded1 | NavStatus::Degraded2 | NavStatus::Degraded3 => {
                self.get_config().allow_degraded_nav
            }
            NavStatus::Uninitialized => false,
        };
        if !usable {
            self.env().revert(SstError::OracleStale);
        }
    }

    fn get_emergency_level(&self) -> EmergencyLevel {
        let registry = match self.config_registry.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        };
        let call_def = CallDef::new("get_emergency_level", false, RuntimeArgs::new());
        self.env().call_contract(registry, call_def)
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
