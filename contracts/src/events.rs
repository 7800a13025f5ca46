//! Audit events.
//!
//! Off-chain monitors key on event name and field layout, so these structs
//! are append-only: add fields at the end, never reorder.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::{EmergencyLevel, RedemptionLane};

// ===== Access control =====

#[odra::event]
pub struct RoleGranted {
    pub role_id: u8,
    pub account: Address,
    pub by: Address,
}

#[odra::event]
pub struct RoleRevoked {
    pub role_id: u8,
    pub account: Address,
    pub by: Address,
}

// ===== NAV oracle =====

#[odra::event]
pub struct NavUpdated {
    pub value_ray: U256,
    pub timestamp_sec: u64,
    pub model_hash: [u8; 32],
    pub nonce: u64,
    pub valid_signatures: u32,
}

#[odra::event]
pub struct EmergencyNavSet {
    pub value_ray: U256,
    pub by: Address,
}

#[odra::event]
pub struct EmergencyNavCleared {
    pub by: Address,
}

#[odra::event]
pub struct SignersRotated {
    pub signer_count: u32,
    pub quorum: u32,
}

// ===== Config registry =====

#[odra::event]
pub struct EmergencyLevelChanged {
    pub from: EmergencyLevel,
    pub to: EmergencyLevel,
    pub reason: String,
    pub since_ts: u64,
}

#[odra::event]
pub struct ParamSet {
    pub key: String,
    pub old_value: U256,
    pub new_value: U256,
}

#[odra::event]
pub struct SovereignAdded {
    pub code: String,
    pub util_cap_bps: u32,
    pub haircut_bps: u32,
    pub weight_bps: u32,
}

#[odra::event]
pub struct SovereignUpdated {
    pub code: String,
    pub util_cap_bps: u32,
    pub haircut_bps: u32,
    pub weight_bps: u32,
}

#[odra::event]
pub struct SovereignEnabledSet {
    pub code: String,
    pub enabled: bool,
}

// ===== Tranche manager =====

#[odra::event]
pub struct DetachmentRaised {
    pub from_bps: u32,
    pub to_bps: u32,
    pub ratify_until: u64,
}

#[odra::event]
pub struct DetachmentRatified {
    pub detachment_bps: u32,
    pub votes: u32,
}

#[odra::event]
pub struct DetachmentRaiseVoided {
    pub voided_bps: u32,
    pub restored_bps: u32,
}

#[odra::event]
pub struct DetachmentLowered {
    pub from_bps: u32,
    pub to_bps: u32,
}

#[odra::event]
pub struct DetachmentNudged {
    pub from_bps: u32,
    pub to_bps: u32,
}

#[odra::event]
pub struct SovereignGuaranteeSet {
    pub confirmed: bool,
}

#[odra::event]
pub struct ExpansionAttested {
    pub round: u64,
    pub target_bps: u32,
    pub attestor: Address,
    pub attestations: u32,
}

#[odra::event]
pub struct ExpansionActivated {
    pub round: u64,
    pub target_bps: u32,
    pub expires_at: u64,
}

// ===== Buffer coordinator =====

#[odra::event]
pub struct BalancesSynced {
    pub pre_tranche_balance: U256,
    pub instant_buffer_balance: U256,
}

#[odra::event]
pub struct InstantPayout {
    pub to: Address,
    pub usdc_amount: U256,
    pub remaining_buffer: U256,
}

// ===== Issuance controller =====

#[odra::event]
pub struct TriggerFired {
    pub defaults_bps: u32,
    pub sovereign_usage_bps: u32,
    pub correlation_bps: u32,
    pub old_cap: U256,
    pub new_cap: U256,
}

#[odra::event]
pub struct IssuanceLockSet {
    pub locked: bool,
    pub by: Address,
}

#[odra::event]
pub struct SuperSeniorCapSet {
    pub old_cap: U256,
    pub new_cap: U256,
}

#[odra::event]
pub struct MintExecuted {
    pub to: Address,
    pub usdc_amount: U256,
    pub tokens: U256,
    pub nav_ray: U256,
    pub level: EmergencyLevel,
    pub sovereign_code: String,
}

// ===== Redemption queue =====

#[odra::event]
pub struct RedemptionRouted {
    pub account: Address,
    pub amount_tokens: U256,
    pub lane: RedemptionLane,
}

#[odra::event]
pub struct InstantRedeemed {
    pub account: Address,
    pub amount_tokens: U256,
    pub usdc_paid: U256,
    pub fee_usdc: U256,
    pub day_index: u64,
}

#[odra::event]
pub struct WindowEnqueued {
    pub account: Address,
    pub strike_ts: u64,
    pub amount_tokens: U256,
    pub quoted_usdc: U256,
}

#[odra::event]
pub struct WindowFinalized {
    pub strike_ts: u64,
    pub total_requested: U256,
    pub funds_provided: U256,
    pub settlement_ray: U256,
}

#[odra::event]
pub struct WindowClaimed {
    pub account: Address,
    pub strike_ts: u64,
    pub payout: U256,
}

// ===== Token =====

#[odra::event]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

#[odra::event]
pub struct Mint {
    pub to: Address,
    pub amount: U256,
}

#[odra::event]
pub struct Burn {
    pub from: Address,
    pub amount: U256,
}

#[odra::event]
pub struct MemberSet {
    pub account: Address,
    pub allowed: bool,
}
