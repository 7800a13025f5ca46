//! NAV Oracle Contract
//!
//! Quorum-signed NAV feed for the super-senior token.
//! Implements:
//! - M-of-N signature verification over a canonical, versioned message
//! - Replay protection (strictly increasing timestamp and nonce)
//! - Bounded NAV jumps between consecutive accepted values
//! - Tiered haircut on reads when the feed goes stale
//! - Emergency NAV override under a separate signer capability
//! - Atomic signer set / quorum rotation

use odra::prelude::*;
use odra::casper_types::bytesrepr::{Bytes, ToBytes};
use odra::casper_types::{PublicKey, U256};
use crate::access_control::{
    require_role, ROLE_EMERGENCY_SIGNER, ROLE_GOVERNANCE, ROLE_ORACLE_RELAYER,
};
use crate::errors::SstError;
use crate::events::{EmergencyNavCleared, EmergencyNavSet, NavUpdated, SignersRotated};
use crate::math::{apply_haircut, nav_within_jump, BPS_SCALE};
use crate::types::{NavQuote, NavRecord, NavSignature, NavStatus};

/// Domain tag of the signed NAV message
pub const NAV_MESSAGE_DOMAIN: &[u8] = b"SST:NAV-ORACLE";

/// Encoding version of the signed NAV message
pub const NAV_MESSAGE_VERSION: u8 = 1;

/// Default maximum age of a submitted NAV in seconds (1 hour)
const DEFAULT_MAX_AGE_SECONDS: u64 = 3600;

/// Default maximum move between consecutive NAVs (5% = 500 bps)
const DEFAULT_MAX_JUMP_BPS: u32 = 500;

/// Oracle configuration
#[odra::odra_type]
pub struct OracleConfig {
    /// Submissions older than this are rejected
    pub max_age_seconds: u64,
    /// Maximum move from the previous accepted NAV in bps
    pub max_jump_bps: u32,
    /// Age after which tier-1 haircut applies
    pub tier1_after_seconds: u64,
    pub tier1_haircut_bps: u32,
    /// Age after which tier-2 haircut applies
    pub tier2_after_seconds: u64,
    pub tier2_haircut_bps: u32,
    /// Age after which tier-3 haircut applies
    pub tier3_after_seconds: u64,
    pub tier3_haircut_bps: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            max_jump_bps: DEFAULT_MAX_JUMP_BPS,
            tier1_after_seconds: 3600,
            tier1_haircut_bps: 200,
            tier2_after_seconds: 6 * 3600,
            tier2_haircut_bps: 500,
            tier3_after_seconds: 24 * 3600,
            tier3_haircut_bps: 1000,
        }
    }
}

impl OracleConfig {
    /// Tiers must be strictly increasing in age and non-decreasing in haircut
    pub fn is_valid(&self) -> bool {
        self.max_age_seconds > 0
            && self.max_jump_bps <= BPS_SCALE
            && self.tier1_after_seconds < self.tier2_after_seconds
            && self.tier2_after_seconds < self.tier3_after_seconds
            && self.tier1_haircut_bps <= self.tier2_haircut_bps
            && self.tier2_haircut_bps <= self.tier3_haircut_bps
            && self.tier3_haircut_bps <= BPS_SCALE
    }

    /// Status and haircut for a NAV of the given age
    pub fn degradation(&self, age_seconds: u64) -> (NavStatus, u32) {
        if age_seconds > self.tier3_after_seconds {
            (NavStatus::Degraded3, self.tier3_haircut_bps)
        } else if age_seconds > self.tier2_after_seconds {
            (NavStatus::Degraded2, self.tier2_haircut_bps)
        } else if age_seconds > self.tier1_after_seconds {
            (NavStatus::Degraded1, self.tier1_haircut_bps)
        } else {
            (NavStatus::Fresh, 0)
        }
    }
}

/// Canonical message signed by NAV signers:
/// domain ‖ version ‖ oracle ‖ value (32B BE) ‖ timestamp (8B BE) ‖ model hash
pub fn canonical_nav_message(
    oracle: &Address,
    value_ray: U256,
    timestamp_sec: u64,
    model_hash: &[u8; 32],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(NAV_MESSAGE_DOMAIN.len() + 1 + 33 + 32 + 8 + 32);
    message.extend_from_slice(NAV_MESSAGE_DOMAIN);
    message.push(NAV_MESSAGE_VERSION);
    message.extend_from_slice(&oracle.to_bytes().unwrap_or_default());

    let mut value_be = [0u8; 32];
    value_ray.to_big_endian(&mut value_be);
    message.extend_from_slice(&value_be);

    message.extend_from_slice(&timestamp_sec.to_be_bytes());
    message.extend_from_slice(model_hash);
    message
}

fn has_duplicates(keys: &[PublicKey]) -> bool {
    keys.iter()
        .enumerate()
        .any(|(i, key)| keys[..i].contains(key))
}

/// NAV Oracle Contract
#[odra::module(events = [NavUpdated, EmergencyNavSet, EmergencyNavCleared, SignersRotated])]
pub struct NavOracle {
    /// Access control contract address
    access_control: Var<Address>,
    /// Registered signer set
    signers: Var<Vec<PublicKey>>,
    /// Distinct valid signatures required
    quorum: Var<u32>,
    /// Last quorum-accepted NAV
    record: Var<NavRecord>,
    /// Emergency override value, if active
    emergency_nav: Var<Option<U256>>,
    /// Oracle configuration
    config: Var<OracleConfig>,
}

#[odra::module]
impl NavOracle {
    /// Initialize the oracle with its signer set
    pub fn init(&mut self, access_control: Address, signers: Vec<PublicKey>, quorum: u32) {
        self.validate_signer_set(&signers, quorum);
        self.access_control.set(access_control);
        self.signers.set(signers);
        self.quorum.set(quorum);
        self.emergency_nav.set(None);
        self.config.set(OracleConfig::default());
    }

    // ========== NAV Submission ==========

    /// Accept a quorum-signed NAV (oracle relayer only).
    /// All checks run before any write; a failed check leaves state untouched.
    pub fn submit_nav(
        &mut self,
        value_ray: U256,
        timestamp_sec: u64,
        model_hash: [u8; 32],
        signatures: Vec<NavSignature>,
    ) {
        self.require(ROLE_ORACLE_RELAYER);

        let config = self.get_config();
        let now = self.now_secs();

        if value_ray.is_zero() || timestamp_sec > now {
            self.env().revert(SstError::InvalidNav);
        }

        let previous = self.record.get();
        let last_ts = previous.as_ref().map(|r| r.timestamp_sec).unwrap_or(0);
        if previous.is_some() && timestamp_sec <= last_ts {
            self.env().revert(SstError::StaleOrReplay);
        }
        if timestamp_sec < now.saturating_sub(config.max_age_seconds) {
            self.env().revert(SstError::StaleOrReplay);
        }

        let signer_keys: Vec<PublicKey> = signatures.iter().map(|s| s.signer.clone()).collect();
        if has_duplicates(&signer_keys) {
            self.env().revert(SstError::DuplicateSignature);
        }

        let registered = self.get_signers();
        let message = Bytes::from(canonical_nav_message(
            &self.env().self_address(),
            value_ray,
            timestamp_sec,
            &model_hash,
        ));
        let valid_signatures = signatures
            .iter()
            .filter(|s| registered.contains(&s.signer))
            .filter(|s| self.env().verify_signature(&message, &s.signature, &s.signer))
            .count() as u32;
        if valid_signatures < self.get_quorum() {
            self.env().revert(SstError::QuorumNotMet);
        }

        // No jump bound while an emergency override is active
        let previous_value = if self.is_emergency_active() {
            U256::zero()
        } else {
            previous.as_ref().map(|r| r.value_ray).unwrap_or_default()
        };
        if !nav_within_jump(previous_value, value_ray, config.max_jump_bps) {
            self.env().revert(SstError::NavJumpTooLarge);
        }

        let nonce = previous.map(|r| r.nonce + 1).unwrap_or(1);
        self.record.set(NavRecord {
            value_ray,
            timestamp_sec,
            model_hash,
            nonce,
        });

        self.env().emit_event(NavUpdated {
            value_ray,
            timestamp_sec,
            model_hash,
            nonce,
            valid_signatures,
        });
    }

    // ========== Emergency Override ==========

    /// Substitute an emergency NAV on every read (emergency signer only)
    pub fn set_emergency_nav(&mut self, value_ray: U256) {
        self.require(ROLE_EMERGENCY_SIGNER);
        if value_ray.is_zero() {
            self.env().revert(SstError::InvalidNav);
        }
        self.emergency_nav.set(Some(value_ray));
        self.env().emit_event(EmergencyNavSet {
            value_ray,
            by: self.env().caller(),
        });
    }

    /// Return to quorum-accepted NAV (emergency signer only)
    pub fn clear_emergency_nav(&mut self) {
        self.require(ROLE_EMERGENCY_SIGNER);
        self.emergency_nav.set(None);
        self.env().emit_event(EmergencyNavCleared {
            by: self.env().caller(),
        });
    }

    pub fn is_emergency_active(&self) -> bool {
        self.emergency_nav.get().flatten().is_some()
    }

    // ========== Signer Management ==========

    /// Replace the signer set and quorum atomically (governance only)
    pub fn rotate_signers(&mut self, signers: Vec<PublicKey>, quorum: u32) {
        self.require(ROLE_GOVERNANCE);
        self.validate_signer_set(&signers, quorum);
        let signer_count = signers.len() as u32;
        self.signers.set(signers);
        self.quorum.set(quorum);
        self.env().emit_event(SignersRotated {
            signer_count,
            quorum,
        });
    }

    pub fn get_signers(&self) -> Vec<PublicKey> {
        self.signers.get().unwrap_or_default()
    }

    pub fn get_quorum(&self) -> u32 {
        self.quorum.get().unwrap_or(u32::MAX)
    }

    // ========== Read Path ==========

    /// NAV as pricing consumers should see it
    pub fn get_nav_quote(&self) -> NavQuote {
        let record = self.record.get();
        let raw_value_ray = record.as_ref().map(|r| r.value_ray).unwrap_or_default();
        let nonce = record.as_ref().map(|r| r.nonce).unwrap_or(0);
        let age_sec = record
            .as_ref()
            .map(|r| self.now_secs().saturating_sub(r.timestamp_sec))
            .unwrap_or(0);

        if let Some(emergency) = self.emergency_nav.get().flatten() {
            return NavQuote {
                value_ray: emergency,
                raw_value_ray,
                status: NavStatus::EmergencyOverride,
                haircut_bps: 0,
                age_sec,
                nonce,
            };
        }

        if record.is_none() {
            return NavQuote {
                value_ray: U256::zero(),
                raw_value_ray,
                status: NavStatus::Uninitialized,
                haircut_bps: 0,
                age_sec,
                nonce,
            };
        }

        let (status, haircut_bps) = self.get_config().degradation(age_sec);
        NavQuote {
            value_ray: apply_haircut(raw_value_ray, haircut_bps),
            raw_value_ray,
            status,
            haircut_bps,
            age_sec,
            nonce,
        }
    }

    /// Effective NAV (0 when none is available)
    pub fn latest_nav_ray(&self) -> U256 {
        self.get_nav_quote().value_ray
    }

    pub fn get_nav_status(&self) -> NavStatus {
        self.get_nav_quote().status
    }

    pub fn get_nav_record(&self) -> Option<NavRecord> {
        self.record.get()
    }

    /// Bytes signers must sign for a submission to this oracle
    pub fn nav_message(&self, value_ray: U256, timestamp_sec: u64, model_hash: [u8; 32]) -> Bytes {
        Bytes::from(canonical_nav_message(
            &self.env().self_address(),
            value_ray,
            timestamp_sec,
            &model_hash,
        ))
    }

    // ========== Configuration Functions ==========

    pub fn get_config(&self) -> OracleConfig {
        self.config.get().unwrap_or_default()
    }

    /// Update oracle configuration (governance only)
    pub fn set_config(&mut self, config: OracleConfig) {
        self.require(ROLE_GOVERNANCE);
        if !config.is_valid() {
            self.env().revert(SstError::InvalidConfig);
        }
        self.config.set(config);
    }

    // ========== Internal Functions ==========

    fn validate_signer_set(&self, signers: &[PublicKey], quorum: u32) {
        if quorum == 0 || quorum as usize > signers.len() || has_duplicates(signers) {
            self.env().revert(SstError::InvalidSignerSet);
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
