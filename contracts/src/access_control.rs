//! Access Control Contract
//!
//! Capability store for the engine. Every other contract asks this one
//! whether its caller holds the role an entry point requires.
//!
//! Roles:
//! - ADMIN grants and revokes every role
//! - GOVERNANCE sets parameters, sovereigns and the detachment band
//! - EMERGENCY sets the emergency level and fires risk triggers
//! - ORACLE_RELAYER submits quorum-signed NAV updates
//! - EMERGENCY_SIGNER sets the emergency NAV override
//! - OPERATOR mints and finalizes redemption windows
//! - TREASURY reports buffer balances
//! - PROTOCOL is held by engine contracts calling each other

use odra::prelude::*;
use odra::casper_types::{runtime_args, RuntimeArgs};
use odra::CallDef;
use crate::errors::SstError;
use crate::events::{RoleGranted, RoleRevoked};

pub const ROLE_ADMIN: u8 = 0;
pub const ROLE_GOVERNANCE: u8 = 1;
pub const ROLE_EMERGENCY: u8 = 2;
pub const ROLE_ORACLE_RELAYER: u8 = 3;
pub const ROLE_EMERGENCY_SIGNER: u8 = 4;
pub const ROLE_OPERATOR: u8 = 5;
pub const ROLE_TREASURY: u8 = 6;
pub const ROLE_PROTOCOL: u8 = 7;

/// Number of defined roles
pub const ROLE_COUNT: u8 = 8;

/// Access Control Contract
#[odra::module(events = [RoleGranted, RoleRevoked])]
pub struct AccessControl {
    /// Role assignments: (role, account) -> bool
    roles: Mapping<(u8, Address), bool>,
    /// Number of accounts with each role
    role_count: Mapping<u8, u32>,
    /// Whether the contract is initialized
    initialized: Var<bool>,
}

#[odra::module]
impl AccessControl {
    /// Initialize access control with initial admin
    pub fn init(&mut self, initial_admin: Address) {
        if self.initialized.get().unwrap_or(false) {
            self.env().revert(SstError::InvalidConfig);
        }
        self.set_role_internal(ROLE_ADMIN, initial_admin, true);
        self.initialized.set(true);
    }

    // ========== Role Query Functions ==========

    /// Check if account has a specific role
    pub fn has_role(&self, role_id: u8, account: Address) -> bool {
        self.roles.get(&(role_id, account)).unwrap_or(false)
    }

    /// Get the number of accounts with a role
    pub fn get_role_member_count(&self, role_id: u8) -> u32 {
        self.role_count.get(&role_id).unwrap_or(0)
    }

    // ========== Role Management Functions ==========

    /// Grant a role to an account (admin only)
    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.require_admin();
        if role_id >= ROLE_COUNT {
            self.env().revert(SstError::InvalidConfig);
        }
        if self.has_role(role_id, account) {
            return;
        }
        self.set_role_internal(role_id, account, true);
        self.env().emit_event(RoleGranted {
            role_id,
            account,
            by: self.env().caller(),
        });
    }

    /// Revoke a role from an account (admin only)
    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.require_admin();
        if !self.has_role(role_id, account) {
            return;
        }
        self.require_not_last_admin(role_id);
        self.set_role_internal(role_id, account, false);
        self.env().emit_event(RoleRevoked {
            role_id,
            account,
            by: self.env().caller(),
        });
    }

    /// Renounce a role (caller gives up their own role)
    pub fn renounce_role(&mut self, role_id: u8) {
        let caller = self.env().caller();
        if !self.has_role(role_id, caller) {
            return;
        }
        self.require_not_last_admin(role_id);
        self.set_role_internal(role_id, caller, false);
        self.env().emit_event(RoleRevoked {
            role_id,
            account: caller,
            by: caller,
        });
    }

    // ========== Internal Functions ==========

    fn set_role_internal(&mut self, role_id: u8, account: Address, value: bool) {
        let had_role = self.roles.get(&(role_id, account)).unwrap_or(false);

        self.roles.set(&(role_id, account), value);

        let current_count = self.role_count.get(&role_id).unwrap_or(0);
        if value && !had_role {
            self.role_count.set(&role_id, current_count + 1);
        } else if !value && had_role && current_count > 0 {
            self.role_count.set(&role_id, current_count - 1);
        }
    }

    fn require_admin(&self) {
        if !self.has_role(ROLE_ADMIN, self.env().caller()) {
            self.env().revert(SstError::Unauthorized);
        }
    }

    fn require_not_last_admin(&self, role_id: u8) {
        if role_id == ROLE_ADMIN && self.get_role_member_count(ROLE_ADMIN) <= 1 {
            self.env().revert(SstError::LastAdmin);
        }
    }
}

/// Revert with `Unauthorized` unless the current caller holds `role_id`
/// in the access control contract at `access_control`.
pub fn require_role(env: &odra::ContractEnv, access_control: Address, role_id: u8) {
    let caller = env.caller();
    let args = runtime_args! {
        "role_id" => role_id,
        "account" => caller,
    };
    let call_def = CallDef::new("has_role", false, args);
    let allowed: bool = env.call_contract(access_control, call_def);
    if !allowed {
        env.revert(SstError::Unauthorized);
    }
}
