//! Buffer Coordinator Contract
//!
//! Aggregates the liquidity layers standing in front of the super-senior
//! tranche:
//! - Pre-tranche (first-loss cash) balance
//! - Instant redemption buffer
//!
//! Balances are reported by the treasury. Health is measured against a
//! target fraction of outstanding supply fixed by the emergency level.
//! Instant-lane payouts are recorded here and may never overdraw the buffer.

use odra::prelude::*;
use odra::casper_types::bytesrepr::FromBytes;
use odra::casper_types::{CLTyped, RuntimeArgs, U256};
use odra::CallDef;
use crate::access_control::{require_role, ROLE_PROTOCOL, ROLE_TREASURY};
use crate::errors::SstError;
use crate::events::{BalancesSynced, InstantPayout};
use crate::math::{apply_bps, ray, tokens_to_usdc};
use crate::types::{BufferSnapshot, LevelParams};

/// USDC target for `supply` tokens at `nav_ray` (par when NAV is unknown)
pub fn buffer_target(supply: U256, nav_ray: U256, target_bps: u32) -> U256 {
    let nav = if nav_ray.is_zero() { ray() } else { nav_ray };
    apply_bps(tokens_to_usdc(supply, nav), target_bps)
}

fn call_view<T: CLTyped + FromBytes>(
    env: &odra::ContractEnv,
    contract: Address,
    entry_point: &str,
    args: RuntimeArgs,
) -> T {
    env.call_contract(contract, CallDef::new(entry_point, false, args))
}

/// Buffer Coordinator Contract
#[odra::module(events = [BalancesSynced, InstantPayout])]
pub struct BufferCoordinator {
    /// Access control contract address
    access_control: Var<Address>,
    /// Config registry contract address
    config_registry: Var<Address>,
    /// NAV oracle contract address
    nav_oracle: Var<Address>,
    /// Super-senior token contract address
    token: Var<Address>,
    /// Pre-tranche balance, USDC units
    pre_tranche_balance: Var<U256>,
    /// Instant buffer balance, USDC units
    instant_buffer_balance: Var<U256>,
    /// Total paid out through the instant lane (all time)
    total_instant_paid: Var<U256>,
}

#[odra::module]
impl BufferCoordinator {
    /// Initialize the coordinator with empty balances
    pub fn init(
        &mut self,
        access_control: Address,
        config_registry: Address,
        nav_oracle: Address,
        token: Address,
    ) {
        self.access_control.set(access_control);
        self.config_registry.set(config_registry);
        self.nav_oracle.set(nav_oracle);
        self.token.set(token);
        self.pre_tranche_balance.set(U256::zero());
        self.instant_buffer_balance.set(U256::zero());
        self.total_instant_paid.set(U256::zero());
    }

    // ========== Balance Reporting (Treasury Only) ==========

    /// Report live balances of both layers
    pub fn sync_balances(&mut self, pre_tranche_balance: U256, instant_buffer_balance: U256) {
        self.require(ROLE_TREASURY);
        self.pre_tranche_balance.set(pre_tranche_balance);
        self.instant_buffer_balance.set(instant_buffer_balance);
        self.env().emit_event(BalancesSynced {
            pre_tranche_balance,
            instant_buffer_balance,
        });
    }

    // ========== Instant Payouts (Protocol Only) ==========

    /// Record an instant-lane payout; reverts if the buffer cannot cover it
    pub fn record_instant_payout(&mut self, to: Address, usdc_amount: U256) {
        self.require(ROLE_PROTOCOL);
        if usdc_amount.is_zero() {
            self.env().revert(SstError::InvalidAmount);
        }
        let available = self.available_instant();
        if usdc_amount > available {
            self.env().revert(SstError::InsufficientBuffer);
        }

        let remaining_buffer = available - usdc_amount;
        self.instant_buffer_balance.set(remaining_buffer);
        self.total_instant_paid
            .set(self.get_total_instant_paid() + usdc_amount);

        self.env().emit_event(InstantPayout {
            to,
            usdc_amount,
            remaining_buffer,
        });
    }

    // ========== Views ==========

    pub fn get_snapshot(&self) -> BufferSnapshot {
        let level_params: LevelParams = call_view(
            &self.env(),
            self.registry_address(),
            "get_level_params",
            RuntimeArgs::new(),
        );
        let outstanding_supply: U256 =
            call_view(&self.env(), self.token_address(), "total_supply", RuntimeArgs::new());
        let nav_ray: U256 =
            call_view(&self.env(), self.oracle_address(), "latest_nav_ray", RuntimeArgs::new());

        BufferSnapshot {
            pre_tranche_balance: self.pre_tranche_balance.get().unwrap_or_default(),
            instant_buffer_balance: self.available_instant(),
            target: buffer_target(outstanding_supply, nav_ray, level_params.buffer_target_bps),
            outstanding_supply,
            level: level_params.level,
        }
    }

    /// Layers together meet the target for the current emergency level
    pub fn is_healthy(&self) -> bool {
        self.get_snapshot().is_healthy()
    }

    /// USDC available to the instant lane
    pub fn available_instant(&self) -> U256 {
        self.instant_buffer_balance.get().unwrap_or_default()
    }

    pub fn get_pre_tranche_balance(&self) -> U256 {
        self.pre_tranche_balance.get().unwrap_or_default()
    }

    pub fn get_total_instant_paid(&self) -> U256 {
        self.total_instant_paid.get().unwrap_or_default()
    }

    /// USDC value of `tokens` at the current NAV; used by monitors to size top-ups
    pub fn quote_usdc(&self, tokens: U256) -> U256 {
        let nav_ray: U256 =
            call_view(&self.env(), self.oracle_address(), "latest_nav_ray", RuntimeArgs::new());
        tokens_to_usdc(tokens, nav_ray)
    }

    // ========== Internal Functions ==========

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
