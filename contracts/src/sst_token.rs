//! Super-Senior Token Contract
//!
//! Fungible token with protocol-controlled minting and burning.
//! Only engine contracts holding the PROTOCOL capability can mint or burn,
//! and tokens may only be sent to allow-listed members.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{require_role, ROLE_GOVERNANCE, ROLE_PROTOCOL};
use crate::errors::SstError;
use crate::events::{Burn, MemberSet, Mint, Transfer};

/// Super-Senior Token Contract
#[odra::module(events = [Transfer, Mint, Burn, MemberSet])]
pub struct SuperSeniorToken {
    /// Token name
    name: Var<String>,
    /// Token symbol
    symbol: Var<String>,
    /// Decimals (18)
    decimals: Var<u8>,
    /// Total supply
    total_supply: Var<U256>,
    /// Balance mapping
    balances: Mapping<Address, U256>,
    /// Allowance mapping (owner -> spender -> amount)
    allowances: Mapping<(Address, Address), U256>,
    /// Allow-list of accounts that may receive tokens
    members: Mapping<Address, bool>,
    /// Cumulative minted (all time)
    total_minted: Var<U256>,
    /// Cumulative burned (all time)
    total_burned: Var<U256>,
    /// Access control contract address
    access_control: Var<Address>,
}

#[odra::module]
impl SuperSeniorToken {
    /// Initialize the token
    pub fn init(&mut self, access_control: Address, name: String, symbol: String) {
        self.name.set(name);
        self.symbol.set(symbol);
        self.decimals.set(18);
        self.total_supply.set(U256::zero());
        self.total_minted.set(U256::zero());
        self.total_burned.set(U256::zero());
        self.access_control.set(access_control);
    }

    // ========== Token Views ==========

    pub fn name(&self) -> String {
        self.name.get().unwrap_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get().unwrap_or_default()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.get().unwrap_or(18)
    }

    /// Get total supply
    pub fn total_supply(&self) -> U256 {
        self.total_supply.get().unwrap_or(U256::zero())
    }

    /// Get balance of an account
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).unwrap_or(U256::zero())
    }

    /// Get allowance for spender
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or(U256::zero())
    }

    pub fn total_minted(&self) -> U256 {
        self.total_minted.get().unwrap_or_default()
    }

    pub fn total_burned(&self) -> U256 {
        self.total_burned.get().unwrap_or_default()
    }

    // ========== Holder Functions ==========

    /// Transfer tokens to a member
    pub fn transfer(&mut self, recipient: Address, amount: U256) -> bool {
        let sender = self.env().caller();
        self.transfer_internal(sender, recipient, amount);
        true
    }

    /// Approve spender to spend tokens
    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        let owner = self.env().caller();
        self.allowances.set(&(owner, spender), amount);
        true
    }

    /// Transfer tokens from owner to a member (requires allowance)
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool {
        let spender = self.env().caller();
        self.spend_allowance(owner, spender, amount);
        self.transfer_internal(owner, recipient, amount);
        true
    }

    // ========== Protocol Functions (Restricted) ==========

    /// Mint new tokens to a member (protocol only)
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.require(ROLE_PROTOCOL);
        self.require_member(to);
        if amount.is_zero() {
            self.env().revert(SstError::InvalidAmount);
        }

        self.balances.set(&to, self.balance_of(to) + amount);
        self.total_supply.set(self.total_supply() + amount);
        self.total_minted.set(self.total_minted() + amount);

        self.env().emit_event(Mint { to, amount });
    }

    /// Burn tokens the holder approved to the calling protocol contract
    pub fn burn_with_allowance(&mut self, from: Address, amount: U256) {
        self.require(ROLE_PROTOCOL);
        let spender = self.env().caller();
        self.spend_allowance(from, spender, amount);

        let current_balance = self.balance_of(from);
        if current_balance < amount {
            self.env().revert(SstError::InsufficientBalance);
        }
        self.balances.set(&from, current_balance - amount);
        self.total_supply.set(self.total_supply() - amount);
        self.total_burned.set(self.total_burned() + amount);

        self.env().emit_event(Burn { from, amount });
    }

    // ========== Membership ==========

    /// Add or remove an account from the allow-list (governance only)
    pub fn set_member(&mut self, account: Address, allowed: bool) {
        self.require(ROLE_GOVERNANCE);
        self.members.set(&account, allowed);
        self.env().emit_event(MemberSet { account, allowed });
    }

    pub fn is_member(&self, account: Address) -> bool {
        self.members.get(&account).unwrap_or(false)
    }

    // ========== Internal Functions ==========

    fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        self.require_member(to);
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(SstError::InsufficientBalance);
        }

        self.balances.set(&from, from_balance - amount);
        self.balances.set(&to, self.balance_of(to) + amount);

        self.env().emit_event(Transfer { from, to, amount });
    }

    fn spend_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        let current_allowance = self.allowance(owner, spender);
        if current_allowance < amount {
            self.env().revert(SstError::InsufficientAllowance);
        }
        self.allowances.set(&(owner, spender), current_allowance - amount);
    }

    fn require_member(&self, account: Address) {
        if !self.is_member(account) {
            self.env().revert(SstError::NotMember);
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
