//! Redemption Queue Contract
//!
//! Dual-lane redemption of super-senior tokens.
//!
//! ## Routing
//!
//! A request of `amount` goes INSTANT when it fits both the per-transaction
//! limit and what is left of today's instant capacity, and the instant price
//! (fee and NAV haircut) sits inside the current emergency level's band;
//! otherwise it goes to the WINDOW lane. No partial routing.
//!
//! ## Instant lane
//!
//! Tokens are burned and paid at NAV (less the instant fee) out of the
//! instant buffer. Daily spend resets lazily when the UTC day index moves.
//!
//! ## Window lane
//!
//! - "Quote at request time": the USDC value is fixed when the request is made
//! - Tokens are burned immediately; the holder keeps a pro-rata claim
//! - The operator finalizes a window once its strike has passed, fixing the
//!   settlement fraction for good
//! - Each account claims once per window
//!
//! Priority scores are diagnostic: they order the operator's view of a
//! window and never change settlement.

use odra::prelude::*;
use odra::casper_types::{runtime_args, RuntimeArgs, U256};
use odra::CallDef;
use crate::access_control::{require_role, ROLE_OPERATOR};
use crate::errors::SstError;
use crate::events::{
    InstantRedeemed, RedemptionRouted, WindowClaimed, WindowEnqueued, WindowFinalized,
};
use crate::math::{
    age_component, apply_bps, day_index, instant_price_bps, next_strike, priority_score,
    pro_rata_payout, risk_component, route_lane, settlement_ray, size_component, tokens_to_usdc, usdc_to_tokens,
};
use crate::types::{
    DailySpend, NavQuote, PriorityParams, PriorityScore, QueueEntry, RedemptionLane, RedemptionParams,
    WindowRequest, WindowState,
};

/// Spend already counted for `today`
pub fn spent_today(spend: &DailySpend, today: u64) -> U256 {
    if spend.day_index == today {
        spend.spent
    } else {
        U256::zero()
    }
}

/// Diagnostic score of one queued request
pub fn score_request(
    request: &WindowRequest,
    now: u64,
    risk_adjustment_bps: u32,
    max_apy_bps: u32,
    params: &PriorityParams,
) -> PriorityScore {
    let risk = risk_component(risk_adjustment_bps, max_apy_bps);
    let age = age_component(now.saturating_sub(request.requested_at), params.min_age_sec);
    let size = size_component(request.amount_tokens, params.size_threshold);
    priority_score(risk, age, size, params)
}

/// Redemption Queue Contract
#[odra::module(events = [RedemptionRouted, InstantRedeemed, WindowEnqueued, WindowFinalized, WindowClaimed])]
pub struct RedemptionQueue {
    /// Access control contract address
    access_control: Var<Address>,
    /// Config registry contract address
    config_registry: Var<Address>,
    /// NAV oracle contract address
    nav_oracle: Var<Address>,
    /// Tranche manager contract address (risk inputs)
    tranche_manager: Var<Address>,
    /// Buffer coordinator contract address
    buffer_coordinator: Var<Address>,
    /// Super-senior token contract address
    token: Var<Address>,
    /// Instant-lane spend for the current UTC day, in tokens
    daily_spend: Var<DailySpend>,
    /// Window buckets: strike -> state
    windows: Mapping<u64, WindowState>,
    /// Window rows: (strike, account) -> request
    requests: Mapping<(u64, Address), WindowRequest>,
    /// Window insertion order: (strike, index) -> account
    window_accounts: Mapping<(u64, u32), Address>,
    /// Reentrancy guard
    entered: Var<bool>,
}

#[odra::module]
impl RedemptionQueue {
    /// Initialize the queue
    pub fn init(
        &mut self,
        access_control: Address,
        config_registry: Address,
        nav_oracle: Address,
        tranche_manager: Address,
        buffer_coordinator: Address,
        token: Address,
    ) {
        self.access_control.set(access_control);
        self.config_registry.set(config_registry);
        self.nav_oracle.set(nav_oracle);
        self.tranche_manager.set(tranche_manager);
        self.buffer_coordinator.set(buffer_coordinator);
        self.token.set(token);
        self.daily_spend.set(DailySpend::default());
        self.entered.set(false);
    }

    // ===== User Functions =====

    /// Redeem `amount` tokens and return the lane it was routed to.
    ///
    /// # Notes
    /// * Caller must have approved this contract for `amount` on the token
    /// * Tokens are burned in both lanes
    pub fn redeem(&mut self, amount: U256) -> RedemptionLane {
        if amount.is_zero() {
            self.env().revert(SstError::InvalidAmount);
        }
        self.enter();

        let account = self.env().caller();
        let params = self.redemption_params();
        let quote = self.nav_quote();
        let nav_ray = quote.value_ray;
        if nav_ray.is_zero() {
            self.env().revert(SstError::NavUnavailable);
        }

        let lane = self.route(amount, &params, &quote);
        self.env().emit_event(RedemptionRouted {
            account,
            amount_tokens: amount,
            lane,
        });

        match lane {
            RedemptionLane::Instant => self.redeem_instant(account, amount, nav_ray, &params),
            RedemptionLane::Window => self.enqueue_window(account, amount, nav_ray),
        }

        self.exit();
        lane
    }

    /// Claim the pro-rata payout of a finalized window. Returns the USDC paid.
    pub fn claim(&mut self, strike_ts: u64) -> U256 {
        self.enter();
        let account = self.env().caller();

        let mut window = match self.windows.get(&strike_ts) {
            Some(w) => w,
            None => self.env().revert(SstError::WindowNotFound),
        };
        if !window.finalized {
            self.env().revert(SstError::WindowNotReady);
        }

        let mut request = match self.requests.get(&(strike_ts, account)) {
            Some(r) => r,
            None => self.env().revert(SstError::NothingToClaim),
        };
        if request.claimed {
            self.env().revert(SstError::AlreadyClaimed);
        }

        let payout = pro_rata_payout(request.quoted_usdc, window.settlement_ray);
        request.claimed = true;
        self.requests.set(&(strike_ts, account), request);
        window.claimed_total = window.claimed_total + payout;
        self.windows.set(&strike_ts, window);

        self.env().emit_event(WindowClaimed {
            account,
            strike_ts,
            payout,
        });

        self.exit();
        payout
    }

    // ===== Operator Functions =====

    /// Fix the settlement fraction of a window whose strike has passed (operator only)
    pub fn finalize_window(&mut self, strike_ts: u64, funds_provided: U256) {
        self.require(ROLE_OPERATOR);

        let mut window = match self.windows.get(&strike_ts) {
            Some(w) if w.request_count > 0 => w,
            _ => self.env().revert(SstError::WindowNotFound),
        };
        if window.finalized {
            self.env().revert(SstError::WindowFinalizedAlready);
        }
        if self.now_secs() < strike_ts {
            self.env().revert(SstError::WindowNotReady);
        }

        let settlement = settlement_ray(funds_provided, window.total_requested);
        window.funds_provided = funds_provided;
        window.settlement_ray = settlement;
        window.finalized = true;
        let total_requested = window.total_requested;
        self.windows.set(&strike_ts, window);

        self.env().emit_event(WindowFinalized {
            strike_ts,
            total_requested,
            funds_provided,
            settlement_ray: settlement,
        });
    }

    // ===== Views =====

    /// Daily cap minus today's instant spend, in tokens
    pub fn daily_remaining(&self) -> U256 {
        let params = self.redemption_params();
        let today = day_index(self.now_secs());
        let spent = spent_today(&self.get_daily_spend(), today);
        params.daily_cap.saturating_sub(spent)
    }

    /// Tokens the instant lane can still take today: the daily remainder,
    /// bounded by what the instant buffer can pay at current NAV
    pub fn instant_capacity(&self) -> U256 {
        let params = self.redemption_params();
        self.capacity_at(&params, self.nav_ray())
    }

    /// Lane a redemption of `amount` would take right now
    pub fn preview_lane(&self, amount: U256) -> RedemptionLane {
        let params = self.redemption_params();
        self.route(amount, &params, &self.nav_quote())
    }

    /// Instant price right now, in bps of the quorum NAV
    pub fn instant_price_bps(&self) -> u32 {
        let params = self.redemption_params();
        instant_price_bps(params.fee_bps, self.nav_quote().haircut_bps)
    }

    /// Strike a window request made now would be filed under
    pub fn current_strike(&self) -> u64 {
        next_strike(self.now_secs())
    }

    pub fn get_daily_spend(&self) -> DailySpend {
        self.daily_spend.get().unwrap_or_default()
    }

    pub fn get_window(&self, strike_ts: u64) -> Option<WindowState> {
        self.windows.get(&strike_ts)
    }

    pub fn get_request(&self, strike_ts: u64, account: Address) -> Option<WindowRequest> {
        self.requests.get(&(strike_ts, account))
    }

    /// Diagnostic priority of an account's request in a window
    pub fn priority_score(&self, strike_ts: u64, account: Address) -> PriorityScore {
        match self.requests.get(&(strike_ts, account)) {
            Some(request) => {
                let (risk_adjustment_bps, max_apy_bps) = self.risk_inputs();
                score_request(
                    &request,
                    self.now_secs(),
                    risk_adjustment_bps,
                    max_apy_bps,
                    &self.priority_params(),
                )
            }
            None => PriorityScore::default(),
        }
    }

    /// Requests of a window, highest priority first; ties keep arrival order
    pub fn get_window_queue(&self, strike_ts: u64) -> Vec<QueueEntry> {
        let count = self
            .windows
            .get(&strike_ts)
            .map(|w| w.request_count)
            .unwrap_or(0);
        if count == 0 {
            return Vec::new();
        }

        let now = self.now_secs();
        let (risk_adjustment_bps, max_apy_bps) = self.risk_inputs();
        let params = self.priority_params();

        let mut entries: Vec<QueueEntry> = (0..count)
            .filter_map(|i| self.window_accounts.get(&(strike_ts, i)))
            .filter_map(|account| self.requests.get(&(strike_ts, account)))
            .map(|request| QueueEntry {
                account: request.account,
                amount_tokens: request.amount_tokens,
                quoted_usdc: request.quoted_usdc,
                priority: score_request(&request, now, risk_adjustment_bps, max_apy_bps, &params),
            })
            .collect();
        entries.sort_by(|a, b| b.priority.score.cmp(&a.priority.score));
        entries
    }

    // ===== Internal Functions =====

    fn redeem_instant(
        &mut self,
        account: Address,
        amount: U256,
        nav_ray: U256,
        params: &RedemptionParams,
    ) {
        let today = day_index(self.now_secs());
        let spent = spent_today(&self.get_daily_spend(), today);
        self.daily_spend.set(DailySpend {
            day_index: today,
            spent: spent + amount,
        });

        let gross_usdc = tokens_to_usdc(amount, nav_ray);
        let fee_usdc = apply_bps(gross_usdc, params.fee_bps);
        let usdc_paid = gross_usdc - fee_usdc;

        self.burn_from(account, amount);
        if !usdc_paid.is_zero() {
            let payout_args = runtime_args! {
                "to" => account,
                "usdc_amount" => usdc_paid,
            };
            let payout_call = CallDef::new("record_instant_payout", true, payout_args);
            self.env()
                .call_contract::<()>(self.buffer_address(), payout_call);
        }

        self.env().emit_event(InstantRedeemed {
            account,
            amount_tokens: amount,
            usdc_paid,
            fee_usdc,
            day_index: today,
        });
    }

    fn enqueue_window(&mut self, account: Address, amount: U256, nav_ray: U256) {
        let now = self.now_secs();
        let strike_ts = next_strike(now);
        let quoted_usdc = tokens_to_usdc(amount, nav_ray);
        if quoted_usdc.is_zero() {
            self.env().revert(SstError::InvalidAmount);
        }

        let mut window = self.windows.get(&strike_ts).unwrap_or_default();
        if window.finalized {
            self.env().revert(SstError::WindowFinalizedAlready);
        }
        window.strike_ts = strike_ts;
        window.total_requested = window.total_requested + quoted_usdc;
        window.total_tokens = window.total_tokens + amount;

        let request = match self.requests.get(&(strike_ts, account)) {
            Some(mut existing) => {
                existing.amount_tokens = existing.amount_tokens + amount;
                existing.quoted_usdc = existing.quoted_usdc + quoted_usdc;
                existing
            }
            None => {
                self.window_accounts
                    .set(&(strike_ts, window.request_count), account);
                window.request_count += 1;
                WindowRequest {
                    account,
                    amount_tokens: amount,
                    quoted_usdc,
                    requested_at: now,
                    claimed: false,
                }
            }
        };
        self.requests.set(&(strike_ts, account), request);
        self.windows.set(&strike_ts, window);

        self.burn_from(account, amount);

        self.env().emit_event(WindowEnqueued {
            account,
            strike_ts,
            amount_tokens: amount,
            quoted_usdc,
        });
    }

    fn route(&self, amount: U256, params: &RedemptionParams, quote: &NavQuote) -> RedemptionLane {
        let price_bps = instant_price_bps(params.fee_bps, quote.haircut_bps);
        if !self.price_in_band(price_bps) {
            return RedemptionLane::Window;
        }
        let remaining = self.capacity_at(params, quote.value_ray);
        route_lane(amount, params.per_tx_limit, remaining)
    }

    fn price_in_band(&self, price_bps: u32) -> bool {
        let args = runtime_args! {
            "price_bps" => price_bps,
        };
        let call_def = CallDef::new("lane_pretrade_check", false, args);
        self.env().call_contract(self.registry_address(), call_def)
    }

    fn capacity_at(&self, params: &RedemptionParams, nav_ray: U256) -> U256 {
        let today = day_index(self.now_secs());
        let spent = spent_today(&self.get_daily_spend(), today);
        let daily_left = params.daily_cap.saturating_sub(spent);

        let buffer_call = CallDef::new("available_instant", false, RuntimeArgs::new());
        let buffer_usdc: U256 = self.env().call_contract(self.buffer_address(), buffer_call);
        let buffer_tokens = usdc_to_tokens(buffer_usdc, nav_ray).unwrap_or_default();

        daily_left.min(buffer_tokens)
    }

    fn burn_from(&mut self, account: Address, amount: U256) {
        let burn_args = runtime_args! {
            "from" => account,
            "amount" => amount,
        };
        let burn_call = CallDef::new("burn_with_allowance", true, burn_args);
        self.env().call_contract::<()>(self.token_address(), burn_call);
    }

    fn redemption_params(&self) -> RedemptionParams {
        let call_def = CallDef::new("get_redemption_params", false, RuntimeArgs::new());
        self.env().call_contract(self.registry_address(), call_def)
    }

    fn priority_params(&self) -> PriorityParams {
        let call_def = CallDef::new("get_priority_params", false, RuntimeArgs::new());
        self.env().call_contract(self.registry_address(), call_def)
    }

    fn risk_inputs(&self) -> (u32, u32) {
        let tranche = match self.tranche_manager.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        };
        let call_def = CallDef::new("get_risk_inputs", false, RuntimeArgs::new());
        self.env().call_contract(tranche, call_def)
    }

    fn nav_ray(&self) -> U256 {
        self.nav_quote().value_ray
    }

    fn nav_quote(&self) -> NavQuote {
        let oracle = match self.nav_oracle.get() {
            Some(addr) => addr,
            None => self.env().revert(SstError::NotConfigured),
        };
        let call_def = CallDef::new("get_nav_quote", false, RuntimeArgs::new());
        self.env().call_contract(oracle, call_def)
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

    fn now_secs(&self) -> u64 {
        self.env().get_block_time() / 1000
    }
}
