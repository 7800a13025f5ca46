//! Dual-lane redemption: routing, daily cap, window settlement and priority.

use odra::casper_types::U256;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use sst_contracts::errors::SstError;
use sst_contracts::math::ray;
use sst_contracts::types::{
    EmergencyLevel, ParamKey, RedemptionLane, PRIORITY_FLAG_SIZE_LARGE,
};

use crate::fixture::{tokens, usdc, Engine};

/// Engine with instant limits 100 per tx / 200 per day and `funded` tokens per holder
fn engine_with_limits(funded: u64) -> Engine {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);
    engine
        .registry
        .set_param(ParamKey::InstantPerTxLimit, tokens(100));
    engine
        .registry
        .set_param(ParamKey::InstantDailyCap, tokens(200));
    for i in 0..engine.holders.len() {
        let holder = engine.holders[i];
        engine.mint(holder, usdc(funded));
    }
    engine
}

// ===== Instant Lane =====

#[test]
fn test_instant_redemption_spends_daily_cap() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    assert_eq!(engine.redeem(holder, tokens(50)), RedemptionLane::Instant);
    assert_eq!(engine.queue.daily_remaining(), tokens(150));
    assert_eq!(engine.token.balance_of(holder), tokens(950));
    assert_eq!(engine.token.total_burned(), tokens(50));
    assert_eq!(engine.buffer.available_instant(), usdc(1_000_000) - usdc(50));
    assert_eq!(engine.buffer.get_total_instant_paid(), usdc(50));
    assert!(engine.env.emitted(&engine.queue, "InstantRedeemed"));
    assert!(engine.env.emitted(&engine.queue, "RedemptionRouted"));
}

#[test]
fn test_routing_respects_both_limits() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    // Above per-tx limit
    assert_eq!(engine.redeem(holder, tokens(120)), RedemptionLane::Window);
    assert_eq!(engine.queue.daily_remaining(), tokens(200));

    assert_eq!(engine.redeem(holder, tokens(100)), RedemptionLane::Instant);
    assert_eq!(engine.redeem(holder, tokens(100)), RedemptionLane::Instant);
    assert_eq!(engine.queue.daily_remaining(), U256::zero());

    // Daily cap exhausted
    assert_eq!(engine.queue.preview_lane(tokens(1)), RedemptionLane::Window);
    assert_eq!(engine.redeem(holder, tokens(1)), RedemptionLane::Window);
}

#[test]
fn test_daily_cap_resets_next_day() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.redeem(holder, tokens(100));
    engine.redeem(holder, tokens(100));
    assert_eq!(engine.queue.daily_remaining(), U256::zero());

    engine.advance_secs(86_400);
    engine.publish_nav(ray());
    assert_eq!(engine.queue.daily_remaining(), tokens(200));
    assert_eq!(engine.redeem(holder, tokens(100)), RedemptionLane::Instant);
}

#[test]
fn test_instant_fee_withheld() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.env.set_caller(engine.admin);
    engine.registry.set_param(ParamKey::InstantFeeBps, U256::from(50u32));
    engine.redeem(holder, tokens(100));

    // 0.5% of 100 USDC kept in the buffer
    assert_eq!(engine.buffer.get_total_instant_paid(), usdc(100) - usdc(1) / 2);
}

#[test]
fn test_instant_capacity_bounded_by_buffer() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.sync_buffers(usdc(1_000_000), usdc(30));
    assert_eq!(engine.queue.instant_capacity(), tokens(30));
    assert_eq!(engine.queue.daily_remaining(), tokens(200));
    assert_eq!(engine.redeem(holder, tokens(40)), RedemptionLane::Window);
    assert_eq!(engine.redeem(holder, tokens(30)), RedemptionLane::Instant);
    assert_eq!(engine.buffer.available_instant(), U256::zero());
}

#[test]
fn test_redemptions_continue_at_red() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.env.set_caller(engine.admin);
    engine
        .registry
        .set_emergency_level(EmergencyLevel::Red, String::from("halt"));
    assert_eq!(engine.redeem(holder, tokens(10)), RedemptionLane::Instant);
    assert_eq!(engine.redeem(holder, tokens(150)), RedemptionLane::Window);
}

#[test]
fn test_instant_price_must_sit_in_level_band() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    // 3% fee is outside the ORANGE band of 25 bps
    engine.env.set_caller(engine.admin);
    engine.registry.set_param(ParamKey::InstantFeeBps, U256::from(300u32));
    engine
        .registry
        .set_emergency_level(EmergencyLevel::Orange, String::from("stress"));
    assert_eq!(engine.queue.instant_price_bps(), 9_700);
    assert_eq!(engine.redeem(holder, tokens(100)), RedemptionLane::Window);
    assert_eq!(engine.queue.daily_remaining(), tokens(200));
    assert_eq!(engine.buffer.get_total_instant_paid(), U256::zero());

    // 1.5% fee fits the NORMAL band of 200 bps
    engine.env.set_caller(engine.admin);
    engine.registry.set_param(ParamKey::InstantFeeBps, U256::from(150u32));
    engine
        .registry
        .set_emergency_level(EmergencyLevel::Normal, String::from("recovered"));
    assert_eq!(engine.redeem(holder, tokens(100)), RedemptionLane::Instant);
}

#[test]
fn test_degraded_nav_haircut_counts_against_band() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.env.set_caller(engine.admin);
    engine
        .registry
        .set_emergency_level(EmergencyLevel::Yellow, String::from("watch"));
    assert_eq!(engine.queue.preview_lane(tokens(10)), RedemptionLane::Instant);

    // Tier-1 haircut of 200 bps against a YELLOW band of 100 bps
    engine.advance_secs(2 * 3_600);
    assert_eq!(engine.queue.instant_price_bps(), 9_800);
    assert_eq!(engine.queue.preview_lane(tokens(10)), RedemptionLane::Window);
    assert_eq!(engine.redeem(holder, tokens(10)), RedemptionLane::Window);
}

#[test]
fn test_invalid_redemptions() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.env.set_caller(holder);
    assert_eq!(
        engine.queue.try_redeem(U256::zero()),
        Err(SstError::InvalidAmount.into())
    );
    // No allowance granted to the queue
    assert!(engine.queue.try_redeem(tokens(10)).is_err());
    assert_eq!(engine.token.balance_of(holder), tokens(1_000));
}

#[test]
fn test_redeem_without_nav() {
    let mut engine = Engine::deploy();
    engine.env.set_caller(engine.holders[0]);
    assert_eq!(
        engine.queue.try_redeem(tokens(10)),
        Err(SstError::NavUnavailable.into())
    );
}

// ===== Window Lane =====

#[test]
fn test_window_settles_pro_rata() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    assert_eq!(engine.redeem(holder, tokens(200)), RedemptionLane::Window);
    let strike = engine.queue.current_strike();
    assert!(strike > engine.now_secs());

    let request = engine.queue.get_request(strike, holder).unwrap();
    assert_eq!(request.amount_tokens, tokens(200));
    assert_eq!(request.quoted_usdc, usdc(200));
    assert!(!request.claimed);
    assert_eq!(engine.token.balance_of(holder), tokens(800));

    engine.env.set_caller(holder);
    assert_eq!(engine.queue.try_claim(strike), Err(SstError::WindowNotReady.into()));

    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.queue.try_finalize_window(strike, usdc(100)),
        Err(SstError::WindowNotReady.into())
    );

    engine.advance_secs(strike - engine.now_secs());
    engine.queue.finalize_window(strike, usdc(100));
    let window = engine.queue.get_window(strike).unwrap();
    assert!(window.finalized);
    assert_eq!(window.settlement_ray, ray() / 2);
    assert_eq!(
        engine.queue.try_finalize_window(strike, usdc(200)),
        Err(SstError::WindowFinalizedAlready.into())
    );

    engine.env.set_caller(holder);
    assert_eq!(engine.queue.claim(strike), usdc(100));
    assert_eq!(engine.queue.try_claim(strike), Err(SstError::AlreadyClaimed.into()));
    assert_eq!(engine.queue.get_window(strike).unwrap().claimed_total, usdc(100));

    engine.env.set_caller(engine.holders[1]);
    assert_eq!(engine.queue.try_claim(strike), Err(SstError::NothingToClaim.into()));
}

#[test]
fn test_overfunded_window_pays_in_full() {
    let mut engine = engine_with_limits(1_000);
    let (a, b) = (engine.holders[0], engine.holders[1]);

    engine.redeem(a, tokens(300));
    engine.redeem(b, tokens(150));
    let strike = engine.queue.current_strike();
    assert_eq!(engine.queue.get_window(strike).unwrap().total_requested, usdc(450));

    engine.advance_secs(strike - engine.now_secs() + 10);
    engine.env.set_caller(engine.admin);
    engine.queue.finalize_window(strike, usdc(1_000));

    engine.env.set_caller(a);
    assert_eq!(engine.queue.claim(strike), usdc(300));
    engine.env.set_caller(b);
    assert_eq!(engine.queue.claim(strike), usdc(150));
}

#[test]
fn test_repeat_requests_accumulate_in_one_row() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];

    engine.redeem(holder, tokens(150));
    engine.redeem(holder, tokens(250));
    let strike = engine.queue.current_strike();

    let window = engine.queue.get_window(strike).unwrap();
    assert_eq!(window.request_count, 1);
    assert_eq!(window.total_tokens, tokens(400));
    assert_eq!(engine.queue.get_request(strike, holder).unwrap().quoted_usdc, usdc(400));
}

#[test]
fn test_unknown_window() {
    let mut engine = engine_with_limits(1_000);
    let strike = engine.queue.current_strike();

    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.queue.try_finalize_window(strike, usdc(1)),
        Err(SstError::WindowNotFound.into())
    );
    engine.env.set_caller(engine.holders[0]);
    assert_eq!(engine.queue.try_claim(strike), Err(SstError::WindowNotFound.into()));
    assert!(engine.queue.get_window_queue(strike).is_empty());
}

#[test]
fn test_finalize_needs_operator() {
    let mut engine = engine_with_limits(1_000);
    let holder = engine.holders[0];
    engine.redeem(holder, tokens(200));
    let strike = engine.queue.current_strike();
    engine.advance_secs(strike - engine.now_secs());

    engine.env.set_caller(holder);
    assert_eq!(
        engine.queue.try_finalize_window(strike, usdc(200)),
        Err(SstError::Unauthorized.into())
    );
}

// ===== Priority =====

#[test]
fn test_window_queue_orders_by_priority() {
    let mut engine = engine_with_limits(2_000);
    let (a, b, c) = (engine.holders[0], engine.holders[1], engine.holders[2]);

    engine.env.set_caller(engine.admin);
    engine
        .registry
        .set_param(ParamKey::PrioritySizeThreshold, tokens(100));

    engine.redeem(a, tokens(150));
    engine.redeem(b, tokens(1_000));
    engine.redeem(c, tokens(150));
    let strike = engine.queue.current_strike();

    let queue = engine.queue.get_window_queue(strike);
    let order: Vec<_> = queue.iter().map(|e| e.account).collect();
    assert_eq!(order, vec![b, a, c]);

    let large = engine.queue.priority_score(strike, b);
    assert_eq!(large.size_component, 10_000);
    assert_eq!(large.flags, PRIORITY_FLAG_SIZE_LARGE);
    assert_eq!(queue[1].priority, queue[2].priority);
}

#[test]
fn test_priority_does_not_change_settlement() {
    let mut engine = engine_with_limits(2_000);
    let (a, b) = (engine.holders[0], engine.holders[1]);

    engine.env.set_caller(engine.admin);
    engine
        .registry
        .set_param(ParamKey::PrioritySizeThreshold, tokens(100));
    engine.redeem(a, tokens(200));
    engine.redeem(b, tokens(1_800));
    let strike = engine.queue.current_strike();

    engine.advance_secs(strike - engine.now_secs());
    engine.env.set_caller(engine.admin);
    engine.queue.finalize_window(strike, usdc(1_000));

    engine.env.set_caller(a);
    assert_eq!(engine.queue.claim(strike), usdc(100));
    engine.env.set_caller(b);
    assert_eq!(engine.queue.claim(strike), usdc(900));
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 8, ..ProptestConfig::default() })]

    #[test]
    fn routing_matches_limits(amount in 1u64..=300) {
        let mut engine = engine_with_limits(1_000);
        let holder = engine.holders[0];

        let lane = engine.redeem(holder, tokens(amount));
        let expected = if amount <= 100 { RedemptionLane::Instant } else { RedemptionLane::Window };
        prop_assert_eq!(lane, expected);

        let spent = if lane == RedemptionLane::Instant { amount } else { 0 };
        prop_assert_eq!(engine.queue.daily_remaining(), tokens(200 - spent));
        prop_assert_eq!(engine.token.balance_of(holder), tokens(1_000 - amount));
    }
}
