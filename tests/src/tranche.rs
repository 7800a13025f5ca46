//! Detachment band: raise, ratify, void, lower, expansion.

use pretty_assertions::assert_eq;

use sst_contracts::access_control::ROLE_GOVERNANCE;
use sst_contracts::errors::SstError;
use sst_contracts::math::ray;
use sst_contracts::types::{EmergencyLevel, RejectReason};

use crate::fixture::{usdc, Engine, SOVEREIGN};

const DAY: u64 = 86_400;

fn can_issue_reason(engine: &Engine) -> RejectReason {
    engine
        .issuance
        .can_issue(usdc(10), 0, 0, String::from(SOVEREIGN))
        .reason
}

/// Raise to 10100 and ratify it
fn ratified_at_10100(engine: &mut Engine) {
    engine.env.set_caller(engine.admin);
    engine.tranche.raise_detachment(10_100);
    engine.tranche.ratify_detachment();
}

// ===== Raise / Ratify =====

#[test]
fn test_raise_then_ratify() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);

    engine.tranche.raise_detachment(10_100);
    let status = engine.tranche.get_detachment_status();
    assert_eq!(status.detachment_bps, 10_100);
    assert_eq!(status.prior_bps, 10_000);
    assert_eq!(status.pending_ratify_until, engine.now_secs() + DAY);
    assert!(!status.raise_expired);

    engine.tranche.ratify_detachment();
    let status = engine.tranche.get_detachment_status();
    assert_eq!(status.detachment_bps, 10_100);
    assert_eq!(status.prior_bps, 10_100);
    assert_eq!(status.pending_ratify_until, 0);
    assert!(engine.env.emitted(&engine.tranche, "DetachmentRatified"));
}

#[test]
fn test_unratified_raise_is_voided_after_deadline() {
    let mut engine = Engine::setup();
    ratified_at_10100(&mut engine);

    engine.advance_secs(DAY);
    engine.publish_nav(ray());
    engine.env.set_caller(engine.admin);
    engine.tranche.raise_detachment(10_200);
    assert_eq!(engine.tranche.get_detachment_bps(), 10_200);

    engine.advance_secs(DAY + 1);
    engine.publish_nav(ray());

    // Reads already see the prior value; issuance waits for the void to be settled
    let status = engine.tranche.get_detachment_status();
    assert!(status.raise_expired);
    assert_eq!(status.detachment_bps, 10_100);
    assert_eq!(can_issue_reason(&engine), RejectReason::RatificationExpired);

    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.tranche.try_ratify_detachment(),
        Err(SstError::RatificationExpired.into())
    );

    assert!(engine.tranche.settle_expired_raise());
    assert!(engine.env.emitted(&engine.tranche, "DetachmentRaiseVoided"));
    assert!(!engine.tranche.settle_expired_raise());

    let status = engine.tranche.get_detachment_status();
    assert!(!status.raise_expired);
    assert_eq!(status.detachment_bps, 10_100);
    assert_eq!(status.pending_ratify_until, 0);
    assert_eq!(can_issue_reason(&engine), RejectReason::None);
}

#[test]
fn test_raise_spacing_and_pending_guard() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);

    engine.tranche.raise_detachment(10_100);
    assert_eq!(
        engine.tranche.try_raise_detachment(10_200),
        Err(SstError::PendingRatification.into())
    );
    engine.tranche.ratify_detachment();
    assert_eq!(
        engine.tranche.try_raise_detachment(10_200),
        Err(SstError::RaiseTooSoon.into())
    );
}

#[test]
fn test_invalid_moves() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);

    for bps in [10_000, 10_150, 10_400] {
        assert_eq!(
            engine.tranche.try_raise_detachment(bps),
            Err(SstError::InvalidDetachment.into())
        );
    }
    assert_eq!(
        engine.tranche.try_lower_detachment(10_000),
        Err(SstError::InvalidDetachment.into())
    );
}

#[test]
fn test_band_changes_need_fresh_nav() {
    let mut engine = Engine::deploy();
    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.tranche.try_raise_detachment(10_100),
        Err(SstError::OracleStale.into())
    );

    let mut engine = Engine::setup();
    engine.advance_secs(2 * 3_600);
    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.tranche.try_raise_detachment(10_100),
        Err(SstError::OracleStale.into())
    );
}

#[test]
fn test_ratification_quorum_counts_distinct_voters() {
    let mut engine = Engine::setup();
    let second = engine.holders[2];
    engine.env.set_caller(engine.admin);
    engine.access_control.grant_role(ROLE_GOVERNANCE, second);

    let mut config = engine.tranche.get_config();
    config.ratify_quorum = 2;
    engine.tranche.set_config(config);

    engine.tranche.raise_detachment(10_100);
    engine.tranche.ratify_detachment();
    assert_eq!(engine.tranche.get_detachment_status().prior_bps, 10_000);
    assert_eq!(
        engine.tranche.try_ratify_detachment(),
        Err(SstError::AlreadyVoted.into())
    );

    engine.env.set_caller(second);
    engine.tranche.ratify_detachment();
    let status = engine.tranche.get_detachment_status();
    assert_eq!(status.prior_bps, 10_100);
    assert_eq!(status.pending_ratify_until, 0);
}

// ===== Lower =====

#[test]
fn test_lower_waits_for_cooldown() {
    let mut engine = Engine::setup();
    ratified_at_10100(&mut engine);

    assert_eq!(
        engine.tranche.try_lower_detachment(10_000),
        Err(SstError::CooldownActive.into())
    );

    engine.advance_secs(7 * DAY);
    engine.publish_nav(ray());
    engine.env.set_caller(engine.admin);
    engine.tranche.lower_detachment(10_000);
    assert_eq!(engine.tranche.get_detachment_bps(), 10_000);
}

#[test]
fn test_lower_blocked_while_raise_pending() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);
    engine.tranche.raise_detachment(10_100);
    assert_eq!(
        engine.tranche.try_lower_detachment(10_000),
        Err(SstError::PendingRatification.into())
    );
}

// ===== Emergency Expansion =====

#[test]
fn test_expansion_needs_red_and_guarantee() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);

    assert_eq!(
        engine.tranche.try_attest_expansion(10_500),
        Err(SstError::ExpansionNotAllowed.into())
    );

    engine
        .registry
        .set_emergency_level(EmergencyLevel::Red, String::from("stress"));
    assert_eq!(
        engine.tranche.try_attest_expansion(10_500),
        Err(SstError::ExpansionNotAllowed.into())
    );

    engine.tranche.confirm_sovereign_guarantee(true);
    assert!(engine.tranche.is_sovereign_guarantee_confirmed());
    for bps in [10_000, 10_600] {
        assert_eq!(
            engine.tranche.try_attest_expansion(bps),
            Err(SstError::InvalidDetachment.into())
        );
    }
}

#[test]
fn test_expansion_activates_at_threshold_and_expires() {
    let mut engine = Engine::setup();
    let second = engine.holders[2];
    engine.env.set_caller(engine.admin);
    engine.access_control.grant_role(ROLE_GOVERNANCE, second);
    engine
        .registry
        .set_emergency_level(EmergencyLevel::Red, String::from("stress"));
    engine.tranche.confirm_sovereign_guarantee(true);

    engine.tranche.attest_expansion(10_500);
    assert_eq!(engine.tranche.get_detachment_bps(), 10_000);
    assert_eq!(
        engine.tranche.try_attest_expansion(10_500),
        Err(SstError::AlreadyVoted.into())
    );

    engine.env.set_caller(second);
    engine.tranche.attest_expansion(10_500);
    assert!(engine.env.emitted(&engine.tranche, "ExpansionActivated"));

    let status = engine.tranche.get_detachment_status();
    assert_eq!(status.detachment_bps, 10_500);
    assert_eq!(status.expansion_bps, 10_500);
    assert_eq!(status.expansion_until, engine.now_secs() + 14 * DAY);

    engine.advance_secs(14 * DAY);
    let status = engine.tranche.get_detachment_status();
    assert_eq!(status.detachment_bps, 10_000);
    assert_eq!(status.expansion_bps, 0);
}

#[test]
fn test_competing_target_does_not_erase_attestations() {
    let mut engine = Engine::setup();
    let (second, third) = (engine.holders[1], engine.holders[2]);
    engine.env.set_caller(engine.admin);
    engine.access_control.grant_role(ROLE_GOVERNANCE, second);
    engine.access_control.grant_role(ROLE_GOVERNANCE, third);
    engine
        .registry
        .set_emergency_level(EmergencyLevel::Red, String::from("stress"));
    engine.tranche.confirm_sovereign_guarantee(true);

    engine.tranche.attest_expansion(10_500);
    engine.env.set_caller(third);
    engine.tranche.attest_expansion(10_400);
    assert_eq!(engine.tranche.get_detachment_bps(), 10_000);

    // The 10500 tally survived the 10400 attestation
    engine.env.set_caller(second);
    engine.tranche.attest_expansion(10_500);
    let status = engine.tranche.get_detachment_status();
    assert_eq!(status.expansion_bps, 10_500);
    assert_eq!(status.detachment_bps, 10_500);
}

// ===== Risk Inputs =====

#[test]
fn test_risk_params() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);

    engine.tranche.set_risk_params(300, 500, 600);
    assert_eq!(engine.tranche.effective_apy_bps(), 600);
    assert_eq!(engine.tranche.get_risk_inputs(), (500, 600));
    assert_eq!(
        engine.tranche.try_set_risk_params(300, 10_001, 600),
        Err(SstError::BpsOutOfRange.into())
    );
}
