//! Roles and the allow-listed token.

use pretty_assertions::assert_eq;

use sst_contracts::access_control::{ROLE_ADMIN, ROLE_COUNT, ROLE_OPERATOR, ROLE_PROTOCOL};
use sst_contracts::errors::SstError;

use crate::fixture::{tokens, usdc, Engine};

// ===== Access Control =====

#[test]
fn test_role_management() {
    let mut engine = Engine::setup();
    let account = engine.holders[0];

    assert!(engine.access_control.has_role(ROLE_ADMIN, engine.admin));
    assert_eq!(engine.access_control.get_role_member_count(ROLE_ADMIN), 1);
    assert_eq!(engine.access_control.get_role_member_count(ROLE_PROTOCOL), 2);

    engine.env.set_caller(engine.admin);
    engine.access_control.grant_role(ROLE_OPERATOR, account);
    assert!(engine.access_control.has_role(ROLE_OPERATOR, account));
    assert!(engine.env.emitted(&engine.access_control, "RoleGranted"));

    engine.access_control.revoke_role(ROLE_OPERATOR, account);
    assert!(!engine.access_control.has_role(ROLE_OPERATOR, account));

    assert_eq!(
        engine.access_control.try_grant_role(ROLE_COUNT, account),
        Err(SstError::InvalidConfig.into())
    );
}

#[test]
fn test_only_admin_grants() {
    let mut engine = Engine::setup();
    let account = engine.holders[0];
    engine.env.set_caller(account);
    assert_eq!(
        engine.access_control.try_grant_role(ROLE_OPERATOR, account),
        Err(SstError::Unauthorized.into())
    );
}

#[test]
fn test_last_admin_cannot_leave() {
    let mut engine = Engine::setup();
    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.access_control.try_renounce_role(ROLE_ADMIN),
        Err(SstError::LastAdmin.into())
    );
    assert_eq!(
        engine.access_control.try_revoke_role(ROLE_ADMIN, engine.admin),
        Err(SstError::LastAdmin.into())
    );

    let second = engine.holders[1];
    engine.access_control.grant_role(ROLE_ADMIN, second);
    engine.access_control.renounce_role(ROLE_ADMIN);
    assert!(!engine.access_control.has_role(ROLE_ADMIN, engine.admin));
    assert_eq!(engine.access_control.get_role_member_count(ROLE_ADMIN), 1);
}

// ===== Token =====

#[test]
fn test_token_metadata() {
    let engine = Engine::setup();
    assert_eq!(engine.token.name().as_str(), "Super Senior Token");
    assert_eq!(engine.token.symbol().as_str(), "SST");
    assert_eq!(engine.token.decimals(), 18);
}

#[test]
fn test_transfers_stay_inside_allow_list() {
    let mut engine = Engine::setup();
    let (a, b) = (engine.holders[0], engine.holders[1]);
    let outsider = engine.signers[0];
    engine.mint(a, usdc(100));

    engine.env.set_caller(a);
    engine.token.transfer(b, tokens(40));
    assert_eq!(engine.token.balance_of(b), tokens(40));
    assert_eq!(
        engine.token.try_transfer(outsider, tokens(1)),
        Err(SstError::NotMember.into())
    );
    assert_eq!(
        engine.token.try_transfer(b, tokens(61)),
        Err(SstError::InsufficientBalance.into())
    );

    engine.token.approve(b, tokens(10));
    engine.env.set_caller(b);
    // Balance covers it, allowance does not
    assert_eq!(
        engine.token.try_transfer_from(a, b, tokens(11)),
        Err(SstError::InsufficientAllowance.into())
    );
    engine.token.transfer_from(a, b, tokens(10));
    assert_eq!(engine.token.balance_of(a), tokens(50));
    assert_eq!(engine.token.allowance(a, b), tokens(0));
}

#[test]
fn test_only_engine_mints() {
    let mut engine = Engine::setup();
    let holder = engine.holders[0];

    engine.env.set_caller(engine.admin);
    assert_eq!(
        engine.token.try_mint(holder, tokens(1)),
        Err(SstError::Unauthorized.into())
    );

    engine.token.set_member(holder, false);
    assert!(!engine.token.is_member(holder));

    engine.env.set_caller(holder);
    assert_eq!(
        engine.token.try_set_member(holder, true),
        Err(SstError::Unauthorized.into())
    );
}
