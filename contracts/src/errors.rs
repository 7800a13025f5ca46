//! Protocol error definitions.
//!
//! Codes are grouped by kind so off-chain monitors can branch on the range
//! alone: validation (1xx), authorization (2xx), state conflict (3xx),
//! staleness / quorum (4xx) and capacity (5xx).

use odra::prelude::*;

/// Broad class of a protocol error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    Validation,
    Authorization,
    StateConflict,
    StalenessOrQuorum,
    Capacity,
}

/// Engine errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SstError {
    // Validation errors (1xx)
    InvalidAmount = 100,
    UnknownSovereign = 101,
    SovereignExists = 102,
    BpsOutOfRange = 103,
    ParamOutOfBounds = 104,
    InvalidDetachment = 105,
    InvalidNav = 106,
    InvalidSignerSet = 107,
    InvalidConfig = 108,
    WeightsExceedTotal = 109,
    NotMember = 110,
    SovereignDisabled = 111,
    NotConfigured = 112,

    // Authorization errors (2xx)
    Unauthorized = 200,
    LastAdmin = 201,

    // State conflict errors (3xx)
    CooldownActive = 300,
    PendingRatification = 301,
    NoPendingRatification = 302,
    RatificationExpired = 303,
    WindowFinalizedAlready = 304,
    AlreadyClaimed = 305,
    WindowNotReady = 306,
    WindowNotFound = 307,
    Reentrancy = 308,
    RaiseTooSoon = 309,
    IssuanceLocked = 310,
    AlreadyVoted = 311,
    ExpansionNotAllowed = 312,
    NothingToClaim = 313,
    IssuanceHalted = 314,

    // Staleness / quorum errors (4xx)
    StaleOrReplay = 400,
    QuorumNotMet = 401,
    DuplicateSignature = 402,
    OracleStale = 403,
    NavUnavailable = 404,
    NavJumpTooLarge = 405,

    // Capacity errors (5xx)
    CapExceeded = 500,
    BufferUnhealthy = 501,
    SovereignHardCapExceeded = 502,
    SovereignCapacityExceeded = 503,
    TailCorrelationTooHigh = 504,
    InsufficientBuffer = 505,
    InsufficientBalance = 506,
    InsufficientAllowance = 507,
}

impl SstError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Validation
            SstError::InvalidAmount => "Invalid amount",
            SstError::UnknownSovereign => "Unknown sovereign code",
            SstError::SovereignExists => "Sovereign already registered",
            SstError::BpsOutOfRange => "Basis points out of range",
            SstError::ParamOutOfBounds => "Parameter out of bounds",
            SstError::InvalidDetachment => "Invalid detachment value",
            SstError::InvalidNav => "Invalid NAV submission",
            SstError::InvalidSignerSet => "Invalid signer set or quorum",
            SstError::InvalidConfig => "Invalid configuration",
            SstError::WeightsExceedTotal => "Priority weights exceed 10000 bps",
            SstError::NotMember => "Account is not an allow-listed member",
            SstError::SovereignDisabled => "Sovereign is disabled",
            SstError::NotConfigured => "Collaborator address not configured",

            // Authorization
            SstError::Unauthorized => "Unauthorized: missing capability",
            SstError::LastAdmin => "Cannot remove the last admin",

            // State conflict
            SstError::CooldownActive => "Cooldown still active",
            SstError::PendingRatification => "Detachment raise pending ratification",
            SstError::NoPendingRatification => "No detachment raise pending",
            SstError::RatificationExpired => "Ratification window expired",
            SstError::WindowFinalizedAlready => "Window already finalized",
            SstError::AlreadyClaimed => "Window payout already claimed",
            SstError::WindowNotReady => "Window strike not reached",
            SstError::WindowNotFound => "Window has no requests",
            SstError::Reentrancy => "Reentrant call rejected",
            SstError::RaiseTooSoon => "Detachment raise spacing not elapsed",
            SstError::IssuanceLocked => "Issuance manually locked",
            SstError::AlreadyVoted => "Caller already voted in this round",
            SstError::ExpansionNotAllowed => "Emergency expansion preconditions not met",
            SstError::NothingToClaim => "No request in window for caller",
            SstError::IssuanceHalted => "Issuance halted at emergency level RED",

            // Staleness / quorum
            SstError::StaleOrReplay => "NAV update stale or replayed",
            SstError::QuorumNotMet => "Signature quorum not met",
            SstError::DuplicateSignature => "Signer appears more than once",
            SstError::OracleStale => "Oracle data not fresh enough",
            SstError::NavUnavailable => "NAV unavailable",
            SstError::NavJumpTooLarge => "NAV jump exceeds bound",

            // Capacity
            SstError::CapExceeded => "Super-senior cap exceeded",
            SstError::BufferUnhealthy => "Liquidity buffer below target",
            SstError::SovereignHardCapExceeded => "Sovereign utilization above hard cap",
            SstError::SovereignCapacityExceeded => "Sovereign damped capacity exceeded",
            SstError::TailCorrelationTooHigh => "Tail correlation above limit",
            SstError::InsufficientBuffer => "Instant buffer insufficient",
            SstError::InsufficientBalance => "Insufficient token balance",
            SstError::InsufficientAllowance => "Insufficient token allowance",
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match (*self as u16) / 100 {
            1 => ErrorKind::Validation,
            2 => ErrorKind::Authorization,
            3 => ErrorKind::StateConflict,
            4 => ErrorKind::StalenessOrQuorum,
            _ => ErrorKind::Capacity,
        }
    }
}

impl core::fmt::Display for SstError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<SstError> for OdraError {
    fn from(error: SstError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}
