//! Super-Senior Token Contracts
//!
//! Adaptive issuance and redemption engine for the super-senior tranche of a
//! securitization, priced by a signed NAV feed.
//!
//! ## Architecture
//!
//! - **AccessControl**: Role registry shared by every contract
//! - **NavOracle**: Quorum-signed NAV with freshness degradation and emergency override
//! - **ConfigRegistry**: Emergency level, tunable parameters, sovereign capacity table
//! - **TrancheManager**: Detachment point with ratification, cooldown and RED expansion
//! - **BufferCoordinator**: Pre-tranche and instant buffer balances, health checks
//! - **IssuanceController**: Gated minting against USDC funding, trigger cap cuts
//! - **RedemptionQueue**: Instant lane plus monthly pro-rata windows
//! - **SuperSeniorToken**: Allow-listed fungible token minted and burned by the engine
//!
//! ## Emergency Levels
//!
//! GREEN / YELLOW / ORANGE / RED select buffer targets, issuance throttles and
//! price bands from the registry. At RED:
//! - Blocked: all issuance
//! - Allowed: redemptions, window settlement, detachment expansion (with a
//!   confirmed sovereign guarantee)

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod events;
pub mod math;

// Contract modules
pub mod access_control;
pub mod config_registry;
pub mod nav_oracle;
pub mod tranche_manager;
pub mod buffer_coordinator;
pub mod issuance_controller;
pub mod redemption_queue;
pub mod sst_token;
