//! Types library for the claim vault
//!
//! Identifier and amount types shared by the vault contract logic and any
//! host that embeds it.
//!
//! # Modules
//! - `ids`: Addresses of holders, custodians, operators and the vault itself
//! - `numeric`: Integer token amounts and unit constants

pub mod ids;
pub mod numeric;
