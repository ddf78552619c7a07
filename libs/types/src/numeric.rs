//! Integer token amounts
//!
//! Claim tokens and the reference asset are both counted in indivisible base
//! units. The vault exchanges them 1:1, so no decimal arithmetic is needed.

/// Amount of base units of either the claim token or the reference asset.
pub type Amount = u128;

/// Decimals of the wrapped-BTC reference asset (1 BTC = 10^8 sats).
pub const BTC_DECIMALS: u8 = 8;

/// One whole BTC in base units.
pub const ONE_BTC: Amount = 100_000_000;

/// Default deposit ceiling used when none is configured: 2^52 base units.
pub const DEFAULT_MAX_DEPOSIT: Amount = 1 << 52;

/// Convert whole BTC into base units, returning `None` on overflow.
pub fn btc(whole: u64) -> Option<Amount> {
    (whole as Amount).checked_mul(ONE_BTC)
}
