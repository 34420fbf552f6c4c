//! # Trust Arithmetic
//!
//! Trust weights and quorum proportions are configured as decimals but held
//! as integer millionths, so sums and threshold comparisons are exact: a
//! claim carrying exactly `proportion × baseline` trust meets the threshold.
//!
//! A threshold is the product of a proportion and a weight, kept at
//! millionths-squared precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use thiserror::Error;

/// Fixed-point units per whole trust (six decimal places).
pub const TRUST_SCALE: u64 = 1_000_000;

/// Largest whole value accepted for a weight or a proportion.
pub const MAX_TRUST: f64 = 1e12;

/// A configured decimal that is not a usable trust value.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{value} is not a valid trust value (must be finite, non-negative and at most {max})", max = MAX_TRUST)]
pub struct InvalidTrustValue {
    pub value: f64,
}

fn to_units(value: f64) -> Result<u64, InvalidTrustValue> {
    if !value.is_finite() || value < 0.0 || value > MAX_TRUST {
        return Err(InvalidTrustValue { value });
    }
    Ok((value * TRUST_SCALE as f64).round() as u64)
}

fn write_fixed(f: &mut fmt::Formatter<'_>, value: u128, scale: u128, digits: usize) -> fmt::Result {
    let whole = value / scale;
    let fraction = value % scale;
    if fraction == 0 {
        return write!(f, "{whole}");
    }
    let fraction = format!("{fraction:0digits$}");
    write!(f, "{whole}.{}", fraction.trim_end_matches('0'))
}

// =============================================================================
// TRUST WEIGHT
// =============================================================================

/// Trust carried by a node, or aggregated over several nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct TrustWeight(u64);

impl TrustWeight {
    pub const ZERO: Self = Self(0);

    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// A whole number of trust.
    pub const fn whole(trust: u64) -> Self {
        Self(trust.saturating_mul(TRUST_SCALE))
    }

    pub fn units(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Lossy rendering for gauges.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / TRUST_SCALE as f64
    }
}

impl TryFrom<f64> for TrustWeight {
    type Error = InvalidTrustValue;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        to_units(value).map(Self)
    }
}

impl From<TrustWeight> for f64 {
    fn from(weight: TrustWeight) -> Self {
        weight.as_f64()
    }
}

impl Add for TrustWeight {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl AddAssign for TrustWeight {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for TrustWeight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for TrustWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0 as u128, TRUST_SCALE as u128, 6)
    }
}

// =============================================================================
// QUORUM PROPORTION
// =============================================================================

/// Share of trust that must agree on a transaction.
///
/// Any non-negative decimal parses; `GatewayConfig::validate` restricts the
/// usable range to a strict majority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct QuorumProportion(u64);

impl QuorumProportion {
    pub const HALF: Self = Self(TRUST_SCALE / 2);
    pub const ONE: Self = Self(TRUST_SCALE);

    /// Proportion in millionths (`510_000` is 0.51).
    pub const fn from_millionths(millionths: u64) -> Self {
        Self(millionths)
    }

    pub fn millionths(self) -> u64 {
        self.0
    }

    /// The trust `baseline` must be matched by to reach this proportion.
    pub fn of(self, baseline: TrustWeight) -> TrustThreshold {
        TrustThreshold(self.0 as u128 * baseline.0 as u128)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / TRUST_SCALE as f64
    }
}

impl TryFrom<f64> for QuorumProportion {
    type Error = InvalidTrustValue;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        to_units(value).map(Self)
    }
}

impl From<QuorumProportion> for f64 {
    fn from(proportion: QuorumProportion) -> Self {
        proportion.as_f64()
    }
}

impl fmt::Display for QuorumProportion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0 as u128, TRUST_SCALE as u128, 6)
    }
}

// =============================================================================
// THRESHOLD
// =============================================================================

const THRESHOLD_SCALE: u128 = TRUST_SCALE as u128 * TRUST_SCALE as u128;

/// Trust required for quorum, exact to the product of its inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrustThreshold(u128);

impl TrustThreshold {
    pub const ZERO: Self = Self(0);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `trust >= threshold`, compared exactly.
    pub fn is_met_by(self, trust: TrustWeight) -> bool {
        trust.0 as u128 * TRUST_SCALE as u128 >= self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / THRESHOLD_SCALE as f64
    }
}

impl fmt::Display for TrustThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fixed(f, self.0, THRESHOLD_SCALE, 12)
    }
}
