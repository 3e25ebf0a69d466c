use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, Result};

/// Fixed-precision arithmetic for weights and ranks.
///
/// Every operation rounds its result half-up to `precision` significant digits,
/// so sums over many small weights behave the same regardless of how many
/// digits the backing decimal type could carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalContext {
    precision: u32,
}

impl DecimalContext {
    pub const MIN_PRECISION: u32 = 3;
    pub const MAX_PRECISION: u32 = 28;

    pub fn new(precision: u32) -> Result<Self> {
        if !(Self::MIN_PRECISION..=Self::MAX_PRECISION).contains(&precision) {
            return Err(Error::Config(format!(
                "decimal precision must be between {} and {}, got {precision}",
                Self::MIN_PRECISION,
                Self::MAX_PRECISION
            )));
        }
        Ok(Self { precision })
    }

    pub const fn precision(&self) -> u32 {
        self.precision
    }

    pub fn round(&self, value: Decimal) -> Decimal {
        value
            .round_sf_with_strategy(self.precision, RoundingStrategy::MidpointAwayFromZero)
            .unwrap_or(value)
    }

    pub fn add(&self, a: Decimal, b: Decimal) -> Decimal {
        self.round(a + b)
    }

    pub fn sub(&self, a: Decimal, b: Decimal) -> Decimal {
        self.round(a - b)
    }

    pub fn mul(&self, a: Decimal, b: Decimal) -> Decimal {
        self.round(a * b)
    }

    /// Returns `None` when dividing by zero.
    pub fn div(&self, a: Decimal, b: Decimal) -> Option<Decimal> {
        a.checked_div(b).map(|q| self.round(q))
    }

    /// Tolerance for comparing a sum of rounded values against its exact target.
    pub fn epsilon(&self) -> Decimal {
        Decimal::new(1, self.precision - 2)
    }
}

impl Default for DecimalContext {
    fn default() -> Self {
        Self { precision: 9 }
    }
}
