//! One-sided price tolerance applied to submitted prices
//!
//! The program fills at the oracle price as long as it is no worse than the
//! submitted bound, so the bound is the quote moved against the owner by the
//! tolerance. All math is integer (u128 intermediate, floor division).

use crate::tx_builder::errors::TransactionBuilderError;
use crate::types::Side;

pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default tolerance: 100 bps, i.e. open price = quote × 10000 / 9900
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlippageTolerance {
    bps: u16,
}

impl Default for SlippageTolerance {
    fn default() -> Self {
        Self {
            bps: DEFAULT_SLIPPAGE_BPS,
        }
    }
}

impl SlippageTolerance {
    pub fn new(bps: u16) -> Result<Self, TransactionBuilderError> {
        if u64::from(bps) >= BPS_DENOMINATOR {
            return Err(TransactionBuilderError::Configuration(format!(
                "slippage of {} bps leaves no price band",
                bps
            )));
        }
        Ok(Self { bps })
    }

    pub fn bps(&self) -> u16 {
        self.bps
    }

    /// Price cap submitted with an open: `price × 10000 / (10000 − bps)`.
    /// Never below `price`.
    pub fn open_price(&self, price: u64) -> Result<u64, TransactionBuilderError> {
        self.inflate(price)
    }

    /// Price bound submitted with a close: longs accept down to
    /// `price × (10000 − bps) / 10000`, shorts up to the inflated cap.
    pub fn close_price(&self, price: u64, side: Side) -> Result<u64, TransactionBuilderError> {
        match side {
            Side::Long => Ok(self.deflate(price)),
            Side::Short => self.inflate(price),
        }
    }

    fn inflate(&self, price: u64) -> Result<u64, TransactionBuilderError> {
        let scaled = u128::from(price) * u128::from(BPS_DENOMINATOR)
            / u128::from(BPS_DENOMINATOR - u64::from(self.bps));
        u64::try_from(scaled).map_err(|_| {
            TransactionBuilderError::PriceOutOfRange(format!(
                "{} with {} bps tolerance exceeds u64",
                price, self.bps
            ))
        })
    }

    fn deflate(&self, price: u64) -> u64 {
        // result <= price, fits u64
        (u128::from(price) * u128::from(BPS_DENOMINATOR - u64::from(self.bps))
            / u128::from(BPS_DENOMINATOR)) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_open_price_factor() {
        let slippage = SlippageTolerance::default();
        assert_eq!(slippage.open_price(9_900).unwrap(), 10_000);
        assert_eq!(slippage.open_price(100_000_000).unwrap(), 101_010_101);
        assert_eq!(slippage.open_price(0).unwrap(), 0);
    }

    #[test]
    fn test_close_price_direction() {
        let slippage = SlippageTolerance::default();
        assert_eq!(slippage.close_price(10_000, Side::Long).unwrap(), 9_900);
        assert_eq!(slippage.close_price(9_900, Side::Short).unwrap(), 10_000);
    }

    #[test]
    fn test_invalid_bps_rejected() {
        assert!(SlippageTolerance::new(10_000).is_err());
        assert!(SlippageTolerance::new(9_999).is_ok());
        assert_eq!(SlippageTolerance::new(0).unwrap().open_price(42).unwrap(), 42);
    }

    #[test]
    fn test_overflow_reported() {
        let err = SlippageTolerance::default().open_price(u64::MAX).unwrap_err();
        assert!(matches!(err, TransactionBuilderError::PriceOutOfRange(_)));
    }

    proptest! {
        #[test]
        fn prop_open_price_matches_formula(price in 0u64..(u64::MAX / 2)) {
            let submitted = SlippageTolerance::default().open_price(price).unwrap();
            prop_assert_eq!(u128::from(submitted), u128::from(price) * 10_000 / 9_900);
            prop_assert!(submitted >= price);
        }

        #[test]
        fn prop_long_close_never_above_quote(price in any::<u64>(), bps in 0u16..10_000) {
            let slippage = SlippageTolerance::new(bps).unwrap();
            prop_assert!(slippage.close_price(price, Side::Long).unwrap() <= price);
        }
    }
}
