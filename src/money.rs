use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

const ZERO_DECIMAL: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];
const THREE_DECIMAL: &[&str] = &["BHD", "JOD", "KWD", "OMR", "TND"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("amount {0} does not fit the gateway's native representation")]
    Overflow(Decimal),
}

/// How a gateway wants amounts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyFormat {
    /// Integer count of the currency's smallest unit, e.g. cents.
    MinorUnits { exponent: u32 },
    /// Decimal amount passed through unchanged.
    MajorUnits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAmount {
    Minor(i64),
    Major(Decimal),
}

pub fn minor_unit_exponent(currency: &str) -> u32 {
    let upper = currency.to_ascii_uppercase();
    if ZERO_DECIMAL.contains(&upper.as_str()) {
        0
    } else if THREE_DECIMAL.contains(&upper.as_str()) {
        3
    } else {
        2
    }
}

impl MoneyFormat {
    pub fn minor_units_for(currency: &str) -> Self {
        MoneyFormat::MinorUnits {
            exponent: minor_unit_exponent(currency),
        }
    }

    /// Digits beyond the minor unit are truncated toward zero.
    pub fn format(self, amount: Decimal) -> Result<NativeAmount, AmountError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AmountError::Negative(amount));
        }
        match self {
            MoneyFormat::MajorUnits => Ok(NativeAmount::Major(amount)),
            MoneyFormat::MinorUnits { exponent } => {
                let factor = Decimal::from(10_i64.pow(exponent));
                amount
                    .checked_mul(factor)
                    .and_then(|scaled| scaled.trunc().to_i64())
                    .map(NativeAmount::Minor)
                    .ok_or(AmountError::Overflow(amount))
            }
        }
    }

    pub fn to_decimal(self, native: NativeAmount) -> Decimal {
        match (self, native) {
            (_, NativeAmount::Major(d)) => d,
            (MoneyFormat::MinorUnits { exponent }, NativeAmount::Minor(v)) => Decimal::new(v, exponent),
            (MoneyFormat::MajorUnits, NativeAmount::Minor(v)) => Decimal::from(v),
        }
    }

    pub fn minor_to_decimal(self, minor: i64) -> Decimal {
        self.to_decimal(NativeAmount::Minor(minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cents_round_trip_exactly() {
        let usd = MoneyFormat::minor_units_for("usd");
        for amount in [dec!(0), dec!(0.01), dec!(19.99), dec!(10.00), dec!(123456.78)] {
            let native = usd.format(amount).unwrap();
            assert_eq!(usd.to_decimal(native), amount);
        }
        assert_eq!(usd.format(dec!(19.99)).unwrap(), NativeAmount::Minor(1999));
    }

    #[test]
    fn truncates_below_minor_unit() {
        let usd = MoneyFormat::minor_units_for("USD");
        assert_eq!(usd.format(dec!(10.019)).unwrap(), NativeAmount::Minor(1001));
    }

    #[test]
    fn exponent_follows_currency() {
        assert_eq!(MoneyFormat::minor_units_for("JPY").format(dec!(500)).unwrap(), NativeAmount::Minor(500));
        assert_eq!(MoneyFormat::minor_units_for("KWD").format(dec!(1.234)).unwrap(), NativeAmount::Minor(1234));
        assert_eq!(MoneyFormat::minor_units_for("INR").minor_to_decimal(12345), dec!(123.45));
    }

    #[test]
    fn major_units_pass_through() {
        let f = MoneyFormat::MajorUnits;
        assert_eq!(f.format(dec!(19.99)).unwrap(), NativeAmount::Major(dec!(19.99)));
        assert_eq!(f.to_decimal(NativeAmount::Major(dec!(19.99))), dec!(19.99));
    }

    #[test]
    fn rejects_negative_and_overflowing_amounts() {
        let usd = MoneyFormat::minor_units_for("USD");
        assert_eq!(usd.format(dec!(-1)), Err(AmountError::Negative(dec!(-1))));
        assert!(matches!(usd.format(Decimal::MAX), Err(AmountError::Overflow(_))));
    }
}
