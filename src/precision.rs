// src/precision.rs
//
// Rescaling between human-readable decimal quantities and integer on-chain
// token units. Token decimals commonly reach 18, where binary floats silently
// lose precision, so all arithmetic here works on the decimal mantissa and
// 256-bit integers.
use crate::domain::errors::{PrecisionError, PrecisionResult};
use alloy_primitives::{I256, U256};
use rust_decimal::Decimal;

// 10^77 overflows a positive I256
const MAX_SHIFT: u32 = 76;

fn pow10(n: u32) -> PrecisionResult<I256> {
    if n > MAX_SHIFT {
        return Err(PrecisionError::OutOfRange("1".to_string(), n));
    }
    Ok(I256::from_raw(U256::from(10u8).pow(U256::from(n))))
}

/// Scales `value` by 10^decimals and truncates toward zero.
pub fn to_token_units(value: Decimal, decimals: u32) -> PrecisionResult<I256> {
    let mantissa = I256::try_from(value.mantissa())
        .map_err(|_| PrecisionError::OutOfRange(value.to_string(), decimals))?;
    let scale = value.scale();

    if decimals >= scale {
        mantissa
            .checked_mul(pow10(decimals - scale)?)
            .ok_or_else(|| PrecisionError::OutOfRange(value.to_string(), decimals))
    } else {
        // Signed division truncates toward zero, discarding sub-unit dust.
        Ok(mantissa / pow10(scale - decimals)?)
    }
}

/// Scales an integer amount of token units down by 10^decimals.
pub fn to_decimal(raw: I256, decimals: u32) -> PrecisionResult<Decimal> {
    let mantissa = i128::try_from(raw)
        .map_err(|_| PrecisionError::OutOfRange(raw.to_string(), decimals))?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map_err(|_| PrecisionError::OutOfRange(raw.to_string(), decimals))
}

/// Parses a raw integer amount as transmitted on the wire (a decimal string
/// of token units) and rescales it to a human-readable value.
pub fn decimal_from_wire(raw: &str, decimals: u32) -> PrecisionResult<Decimal> {
    let parsed: I256 = raw
        .trim()
        .parse()
        .map_err(|_| PrecisionError::InvalidRawAmount(raw.to_string()))?;
    to_decimal(parsed, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scales_up_to_token_units() {
        assert_eq!(
            to_token_units(dec!(1.5), 18).unwrap(),
            I256::try_from(1_500_000_000_000_000_000i128).unwrap()
        );
        assert_eq!(to_token_units(dec!(0.000001), 6).unwrap(), I256::ONE);
        assert_eq!(to_token_units(dec!(-2), 8).unwrap(), I256::try_from(-200_000_000i64).unwrap());
    }

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(to_token_units(dec!(1.23456), 2).unwrap(), I256::try_from(123).unwrap());
        assert_eq!(to_token_units(dec!(-1.23456), 2).unwrap(), I256::try_from(-123).unwrap());
    }

    #[test]
    fn round_trips_at_asset_precision() {
        for (value, decimals) in [
            (dec!(15), 8u32),
            (dec!(0.05668836), 18),
            (dec!(18.35), 6),
            (dec!(2000), 18),
            (dec!(0.000000000000000001), 18),
        ] {
            let raw = to_token_units(value, decimals).unwrap();
            assert_eq!(to_decimal(raw, decimals).unwrap(), value);
        }
    }

    #[test]
    fn parses_wire_amounts() {
        assert_eq!(
            decimal_from_wire("15000000000000000000", 18).unwrap(),
            dec!(15)
        );
        assert_eq!(decimal_from_wire("123", 2).unwrap(), dec!(1.23));
        assert!(decimal_from_wire("not-a-number", 2).is_err());
    }

    #[test]
    fn rejects_values_that_do_not_fit() {
        // 96-bit mantissa limit of rust_decimal
        let raw = I256::try_from(i128::MAX).unwrap();
        assert!(to_decimal(raw * I256::try_from(100).unwrap(), 18).is_err());
    }
}
