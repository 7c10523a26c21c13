//! Fixed-point scale conversion with explicit, truncating precision loss.
//!
//! Grounded on `interledger_settlement::core::scale_with_precision_loss` and
//! its `Convert`/`ConvertDetails` helpers, generalized from that crate's
//! local/remote-scale framing to this spec's explicit from/to framing, and
//! switched from `BigUint` truncating division (which already matches the
//! "never round to nearest" requirement) to a two-scale signature that
//! returns both results in the *source* scale rather than the target one.

use num_bigint::BigUint;
use num_traits::Zero;

/// Describes a scale conversion: interpret a value at `from` digits of
/// precision, re-express it at `to`.
#[derive(Debug, Clone, Copy)]
pub struct ConvertDetails {
    pub from: u8,
    pub to: u8,
}

/// Helper trait for scaling an integer amount between two asset scales.
pub trait Convert: Sized {
    /// Returns the scaled result, or an error if the multiplication overflowed.
    fn normalize_scale(&self, details: ConvertDetails) -> Result<Self, ()>;
}

impl Convert for BigUint {
    fn normalize_scale(&self, details: ConvertDetails) -> Result<Self, ()> {
        let scale_diff = (details.from as i16 - details.to as i16).abs() as u32;
        let scale = BigUint::from(10u8).pow(scale_diff);
        if details.to >= details.from {
            Ok(self * scale)
        } else {
            Ok(self / scale)
        }
    }
}

/// Converts `amount` (interpreted at `from_scale`) to the largest value
/// exactly representable at `to_scale`, returning `(representable, leftover)`
/// both expressed at `from_scale` so the leftover can be summed with the next
/// incoming amount.
///
/// Truncates toward zero; never rounds. When `to_scale >= from_scale` there is
/// no loss and `leftover` is always zero.
///
/// # Examples
/// ```
/// # use ilp_iroha_settlement_engine::scale::scale_with_precision_loss;
/// # use num_bigint::BigUint;
/// assert_eq!(
///     scale_with_precision_loss(BigUint::from(99u32), 3, 2),
///     (BigUint::from(90u32), BigUint::from(9u32))
/// );
/// assert_eq!(
///     scale_with_precision_loss(BigUint::from(100u32), 3, 2),
///     (BigUint::from(100u32), BigUint::from(0u32))
/// );
/// ```
pub fn scale_with_precision_loss(
    amount: BigUint,
    from_scale: u8,
    to_scale: u8,
) -> (BigUint, BigUint) {
    if to_scale >= from_scale {
        return (amount, Zero::zero());
    }
    // Downscale then upscale back; the difference is the truncated remainder,
    // already expressed at from_scale.
    let downscaled = amount
        .normalize_scale(ConvertDetails {
            from: from_scale,
            to: to_scale,
        })
        .expect("downscaling never overflows");
    let upscaled = downscaled
        .normalize_scale(ConvertDetails {
            from: to_scale,
            to: from_scale,
        })
        .expect("upscaling back never overflows for a previously downscaled value");
    let leftover = &amount - &upscaled;
    (upscaled, leftover)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn no_loss_when_upscaling_or_equal_scale() {
        assert_eq!(
            scale_with_precision_loss(big(500), 3, 3),
            (big(500), big(0))
        );
        assert_eq!(
            scale_with_precision_loss(big(500), 3, 9),
            (big(500), big(0))
        );
    }

    #[test]
    fn truncates_toward_zero_on_downscale() {
        assert_eq!(scale_with_precision_loss(big(99), 3, 2), (big(90), big(9)));
        assert_eq!(
            scale_with_precision_loss(big(8053), 9, 12 - 3),
            (big(8000), big(53))
        );
    }

    #[test]
    fn leftover_aggregates_to_a_settleable_whole() {
        let (r1, l1) = scale_with_precision_loss(big(99), 3, 2);
        assert_eq!((r1.clone(), l1.clone()), (big(90), big(9)));
        // next incoming amount of 91 (scale 3) plus the 9 leftover
        let (r2, l2) = scale_with_precision_loss(&l1 + big(91), 3, 2);
        assert_eq!((r2, l2), (big(100), big(0)));
    }

    #[test]
    fn conservation_invariant_holds_for_a_spread_of_inputs() {
        for amount in [0u64, 1, 9, 10, 99, 100, 101, 999, 1000, 123_456].iter() {
            for from in 0u8..=6 {
                for to in 0u8..=6 {
                    let (r, l) = scale_with_precision_loss(big(*amount), from, to);
                    assert_eq!(r + l, big(*amount), "amount={} from={} to={}", amount, from, to);
                }
            }
        }
    }

    #[test]
    fn zero_amount_never_errors() {
        assert_eq!(scale_with_precision_loss(big(0), 5, 2), (big(0), big(0)));
    }
}
