use std::{cmp::Ordering, fmt::Display, str::FromStr};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("`{literal}` is not a decimal number")]
pub struct ParseDecimalError {
    pub literal: String,
}

/// How a quotient is cut down to the configured number of fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundingMode {
    /// Ties go away from zero: `0.125` -> `0.13`.
    #[default]
    HalfUp,
    /// Ties go to the even neighbour: `0.125` -> `0.12`.
    HalfEven,
    /// Drop the remainder: `0.129` -> `0.12`.
    Down,
}

/// Arbitrary precision base-10 number: `unscaled * 10^-scale`.
#[derive(Debug, Clone)]
pub struct Decimal {
    unscaled: BigInt,
    scale: u32,
}

fn pow10(n: u32) -> BigInt {
    BigInt::from(10).pow(n)
}

impl Decimal {
    pub fn new(unscaled: impl Into<BigInt>, scale: u32) -> Self {
        Decimal {
            unscaled: unscaled.into(),
            scale,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.unscaled.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.unscaled.is_negative()
    }

    /// Same value, expressed with `scale` fraction digits. Only widens.
    fn rescaled(&self, scale: u32) -> BigInt {
        debug_assert!(scale >= self.scale);
        &self.unscaled * pow10(scale - self.scale)
    }

    pub fn add(&self, rhs: &Decimal) -> Decimal {
        let scale = self.scale.max(rhs.scale);
        Decimal::new(self.rescaled(scale) + rhs.rescaled(scale), scale)
    }

    pub fn sub(&self, rhs: &Decimal) -> Decimal {
        let scale = self.scale.max(rhs.scale);
        Decimal::new(self.rescaled(scale) - rhs.rescaled(scale), scale)
    }

    pub fn mul(&self, rhs: &Decimal) -> Decimal {
        Decimal::new(&self.unscaled * &rhs.unscaled, self.scale + rhs.scale)
    }

    /// Quotient rounded to `scale` fraction digits, with trailing zeros
    /// stripped. `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Decimal, scale: u32, rounding: RoundingMode) -> Option<Decimal> {
        if rhs.is_zero() {
            return None;
        }

        // self / rhs * 10^scale == (a * 10^(scale + rhs.scale)) / (b * 10^self.scale)
        let numerator = &self.unscaled * pow10(scale + rhs.scale);
        let denominator = &rhs.unscaled * pow10(self.scale);

        let mut quotient = &numerator / &denominator;
        let remainder = &numerator % &denominator;

        if !remainder.is_zero() {
            let twice = remainder.abs() * 2u32;
            let half = twice.cmp(&denominator.abs());
            let round_away = match rounding {
                RoundingMode::Down => false,
                RoundingMode::HalfUp => half != Ordering::Less,
                RoundingMode::HalfEven => match half {
                    Ordering::Greater => true,
                    Ordering::Equal => !(&quotient % 2u32).is_zero(),
                    Ordering::Less => false,
                },
            };
            if round_away {
                if numerator.is_negative() != denominator.is_negative() {
                    quotient -= 1u32;
                } else {
                    quotient += 1u32;
                }
            }
        }

        Some(Decimal::new(quotient, scale).normalized())
    }

    /// Strips trailing fractional zeros: `2.500` -> `2.5`, `5.00` -> `5`.
    pub fn normalized(mut self) -> Decimal {
        let ten = BigInt::from(10);
        while self.scale > 0 && (&self.unscaled % &ten).is_zero() {
            self.unscaled /= &ten;
            self.scale -= 1;
        }
        self
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts `12`, `1.5`, `1.`, `.5` and a leading `-`. Rejects a lone `.`,
    /// several points, and anything that is not an ASCII digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError {
            literal: s.to_string(),
        };

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(err());
        }

        let digits = format!("{int_part}{frac_part}");
        let mut unscaled = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(err)?;
        if negative {
            unscaled = -unscaled;
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| err())?;

        Ok(Decimal { unscaled, scale })
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.unscaled.abs().to_str_radix(10);
        let sign = if self.is_negative() { "-" } else { "" };
        let scale = self.scale as usize;

        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }

        let digits = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits
        };
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        self.rescaled(scale).cmp(&other.rescaled(scale))
    }
}
