use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::{Serialize, Serializer};

// Exponents outside this range are read as symbols rather than numbers.
const MAX_EXPONENT: i64 = 4096;

/// An exact number: an arbitrary precision rational.
///
/// Literals such as `0.1` are read exactly, so `(+ 0.1 0.2)` is `0.3` and
/// large integer results (`fib(100)`) never lose digits.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Number(BigRational);

impl Number {
    pub fn zero() -> Number { Number(BigRational::zero()) }

    pub fn one() -> Number { Number(BigRational::one()) }

    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    pub fn is_integer(&self) -> bool { self.0.is_integer() }

    /// `None` when dividing by zero.
    pub fn checked_div(&self, rhs: &Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        Some(Number(&self.0 / &rhs.0))
    }

    /// Parses `12`, `-3.25`, `1e3`, `6.02e-2` and `1/3` style literals.
    pub fn parse(text: &str) -> Option<Number> {
        let (negative, unsigned) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };

        let value = match unsigned.split_once('/') {
            Some((numer, denom)) => {
                let numer = parse_digits(numer)?;
                let denom = parse_digits(denom)?;
                if denom.is_zero() {
                    return None;
                }
                BigRational::new(numer, denom)
            }
            None => parse_decimal(unsigned)?,
        };

        Some(Number(if negative { -value } else { value }))
    }

    /// Number of decimal places needed to print the value exactly, if finite.
    fn decimal_places(&self) -> Option<usize> {
        let two = BigInt::from(2);
        let five = BigInt::from(5);
        let mut denom = self.0.denom().clone();
        let (mut twos, mut fives) = (0usize, 0usize);
        while (&denom % &two).is_zero() {
            denom /= &two;
            twos += 1;
        }
        while (&denom % &five).is_zero() {
            denom /= &five;
            fives += 1;
        }
        if denom.is_one() {
            Some(twos.max(fives))
        } else {
            None
        }
    }
}

fn parse_digits(text: &str) -> Option<BigInt> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_decimal(text: &str) -> Option<BigRational> {
    let (mantissa, exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => (&text[..i], text[i + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits: BigInt = format!("{}{}", int_part, frac_part).parse().ok()?;
    let scale = exponent.checked_sub(frac_part.len() as i64)?;
    if scale.unsigned_abs() > MAX_EXPONENT.unsigned_abs() {
        return None;
    }
    let factor = BigRational::from_integer(num_traits::pow(BigInt::from(10), scale.unsigned_abs() as usize));
    let value = BigRational::from_integer(digits);
    Some(if scale >= 0 { value * factor } else { value / factor })
}

macro_rules! number_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Number {
            fn from(value: $t) -> Number { Number(BigRational::from_integer(BigInt::from(value))) }
        }
    )*};
}

number_from_int!(i32, i64, usize);

impl Add for Number {
    type Output = Number;

    fn add(self, rhs: Number) -> Number { Number(self.0 + rhs.0) }
}

impl Sub for Number {
    type Output = Number;

    fn sub(self, rhs: Number) -> Number { Number(self.0 - rhs.0) }
}

impl Mul for Number {
    type Output = Number;

    fn mul(self, rhs: Number) -> Number { Number(self.0 * rhs.0) }
}

impl Neg for Number {
    type Output = Number;

    fn neg(self) -> Number { Number(-self.0) }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_integer() {
            return write!(f, "{}", self.0.numer());
        }
        match self.decimal_places() {
            Some(places) => {
                let scaled = (self.0.numer() * num_traits::pow(BigInt::from(10), places)) / self.0.denom();
                let digits = scaled.abs().to_string();
                let digits = format!("{:0>width$}", digits, width = places + 1);
                let (int_part, frac_part) = digits.split_at(digits.len() - places);
                let sign = if scaled.is_negative() { "-" } else { "" };
                write!(f, "{}{}.{}", sign, int_part, frac_part)
            }
            None => write!(f, "{}/{}", self.0.numer(), self.0.denom()),
        }
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
