//! Domain-validated scalar values used by the GPX models.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// A decimal number that remembers the digits it was written with.
///
/// Arithmetic goes through the `f64` value; serialization reproduces the
/// original text so `52.5200` stays `52.5200` on output. Equality and
/// ordering are numeric.
#[derive(Debug, Clone)]
pub struct Decimal {
    value: f64,
    repr: String,
}

impl Decimal {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }

    /// Rounds to `digits` decimal places, dropping trailing zeros.
    pub fn round(&self, digits: u32) -> Decimal {
        let text = format!("{:.*}", digits as usize, self.value);
        let text = if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            text
        };
        let text = if text == "-0" { "0".to_string() } else { text };
        let value = text.parse().unwrap_or(self.value);
        Decimal { value, repr: text }
    }
}

fn is_decimal_literal(s: &str) -> bool {
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(idx) => (&s[..idx], Some(&s[idx + 1..])),
        None => (s, None),
    };
    let mut digits = 0;
    let mut dots = 0;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return false,
        }
    }
    if digits == 0 || dots > 1 {
        return false;
    }
    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit())
        }
    }
}

impl FromStr for Decimal {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if !is_decimal_literal(trimmed) {
            return Err(ValueError::InvalidDecimal(s.to_string()));
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| ValueError::InvalidDecimal(s.to_string()))?;
        if !value.is_finite() {
            return Err(ValueError::InvalidDecimal(s.to_string()));
        }
        Ok(Decimal {
            value,
            repr: trimmed.to_string(),
        })
    }
}

impl TryFrom<f64> for Decimal {
    type Error = ValueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ValueError::InvalidDecimal(value.to_string()));
        }
        Ok(Decimal {
            value,
            repr: value.to_string(),
        })
    }
}

impl From<i32> for Decimal {
    fn from(value: i32) -> Self {
        Decimal {
            value: f64::from(value),
            repr: value.to_string(),
        }
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

macro_rules! bounded_decimal {
    ($(#[$meta:meta])* $name:ident, $err:ident, |$v:ident| $check:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, PartialOrd)]
        pub struct $name(Decimal);

        impl $name {
            fn check(decimal: Decimal, raw: &str) -> Result<Self, ValueError> {
                let $v = decimal.value();
                if $check {
                    Ok(Self(decimal))
                } else {
                    Err(ValueError::$err(raw.to_string()))
                }
            }

            pub fn value(&self) -> f64 {
                self.0.value()
            }

            pub fn as_decimal(&self) -> &Decimal {
                &self.0
            }

            pub fn round(&self, digits: u32) -> Self {
                Self(self.0.round(digits))
            }
        }

        impl FromStr for $name {
            type Err = ValueError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let decimal: Decimal = s.parse().map_err(|_| ValueError::$err(s.to_string()))?;
                Self::check(decimal, s)
            }
        }

        impl TryFrom<f64> for $name {
            type Error = ValueError;

            fn try_from(value: f64) -> Result<Self, Self::Error> {
                let decimal =
                    Decimal::try_from(value).map_err(|_| ValueError::$err(value.to_string()))?;
                Self::check(decimal, &value.to_string())
            }
        }

        impl TryFrom<Decimal> for $name {
            type Error = ValueError;

            fn try_from(decimal: Decimal) -> Result<Self, Self::Error> {
                let raw = decimal.to_string();
                Self::check(decimal, &raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

bounded_decimal!(
    /// WGS84 latitude in decimal degrees, inclusive range [-90, 90].
    Latitude,
    InvalidLatitude,
    |v| (-90.0..=90.0).contains(&v)
);

bounded_decimal!(
    /// WGS84 longitude in decimal degrees, inclusive range [-180, 180].
    Longitude,
    InvalidLongitude,
    |v| (-180.0..=180.0).contains(&v)
);

bounded_decimal!(
    /// Bearing, heading or course in degrees, range [0, 360).
    Degrees,
    InvalidDegrees,
    |v| (0.0..360.0).contains(&v)
);

/// Type of GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fix {
    None,
    TwoD,
    ThreeD,
    Dgps,
    Pps,
}

impl Fix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fix::None => "none",
            Fix::TwoD => "2d",
            Fix::ThreeD => "3d",
            Fix::Dgps => "dgps",
            Fix::Pps => "pps",
        }
    }
}

impl FromStr for Fix {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Fix::None),
            "2d" => Ok(Fix::TwoD),
            "3d" => Ok(Fix::ThreeD),
            "dgps" => Ok(Fix::Dgps),
            "pps" => Ok(Fix::Pps),
            other => Err(ValueError::InvalidFix(other.to_string())),
        }
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Differential GPS station id, 0 through 1023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DgpsStation(u16);

impl DgpsStation {
    pub const MAX: u16 = 1023;

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for DgpsStation {
    type Error = ValueError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(DgpsStation(value as u16))
        } else {
            Err(ValueError::InvalidDgpsStation(value.to_string()))
        }
    }
}

impl FromStr for DgpsStation {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ValueError::InvalidDgpsStation(s.to_string()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for DgpsStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
