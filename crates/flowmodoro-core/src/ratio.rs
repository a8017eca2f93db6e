//! Focus:break ratio storage.
//!
//! A ratio is stored as an integer scaled by 10, giving one decimal place of
//! precision: `50` means `5.0:1`, `25` means `2.5:1`. The break earned after a
//! focus stretch is `focus / (ratio / 10)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RatioError;

/// Positive focus:break ratio, scaled by [`Ratio::SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Ratio(u32);

impl Ratio {
    pub const SCALE: u32 = 10;

    /// The largest ratio offered by the capped entry variant (20.0:1).
    pub const MAX_CAPPED: Ratio = Ratio(200);

    /// Ratio used before the user picks one (5.0:1).
    pub const DEFAULT: Ratio = Ratio(50);

    /// Build from an already-scaled value. Returns `None` for zero.
    pub fn from_scaled(scaled: u32) -> Option<Self> {
        (scaled > 0).then_some(Self(scaled))
    }

    /// Build from a whole `n:1` ratio, as the preset buttons do.
    pub fn whole(n: u32) -> Option<Self> {
        Self::from_scaled(n.checked_mul(Self::SCALE)?)
    }

    pub fn scaled(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / f64::from(Self::SCALE)
    }

    /// Break length earned by `focus_ms` of focus at this ratio.
    ///
    /// Integer milliseconds, rounded down: `25_000` at `5.0:1` is `5_000`.
    pub fn break_duration_ms(self, focus_ms: u64) -> u64 {
        let scaled = u128::from(focus_ms) * u128::from(Self::SCALE) / u128::from(self.0);
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Ratio {
    type Error = String;

    fn try_from(scaled: u32) -> Result<Self, Self::Error> {
        Self::from_scaled(scaled).ok_or_else(|| "ratio must be greater than zero".to_string())
    }
}

impl From<Ratio> for u32 {
    fn from(ratio: Ratio) -> Self {
        ratio.0
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let tenths = self.0 % Self::SCALE;
        if tenths == 0 {
            write!(f, "{whole}:1")
        } else {
            write!(f, "{whole}.{tenths}:1")
        }
    }
}

/// How finely a user-entered ratio is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioPrecision {
    /// Whole ratios only; `2.4` becomes `2:1`.
    Integer,
    /// One decimal place; `2.44` becomes `2.4:1`.
    #[default]
    OneDecimal,
}

/// Upper bound applied to user entry. The lower bound is always "positive".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioBounds {
    pub max: Option<Ratio>,
}

impl RatioBounds {
    pub fn unbounded() -> Self {
        Self { max: None }
    }

    /// 0.1:1 to 20:1.
    pub fn capped() -> Self {
        Self {
            max: Some(Ratio::MAX_CAPPED),
        }
    }
}

impl Default for RatioBounds {
    fn default() -> Self {
        Self::capped()
    }
}

/// Holds the current ratio and validates every update.
#[derive(Debug, Clone)]
pub struct RatioStore {
    current: Ratio,
    bounds: RatioBounds,
    precision: RatioPrecision,
}

impl RatioStore {
    pub fn new(initial: Ratio, bounds: RatioBounds, precision: RatioPrecision) -> Self {
        Self {
            current: initial,
            bounds,
            precision,
        }
    }

    pub fn ratio(&self) -> Ratio {
        self.current
    }

    pub fn bounds(&self) -> RatioBounds {
        self.bounds
    }

    pub fn precision(&self) -> RatioPrecision {
        self.precision
    }

    /// Parse and store a user-entered ratio such as `"2.5"`.
    ///
    /// # Errors
    ///
    /// Returns a [`RatioError`] if the text is not a finite number, rounds to
    /// zero or below, or exceeds the configured maximum. The stored ratio is
    /// left unchanged in every error case.
    pub fn set_ratio(&mut self, raw: &str) -> Result<Ratio, RatioError> {
        let trimmed = raw.trim();
        let value = trimmed
            .trim_end_matches(":1")
            .parse::<f64>()
            .map_err(|_| RatioError::NotANumber {
                input: trimmed.to_string(),
            })?;
        self.store(value, trimmed)
    }

    /// Store a numeric ratio, with the same validation as [`RatioStore::set_ratio`].
    ///
    /// # Errors
    ///
    /// See [`RatioStore::set_ratio`].
    pub fn set_ratio_value(&mut self, value: f64) -> Result<Ratio, RatioError> {
        self.store(value, &value.to_string())
    }

    fn store(&mut self, value: f64, input: &str) -> Result<Ratio, RatioError> {
        if !value.is_finite() {
            return Err(RatioError::NotANumber {
                input: input.to_string(),
            });
        }

        let scaled = match self.precision {
            RatioPrecision::Integer => value.round() * f64::from(Ratio::SCALE),
            RatioPrecision::OneDecimal => (value * f64::from(Ratio::SCALE)).round(),
        };
        if scaled <= 0.0 {
            return Err(RatioError::NotPositive {
                input: input.to_string(),
            });
        }

        let above = |max: Ratio| RatioError::AboveMax {
            input: input.to_string(),
            max,
        };
        if scaled > f64::from(u32::MAX) {
            return Err(above(self.bounds.max.unwrap_or(Ratio(u32::MAX))));
        }
        let ratio = Ratio(scaled as u32);
        if let Some(max) = self.bounds.max {
            if ratio > max {
                return Err(above(max));
            }
        }

        self.current = ratio;
        Ok(ratio)
    }
}

impl Default for RatioStore {
    fn default() -> Self {
        Self::new(Ratio::DEFAULT, RatioBounds::default(), RatioPrecision::default())
    }
}
