//! Year-over-year arithmetic.
//!
//! Two conventions live here and callers choose between them:
//!
//! - [`yoy_ratio`] expresses the current value as a percentage of the prior
//!   one (100 means unchanged). Used for absolute amounts.
//! - [`point_diff`] subtracts two values that are already percentages, such
//!   as cost-to-sales ratios.

use crate::utils::round1;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag emitted instead of a number when there was nothing to compare against.
pub const NEW_TAG: &str = "new";

/// Current as a percentage of prior, or the `New` sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum YoyRatio {
    Percent(f64),
    /// Prior was zero and current is positive.
    New,
}

impl YoyRatio {
    pub fn as_percent(&self) -> Option<f64> {
        match self {
            YoyRatio::Percent(p) => Some(*p),
            YoyRatio::New => None,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, YoyRatio::New)
    }

    /// Display classification. For costs an increase is the bad direction.
    pub fn trend(&self) -> CostTrend {
        match self {
            YoyRatio::New => CostTrend::New,
            YoyRatio::Percent(p) if *p >= 100.0 => CostTrend::Increase,
            YoyRatio::Percent(_) => CostTrend::Decrease,
        }
    }
}

impl fmt::Display for YoyRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YoyRatio::Percent(p) => write!(f, "{:.1}%", p),
            YoyRatio::New => f.write_str(NEW_TAG),
        }
    }
}

impl Serialize for YoyRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            YoyRatio::Percent(p) => serializer.serialize_f64(*p),
            YoyRatio::New => serializer.serialize_str(NEW_TAG),
        }
    }
}

impl<'de> Deserialize<'de> for YoyRatio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Tag(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(p) => Ok(YoyRatio::Percent(p)),
            Repr::Tag(tag) if tag == NEW_TAG => Ok(YoyRatio::New),
            Repr::Tag(tag) => Err(de::Error::custom(format!(
                "expected a number or \"{}\", got \"{}\"",
                NEW_TAG, tag
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostTrend {
    Increase,
    Decrease,
    New,
}

/// Which convention a metric is compared with. Picked by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Absolute amount: compare as current % of prior.
    Amount,
    /// Already a percentage: compare as a percentage-point difference.
    Ratio,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YoyChange {
    Ratio { diff: f64, ratio: YoyRatio },
    PointDiff { points: f64 },
}

pub fn diff(current: f64, prior: f64) -> f64 {
    current - prior
}

/// `round1(current / prior * 100)`, with `prior == 0` resolved to `New` when
/// current is positive and `0` otherwise. Never yields NaN or infinity.
pub fn yoy_ratio(current: f64, prior: f64) -> YoyRatio {
    if prior == 0.0 {
        return if current > 0.0 {
            YoyRatio::New
        } else {
            YoyRatio::Percent(0.0)
        };
    }

    let pct = round1(current / prior * 100.0);
    if pct.is_finite() {
        YoyRatio::Percent(pct)
    } else {
        YoyRatio::Percent(0.0)
    }
}

/// Percentage-point difference between two ratios.
pub fn point_diff(ratio_current: f64, ratio_prior: f64) -> f64 {
    let points = round1(ratio_current - ratio_prior);
    if points.is_finite() {
        points
    } else {
        0.0
    }
}

pub fn compare(kind: MetricKind, current: f64, prior: f64) -> YoyChange {
    match kind {
        MetricKind::Amount => YoyChange::Ratio {
            diff: diff(current, prior),
            ratio: yoy_ratio(current, prior),
        },
        MetricKind::Ratio => YoyChange::PointDiff {
            points: point_diff(current, prior),
        },
    }
}
