use crate::constants::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Metric fed by per-request latencies; takes `p(..)` thresholds.
pub const METRIC_REQUEST_DURATION: &str = "request_duration";
/// Metric fed by per-request success checks; takes `rate` thresholds.
pub const METRIC_CHECKS: &str = "checks";

/// A fully-typed scenario definition. Malformed scenarios are rejected by
/// [`RunConfig::validate`] before any worker starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    /// Target endpoint, `host:port`.
    pub endpoint: String,
    #[serde(default)]
    pub security: SecurityMode,
    pub stages: Vec<Stage>,
    #[serde(default = "default_graceful_rampdown", with = "duration_str")]
    pub graceful_rampdown: Duration,
    /// Fixed sleep between iterations of a single worker.
    #[serde(default = "default_pacing", with = "duration_str")]
    pub pacing: Duration,
    #[serde(default = "default_request_timeout", with = "duration_str")]
    pub request_timeout: Duration,
    /// Hard wall-clock cap on the whole run, over and above the staged
    /// schedule. `None` means the schedule alone bounds the run.
    #[serde(default, with = "opt_duration_str")]
    pub deadline: Option<Duration>,
    /// Seed for the per-worker operation choice. Fixing this makes the
    /// dispatch sequence reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
    pub operations: Vec<OperationWeight>,
    #[serde(default)]
    pub thresholds: Vec<Threshold>,
}

fn default_graceful_rampdown() -> Duration {
    DEFAULT_GRACEFUL_RAMPDOWN
}

fn default_pacing() -> Duration {
    DEFAULT_PACING
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(ConfigError::ZeroStageDuration(idx));
            }
        }

        if self.operations.is_empty() {
            return Err(ConfigError::NoOperations);
        }
        for (idx, op) in self.operations.iter().enumerate() {
            if !(op.weight.is_finite() && op.weight > 0.) {
                return Err(ConfigError::InvalidWeight {
                    name: op.name.clone(),
                    weight: op.weight,
                });
            }
            if self.operations[..idx].iter().any(|o| o.name == op.name) {
                return Err(ConfigError::DuplicateOperation(op.name.clone()));
            }
        }

        for threshold in &self.thresholds {
            threshold.validate()?;
        }

        Ok(())
    }
}

/// One ramping stage: hold `duration` while interpolating towards `target`
/// concurrent workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(with = "duration_str")]
    pub duration: Duration,
    pub target: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    #[default]
    Plaintext,
    Tls,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationWeight {
    pub name: String,
    pub weight: f64,
}

/// A pass/fail predicate over one aggregated run metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: String,
    pub check: ThresholdExpr,
}

impl Threshold {
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.metric.as_str(), &self.check) {
            (METRIC_REQUEST_DURATION, ThresholdExpr::Quantile { .. }) => Ok(()),
            (METRIC_CHECKS, ThresholdExpr::Rate { .. }) => Ok(()),
            (METRIC_REQUEST_DURATION, check) | (METRIC_CHECKS, check) => {
                Err(ConfigError::MetricMismatch {
                    metric: self.metric.clone(),
                    check: check.to_string(),
                })
            }
            _ => Err(ConfigError::UnknownMetric(self.metric.clone())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    /// Strict comparators are strict: an observation exactly at the bound
    /// fails `<` and `>`.
    pub fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparator::Lt => observed < bound,
            Comparator::Le => observed <= bound,
            Comparator::Gt => observed > bound,
            Comparator::Ge => observed >= bound,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// A threshold expression: `p(95) < 200ms` or `rate > 0.95`.
#[derive(Clone, Debug, PartialEq)]
pub enum ThresholdExpr {
    /// Latency quantile bound; `quantile` is in [0, 1].
    Quantile {
        quantile: f64,
        cmp: Comparator,
        bound: Duration,
    },
    /// Success-rate bound; `bound` is in [0, 1].
    Rate { cmp: Comparator, bound: f64 },
}

impl FromStr for ThresholdExpr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::InvalidThreshold(s.to_string());

        let trimmed = s.trim();
        if let Some(rest) = trimmed.strip_prefix("p(") {
            let (quantile, rest) = rest.split_once(')').ok_or_else(bad)?;
            let quantile: f64 = quantile.trim().parse().map_err(|_| bad())?;
            if !(0. ..=100.).contains(&quantile) {
                return Err(bad());
            }
            let (cmp, rest) = split_comparator(rest).ok_or_else(bad)?;
            let bound = humantime::parse_duration(rest.trim()).map_err(|_| bad())?;
            Ok(ThresholdExpr::Quantile {
                quantile: quantile / 100.,
                cmp,
                bound,
            })
        } else if let Some(rest) = trimmed.strip_prefix("rate") {
            let (cmp, rest) = split_comparator(rest).ok_or_else(bad)?;
            let bound: f64 = rest.trim().parse().map_err(|_| bad())?;
            if !(0. ..=1.).contains(&bound) {
                return Err(bad());
            }
            Ok(ThresholdExpr::Rate { cmp, bound })
        } else {
            Err(bad())
        }
    }
}

fn split_comparator(s: &str) -> Option<(Comparator, &str)> {
    let s = s.trim_start();
    if let Some(rest) = s.strip_prefix("<=") {
        Some((Comparator::Le, rest))
    } else if let Some(rest) = s.strip_prefix(">=") {
        Some((Comparator::Ge, rest))
    } else if let Some(rest) = s.strip_prefix('<') {
        Some((Comparator::Lt, rest))
    } else if let Some(rest) = s.strip_prefix('>') {
        Some((Comparator::Gt, rest))
    } else {
        None
    }
}

impl fmt::Display for ThresholdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdExpr::Quantile {
                quantile,
                cmp,
                bound,
            } => {
                let pct = (quantile * 1000.).round() / 10.;
                write!(f, "p({pct}) {cmp} {}", humantime::format_duration(*bound))
            }
            ThresholdExpr::Rate { cmp, bound } => write!(f, "rate {cmp} {bound}"),
        }
    }
}

impl Serialize for ThresholdExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ThresholdExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("scenario declares no stages")]
    NoStages,
    #[error("stage {0} has a zero duration")]
    ZeroStageDuration(usize),
    #[error("scenario declares no operations")]
    NoOperations,
    #[error("operation `{0}` is declared twice")]
    DuplicateOperation(String),
    #[error("operation `{name}` has invalid weight {weight}")]
    InvalidWeight { name: String, weight: f64 },
    #[error("invalid threshold expression `{0}`")]
    InvalidThreshold(String),
    #[error("threshold metric `{metric}` does not accept check `{check}`")]
    MetricMismatch { metric: String, check: String },
    #[error("unknown threshold metric `{0}`")]
    UnknownMetric(String),
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("invalid endpoint `{0}`")]
    InvalidEndpoint(String),
}

mod duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(dur: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*dur))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

mod opt_duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(
        dur: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dur {
            Some(dur) => serializer.collect_str(&humantime::format_duration(*dur)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
