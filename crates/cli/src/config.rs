use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tickstream_engine::BarStream;
use tickstream_indicators::*;

/// Indicator set file: a list of `[[indicator]]` tables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IndicatorSet {
    #[serde(rename = "indicator", default)]
    pub indicators: Vec<IndicatorEntry>,
}

/// One `[[indicator]]` table: the indicator and an optional display label.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IndicatorEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub indicator: IndicatorKind,
}

fn period_30() -> usize {
    30
}
fn period_20() -> usize {
    20
}
fn period_14() -> usize {
    14
}
fn period_10() -> usize {
    10
}
fn fast_k() -> usize {
    5
}
fn fast_d() -> usize {
    3
}
fn macd_fast() -> usize {
    12
}
fn macd_slow() -> usize {
    26
}
fn macd_signal() -> usize {
    9
}
fn two() -> f64 {
    2.0
}
fn sar_acceleration() -> f64 {
    0.02
}
fn sar_maximum() -> f64 {
    0.2
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma {
        #[serde(default = "period_30")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Ema {
        #[serde(default = "period_30")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Wma {
        #[serde(default = "period_30")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Variance {
        #[serde(default = "period_10")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    #[serde(rename = "stddev")]
    StdDev {
        #[serde(default = "period_10")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Bollinger {
        #[serde(default = "period_20")]
        period: usize,
        #[serde(default = "two")]
        k_up: f64,
        #[serde(default = "two")]
        k_down: f64,
        #[serde(default)]
        source: PriceSource,
    },
    Highest {
        #[serde(default = "period_30")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Lowest {
        #[serde(default = "period_30")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    TrueRange,
    Atr {
        #[serde(default = "period_14")]
        period: usize,
    },
    PlusDm {
        #[serde(default = "period_14")]
        period: usize,
    },
    MinusDm {
        #[serde(default = "period_14")]
        period: usize,
    },
    PlusDi {
        #[serde(default = "period_14")]
        period: usize,
    },
    MinusDi {
        #[serde(default = "period_14")]
        period: usize,
    },
    Dx {
        #[serde(default = "period_14")]
        period: usize,
    },
    Adx {
        #[serde(default = "period_14")]
        period: usize,
    },
    Adxr {
        #[serde(default = "period_14")]
        period: usize,
    },
    Rsi {
        #[serde(default = "period_14")]
        period: usize,
        #[serde(default)]
        source: PriceSource,
    },
    StochRsi {
        #[serde(default = "period_14")]
        period: usize,
        #[serde(default = "fast_k")]
        fast_k: usize,
        #[serde(default = "fast_d")]
        fast_d: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Macd {
        #[serde(default = "macd_fast")]
        fast: usize,
        #[serde(default = "macd_slow")]
        slow: usize,
        #[serde(default = "macd_signal")]
        signal: usize,
        #[serde(default)]
        source: PriceSource,
    },
    Sar {
        #[serde(default = "sar_acceleration")]
        acceleration: f64,
        #[serde(default = "sar_maximum")]
        maximum: f64,
    },
}

impl IndicatorKind {
    /// Short display name, e.g. `sma(30, close)`.
    pub fn describe(&self) -> String {
        match self {
            Self::Sma { period, source } => format!("sma({period}, {source})"),
            Self::Ema { period, source } => format!("ema({period}, {source})"),
            Self::Wma { period, source } => format!("wma({period}, {source})"),
            Self::Variance { period, source } => format!("variance({period}, {source})"),
            Self::StdDev { period, source } => format!("stddev({period}, {source})"),
            Self::Bollinger {
                period,
                k_up,
                k_down,
                source,
            } => format!("bollinger({period}, {k_up}, {k_down}, {source})"),
            Self::Highest { period, source } => format!("highest({period}, {source})"),
            Self::Lowest { period, source } => format!("lowest({period}, {source})"),
            Self::TrueRange => "true_range".to_string(),
            Self::Atr { period } => format!("atr({period})"),
            Self::PlusDm { period } => format!("plus_dm({period})"),
            Self::MinusDm { period } => format!("minus_dm({period})"),
            Self::PlusDi { period } => format!("plus_di({period})"),
            Self::MinusDi { period } => format!("minus_di({period})"),
            Self::Dx { period } => format!("dx({period})"),
            Self::Adx { period } => format!("adx({period})"),
            Self::Adxr { period } => format!("adxr({period})"),
            Self::Rsi { period, source } => format!("rsi({period}, {source})"),
            Self::StochRsi {
                period,
                fast_k,
                fast_d,
                source,
            } => format!("stoch_rsi({period}, {fast_k}, {fast_d}, {source})"),
            Self::Macd {
                fast,
                slow,
                signal,
                source,
            } => format!("macd({fast}, {slow}, {signal}, {source})"),
            Self::Sar {
                acceleration,
                maximum,
            } => format!("sar({acceleration}, {maximum})"),
        }
    }

    /// Build the indicator and subscribe it to `stream`.
    pub fn attach(&self, stream: &mut BarStream, label: String) -> Result<Attached, IndicatorError> {
        let attached = match *self {
            Self::Sma { period, source } => {
                subscribe(stream, label, Sma::new(period)?.with_source(source))
            }
            Self::Ema { period, source } => {
                subscribe(stream, label, Ema::new(period)?.with_source(source))
            }
            Self::Wma { period, source } => {
                subscribe(stream, label, Wma::new(period)?.with_source(source))
            }
            Self::Variance { period, source } => {
                subscribe(stream, label, Variance::new(period)?.with_source(source))
            }
            Self::StdDev { period, source } => {
                subscribe(stream, label, StdDev::new(period)?.with_source(source))
            }
            Self::Bollinger {
                period,
                k_up,
                k_down,
                source,
            } => subscribe(
                stream,
                label,
                BollingerBands::new(period, k_up, k_down)?.with_source(source),
            ),
            Self::Highest { period, source } => {
                subscribe(stream, label, Highest::new(period)?.with_source(source))
            }
            Self::Lowest { period, source } => {
                subscribe(stream, label, Lowest::new(period)?.with_source(source))
            }
            Self::TrueRange => subscribe(stream, label, TrueRange::new()),
            Self::Atr { period } => subscribe(stream, label, Atr::new(period)?),
            Self::PlusDm { period } => subscribe(stream, label, DirectionalMovement::plus(period)?),
            Self::MinusDm { period } => {
                subscribe(stream, label, DirectionalMovement::minus(period)?)
            }
            Self::PlusDi { period } => {
                subscribe(stream, label, DirectionalIndicator::plus(period)?)
            }
            Self::MinusDi { period } => {
                subscribe(stream, label, DirectionalIndicator::minus(period)?)
            }
            Self::Dx { period } => subscribe(stream, label, Dx::new(period)?),
            Self::Adx { period } => subscribe(stream, label, Adx::new(period)?),
            Self::Adxr { period } => subscribe(stream, label, Adxr::new(period)?),
            Self::Rsi { period, source } => {
                subscribe(stream, label, Rsi::new(period)?.with_source(source))
            }
            Self::StochRsi {
                period,
                fast_k,
                fast_d,
                source,
            } => subscribe(
                stream,
                label,
                StochRsi::new(period, fast_k, fast_d)?.with_source(source),
            ),
            Self::Macd {
                fast,
                slow,
                signal,
                source,
            } => subscribe(
                stream,
                label,
                Macd::new(fast, slow, signal)?.with_source(source),
            ),
            Self::Sar {
                acceleration,
                maximum,
            } => subscribe(stream, label, Sar::new(acceleration, maximum)?),
        };
        Ok(attached)
    }
}

impl IndicatorSet {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Attached when no set file is given.
    pub fn default_set() -> Self {
        let kinds = [
            IndicatorKind::Sma {
                period: 20,
                source: PriceSource::Close,
            },
            IndicatorKind::Ema {
                period: 20,
                source: PriceSource::Close,
            },
            IndicatorKind::Bollinger {
                period: 20,
                k_up: 2.0,
                k_down: 2.0,
                source: PriceSource::Close,
            },
            IndicatorKind::Rsi {
                period: 14,
                source: PriceSource::Close,
            },
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
                source: PriceSource::Close,
            },
            IndicatorKind::Atr { period: 14 },
            IndicatorKind::Adx { period: 14 },
            IndicatorKind::Sar {
                acceleration: 0.02,
                maximum: 0.2,
            },
        ];
        Self {
            indicators: kinds
                .into_iter()
                .map(|indicator| IndicatorEntry { label: None, indicator })
                .collect(),
        }
    }

    /// Subscribe every entry to `stream`, in file order.
    pub fn attach_all(&self, stream: &mut BarStream) -> Result<Vec<Attached>, IndicatorError> {
        self.indicators
            .iter()
            .map(|entry| {
                let label = entry
                    .label
                    .clone()
                    .unwrap_or_else(|| entry.indicator.describe());
                entry.indicator.attach(stream, label)
            })
            .collect()
    }
}

/// Lookback and bounds of one attached indicator after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub label: String,
    pub lookback: usize,
    pub len: usize,
    pub valid_from_bar: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Read side of an indicator shared with the stream.
pub trait Summarize: Send + Sync {
    fn summary(&self, label: &str) -> Summary;
}

impl<T: Indicator + Send> Summarize for Mutex<T> {
    fn summary(&self, label: &str) -> Summary {
        let indicator = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Summary {
            label: label.to_string(),
            lookback: indicator.lookback_period(),
            len: indicator.len(),
            valid_from_bar: indicator.valid_from_bar(),
            min: indicator.min_value(),
            max: indicator.max_value(),
        }
    }
}

pub struct Attached {
    pub label: String,
    pub handle: Arc<dyn Summarize>,
}

impl Attached {
    pub fn summary(&self) -> Summary {
        self.handle.summary(&self.label)
    }
}

fn subscribe<R>(stream: &mut BarStream, label: String, receiver: R) -> Attached
where
    R: BarReceiver + Indicator + Send + 'static,
{
    let (_, handle) = stream.subscribe(receiver);
    Attached { label, handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_with_defaults() {
        let set = IndicatorSet::from_toml_str(
            r#"
            [[indicator]]
            kind = "macd"

            [[indicator]]
            kind = "sma"
            period = 5
            source = "typical"
            label = "fast sma"

            [[indicator]]
            kind = "stddev"

            [[indicator]]
            kind = "true_range"
            "#,
        )
        .unwrap();

        assert_eq!(set.indicators.len(), 4);
        assert_eq!(
            set.indicators[0].indicator,
            IndicatorKind::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
                source: PriceSource::Close
            }
        );
        assert_eq!(set.indicators[1].label.as_deref(), Some("fast sma"));
        assert_eq!(
            set.indicators[1].indicator,
            IndicatorKind::Sma {
                period: 5,
                source: PriceSource::Typical
            }
        );
        assert_eq!(
            set.indicators[2].indicator,
            IndicatorKind::StdDev {
                period: 10,
                source: PriceSource::Close
            }
        );
        assert_eq!(set.indicators[3].indicator, IndicatorKind::TrueRange);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(IndicatorSet::from_toml_str("[[indicator]]\nkind = \"cci\"\n").is_err());
    }

    #[test]
    fn test_attach_all_subscribes_in_order() {
        let mut stream = BarStream::daily();
        let attached = IndicatorSet::default_set().attach_all(&mut stream).unwrap();
        assert_eq!(stream.subscriber_count(), attached.len());
        assert_eq!(attached[0].label, "sma(20, close)");
        let summary = attached[4].summary();
        assert_eq!(summary.label, "macd(12, 26, 9, close)");
        assert_eq!(summary.lookback, 33);
        assert_eq!(summary.len, 0);
    }

    #[test]
    fn test_invalid_parameters_fail_attach() {
        let mut stream = BarStream::daily();
        let indicator = IndicatorKind::Macd {
            fast: 30,
            slow: 26,
            signal: 9,
            source: PriceSource::Close,
        };
        assert!(indicator.attach(&mut stream, "bad".into()).is_err());
        assert_eq!(stream.subscriber_count(), 0);
    }
}
