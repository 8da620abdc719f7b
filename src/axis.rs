//! Axis scales, ranges, tick placement and tick labels.
//!
//! Everything here works in two spaces: data space (what the table holds) and
//! plot space (what the chart is built on). A log axis maps `v` to `log10(v)`;
//! a linear axis is the identity.

use tracing::warn;

/// Linear or base-10 logarithmic mapping. Chosen per axis by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    Linear,
    Log,
}

impl Scale {
    /// Data → plot space. `None` for values a log axis cannot show.
    pub fn project(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        match self {
            Scale::Linear => Some(value),
            Scale::Log if value > 0.0 => Some(value.log10()),
            Scale::Log => None,
        }
    }

    /// Plot → data space.
    pub fn unproject(self, value: f64) -> f64 {
        match self {
            Scale::Linear => value,
            Scale::Log => 10f64.powf(value),
        }
    }
}

/// How tick values are turned into labels.
#[derive(Debug, Clone, PartialEq)]
pub enum TickFormat {
    /// The value itself, integers without a fractional part.
    Plain,
    /// `12k`, `3M`, see [`format_tick`].
    Compact,
    /// Always thousands: `value / 1000` rounded, then `k`.
    Thousands,
    /// Fixed number of decimals.
    Fraction(usize),
    /// Tick `i` shows the `i`-th name; used by categorical axes.
    Categories(Vec<String>),
}

impl TickFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            TickFormat::Plain => format_plain(value),
            TickFormat::Compact => format_tick(value),
            TickFormat::Thousands => format!("{}k", group_thousands(value / 1_000.0)),
            TickFormat::Fraction(decimals) => {
                let decimals = *decimals;
                format!("{value:.decimals$}")
            }
            TickFormat::Categories(names) => {
                let slot = value.round();
                if slot < 0.0 {
                    return String::new();
                }
                names.get(slot as usize).cloned().unwrap_or_default()
            }
        }
    }
}

/// Compact label for large magnitudes.
///
/// `>= 1e6` → millions with `M`, `>= 1e3` → thousands with `k`, anything else
/// the rounded integer. Rounding is half away from zero, so `1500` is `2k`.
pub fn format_tick(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{}M", group_thousands(value / 1_000_000.0))
    } else if value >= 1_000.0 {
        format!("{}k", group_thousands(value / 1_000.0))
    } else {
        group_thousands(value)
    }
}

/// Round to an integer and separate thousands with commas: `1234567.8` → `1,234,568`.
fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return format_non_finite(value);
    }
    let rounded = value.round();
    // `-0.4` rounds to `-0`, which should still read `0`
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn format_plain(value: f64) -> String {
    if !value.is_finite() {
        return format_non_finite(value);
    }
    // drop float noise from the log round trip (10^log10(8) = 7.999999999999998)
    let cleaned = (value * 1e6).round() / 1e6;
    if cleaned.fract() == 0.0 {
        format!("{cleaned:.0}")
    } else {
        format!("{cleaned}")
    }
}

pub(crate) fn format_non_finite(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

/// How the visible span of an axis is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RangePolicy {
    /// Data span plus a 5% margin on each side (in plot space).
    #[default]
    Auto,
    /// Exactly this span, in data space.
    Fixed(f64, f64),
    /// Fixed lower bound, automatic upper bound.
    Bottom(f64),
}

/// Where ticks go.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TickPolicy {
    /// Round numbers: 1/2/5 steps on linear axes, decades on log axes.
    #[default]
    Auto,
    /// One tick per distinct data value, as for a swept parameter.
    Observed,
    /// These values, in data space.
    Explicit(Vec<f64>),
}

/// Everything the caller decides about one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpec {
    pub label: String,
    pub scale: Scale,
    pub range: RangePolicy,
    pub ticks: TickPolicy,
    pub format: TickFormat,
}

impl AxisSpec {
    pub fn linear(label: &str) -> Self {
        AxisSpec {
            label: label.to_string(),
            scale: Scale::Linear,
            range: RangePolicy::Auto,
            ticks: TickPolicy::Auto,
            format: TickFormat::Plain,
        }
    }

    pub fn log(label: &str) -> Self {
        AxisSpec {
            scale: Scale::Log,
            ..Self::linear(label)
        }
    }

    /// Abort-rate style axis: fractions in `[0, 1]` with a small margin so
    /// markers at the edges stay visible.
    pub fn fraction(label: &str) -> Self {
        AxisSpec {
            range: RangePolicy::Fixed(-0.05, 1.05),
            format: TickFormat::Fraction(1),
            ..Self::linear(label)
        }
    }

    pub fn with_range(mut self, range: RangePolicy) -> Self {
        self.range = range;
        self
    }

    pub fn with_ticks(mut self, ticks: TickPolicy) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_format(mut self, format: TickFormat) -> Self {
        self.format = format;
        self
    }

    /// The scale to draw `values` with. The policy is the caller's; this only
    /// reports values that a log scale will have to drop.
    pub fn scale_for(&self, values: &[f64]) -> Scale {
        if self.scale == Scale::Log {
            let dropped = values.iter().filter(|v| v.is_finite() && **v <= 0.0).count();
            if dropped > 0 {
                warn!(axis = %self.label, dropped, "non-positive values left off log axis");
            }
        }
        self.scale
    }

    /// Fix range and ticks for the given data values.
    pub fn resolve(&self, values: &[f64]) -> ResolvedAxis {
        let scale = self.scale_for(values);
        let projected: Vec<f64> = values.iter().filter_map(|v| scale.project(*v)).collect();
        let (lo, hi) = self.plot_range(scale, &projected);

        let tick_values: Vec<f64> = match &self.ticks {
            TickPolicy::Auto => match scale {
                Scale::Linear => linear_ticks(lo, hi),
                Scale::Log => log_ticks(lo, hi),
            },
            TickPolicy::Observed => {
                let mut observed = projected.clone();
                observed.sort_by(f64::total_cmp);
                observed.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
                observed
            }
            TickPolicy::Explicit(ticks) => {
                ticks.iter().filter_map(|v| scale.project(*v)).collect()
            }
        };

        let span = hi - lo;
        let ticks: Vec<f64> = tick_values
            .into_iter()
            .filter(|t| *t >= lo - span * 1e-9 && *t <= hi + span * 1e-9)
            .collect();
        let labels = ticks
            .iter()
            .map(|t| self.format.format(scale.unproject(*t)))
            .collect();

        ResolvedAxis {
            label: self.label.clone(),
            scale,
            lo,
            hi,
            ticks,
            labels,
            format: self.format.clone(),
        }
    }

    fn plot_range(&self, scale: Scale, projected: &[f64]) -> (f64, f64) {
        let auto = || auto_range(scale, projected);
        let (lo, hi) = match self.range {
            RangePolicy::Auto => auto(),
            RangePolicy::Fixed(lo, hi) => match (scale.project(lo), scale.project(hi)) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => auto(),
            },
            RangePolicy::Bottom(bottom) => match scale.project(bottom) {
                Some(bottom) => (bottom, auto().1.max(bottom)),
                None => auto(),
            },
        };
        if hi > lo {
            (lo, hi)
        } else {
            (lo - 0.5, lo + 0.5)
        }
    }
}

fn auto_range(scale: Scale, projected: &[f64]) -> (f64, f64) {
    let min = projected.iter().copied().fold(f64::INFINITY, f64::min);
    let max = projected.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span == 0.0 {
        let pad = match scale {
            Scale::Log => 0.5,
            Scale::Linear if min == 0.0 => 1.0,
            Scale::Linear => min.abs() * 0.1,
        };
        return (min - pad, max + pad);
    }
    (min - span * 0.05, max + span * 0.05)
}

/// 1/2/5 × 10^k steps giving roughly five intervals over `[lo, hi]`.
fn linear_ticks(lo: f64, hi: f64) -> Vec<f64> {
    let rough = (hi - lo) / 5.0;
    let magnitude = 10f64.powf(rough.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|step| *step >= rough)
        .unwrap_or(10.0 * magnitude);

    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let tick = i as f64 * step;
            if tick.abs() < step * 1e-9 {
                0.0
            } else {
                tick
            }
        })
        .collect()
}

/// Decades inside `[lo, hi]` (plot space), with 2× and 5× sub-ticks when the
/// span is under three decades.
fn log_ticks(lo: f64, hi: f64) -> Vec<f64> {
    let multipliers: &[f64] = if hi - lo < 3.0 { &[1.0, 2.0, 5.0] } else { &[1.0] };
    let mut ticks = Vec::new();
    let mut power = lo.floor() as i32;
    while (power as f64) <= hi.ceil() {
        for m in multipliers {
            let tick = power as f64 + m.log10();
            if tick >= lo && tick <= hi {
                ticks.push(tick);
            }
        }
        power += 1;
    }
    ticks
}

/// An axis with its range and ticks fixed, all in plot space.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAxis {
    pub label: String,
    pub scale: Scale,
    pub lo: f64,
    pub hi: f64,
    pub ticks: Vec<f64>,
    /// One label per tick.
    pub labels: Vec<String>,
    pub format: TickFormat,
}

impl ResolvedAxis {
    /// Label for a plot-space position.
    pub fn label_for(&self, position: f64) -> String {
        self.format.format(self.scale.unproject(position))
    }

    pub fn project(&self, value: f64) -> Option<f64> {
        self.scale.project(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_handles_sign_and_width() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(-0.4), "0");
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1_234_567.8), "1,234,568");
        assert_eq!(group_thousands(-1_500.0), "-1,500");
    }

    #[test]
    fn plain_cleans_log_round_trip() {
        assert_eq!(format_plain(10f64.powf(8f64.log10())), "8");
        assert_eq!(format_plain(0.25), "0.25");
    }

    #[test]
    fn linear_ticks_are_round() {
        assert_eq!(linear_ticks(0.0, 10.0), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn log_ticks_cover_decades() {
        let ticks: Vec<f64> = log_ticks(0.0, 4.0)
            .into_iter()
            .map(|t| Scale::Log.unproject(t).round())
            .collect();
        assert_eq!(ticks, vec![1.0, 10.0, 100.0, 1_000.0, 10_000.0]);
    }
}
