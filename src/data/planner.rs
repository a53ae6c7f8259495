//! Per-frame axis planning: visible X window, Y range and tick marks.
//!
//! The planner is pure: it reads a [`Snapshot`] of the selected column and a
//! [`ScaleMode`] and produces a [`Frame`] for whatever draws it. It never
//! returns a degenerate range; with fewer than two samples it returns `None`
//! and the caller keeps the previous frame.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::window::Snapshot;
use crate::error::ScopeError;

/// Fraction of the data span added above and below in auto mode.
pub const AUTO_MARGIN: f64 = 0.1;
pub const AUTO_Y_TICKS: usize = 7;
pub const AUTO_TICK_DECIMALS: i32 = 2;
pub const MANUAL_Y_TICKS: usize = 9;
/// Manual ticks sit on quarter steps of `v`, so two decimals keep `±5` exact (`-3.75`).
pub const MANUAL_TICK_DECIMALS: i32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// ScaleMode
// ─────────────────────────────────────────────────────────────────────────────

/// Y-axis range policy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScaleMode {
    /// Fit the visible data plus a 10% margin.
    #[default]
    Auto,
    /// Fixed symmetric range `[-v, v]`.
    Fixed(f64),
}

impl ScaleMode {
    /// The choices offered by the shell's Y-scale dropdown.
    pub fn presets() -> Vec<ScaleMode> {
        let mut v = vec![ScaleMode::Auto];
        v.extend([1.0, 5.0, 10.0, 20.0, 50.0, 100.0].map(ScaleMode::Fixed));
        v
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMode::Auto => write!(f, "Auto"),
            ScaleMode::Fixed(v) => write!(f, "±{v}"),
        }
    }
}

impl FromStr for ScaleMode {
    type Err = ScopeError;

    /// Accepts `Auto` (any case), `±5`, `+-5`, `+/-5` or a bare `5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.eq_ignore_ascii_case("auto") {
            return Ok(ScaleMode::Auto);
        }
        let num = ["±", "+/-", "+-"]
            .iter()
            .find_map(|p| t.strip_prefix(p))
            .unwrap_or(t)
            .trim();
        match num.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(ScaleMode::Fixed(v)),
            _ => Err(ScopeError::InvalidScaleMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for ScaleMode {
    type Error = ScopeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ScaleMode> for String {
    fn from(m: ScaleMode) -> Self {
        m.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a render sink needs to draw one update.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub x_ticks: Vec<f64>,
    pub y_ticks: Vec<f64>,
    /// `[sample_index, value]`, oldest first.
    pub points: Vec<[f64; 2]>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Axis helpers
// ─────────────────────────────────────────────────────────────────────────────

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let scaled = v * scale;
    if !scaled.is_finite() {
        // too large to carry a fractional part anyway
        return v;
    }
    scaled.round() / scale
}

/// `count` marks from `lo` to `hi` inclusive, rounded to `decimals` places.
pub fn evenly_spaced(lo: f64, hi: f64, count: usize, decimals: i32) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![round_to(lo, decimals)],
        _ => {
            let n = (count - 1) as f64;
            // interpolated rather than stepped so extreme ranges cannot overflow
            (0..count)
                .map(|i| {
                    let t = i as f64 / n;
                    round_to(lo * (1.0 - t) + hi * t, decimals)
                })
                .collect()
        }
    }
}

/// Fixed-width window ending at the newest sample once more than `capacity`
/// samples exist, anchored at zero before that.
pub fn x_range(latest_index: u64, capacity: usize) -> (u64, u64) {
    let cap = capacity.max(1) as u64;
    let lo = (latest_index + 1).saturating_sub(cap);
    (lo, lo + cap)
}

/// Multiples of `step` strictly above `lo`, up to and including `hi`.
pub fn x_ticks(lo: u64, hi: u64, step: u64) -> Vec<f64> {
    let step = step.max(1);
    let mut ticks = Vec::new();
    let mut x = (lo / step + 1) * step;
    while x <= hi {
        ticks.push(x as f64);
        x += step;
    }
    ticks
}

/// Data extent plus margin; `None` if there is no finite value.
pub fn auto_y_range<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = if max == min {
        1.0
    } else {
        (max - min).min(f64::MAX)
    };
    let margin = span * AUTO_MARGIN;
    let (lo, hi) = ((min - margin).max(f64::MIN), (max + margin).min(f64::MAX));
    if hi > lo {
        return Some((lo, hi));
    }
    // margin lost to float precision at large magnitudes
    let margin = max.abs().max(min.abs()) * 1e-9;
    Some(((min - margin).max(f64::MIN), (max + margin).min(f64::MAX)))
}

/// `[-v, v]`.
pub fn manual_y_range(v: f64) -> (f64, f64) {
    let v = v.abs();
    (-v, v)
}

// ─────────────────────────────────────────────────────────────────────────────
// RenderPlanner
// ─────────────────────────────────────────────────────────────────────────────

/// Turns the current window contents into a [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct RenderPlanner {
    pub capacity: usize,
    pub x_tick_step: u64,
}

impl Default for RenderPlanner {
    fn default() -> Self {
        Self {
            capacity: 500,
            x_tick_step: 100,
        }
    }
}

impl RenderPlanner {
    pub fn new(capacity: usize, x_tick_step: u64) -> Self {
        Self {
            capacity,
            x_tick_step,
        }
    }

    /// Plan a frame for the selected column, or `None` to keep the previous frame.
    pub fn plan(&self, snapshot: Option<Snapshot<'_>>, scale: ScaleMode) -> Option<Frame> {
        let snapshot = snapshot?;
        if snapshot.len() < 2 || snapshot.values.len() < 2 {
            return None;
        }
        let latest = snapshot.latest_index()?;

        let (y_range, y_ticks) = match scale {
            ScaleMode::Auto => {
                let (lo, hi) = auto_y_range(snapshot.values.iter().copied())?;
                (
                    (lo, hi),
                    evenly_spaced(lo, hi, AUTO_Y_TICKS, AUTO_TICK_DECIMALS),
                )
            }
            ScaleMode::Fixed(v) => {
                let (lo, hi) = manual_y_range(v);
                (
                    (lo, hi),
                    evenly_spaced(lo, hi, MANUAL_Y_TICKS, MANUAL_TICK_DECIMALS),
                )
            }
        };

        let (x_lo, x_hi) = x_range(latest, self.capacity);
        Some(Frame {
            x_range: (x_lo as f64, x_hi as f64),
            y_range,
            x_ticks: x_ticks(x_lo, x_hi, self.x_tick_step),
            y_ticks,
            points: snapshot.points().collect(),
        })
    }

    /// What to show before the first update: `[0, N] x [-1, 1]`, no points.
    pub fn idle(&self) -> Frame {
        let cap = self.capacity.max(1) as u64;
        let step = self.x_tick_step.max(1);
        Frame {
            x_range: (0.0, cap as f64),
            y_range: (-1.0, 1.0),
            x_ticks: (0..=cap).step_by(step as usize).map(|x| x as f64).collect(),
            y_ticks: vec![-1.0, -0.5, 0.0, 0.5, 1.0],
            points: Vec::new(),
        }
    }
}
