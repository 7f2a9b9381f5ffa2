use std::cell::Cell;
use std::rc::Rc;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("charting is unavailable")]
    Unavailable,
    #[error("malformed progress series: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const TEAL: Rgb = Rgb(0x14, 0xb8, 0xa6);
    pub const SLATE: Rgb = Rgb(0x94, 0xa3, 0xb8);

    /// Parses `#rrggbb` or `#rgb`.
    pub fn from_hex(raw: &str) -> Option<Rgb> {
        let hex = raw.trim().strip_prefix('#')?;
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn dimmed(self, factor: f64) -> Rgb {
        let scale = |c: u8| ((c as f64) * factor.clamp(0.0, 1.0)).round() as u8;
        Rgb(scale(self.0), scale(self.1), scale(self.2))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub label: String,
    pub values: Vec<f64>,
    pub color: Rgb,
    pub stroke: Stroke,
    pub fill: bool,
    pub smooth: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<SeriesSpec>,
}

/// A series after plotting. `line` is drawn as a connected line for solid
/// strokes and as scattered points for dashed ones; `fill` points shade the
/// area under the line.
#[derive(Debug, Clone)]
pub struct PlottedSeries {
    pub label: String,
    pub color: Rgb,
    pub stroke: Stroke,
    pub line: Vec<(f64, f64)>,
    pub fill: Vec<(f64, f64)>,
}

#[derive(Debug)]
pub struct ChartInstance {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<PlottedSeries>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    _lease: Lease,
}

impl ChartInstance {
    /// First, middle and last label, for axis ticks.
    pub fn axis_labels(&self) -> Vec<&str> {
        match self.labels.len() {
            0 => Vec::new(),
            1 => vec![self.labels[0].as_str()],
            2 => vec![self.labels[0].as_str(), self.labels[1].as_str()],
            n => vec![
                self.labels[0].as_str(),
                self.labels[n / 2].as_str(),
                self.labels[n - 1].as_str(),
            ],
        }
    }
}

#[derive(Debug)]
struct Lease(Rc<Cell<usize>>);

impl Lease {
    fn acquire(live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Lease(Rc::clone(live))
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

pub trait ChartBackend {
    fn create(&self, spec: ChartSpec) -> Result<ChartInstance, ChartError>;
    fn live_instances(&self) -> usize;
}

/// Plots into braille-resolution point sets.
pub struct PlotBackend {
    live: Rc<Cell<usize>>,
    samples_per_segment: usize,
    fill_rows: usize,
}

impl PlotBackend {
    pub fn new() -> Self {
        PlotBackend {
            live: Rc::new(Cell::new(0)),
            samples_per_segment: 6,
            fill_rows: 24,
        }
    }
}

impl Default for PlotBackend {
    fn default() -> Self {
        PlotBackend::new()
    }
}

impl ChartBackend for PlotBackend {
    fn create(&self, spec: ChartSpec) -> Result<ChartInstance, ChartError> {
        validate(&spec)?;
        let len = spec.labels.len();
        let y_max = spec
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0_f64, f64::max);
        let y_bounds = [0.0, if y_max > 0.0 { y_max * 1.05 } else { 1.0 }];
        let x_bounds = [0.0, (len.saturating_sub(1) as f64).max(1.0)];

        let series = spec
            .series
            .into_iter()
            .map(|s| {
                let points: Vec<(f64, f64)> = s
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i as f64, *v))
                    .collect();
                let mut line = if s.smooth {
                    smooth(&points, self.samples_per_segment)
                } else {
                    densify(&points, self.samples_per_segment)
                };
                if s.stroke == Stroke::Dashed {
                    line = dashes(&line, 3);
                }
                let fill = if s.fill {
                    area_under(&line, y_bounds, self.fill_rows)
                } else {
                    Vec::new()
                };
                PlottedSeries {
                    label: s.label,
                    color: s.color,
                    stroke: s.stroke,
                    line,
                    fill,
                }
            })
            .collect();

        Ok(ChartInstance {
            title: spec.title,
            labels: spec.labels,
            series,
            x_bounds,
            y_bounds,
            _lease: Lease::acquire(&self.live),
        })
    }

    fn live_instances(&self) -> usize {
        self.live.get()
    }
}

fn validate(spec: &ChartSpec) -> Result<(), ChartError> {
    let len = spec.labels.len();
    for s in &spec.series {
        if s.values.len() != len {
            return Err(ChartError::Malformed(format!(
                "series '{}' has {} values for {} dates",
                s.label,
                s.values.len(),
                len
            )));
        }
        if s.values.iter().any(|v| !v.is_finite()) {
            return Err(ChartError::Malformed(format!(
                "series '{}' contains non-finite values",
                s.label
            )));
        }
    }
    Ok(())
}

fn densify(points: &[(f64, f64)], samples: usize) -> Vec<(f64, f64)> {
    if points.len() < 2 || samples <= 1 {
        return points.to_vec();
    }
    let mut out = Vec::with_capacity(points.len() * samples);
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        for step in 0..samples {
            let t = step as f64 / samples as f64;
            out.push((x0 + (x1 - x0) * t, y0 + (y1 - y0) * t));
        }
    }
    if let Some(last) = points.last() {
        out.push(*last);
    }
    out
}

/// Catmull-Rom interpolation through the points. Each interpolated value is
/// kept within the range of its segment's endpoints so cumulative series
/// never appear to dip.
fn smooth(points: &[(f64, f64)], samples: usize) -> Vec<(f64, f64)> {
    if points.len() < 3 || samples <= 1 {
        return densify(points, samples);
    }
    let n = points.len();
    let mut out = Vec::with_capacity(n * samples);
    for i in 0..n - 1 {
        let p0 = points[i.saturating_sub(1)].1;
        let p1 = points[i].1;
        let p2 = points[i + 1].1;
        let p3 = points[(i + 2).min(n - 1)].1;
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        for step in 0..samples {
            let t = step as f64 / samples as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let y = 0.5
                * ((2.0 * p1)
                    + (-p0 + p2) * t
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
                    + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3);
            let x = points[i].0 + (points[i + 1].0 - points[i].0) * t;
            out.push((x, y.clamp(lo, hi)));
        }
    }
    out.push(points[n - 1]);
    out
}

fn dashes(points: &[(f64, f64)], run: usize) -> Vec<(f64, f64)> {
    let run = run.max(1);
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| (i / run) % 2 == 0)
        .map(|(_, p)| *p)
        .collect()
}

fn area_under(line: &[(f64, f64)], y_bounds: [f64; 2], rows: usize) -> Vec<(f64, f64)> {
    let rows = rows.max(1);
    let step = (y_bounds[1] - y_bounds[0]) / rows as f64;
    if step <= 0.0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for &(x, y) in line {
        let mut level = y_bounds[0];
        while level < y {
            out.push((x, level));
            level += step;
        }
    }
    out
}
