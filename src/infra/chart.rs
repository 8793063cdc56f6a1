// ============================================================
// Layer 6 — Error-vs-Batch-Size Chart
// ============================================================
// Renders the study's summary figure as a standalone SVG:
//
//   x: batch size, log scale, inverted (large batches on the left)
//   y: test error in percent, (1 - accuracy) · 100
//   one line per normalization kind, a marker per batch size at
//   the mean over seeds, and an optional ±1 std band.
//
// SVG is plain text, so the chart is built with format! and
// needs no drawing library.

use anyhow::{ensure, Context, Result};
use std::{collections::BTreeMap, fmt::Write as _, fs, path::Path};

use crate::domain::norm_kind::NormKind;

const WIDTH:  f64 = 720.0;
const HEIGHT: f64 = 480.0;
const MARGIN_LEFT:   f64 = 70.0;
const MARGIN_RIGHT:  f64 = 150.0;
const MARGIN_TOP:    f64 = 40.0;
const MARGIN_BOTTOM: f64 = 60.0;
const FONT: &str = "Arial, sans-serif";

/// One measured accuracy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub norm:       NormKind,
    pub batch_size: usize,
    pub accuracy:   f64,
}

/// Mean and std of the error rate at one batch size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorSummary {
    pub batch_size: usize,
    pub mean:       f64,
    pub std:        f64,
    pub runs:       usize,
}

fn colour(norm: NormKind) -> &'static str {
    match norm {
        NormKind::Group => "#1f77b4",
        NormKind::Batch => "#ff7f0e",
    }
}

/// Group points by norm kind and batch size, averaging error over seeds.
pub fn summarize(points: &[ChartPoint]) -> BTreeMap<NormKind, Vec<ErrorSummary>> {
    let mut buckets: BTreeMap<NormKind, BTreeMap<usize, Vec<f64>>> = BTreeMap::new();
    for p in points {
        buckets
            .entry(p.norm)
            .or_default()
            .entry(p.batch_size)
            .or_default()
            .push((1.0 - p.accuracy) * 100.0);
    }

    buckets
        .into_iter()
        .map(|(norm, by_bs)| {
            let series = by_bs
                .into_iter()
                .map(|(batch_size, errors)| {
                    let n    = errors.len() as f64;
                    let mean = errors.iter().sum::<f64>() / n;
                    // sample std, as the seeds are a sample of possible runs
                    let std = if errors.len() > 1 {
                        (errors.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
                    } else {
                        0.0
                    };
                    ErrorSummary { batch_size, mean, std, runs: errors.len() }
                })
                .collect();
            (norm, series)
        })
        .collect()
}

struct Axes {
    log_min: f64,
    log_max: f64,
    y_min:   f64,
    y_max:   f64,
}

impl Axes {
    fn plot_w() -> f64 { WIDTH - MARGIN_LEFT - MARGIN_RIGHT }
    fn plot_h() -> f64 { HEIGHT - MARGIN_TOP - MARGIN_BOTTOM }

    /// Inverted log axis: the largest batch size maps to the left edge.
    fn x(&self, batch_size: usize) -> f64 {
        let span = (self.log_max - self.log_min).max(f64::EPSILON);
        let t    = ((batch_size as f64).log2() - self.log_min) / span;
        let t    = if self.log_max > self.log_min { t } else { 0.5 };
        MARGIN_LEFT + (1.0 - t) * Self::plot_w()
    }

    fn y(&self, error: f64) -> f64 {
        let t = (error - self.y_min) / (self.y_max - self.y_min);
        MARGIN_TOP + (1.0 - t) * Self::plot_h()
    }
}

/// Render the summary chart to an SVG document.
pub fn render_error_chart(points: &[ChartPoint], with_std: bool, title: &str) -> Result<String> {
    ensure!(!points.is_empty(), "Nothing to plot: the result table has no rows");
    let series = summarize(points);

    let sizes = points.iter().map(|p| p.batch_size.max(1));
    let (bs_min, bs_max) = sizes.fold((usize::MAX, 0), |(lo, hi), b| (lo.min(b), hi.max(b)));

    let band = |s: &ErrorSummary| if with_std { s.std } else { 0.0 };
    let all  = series.values().flatten();
    let lo   = all.clone().map(|s| s.mean - band(s)).fold(f64::INFINITY, f64::min);
    let hi   = all.map(|s| s.mean + band(s)).fold(f64::NEG_INFINITY, f64::max);
    let (y_min, y_max) = if hi - lo < 1.0 {
        ((lo - 0.5).floor(), (hi + 0.5).ceil())
    } else {
        (lo.floor(), hi.ceil())
    };

    let axes = Axes {
        log_min: (bs_min as f64).log2(),
        log_max: (bs_max as f64).log2(),
        y_min:   y_min.max(0.0).min(y_max - 1.0),
        y_max,
    };

    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {WIDTH} {HEIGHT}\" width=\"{WIDTH}\" height=\"{HEIGHT}\">"
    )?;
    writeln!(svg, "  <rect width=\"{WIDTH}\" height=\"{HEIGHT}\" fill=\"white\" />")?;
    writeln!(
        svg,
        "  <text x=\"{}\" y=\"24\" font-family=\"{FONT}\" font-size=\"16\" text-anchor=\"middle\">{}</text>",
        MARGIN_LEFT + Axes::plot_w() / 2.0,
        escape(title)
    )?;

    write_axes(&mut svg, &axes, points)?;

    for (norm, summaries) in &series {
        let c = colour(*norm);

        if with_std && summaries.len() > 1 {
            let upper = summaries.iter().map(|s| (axes.x(s.batch_size), axes.y(s.mean + s.std)));
            let lower = summaries.iter().rev().map(|s| (axes.x(s.batch_size), axes.y(s.mean - s.std)));
            writeln!(
                svg,
                "  <polygon points=\"{}\" fill=\"{c}\" fill-opacity=\"0.2\" stroke=\"none\" />",
                join_points(upper.chain(lower))
            )?;
        }

        let line = summaries.iter().map(|s| (axes.x(s.batch_size), axes.y(s.mean)));
        writeln!(
            svg,
            "  <polyline points=\"{}\" fill=\"none\" stroke=\"{c}\" stroke-width=\"2\" />",
            join_points(line)
        )?;
        for s in summaries {
            writeln!(
                svg,
                "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{c}\"><title>{} bs={} error={:.2}% (n={})</title></circle>",
                axes.x(s.batch_size),
                axes.y(s.mean),
                norm.label(),
                s.batch_size,
                s.mean,
                s.runs
            )?;
        }
    }

    write_legend(&mut svg, series.keys().copied())?;
    svg.push_str("</svg>\n");
    Ok(svg)
}

fn write_axes(svg: &mut String, axes: &Axes, points: &[ChartPoint]) -> Result<()> {
    let left   = MARGIN_LEFT;
    let right  = MARGIN_LEFT + Axes::plot_w();
    let top    = MARGIN_TOP;
    let bottom = MARGIN_TOP + Axes::plot_h();

    writeln!(svg, "  <line x1=\"{left}\" y1=\"{bottom}\" x2=\"{right}\" y2=\"{bottom}\" stroke=\"black\" />")?;
    writeln!(svg, "  <line x1=\"{left}\" y1=\"{top}\" x2=\"{left}\" y2=\"{bottom}\" stroke=\"black\" />")?;

    let mut sizes: Vec<usize> = points.iter().map(|p| p.batch_size).collect();
    sizes.sort_unstable();
    sizes.dedup();
    for bs in sizes {
        let x = axes.x(bs.max(1));
        writeln!(svg, "  <line x1=\"{x:.1}\" y1=\"{bottom}\" x2=\"{x:.1}\" y2=\"{}\" stroke=\"black\" />", bottom + 5.0)?;
        writeln!(
            svg,
            "  <text x=\"{x:.1}\" y=\"{}\" font-family=\"{FONT}\" font-size=\"12\" text-anchor=\"middle\">{bs}</text>",
            bottom + 20.0
        )?;
    }

    let steps = 5;
    for i in 0..=steps {
        let v = axes.y_min + (axes.y_max - axes.y_min) * i as f64 / steps as f64;
        let y = axes.y(v);
        writeln!(svg, "  <line x1=\"{left}\" y1=\"{y:.1}\" x2=\"{right}\" y2=\"{y:.1}\" stroke=\"#dddddd\" />")?;
        writeln!(
            svg,
            "  <text x=\"{}\" y=\"{:.1}\" font-family=\"{FONT}\" font-size=\"12\" text-anchor=\"end\">{v:.1}</text>",
            left - 8.0,
            y + 4.0
        )?;
    }

    writeln!(
        svg,
        "  <text x=\"{}\" y=\"{}\" font-family=\"{FONT}\" font-size=\"14\" text-anchor=\"middle\">batch size</text>",
        (left + right) / 2.0,
        HEIGHT - 15.0
    )?;
    writeln!(
        svg,
        "  <text x=\"20\" y=\"{0}\" font-family=\"{FONT}\" font-size=\"14\" text-anchor=\"middle\" transform=\"rotate(-90 20 {0})\">error (%)</text>",
        (top + bottom) / 2.0
    )?;
    Ok(())
}

fn write_legend(svg: &mut String, norms: impl Iterator<Item = NormKind>) -> Result<()> {
    let x = WIDTH - MARGIN_RIGHT + 20.0;
    for (i, norm) in norms.enumerate() {
        let y = MARGIN_TOP + 20.0 + i as f64 * 24.0;
        writeln!(
            svg,
            "  <line x1=\"{x}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"{}\" stroke-width=\"2\" />",
            x + 24.0,
            colour(norm)
        )?;
        writeln!(
            svg,
            "  <text x=\"{}\" y=\"{}\" font-family=\"{FONT}\" font-size=\"12\">{}</text>",
            x + 30.0,
            y + 4.0,
            norm.label()
        )?;
    }
    Ok(())
}

fn join_points(points: impl Iterator<Item = (f64, f64)>) -> String {
    points.map(|(x, y)| format!("{x:.1},{y:.1}")).collect::<Vec<_>>().join(" ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn write_chart(path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, svg).with_context(|| format!("Cannot write chart '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(norm: NormKind, batch_size: usize, accuracy: f64) -> ChartPoint {
        ChartPoint { norm, batch_size, accuracy }
    }

    fn sample() -> Vec<ChartPoint> {
        vec![
            p(NormKind::Group, 128, 0.91), p(NormKind::Group, 128, 0.93),
            p(NormKind::Group, 2,   0.90),
            p(NormKind::Batch, 128, 0.92),
            p(NormKind::Batch, 2,   0.70),
        ]
    }

    #[test]
    fn test_summary_means_over_seeds() {
        let s = summarize(&sample());
        let gn = &s[&NormKind::Group];
        assert_eq!(gn.len(), 2);
        // sorted by batch size: 2 then 128
        assert_eq!(gn[1].batch_size, 128);
        assert!((gn[1].mean - 8.0).abs() < 1e-9);
        assert!((gn[1].std - 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(gn[0].std, 0.0);
    }

    #[test]
    fn test_large_batches_are_drawn_on_the_left() {
        let axes = Axes { log_min: 1.0, log_max: 7.0, y_min: 0.0, y_max: 10.0 };
        assert!(axes.x(128) < axes.x(2));
        assert!((axes.x(128) - MARGIN_LEFT).abs() < 1e-9);
        // higher error sits higher on the page (smaller y)
        assert!(axes.y(9.0) < axes.y(1.0));
    }

    #[test]
    fn test_svg_has_one_line_per_norm() {
        let svg = render_error_chart(&sample(), true, "GN vs BN").unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert_eq!(svg.matches("<polygon").count(), 2);
        assert!(svg.contains("Group Norm") && svg.contains("Batch Norm"));
        assert!(svg.contains("batch size") && svg.contains("error (%)"));

        let plain = render_error_chart(&sample(), false, "t").unwrap();
        assert_eq!(plain.matches("<polygon").count(), 0);
    }

    #[test]
    fn test_single_batch_size_still_renders() {
        let svg = render_error_chart(&[p(NormKind::Batch, 32, 0.9)], true, "one").unwrap();
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(render_error_chart(&[], true, "x").is_err());
    }
}
