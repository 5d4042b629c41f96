//! Throughput trend reports.

use std::fmt::Write;
use tuneforge_history::{History, Metric};

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const SVG_WIDTH: f64 = 640.0;
const SVG_HEIGHT: f64 = 320.0;
const SVG_MARGIN: f64 = 48.0;

/// One row per entry with every metric.
pub fn throughput_csv(history: &History) -> String {
    let mut out = String::from(
        "iteration,ops_per_sec,micros_per_op,mb_per_sec,avg_cpu_percent,avg_memory_mb,changed_keys\n",
    );
    for entry in history.entries() {
        let r = &entry.result;
        let opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{},{},{:.2},{:.2},{}",
            entry.iteration,
            r.ops_per_sec,
            opt(r.micros_per_op),
            opt(r.mb_per_sec),
            r.avg_cpu_percent,
            r.avg_memory_mb,
            entry.delta.len()
        );
    }
    out
}

/// Eight-level bar per value, scaled between the series minimum and maximum.
/// `NaN` renders as a space.
pub fn sparkline(values: impl IntoIterator<Item = f64>) -> String {
    let values: Vec<f64> = values.into_iter().collect();
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    values
        .iter()
        .map(|v| {
            if !v.is_finite() {
                ' '
            } else if span <= 0.0 {
                SPARK[SPARK.len() / 2]
            } else {
                let level = ((v - min) / span * (SPARK.len() - 1) as f64).round() as usize;
                SPARK[level.min(SPARK.len() - 1)]
            }
        })
        .collect()
}

/// Line chart of `metric` over iterations as a standalone SVG document.
pub fn trend_svg(history: &History, metric: Metric, title: &str) -> String {
    let points: Vec<(u32, f64)> = history
        .entries()
        .iter()
        .map(|e| (e.iteration, metric.extract(e)))
        .filter(|(_, v)| v.is_finite())
        .collect();

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = SVG_WIDTH,
        h = SVG_HEIGHT
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="24" font-family="sans-serif" font-size="16" text-anchor="middle">{}</text>"#,
        SVG_WIDTH / 2.0,
        escape(title)
    );

    let (left, right) = (SVG_MARGIN, SVG_WIDTH - SVG_MARGIN / 2.0);
    let (top, bottom) = (SVG_MARGIN, SVG_HEIGHT - SVG_MARGIN);
    let _ = writeln!(
        svg,
        r#"  <polyline points="{left},{top} {left},{bottom} {right},{bottom}" fill="none" stroke="black"/>"#
    );

    if !points.is_empty() {
        let first = points[0].0 as f64;
        let last = points[points.len() - 1].0 as f64;
        let min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).min(0.0);
        let max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        let x_span = (last - first).max(1.0);
        let y_span = if max > min { max - min } else { 1.0 };

        let coords: Vec<(f64, f64)> = points
            .iter()
            .map(|(i, v)| {
                let x = left + (*i as f64 - first) / x_span * (right - left);
                let y = bottom - (v - min) / y_span * (bottom - top);
                (x, y)
            })
            .collect();
        let path: Vec<String> = coords.iter().map(|(x, y)| format!("{:.1},{:.1}", x, y)).collect();
        let _ = writeln!(
            svg,
            r#"  <polyline points="{}" fill="none" stroke="steelblue" stroke-width="2"/>"#,
            path.join(" ")
        );
        for ((x, y), (i, v)) in coords.iter().zip(&points) {
            let _ = writeln!(
                svg,
                r#"  <circle cx="{:.1}" cy="{:.1}" r="3" fill="steelblue"><title>iteration {}: {:.2}</title></circle>"#,
                x, y, i, v
            );
        }
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-family="sans-serif" font-size="11" text-anchor="end">{:.0}</text>"#,
            left - 4.0,
            top + 4.0,
            max
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-family="sans-serif" font-size="11" text-anchor="end">{:.0}</text>"#,
            left - 4.0,
            bottom,
            min
        );
    }

    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" font-family="sans-serif" font-size="12" text-anchor="middle">iteration</text>"#,
        SVG_WIDTH / 2.0,
        SVG_HEIGHT - 12.0
    );
    let _ = writeln!(
        svg,
        r#"  <text x="14" y="{}" font-family="sans-serif" font-size="12" text-anchor="middle" transform="rotate(-90 14 {})">{}</text>"#,
        SVG_HEIGHT / 2.0,
        SVG_HEIGHT / 2.0,
        metric.name()
    );
    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuneforge_history::HistoryEntry;
    use tuneforge_options::seed::default_seed;
    use tuneforge_options::ConfigDiff;
    use tuneforge_runner::{BenchArgs, BenchmarkResult};

    fn history(values: &[f64]) -> History {
        let config = default_seed().resolve().unwrap();
        let mut history = History::new(Metric::OpsPerSec);
        for (i, v) in values.iter().enumerate() {
            history
                .append(HistoryEntry::new(
                    i as u32,
                    config.clone(),
                    BenchmarkResult::from_throughput(*v, 10.0, 20.0),
                    "",
                    ConfigDiff::default(),
                    BenchArgs::new(),
                ))
                .unwrap();
        }
        history
    }

    #[test]
    fn test_sparkline_scales_to_range() {
        assert_eq!(sparkline([1.0, 8.0]), "▁█");
        assert_eq!(sparkline([5.0, 5.0]), "▅▅");
        assert_eq!(sparkline([1.0, f64::NAN, 8.0]), "▁ █");
        assert_eq!(sparkline(Vec::new()), "");
    }

    #[test]
    fn test_csv_has_row_per_entry() {
        let csv = throughput_csv(&history(&[100.0, 150.0]));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("iteration,ops_per_sec"));
        assert_eq!(lines[2], "1,150,,,10.00,20.00,0");
    }

    #[test]
    fn test_svg_plots_every_point() {
        let svg = trend_svg(&history(&[100.0, 150.0, 120.0]), Metric::OpsPerSec, "OpsPerSec <fill>");
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("OpsPerSec &lt;fill&gt;"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }
}
