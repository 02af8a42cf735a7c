//! HTML report of the Pareto-front representation.
//!
//! Writes a self-contained page with embedded
//! [Plotly.js](https://plotly.com/javascript/) charts.
//!
//! | Chart | Written with | Description |
//! |---|---|---|
//! | **Criterion pairs** | `showPlot` | 2D scatter of every pair of criteria |
//! | **3D scatter** | `showPlot`, N ≥ 3 | first three criteria |
//! | **Parallel coordinates** | `hiPlot` | one axis per criterion, drag an axis to filter |
//!
//! Points are colored by cluster when a clustering was computed, by
//! iteration otherwise. An internet connection is needed on first load to
//! fetch `Plotly.js` from a CDN.

use core::fmt::Write as _;
use std::path::Path;

use crate::types::Sense;

/// Unique solutions in the shape the charts need.
#[derive(Clone, Debug, Default)]
pub struct FrontData {
    pub names: Vec<String>,
    pub senses: Vec<Sense>,
    /// Iteration of each solution.
    pub itr_ids: Vec<usize>,
    /// Criterion values, one row per solution.
    pub vals: Vec<Vec<f64>>,
    /// Achievements, one row per solution.
    pub a_vals: Vec<Vec<f64>>,
    /// Cluster id of each solution.
    pub clusters: Option<Vec<usize>>,
}

impl FrontData {
    fn column(&self, i: usize) -> Vec<f64> {
        self.vals.iter().map(|v| v[i]).collect()
    }

    fn axis_title(&self, i: usize) -> String {
        format!("\"{} ({})\"", escape_js(&self.names[i]), self.senses[i])
    }

    #[allow(clippy::cast_precision_loss)]
    fn colors(&self) -> Vec<f64> {
        match &self.clusters {
            Some(c) => c.iter().map(|&l| l as f64).collect(),
            None => self.itr_ids.iter().map(|&i| i as f64).collect(),
        }
    }

    fn color_label(&self) -> &'static str {
        if self.clusters.is_some() { "cluster" } else { "iteration" }
    }

    fn hover_text(&self) -> String {
        let labels: Vec<String> = self
            .itr_ids
            .iter()
            .enumerate()
            .map(|(k, itr)| match &self.clusters {
                Some(c) => format!("\"itr {itr}, cluster {}\"", c[k]),
                None => format!("\"itr {itr}\""),
            })
            .collect();
        labels.join(",")
    }
}

/// Write the report to `path`.
///
/// # Errors
///
/// Return an I/O error if the file cannot be created or written.
pub fn write_html_report(
    front: &FrontData,
    path: impl AsRef<Path>,
    show_plot: bool,
    hi_plot: bool,
) -> std::io::Result<()> {
    std::fs::write(path, build_html(front, show_plot, hi_plot))
}

/// Render the report as a string.
#[must_use]
pub fn build_html(front: &FrontData, show_plot: bool, hi_plot: bool) -> String {
    let mut html = String::with_capacity(8192);
    let n = front.names.len();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Pareto Front</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
         background: #f5f6fa; color: #2c3e50; padding: 24px; }}
  h1 {{ text-align: center; margin-bottom: 8px; font-size: 1.8em; }}
  .subtitle {{ text-align: center; color: #7f8c8d; margin-bottom: 24px; }}
  .chart {{ background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.08);
            margin-bottom: 24px; padding: 16px; }}
  .chart-title {{ font-size: 1.1em; font-weight: 600; margin-bottom: 8px; }}
</style>
</head>
<body>
<h1>Pareto Front</h1>
<p class="subtitle">{n} criteria &middot; {m} Pareto solutions</p>
"#,
        m = front.vals.len(),
    );

    if front.vals.is_empty() {
        html.push_str("</body>\n</html>\n");
        return html;
    }

    if show_plot && n >= 2 {
        html.push_str("<div class=\"chart\"><div class=\"chart-title\">Criterion Pairs</div><div id=\"pairs\"></div></div>\n");
        write_pair_charts(&mut html, front);
        if n >= 3 {
            html.push_str("<div class=\"chart\"><div class=\"chart-title\">3D Scatter</div><div id=\"scatter3d\"></div></div>\n");
            write_scatter_3d(&mut html, front);
        }
    }

    if hi_plot {
        html.push_str("<div class=\"chart\"><div class=\"chart-title\">Parallel Coordinates</div><div id=\"parcoords\"></div></div>\n");
        write_parallel_coordinates(&mut html, front);
    }

    html.push_str("</body>\n</html>\n");
    html
}

// ---------------------------------------------------------------------------
// Chart generators
// ---------------------------------------------------------------------------

fn write_pair_charts(html: &mut String, front: &FrontData) {
    let n = front.names.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();
    let cols = pairs.len().min(3);
    let rows = pairs.len().div_ceil(cols);
    let colors = front.colors();
    let text = front.hover_text();

    let mut traces = String::new();
    let mut layout_axes = String::new();
    let mut titles = Vec::with_capacity(pairs.len());
    for (k, &(i, j)) in pairs.iter().enumerate() {
        let (xa, ya) = axis_names(k + 1);
        let x = front.column(i);
        let y = front.column(j);
        let _ = write!(
            traces,
            r#"{{ x: {x:?}, y: {y:?}, text: [{text}], mode: "markers", type: "scatter",
               xaxis: "{xa}", yaxis: "{ya}",
               marker: {{ color: {colors:?}, colorscale: "Viridis", size: 7 }}, showlegend: false }},"#,
        );
        let suffix = if k == 0 { String::new() } else { (k + 1).to_string() };
        let _ = write!(
            layout_axes,
            "xaxis{suffix}: {{ title: {xt} }}, yaxis{suffix}: {{ title: {yt} }},",
            xt = front.axis_title(i),
            yt = front.axis_title(j),
        );
        titles.push(format!(
            "\"{} vs {}\"",
            escape_js(&front.names[j]),
            escape_js(&front.names[i])
        ));
    }

    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("pairs", [{traces}],
  {{ grid: {{ rows: {rows}, columns: {cols}, pattern: "independent" }},
     {layout_axes}
     annotations: [{annotations}],
     height: {height}, margin: {{ t: 30 }}, showlegend: false }},
  {{ responsive: true }});
</script>
"#,
        annotations = build_subplot_annotations(&titles, rows, cols),
        height = 360 * rows,
    );
}

fn write_scatter_3d(html: &mut String, front: &FrontData) {
    let (x, y, z) = (front.column(0), front.column(1), front.column(2));
    let colors = front.colors();
    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("scatter3d", [{{
  x: {x:?}, y: {y:?}, z: {z:?}, text: [{text}], mode: "markers", type: "scatter3d",
  marker: {{ color: {colors:?}, colorscale: "Viridis", size: 4 }}
}}], {{ scene: {{ xaxis: {{ title: {xt} }}, yaxis: {{ title: {yt} }}, zaxis: {{ title: {zt} }} }},
       height: 600, margin: {{ t: 10 }} }},
   {{ responsive: true }});
</script>
"#,
        text = front.hover_text(),
        xt = front.axis_title(0),
        yt = front.axis_title(1),
        zt = front.axis_title(2),
    );
}

fn write_parallel_coordinates(html: &mut String, front: &FrontData) {
    let mut dimensions = String::new();
    for i in 0..front.names.len() {
        let vals = front.column(i);
        let (lo, hi) = min_max(&vals);
        // worse end at the bottom of every axis
        let range = match front.senses[i] {
            Sense::Maximize => format!("[{lo}, {hi}]"),
            Sense::Minimize => format!("[{hi}, {lo}]"),
        };
        let _ = write!(
            dimensions,
            r#"{{ label: {label}, values: {vals:?}, range: {range} }},"#,
            label = front.axis_title(i),
        );
    }

    let colors = front.colors();
    let (cmin, cmax) = min_max(&colors);
    let _ = write!(
        html,
        r#"<script>
Plotly.newPlot("parcoords", [{{
  type: "parcoords",
  line: {{ color: {colors:?}, colorscale: "Viridis",
           cmin: {cmin}, cmax: {cmax}, showscale: true,
           colorbar: {{ title: "{label}" }} }},
  dimensions: [{dimensions}]
}}], {{ margin: {{ t: 30 }} }}, {{ responsive: true }});
</script>
"#,
        label = front.color_label(),
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn axis_names(k: usize) -> (String, String) {
    if k == 1 {
        ("x".to_string(), "y".to_string())
    } else {
        (format!("x{k}"), format!("y{k}"))
    }
}

fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn min_max(vals: &[f64]) -> (f64, f64) {
    let mut mn = f64::INFINITY;
    let mut mx = f64::NEG_INFINITY;
    for &v in vals {
        if v.is_nan() {
            continue;
        }
        mn = mn.min(v);
        mx = mx.max(v);
    }
    if mn > mx {
        return (0.0, 1.0);
    }
    (mn, mx)
}

/// Plotly annotations acting as subplot titles.
#[allow(clippy::cast_precision_loss)]
fn build_subplot_annotations(titles: &[String], rows: usize, cols: usize) -> String {
    let mut anns = Vec::with_capacity(titles.len());
    for (i, title) in titles.iter().enumerate() {
        let row = i / cols;
        let col = i % cols;
        let x = (col as f64 + 0.5) / cols as f64;
        let y = 1.0 - row as f64 / rows.max(1) as f64 + 0.02;
        anns.push(format!(
            r#"{{ text: {title}, x: {x:.3}, y: {y:.3}, xref: "paper", yref: "paper",
               xanchor: "center", showarrow: false, font: {{ size: 12 }} }}"#,
        ));
    }
    anns.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front(n: usize) -> FrontData {
        FrontData {
            names: (0..n).map(|i| format!("f{i}")).collect(),
            senses: vec![Sense::Maximize; n],
            itr_ids: vec![3, 4, 7],
            vals: vec![vec![1.0; n], vec![0.5; n], vec![0.0; n]],
            a_vals: vec![vec![100.0; n], vec![50.0; n], vec![0.0; n]],
            clusters: None,
        }
    }

    #[test]
    fn test_sections_follow_flags() {
        let f = front(2);
        let html = build_html(&f, true, false);
        assert!(html.contains("id=\"pairs\""));
        assert!(!html.contains("scatter3d"));
        assert!(!html.contains("parcoords"));

        let html = build_html(&f, false, true);
        assert!(!html.contains("id=\"pairs\""));
        assert!(html.contains("type: \"parcoords\""));
    }

    #[test]
    fn test_three_criteria_add_3d_scatter() {
        let html = build_html(&front(3), true, true);
        assert!(html.contains("type: \"scatter3d\""));
        // three pairs
        assert!(html.contains("xaxis: \"x3\""));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_cluster_colouring_and_escaping() {
        let mut f = front(2);
        f.names[0] = "in\"c".into();
        f.clusters = Some(vec![0, 1, 1]);
        let html = build_html(&f, true, true);
        assert!(html.contains("in\\\"c"));
        assert!(html.contains("cluster 1"));
        assert!(html.contains("title: \"cluster\""));
    }

    #[test]
    fn test_empty_front() {
        let mut f = front(2);
        f.vals.clear();
        f.itr_ids.clear();
        let html = build_html(&f, true, true);
        assert!(html.contains("0 Pareto solutions"));
        assert!(!html.contains("Plotly.newPlot"));
    }
}
