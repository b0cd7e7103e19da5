//! SVG figures for the analyze phase

use crate::ml::encoding::LabelEncoder;
use crate::ml::hierarchy::{DendrogramLayout, LEAF_SPACING};
use crate::ml::pipeline::AnalysisResult;
use crate::ml::reduction::Projection;
use crate::structs::{ExprError, LabeledMatrix, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle, FontTransform};
use std::path::Path;

pub const SCATTER_FILE: &str = "scatter.svg";
pub const HEATMAP_RANDOM_FILE: &str = "heatmap_randomized.svg";
pub const HEATMAP_CLUSTERED_FILE: &str = "heatmap_clustered.svg";
pub const DENDROGRAM_ROWS_FILE: &str = "dendrogram_rows.svg";
pub const DENDROGRAM_COLS_FILE: &str = "dendrogram_columns.svg";

/// Show at most this many tick labels along a heatmap axis
const MAX_AXIS_LABELS: usize = 60;

#[allow(clippy::needless_pass_by_value)]
fn plot_err<E: std::fmt::Display>(e: E) -> ExprError {
    ExprError::Plot(e.to_string())
}

/// One scatter subplot: a title and the label coloring each point
pub struct ScatterPanel<'a> {
    pub title: &'a str,
    pub labels: &'a [usize],
    /// Names the legend entries when the labels are encoded classes
    pub classes: Option<&'a LabelEncoder>,
}

impl ScatterPanel<'_> {
    fn legend_name(&self, label: usize) -> String {
        self.classes
            .and_then(|encoder| encoder.inverse_transform(label))
            .map_or_else(|| label.to_string(), str::to_string)
    }
}

/// Render every figure of an analysis run, returning the written file names
///
/// # Errors
/// Returns error if any figure cannot be drawn or written
pub fn render_figures(output_dir: &Path, result: &AnalysisResult) -> Result<Vec<String>> {
    let mut written = Vec::new();

    if let Some(projection) = &result.projection {
        let panels = [
            ScatterPanel {
                title: "True labels",
                labels: &result.true_labels,
                classes: Some(&result.encoder),
            },
            ScatterPanel {
                title: "Cluster assigned",
                labels: &result.clusters.labels,
                classes: None,
            },
        ];
        scatter_panels(&output_dir.join(SCATTER_FILE), projection, &panels, (1, 2))?;
        written.push(SCATTER_FILE.to_string());
    }

    heatmap(
        &output_dir.join(HEATMAP_RANDOM_FILE),
        &result.randomized,
        "Heatmap Before Clustering (Randomized)",
    )?;
    written.push(HEATMAP_RANDOM_FILE.to_string());

    heatmap(
        &output_dir.join(HEATMAP_CLUSTERED_FILE),
        &result.ordered,
        "Heatmap After Hierarchical Clustering",
    )?;
    written.push(HEATMAP_CLUSTERED_FILE.to_string());

    dendrogram(
        &output_dir.join(DENDROGRAM_ROWS_FILE),
        &result.row_linkage.dendrogram_layout(),
        &result.randomized.row_labels,
        "Dendrogram (Rows)",
        "Sample Index",
    )?;
    written.push(DENDROGRAM_ROWS_FILE.to_string());

    dendrogram(
        &output_dir.join(DENDROGRAM_COLS_FILE),
        &result.col_linkage.dendrogram_layout(),
        &result.randomized.col_labels,
        "Dendrogram (Columns)",
        "Feature Index",
    )?;
    written.push(DENDROGRAM_COLS_FILE.to_string());

    Ok(written)
}

/// Grid of scatter plots sharing the same points and axes
///
/// # Errors
/// Returns error if the grid is too small for the panels, a panel's labels
/// do not match the points, or drawing fails
#[allow(clippy::cast_possible_truncation)]
pub fn scatter_panels(
    path: &Path,
    projection: &Projection,
    panels: &[ScatterPanel],
    grid: (usize, usize),
) -> Result<()> {
    let (n_rows, n_cols) = grid;
    if n_rows == 0 || n_cols == 0 {
        return Err(ExprError::Config("Subplot grid must be at least 1x1".into()));
    }
    if panels.len() > n_rows * n_cols {
        return Err(ExprError::Plot(format!(
            "{} panels do not fit a {n_rows}x{n_cols} grid",
            panels.len()
        )));
    }
    if let Some(bad) = panels
        .iter()
        .find(|p| p.labels.len() != projection.points.len())
    {
        return Err(ExprError::Plot(format!(
            "Panel {:?} has {} labels for {} points",
            bad.title,
            bad.labels.len(),
            projection.points.len()
        )));
    }

    let x_range = padded_range(projection.points.iter().map(|p| p.0));
    let y_range = padded_range(projection.points.iter().map(|p| p.1));

    let root = SVGBackend::new(path, (800 * n_cols as u32, 600 * n_rows as u32)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    for (area, panel) in root.split_evenly((n_rows, n_cols)).iter().zip(panels) {
        draw_scatter(area, projection, panel, x_range.clone(), y_range.clone())?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_scatter(
    area: &DrawingArea<SVGBackend, Shift>,
    projection: &Projection,
    panel: &ScatterPanel,
    x_range: std::ops::Range<f64>,
    y_range: std::ops::Range<f64>,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(projection.x_label.as_str())
        .y_desc(projection.y_label.as_str())
        .draw()
        .map_err(plot_err)?;

    let mut distinct = panel.labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    for label in distinct {
        let color = Palette99::pick(label).to_rgba();
        chart
            .draw_series(
                projection
                    .points
                    .iter()
                    .zip(panel.labels)
                    .filter(|(_, &l)| l == label)
                    .map(|(&(x, y), _)| Circle::new((x, y), 3, color.filled())),
            )
            .map_err(plot_err)?
            .label(panel.legend_name(label))
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

/// Heatmap of a labelled matrix with a viridis color bar; row 0 is drawn on top
///
/// # Errors
/// Returns error if the matrix is empty or drawing fails
#[allow(clippy::cast_precision_loss)]
pub fn heatmap(path: &Path, matrix: &LabeledMatrix, title: &str) -> Result<()> {
    let (n_rows, n_cols) = (matrix.n_rows(), matrix.n_cols());
    if n_rows == 0 || n_cols == 0 {
        return Err(ExprError::Plot(format!("Cannot draw an empty heatmap ({title})")));
    }

    let (lo, hi) = matrix
        .values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = if hi > lo { hi - lo } else { 1.0 };

    let root = SVGBackend::new(path, (1200, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (main, bar) = root.split_horizontally(1080);

    let mut chart = ChartBuilder::on(&main)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..n_cols as f64, 0f64..n_rows as f64)
        .map_err(plot_err)?;

    chart
        .draw_series(matrix.values.indexed_iter().map(|((i, j), &v)| {
            let y0 = (n_rows - i - 1) as f64;
            let x0 = j as f64;
            Rectangle::new(
                [(x0, y0), (x0 + 1.0, y0 + 1.0)],
                viridis((v - lo) / span).filled(),
            )
        }))
        .map_err(plot_err)?;

    let col_font = FontDesc::new(FontFamily::SansSerif, 11.0, FontStyle::Normal)
        .transform(FontTransform::Rotate90)
        .color(&BLACK);
    let col_positions: Vec<(String, (i32, i32))> = thinned(n_cols)
        .map(|j| {
            let (px, py) = chart.backend_coord(&(j as f64 + 0.5, 0.0));
            (matrix.col_labels[j].clone(), (px, py + 6))
        })
        .collect();

    let row_font = FontDesc::new(FontFamily::SansSerif, 11.0, FontStyle::Normal).color(&BLACK);
    let row_positions: Vec<(String, (i32, i32))> = thinned(n_rows)
        .map(|i| {
            let (px, py) = chart.backend_coord(&(0.0, (n_rows - i) as f64 - 0.5));
            (matrix.row_labels[i].clone(), (px - 40, py - 5))
        })
        .collect();

    for (label, pos) in col_positions {
        main.draw(&Text::new(label, pos, col_font.clone()))
            .map_err(plot_err)?;
    }
    for (label, pos) in row_positions {
        main.draw(&Text::new(label, pos, row_font.clone()))
            .map_err(plot_err)?;
    }

    draw_color_bar(&bar, lo, lo + span)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_color_bar(area: &DrawingArea<SVGBackend, Shift>, lo: f64, hi: f64) -> Result<()> {
    const STEPS: usize = 100;

    let mut chart = ChartBuilder::on(area)
        .margin_top(50)
        .margin_bottom(100)
        .margin_right(5)
        .set_label_area_size(LabelAreaPosition::Right, 55)
        .build_cartesian_2d(0f64..1f64, lo..hi)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(6)
        .draw()
        .map_err(plot_err)?;

    let step = (hi - lo) / STEPS as f64;
    chart
        .draw_series((0..STEPS).map(|s| {
            let y0 = lo + step * s as f64;
            Rectangle::new(
                [(0.0, y0), (1.0, y0 + step)],
                viridis((s as f64 + 0.5) / STEPS as f64).filled(),
            )
        }))
        .map_err(plot_err)?;

    Ok(())
}

/// Dendrogram with leaf labels rotated under the x axis
///
/// # Errors
/// Returns error if a leaf has no label or drawing fails
#[allow(clippy::cast_precision_loss)]
pub fn dendrogram(
    path: &Path,
    layout: &DendrogramLayout,
    labels: &[String],
    title: &str,
    x_desc: &str,
) -> Result<()> {
    if let Some(&leaf) = layout.leaves.iter().find(|&&l| l >= labels.len()) {
        return Err(ExprError::Plot(format!("No label for leaf {leaf}")));
    }

    let width = (LEAF_SPACING * layout.leaves.len() as f64).max(LEAF_SPACING);
    let top = if layout.max_distance > 0.0 {
        layout.max_distance * 1.05
    } else {
        1.0
    };

    let root = SVGBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(110)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..width, 0f64..top)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_label_formatter(&|_| String::new())
        .x_desc(x_desc)
        .y_desc("Distance")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(layout.links.iter().map(|link| {
            PathElement::new(
                vec![
                    (link.x.0, link.y.0),
                    (link.x.0, link.y.1),
                    (link.x.1, link.y.1),
                    (link.x.1, link.y.2),
                ],
                BLUE.stroke_width(1),
            )
        }))
        .map_err(plot_err)?;

    let font = FontDesc::new(FontFamily::SansSerif, 9.0, FontStyle::Normal)
        .transform(FontTransform::Rotate90)
        .color(&BLACK);
    let positions: Vec<(String, (i32, i32))> = layout
        .leaves
        .iter()
        .zip(&layout.leaf_positions)
        .map(|(&leaf, &x)| {
            let (px, py) = chart.backend_coord(&(x, 0.0));
            (labels[leaf].clone(), (px, py + 6))
        })
        .collect();

    for (label, pos) in positions {
        root.draw(&Text::new(label, pos, font.clone()))
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Indices `0..n`, thinned so that at most `MAX_AXIS_LABELS` remain
fn thinned(n: usize) -> impl Iterator<Item = usize> {
    let step = n.div_ceil(MAX_AXIS_LABELS).max(1);
    (0..n).step_by(step)
}

fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((hi - lo) * 0.05).max(0.5);
    (lo - pad)..(hi + pad)
}

/// Viridis color scale, `t` clamped to `[0, 1]`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn viridis(t: f64) -> RGBColor {
    const STOPS: [(f64, f64, f64); 5] = [
        (68.0, 1.0, 84.0),
        (59.0, 82.0, 139.0),
        (33.0, 145.0, 140.0),
        (94.0, 201.0, 98.0),
        (253.0, 231.0, 37.0),
    ];

    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (STOPS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(STOPS.len() - 2);
    let frac = scaled - idx as f64;
    let (a, b) = (STOPS[idx], STOPS[idx + 1]);
    let mix = |x: f64, y: f64| (x + (y - x) * frac).round() as u8;

    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::hierarchy::ward;
    use ndarray::array;
    use std::fs;
    use tempfile::TempDir;

    fn projection() -> Projection {
        Projection {
            points: vec![(0.0, 0.0), (1.0, 1.0), (5.0, 5.0), (6.0, 5.5)],
            x_label: "feature 1".into(),
            y_label: "feature 2".into(),
        }
    }

    fn matrix() -> LabeledMatrix {
        LabeledMatrix {
            row_labels: vec!["0".into(), "1".into(), "2".into()],
            col_labels: vec!["ESR1".into(), "TP53".into()],
            values: array![[-1.0, 0.5], [0.0, 1.5], [1.0, -2.0]],
        }
    }

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(viridis(0.0), RGBColor(68, 1, 84));
        assert_eq!(viridis(1.0), RGBColor(253, 231, 37));
        assert_eq!(viridis(7.0), viridis(1.0));
        assert_eq!(viridis(f64::NAN), viridis(0.0));
    }

    #[test]
    fn test_thinned_labels() {
        assert_eq!(thinned(5).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert!(thinned(1000).count() <= MAX_AXIS_LABELS);
        assert_eq!(thinned(0).count(), 0);
    }

    #[test]
    fn test_scatter_panels_written() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join(SCATTER_FILE);
        let panels = [
            ScatterPanel { title: "True labels", labels: &[0, 0, 1, 1], classes: None },
            ScatterPanel { title: "Cluster assigned", labels: &[2, 2, 0, 4], classes: None },
        ];

        scatter_panels(&path, &projection(), &panels, (1, 2)).expect("scatter");

        let svg = fs::read_to_string(&path).expect("read");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Cluster assigned"));
    }

    #[test]
    fn test_legend_names_encoded_classes() {
        let (encoder, codes) = LabelEncoder::fit_transform(&["LumA", "Basal", "LumA", "Her2"])
            .expect("encode");
        let named = ScatterPanel { title: "True labels", labels: &codes, classes: Some(&encoder) };
        assert_eq!(named.legend_name(0), "Basal");
        assert_eq!(named.legend_name(2), "LumA");
        // codes outside the encoder fall back to the number
        assert_eq!(named.legend_name(7), "7");

        let plain = ScatterPanel { title: "Cluster assigned", labels: &codes, classes: None };
        assert_eq!(plain.legend_name(2), "2");
    }

    #[test]
    fn test_scatter_legend_shows_class_names() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join(SCATTER_FILE);
        let (encoder, codes) =
            LabelEncoder::fit_transform(&["LumA", "LumA", "Basal", "Basal"]).expect("encode");
        let panels = [ScatterPanel { title: "True labels", labels: &codes, classes: Some(&encoder) }];

        scatter_panels(&path, &projection(), &panels, (1, 1)).expect("scatter");

        let svg = fs::read_to_string(&path).expect("read");
        assert!(svg.contains("Basal"));
        assert!(svg.contains("LumA"));
    }

    #[test]
    fn test_scatter_single_cell_grid() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("single.svg");
        let panels = [ScatterPanel { title: "Only", labels: &[0, 1, 0, 1], classes: None }];

        scatter_panels(&path, &projection(), &panels, (1, 1)).expect("scatter");
        assert!(path.exists());
    }

    #[test]
    fn test_scatter_rejects_bad_input() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("bad.svg");
        let labels = [0, 0, 1, 1];
        let panels = [
            ScatterPanel { title: "a", labels: &labels, classes: None },
            ScatterPanel { title: "b", labels: &labels, classes: None },
        ];
        assert!(scatter_panels(&path, &projection(), &panels, (1, 1)).is_err());
        assert!(scatter_panels(&path, &projection(), &panels, (0, 2)).is_err());

        let short = [ScatterPanel { title: "short", labels: &[0, 1], classes: None }];
        assert!(scatter_panels(&path, &projection(), &short, (1, 1)).is_err());
    }

    #[test]
    fn test_heatmap_written() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join(HEATMAP_RANDOM_FILE);

        heatmap(&path, &matrix(), "Heatmap").expect("heatmap");

        let svg = fs::read_to_string(&path).expect("read");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("TP53"));
    }

    #[test]
    fn test_empty_heatmap_fails() {
        let dir = TempDir::new().expect("create temp dir");
        let empty = LabeledMatrix {
            row_labels: vec![],
            col_labels: vec![],
            values: ndarray::Array2::zeros((0, 0)),
        };
        assert!(heatmap(&dir.path().join("empty.svg"), &empty, "Empty").is_err());
    }

    #[test]
    fn test_dendrogram_written() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join(DENDROGRAM_ROWS_FILE);
        let m = matrix();
        let layout = ward(m.values.view()).dendrogram_layout();

        dendrogram(&path, &layout, &m.row_labels, "Dendrogram (Rows)", "Sample Index")
            .expect("dendrogram");

        let svg = fs::read_to_string(&path).expect("read");
        assert!(svg.contains("Sample Index"));
    }

    #[test]
    fn test_dendrogram_missing_labels() {
        let dir = TempDir::new().expect("create temp dir");
        let m = matrix();
        let layout = ward(m.values.view()).dendrogram_layout();
        let result = dendrogram(&dir.path().join("d.svg"), &layout, &m.col_labels, "t", "x");
        assert!(result.is_err());
    }
}
