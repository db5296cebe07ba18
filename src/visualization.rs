//! Visualization utilities for TSP solutions.
//!
//! Generates SVG drawings of tours and exports for plotting. Arcs of the
//! tour that are missing from the instance are drawn dashed in red.

use crate::error::{SolverError, SolverResult};
use crate::instance::Instance;
use crate::solution::Solution;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;
#[cfg(feature = "png")]
use resvg::render;
#[cfg(feature = "png")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "png")]
use resvg::usvg;
#[cfg(feature = "png")]
use resvg::usvg::TreeParsing;
#[cfg(feature = "png")]
use resvg::FitTo;

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// Node radius
    pub node_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 50.0,
            node_radius: 6.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate SVG visualization of a solution
    pub fn generate_svg(&self, instance: &Instance, solution: &Solution) -> String {
        let mut svg = String::new();

        let (min_x, max_x, min_y, max_y) = self.get_bounds(instance);

        let scale_x = (self.width - 2.0 * self.margin) / (max_x - min_x).max(1.0);
        let scale_y = (self.height - 2.0 * self.margin) / (max_y - min_y).max(1.0);
        let scale = scale_x.min(scale_y);

        svg.push_str(&format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .node {{ fill: #3498db; stroke: #2c3e50; stroke-width: 2; }}
    .start {{ fill: #e74c3c; stroke: #c0392b; stroke-width: 2; }}
    .edge {{ stroke: #34495e; stroke-width: 2; fill: none; }}
    .missing {{ stroke: #e74c3c; stroke-width: 2; stroke-dasharray: 6,4; fill: none; }}
    .label {{ font-family: Arial; font-size: 10px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
<defs>
<marker id="arrow" markerWidth="10" markerHeight="10" refX="9" refY="3" orient="auto" markerUnits="strokeWidth">
<path d="M0,0 L0,6 L9,3 z" fill="#34495e"/>
</marker>
</defs>
"##,
            self.width, self.height, self.width, self.height
        ));

        let cost = if solution.feasible {
            format!("{:.2}", solution.cost)
        } else {
            "infeasible".to_string()
        };
        svg.push_str(&format!(
            r##"<text x="{}" y="25" class="title">Instance: {} | {} | Cost: {} | Feasible: {}</text>
"##,
            self.margin, instance.name, solution.algorithm, cost, solution.feasible
        ));

        let transform = |x: f64, y: f64| -> (f64, f64) {
            let tx = self.margin + (x - min_x) * scale;
            let ty = self.height - self.margin - (y - min_y) * scale;
            (tx, ty)
        };

        if solution.tour.len() > 1 {
            for i in 0..solution.tour.len() {
                let from = solution.tour[i];
                let to = solution.tour[(i + 1) % solution.tour.len()];
                let (a, b) = match (instance.node(from), instance.node(to)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => continue,
                };

                let (x1, y1) = transform(a.x, a.y);
                let (x2, y2) = transform(b.x, b.y);
                let class = if instance.has_arc(from, to) { "edge" } else { "missing" };

                svg.push_str(&format!(
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" class="{}" marker-end="url(#arrow)"/>
"#,
                    x1, y1, x2, y2, class
                ));
            }
        }

        let first = solution.tour.first().copied();
        for node in instance.nodes() {
            let (x, y) = transform(node.x, node.y);
            let class = if Some(node.id) == first { "start" } else { "node" };

            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" class="{}"/>
"##,
                x, y, self.node_radius, class
            ));

            svg.push_str(&format!(
                r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                x,
                y - self.node_radius - 3.0,
                node.id
            ));
        }

        let legend_y = self.height - 30.0;
        svg.push_str(&format!(
            r##"
<rect x="{}" y="{}" width="15" height="15" class="start"/>
<text x="{}" y="{}" class="label">Start</text>
<line x1="{}" y1="{}" x2="{}" y2="{}" class="missing"/>
<text x="{}" y="{}" class="label">Missing arc</text>
"##,
            self.margin,
            legend_y,
            self.margin + 20.0,
            legend_y + 12.0,
            self.margin + 80.0,
            legend_y + 8.0,
            self.margin + 110.0,
            legend_y + 8.0,
            self.margin + 115.0,
            legend_y + 12.0
        ));

        svg.push_str("</svg>");

        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> SolverResult<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG. Uses resvg when built with the `png` feature and
    /// falls back to `rsvg-convert`, then `magick`, then `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> SolverResult<()> {
        let path = path.as_ref();

        #[cfg(feature = "png")]
        {
            match self.render_png(svg, path) {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("resvg could not render {}: {}", path.display(), e),
            }
        }

        self.convert_externally(svg, path)
    }

    #[cfg(feature = "png")]
    fn render_png(&self, svg: &str, path: &Path) -> SolverResult<()> {
        let opt = usvg::Options::default();
        let rtree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| SolverError::Validation(format!("usvg parse error: {}", e)))?;
        let mut pixmap = Pixmap::new(self.width.max(1.0) as u32, self.height.max(1.0) as u32)
            .ok_or_else(|| SolverError::Allocation("PNG pixmap".to_string()))?;
        render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
            .ok_or_else(|| SolverError::Validation("resvg render failed".to_string()))?;
        pixmap
            .save_png(path)
            .map_err(|e| SolverError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
        Ok(())
    }

    fn convert_externally(&self, svg: &str, path: &Path) -> SolverResult<()> {
        let tmp_svg = path.with_extension("svg.tmp");
        std::fs::write(&tmp_svg, svg)?;

        let input = tmp_svg.to_string_lossy().into_owned();
        let output = path.to_string_lossy().into_owned();
        let (input, output) = (input.as_str(), output.as_str());
        let converters: [(&str, Vec<&str>); 3] = [
            ("rsvg-convert", vec!["-o", output, input]),
            ("magick", vec!["convert", input, output]),
            ("inkscape", vec![input, "--export-type=png", "--export-filename", output]),
        ];

        for (program, args) in &converters {
            if let Ok(status) = Command::new(program).args(args).status() {
                if status.success() {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
            }
        }

        let _ = std::fs::remove_file(&tmp_svg);
        Err(SolverError::Validation(
            "no SVG to PNG converter succeeded (tried rsvg-convert, magick, inkscape)".to_string(),
        ))
    }

    /// Get coordinate bounds
    fn get_bounds(&self, instance: &Instance) -> (f64, f64, f64, f64) {
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for node in instance.nodes() {
            min_x = min_x.min(node.x);
            max_x = max_x.max(node.x);
            min_y = min_y.min(node.y);
            max_y = max_y.max(node.y);
        }

        (min_x, max_x, min_y, max_y)
    }

    /// Export data for external plotting (e.g., matplotlib)
    pub fn export_plot_data(&self, instance: &Instance, solution: &Solution) -> String {
        let mut data = String::new();

        data.push_str("# TSP Solution Data\n");
        data.push_str(&format!("# Instance: {}\n", instance.name));
        data.push_str(&format!("# Cost: {:.2}\n", solution.cost));
        data.push_str(&format!("# Feasible: {}\n\n", solution.feasible));

        data.push_str("# Nodes: id, x, y\n");
        for node in instance.nodes() {
            data.push_str(&format!("{},{},{}\n", node.id, node.x, node.y));
        }

        data.push_str("\n# Tour: sequence of node ids\n");
        let tour_str: Vec<String> = solution.tour.iter().map(|n| n.to_string()).collect();
        data.push_str(&tour_str.join(","));
        data.push('\n');

        data
    }
}
