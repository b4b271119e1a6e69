//! Scatter plot of placements as a standalone SVG document.

use crate::{Error, Result};
use selkie::Placement;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    /// Width and height of the square canvas, in pixels.
    pub size: f64,
    /// Border between the outermost point and the canvas edge.
    pub pad: f64,
    pub point_radius: f64,
    pub draw_points: bool,
    pub font_family: String,
    pub font_size: f64,
    pub point_colour: String,
    pub label_colour: String,
    /// Label colour for the reference entity, which is also set in bold.
    pub reference_colour: String,
    /// `None` leaves the canvas transparent.
    pub background: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            size: 700.0,
            pad: 80.0,
            point_radius: 2.0,
            draw_points: true,
            font_family: "Lucida Grande".to_string(),
            font_size: 16.0,
            point_colour: "black".to_string(),
            label_colour: "blue".to_string(),
            reference_colour: "red".to_string(),
            background: Some("white".to_string()),
        }
    }
}

/// Plots exist for two and three dimensions only.
pub fn check_dimensions(dimensions: usize) -> Result<()> {
    if (2..=3).contains(&dimensions) {
        Ok(())
    } else {
        Err(Error::InvalidDimensionCount { dimensions })
    }
}

/// Renders every visible placement as a point with its display label centred on it.
///
/// Both axes share one scale, fitted to the larger extent; the first axis grows to the right and
/// the second grows upwards. A third dimension is drawn obliquely: `z` shifts a point up and to
/// the right by `z / √2` on each axis.
pub fn render_svg(
    placements: &[Placement],
    dimensions: usize,
    options: &PlotOptions,
) -> Result<String> {
    check_dimensions(dimensions)?;

    let mut points = Vec::new();
    for placement in placements.iter().filter(|p| p.included) {
        points.push((placement, project(placement, dimensions)?));
    }
    if points.is_empty() {
        return Err(Error::EmptyPlot);
    }
    let frame = Frame::fit(points.iter().map(|(_, xy)| *xy), options);

    let size = fmt(options.size);
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#
    );
    if let Some(bg) = &options.background {
        let _ = write!(
            out,
            r#"<rect width="{size}" height="{size}" fill="{}"/>"#,
            escape_xml(bg)
        );
    }

    if options.draw_points {
        let _ = write!(out, r#"<g class="points" fill="{}">"#, escape_xml(&options.point_colour));
        for (_, xy) in &points {
            let (x, y) = frame.to_screen(*xy);
            let _ = write!(
                out,
                r#"<circle cx="{}" cy="{}" r="{}"/>"#,
                fmt(x),
                fmt(y),
                fmt(options.point_radius)
            );
        }
        out.push_str("</g>");
    }

    let _ = write!(
        out,
        r#"<g class="labels" font-family="{}" font-size="{}" text-anchor="middle" dominant-baseline="central">"#,
        escape_xml(&options.font_family),
        fmt(options.font_size)
    );
    for (placement, xy) in &points {
        let (x, y) = frame.to_screen(*xy);
        if placement.is_reference {
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" fill="{}" font-weight="bold">"#,
                fmt(x),
                fmt(y),
                escape_xml(&options.reference_colour)
            );
        } else {
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" fill="{}">"#,
                fmt(x),
                fmt(y),
                escape_xml(&options.label_colour)
            );
        }
        out.push_str(&escape_xml(&placement.display_label));
        out.push_str("</text>");
    }
    out.push_str("</g></svg>");

    tracing::debug!(points = points.len(), dimensions, "rendered plot");
    Ok(out)
}

fn project(placement: &Placement, dimensions: usize) -> Result<(f64, f64)> {
    let p = &placement.position;
    if p.len() != dimensions {
        return Err(Error::PositionDimension {
            label: placement.label.clone(),
            expected: dimensions,
            found: p.len(),
        });
    }
    let (x, y) = (p[0], p[1]);
    if dimensions == 3 {
        let z = p[2] * std::f64::consts::FRAC_1_SQRT_2;
        Ok((x + z, y + z))
    } else {
        Ok((x, y))
    }
}

/// World-to-screen mapping. The drawing is centred along whichever axis has the smaller extent.
struct Frame {
    min_x: f64,
    min_y: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    size: f64,
}

impl Frame {
    fn fit(points: impl Iterator<Item = (f64, f64)>, options: &PlotOptions) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let (span_x, span_y) = (max_x - min_x, max_y - min_y);
        let extent = span_x.max(span_y);
        let drawable = (options.size - 2.0 * options.pad).max(0.0);
        let scale = if extent.is_finite() && extent > 0.0 {
            drawable / extent
        } else {
            0.0
        };
        Self {
            min_x,
            min_y,
            scale,
            offset_x: options.pad + (drawable - span_x * scale) / 2.0,
            offset_y: options.pad + (drawable - span_y * scale) / 2.0,
            size: options.size,
        }
    }

    fn to_screen(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (
            self.offset_x + (x - self.min_x) * self.scale,
            self.size - (self.offset_y + (y - self.min_y) * self.scale),
        )
    }
}

/// Two decimals at most, trailing zeros trimmed, never `-0`.
fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.2}", v);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement(label: &str, position: &[f64]) -> Placement {
        Placement {
            label: label.to_string(),
            display_label: label.to_string(),
            position: position.to_vec(),
            is_reference: false,
            included: true,
        }
    }

    #[test]
    fn fmt_trims() {
        assert_eq!(fmt(80.0), "80");
        assert_eq!(fmt(12.5), "12.5");
        assert_eq!(fmt(1.23456), "1.23");
        assert_eq!(fmt(-0.001), "0");
        assert_eq!(fmt(f64::NAN), "0");
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape_xml(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&#39;");
    }

    #[test]
    fn frame_uses_one_scale_and_points_y_up() {
        let points = [
            placement("o", &[0.0, 0.0]),
            placement("p", &[1.0, 0.5]),
        ];
        let svg = render_svg(&points, 2, &PlotOptions::default()).unwrap();
        // Drawable area 540; x spans it, y spans half of it and is centred.
        assert!(svg.contains(r#"<circle cx="80" cy="485" r="2"/>"#), "{svg}");
        assert!(svg.contains(r#"<circle cx="620" cy="215" r="2"/>"#), "{svg}");
    }

    #[test]
    fn single_point_lands_in_the_middle() {
        let svg = render_svg(&[placement("only", &[3.0, -2.0])], 2, &PlotOptions::default())
            .unwrap();
        assert!(svg.contains(r#"<circle cx="350" cy="350" r="2"/>"#), "{svg}");
    }

    #[test]
    fn depth_moves_points_up_and_right() {
        let points = [
            placement("near", &[0.0, 0.0, 0.0]),
            placement("far", &[0.0, 0.0, 1.0]),
        ];
        let svg = render_svg(&points, 3, &PlotOptions::default()).unwrap();
        assert!(svg.contains(r#"<circle cx="80" cy="620" r="2"/>"#), "{svg}");
        assert!(svg.contains(r#"<circle cx="620" cy="80" r="2"/>"#), "{svg}");
    }

    #[test]
    fn position_length_must_match() {
        let err = render_svg(&[placement("a", &[1.0, 2.0])], 3, &PlotOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::PositionDimension { expected: 3, found: 2, .. }));
    }
}
