//! Form/function scatter chart rendered as inline SVG

use bookz_common::db::models::ChartPoint;

use super::html_escape;

const SIZE: f64 = 420.0;
const MARGIN: f64 = 40.0;
const AXIS_MAX: f64 = 10.0;

/// Map an axis score (-10..=10) to an SVG coordinate
fn scale(value: i64) -> f64 {
    let plot = SIZE - 2.0 * MARGIN;
    MARGIN + (value as f64 + AXIS_MAX) / (2.0 * AXIS_MAX) * plot
}

/// Scatter plot with form on the x axis and function on the y axis
pub fn render_chart(points: &[ChartPoint]) -> String {
    let mid = scale(0);
    let (lo, hi) = (scale(-10), scale(10));

    let mut svg = format!(
        r##"<svg class="chart" width="{size}" height="{size}" viewBox="0 0 {size} {size}" xmlns="http://www.w3.org/2000/svg" role="img" aria-label="Form versus function">
    <rect x="{lo}" y="{lo}" width="{span}" height="{span}" fill="#1a1a1a" stroke="#3a3a3a"/>
    <line x1="{lo}" y1="{mid}" x2="{hi}" y2="{mid}" stroke="#555"/>
    <line x1="{mid}" y1="{lo}" x2="{mid}" y2="{hi}" stroke="#555"/>
    <text x="{mid}" y="{label_bottom}" fill="#aaa" font-size="12" text-anchor="middle">form</text>
    <text x="12" y="{mid}" fill="#aaa" font-size="12" text-anchor="middle" transform="rotate(-90 12 {mid})">function</text>
    <text x="{lo}" y="{label_bottom}" fill="#666" font-size="10" text-anchor="middle">-10</text>
    <text x="{hi}" y="{label_bottom}" fill="#666" font-size="10" text-anchor="middle">10</text>
"##,
        size = SIZE,
        lo = lo,
        hi = hi,
        mid = mid,
        span = hi - lo,
        label_bottom = SIZE - 12.0,
    );

    for point in points {
        // SVG y grows downwards; high function plots near the top
        let x = scale(point.form);
        let y = SIZE - scale(point.function);
        svg.push_str(&format!(
            r##"    <circle cx="{x:.1}" cy="{y:.1}" r="5" fill="#4a9eff" fill-opacity="0.8"><title>{title} (form {form}, function {function})</title></circle>
"##,
            x = x,
            y = y,
            title = html_escape(&point.title),
            form = point.form,
            function = point.function,
        ));
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(title: &str, form: i64, function: i64) -> ChartPoint {
        ChartPoint {
            review_id: 1,
            title: title.to_string(),
            form,
            function,
        }
    }

    #[test]
    fn test_scale_bounds() {
        assert_eq!(scale(-10), MARGIN);
        assert_eq!(scale(10), SIZE - MARGIN);
        assert_eq!(scale(0), SIZE / 2.0);
    }

    #[test]
    fn test_render_points() {
        let svg = render_chart(&[point("Dune", 10, 10), point("<Emma>", -10, -10)]);

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 2);
        // form 10, function 10 is the top-right corner
        assert!(svg.contains(r#"cx="380.0" cy="40.0""#));
        assert!(svg.contains("&lt;Emma&gt;"));
    }

    #[test]
    fn test_render_empty() {
        let svg = render_chart(&[]);
        assert!(!svg.contains("<circle"));
    }
}
