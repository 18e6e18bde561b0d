//! ASCII scatter of true outcome vs predicted score.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output
//!
//! Plot elements:
//! - one sample: `o`
//! - several samples in the same cell: `#`
//! - least-squares trend of predicted on true: `.`

use crate::fit::PredictionTable;

/// Render a scatter with the true outcome on x and the predicted score on y.
pub fn render_scatter(table: &PredictionTable, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (truth, scores) = table.columns();
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (value_range(&truth), value_range(&scores)) else {
        return "Scatter: no predictions\n".to_string();
    };
    let (px_min, px_max) = pad_range(x_min, x_max, 0.05);
    let (py_min, py_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Trend first so points overlay it.
    if let Some((a, b)) = trend(&truth, &scores) {
        let x0 = map_x(x_min, px_min, px_max, width);
        let y0 = map_y(a + b * x_min, py_min, py_max, height);
        let x1 = map_x(x_max, px_min, px_max, width);
        let y1 = map_y(a + b * x_max, py_min, py_max, height);
        draw_line(&mut grid, x0, y0, x1, y1, '.');
    }

    for (&t, &s) in truth.iter().zip(&scores) {
        let x = map_x(t, px_min, px_max, width);
        let y = map_y(s, py_min, py_max, height);
        grid[y][x] = match grid[y][x] {
            'o' | '#' => '#',
            _ => 'o',
        };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Scatter: n={} | true=[{x_min:.2}, {x_max:.2}] | predicted=[{y_min:.3}, {y_max:.3}]\n",
        truth.len()
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

/// Finite min/max; a constant column is widened to a unit span.
fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    if max > min {
        Some((min, max))
    } else {
        Some((min - 0.5, max + 0.5))
    }
}

/// Intercept and slope of `y ~ x`, or `None` when x has no spread.
fn trend(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len() as f64;
    if x.len() < 2 {
        return None;
    }
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|v| (v - mx) * (v - mx)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    if sxx <= 1e-12 {
        return None;
    }
    let b = sxy / sxx;
    let a = my - b * mx;
    (a.is_finite() && b.is_finite()).then_some((a, b))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
