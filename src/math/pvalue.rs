//! Two-sided significance of a correlation coefficient.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value for a correlation coefficient `r` over `n` pairs.
///
/// Tests `t = r·sqrt(df / (1 - r²))` against Student's t with `df = n - 2`.
/// With fewer than 3 pairs the test has no degrees of freedom and `1.0` is
/// returned; `|r| = 1` gives `0.0`.
pub fn t_test_p_value(r: f64, n: usize) -> f64 {
    if n < 3 || !r.is_finite() {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }
    let t = r.abs() * (df / one_minus_r2).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t)).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}
