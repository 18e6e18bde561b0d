//! Pearson and Spearman correlation with two-sided p-values.

use serde::{Deserialize, Serialize};

use crate::error::CvError;
use crate::math::rank::average_ranks;
use crate::math::pvalue::t_test_p_value;

/// A correlation coefficient and its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub coefficient: f64,
    pub p_value: f64,
}

impl Correlation {
    /// Stand-in for an undefined correlation: no association, no evidence.
    pub const UNINFORMATIVE: Correlation = Correlation {
        coefficient: 0.0,
        p_value: 1.0,
    };
}

/// Pearson product-moment correlation.
///
/// Fails with `DegenerateCorrelation` when either vector has zero variance, a
/// non-finite value, or fewer than two entries.
pub fn pearson(x: &[f64], y: &[f64]) -> Result<Correlation, CvError> {
    let r = pearson_coefficient(x, y)?;
    Ok(Correlation {
        coefficient: r,
        p_value: t_test_p_value(r, x.len()),
    })
}

/// Spearman rank correlation (Pearson on average ranks).
pub fn spearman(x: &[f64], y: &[f64]) -> Result<Correlation, CvError> {
    check_inputs(x, y)?;
    let rx = average_ranks(x);
    let ry = average_ranks(y);
    let rho = pearson_coefficient(&rx, &ry)?;
    Ok(Correlation {
        coefficient: rho,
        p_value: t_test_p_value(rho, x.len()),
    })
}

fn check_inputs(x: &[f64], y: &[f64]) -> Result<(), CvError> {
    if x.len() != y.len() {
        return Err(CvError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(CvError::DegenerateCorrelation(format!(
            "need at least 2 pairs, got {}",
            x.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(CvError::DegenerateCorrelation("non-finite input".to_string()));
    }
    Ok(())
}

fn pearson_coefficient(x: &[f64], y: &[f64]) -> Result<f64, CvError> {
    check_inputs(x, y)?;
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den_x = 0.0;
    let mut den_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }

    if den_x <= 0.0 || den_y <= 0.0 {
        return Err(CvError::DegenerateCorrelation("zero variance".to_string()));
    }
    let r = num / (den_x.sqrt() * den_y.sqrt());
    if !r.is_finite() {
        return Err(CvError::DegenerateCorrelation("non-finite coefficient".to_string()));
    }
    Ok(r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn pearson_perfect_linear() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [3.0, 5.0, 7.0, 9.0, 11.0];
        let c = pearson(&x, &y).unwrap();
        assert_abs_diff_eq!(c.coefficient, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.p_value, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pearson_known_value() {
        // r = 0.8 for this classic textbook pair.
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 1.0, 4.0, 3.0, 5.0];
        let c = pearson(&x, &y).unwrap();
        assert_abs_diff_eq!(c.coefficient, 0.8, epsilon = 1e-12);
        assert!(c.p_value > 0.0 && c.p_value < 1.0);
    }

    #[test]
    fn spearman_is_rank_based() {
        // Monotone but non-linear: Spearman is exactly 1, Pearson is not.
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 9.0, 16.0, 100.0];
        let s = spearman(&x, &y).unwrap();
        let p = pearson(&x, &y).unwrap();
        assert_abs_diff_eq!(s.coefficient, 1.0, epsilon = 1e-12);
        assert!(p.coefficient < 1.0);
    }

    #[test]
    fn spearman_handles_ties() {
        let x = [1.0, 2.0, 2.0, 3.0];
        let y = [10.0, 20.0, 20.0, 30.0];
        let s = spearman(&x, &y).unwrap();
        assert_abs_diff_eq!(s.coefficient, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_variance_is_degenerate() {
        let err = pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, CvError::DegenerateCorrelation(_)));
        let err = spearman(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap_err();
        assert!(matches!(err, CvError::DegenerateCorrelation(_)));
    }

    #[test]
    fn length_mismatch_is_reported() {
        let err = pearson(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(err, CvError::LengthMismatch { left: 2, right: 1 });
    }
}
