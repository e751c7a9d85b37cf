use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// FitResult
// ---------------------------------------------------------------------------

/// Which regression family produced a fit. Drives [`FitResult::predict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitFamily {
    Linear,
    Polynomial,
    /// `y = a·e^(b·x)`
    Exponential,
    /// `y = a + b·ln(x)`
    Logarithmic,
    /// `y = a·x^b`
    Power,
}

/// Output of one regression: coefficients, a rendered equation, R²
/// against the original `y`, and a pure prediction function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Human-readable model name, e.g. `"linear"`.
    pub model: String,
    /// Rendered equation, e.g. `"y = 3.0000x + 2.0000"`.
    pub equation: String,
    /// Coefficient of determination over the untransformed `y`.
    /// `NaN` when `y` is constant — callers must guard.
    pub r_squared: f64,
    /// Ordered coefficients. Linear: `[slope, intercept]`; polynomial:
    /// highest power first; the linearised families: `[a, b]`.
    pub coefficients: Vec<f64>,
    /// Family tag used by [`FitResult::predict`].
    pub family: FitFamily,
}

impl FitResult {
    /// Evaluate the fitted model at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        match self.family {
            FitFamily::Linear => self.coefficients[0] * x + self.coefficients[1],
            FitFamily::Polynomial => self
                .coefficients
                .iter()
                .fold(0.0, |acc, &c| acc * x + c),
            FitFamily::Exponential => self.coefficients[0] * (self.coefficients[1] * x).exp(),
            FitFamily::Logarithmic => self.coefficients[0] + self.coefficients[1] * x.abs().ln(),
            FitFamily::Power => self.coefficients[0] * x.abs().powf(self.coefficients[1]),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation and shared numerics
// ---------------------------------------------------------------------------

fn validate_xy(x: &[f64], y: &[f64]) -> Result<(), CoreError> {
    if x.is_empty() || y.is_empty() {
        return Err(CoreError::InvalidInput(
            "x and y must be non-empty".to_string(),
        ));
    }
    if x.len() != y.len() {
        return Err(CoreError::InvalidInput(format!(
            "x has {} values but y has {}",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

/// R² of `predictions` against the original `y`: `1 − SS_res/SS_tot`.
/// `NaN` when `y` has zero variance (the ratio is undefined).
pub fn r_squared(y: &[f64], predictions: &[f64]) -> f64 {
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    let ss_res: f64 = y
        .iter()
        .zip(predictions)
        .map(|(v, p)| (v - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        return f64::NAN;
    }
    1.0 - ss_res / ss_tot
}

/// Ordinary least squares on raw sequences: `(slope, intercept)`.
fn ols(x: &[f64], y: &[f64]) -> Result<(f64, f64), CoreError> {
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_xx: f64 = x.iter().map(|a| a * a).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom == 0.0 {
        return Err(CoreError::NumericDegenerate(
            "zero variance in x".to_string(),
        ));
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Ok((slope, intercept))
}

// ---------------------------------------------------------------------------
// Regression families
// ---------------------------------------------------------------------------

/// Ordinary least-squares line, `y = m·x + b`.
pub fn fit_linear(x: &[f64], y: &[f64]) -> Result<FitResult, CoreError> {
    validate_xy(x, y)?;
    let (m, b) = ols(x, y)?;
    let predictions: Vec<f64> = x.iter().map(|&v| m * v + b).collect();
    Ok(FitResult {
        model: "linear".to_string(),
        equation: format!("y = {m:.4}x + {b:.4}"),
        r_squared: r_squared(y, &predictions),
        coefficients: vec![m, b],
        family: FitFamily::Linear,
    })
}

/// Least-squares polynomial of the given order, solved via the normal
/// equations with Gaussian elimination.
pub fn fit_polynomial(x: &[f64], y: &[f64], order: usize) -> Result<FitResult, CoreError> {
    validate_xy(x, y)?;
    if x.len() <= order {
        return Err(CoreError::InvalidInput(format!(
            "order-{order} polynomial needs more than {order} points, got {}",
            x.len()
        )));
    }

    let terms = order + 1;
    // Normal equations: A^T·A · c = A^T·y over the Vandermonde matrix,
    // accumulated directly from power sums.
    let mut matrix = vec![vec![0.0; terms + 1]; terms];
    for (row, m) in matrix.iter_mut().enumerate() {
        for col in 0..terms {
            m[col] = x.iter().map(|&v| v.powi((row + col) as i32)).sum();
        }
        m[terms] = x
            .iter()
            .zip(y)
            .map(|(&v, &w)| v.powi(row as i32) * w)
            .sum();
    }

    // Coefficients come back lowest power first.
    let mut coeffs_low_first = solve_gaussian(&mut matrix, terms)?;
    coeffs_low_first.reverse();
    let coefficients = coeffs_low_first;

    let predictions: Vec<f64> = x
        .iter()
        .map(|&v| coefficients.iter().fold(0.0, |acc, &c| acc * v + c))
        .collect();

    let equation = render_polynomial(&coefficients);
    Ok(FitResult {
        model: format!("polynomial (order {order})"),
        equation,
        r_squared: r_squared(y, &predictions),
        coefficients,
        family: FitFamily::Polynomial,
    })
}

/// Exponential fit `y = a·e^(b·x)`, linearised through `ln(|y|)`.
///
/// The absolute value keeps the logarithm defined for non-positive `y`
/// but distorts sign-varying series — preserved legacy behavior.
pub fn fit_exponential(x: &[f64], y: &[f64]) -> Result<FitResult, CoreError> {
    validate_xy(x, y)?;
    let ln_y: Vec<f64> = y.iter().map(|&v| ln_abs(v)).collect();
    let (slope, intercept) = ols(x, &ln_y)?;
    let a = intercept.exp();
    let b = slope;

    let predictions: Vec<f64> = x.iter().map(|&v| a * (b * v).exp()).collect();
    Ok(FitResult {
        model: "exponential".to_string(),
        equation: format!("y = {a:.4}·e^({b:.4}x)"),
        r_squared: r_squared(y, &predictions),
        coefficients: vec![a, b],
        family: FitFamily::Exponential,
    })
}

/// Logarithmic fit `y = a + b·ln(x)`, linearised through `ln(|x|)`.
pub fn fit_logarithmic(x: &[f64], y: &[f64]) -> Result<FitResult, CoreError> {
    validate_xy(x, y)?;
    let ln_x: Vec<f64> = x.iter().map(|&v| ln_abs(v)).collect();
    let (b, a) = ols(&ln_x, y)?;

    let predictions: Vec<f64> = x.iter().map(|&v| a + b * ln_abs(v)).collect();
    Ok(FitResult {
        model: "logarithmic".to_string(),
        equation: format!("y = {a:.4} + {b:.4}·ln(x)"),
        r_squared: r_squared(y, &predictions),
        coefficients: vec![a, b],
        family: FitFamily::Logarithmic,
    })
}

/// Power-law fit `y = a·x^b`, linearised through `ln(|x|)` vs `ln(|y|)`.
pub fn fit_power(x: &[f64], y: &[f64]) -> Result<FitResult, CoreError> {
    validate_xy(x, y)?;
    let ln_x: Vec<f64> = x.iter().map(|&v| ln_abs(v)).collect();
    let ln_y: Vec<f64> = y.iter().map(|&v| ln_abs(v)).collect();
    let (b, ln_a) = ols(&ln_x, &ln_y)?;
    let a = ln_a.exp();

    let predictions: Vec<f64> = x.iter().map(|&v| a * v.abs().powf(b)).collect();
    Ok(FitResult {
        model: "power".to_string(),
        equation: format!("y = {a:.4}·x^{b:.4}"),
        r_squared: r_squared(y, &predictions),
        coefficients: vec![a, b],
        family: FitFamily::Power,
    })
}

fn ln_abs(v: f64) -> f64 {
    // ln(0) is -inf; clamp to a very small magnitude instead so the
    // linearised system stays finite.
    let m = v.abs();
    if m == 0.0 {
        f64::MIN_POSITIVE.ln()
    } else {
        m.ln()
    }
}

/// Gaussian elimination with partial pivoting over an augmented matrix
/// (`n` rows, `n + 1` columns). Returns coefficients lowest power first.
fn solve_gaussian(matrix: &mut [Vec<f64>], n: usize) -> Result<Vec<f64>, CoreError> {
    for col in 0..n {
        // Pivot on the largest remaining magnitude.
        let pivot_row = (col..n)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);
        matrix.swap(col, pivot_row);

        if matrix[col][col].abs() < 1e-12 {
            return Err(CoreError::NumericDegenerate(
                "singular normal-equation matrix (degenerate x values)".to_string(),
            ));
        }

        for row in col + 1..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..=n {
                matrix[row][k] -= factor * matrix[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = matrix[row][n];
        for col in row + 1..n {
            acc -= matrix[row][col] * solution[col];
        }
        solution[row] = acc / matrix[row][row];
    }
    Ok(solution)
}

/// Render a polynomial as `a·x^n + b·x^(n-1) + …`, highest power first.
fn render_polynomial(coefficients: &[f64]) -> String {
    let highest = coefficients.len() - 1;
    let terms: Vec<String> = coefficients
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let power = highest - i;
            match power {
                0 => format!("{c:.4}"),
                1 => format!("{c:.4}x"),
                _ => format!("{c:.4}x^{power}"),
            }
        })
        .collect();
    format!("y = {}", terms.join(" + "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} vs {b}");
    }

    #[test]
    fn linear_recovers_exact_line() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 2.0).collect();
        let fit = fit_linear(&x, &y).unwrap();

        assert_close(fit.coefficients[0], 3.0, 1e-9);
        assert_close(fit.coefficients[1], 2.0, 1e-9);
        assert_close(fit.r_squared, 1.0, 1e-9);
        assert_close(fit.predict(4.0), 14.0, 1e-9);
    }

    #[test]
    fn constant_x_is_degenerate() {
        let x = vec![2.0, 2.0, 2.0];
        let y = vec![1.0, 2.0, 3.0];
        assert!(matches!(
            fit_linear(&x, &y),
            Err(CoreError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn constant_y_yields_nan_r_squared() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![5.0, 5.0, 5.0];
        let fit = fit_linear(&x, &y).unwrap();
        assert!(fit.r_squared.is_nan());
    }

    #[test]
    fn quadratic_recovered_by_polynomial_fit() {
        let x: Vec<f64> = (-5..=5).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v * v - 3.0 * v + 1.0).collect();
        let fit = fit_polynomial(&x, &y, 2).unwrap();

        assert_close(fit.coefficients[0], 2.0, 1e-6);
        assert_close(fit.coefficients[1], -3.0, 1e-6);
        assert_close(fit.coefficients[2], 1.0, 1e-6);
        assert_close(fit.r_squared, 1.0, 1e-9);
        assert!(fit.equation.contains("x^2"));
    }

    #[test]
    fn exponential_recovered_on_positive_data() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.5 * (0.8 * v).exp()).collect();
        let fit = fit_exponential(&x, &y).unwrap();

        assert_close(fit.coefficients[0], 1.5, 1e-6);
        assert_close(fit.coefficients[1], 0.8, 1e-6);
        assert_close(fit.r_squared, 1.0, 1e-6);
    }

    #[test]
    fn power_law_recovered_on_positive_data() {
        let x: Vec<f64> = (1..30).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v.powf(1.7)).collect();
        let fit = fit_power(&x, &y).unwrap();

        assert_close(fit.coefficients[0], 2.0, 1e-6);
        assert_close(fit.coefficients[1], 1.7, 1e-6);
    }

    #[test]
    fn logarithmic_recovered() {
        let x: Vec<f64> = (1..50).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 0.5 + 2.5 * v.ln()).collect();
        let fit = fit_logarithmic(&x, &y).unwrap();

        assert_close(fit.coefficients[0], 0.5, 1e-6);
        assert_close(fit.coefficients[1], 2.5, 1e-6);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(matches!(
            fit_linear(&[1.0, 2.0], &[1.0]),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            fit_polynomial(&[], &[], 2),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
