//! L2-regularized binary logistic regression fitted with Newton's method.
//!
//! The objective is the usual `C · Σ logloss + ½‖w‖²` with an unpenalized
//! intercept. Inputs are standardized internally; the fitted model keeps the
//! column means and scales so callers always pass raw feature values.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QuizError, Result};

const MIN_SCALE: f64 = 1e-12;
const INTERCEPT_JITTER: f64 = 1e-10;
const ARMIJO: f64 = 1e-4;
const MAX_HALVINGS: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    c: f64,
    max_iter: usize,
    tol: f64,
    coefficients: Option<Vec<f64>>,
    intercept: f64,
    means: Vec<f64>,
    scales: Vec<f64>,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-4,
            coefficients: None,
            intercept: 0.0,
            means: Vec::new(),
            scales: Vec::new(),
            n_iter: 0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    /// Width of the feature vector the fitted model expects
    pub fn n_features(&self) -> Option<usize> {
        self.coefficients.as_ref().map(Vec::len)
    }

    /// Width of a fitted model whose standardization vectors agree with its
    /// coefficients. Models read back from disk go through this before use.
    pub fn validated_width(&self) -> Result<usize> {
        let coefficients = self.coefficients.as_ref().ok_or(QuizError::NotFitted)?;
        let width = coefficients.len();
        if self.means.len() != width || self.scales.len() != width {
            return Err(QuizError::Feature(format!(
                "model has {} coefficients but {} means and {} scales",
                width,
                self.means.len(),
                self.scales.len()
            )));
        }
        Ok(width)
    }

    /// Newton iterations used by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[bool]) -> Result<()> {
        let n_samples = x.len();
        if n_samples == 0 {
            return Err(QuizError::Training("cannot fit with zero samples".into()));
        }
        if n_samples != y.len() {
            return Err(QuizError::Training(format!(
                "{} feature rows but {} labels",
                n_samples,
                y.len()
            )));
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(QuizError::Training("feature rows have different widths".into()));
        }
        if y.iter().all(|&l| l) || y.iter().all(|&l| !l) {
            return Err(QuizError::Training(
                "labels must contain both classes".into(),
            ));
        }
        if self.c <= 0.0 {
            return Err(QuizError::Training("C must be positive".into()));
        }

        let (means, scales) = column_stats(x);
        // Column 0 is the intercept.
        let design: Vec<Vec<f64>> = x
            .iter()
            .map(|row| {
                std::iter::once(1.0)
                    .chain(
                        row.iter()
                            .zip(means.iter().zip(&scales))
                            .map(|(v, (m, s))| (v - m) / s),
                    )
                    .collect()
            })
            .collect();
        let targets: Vec<f64> = y.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let dim = n_features + 1;

        let mut theta = vec![0.0; dim];
        let mut objective = self.objective(&design, &targets, &theta);
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;

            let mut gradient = vec![0.0; dim];
            let mut hessian = vec![vec![0.0; dim]; dim];
            for (row, &t) in design.iter().zip(&targets) {
                let p = sigmoid(dot(row, &theta));
                let residual = self.c * (p - t);
                let weight = self.c * p * (1.0 - p);
                for j in 0..dim {
                    gradient[j] += residual * row[j];
                    let wj = weight * row[j];
                    for k in 0..=j {
                        hessian[j][k] += wj * row[k];
                    }
                }
            }
            hessian[0][0] += INTERCEPT_JITTER;
            for j in 1..dim {
                gradient[j] += theta[j];
                hessian[j][j] += 1.0;
            }
            for j in 0..dim {
                for k in 0..j {
                    hessian[k][j] = hessian[j][k];
                }
            }

            let direction = solve_spd(hessian, &gradient)?;
            let decrease = dot(&gradient, &direction);

            let mut step = 1.0;
            let mut candidate = theta.clone();
            let mut accepted = false;
            for _ in 0..MAX_HALVINGS {
                for j in 0..dim {
                    candidate[j] = theta[j] - step * direction[j];
                }
                let value = self.objective(&design, &targets, &candidate);
                if value <= objective - ARMIJO * step * decrease {
                    objective = value;
                    accepted = true;
                    break;
                }
                step *= 0.5;
            }
            if !accepted {
                debug!("line search stalled after {} iterations", iterations);
                break;
            }

            let largest_step = direction
                .iter()
                .map(|d| (step * d).abs())
                .fold(0.0, f64::max);
            theta = candidate;
            if largest_step < self.tol {
                break;
            }
        }

        debug!(
            iterations,
            objective, "logistic regression fit finished"
        );

        self.intercept = theta[0];
        self.coefficients = Some(theta[1..].to_vec());
        self.means = means;
        self.scales = scales;
        self.n_iter = iterations;
        Ok(())
    }

    fn objective(&self, design: &[Vec<f64>], targets: &[f64], theta: &[f64]) -> f64 {
        let loss: f64 = design
            .iter()
            .zip(targets)
            .map(|(row, &t)| {
                let z = dot(row, theta);
                log1p_exp(z) - t * z
            })
            .sum();
        let penalty: f64 = theta[1..].iter().map(|w| w * w).sum();
        self.c * loss + 0.5 * penalty
    }

    /// Signed distance to the decision boundary for one raw feature row
    pub fn decision_function(&self, x: &[f64]) -> Result<f64> {
        let coefficients = self.coefficients.as_ref().ok_or(QuizError::NotFitted)?;
        if x.len() != coefficients.len() {
            return Err(QuizError::Feature(format!(
                "expected {} features, got {}",
                coefficients.len(),
                x.len()
            )));
        }
        let z = x
            .iter()
            .zip(coefficients)
            .zip(self.means.iter().zip(&self.scales))
            .map(|((v, w), (m, s))| w * (v - m) / s)
            .sum::<f64>();
        Ok(self.intercept + z)
    }

    /// Probabilities of class 0 (flop) and class 1 (hit)
    pub fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2]> {
        let p = sigmoid(self.decision_function(x)?);
        Ok([1.0 - p, p])
    }

    /// Predicted class, `true` for class 1
    pub fn predict(&self, x: &[f64]) -> Result<bool> {
        Ok(self.decision_function(x)? > 0.0)
    }

    /// Fraction of rows whose prediction matches the label
    pub fn score(&self, x: &[Vec<f64>], y: &[bool]) -> Result<f64> {
        if x.is_empty() {
            return Ok(0.0);
        }
        let mut correct = 0usize;
        for (row, &label) in x.iter().zip(y) {
            if self.predict(row)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / x.len() as f64)
    }
}

fn column_stats(x: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let n = x.len() as f64;
    let width = x[0].len();
    let mut means = vec![0.0; width];
    for row in x {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut scales = vec![0.0; width];
    for row in x {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (v - m) * (v - m) / n;
        }
    }
    for s in &mut scales {
        *s = s.sqrt();
        if *s < MIN_SCALE {
            *s = 1.0;
        }
    }
    (means, scales)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^z)` without overflow
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Solve `A·x = b` for symmetric positive-definite `A` by Cholesky factorization
fn solve_spd(mut a: Vec<Vec<f64>>, b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    for j in 0..n {
        let mut diag = a[j][j];
        for k in 0..j {
            diag -= a[j][k] * a[j][k];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(QuizError::Training(
                "Hessian is not positive definite".into(),
            ));
        }
        let diag = diag.sqrt();
        a[j][j] = diag;
        for i in (j + 1)..n {
            let mut value = a[i][j];
            for k in 0..j {
                value -= a[i][k] * a[j][k];
            }
            a[i][j] = value / diag;
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut value = b[i];
        for k in 0..i {
            value -= a[i][k] * z[k];
        }
        z[i] = value / a[i][i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut value = z[i];
        for k in (i + 1)..n {
            value -= a[k][i] * x[k];
        }
        x[i] = value / a[i][i];
    }
    Ok(x)
}
