//! L2-regularised logistic regression fitted with damped Newton steps.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::estimator::ProbabilisticClassifier;

const TOLERANCE: f64 = 1e-6;
const MAX_LINE_SEARCH_STEPS: usize = 30;

/// Hyperparameters of [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength; smaller values regularize more.
    pub c: f64,
    pub max_iter: usize,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
        }
    }
}

/// Fitted logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Array1<f64>,
    pub intercept: f64,
    pub iterations: usize,
}

#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable `log(1 + exp(x))`.
#[inline]
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

impl LogisticRegression {
    /// Minimizes `0.5 * |w|^2 + C * sum(log_loss)`; the intercept is not penalized.
    #[must_use]
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: &LogisticParams) -> Self {
        let (n, d) = x.dim();

        // Design matrix with a trailing column of ones for the intercept.
        let mut xa = Array2::<f64>::ones((n, d + 1));
        xa.slice_mut(s![.., ..d]).assign(&x);
        let y = ArrayView1::from(y);

        let mut theta = Array1::<f64>::zeros(d + 1);
        let mut objective = loss(&xa, y, &theta, params.c, d);
        let mut iterations = 0;

        for iter in 0..params.max_iter {
            iterations = iter + 1;

            let margins = xa.dot(&theta);
            let p = margins.mapv(sigmoid);
            let s = p.mapv(|pi| pi * (1.0 - pi));

            let mut grad = xa.t().dot(&(&p - &y)) * params.c;
            grad.slice_mut(s![..d]).zip_mut_with(&theta.slice(s![..d]), |g, &w| *g += w);

            let weighted = &xa * &s.view().insert_axis(Axis(1));
            let mut hessian = xa.t().dot(&weighted) * params.c;
            for j in 0..d {
                hessian[[j, j]] += 1.0;
            }
            hessian[[d, d]] += 1e-10;

            let Some(step) = cholesky_solve(&hessian, &grad) else {
                debug!(iteration = iter, "Hessian not positive definite, stopping");
                break;
            };

            // Backtracking keeps each update a descent step.
            let decrease = grad.dot(&step);
            let mut t = 1.0;
            let mut accepted = false;
            for _ in 0..MAX_LINE_SEARCH_STEPS {
                let candidate = &theta - &(&step * t);
                let candidate_objective = loss(&xa, y, &candidate, params.c, d);
                if candidate_objective <= objective - 1e-4 * t * decrease {
                    theta = candidate;
                    objective = candidate_objective;
                    accepted = true;
                    break;
                }
                t *= 0.5;
            }

            let max_step = step.iter().fold(0.0_f64, |m, v| m.max((v * t).abs()));
            if !accepted || max_step < TOLERANCE {
                break;
            }
        }

        debug!(iterations, objective, "Fitted logistic regression");

        Self {
            weights: theta.slice(s![..d]).to_owned(),
            intercept: theta[d],
            iterations,
        }
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        (x.dot(&self.weights) + self.intercept).mapv(sigmoid)
    }
}

fn loss(xa: &Array2<f64>, y: ArrayView1<'_, f64>, theta: &Array1<f64>, c: f64, d: usize) -> f64 {
    let margins = xa.dot(theta);
    let data_loss: f64 = margins
        .iter()
        .zip(y.iter())
        .map(|(&m, &yi)| softplus(m) - yi * m)
        .sum();
    let penalty = 0.5 * theta.slice(s![..d]).dot(&theta.slice(s![..d]));
    c * data_loss + penalty
}

/// Solves `a * x = b` for symmetric positive definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // Forward substitution: L z = b.
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Back substitution: L^T x = z.
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_cholesky_solve() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(&a, &b).expect("positive definite");
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-12);

        let not_pd = array![[0.0, 1.0], [1.0, 0.0]];
        assert!(cholesky_solve(&not_pd, &b).is_none());
    }

    #[test]
    fn test_fits_separable_direction() {
        let x = array![[-2.0], [-1.0], [-0.5], [0.5], [1.0], [2.0]];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let model = LogisticRegression::fit(x.view(), &y, &LogisticParams::default());

        assert!(model.weights[0] > 0.0);
        let proba = model.predict_proba(x.view());
        assert!(proba[0] < 0.5 && proba[5] > 0.5);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_stronger_regularization_shrinks_weights() {
        let x = array![[-2.0], [-1.0], [-0.5], [0.5], [1.0], [2.0]];
        let y = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let loose = LogisticRegression::fit(x.view(), &y, &LogisticParams::default());
        let tight = LogisticRegression::fit(
            x.view(),
            &y,
            &LogisticParams {
                c: 0.01,
                ..LogisticParams::default()
            },
        );
        assert!(tight.weights[0].abs() < loose.weights[0].abs());
    }

    #[test]
    fn test_intercept_matches_base_rate_without_features() {
        let x = Array2::<f64>::zeros((4, 0));
        let y = [1.0, 0.0, 0.0, 0.0];
        let model = LogisticRegression::fit(x.view(), &y, &LogisticParams::default());
        assert_abs_diff_eq!(sigmoid(model.intercept), 0.25, epsilon = 1e-4);
    }
}
