//! Least-squares linear models.
//!
//! Both models fit an unpenalised intercept by centring `x` and `y`, then solve
//! the normal equations. One-hot blocks make `xᵀx` singular, so the solver
//! pins free coefficients to zero instead of failing.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::estimator::Regressor;

/// Relative pivot tolerance for rank detection.
const PIVOT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new() -> Self {
        LinearRegression {
            coefficients: Array1::zeros(0),
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &'static str {
        "linear_regression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let (coefficients, intercept) = fit_centered(x, y, 0.0);
        self.coefficients = coefficients;
        self.intercept = intercept;
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

/// L2-regularised least squares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ridge {
    alpha: f64,
    coefficients: Array1<f64>,
    intercept: f64,
}

impl Ridge {
    pub fn new(alpha: f64) -> Self {
        Ridge {
            alpha,
            coefficients: Array1::zeros(0),
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }
}

impl Regressor for Ridge {
    fn name(&self) -> &'static str {
        "ridge"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) {
        let (coefficients, intercept) = fit_centered(x, y, self.alpha);
        self.coefficients = coefficients;
        self.intercept = intercept;
    }

    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.coefficients) + self.intercept
    }
}

fn fit_centered(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> (Array1<f64>, f64) {
    let n_features = x.ncols();
    let (x_mean, y_mean) = match (x.mean_axis(Axis(0)), y.mean()) {
        (Some(xm), Some(ym)) => (xm, ym),
        _ => return (Array1::zeros(n_features), 0.0),
    };

    let xc = x - &x_mean;
    let yc = y - y_mean;

    let mut gram = xc.t().dot(&xc);
    for i in 0..n_features {
        gram[[i, i]] += alpha;
    }
    let rhs = xc.t().dot(&yc);

    let coefficients = solve_symmetric(gram, rhs);
    let intercept = y_mean - x_mean.dot(&coefficients);
    (coefficients, intercept)
}

/// Solve `a · β = b` by Gauss-Jordan elimination with partial pivoting.
/// Columns without a usable pivot are treated as free and set to zero, which
/// gives an exact solution whenever the system is consistent (as normal
/// equations always are).
fn solve_symmetric(mut a: Array2<f64>, mut b: Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0, f64::max).max(1.0);
    let tolerance = scale * PIVOT_TOLERANCE;

    let mut pivot_of_column: Vec<Option<usize>> = vec![None; n];
    let mut row = 0;
    for col in 0..n {
        if row == n {
            break;
        }
        let (best, best_abs) = (row..n)
            .map(|r| (r, a[[r, col]].abs()))
            .fold((row, -1.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if best_abs <= tolerance {
            continue;
        }
        if best != row {
            for k in 0..n {
                a.swap([best, k], [row, k]);
            }
            b.swap(best, row);
        }

        let pivot = a[[row, col]];
        for k in 0..n {
            a[[row, k]] /= pivot;
        }
        b[row] /= pivot;

        for r in 0..n {
            if r == row {
                continue;
            }
            let factor = a[[r, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[r, k]] -= factor * a[[row, k]];
            }
            b[r] -= factor * b[row];
        }

        pivot_of_column[col] = Some(row);
        row += 1;
    }

    let mut solution = Array1::zeros(n);
    for (col, pivot_row) in pivot_of_column.iter().enumerate() {
        if let Some(r) = pivot_row {
            solution[col] = b[*r];
        }
    }
    solution
}
