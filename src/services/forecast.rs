use chrono::Days;

use crate::error::AppError;
use crate::models::forecast::{ForecastPoint, ForecastResult};
use crate::models::price::{Field, Series};

/// Fewest closing prices a fit is attempted on
pub const MIN_OBSERVATIONS: usize = 30;

/// ARIMA(p, d, q) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize, // autoregressive lags
    pub d: usize, // differencing steps
    pub q: usize, // moving-average terms
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 5, d: 1, q: 0 }
    }
}

/// Projects closing prices with a fixed-order ARIMA model.
///
/// The AR coefficients are estimated by conditional least squares on the
/// differenced closes, without a constant term. The forecast is mapped onto
/// consecutive calendar days after the last historical date, weekends
/// included. Fitting is closed-form, so identical input gives identical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastEngine {
    order: ArimaOrder,
}

impl ForecastEngine {
    pub fn new(order: ArimaOrder) -> Self {
        Self { order }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn forecast(&self, series: &Series, steps: usize) -> Result<ForecastResult, AppError> {
        if steps == 0 {
            return Err(AppError::input("steps must be a positive integer"));
        }

        let last_date = series.last_date().ok_or_else(|| {
            AppError::validation("Last historical date is not valid: the series is empty")
        })?;

        let closes = series.column(Field::Close)?;
        if closes.len() < MIN_OBSERVATIONS {
            return Err(AppError::model_fit(format!(
                "series too short: {} observations, need at least {}",
                closes.len(),
                MIN_OBSERVATIONS
            )));
        }
        if closes.iter().any(|v| !v.is_finite()) {
            return Err(AppError::model_fit("series contains non-finite closing prices"));
        }

        tracing::info!(
            "Fitting ARIMA({},{},{}) on {} closes, last historical date {}",
            self.order.p,
            self.order.d,
            self.order.q,
            closes.len(),
            last_date
        );

        let fit = ArimaFit::fit(&closes, self.order)?;
        let values = fit.forecast(steps)?;

        let points = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                last_date
                    .checked_add_days(Days::new(i as u64 + 1))
                    .map(|date| ForecastPoint { date, value })
                    .ok_or_else(|| AppError::validation("forecast date is out of range"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(first) = points.first() {
            tracing::info!(
                "Forecast starts from {} ({} steps, sigma2 {:.6})",
                first.date,
                points.len(),
                fit.sigma2
            );
        }

        Ok(ForecastResult { points })
    }
}

/// Fitted coefficients plus the state needed to extend the series
#[derive(Debug, Clone)]
struct ArimaFit {
    coefficients: Vec<f64>,
    sigma2: f64,
    levels: Vec<Vec<f64>>, // levels[k] = k-th difference of the input
}

impl ArimaFit {
    fn fit(series: &[f64], order: ArimaOrder) -> Result<Self, AppError> {
        if order.q != 0 {
            return Err(AppError::model_fit("moving-average terms are not supported"));
        }

        let mut levels = vec![series.to_vec()];
        for _ in 0..order.d {
            let prev = &levels[levels.len() - 1];
            let next: Vec<f64> = prev.windows(2).map(|w| w[1] - w[0]).collect();
            levels.push(next);
        }

        let w = &levels[order.d];

        // flat relative to the price level, not in absolute terms
        let magnitude = series.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if order.d > 0 && w.iter().all(|v| v.abs() <= magnitude * f64::EPSILON) {
            return Err(AppError::model_fit(
                "closing prices do not vary enough to fit the model",
            ));
        }

        let p = order.p;
        if w.len() <= 2 * p {
            return Err(AppError::model_fit(format!(
                "series too short for {} lags after {} differences",
                p, order.d
            )));
        }

        // Normal equations X'X b = X'y, row t has regressors w[t-1], ..., w[t-p]
        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        for t in p..w.len() {
            for i in 0..p {
                let xi = w[t - 1 - i];
                xty[i] += xi * w[t];
                for j in 0..p {
                    xtx[i][j] += xi * w[t - 1 - j];
                }
            }
        }

        let coefficients = solve(xtx, xty)?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(AppError::model_fit("fit did not converge"));
        }

        let residuals: Vec<f64> = (p..w.len())
            .map(|t| w[t] - predict(&coefficients, &w[..t]))
            .collect();
        let sigma2 = residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64;

        Ok(Self {
            coefficients,
            sigma2,
            levels,
        })
    }

    fn forecast(&self, steps: usize) -> Result<Vec<f64>, AppError> {
        let d = self.levels.len() - 1;

        let mut extended = self.levels[d].clone();
        for _ in 0..steps {
            let next = predict(&self.coefficients, &extended);
            extended.push(next);
        }
        let mut projected = extended.split_off(self.levels[d].len());

        // integrate back one differencing level at a time
        for level in self.levels[..d].iter().rev() {
            let mut acc = level.last().copied().unwrap_or_default();
            for value in projected.iter_mut() {
                acc += *value;
                *value = acc;
            }
        }

        if projected.iter().any(|v| !v.is_finite()) {
            return Err(AppError::model_fit("forecast diverged"));
        }
        Ok(projected)
    }
}

/// One-step AR prediction from the tail of `history`
fn predict(coefficients: &[f64], history: &[f64]) -> f64 {
    coefficients
        .iter()
        .zip(history.iter().rev())
        .map(|(c, x)| c * x)
        .sum()
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, AppError> {
    let n = b.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    let tolerance = scale * 1e-12;

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= tolerance {
            return Err(AppError::model_fit("normal equations are singular"));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
