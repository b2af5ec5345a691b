//! Binary logistic objective.

use crate::compat::xgboost::{Objective, RegLossParam};
use crate::error::{ConfigError, Result};

/// Numerically stable logistic function.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Binary objectives sharing the logistic margin.
///
/// `binary:logitraw` trains exactly like `binary:logistic`; the two only
/// differ in what XGBoost itself reports from `predict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryObjective {
    #[default]
    Logistic,
    LogitRaw,
}

impl BinaryObjective {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name {
            "binary:logistic" => Ok(BinaryObjective::Logistic),
            "binary:logitraw" => Ok(BinaryObjective::LogitRaw),
            other => Err(ConfigError::UnsupportedObjective(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryObjective::Logistic => "binary:logistic",
            BinaryObjective::LogitRaw => "binary:logitraw",
        }
    }

    /// The objective entry of an XGBoost JSON model.
    pub fn to_xgb(self, scale_pos_weight: f32) -> Objective {
        let reg_loss_param = RegLossParam { scale_pos_weight };
        match self {
            BinaryObjective::Logistic => Objective::BinaryLogistic { reg_loss_param },
            BinaryObjective::LogitRaw => Objective::BinaryLogitRaw { reg_loss_param },
        }
    }
}

/// Logistic loss over margins.
///
/// - Gradient: `w * (σ(m) - y)`
/// - Hessian: `w * max(σ(m)(1 - σ(m)), 1e-16)`
///
/// where `w` is `scale_pos_weight` for positive rows and 1 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LogisticLoss {
    pub scale_pos_weight: f64,
}

impl Default for LogisticLoss {
    fn default() -> Self {
        Self {
            scale_pos_weight: 1.0,
        }
    }
}

impl LogisticLoss {
    const HESS_MIN: f64 = 1e-16;

    /// Fill `grad` and `hess` for every row.
    pub fn compute_gradients(
        &self,
        margins: &[f64],
        labels: &[f32],
        grad: &mut [f64],
        hess: &mut [f64],
    ) {
        debug_assert_eq!(margins.len(), labels.len());
        debug_assert_eq!(grad.len(), labels.len());
        debug_assert_eq!(hess.len(), labels.len());

        let rows = margins.iter().zip(labels);
        for (((&m, &y), g), h) in rows.zip(grad.iter_mut()).zip(hess.iter_mut()) {
            let p = sigmoid(m);
            let w = if y > 0.5 { self.scale_pos_weight } else { 1.0 };
            *g = w * (p - y as f64);
            *h = w * (p * (1.0 - p)).max(Self::HESS_MIN);
        }
    }

    /// Mean log loss of `margins` against `labels`.
    pub fn log_loss(margins: &[f64], labels: &[f32]) -> f64 {
        const EPS: f64 = 1e-15;
        if labels.is_empty() {
            return 0.0;
        }
        let total: f64 = margins
            .iter()
            .zip(labels)
            .map(|(&m, &y)| {
                let p = sigmoid(m).clamp(EPS, 1.0 - EPS);
                let y = y as f64;
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .sum();
        total / labels.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert_abs_diff_eq!(sigmoid(1000.0), 1.0);
        assert_abs_diff_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn gradients_at_zero_margin() {
        let loss = LogisticLoss { scale_pos_weight: 3.0 };
        let mut grad = [0.0; 2];
        let mut hess = [0.0; 2];
        loss.compute_gradients(&[0.0, 0.0], &[1.0, 0.0], &mut grad, &mut hess);

        assert_abs_diff_eq!(grad[0], -1.5);
        assert_abs_diff_eq!(hess[0], 0.75);
        assert_abs_diff_eq!(grad[1], 0.5);
        assert_abs_diff_eq!(hess[1], 0.25);
    }

    #[test]
    fn objective_names_round_trip() {
        for obj in [BinaryObjective::Logistic, BinaryObjective::LogitRaw] {
            assert_eq!(BinaryObjective::from_name(obj.name()).unwrap(), obj);
            assert_eq!(obj.to_xgb(1.0).name(), obj.name());
        }
        assert!(BinaryObjective::from_name("multi:softmax").is_err());
    }

    #[test]
    fn log_loss_of_uninformed_model() {
        let loss = LogisticLoss::log_loss(&[0.0, 0.0], &[0.0, 1.0]);
        assert_abs_diff_eq!(loss, std::f64::consts::LN_2, epsilon = 1e-12);
    }
}
