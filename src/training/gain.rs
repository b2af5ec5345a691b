//! Gain computation and regularization parameters.

// =============================================================================
// Gain Parameters
// =============================================================================

/// Below this loss change a split is considered no improvement.
pub const MIN_LOSS_CHANGE: f64 = 1e-6;

/// Parameters for split gain computation and leaf weight calculation.
///
/// Static for the lifetime of training.
#[derive(Clone, Debug, PartialEq)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub reg_lambda: f64,
    /// L1 regularization (alpha).
    pub reg_alpha: f64,
    /// Minimum loss reduction to keep a split (gamma).
    pub gamma: f64,
    /// Minimum sum of hessians per child.
    pub min_child_weight: f64,
    /// Maximum absolute leaf weight; 0 disables the clip.
    pub max_delta_step: f64,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            reg_lambda: 1.0,
            reg_alpha: 0.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            max_delta_step: 0.0,
        }
    }
}

impl GainParams {
    /// L1 soft thresholding of a gradient sum.
    #[inline]
    fn threshold_l1(&self, grad: f64) -> f64 {
        if grad > self.reg_alpha {
            grad - self.reg_alpha
        } else if grad < -self.reg_alpha {
            grad + self.reg_alpha
        } else {
            0.0
        }
    }

    /// Leaf weight with L1/L2 regularization and optional delta clipping.
    ///
    /// ```text
    /// weight = -T_α(G) / (H + λ),   clipped to [-max_delta_step, max_delta_step]
    /// ```
    #[inline]
    pub fn leaf_weight(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        if hess_sum <= 0.0 {
            return 0.0;
        }
        let weight = -self.threshold_l1(grad_sum) / (hess_sum + self.reg_lambda);
        if self.max_delta_step > 0.0 {
            weight.clamp(-self.max_delta_step, self.max_delta_step)
        } else {
            weight
        }
    }

    /// Structure score of a node with the given sums.
    ///
    /// Without a delta clip this is `T_α(G)² / (H + λ)`; with one it is
    /// evaluated at the clipped weight.
    #[inline]
    pub fn node_score(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        if hess_sum <= 0.0 {
            return 0.0;
        }
        let g = self.threshold_l1(grad_sum);
        if self.max_delta_step == 0.0 {
            g * g / (hess_sum + self.reg_lambda)
        } else {
            let w = self.leaf_weight(grad_sum, hess_sum);
            -(2.0 * g * w + (hess_sum + self.reg_lambda) * w * w)
        }
    }

    /// Loss reduction of a split, before the `gamma` penalty.
    ///
    /// ```text
    /// gain = 0.5 * [S(G_L, H_L) + S(G_R, H_R) - S(G_P, H_P)]
    /// ```
    #[inline]
    pub fn split_gain(
        &self,
        grad_left: f64,
        hess_left: f64,
        grad_parent: f64,
        hess_parent: f64,
    ) -> f64 {
        let grad_right = grad_parent - grad_left;
        let hess_right = hess_parent - hess_left;
        0.5 * (self.node_score(grad_left, hess_left) + self.node_score(grad_right, hess_right)
            - self.node_score(grad_parent, hess_parent))
    }

    /// Both children carry at least `min_child_weight` hessian.
    #[inline]
    pub fn is_valid_split(&self, hess_left: f64, hess_right: f64) -> bool {
        hess_left >= self.min_child_weight && hess_right >= self.min_child_weight
    }

    /// A split with this loss change survives `gamma` pruning.
    #[inline]
    pub fn keeps_split(&self, loss_change: f64) -> bool {
        loss_change > MIN_LOSS_CHANGE && loss_change > self.gamma
    }
}
