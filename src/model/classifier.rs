//! Quantized XGBoost classifier.
//!
//! Fits a boosted ensemble on quantized inputs and predicts through the
//! tensorized integer pipeline. Access fitted components via
//! [`input_quantizers()`](QuantizedXGBClassifier::input_quantizers),
//! [`output_quantizer()`](QuantizedXGBClassifier::output_quantizer),
//! [`tensor_predictor()`](QuantizedXGBClassifier::tensor_predictor) and
//! [`booster()`](QuantizedXGBClassifier::booster).

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::{debug, info, warn};

use super::QuantizedXgbConfig;
use crate::compat::xgboost::XgbModel;
use crate::compat::Framework;
use crate::error::{Error, Result};
use crate::quantization::{FeatureQuantizers, QuantizedArray};
use crate::tensor::{tree_to_tensors, TensorPredictor};
use crate::training::{sigmoid, BoostingBackend, HistGradientBooster};

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// In-process evaluation on plaintext codes.
    #[default]
    Clear,
    /// Encrypted evaluation. Not available from this crate.
    Fhe,
}

/// Everything produced by a successful `fit`.
#[derive(Debug, Clone)]
struct FittedState {
    input_quantizers: FeatureQuantizers,
    output_quantizer: QuantizedArray,
    predictor: TensorPredictor,
    model: XgbModel,
}

#[derive(Debug, Clone)]
enum FitState {
    Unfitted,
    Fitted(Box<FittedState>),
}

/// Binary gradient-boosted classifier evaluated as integer tensor arithmetic.
///
/// `fit` quantizes every input column to `n_bits`, trains the backend on the
/// integer codes and tensorizes the result. Prediction quantizes new inputs
/// with the training quantizers, sums integer leaves, passes the margin
/// through the output quantizer and applies the sigmoid.
///
/// # Example
///
/// ```
/// use boosters_quant::model::{QuantizedXGBClassifier, QuantizedXgbConfig};
/// use ndarray::{array, Array2};
///
/// let x = Array2::from_shape_fn((40, 2), |(i, j)| (i * (j + 1)) as f64);
/// let y = x.column(0).mapv(|v| if v >= 20.0 { 1.0f32 } else { 0.0 });
///
/// let mut clf = QuantizedXGBClassifier::new(QuantizedXgbConfig::default());
/// clf.fit(x.view(), y.view())?;
///
/// let proba = clf.predict_proba(x.view())?;
/// assert_eq!(proba.dim(), (40, 2));
/// # Ok::<(), boosters_quant::Error>(())
/// ```
///
/// Prediction takes exactly the input batch; anything else is a type error:
///
/// ```compile_fail
/// use boosters_quant::model::{QuantizedXGBClassifier, QuantizedXgbConfig};
/// use ndarray::Array2;
///
/// let clf = QuantizedXGBClassifier::new(QuantizedXgbConfig::default());
/// let x = Array2::<f64>::zeros((1, 2));
/// let _ = clf.predict_proba(x.view(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct QuantizedXGBClassifier<B = HistGradientBooster> {
    config: QuantizedXgbConfig,
    backend: B,
    state: FitState,
}

impl QuantizedXGBClassifier<HistGradientBooster> {
    /// Unfitted classifier using the bundled histogram backend.
    pub fn new(config: QuantizedXgbConfig) -> Self {
        Self::with_backend(config, HistGradientBooster)
    }

    /// Fitted classifier from an ensemble trained elsewhere.
    ///
    /// `model` must have been trained on `training_codes`, which in turn must
    /// be the codes `quantizers` produce for the training inputs.
    pub fn from_fitted_parts(
        config: QuantizedXgbConfig,
        quantizers: FeatureQuantizers,
        model: XgbModel,
        training_codes: ArrayView2<i64>,
    ) -> Result<Self> {
        config.validate()?;
        if training_codes.ncols() != quantizers.n_features() {
            return Err(Error::invalid_input(format!(
                "quantizers cover {} features but codes have {} columns",
                quantizers.n_features(),
                training_codes.ncols()
            )));
        }

        let (predictor, output_quantizer) =
            tree_to_tensors(&model, training_codes, Framework::XGBoost, config.n_bits)?;
        let state = FittedState {
            input_quantizers: quantizers,
            output_quantizer,
            predictor,
            model,
        };

        Ok(Self {
            config,
            backend: HistGradientBooster,
            state: FitState::Fitted(Box::new(state)),
        })
    }
}

impl<B> QuantizedXGBClassifier<B> {
    /// Unfitted classifier training through `backend`.
    pub fn with_backend(config: QuantizedXgbConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            state: FitState::Unfitted,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &QuantizedXgbConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, FitState::Fitted(_))
    }

    /// Number of input features seen during `fit`.
    pub fn n_features(&self) -> Option<usize> {
        self.fitted().ok().map(|s| s.input_quantizers.n_features())
    }

    /// Per-feature input quantizers.
    pub fn input_quantizers(&self) -> Option<&FeatureQuantizers> {
        self.fitted().ok().map(|s| &s.input_quantizers)
    }

    /// Quantizer fitted on the training margins.
    pub fn output_quantizer(&self) -> Option<&QuantizedArray> {
        self.fitted().ok().map(|s| &s.output_quantizer)
    }

    pub fn tensor_predictor(&self) -> Option<&TensorPredictor> {
        self.fitted().ok().map(|s| &s.predictor)
    }

    /// The fitted ensemble in XGBoost layout.
    pub fn booster(&self) -> Option<&XgbModel> {
        self.fitted().ok().map(|s| &s.model)
    }

    fn fitted(&self) -> Result<&FittedState> {
        match &self.state {
            FitState::Fitted(state) => Ok(&**state),
            FitState::Unfitted => Err(Error::InvalidState(
                "classifier is not fitted; call fit before predicting",
            )),
        }
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Encode `x` with the fitted per-feature quantizers.
    pub fn quantize_input(&self, x: ArrayView2<f64>) -> Result<Array2<i64>> {
        self.fitted()?.input_quantizers.quantize(x)
    }

    /// Class probabilities, shape `[n_samples, 2]`: `[1 - p, p]` per row.
    pub fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.predict_proba_in(x, ExecutionMode::Clear)
    }

    /// Class probabilities computed in the given execution mode.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedOperation`] for [`ExecutionMode::Fhe`], fitted or not
    /// - [`Error::InvalidState`] before `fit`
    /// - [`Error::InvalidInput`] / [`Error::Quantization`] for a bad batch
    pub fn predict_proba_in(&self, x: ArrayView2<f64>, mode: ExecutionMode) -> Result<Array2<f64>> {
        if mode == ExecutionMode::Fhe {
            return Err(Error::UnsupportedOperation(
                "encrypted execution is not available; use ExecutionMode::Clear",
            ));
        }
        let state = self.fitted()?;

        let codes = state.input_quantizers.quantize(x)?;
        let raw = state.predictor.predict_raw(codes.view())?;

        // Requantize through q_y, then collapse the output column.
        let mut requantized = raw;
        for mut column in requantized.axis_iter_mut(Axis(1)) {
            let values = state.output_quantizer.update_quantized_values(column.view());
            column.assign(&values);
        }
        let margins = requantized.sum_axis(Axis(1));

        let mut proba = Array2::<f64>::zeros((margins.len(), 2));
        for (mut row, &margin) in proba.axis_iter_mut(Axis(0)).zip(margins.iter()) {
            let p = sigmoid(margin);
            row[0] = 1.0 - p;
            row[1] = p;
        }
        Ok(proba)
    }

    /// Predicted class (0 or 1) per row.
    pub fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<usize>> {
        self.predict_in(x, ExecutionMode::Clear)
    }

    /// Arg-max of [`predict_proba_in`](Self::predict_proba_in); ties go to class 0.
    pub fn predict_in(&self, x: ArrayView2<f64>, mode: ExecutionMode) -> Result<Array1<usize>> {
        let proba = self.predict_proba_in(x, mode)?;
        Ok(proba.map_axis(Axis(1), |row| usize::from(row[1] > row[0])))
    }

    /// Normalized feature importances of the fitted ensemble, using the
    /// configured `importance_type`.
    pub fn feature_importances(&self) -> Result<Array1<f64>> {
        let state = self.fitted()?;
        Ok(state
            .model
            .feature_importance(self.config.importance_type, state.input_quantizers.n_features()))
    }
}

impl<B: BoostingBackend> QuantizedXGBClassifier<B> {
    /// Fit on features `x` (`[n_samples, n_features]`) and binary labels `y`.
    ///
    /// Works from either state. All fitted components are rebuilt and replace
    /// the previous ones only once every step has succeeded; on error the
    /// classifier keeps its previous state.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] for an invalid config (e.g. `base_score = 0.7`)
    /// - [`Error::InvalidInput`] for empty or mismatched shapes, non-finite
    ///   features, or labels outside {0, 1}
    /// - anything the backend or the tensorizer raises
    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f32>) -> Result<&mut Self> {
        self.config.validate()?;
        validate_training_data(x, y)?;

        let n_jobs = self.effective_n_jobs();
        let params = self.config.booster_params(n_jobs)?;

        let (input_quantizers, codes) = FeatureQuantizers::fit(self.config.n_bits, x)?;
        debug!(
            n_samples = x.nrows(),
            n_features = x.ncols(),
            n_bits = self.config.n_bits,
            "quantized training inputs"
        );

        let model = self.backend.fit(codes.view(), y, &params)?;
        let (predictor, output_quantizer) =
            tree_to_tensors(&model, codes.view(), Framework::XGBoost, self.config.n_bits)?;

        info!(
            n_trees = predictor.n_trees(),
            n_features = predictor.n_features(),
            "fitted quantized classifier"
        );

        self.state = FitState::Fitted(Box::new(FittedState {
            input_quantizers,
            output_quantizer,
            predictor,
            model,
        }));
        Ok(self)
    }

    /// Thread count for the backend. Training is pinned to one thread on macOS.
    fn effective_n_jobs(&self) -> usize {
        let requested = self.config.n_threads();
        if cfg!(target_os = "macos") && requested != 1 {
            warn!(
                requested,
                "multi-threaded training is disabled on macOS; using n_jobs = 1"
            );
            return 1;
        }
        requested
    }
}

fn validate_training_data(x: ArrayView2<f64>, y: ArrayView1<f32>) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(Error::invalid_input(format!(
            "training features must be non-empty, got shape {:?}",
            x.dim()
        )));
    }
    if y.len() != x.nrows() {
        return Err(Error::invalid_input(format!(
            "{} labels for {} samples",
            y.len(),
            x.nrows()
        )));
    }
    if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
        return Err(Error::invalid_input(format!(
            "training features contain a non-finite value at flat index {}",
            pos
        )));
    }
    if let Some(label) = y.iter().find(|&&l| l != 0.0 && l != 1.0) {
        return Err(Error::invalid_input(format!(
            "labels must be 0 or 1, got {}",
            label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::testing::classification_data;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn small_config() -> QuantizedXgbConfig {
        QuantizedXgbConfig::builder()
            .n_estimators(5)
            .max_depth(2)
            .n_bits(5)
            .build()
            .unwrap()
    }

    #[test]
    fn unfitted_accessors_are_empty() {
        let clf = QuantizedXGBClassifier::new(small_config());

        assert!(!clf.is_fitted());
        assert!(clf.n_features().is_none());
        assert!(clf.booster().is_none());
        assert!(matches!(clf.feature_importances(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn fit_populates_state() {
        let (x, y) = classification_data(60, 3, 1);
        let mut clf = QuantizedXGBClassifier::new(small_config());
        clf.fit(x.view(), y.view()).unwrap();

        assert!(clf.is_fitted());
        assert_eq!(clf.n_features(), Some(3));
        assert_eq!(clf.tensor_predictor().unwrap().n_trees(), 5);
        assert_eq!(clf.output_quantizer().unwrap().n_bits(), 5);
        assert_eq!(clf.input_quantizers().unwrap().n_features(), 3);
    }

    #[test]
    fn proba_rows_sum_to_one() {
        let (x, y) = classification_data(60, 2, 2);
        let mut clf = QuantizedXGBClassifier::new(small_config());
        clf.fit(x.view(), y.view()).unwrap();

        let proba = clf.predict_proba(x.view()).unwrap();
        for row in proba.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn rejects_bad_labels_and_shapes() {
        let mut clf = QuantizedXGBClassifier::new(small_config());
        let x = array![[0.0, 1.0], [1.0, 0.0]];

        assert!(matches!(
            clf.fit(x.view(), array![0.0f32, 2.0].view()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            clf.fit(x.view(), array![0.0f32].view()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            clf.fit(array![[f64::NAN, 1.0], [0.0, 0.0]].view(), array![0.0f32, 1.0].view()),
            Err(Error::InvalidInput(_))
        ));
        assert!(!clf.is_fitted());
    }

    #[test]
    fn struct_config_is_validated_at_fit() {
        let config = QuantizedXgbConfig {
            base_score: Some(0.7),
            ..Default::default()
        };
        let (x, y) = classification_data(20, 2, 0);
        let mut clf = QuantizedXGBClassifier::new(config);

        assert!(matches!(
            clf.fit(x.view(), y.view()),
            Err(Error::Configuration(ConfigError::UnsupportedBaseScore(_)))
        ));
    }

    #[test]
    fn fitted_classifier_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QuantizedXGBClassifier>();
    }
}
