//! Verbosity-gated training logs on top of `tracing`.

use tracing::{debug, info, warn};

/// Verbosity level for training output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum Verbosity {
    /// No output.
    #[default]
    Silent,
    /// Errors and warnings only.
    Warning,
    /// Progress and important information.
    Info,
    /// Detailed debugging information.
    Debug,
}

impl Verbosity {
    /// Map an XGBoost-style integer level (0 silent ... 3 debug). Larger values saturate.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Warning,
            2 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

/// Emits training events at or below the configured verbosity.
///
/// Events go through `tracing`; whether they are printed is up to the
/// subscriber the application installs.
#[derive(Clone, Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[inline]
    pub fn enabled(&self, level: Verbosity) -> bool {
        self.verbosity != Verbosity::Silent && self.verbosity >= level
    }

    pub fn start_training(&self, n_rounds: usize, n_rows: usize, n_features: usize) {
        if self.enabled(Verbosity::Info) {
            info!(n_rounds, n_rows, n_features, "starting training");
        }
    }

    /// Log one boosting round with its metrics.
    pub fn log_round(&self, round: usize, metrics: &[(&str, f64)]) {
        if !self.enabled(Verbosity::Info) {
            return;
        }
        let summary = metrics
            .iter()
            .map(|(name, value)| format!("{name}={value:.6}"))
            .collect::<Vec<_>>()
            .join(" ");
        info!(round, "{}", summary);
    }

    pub fn finish_training(&self, n_trees: usize) {
        if self.enabled(Verbosity::Info) {
            info!(n_trees, "training complete");
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.enabled(Verbosity::Warning) {
            warn!("{}", msg);
        }
    }

    pub fn debug(&self, msg: &str) {
        if self.enabled(Verbosity::Debug) {
            debug!("{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(Verbosity::Debug > Verbosity::Info);
        assert!(Verbosity::Info > Verbosity::Warning);
        assert_eq!(Verbosity::default(), Verbosity::Silent);
        assert_eq!(Verbosity::from_level(7), Verbosity::Debug);
    }

    #[test]
    fn silent_logger_enables_nothing() {
        let logger = TrainingLogger::new(Verbosity::Silent);
        assert!(!logger.enabled(Verbosity::Warning));
        assert!(!logger.enabled(Verbosity::Silent));

        let logger = TrainingLogger::new(Verbosity::Info);
        assert!(logger.enabled(Verbosity::Warning));
        assert!(!logger.enabled(Verbosity::Debug));
    }
}
