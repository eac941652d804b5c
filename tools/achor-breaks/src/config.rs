//! Run configuration

use achor_common::{Error, Result};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::method::Method;
pub use crate::sweep::SweepBudget;

/// Parameters of one classification run
#[derive(Debug, Clone)]
pub struct ClassifyConfig {
    /// Number of classes; the run yields `classes - 1` breaks
    pub classes: usize,
    /// Sweep interval: sample spacing and minimal significant contrast
    pub sweep: f64,
    pub method: Method,
    pub budget: SweepBudget,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            classes: 5,
            sweep: 1.0,
            method: Method::LocalExtreme,
            budget: SweepBudget::default(),
        }
    }
}

impl ClassifyConfig {
    pub fn new(classes: usize, sweep: f64, method: Method) -> Self {
        Self {
            classes,
            sweep,
            method,
            ..Self::default()
        }
    }

    pub fn with_classes(mut self, classes: usize) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_sweep(mut self, sweep: f64) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.budget = self.budget.with_max_steps(max_steps);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.budget = self.budget.with_timeout(timeout);
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.budget = self.budget.with_cancel_flag(flag);
        self
    }

    /// Number of breaks the run must produce
    pub fn target_breaks(&self) -> usize {
        self.classes.saturating_sub(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes < 2 {
            return Err(Error::InvalidInput(format!(
                "classes must be at least 2, got {}",
                self.classes
            )));
        }
        if !self.sweep.is_finite() || self.sweep <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "sweep interval must be a positive number, got {}",
                self.sweep
            )));
        }
        if self.classes < self.method.min_classes() {
            return Err(Error::InvalidInput(format!(
                "{} needs at least {} classes, got {}",
                self.method,
                self.method.min_classes(),
                self.classes
            )));
        }
        if self.budget.max_steps == 0 {
            return Err(Error::InvalidInput("max sweep steps must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ClassifyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_breaks(), 4);
    }

    #[test]
    fn test_rejects_bad_classes_and_sweep() {
        assert!(ClassifyConfig::default().with_classes(1).validate().is_err());
        assert!(ClassifyConfig::default().with_sweep(0.0).validate().is_err());
        assert!(ClassifyConfig::default().with_sweep(-2.0).validate().is_err());
        assert!(ClassifyConfig::default().with_sweep(f64::NAN).validate().is_err());
        assert!(ClassifyConfig::default().with_max_steps(0).validate().is_err());
    }

    #[test]
    fn test_global_methods_need_three_classes() {
        let config = ClassifyConfig::new(2, 1.0, Method::GlobalEqualInterval);
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
        assert!(config.with_classes(3).validate().is_ok());
    }
}
