use crate::error::{Error, Result};

/// Constants of a ranking run.
///
/// Each round computes `hydration + dehydration * sum(score[c] / cited[c])`
/// over a node's citation list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankConfig {
    pub hydration: f64,
    pub dehydration: f64,
    pub workers: usize,
    pub iterations: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        RankConfig {
            hydration: 0.15,
            dehydration: 0.85,
            workers: 16,
            iterations: 20,
        }
    }
}

impl RankConfig {
    /// The un-normalized convention, where an uncited node keeps its seed of one.
    pub fn reference() -> Self {
        RankConfig {
            hydration: 1.0,
            dehydration: 0.9,
            ..RankConfig::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        for &(name, value) in &[("hydration", self.hydration), ("dehydration", self.dehydration)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!("{} must be finite and non-negative, got {}", name, value)));
            }
        }
        if self.workers == 0 {
            return Err(Error::InvalidConfig("at least one worker is required".to_string()));
        }
        Ok(())
    }
}

#[test]
fn validate_config() {
    assert!(RankConfig::default().validate().is_ok());
    assert!(RankConfig::reference().validate().is_ok());
    assert!(RankConfig { workers: 0, ..RankConfig::default() }.validate().is_err());
    assert!(RankConfig { hydration: -0.1, ..RankConfig::default() }.validate().is_err());
    assert!(RankConfig { dehydration: f64::NAN, ..RankConfig::default() }.validate().is_err());
}
