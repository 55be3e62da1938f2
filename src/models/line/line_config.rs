use serde::{Deserialize, Serialize};

use super::line_env::LineEnvError;

/// Station budget used by [`LineEnvConfig::default`].
pub const DEFAULT_NR_STATIONS: usize = 10;

/// Settings for a [`super::line_env::LineEnv`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineEnvConfig {
    /// Total number of stations the line may have, the starting cell included.
    pub nr_stations: usize,
    /// Reject actions the current mask marks illegal instead of applying them.
    ///
    /// Off by default: the mask is advisory and masked-action learners
    /// enforce it themselves. Moves that leave the grid are rejected in both
    /// modes, since an off-grid cell has no index.
    pub strict_actions: bool,
}

impl LineEnvConfig {
    #[must_use]
    pub fn new(nr_stations: usize) -> Self {
        Self {
            nr_stations,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict_actions = true;
        self
    }

    /// # Errors
    ///
    /// [`LineEnvError::InvalidStationBudget`] if no station can be placed.
    pub fn validate(&self) -> Result<(), LineEnvError> {
        if self.nr_stations == 0 {
            return Err(LineEnvError::InvalidStationBudget);
        }
        Ok(())
    }
}

impl Default for LineEnvConfig {
    fn default() -> Self {
        Self {
            nr_stations: DEFAULT_NR_STATIONS,
            strict_actions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(LineEnvConfig::new(1).validate().is_ok());
        assert_eq!(
            LineEnvConfig::new(0).validate().unwrap_err(),
            LineEnvError::InvalidStationBudget
        );
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: LineEnvConfig = serde_json::from_str(r#"{"nr_stations": 4}"#).unwrap();
        assert_eq!(config, LineEnvConfig::new(4));
        assert!(!config.strict_actions);

        let config: LineEnvConfig = serde_json::from_str(r#"{"strict_actions": true}"#).unwrap();
        assert_eq!(config, LineEnvConfig::default().strict());
    }
}
