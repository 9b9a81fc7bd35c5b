use crate::error::RefineError;
use crate::reinjector::ReinjectionPolicy;
use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Longest raw `go` run the reinjector may restore.
    pub fn effective_max_run(&self) -> usize {
        self.reinjection
            .max_run
            .unwrap_or_else(|| self.smoothing.window_size.saturating_sub(1))
    }

    /// Reinjection bounds, or `None` when reinjection is disabled.
    pub fn reinjection_policy(&self) -> Result<Option<ReinjectionPolicy>, RefineError> {
        if !self.reinjection.enabled {
            return Ok(None);
        }
        ReinjectionPolicy::new(
            self.reinjection.min_run,
            self.effective_max_run(),
            self.smoothing.window_size,
        )
        .map(Some)
    }

    pub fn validate(&self) -> Result<(), RefineError> {
        if self.smoothing.window_size == 0 {
            return Err(RefineError::InvalidConfig(
                "smoothing.window_size must be at least 1".to_string(),
            ));
        }
        self.reinjection_policy()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WindowAlignment;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.smoothing.window_size, 3);
        assert_eq!(config.smoothing.alignment, WindowAlignment::Trailing);
        assert_eq!(config.effective_max_run(), 2);
        assert!(config.validate().is_ok());

        let policy = config.reinjection_policy().unwrap().unwrap();
        assert_eq!((policy.min_run(), policy.max_run()), (1, 2));
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let config: Config = serde_yaml::from_str("smoothing:\n  window_size: 5\n").unwrap();
        assert_eq!(config.smoothing.window_size, 5);
        assert_eq!(config.smoothing.alignment, WindowAlignment::Trailing);
        assert!(config.reinjection.enabled);
        assert_eq!(config.effective_max_run(), 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_max_run_must_be_shorter_than_window() {
        let mut config = Config::default();
        config.reinjection.max_run = Some(3);
        assert!(matches!(
            config.validate(),
            Err(RefineError::InvalidConfig(_))
        ));

        // Disabled reinjection is not checked
        config.reinjection.enabled = false;
        assert!(config.validate().is_ok());
        assert!(config.reinjection_policy().unwrap().is_none());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = Config::default();
        config.smoothing.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_of_one_cannot_reinject() {
        let mut config = Config::default();
        config.smoothing.window_size = 1;
        // max_run defaults to 0, below min_run
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "smoothing:\n  window_size: 5\n  alignment: centered\nreinjection:\n  min_run: 2\n  max_run: 3\nio:\n  input_path: in.csv\n  output_dir: out\n"
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.smoothing.alignment, WindowAlignment::Centered);
        assert_eq!(config.reinjection.min_run, 2);
        assert_eq!(config.effective_max_run(), 3);
        assert_eq!(config.io.input_path, "in.csv");
    }
}
