//! Categorical return distributions.
//!
//! A learner predicts, for every action, a probability distribution over a fixed support of
//! returns. Its target is the distribution of $r + \gamma z$ under the distribution of the
//! greedy action at the next state, projected back onto the support.
mod base;
mod config;
pub use base::CategoricalSupport;
pub use config::CategoricalConfig;

#[cfg(test)]
mod tests {
    use super::CategoricalConfig;
    use anyhow::Result;
    use tempdir::TempDir;

    #[test]
    fn test_serde_categorical_config() -> Result<()> {
        let config = CategoricalConfig::default()
            .atoms(21)
            .v_min(-1.0)
            .v_max(3.0);

        let dir = TempDir::new("categorical_config")?;
        let path = dir.path().join("categorical_config.yaml");
        config.save(&path)?;
        let config_ = CategoricalConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
