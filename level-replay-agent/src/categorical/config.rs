//! Configuration of the categorical support.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`CategoricalSupport`](super::CategoricalSupport).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct CategoricalConfig {
    /// Number of atoms of the support.
    pub atoms: usize,

    /// Smallest value of the support.
    pub v_min: f32,

    /// Largest value of the support.
    pub v_max: f32,
}

impl Default for CategoricalConfig {
    fn default() -> Self {
        Self {
            atoms: 51,
            v_min: -10.0,
            v_max: 10.0,
        }
    }
}

impl CategoricalConfig {
    /// Sets the number of atoms.
    pub fn atoms(mut self, v: usize) -> Self {
        self.atoms = v;
        self
    }

    /// Sets the smallest value of the support.
    pub fn v_min(mut self, v: f32) -> Self {
        self.v_min = v;
        self
    }

    /// Sets the largest value of the support.
    pub fn v_max(mut self, v: f32) -> Self {
        self.v_max = v;
        self
    }

    /// Constructs [`CategoricalConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`CategoricalConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
