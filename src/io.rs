// Copyright 2026 Ring Search Contributors
// SPDX-License-Identifier: Apache-2.0

//! Grid artifacts on disk, keyed by ring dimension.
//!
//! Inputs (in `data_dir`):
//! - `{N}_beta_array.json`: β axis, JSON array of numbers
//! - `{N}_time_array.json`: JSON array whose first and last entries bound T
//!
//! Outputs (in `output_dir`):
//! - `{N}_probability_pow2.json`: probability matrix `[β][t]`
//! - `{N}_adiabatic_check.json`: 0/1 matrix `[β][t]`, when enabled
//! - `{N}_grid_summary.json`: axes and run parameters for plotting

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PathsConfig;
use crate::error::{Result, ValidationError};
use crate::hamiltonian::ScheduleLaw;

/// Run description persisted next to the probability matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub dimension: usize,
    pub schedule: ScheduleLaw,
    pub times: Vec<f64>,
    pub betas: Vec<f64>,
    pub rtol: f64,
    pub atol: f64,
    pub chunks: usize,
    pub adiabatic_check: bool,
    pub elapsed_sec: f64,
}

/// Reads inputs from one directory and writes outputs to another.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    data_dir: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::new(&paths.data_dir, &paths.output_dir)
    }

    pub fn beta_path(&self, dimension: usize) -> PathBuf {
        self.data_dir.join(format!("{}_beta_array.json", dimension))
    }

    pub fn time_path(&self, dimension: usize) -> PathBuf {
        self.data_dir.join(format!("{}_time_array.json", dimension))
    }

    pub fn probability_path(&self, dimension: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_probability_pow2.json", dimension))
    }

    pub fn adiabatic_path(&self, dimension: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_adiabatic_check.json", dimension))
    }

    pub fn summary_path(&self, dimension: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_grid_summary.json", dimension))
    }

    /// β axis for dimension N.
    pub fn load_betas(&self, dimension: usize) -> Result<Vec<f64>> {
        read_json(&self.beta_path(dimension))
    }

    /// (first, last) entries of the time array for dimension N.
    pub fn load_time_bounds(&self, dimension: usize) -> Result<(f64, f64)> {
        let path = self.time_path(dimension);
        let times: Vec<f64> = read_json(&path)?;
        match (times.first(), times.last()) {
            (Some(&lb), Some(&ub)) => Ok((lb, ub)),
            _ => Err(ValidationError::Shape {
                artifact: path.display().to_string(),
                expected: "at least 1 element".into(),
                actual: "0 elements".into(),
            }
            .into()),
        }
    }

    /// Write the β axis (used to prepare inputs).
    pub fn save_betas(&self, dimension: usize, betas: &[f64]) -> Result<PathBuf> {
        let path = self.beta_path(dimension);
        write_json(&path, &betas)?;
        Ok(path)
    }

    /// Write the time array (used to prepare inputs).
    pub fn save_times(&self, dimension: usize, times: &[f64]) -> Result<PathBuf> {
        let path = self.time_path(dimension);
        write_json(&path, &times)?;
        Ok(path)
    }

    pub fn save_probability(&self, dimension: usize, matrix: &Array2<f64>) -> Result<PathBuf> {
        let path = self.probability_path(dimension);
        write_json(&path, &rows_of(matrix))?;
        info!(path = %path.display(), shape = ?matrix.dim(), "probability matrix saved");
        Ok(path)
    }

    pub fn load_probability(&self, dimension: usize) -> Result<Array2<f64>> {
        let path = self.probability_path(dimension);
        let rows: Vec<Vec<f64>> = read_json(&path)?;
        from_rows(&path, rows)
    }

    pub fn save_adiabatic(&self, dimension: usize, matrix: &Array2<u8>) -> Result<PathBuf> {
        let path = self.adiabatic_path(dimension);
        write_json(&path, &rows_of(matrix))?;
        Ok(path)
    }

    pub fn load_adiabatic(&self, dimension: usize) -> Result<Array2<u8>> {
        let path = self.adiabatic_path(dimension);
        let rows: Vec<Vec<u8>> = read_json(&path)?;
        from_rows(&path, rows)
    }

    pub fn save_summary(&self, summary: &GridSummary) -> Result<PathBuf> {
        let path = self.summary_path(summary.dimension);
        write_json(&path, summary)?;
        Ok(path)
    }

    pub fn load_summary(&self, dimension: usize) -> Result<GridSummary> {
        read_json(&self.summary_path(dimension))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn rows_of<T: Clone>(matrix: &Array2<T>) -> Vec<Vec<T>> {
    matrix.rows().into_iter().map(|r| r.to_vec()).collect()
}

fn from_rows<T: Clone>(path: &Path, rows: Vec<Vec<T>>) -> Result<Array2<T>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(ValidationError::Shape {
            artifact: path.display().to_string(),
            expected: format!("{} columns in every row", ncols),
            actual: format!("a row with {} columns", bad.len()),
        }
        .into());
    }
    let flat: Vec<T> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| {
        ValidationError::Shape {
            artifact: path.display().to_string(),
            expected: format!("{}x{}", nrows, ncols),
            actual: e.to_string(),
        }
        .into()
    })
}
