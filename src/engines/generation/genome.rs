//! Genome representation for the cache-pipeline search
//!
//! A genome is a row-stochastic transition matrix over the fixed [`Stage`] set.
//! Row `i` holds the probabilities of moving from stage `i` to every other
//! stage; unfolding the genome (see [`super::phenotype`]) walks the matrix from
//! `Start` until it reaches `End`, producing a concrete pipeline.
//!
//! Crossover averages rows and mutation renormalizes the touched row, so both
//! keep a valid genome valid.
//!
//! # Invariants
//!
//! - every non-terminal row sums to 1 (within [`ROW_SUM_TOLERANCE`])
//! - the `End` row is all zero
//! - every cell is finite and non-negative

use super::phenotype::Phenotype;
use super::stage::{Stage, STAGE_COUNT};
use crate::error::CachelabError;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

pub type TransitionMatrix = [[f64; STAGE_COUNT]; STAGE_COUNT];

pub const TERMINAL_ROW: usize = STAGE_COUNT - 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: String,
    pub generation: u32,
    pub matrix: TransitionMatrix,
    pub fitness: Option<f64>,
    pub phenotype: Option<Phenotype>,
}

/// Random-format UUID drawn from `rng`, so a seeded run reproduces its ids.
pub fn genome_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid().to_string()
}

impl Genome {
    pub fn new(id: impl Into<String>, generation: u32, matrix: TransitionMatrix) -> Self {
        Self {
            id: id.into(),
            generation,
            matrix,
            fitness: None,
            phenotype: None,
        }
    }

    /// Genome that always unfolds to `stages`: each listed stage moves to the
    /// next with probability 1, every other row goes straight to `End`.
    pub fn from_stages(id: impl Into<String>, generation: u32, stages: &[Stage]) -> Self {
        let mut matrix: TransitionMatrix = [[0.0; STAGE_COUNT]; STAGE_COUNT];
        let mut from = Stage::Start;
        for stage in stages.iter().copied().chain(std::iter::once(Stage::End)) {
            matrix[from.index()][stage.index()] = 1.0;
            from = stage;
        }
        for row in matrix.iter_mut().take(TERMINAL_ROW) {
            if row.iter().sum::<f64>() == 0.0 {
                row[Stage::End.index()] = 1.0;
            }
        }
        Self::new(id, generation, matrix)
    }

    pub fn row(&self, stage: Stage) -> &[f64; STAGE_COUNT] {
        &self.matrix[stage.index()]
    }

    pub fn transition(&self, from: Stage, to: Stage) -> f64 {
        self.matrix[from.index()][to.index()]
    }

    /// Check the stochastic invariants; a violation is a configuration error.
    pub fn validate(&self) -> Result<(), CachelabError> {
        for (i, row) in self.matrix.iter().enumerate() {
            if let Some(cell) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
                return Err(CachelabError::Configuration(format!(
                    "Genome {} row {} has invalid probability {}",
                    self.id, i, cell
                )));
            }

            let sum: f64 = row.iter().sum();
            if i == TERMINAL_ROW {
                if sum != 0.0 {
                    return Err(CachelabError::Configuration(format!(
                        "Genome {} terminal row must be all zero, sums to {}",
                        self.id, sum
                    )));
                }
            } else if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(CachelabError::Configuration(format!(
                    "Genome {} row {} sums to {} instead of 1",
                    self.id, i, sum
                )));
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Scale a row in place so it sums to 1. An all-zero row becomes uniform.
pub fn normalize_row(row: &mut [f64; STAGE_COUNT]) {
    let sum: f64 = row.iter().sum();
    if sum > 0.0 && sum.is_finite() {
        for p in row.iter_mut() {
            *p /= sum;
        }
    } else {
        let uniform = 1.0 / STAGE_COUNT as f64;
        row.iter_mut().for_each(|p| *p = uniform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_matrix() -> TransitionMatrix {
        let mut matrix = [[1.0 / STAGE_COUNT as f64; STAGE_COUNT]; STAGE_COUNT];
        matrix[TERMINAL_ROW] = [0.0; STAGE_COUNT];
        matrix
    }

    #[test]
    fn test_uniform_matrix_is_valid() {
        assert!(Genome::new("g-0", 0, uniform_matrix()).validate().is_ok());
    }

    #[test]
    fn test_non_stochastic_row_is_configuration_error() {
        let mut matrix = uniform_matrix();
        matrix[2][3] += 0.5;
        let err = Genome::new("g-0", 0, matrix).validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_non_zero_terminal_row_is_rejected() {
        let mut matrix = uniform_matrix();
        matrix[TERMINAL_ROW][0] = 1.0;
        assert!(!Genome::new("g-0", 0, matrix).is_valid());
    }

    #[test]
    fn test_negative_cell_is_rejected() {
        let mut matrix = uniform_matrix();
        matrix[1][0] = -0.1;
        matrix[1][1] += 0.1;
        assert!(!Genome::new("g-0", 0, matrix).is_valid());
    }

    #[test]
    fn test_normalize_zero_row_becomes_uniform() {
        let mut row = [0.0; STAGE_COUNT];
        normalize_row(&mut row);
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < ROW_SUM_TOLERANCE);
    }
}
