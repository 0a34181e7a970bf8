use super::genome::Genome;
use super::stage::Stage;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MAX_STEPS: usize = 10;

/// Concrete ordered stage sequence sampled from a genome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phenotype(pub Vec<Stage>);

impl Phenotype {
    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    /// Adjacent `(a, b)` pairs in pipeline order.
    pub fn transitions(&self) -> impl Iterator<Item = (Stage, Stage)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    /// Canonical form used for deduplication and deterministic ids.
    pub fn signature(&self) -> String {
        if self.0.is_empty() {
            return "∅".to_string();
        }
        self.0.iter().map(|s| s.code()).collect::<Vec<_>>().join(">")
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Weighted random walk from `Start` until `End` or `max_steps` stages.
///
/// Output varies per call; callers that need reproducibility pass a seeded rng.
pub fn unfold<R: Rng + ?Sized>(genome: &Genome, max_steps: usize, rng: &mut R) -> Phenotype {
    let mut stages = Vec::with_capacity(max_steps);
    let mut current = Stage::Start;

    for _ in 0..max_steps {
        let next = next_stage(genome, current, rng.gen::<f64>());
        if next == Stage::End {
            break;
        }
        if !next.is_marker() {
            stages.push(next);
        }
        current = next;
    }

    Phenotype(stages)
}

/// Walk the cumulative distribution of `from`'s row with draw `u`.
fn next_stage(genome: &Genome, from: Stage, u: f64) -> Stage {
    let row = genome.row(from);
    let mut cumulative = 0.0;
    let mut last_reachable = Stage::End;

    for (i, p) in row.iter().enumerate() {
        if *p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_reachable = Stage::ALL[i];
        if u < cumulative {
            return last_reachable;
        }
    }

    // Rounding can leave the cumulative sum a hair below 1.
    last_reachable
}
