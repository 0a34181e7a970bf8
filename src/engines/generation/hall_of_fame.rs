use crate::engines::evaluation::GenomeEvaluation;

use std::collections::HashMap;

/// Best distinct pipelines seen in a cycle, keyed by phenotype signature.
pub struct HallOfFame {
    entries: Vec<GenomeEvaluation>,
    max_size: usize,
    positions: HashMap<String, usize>,
}

impl HallOfFame {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size,
            positions: HashMap::new(),
        }
    }

    /// Add an evaluation; a duplicate signature only replaces a weaker entry.
    pub fn try_add(&mut self, evaluation: GenomeEvaluation) -> bool {
        let signature = evaluation.phenotype.signature();

        if let Some(&pos) = self.positions.get(&signature) {
            if evaluation.report.score <= self.entries[pos].report.score {
                return false;
            }
            self.entries[pos] = evaluation;
        } else {
            self.entries.push(evaluation);
        }

        self.sort_and_trim();
        self.positions.contains_key(&signature)
    }

    fn sort_and_trim(&mut self) {
        // Sort by score (descending)
        self.entries.sort_by(|a, b| {
            b.report
                .score
                .partial_cmp(&a.report.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.entries.truncate(self.max_size);

        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.phenotype.signature(), i))
            .collect();
    }

    pub fn get_all(&self) -> &[GenomeEvaluation] {
        &self.entries
    }

    pub fn best(&self) -> Option<&GenomeEvaluation> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
