use serde::{Deserialize, Serialize};
use std::fmt;

pub const STAGE_COUNT: usize = 9;

/// Pipeline stages a genome transitions between.
///
/// The order is fixed: a stage's position in [`Stage::ALL`] is its row and
/// column index in every transition matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Start,
    Normalize,
    ComplianceCheck,
    Router,
    L1Check,
    L2Check,
    L3Semantic,
    LlmCall,
    End,
}

impl Stage {
    pub const ALL: [Stage; STAGE_COUNT] = [
        Stage::Start,
        Stage::Normalize,
        Stage::ComplianceCheck,
        Stage::Router,
        Stage::L1Check,
        Stage::L2Check,
        Stage::L3Semantic,
        Stage::LlmCall,
        Stage::End,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Stage::ALL.get(index).copied()
    }

    /// START and END only delimit a walk; they never appear in a phenotype.
    pub fn is_marker(self) -> bool {
        matches!(self, Stage::Start | Stage::End)
    }

    pub fn is_cache_lookup(self) -> bool {
        matches!(self, Stage::L1Check | Stage::L2Check | Stage::L3Semantic)
    }

    pub fn code(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Normalize => "normalize",
            Stage::ComplianceCheck => "compliance",
            Stage::Router => "router",
            Stage::L1Check => "l1",
            Stage::L2Check => "l2",
            Stage::L3Semantic => "l3",
            Stage::LlmCall => "llm",
            Stage::End => "end",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_position() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(Stage::from_index(i), Some(*stage));
        }
        assert_eq!(Stage::from_index(STAGE_COUNT), None);
        assert_eq!(Stage::End.index(), STAGE_COUNT - 1);
    }
}
