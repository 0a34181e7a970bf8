use crate::types::{BaselineMetrics, CacheTier, Sector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    ComplianceValidator,
    Router,
    Cache(CacheTier),
    LlmFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateNode {
    pub id: String,
    pub node_type: NodeType,
    pub label: String,
    pub config: Map<String, Value>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConnection {
    pub id: String,
    pub from: String,
    pub to: String,
    pub condition: Option<String>,
}

/// Context the lab attaches when publishing a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabMetadata {
    pub validation_runs: usize,
    pub queries_replayed: usize,
    pub generation: u32,
}

/// Read-only pipeline document handed to the setup wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardTemplate {
    pub id: String,
    pub strategy_id: String,
    pub name: String,
    pub sector: Sector,
    pub use_case: String,
    pub justification: String,
    pub provenance: String,
    pub expected: BaselineMetrics,
    pub validation_score: f64,
    pub nodes: Vec<TemplateNode>,
    pub connections: Vec<TemplateConnection>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl WizardTemplate {
    pub fn node(&self, id: &str) -> Option<&TemplateNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Connections as node-index pairs, independent of generated ids.
    pub fn topology(&self) -> Vec<(usize, usize, Option<String>)> {
        self.connections
            .iter()
            .filter_map(|c| {
                let from = self.index_of(&c.from)?;
                let to = self.index_of(&c.to)?;
                Some((from, to, c.condition.clone()))
            })
            .collect()
    }

    /// Node types and configs in order, independent of generated ids.
    pub fn layout(&self) -> Vec<(NodeType, &Map<String, Value>)> {
        self.nodes.iter().map(|n| (n.node_type, &n.config)).collect()
    }
}
