use super::template::{
    LabMetadata, NodeType, Position, TemplateConnection, TemplateNode, WizardTemplate,
};
use crate::error::{CachelabError, Result};
use crate::types::{BaselineMetrics, CacheTier, Strategy, TierConfig};
use chrono::Utc;
use serde_json::{json, Map, Value};
use uuid::Uuid;

const COLUMN_WIDTH: f64 = 250.0;
const ROW_HEIGHT: f64 = 150.0;
const BASE_Y: f64 = 100.0;
const ON_MISS: &str = "on miss";

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn node(node_type: NodeType, label: String, config: Value, column: usize, row: usize) -> TemplateNode {
    TemplateNode {
        id: new_id(),
        node_type,
        label,
        config: object(config),
        position: Position {
            x: column as f64 * COLUMN_WIDTH,
            y: BASE_Y + row as f64 * ROW_HEIGHT,
        },
    }
}

fn connect(from: &TemplateNode, to: &TemplateNode, condition: Option<String>) -> TemplateConnection {
    TemplateConnection {
        id: new_id(),
        from: from.id.clone(),
        to: to.id.clone(),
        condition,
    }
}

fn tier_node(tier: &TierConfig, column: usize, row: usize) -> TemplateNode {
    let mut config = json!({
        "tier": tier.tier,
        "ttl_secs": tier.ttl_secs,
        "max_size": tier.max_size,
        "eviction": tier.eviction,
    });
    if let (Some(threshold), Value::Object(map)) = (tier.semantic_threshold, &mut config) {
        map.insert("semantic_threshold".to_string(), json!(threshold));
    }
    node(NodeType::Cache(tier.tier), tier.tier.label().to_string(), config, column, row)
}

fn routed_categories(strategy: &Strategy, target: Option<CacheTier>) -> Option<String> {
    let categories: Vec<&str> = strategy
        .routing_rules
        .iter()
        .filter(|r| r.target == target)
        .map(|r| r.category.as_str())
        .collect();
    if categories.is_empty() {
        None
    } else {
        Some(format!("category in [{}]", categories.join(", ")))
    }
}

/// Enabled tiers in lookup order, whatever order the strategy stores them in.
fn ordered_tiers(strategy: &Strategy) -> Vec<&TierConfig> {
    let mut tiers: Vec<&TierConfig> = strategy.enabled_tiers().collect();
    tiers.sort_by_key(|t| t.tier);
    tiers
}

fn justification(strategy: &Strategy, expected: &BaselineMetrics) -> String {
    let tiers: Vec<&str> = ordered_tiers(strategy).iter().map(|t| t.tier.label()).collect();
    let tiers = if tiers.is_empty() {
        "direct model calls".to_string()
    } else {
        tiers.join(" then ")
    };
    format!(
        "Reaches a {:.1}% hit rate at {:.0} ms p95 and ${:.3} per 1k queries using {} ({}).",
        expected.hit_rate * 100.0,
        expected.p95_latency_ms,
        expected.cost_per_1k,
        tiers,
        strategy.features().join(", ")
    )
}

fn provenance(strategy: &Strategy, metadata: &LabMetadata) -> String {
    format!(
        "Based on {} validation runs over {} replayed queries at generation {} in {}",
        metadata.validation_runs, metadata.queries_replayed, metadata.generation, strategy.sector
    )
}

fn tags(strategy: &Strategy) -> Vec<String> {
    let mut tags = vec![strategy.sector.to_string(), strategy.use_case.clone()];
    tags.extend(strategy.features());
    tags.extend(strategy.compliance_flags.iter().map(|f| f.to_lowercase()));
    tags.dedup();
    tags
}

/// Compile a promoted strategy into a wizard pipeline template.
///
/// Node ids are fresh on every call; node order, configs and the wiring
/// between them depend only on the inputs.
pub fn compile(strategy: &Strategy, metadata: &LabMetadata) -> Result<WizardTemplate> {
    if !strategy.status.is_promoted() {
        return Err(CachelabError::Configuration(format!(
            "Strategy {} is {:?}; only promoted strategies become templates",
            strategy.id, strategy.status
        )));
    }
    let expected = strategy.baseline.ok_or_else(|| {
        CachelabError::Configuration(format!("Strategy {} has no baseline metrics", strategy.id))
    })?;

    let mut nodes: Vec<TemplateNode> = Vec::new();
    let mut connections = Vec::new();
    let mut column = 0;

    // Entry point of the pipeline, if any
    let mut head: Option<usize> = None;

    if !strategy.compliance_flags.is_empty() {
        nodes.push(node(
            NodeType::ComplianceValidator,
            "Compliance validator".to_string(),
            json!({ "flags": strategy.compliance_flags, "on_violation": "bypass_cache" }),
            column,
            0,
        ));
        head = Some(nodes.len() - 1);
        column += 1;
    }

    let tiers = ordered_tiers(strategy);
    let routed = !strategy.routing_rules.is_empty();

    let router = if routed {
        nodes.push(node(
            NodeType::Router,
            "Category router".to_string(),
            json!({ "rules": strategy.routing_rules }),
            column,
            0,
        ));
        let idx = nodes.len() - 1;
        if let Some(prev) = head {
            connections.push(connect(&nodes[prev], &nodes[idx], None));
        }
        head = Some(idx);
        column += 1;
        Some(idx)
    } else {
        None
    };

    let mut tier_nodes: Vec<usize> = Vec::with_capacity(tiers.len());
    for (row, tier) in tiers.iter().enumerate() {
        // Routed tiers fan out in one column; chained tiers advance left to right
        let (tier_column, tier_row) = if routed { (column, row) } else { (column + row, 0) };
        nodes.push(tier_node(tier, tier_column, tier_row));
        let idx = nodes.len() - 1;

        match (router, tier_nodes.last().copied()) {
            (Some(r), _) => connections.push(connect(
                &nodes[r],
                &nodes[idx],
                routed_categories(strategy, Some(tier.tier)),
            )),
            (None, Some(prev)) => {
                connections.push(connect(&nodes[prev], &nodes[idx], Some(ON_MISS.to_string())))
            }
            (None, None) => {
                if let Some(prev) = head {
                    connections.push(connect(&nodes[prev], &nodes[idx], None));
                }
            }
        }
        tier_nodes.push(idx);
    }
    column += if routed { 1 } else { tiers.len() };

    nodes.push(node(
        NodeType::LlmFallback,
        "LLM fallback".to_string(),
        json!({ "role": "fallback", "store_response": !tiers.is_empty() }),
        column,
        0,
    ));
    let llm = nodes.len() - 1;

    // Every routed tier can miss; a chain only misses out of its last tier
    let misses: &[usize] = if routed {
        &tier_nodes
    } else {
        match tier_nodes.last() {
            Some(last) => std::slice::from_ref(last),
            None => &[],
        }
    };
    for &prev in misses {
        connections.push(connect(&nodes[prev], &nodes[llm], Some(ON_MISS.to_string())));
    }
    if tier_nodes.is_empty() {
        if let Some(prev) = head {
            connections.push(connect(&nodes[prev], &nodes[llm], None));
        }
    }
    if let Some(r) = router {
        if let Some(bypass) = routed_categories(strategy, None) {
            connections.push(connect(&nodes[r], &nodes[llm], Some(bypass)));
        }
    }

    Ok(WizardTemplate {
        id: new_id(),
        strategy_id: strategy.id.clone(),
        name: strategy.name.clone(),
        sector: strategy.sector,
        use_case: strategy.use_case.clone(),
        justification: justification(strategy, &expected),
        provenance: provenance(strategy, metadata),
        expected,
        validation_score: strategy.validation_score,
        nodes,
        connections,
        tags: tags(strategy),
        created_at: Utc::now(),
    })
}
