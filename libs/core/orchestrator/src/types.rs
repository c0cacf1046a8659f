// [libs/core/orchestrator/src/types.rs]
//! User-facing role specs. Per the role-polymorphism redesign: a tagged
//! `RoleSpec` over two plain callables, not a trait object or class
//! hierarchy — the orchestrator selects the matching arm at `run`.

use flame_storage_api::OutputType;
use serde_json::Value;

/// Which source of node data an analyzer reads before iterating.
#[derive(Debug, Clone)]
pub enum DataQuery {
    Fhir(Vec<String>),
    S3(Vec<String>),
}

/// `(data, previous_aggregator_result, simple_analysis) -> (result, locally_converged)`.
pub type AnalyzeFn = Box<dyn Fn(&Value, Option<&Value>, bool) -> (Value, bool) + Send + Sync>;

/// `(per_analyzer_results, simple_analysis) -> (aggregated, converged)`.
pub type AggregateFn = Box<dyn Fn(&[Value], bool) -> (Value, bool) + Send + Sync>;

pub struct AnalyzerSpec {
    pub query: DataQuery,
    pub analyze: AnalyzeFn,
}

pub struct AggregatorSpec {
    pub aggregate: AggregateFn,
    pub output_type: OutputType,
}

pub enum RoleSpec {
    Analyzer(AnalyzerSpec),
    Aggregator(AggregatorSpec),
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Analyzer,
    Aggregator { final_result_id: String },
}
