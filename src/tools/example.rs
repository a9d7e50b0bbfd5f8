//! Example tools showing the three common shapes of a capability: a plain
//! synchronous function, an async function, and a tool that keeps state
//! between calls. Copy one of these as the starting point for a new tool.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::{Tool, ToolRegistry};

const DEFAULT_FETCH_LIMIT: u64 = 10;
const MAX_FETCH_LIMIT: u64 = 100;

/// Add two numbers together.
pub fn calculate_sum(a: f64, b: f64) -> f64 {
    a + b
}

/// Stand-in for a call to a search API.
pub async fn fetch_data(query: &str, limit: usize) -> Value {
    let results: Vec<String> = (1..=limit)
        .map(|i| format!("Result {} for '{}'", i, query))
        .collect();

    json!({
        "query": query,
        "results": results,
        "count": limit,
    })
}

/// Wraps [`calculate_sum`]
pub struct CalculateSumTool;

#[async_trait]
impl Tool for CalculateSumTool {
    fn name(&self) -> &str {
        "calculate_sum"
    }

    fn description(&self) -> &str {
        "Add two numbers together"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {
                    "type": "number",
                    "description": "First number"
                },
                "b": {
                    "type": "number",
                    "description": "Second number"
                }
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let a = params["a"].as_f64().context("missing 'a' parameter")?;
        let b = params["b"].as_f64().context("missing 'b' parameter")?;
        Ok(calculate_sum(a, b).to_string())
    }
}

/// Wraps [`fetch_data`]
pub struct FetchDataTool;

#[async_trait]
impl Tool for FetchDataTool {
    fn name(&self) -> &str {
        "fetch_data"
    }

    fn description(&self) -> &str {
        "Fetch data based on a query"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results (default: 10, max: 100)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = params["query"]
            .as_str()
            .context("missing 'query' parameter")?;
        let limit = params["limit"]
            .as_u64()
            .unwrap_or(DEFAULT_FETCH_LIMIT)
            .min(MAX_FETCH_LIMIT) as usize;

        let data = fetch_data(query, limit).await;
        Ok(serde_json::to_string(&data)?)
    }
}

/// Stateful processor that counts how many items it has handled
#[derive(Debug, Default)]
pub struct DataProcessor {
    config: Map<String, Value>,
    processed_count: AtomicUsize,
}

impl DataProcessor {
    pub fn new(config: Option<Map<String, Value>>) -> Self {
        Self {
            config: config.unwrap_or_default(),
            processed_count: AtomicUsize::new(0),
        }
    }

    /// Process one item and return a description of the work done
    pub fn process(&self, data: &str) -> String {
        let n = self.processed_count.fetch_add(1, Ordering::SeqCst) + 1;
        format!("Processed: {} (#{})", data, n)
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }
}

/// Exposes a shared [`DataProcessor`]
pub struct ProcessDataTool {
    processor: Arc<DataProcessor>,
}

impl ProcessDataTool {
    pub fn new(processor: Arc<DataProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl Tool for ProcessDataTool {
    fn name(&self) -> &str {
        "process_data"
    }

    fn description(&self) -> &str {
        "Process data with state tracking"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "data": {
                    "type": "string",
                    "description": "Input data to process"
                }
            },
            "required": ["data"]
        })
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let data = params["data"]
            .as_str()
            .context("missing 'data' parameter")?;
        Ok(self.processor.process(data))
    }
}

/// Registry holding the three example tools
pub fn example_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CalculateSumTool);
    registry.register(FetchDataTool);
    registry.register(ProcessDataTool::new(Arc::new(DataProcessor::default())));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn calculate_sum_adds() {
        let out = CalculateSumTool
            .execute(json!({"a": 2.5, "b": 4}))
            .await
            .unwrap();
        assert_eq!(out, "6.5");
    }

    #[tokio::test]
    async fn calculate_sum_requires_both_operands() {
        let err = CalculateSumTool
            .execute(json!({"a": 1}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[tokio::test]
    async fn fetch_data_defaults_to_ten_results() {
        let out = FetchDataTool
            .execute(json!({"query": "rust"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["query"], "rust");
        assert_eq!(value["count"], 10);
        assert_eq!(value["results"].as_array().unwrap().len(), 10);
        assert_eq!(value["results"][0], "Result 1 for 'rust'");
    }

    #[tokio::test]
    async fn fetch_data_honors_limit() {
        let value = fetch_data("tokio", 3).await;
        assert_eq!(
            value,
            json!({
                "query": "tokio",
                "results": ["Result 1 for 'tokio'", "Result 2 for 'tokio'", "Result 3 for 'tokio'"],
                "count": 3
            })
        );
    }

    #[tokio::test]
    async fn process_data_counts_calls() {
        let processor = Arc::new(DataProcessor::new(None));
        let tool = ProcessDataTool::new(Arc::clone(&processor));

        assert_eq!(
            tool.execute(json!({"data": "a"})).await.unwrap(),
            "Processed: a (#1)"
        );
        assert_eq!(
            tool.execute(json!({"data": "b"})).await.unwrap(),
            "Processed: b (#2)"
        );
        assert_eq!(processor.processed_count(), 2);
        assert!(processor.config().is_empty());
    }

    #[test]
    fn example_tools_registers_three_tools() {
        let tools = example_tools();
        assert_eq!(
            tools.names(),
            vec!["calculate_sum", "fetch_data", "process_data"]
        );
    }
}
