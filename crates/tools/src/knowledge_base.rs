//! Knowledge-base retrieval tool.
//!
//! Vector similarity search belongs to the external index; the tool shapes
//! the query and the scored chunks. `StaticIndex` scores by naive term
//! overlap so retrieval behavior is deterministic in tests and local runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use coppertail_core::error::ToolError;
use coppertail_core::tool::{Tool, ToolResult};

/// One retrieved chunk with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub document_id: String,
    pub content: String,
    pub source: String,
    pub score: f64,
}

/// The external knowledge index.
#[async_trait]
pub trait KnowledgeIndex: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeChunk>, ToolError>;
}

/// A document held by the static index.
#[derive(Debug, Clone)]
pub struct StaticDocument {
    pub document_id: String,
    pub source: String,
    pub content: String,
}

/// An index over a fixed document set, scored by term overlap.
pub struct StaticIndex {
    documents: Vec<StaticDocument>,
}

impl StaticIndex {
    pub fn new(documents: Vec<StaticDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl KnowledgeIndex for StaticIndex {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeChunk>, ToolError> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut chunks: Vec<KnowledgeChunk> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let haystack = doc.content.to_lowercase();
                let hits = terms.iter().filter(|t| haystack.contains(*t)).count();
                if hits == 0 || terms.is_empty() {
                    return None;
                }
                Some(KnowledgeChunk {
                    document_id: doc.document_id.clone(),
                    content: doc.content.clone(),
                    source: doc.source.clone(),
                    score: hits as f64 / terms.len() as f64,
                })
            })
            .collect();

        chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        chunks.truncate(top_k);
        Ok(chunks)
    }
}

const DEFAULT_TOP_K: usize = 3;

/// The tool the knowledge-base sub-agent is bound to.
pub struct KnowledgeBaseQueryTool {
    index: Arc<dyn KnowledgeIndex>,
}

impl KnowledgeBaseQueryTool {
    pub fn new(index: Arc<dyn KnowledgeIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for KnowledgeBaseQueryTool {
    fn name(&self) -> &str {
        "knowledge_base_query"
    }

    fn description(&self) -> &str {
        "Query the knowledge base for relevant document chunks, sorted by relevance."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of chunks to return (default 3)",
                    "default": DEFAULT_TOP_K
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let top_k = arguments["top_k"]
            .as_u64()
            .map(|k| k as usize)
            .unwrap_or(DEFAULT_TOP_K);

        let chunks = self.index.retrieve(query, top_k).await?;
        info!(
            query,
            retrieved = chunks.len(),
            tool = "knowledge_base_query",
            "Knowledge base retrieval complete"
        );

        let data = serde_json::to_value(&chunks).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "knowledge_base_query".into(),
            reason: e.to_string(),
        })?;
        Ok(ToolResult {
            output: data.to_string(),
            data: Some(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Arc<StaticIndex> {
        Arc::new(StaticIndex::new(vec![
            StaticDocument {
                document_id: "doc_lease_001".into(),
                source: "lease_terms.md".into(),
                content: "Standard lease terms run two years with renewal fees of one month's rent.".into(),
            },
            StaticDocument {
                document_id: "doc_lease_002".into(),
                source: "deposit_rules.md".into(),
                content: "Security deposits are refundable minus cleaning and repair costs at move-out.".into(),
            },
            StaticDocument {
                document_id: "doc_area_001".into(),
                source: "area_guide.md".into(),
                content: "The waterfront area has newer buildings and higher average rent.".into(),
            },
        ]))
    }

    #[tokio::test]
    async fn retrieves_matching_chunks_sorted_by_score() {
        let tool = KnowledgeBaseQueryTool::new(index());
        let result = tool
            .execute(serde_json::json!({"query": "lease renewal rent"}))
            .await
            .unwrap();

        let chunks: Vec<KnowledgeChunk> = serde_json::from_str(&result.output).unwrap();
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].document_id, "doc_lease_001");
        for pair in chunks.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn respects_top_k() {
        let tool = KnowledgeBaseQueryTool::new(index());
        let result = tool
            .execute(serde_json::json!({"query": "rent", "top_k": 1}))
            .await
            .unwrap();
        let chunks: Vec<KnowledgeChunk> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn no_match_returns_empty_list() {
        let tool = KnowledgeBaseQueryTool::new(index());
        let result = tool
            .execute(serde_json::json!({"query": "unrelated"}))
            .await
            .unwrap();
        let chunks: Vec<KnowledgeChunk> = serde_json::from_str(&result.output).unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn missing_query_is_invalid() {
        let tool = KnowledgeBaseQueryTool::new(index());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
