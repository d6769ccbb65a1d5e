//! News-feed lookup tool — keyword filtering over an RSS-style feed.
//!
//! Feed retrieval and parsing belong to the feed source collaborator; the
//! tool only filters items by keyword and shapes the result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use coppertail_core::error::ToolError;
use coppertail_core::tool::{Tool, ToolResult};

/// One feed item. Every field defaults to an empty string — feed entries
/// are missing fields more often than not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RssItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub summary: String,
}

impl RssItem {
    /// Build an item leniently from a parsed feed entry.
    pub fn from_entry(entry: &Value) -> Self {
        let field = |name: &str| {
            entry
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            title: field("title"),
            link: field("link"),
            published: field("published"),
            summary: field("summary"),
        }
    }
}

/// The external feed source.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RssItem>, ToolError>;
}

/// A feed source over a fixed item list, for tests and local runs.
pub struct StaticFeedSource {
    items: Vec<RssItem>,
}

impl StaticFeedSource {
    pub fn new(items: Vec<RssItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn fetch(&self) -> Result<Vec<RssItem>, ToolError> {
        Ok(self.items.clone())
    }
}

const DEFAULT_MAX_ITEMS: usize = 10;

/// The tool the news-feed sub-agent is bound to.
pub struct NewsFeedLookupTool {
    source: Arc<dyn FeedSource>,
    max_items: usize,
}

impl NewsFeedLookupTool {
    pub fn new(source: Arc<dyn FeedSource>) -> Self {
        Self {
            source,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }
}

#[async_trait]
impl Tool for NewsFeedLookupTool {
    fn name(&self) -> &str {
        "news_feed_lookup"
    }

    fn description(&self) -> &str {
        "Get the latest news feed items matching a keyword."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Keyword to match against item titles and summaries"
                }
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let keyword = arguments["keyword"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'keyword' argument".into()))?;
        let needle = keyword.to_lowercase();

        let items = self.source.fetch().await?;
        let matched: Vec<RssItem> = items
            .into_iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&needle)
                    || item.summary.to_lowercase().contains(&needle)
            })
            .take(self.max_items)
            .collect();

        info!(
            keyword,
            matched = matched.len(),
            tool = "news_feed_lookup",
            "Feed lookup complete"
        );

        let data = serde_json::to_value(&matched).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "news_feed_lookup".into(),
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

    fn source() -> Arc<StaticFeedSource> {
        Arc::new(StaticFeedSource::new(vec![
            RssItem {
                title: "New storage tier announced".into(),
                link: "https://news.example.com/1".into(),
                published: "2026-02-20".into(),
                summary: "Cheaper archival storage".into(),
            },
            RssItem {
                title: "Database engine update".into(),
                link: "https://news.example.com/2".into(),
                published: "2026-02-21".into(),
                summary: "Faster storage engine for the managed database".into(),
            },
            RssItem {
                title: "Networking improvements".into(),
                link: "https://news.example.com/3".into(),
                published: "2026-02-22".into(),
                summary: "Lower latency between regions".into(),
            },
        ]))
    }

    #[tokio::test]
    async fn filters_by_keyword_in_title_or_summary() {
        let tool = NewsFeedLookupTool::new(source());
        let result = tool
            .execute(serde_json::json!({"keyword": "storage"}))
            .await
            .unwrap();
        let items: Vec<RssItem> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn keyword_match_is_case_insensitive() {
        let tool = NewsFeedLookupTool::new(source());
        let result = tool
            .execute(serde_json::json!({"keyword": "DATABASE"}))
            .await
            .unwrap();
        let items: Vec<RssItem> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn respects_max_items() {
        let tool = NewsFeedLookupTool::new(source()).with_max_items(1);
        let result = tool
            .execute(serde_json::json!({"keyword": "storage"}))
            .await
            .unwrap();
        let items: Vec<RssItem> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn from_entry_is_lenient() {
        let entry = serde_json::json!({"title": "only a title"});
        let item = RssItem::from_entry(&entry);
        assert_eq!(item.title, "only a title");
        assert_eq!(item.link, "");
        assert_eq!(item.summary, "");
    }
}
