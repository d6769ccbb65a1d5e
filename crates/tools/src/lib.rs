//! Leaf tool implementations for coppertail.
//!
//! Each sub-agent is bound to exactly one of these. The tools wrap their
//! external collaborator (weather data, search API, feed source, knowledge
//! index, cloud API) behind a narrow trait so tests and local runs can
//! substitute it.

pub mod cloud_guidance;
pub mod current_time;
pub mod knowledge_base;
pub mod news_feed;
pub mod weather;
pub mod web_search;

pub use cloud_guidance::{CloudApi, CloudGuidanceTool, StubCloudApi};
pub use current_time::CurrentTimeTool;
pub use knowledge_base::{
    KnowledgeBaseQueryTool, KnowledgeChunk, KnowledgeIndex, StaticDocument, StaticIndex,
};
pub use news_feed::{FeedSource, NewsFeedLookupTool, RssItem, StaticFeedSource};
pub use weather::WeatherLookupTool;
pub use web_search::{HttpSearchApi, SearchApi, WebSearchTool};
