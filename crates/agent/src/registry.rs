//! Wiring of the standard tool surface.
//!
//! The registry is an explicit value built once per invocation and handed
//! to the router's constructor. Sub-agents are constructed here, per
//! invocation, so nothing conversational is shared process-wide.

use std::sync::Arc;

use coppertail_config::AppConfig;
use coppertail_core::model::ModelClient;
use coppertail_core::tool::{Tool, ToolRegistry};
use coppertail_tools::{
    CloudApi, CloudGuidanceTool, CurrentTimeTool, FeedSource, KnowledgeBaseQueryTool,
    KnowledgeIndex, NewsFeedLookupTool, SearchApi, WeatherLookupTool, WebSearchTool,
};

use crate::sink::MetricsSink;
use crate::sub_agent::{SubAgent, SubAgentTool};

/// The external collaborators the sub-agent tools wrap.
#[derive(Clone)]
pub struct SubAgentToolset {
    pub search: Arc<dyn SearchApi>,
    pub feed: Arc<dyn FeedSource>,
    pub knowledge: Arc<dyn KnowledgeIndex>,
    pub cloud: Arc<dyn CloudApi>,
}

const WEATHER_AGENT_PROMPT: &str = "You are an agent that provides weather information. \
    You will also tell the current time along with the weather. \
    Use the get_weather tool to get the current weather for a specified city, \
    and the current_time tool to get the current time. Timezone is Asia/Tokyo. \
    Answer in Japanese.";

const SEARCH_AGENT_PROMPT: &str = "You are a web search agent. \
    Use the web_search tool to perform searches on the web. Answer in Japanese.";

const NEWS_AGENT_PROMPT: &str = "You are an agent that fetches news feed items. \
    Use the news_feed_lookup tool to get the latest news based on a keyword. \
    Answer in Japanese.";

const KNOWLEDGE_AGENT_PROMPT: &str = "You are an agent that answers questions from \
    the internal knowledge base. Use the knowledge_base_query tool to retrieve \
    relevant documents and answer based only on what you retrieve.";

const CLOUD_AGENT_PROMPT: &str = "You are an agent that gives guidance about the \
    user's cloud resources. Use the cloud_resource_inspect tool to inspect \
    resources. Do not retry failed calls; report the failure instead.";

/// Build the root agent's tool surface: one named tool-function per
/// sub-agent.
pub fn standard_registry(
    model: Arc<dyn ModelClient>,
    config: &AppConfig,
    toolset: &SubAgentToolset,
    sink: &MetricsSink,
) -> ToolRegistry {
    let model_config = config.model.clone();
    let sub_agent = |name: &str, prompt: &str, tools: Vec<Box<dyn Tool>>| {
        SubAgent::new(
            name,
            prompt,
            tools,
            model.clone(),
            model_config.clone(),
            sink.clone(),
        )
    };

    let mut registry = ToolRegistry::new();

    registry.register(Box::new(SubAgentTool::new(
        "call_weather_agent",
        "Get weather information and the current time for a city.",
        "city",
        "The name of the city",
        "Get the weather for {} and current time.",
        sub_agent(
            "weather_agent",
            WEATHER_AGENT_PROMPT,
            vec![
                Box::new(WeatherLookupTool),
                Box::new(CurrentTimeTool::new()),
            ],
        ),
    )));

    registry.register(Box::new(SubAgentTool::new(
        "call_search_agent",
        "Perform a web search and summarize the results.",
        "query",
        "The search query string",
        "Search the web for {}",
        sub_agent(
            "search_agent",
            SEARCH_AGENT_PROMPT,
            vec![Box::new(WebSearchTool::new(toolset.search.clone()))],
        ),
    )));

    registry.register(Box::new(SubAgentTool::new(
        "call_news_feed_agent",
        "Get the latest news feed items for a keyword.",
        "keyword",
        "Keyword to look up in the news feed",
        "Get the latest news about {}",
        sub_agent(
            "news_feed_agent",
            NEWS_AGENT_PROMPT,
            vec![Box::new(NewsFeedLookupTool::new(toolset.feed.clone()))],
        ),
    )));

    registry.register(Box::new(SubAgentTool::new(
        "call_knowledge_base_agent",
        "Answer a question from the internal knowledge base.",
        "query",
        "The question to answer from the knowledge base",
        "Answer from the knowledge base: {}",
        sub_agent(
            "knowledge_agent",
            KNOWLEDGE_AGENT_PROMPT,
            vec![Box::new(KnowledgeBaseQueryTool::new(
                toolset.knowledge.clone(),
            ))],
        ),
    )));

    registry.register(Box::new(SubAgentTool::new(
        "call_cloud_guidance_agent",
        "Give guidance about the user's cloud resources.",
        "question",
        "The cloud resource question",
        "Help with this cloud resource question: {}",
        sub_agent(
            "cloud_agent",
            CLOUD_AGENT_PROMPT,
            vec![Box::new(
                CloudGuidanceTool::new(
                    toolset.cloud.clone(),
                    config.tools.cloud.default_region.clone(),
                )
                .with_auto_retry(config.tools.cloud.auto_retry),
            )],
        ),
    )));

    registry
}
