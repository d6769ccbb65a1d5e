//! `coppertail serve` — wire the collaborators and start the gateway.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use coppertail_agent::{AgentService, SubAgentToolset};
use coppertail_config::secrets::EnvSecretProvider;
use coppertail_config::{AppConfig, SecretCache, SecretError, SecretProvider};
use coppertail_memory::InMemoryService;
use coppertail_providers::OpenAiCompatModel;
use coppertail_telemetry::JsonlLogStore;
use coppertail_tools::{
    HttpSearchApi, RssItem, StaticDocument, StaticFeedSource, StaticIndex, StubCloudApi,
};

/// A provider for a key supplied directly through configuration.
struct FixedSecretProvider(String);

#[async_trait]
impl SecretProvider for FixedSecretProvider {
    async fn fetch(&self, _name: &str) -> Result<String, SecretError> {
        Ok(self.0.clone())
    }
}

pub async fn run(
    config_path: Option<&Path>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    let base_url = std::env::var("COPPERTAIL_MODEL_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:11434/v1".into());
    let api_key = std::env::var("COPPERTAIL_MODEL_API_KEY").unwrap_or_else(|_| "ollama".into());
    let model = Arc::new(OpenAiCompatModel::new("gateway", base_url, api_key));

    // Direct api_key config skips the secret provider; otherwise keys come
    // from the environment through the 300-second cache.
    let secrets: Arc<SecretCache> = match &config.tools.search.api_key {
        Some(key) => Arc::new(SecretCache::new(Box::new(FixedSecretProvider(key.clone())))),
        None => Arc::new(SecretCache::new(Box::new(EnvSecretProvider))),
    };

    let toolset = SubAgentToolset {
        search: Arc::new(HttpSearchApi::new(
            config.tools.search.api_url.clone(),
            secrets,
            config.tools.search.secret_name.clone(),
            config.tools.search.timeout_secs,
        )),
        feed: Arc::new(StaticFeedSource::new(sample_feed())),
        knowledge: Arc::new(StaticIndex::new(sample_documents())),
        cloud: Arc::new(StubCloudApi),
    };

    let store = Arc::new(JsonlLogStore::new(format!(
        "{}.jsonl",
        config.recorder.log_table
    )));

    let service = Arc::new(AgentService::new(
        config.clone(),
        model,
        Arc::new(InMemoryService::new()),
        store,
        toolset,
    )?);

    info!(port = config.gateway.port, "Starting coppertail gateway");
    coppertail_gateway::start(&config.gateway, service).await
}

fn sample_feed() -> Vec<RssItem> {
    vec![
        RssItem {
            title: "新しいストレージクラスの発表".into(),
            link: "https://news.example.com/storage".into(),
            published: "2026-02-20T09:00:00+09:00".into(),
            summary: "アーカイブ向けの低価格ストレージクラスが利用可能になりました。".into(),
        },
        RssItem {
            title: "マネージドデータベースの性能改善".into(),
            link: "https://news.example.com/database".into(),
            published: "2026-02-21T09:00:00+09:00".into(),
            summary: "読み取りレプリカのレイテンシが改善されました。".into(),
        },
    ]
}

fn sample_documents() -> Vec<StaticDocument> {
    vec![
        StaticDocument {
            document_id: "doc_lease_001".into(),
            source: "lease_terms.md".into(),
            content: "標準的な賃貸契約は2年間で、更新料は家賃1か月分です。".into(),
        },
        StaticDocument {
            document_id: "doc_deposit_001".into(),
            source: "deposit_rules.md".into(),
            content: "敷金は退去時の清掃費と修繕費を差し引いて返金されます。".into(),
        },
    ]
}
