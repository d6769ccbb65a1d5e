//! The invocation entrypoint.
//!
//! `AgentService::invoke` wires one request through the pipeline: bind the
//! session (fail fast), build a fresh router and sub-agents for the
//! invocation, relay normalized events to the caller as the run produces
//! them, then consolidate the terminal result and hand the summary to the
//! recorder.
//!
//! The relay channels are capacity-1: the producer suspends at each event
//! until the caller has taken it, preserving order with no internal
//! buffering. A dropped caller makes the next send fail, which aborts the
//! in-flight run without writing a record.

use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{info, warn};

use coppertail_config::AppConfig;
use coppertail_core::error::{Error, ModelError, SessionBindingError};
use coppertail_core::event::ResponseEvent;
use coppertail_core::memory::MemoryService;
use coppertail_core::model::ModelClient;
use coppertail_core::result::AgentResult;
use coppertail_core::session::{new_invocation_id, InvocationRequest, SessionContext};
use coppertail_memory::SessionBinder;
use coppertail_telemetry::{InvocationRecorder, LogStore};

use crate::aggregator::consolidate;
use crate::registry::{standard_registry, SubAgentToolset};
use crate::router::ToolRouter;
use crate::sink::MetricsSink;

/// The streamed response of one invocation.
pub struct InvocationStream {
    pub invocation_id: String,
    receiver: mpsc::Receiver<Result<ResponseEvent, Error>>,
}

impl InvocationStream {
    /// Receive the next normalized event, or `None` when the stream ends.
    pub async fn next_event(&mut self) -> Option<Result<ResponseEvent, Error>> {
        self.receiver.recv().await
    }
}

impl Stream for InvocationStream {
    type Item = Result<ResponseEvent, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

enum Relay {
    Forwarded,
    Cancelled,
    Fatal,
}

/// The conversational entrypoint service.
pub struct AgentService {
    config: AppConfig,
    model: Arc<dyn ModelClient>,
    binder: SessionBinder,
    recorder: Arc<InvocationRecorder>,
    toolset: SubAgentToolset,
}

impl AgentService {
    /// Build the service. Fails fast when the memory store is not
    /// configured — running memory-less is never a silent fallback.
    pub fn new(
        config: AppConfig,
        model: Arc<dyn ModelClient>,
        memory: Arc<dyn MemoryService>,
        store: Arc<dyn LogStore>,
        toolset: SubAgentToolset,
    ) -> Result<Self, SessionBindingError> {
        let binder = SessionBinder::new(config.memory.memory_id.clone(), memory)?;
        Ok(Self {
            config,
            model,
            binder,
            recorder: Arc::new(InvocationRecorder::new(store)),
            toolset,
        })
    }

    /// Run one invocation, returning the stream of normalized events.
    ///
    /// The router and its sub-agents are constructed per invocation so the
    /// session memory handle is never shared across invocations.
    pub async fn invoke(&self, request: InvocationRequest) -> Result<InvocationStream, Error> {
        let invocation_id = new_invocation_id();
        let bound = self.binder.bind(&request, &invocation_id).await?;

        info!(
            invocation_id = %invocation_id,
            actor_id = %bound.context.actor_id,
            session_id = %bound.context.session_id,
            "Invocation started"
        );

        let sink = MetricsSink::new();
        let registry = standard_registry(self.model.clone(), &self.config, &self.toolset, &sink);
        let router = ToolRouter::new(
            self.model.clone(),
            self.config.model.clone(),
            registry,
            sink,
        );

        let (out_tx, out_rx) = mpsc::channel(1);
        let recorder = self.recorder.clone();
        let context = bound.context;
        let memory = bound.memory;
        let prompt = request.prompt;
        let task_id = invocation_id.clone();

        tokio::spawn(async move {
            run_invocation(router, memory, prompt, context, task_id, recorder, out_tx).await;
        });

        Ok(InvocationStream {
            invocation_id,
            receiver: out_rx,
        })
    }
}

async fn run_invocation(
    router: ToolRouter,
    memory: Box<dyn coppertail_core::memory::SessionMemory>,
    prompt: String,
    context: SessionContext,
    invocation_id: String,
    recorder: Arc<InvocationRecorder>,
    out_tx: mpsc::Sender<Result<ResponseEvent, Error>>,
) {
    let (raw_tx, mut raw_rx) = mpsc::channel::<Value>(1);
    let run = router.run(&prompt, memory.as_ref(), raw_tx);
    tokio::pin!(run);

    // Phase 1: relay events while the run is in flight.
    let mut channel_open = true;
    let result: Result<AgentResult, ModelError> = loop {
        tokio::select! {
            result = &mut run => break result,
            raw = raw_rx.recv(), if channel_open => match raw {
                Some(raw) => match relay_raw(&raw, &out_tx).await {
                    Relay::Forwarded => {}
                    Relay::Cancelled => {
                        info!(invocation_id = %invocation_id, "Caller disconnected, aborting run");
                        return;
                    }
                    Relay::Fatal => {
                        warn!(invocation_id = %invocation_id, "Unrecognized event, invocation aborted");
                        recorder
                            .record_failure(&invocation_id, &context, &prompt)
                            .await;
                        return;
                    }
                },
                None => channel_open = false,
            },
        }
    };

    // Phase 2: the run has completed; drain whatever is still in flight.
    while let Some(raw) = raw_rx.recv().await {
        match relay_raw(&raw, &out_tx).await {
            Relay::Forwarded => {}
            Relay::Cancelled => {
                info!(invocation_id = %invocation_id, "Caller disconnected during drain");
                return;
            }
            Relay::Fatal => {
                warn!(invocation_id = %invocation_id, "Unrecognized event, invocation aborted");
                recorder
                    .record_failure(&invocation_id, &context, &prompt)
                    .await;
                return;
            }
        }
    }

    // Terminal consolidation, strictly after the run completed.
    match result {
        Ok(agent_result) => {
            let summary = consolidate(&agent_result);
            recorder
                .record_success(
                    &invocation_id,
                    &context,
                    &prompt,
                    summary.output_message,
                    summary.total_usage,
                    summary.total_latency_ms,
                )
                .await;
        }
        Err(e) => {
            warn!(invocation_id = %invocation_id, error = %e, "Run failed");
            let _ = out_tx.send(Err(Error::Model(e))).await;
            recorder
                .record_failure(&invocation_id, &context, &prompt)
                .await;
        }
    }
}

async fn relay_raw(raw: &Value, out_tx: &mpsc::Sender<Result<ResponseEvent, Error>>) -> Relay {
    match crate::aggregator::normalize(raw) {
        Ok(event) => {
            if out_tx.send(Ok(event)).await.is_err() {
                Relay::Cancelled
            } else {
                Relay::Forwarded
            }
        }
        Err(parse_err) => {
            let _ = out_tx.send(Err(Error::Stream(parse_err))).await;
            Relay::Fatal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coppertail_core::error::ToolError;
    use coppertail_core::event::EventKind;
    use coppertail_core::message::{ChatMessage, ToolUse};
    use coppertail_core::metrics::Usage;
    use coppertail_core::model::{ModelRequest, ModelTurn};
    use coppertail_core::result::StopReason;
    use coppertail_memory::InMemoryService;
    use coppertail_telemetry::InMemoryLogStore;
    use coppertail_tools::{RssItem, StaticFeedSource, StaticIndex, StubCloudApi};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTurn {
        events: Vec<Value>,
        turn: ModelTurn,
    }

    /// A model runtime that replays scripted turns in sequence and captures
    /// every request it receives.
    struct ScriptedModel {
        turns: Mutex<VecDeque<ScriptedTurn>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedModel {
        fn new(turns: Vec<ScriptedTurn>) -> Arc<Self> {
            Arc::new(Self {
                turns: Mutex::new(turns.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn converse(
            &self,
            request: ModelRequest,
            relay: Option<&mpsc::Sender<Value>>,
        ) -> Result<ModelTurn, ModelError> {
            self.requests.lock().unwrap().push(request);
            let scripted = self
                .turns
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted model exhausted");
            if let Some(relay) = relay {
                for event in scripted.events {
                    relay
                        .send(event)
                        .await
                        .map_err(|_| ModelError::Interrupted("relay closed".into()))?;
                }
            }
            Ok(scripted.turn)
        }
    }

    fn text_turn(text: &str, input_tokens: u64, output_tokens: u64, latency_ms: u64) -> ModelTurn {
        ModelTurn {
            message: ChatMessage::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: Usage::new(input_tokens, output_tokens),
            latency_ms,
        }
    }

    fn tool_turn(tool: &str, input: Value, input_tokens: u64, output_tokens: u64) -> ModelTurn {
        let mut message = ChatMessage::assistant("");
        message.tool_uses.push(ToolUse {
            id: format!("tooluse_{tool}"),
            name: tool.into(),
            input,
        });
        ModelTurn {
            message,
            stop_reason: StopReason::ToolUse,
            usage: Usage::new(input_tokens, output_tokens),
            latency_ms: 100,
        }
    }

    fn delta_event(text: &str) -> Value {
        json!({"event": {"contentBlockDelta": {"delta": {"text": text}, "contentBlockIndex": 0}}})
    }

    fn stream_events(text_fragments: &[&str]) -> Vec<Value> {
        let mut events = vec![json!({"event": {"messageStart": {"role": "assistant"}}})];
        events.extend(text_fragments.iter().map(|t| delta_event(t)));
        events.push(json!({"event": {"contentBlockStop": {"contentBlockIndex": 0}}}));
        events.push(json!({"event": {"messageStop": {"stopReason": "end_turn"}}}));
        events
    }

    fn toolset() -> SubAgentToolset {
        struct NoSearch;
        #[async_trait]
        impl coppertail_tools::SearchApi for NoSearch {
            async fn search(&self, _query: &str) -> Result<Value, ToolError> {
                Ok(json!({"results": []}))
            }
        }
        SubAgentToolset {
            search: Arc::new(NoSearch),
            feed: Arc::new(StaticFeedSource::new(vec![RssItem::default()])),
            knowledge: Arc::new(StaticIndex::new(vec![])),
            cloud: Arc::new(StubCloudApi),
        }
    }

    fn service_with(
        model: Arc<ScriptedModel>,
        store: Arc<InMemoryLogStore>,
    ) -> AgentService {
        let mut config = AppConfig::default();
        config.memory.memory_id = Some("mem-test".into());
        AgentService::new(
            config,
            model,
            Arc::new(InMemoryService::new()),
            store,
            toolset(),
        )
        .unwrap()
    }

    async fn collect(mut stream: InvocationStream) -> Vec<Result<ResponseEvent, Error>> {
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn plain_answer_streams_and_records() {
        let model = ScriptedModel::new(vec![ScriptedTurn {
            events: stream_events(&["こんにちは", "！"]),
            turn: text_turn("こんにちは！", 100, 10, 250),
        }]);
        let store = Arc::new(InMemoryLogStore::new());
        let service = service_with(model, store.clone());

        let stream = service
            .invoke(InvocationRequest::new("挨拶して"))
            .await
            .unwrap();
        let events = collect(stream).await;

        let kinds: Vec<EventKind> = events
            .iter()
            .map(|e| e.as_ref().unwrap().event)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::MessageStart,
                EventKind::ContentBlockDelta,
                EventKind::ContentBlockDelta,
                EventKind::ContentBlockStop,
                EventKind::MessageStop,
            ]
        );
        assert_eq!(events[1].as_ref().unwrap().data, "こんにちは");

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].output.as_deref(), Some("こんにちは！"));
        assert_eq!(records[0].usage.as_ref().unwrap().total_tokens, 110);
        assert_eq!(records[0].latency_ms, Some(250));
    }

    #[tokio::test]
    async fn weather_delegation_merges_nested_usage() {
        // Root requests the weather tool; the weather sub-agent runs its
        // own two cycles; root then answers. The accumulated usage covers
        // all four turns even though the root layer only sees two cycles.
        let model = ScriptedModel::new(vec![
            ScriptedTurn {
                events: vec![],
                turn: tool_turn("call_weather_agent", json!({"city": "大阪"}), 920, 50),
            },
            ScriptedTurn {
                events: vec![],
                turn: tool_turn("get_weather", json!({"city": "大阪"}), 500, 20),
            },
            ScriptedTurn {
                events: vec![],
                turn: text_turn("曇り、気温22度です。", 539, 21, 400),
            },
            ScriptedTurn {
                events: stream_events(&["大阪の現在の天気は曇りで", "す。"]),
                turn: text_turn("大阪の現在の天気は曇りです。", 1039, 41, 766),
            },
        ]);
        let store = Arc::new(InMemoryLogStore::new());
        let service = service_with(model.clone(), store.clone());

        let stream = service
            .invoke(InvocationRequest::new("大阪の天気は？"))
            .await
            .unwrap();
        let events = collect(stream).await;
        assert!(events.iter().all(|e| e.is_ok()));

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        let usage = records[0].usage.clone().unwrap();
        // 920+500+539+1039 inputs, 50+20+21+41 outputs, across nested runs.
        assert_eq!(usage.input_tokens, 2998);
        assert_eq!(usage.output_tokens, 132);
        assert_eq!(usage.total_tokens, 3130);
        assert_eq!(records[0].latency_ms, Some(100 + 400 + 766 + 100));
        assert_eq!(
            records[0].output.as_deref(),
            Some("大阪の現在の天気は曇りです。")
        );

        // The weather sub-agent exercised the real weather tool: its final
        // round saw the tool result text.
        let requests = model.requests();
        let sub_final = &requests[2];
        assert!(sub_final
            .messages
            .iter()
            .any(|m| m.content.contains("曇り、気温22度")));
    }

    #[tokio::test]
    async fn failing_tool_does_not_abort_the_invocation() {
        let model = ScriptedModel::new(vec![
            ScriptedTurn {
                events: vec![],
                // The registry has no tool by this name.
                turn: tool_turn("call_missing_agent", json!({"query": "x"}), 10, 5),
            },
            ScriptedTurn {
                events: stream_events(&["すみません、できませんでした。"]),
                turn: text_turn("すみません、できませんでした。", 20, 10, 120),
            },
        ]);
        let store = Arc::new(InMemoryLogStore::new());
        let service = service_with(model.clone(), store.clone());

        let stream = service
            .invoke(InvocationRequest::new("何かして"))
            .await
            .unwrap();
        let events = collect(stream).await;
        assert!(events.iter().all(|e| e.is_ok()));

        // The model saw the failure as tool-result content.
        let requests = model.requests();
        let followup = &requests[1];
        assert!(followup
            .messages
            .iter()
            .any(|m| m.tool_use_id.is_some() && m.content.starts_with("Error:")));

        // And the invocation still recorded a success.
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].output.is_some());
    }

    #[tokio::test]
    async fn unrecognized_event_fails_closed() {
        let model = ScriptedModel::new(vec![ScriptedTurn {
            events: vec![
                json!({"event": {"messageStart": {"role": "assistant"}}}),
                json!({"event": {"citationsDelta": {"source": "x"}}}),
            ],
            turn: text_turn("never delivered", 10, 5, 100),
        }]);
        let store = Arc::new(InMemoryLogStore::new());
        let service = service_with(model, store.clone());

        let stream = service
            .invoke(InvocationRequest::new("hello"))
            .await
            .unwrap();
        let events = collect(stream).await;

        assert!(events[0].is_ok());
        assert!(matches!(
            events[1],
            Err(Error::Stream(
                coppertail_core::error::StreamParseError::UnrecognizedKind(_)
            ))
        ));
        assert_eq!(events.len(), 2);

        // A recorded failure: present, but with no output.
        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].output.is_none());
    }

    #[tokio::test]
    async fn model_failure_surfaces_and_records_failure() {
        struct FailingModel;
        #[async_trait]
        impl ModelClient for FailingModel {
            fn name(&self) -> &str {
                "failing"
            }
            async fn converse(
                &self,
                _request: ModelRequest,
                _relay: Option<&mpsc::Sender<Value>>,
            ) -> Result<ModelTurn, ModelError> {
                Err(ModelError::Network("connection refused".into()))
            }
        }

        let mut config = AppConfig::default();
        config.memory.memory_id = Some("mem-test".into());
        let store = Arc::new(InMemoryLogStore::new());
        let service = AgentService::new(
            config,
            Arc::new(FailingModel),
            Arc::new(InMemoryService::new()),
            store.clone(),
            toolset(),
        )
        .unwrap();

        let stream = service
            .invoke(InvocationRequest::new("hello"))
            .await
            .unwrap();
        let events = collect(stream).await;
        assert!(matches!(events.last(), Some(Err(Error::Model(_)))));

        let records = store.records().await;
        assert_eq!(records.len(), 1);
        assert!(records[0].output.is_none());
    }

    #[tokio::test]
    async fn cancellation_writes_no_record() {
        let model = ScriptedModel::new(vec![ScriptedTurn {
            events: stream_events(&["最初", "続き", "さらに"]),
            turn: text_turn("最初続きさらに", 10, 5, 100),
        }]);
        let store = Arc::new(InMemoryLogStore::new());
        let service = service_with(model, store.clone());

        let mut stream = service
            .invoke(InvocationRequest::new("hello"))
            .await
            .unwrap();
        // Take one event, then disconnect.
        let first = stream.next_event().await.unwrap().unwrap();
        assert_eq!(first.event, EventKind::MessageStart);
        drop(stream);

        // Give the aborted task time to unwind.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(store.records().await.is_empty());
    }

    #[tokio::test]
    async fn missing_memory_config_fails_service_construction() {
        let model = ScriptedModel::new(vec![]);
        let err = AgentService::new(
            AppConfig::default(),
            model,
            Arc::new(InMemoryService::new()),
            Arc::new(InMemoryLogStore::new()),
            toolset(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SessionBindingError::MissingMemoryId));
    }

    #[tokio::test]
    async fn repeated_session_id_sees_prior_history() {
        let model = ScriptedModel::new(vec![
            ScriptedTurn {
                events: vec![],
                turn: text_turn("はじめまして", 10, 5, 50),
            },
            ScriptedTurn {
                events: vec![],
                turn: text_turn("また会いましたね", 12, 6, 60),
            },
        ]);
        let store = Arc::new(InMemoryLogStore::new());
        let service = service_with(model.clone(), store.clone());

        let mut request = InvocationRequest::new("こんにちは");
        request.actor_id = Some("actor-1".into());
        request.session_id = Some("session-1".into());

        collect(service.invoke(request.clone()).await.unwrap()).await;
        request.prompt = "覚えてる？".into();
        collect(service.invoke(request).await.unwrap()).await;

        // The second invocation's context included the first exchange.
        let requests = model.requests();
        let second = &requests[1];
        assert!(second.messages.iter().any(|m| m.content == "こんにちは"));
        assert!(second.messages.iter().any(|m| m.content == "はじめまして"));
    }
}
