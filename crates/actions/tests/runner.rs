#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    courier_actions::{
        ActionContext, ActionDeps, ActionError, ActionRequest, ActionResult, ActionRunner,
        DispatchOutcome, HandledBy, MessageAction, PluginActionDispatcher, PollDispatcher,
        PollRequest, SendDispatcher, SendRequest,
    },
    courier_channels::{ChannelActionRequest, ChannelRegistry},
    courier_common::ToolResult,
    courier_config::CourierConfig,
    courier_routing::{DirectoryCache, TargetResolver},
    serde_json::{Map, Value, json},
};

// ── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSend {
    requests: Mutex<Vec<SendRequest>>,
    /// (channel, to) pairs that fail.
    fail_on: Vec<(&'static str, &'static str)>,
    /// Destinations that complete late.
    slow: Vec<&'static str>,
}

impl RecordingSend {
    fn sent(&self) -> Vec<SendRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SendDispatcher for RecordingSend {
    async fn send(&self, request: &SendRequest) -> courier_channels::Result<DispatchOutcome> {
        if self.slow.iter().any(|s| *s == request.message.to) {
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        self.requests.lock().unwrap().push(request.clone());
        let failing = self
            .fail_on
            .iter()
            .any(|(c, t)| *c == request.channel && *t == request.message.to);
        if failing {
            return Err(courier_channels::Error::unavailable("connector offline"));
        }
        Ok(DispatchOutcome {
            handled_by: HandledBy::Core,
            payload: json!({ "messageId": format!("{}:{}", request.channel, request.message.to) }),
            tool_result: None,
        })
    }
}

#[derive(Default)]
struct RecordingPoll {
    requests: Mutex<Vec<PollRequest>>,
}

#[async_trait]
impl PollDispatcher for RecordingPoll {
    async fn poll(&self, request: &PollRequest) -> courier_channels::Result<DispatchOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(DispatchOutcome {
            handled_by: HandledBy::Core,
            payload: json!({ "pollId": "p1" }),
            tool_result: None,
        })
    }
}

#[derive(Default)]
struct RecordingPlugin {
    requests: Mutex<Vec<(String, ChannelActionRequest)>>,
}

#[async_trait]
impl PluginActionDispatcher for RecordingPlugin {
    async fn dispatch(
        &self,
        channel: &str,
        request: &ChannelActionRequest,
    ) -> courier_channels::Result<Option<ToolResult>> {
        self.requests
            .lock()
            .unwrap()
            .push((channel.to_string(), request.clone()));
        match request.action.as_str() {
            "react" | "channel-info" => Ok(Some(ToolResult::json(json!({ "ok": true })))),
            _ => Ok(None),
        }
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
    runner: ActionRunner,
    config: Arc<CourierConfig>,
    sends: Arc<RecordingSend>,
    polls: Arc<RecordingPoll>,
    plugin: Arc<RecordingPlugin>,
}

fn default_config() -> Value {
    json!({
        "channels": {
            "slack": {
                "directory": {
                    "groups": [
                        { "id": "C0123ABCD", "name": "general" },
                        { "id": "C0456EFGH", "name": "random" }
                    ],
                    "peers": [{ "id": "U0456EFGH", "name": "Alice" }]
                }
            },
            "discord": {
                "directory": { "groups": [{ "id": "555555555", "name": "general" }] }
            }
        }
    })
}

fn harness_with(config: Value, sends: RecordingSend) -> Harness {
    let config: Arc<CourierConfig> = Arc::new(serde_json::from_value(config).unwrap());
    let registry = Arc::new(ChannelRegistry::from_config(&config));
    let resolver = Arc::new(TargetResolver::new(registry, Arc::new(DirectoryCache::new())));
    let sends = Arc::new(sends);
    let polls = Arc::new(RecordingPoll::default());
    let plugin = Arc::new(RecordingPlugin::default());
    let runner = ActionRunner::new(resolver)
        .with_send_dispatcher(sends.clone())
        .with_poll_dispatcher(polls.clone())
        .with_plugin_dispatcher(plugin.clone());
    Harness {
        runner,
        config,
        sends,
        polls,
        plugin,
    }
}

fn harness() -> Harness {
    harness_with(default_config(), RecordingSend::default())
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

impl Harness {
    fn request(&self, action: MessageAction, value: Value) -> ActionRequest {
        ActionRequest::new(Arc::clone(&self.config), action, params(value))
    }

    async fn run(&self, action: MessageAction, value: Value) -> Result<ActionResult, ActionError> {
        self.runner.run(&self.request(action, value)).await
    }
}

// ── Send ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn send_resolves_directory_name_to_canonical_target() {
    let h = harness();
    let result = h
        .run(
            MessageAction::Send,
            json!({ "channel": "discord", "to": "#general", "message": "hi" }),
        )
        .await
        .unwrap();

    assert_eq!(result.to(), Some("channel:555555555"));
    assert_eq!(result.handled_by(), HandledBy::Core);
    assert_eq!(result.payload(), &json!({ "messageId": "discord:channel:555555555" }));
    let sent = h.sends.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.to, "channel:555555555");
    assert_eq!(sent[0].message.text, "hi");
}

#[tokio::test]
async fn generic_target_param_maps_to_destination() {
    let h = harness();
    let result = h
        .run(
            MessageAction::Send,
            json!({ "channel": "slack", "target": "C0123ABCD", "message": "hi" }),
        )
        .await
        .unwrap();
    assert_eq!(result.to(), Some("C0123ABCD"));
}

#[tokio::test]
async fn dry_run_send_skips_dispatch() {
    let h = harness();
    let result = h
        .run(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#random", "message": "hi", "dryRun": "yes" }),
        )
        .await
        .unwrap();

    assert!(result.dry_run());
    assert_eq!(result.handled_by(), HandledBy::DryRun);
    assert_eq!(result.payload()["to"], "channel:C0456EFGH");
    assert_eq!(result.payload()["dryRun"], true);
    assert!(h.sends.sent().is_empty());
}

#[tokio::test]
async fn dry_run_send_still_requires_message() {
    let h = harness();
    let request = h
        .request(MessageAction::Send, json!({ "channel": "slack", "to": "#general" }))
        .with_dry_run(true);
    let err = h.runner.run(&request).await.unwrap_err();
    assert!(matches!(err, ActionError::Validation { ref message } if message == "message required"));
    assert!(h.sends.sent().is_empty());
}

#[tokio::test]
async fn media_makes_message_optional() {
    let h = harness();
    h.run(
        MessageAction::Send,
        json!({ "channel": "slack", "to": "#general", "filePath": "/tmp/chart.png" }),
    )
    .await
    .unwrap();
    let sent = h.sends.sent();
    assert_eq!(sent[0].message.media_url.as_deref(), Some("/tmp/chart.png"));
    assert_eq!(sent[0].message.text, "");
}

#[tokio::test]
async fn reply_directives_are_merged() {
    let h = harness();
    h.run(
        MessageAction::Send,
        json!({
            "channel": "slack",
            "to": "#general",
            "message": "[[reply_to:1700000000.0001]] here you go\nMEDIA: https://example.com/a.png"
        }),
    )
    .await
    .unwrap();
    let sent = h.sends.sent();
    assert_eq!(sent[0].message.text, "here you go");
    assert_eq!(sent[0].message.reply_to.as_deref(), Some("1700000000.0001"));
    assert_eq!(
        sent[0].message.media_url.as_deref(),
        Some("https://example.com/a.png")
    );
}

#[tokio::test]
async fn malformed_buttons_are_rejected() {
    let h = harness();
    let err = h
        .run(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#general", "message": "hi", "buttons": "[{" }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Validation { .. }));
    assert!(err.to_string().contains("buttons"));
}

#[tokio::test]
async fn buttons_json_string_is_decoded() {
    let h = harness();
    h.run(
        MessageAction::Send,
        json!({
            "channel": "slack",
            "to": "#general",
            "message": "pick",
            "buttons": "[[{\"text\":\"Yes\",\"callback_data\":\"y\"}]]"
        }),
    )
    .await
    .unwrap();
    assert_eq!(
        h.sends.sent()[0].message.buttons,
        Some(json!([[{ "text": "Yes", "callback_data": "y" }]]))
    );
}

#[tokio::test]
async fn dispatch_failures_propagate_for_single_sends() {
    let h = harness_with(default_config(), RecordingSend {
        fail_on: vec![("slack", "channel:C0123ABCD")],
        ..Default::default()
    });
    let err = h
        .run(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#general", "message": "hi" }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Dispatch { ref channel, .. } if channel == "slack"));
}

#[tokio::test]
async fn request_deps_override_runner_dispatchers() {
    let h = harness();
    let other = Arc::new(RecordingSend::default());
    let request = h
        .request(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#general", "message": "hi" }),
        )
        .with_deps(ActionDeps {
            send: Some(other.clone()),
            ..Default::default()
        });
    h.runner.run(&request).await.unwrap();
    assert!(h.sends.sent().is_empty());
    assert_eq!(other.sent().len(), 1);
}

// ── Validation and resolution ───────────────────────────────────────────────

#[tokio::test]
async fn missing_target_is_rejected() {
    let h = harness();
    let err = h
        .run(MessageAction::React, json!({ "channel": "slack", "emoji": "👍" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::TargetRequired {
        action: MessageAction::React
    }));
}

#[tokio::test]
async fn ambiguous_channel_selection_is_an_error() {
    let h = harness();
    let err = h
        .run(MessageAction::Send, json!({ "to": "#general", "message": "hi" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::ChannelResolution { .. }));
}

#[tokio::test]
async fn ambiguous_target_lists_candidates() {
    let h = harness();
    let err = h
        .run(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#C0", "message": "hi" }),
        )
        .await
        .unwrap_err();
    let ActionError::AmbiguousTarget { candidates, .. } = &err else {
        panic!("expected ambiguity, got {err}");
    };
    assert_eq!(candidates.len(), 2);
}

#[tokio::test]
async fn unknown_target_is_reported() {
    let h = harness();
    let err = h
        .run(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#engineering", "message": "hi" }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UnknownTarget { .. }));
}

#[tokio::test]
async fn channel_id_resolving_to_user_is_rejected() {
    let h = harness();
    let err = h
        .run(
            MessageAction::ChannelInfo,
            json!({ "channel": "slack", "channelId": "user:U0456EFGH" }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Validation { .. }));
    assert!(h.plugin.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn channel_id_prefix_is_stripped() {
    let h = harness();
    h.run(
        MessageAction::ChannelInfo,
        json!({ "channel": "slack", "target": "#random" }),
    )
    .await
    .unwrap();
    let requests = h.plugin.requests.lock().unwrap();
    assert_eq!(requests[0].1.params["channelId"], "C0456EFGH");
}

// ── Plugin actions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn plugin_action_result_is_extracted() {
    let h = harness();
    let result = h
        .run(
            MessageAction::React,
            json!({ "channel": "slack", "to": "#general", "messageId": "1", "emoji": "✅" }),
        )
        .await
        .unwrap();
    assert!(matches!(result, ActionResult::Action { .. }));
    assert_eq!(result.handled_by(), HandledBy::Plugin);
    assert_eq!(result.payload(), &json!({ "ok": true }));

    let requests = h.plugin.requests.lock().unwrap();
    let (channel, request) = &requests[0];
    assert_eq!(channel, "slack");
    assert_eq!(request.params["to"], "channel:C0123ABCD");
}

#[tokio::test]
async fn unhandled_action_is_unsupported() {
    let h = harness();
    let err = h
        .run(MessageAction::Kick, json!({ "channel": "discord", "userId": "1" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UnsupportedAction {
        action: MessageAction::Kick,
        ..
    }));
}

#[tokio::test]
async fn dry_run_plugin_action_is_synthesized() {
    let h = harness();
    let result = h
        .run(
            MessageAction::Kick,
            json!({ "channel": "discord", "userId": "1", "dryRun": true }),
        )
        .await
        .unwrap();
    assert_eq!(
        result.payload(),
        &json!({ "ok": true, "dryRun": true, "channel": "discord", "action": "kick" })
    );
    assert!(h.plugin.requests.lock().unwrap().is_empty());
}

// ── Polls ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_needs_two_options() {
    let h = harness();
    let err = h
        .run(
            MessageAction::Poll,
            json!({ "channel": "slack", "to": "#general", "pollQuestion": "Lunch?", "pollOption": ["pizza"] }),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("at least two"));
}

#[tokio::test]
async fn multi_select_poll_allows_every_option() {
    let h = harness();
    let result = h
        .run(
            MessageAction::Poll,
            json!({
                "channel": "slack",
                "to": "#general",
                "pollQuestion": "Lunch?",
                "pollOption": "pizza, sushi, tacos",
                "pollMulti": "true",
                "pollDurationHours": 24
            }),
        )
        .await
        .unwrap();
    assert!(matches!(result, ActionResult::Poll { .. }));
    let polls = h.polls.requests.lock().unwrap();
    assert_eq!(polls[0].poll.options, vec!["pizza", "sushi", "tacos"]);
    assert_eq!(polls[0].poll.max_selections, 3);
    assert_eq!(polls[0].poll.duration_hours, Some(24));
}

// ── Cross-context policy ────────────────────────────────────────────────────

#[tokio::test]
async fn cross_provider_send_is_denied() {
    let h = harness();
    let request = h
        .request(
            MessageAction::Send,
            json!({ "channel": "discord", "to": "#general", "message": "hi" }),
        )
        .with_context(ActionContext {
            current_channel_provider: Some("slack".into()),
            current_channel_id: Some("C0123ABCD".into()),
            ..Default::default()
        });
    let err = h.runner.run(&request).await.unwrap_err();
    assert!(matches!(err, ActionError::PolicyDenied { .. }));
    assert!(h.sends.sent().is_empty());
}

#[tokio::test]
async fn cross_context_send_is_marked_with_origin() {
    let h = harness();
    let request = h
        .request(
            MessageAction::Send,
            json!({ "channel": "slack", "to": "#random", "message": "heads up" }),
        )
        .with_context(ActionContext {
            current_channel_provider: Some("slack".into()),
            current_channel_id: Some("channel:C0123ABCD".into()),
            ..Default::default()
        });
    h.runner.run(&request).await.unwrap();
    assert_eq!(h.sends.sent()[0].message.text, "[from general] heads up");
}

// ── Broadcast ───────────────────────────────────────────────────────────────

fn broadcast_config(concurrency: usize) -> Value {
    json!({
        "channels": { "alpha": {}, "beta": {} },
        "tools": { "message": { "broadcast": { "concurrency": concurrency } } }
    })
}

fn outcome_summary(result: &ActionResult) -> Vec<(String, String, bool)> {
    let ActionResult::Broadcast { results, .. } = result else {
        panic!("expected broadcast result");
    };
    results
        .iter()
        .map(|o| (o.channel.clone(), o.to.clone(), o.ok))
        .collect()
}

#[tokio::test]
async fn broadcast_isolates_failures_and_keeps_order() {
    for concurrency in [1, 4] {
        let h = harness_with(broadcast_config(concurrency), RecordingSend {
            fail_on: vec![("alpha", "t2")],
            slow: vec!["t1"],
            ..Default::default()
        });
        let result = h
            .run(
                MessageAction::Broadcast,
                json!({ "targets": ["t1", "t2"], "message": "hello" }),
            )
            .await
            .unwrap();

        assert_eq!(outcome_summary(&result), vec![
            ("alpha".to_string(), "t1".to_string(), true),
            ("alpha".to_string(), "t2".to_string(), false),
            ("beta".to_string(), "t1".to_string(), true),
            ("beta".to_string(), "t2".to_string(), true),
        ]);
        assert_eq!(result.channel(), "alpha");
        assert_eq!(result.handled_by(), HandledBy::Core);
        assert_eq!(h.sends.sent().len(), 4);
    }
}

#[tokio::test]
async fn broadcast_resolution_failures_become_outcomes() {
    let h = harness();
    let result = h
        .run(
            MessageAction::Broadcast,
            json!({ "channel": "slack", "targets": "#general, #nowhere", "message": "hi" }),
        )
        .await
        .unwrap();
    let ActionResult::Broadcast { results, .. } = &result else {
        panic!("expected broadcast result");
    };
    assert_eq!(results.len(), 2);
    assert!(results[0].ok);
    assert_eq!(results[0].to, "channel:C0123ABCD");
    assert!(!results[1].ok);
    assert_eq!(results[1].to, "#nowhere");
    assert!(results[1].error.as_deref().unwrap().contains("unknown target"));
}

#[tokio::test]
async fn broadcast_dry_run_sends_nothing() {
    let h = harness_with(broadcast_config(1), RecordingSend::default());
    let request = h
        .request(
            MessageAction::Broadcast,
            json!({ "targets": ["t1"], "message": "hello" }),
        )
        .with_dry_run(true);
    let result = h.runner.run(&request).await.unwrap();
    assert_eq!(result.handled_by(), HandledBy::DryRun);
    assert!(outcome_summary(&result).iter().all(|(_, _, ok)| *ok));
    assert!(h.sends.sent().is_empty());
}

#[tokio::test]
async fn broadcast_preconditions() {
    let h = harness_with(broadcast_config(1), RecordingSend::default());
    let err = h
        .run(MessageAction::Broadcast, json!({ "targets": [], "message": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::BroadcastPrecondition { .. }));

    let mut disabled = broadcast_config(1);
    disabled["tools"]["message"]["broadcast"]["enabled"] = json!(false);
    let h = harness_with(disabled, RecordingSend::default());
    let err = h
        .run(MessageAction::Broadcast, json!({ "targets": ["t1"], "message": "x" }))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("disabled"));

    let h = harness_with(json!({}), RecordingSend::default());
    let err = h
        .run(MessageAction::Broadcast, json!({ "targets": ["t1"], "message": "x" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::BroadcastPrecondition { .. }));
}
