//! Fan a send out across channels and targets.

use {
    courier_channels::normalize_channel_id,
    futures::{StreamExt, stream},
    serde_json::{Map, Value, json},
    tracing::{info, warn},
};

use crate::{
    action::MessageAction,
    error::{ActionError, Result},
    params::{read_bool, read_string, read_string_array},
    request::ActionRequest,
    result::{ActionResult, BroadcastOutcome, HandledBy},
    runner::ActionRunner,
};

impl ActionRunner {
    /// Send to every (channel, target) pair.
    ///
    /// Each pair is resolved and sent through the single-action path. Failures
    /// become `ok: false` outcomes and never stop other pairs. Outcomes keep
    /// channel-major enumeration order regardless of completion order.
    pub(crate) async fn run_broadcast(
        &self,
        request: &ActionRequest,
        params: Map<String, Value>,
    ) -> Result<ActionResult> {
        let settings = &request.config.tools.message.broadcast;
        if !settings.enabled {
            return Err(ActionError::broadcast_precondition(
                "broadcast is disabled (tools.message.broadcast.enabled = false)",
            ));
        }
        let targets = read_string_array(&params, "targets");
        if targets.is_empty() {
            return Err(ActionError::broadcast_precondition(
                "broadcast requires at least one target in `targets`",
            ));
        }
        let configured = self.selector.configured_channels(&request.config);
        if configured.is_empty() {
            return Err(ActionError::broadcast_precondition(
                "broadcast requires at least one configured channel",
            ));
        }

        let channels = match read_string(&params, "channel").map(|c| normalize_channel_id(&c)) {
            Some(hint) if hint != "all" => vec![hint],
            _ => configured,
        };
        let dry_run = request
            .dry_run
            .or_else(|| read_bool(&params, "dryRun"))
            .unwrap_or(false);

        let mut base = params;
        for key in ["targets", "target", "to", "channel"] {
            base.remove(key);
        }

        let pairs: Vec<(String, String)> = channels
            .iter()
            .flat_map(|channel| {
                targets
                    .iter()
                    .map(move |target| (channel.clone(), target.clone()))
            })
            .collect();
        let concurrency = settings.concurrency.max(1);
        info!(
            channels = channels.len(),
            targets = targets.len(),
            concurrency,
            dry_run,
            "broadcasting message"
        );

        let base = &base;
        let results: Vec<BroadcastOutcome> = stream::iter(pairs)
            .map(|(channel, target)| self.broadcast_one(request, base, channel, target))
            .buffered(concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.ok).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "broadcast finished with failures");
        }

        Ok(ActionResult::Broadcast {
            channel: channels.first().cloned().unwrap_or_default(),
            action: MessageAction::Broadcast,
            handled_by: if dry_run {
                HandledBy::DryRun
            } else {
                HandledBy::Core
            },
            payload: json!({ "results": results }),
            results,
            dry_run,
        })
    }

    async fn broadcast_one(
        &self,
        request: &ActionRequest,
        base: &Map<String, Value>,
        channel: String,
        target: String,
    ) -> BroadcastOutcome {
        let account_id =
            read_string(base, "accountId").or_else(|| request.default_account_id.clone());
        let resolved = match self
            .resolver
            .resolve(&request.config, &channel, &target, account_id.as_deref(), None)
            .await
        {
            Ok(resolved) => resolved,
            Err(err) => {
                let err = ActionError::from_resolve(err, MessageAction::Send);
                warn!(channel = %channel, target = %target, error = %err, "broadcast target failed");
                return BroadcastOutcome::failure(channel, target, err);
            },
        };

        let mut params = base.clone();
        params.insert("channel".into(), Value::String(channel.clone()));
        params.insert("to".into(), Value::String(resolved.to.clone()));
        match self.run_single(request, MessageAction::Send, params).await {
            Ok(result) => BroadcastOutcome::success(channel, resolved.to, result),
            Err(err) => {
                warn!(channel = %channel, to = %resolved.to, error = %err, "broadcast send failed");
                BroadcastOutcome::failure(channel, resolved.to, err)
            },
        }
    }
}
