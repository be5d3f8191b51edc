//! Single entry point for message actions.

use std::sync::Arc;

use {
    courier_channels::{
        ChannelActionRequest, ChannelSelector, ChannelType, ConfigChannelSelector, OutboundMessage,
        OutboundPoll,
    },
    courier_routing::{TargetKind, TargetResolver},
    serde_json::{Map, Value, json},
    tracing::{debug, info, warn},
};

use crate::{
    action::MessageAction,
    directives::{DefaultDirectiveParser, ReplyDirectiveParser},
    dispatch::{
        PluginActionDispatcher, PollDispatcher, PollRequest, RegistryDispatcher, SendDispatcher,
        SendMirror, SendRequest,
    },
    error::{ActionError, Result},
    params::{parse_json_param, read_bool, read_string, read_string_array, read_u32},
    payload::extract_tool_payload,
    policy::{CrossContextPolicy, Decoration, DefaultCrossContextPolicy, PolicyCheck},
    request::{ActionRequest, ResolvedActionContext},
    result::{ActionResult, HandledBy},
    target::{ActionTargetMode, apply_target_to_params},
};

/// Validates, resolves and dispatches message actions.
pub struct ActionRunner {
    pub(crate) resolver: Arc<TargetResolver>,
    pub(crate) selector: Arc<dyn ChannelSelector>,
    send: Arc<dyn SendDispatcher>,
    poll: Arc<dyn PollDispatcher>,
    plugin: Arc<dyn PluginActionDispatcher>,
    policy: Arc<dyn CrossContextPolicy>,
    directives: Arc<dyn ReplyDirectiveParser>,
}

impl ActionRunner {
    /// Runner dispatching through the resolver's channel registry with the
    /// config-driven selector and policy.
    pub fn new(resolver: Arc<TargetResolver>) -> Self {
        let dispatcher = Arc::new(RegistryDispatcher::new(Arc::clone(resolver.registry())));
        Self {
            resolver,
            selector: Arc::new(ConfigChannelSelector),
            send: dispatcher.clone(),
            poll: dispatcher.clone(),
            plugin: dispatcher,
            policy: Arc::new(DefaultCrossContextPolicy),
            directives: Arc::new(DefaultDirectiveParser),
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn ChannelSelector>) -> Self {
        self.selector = selector;
        self
    }

    #[must_use]
    pub fn with_send_dispatcher(mut self, send: Arc<dyn SendDispatcher>) -> Self {
        self.send = send;
        self
    }

    #[must_use]
    pub fn with_poll_dispatcher(mut self, poll: Arc<dyn PollDispatcher>) -> Self {
        self.poll = poll;
        self
    }

    #[must_use]
    pub fn with_plugin_dispatcher(mut self, plugin: Arc<dyn PluginActionDispatcher>) -> Self {
        self.plugin = plugin;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn CrossContextPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_directive_parser(mut self, directives: Arc<dyn ReplyDirectiveParser>) -> Self {
        self.directives = directives;
        self
    }

    pub fn resolver(&self) -> &Arc<TargetResolver> {
        &self.resolver
    }

    /// Run one action end to end.
    ///
    /// Dry runs go through every validation, resolution and policy step and
    /// only skip the final dispatch.
    pub async fn run(&self, request: &ActionRequest) -> Result<ActionResult> {
        let mut params = request.params.clone();
        parse_json_param(&mut params, "buttons")?;
        parse_json_param(&mut params, "card")?;

        if request.action == MessageAction::Broadcast {
            return self.run_broadcast(request, params).await;
        }
        self.run_single(request, request.action, params).await
    }

    /// Everything after parameter decoding, for one non-broadcast action.
    pub(crate) async fn run_single(
        &self,
        request: &ActionRequest,
        action: MessageAction,
        mut params: Map<String, Value>,
    ) -> Result<ActionResult> {
        apply_target_to_params(action, &mut params)?;
        if action.target_mode() != ActionTargetMode::None
            && read_string(&params, "to").is_none()
            && read_string(&params, "channelId").is_none()
        {
            return Err(ActionError::TargetRequired { action });
        }

        let hint = read_string(&params, "channel");
        let channel = self
            .selector
            .resolve_channel(&request.config, hint.as_deref())
            .map_err(|source| ActionError::ChannelResolution { source })?;
        let account_id =
            read_string(&params, "accountId").or_else(|| request.default_account_id.clone());
        let dry_run = request
            .dry_run
            .or_else(|| read_bool(&params, "dryRun"))
            .unwrap_or(false);

        self.resolve_targets(request, action, &channel, account_id.as_deref(), &mut params)
            .await?;

        self.policy.enforce(&PolicyCheck {
            config: &request.config,
            channel: &channel,
            action,
            params: &params,
            context: request.context.as_ref(),
        })?;

        debug!(
            channel = %channel,
            action = %action,
            account_id = account_id.as_deref().unwrap_or("default"),
            dry_run,
            "dispatching message action"
        );
        let ctx = ResolvedActionContext {
            config: &request.config,
            action,
            params,
            channel,
            account_id,
            dry_run,
            gateway: request.gateway.as_ref(),
            request,
        };
        match action {
            MessageAction::Send => self.handle_send(ctx).await,
            MessageAction::Poll => self.handle_poll(ctx).await,
            _ => self.handle_plugin_action(ctx).await,
        }
    }

    /// Replace `to`/`channelId` with canonical destinations.
    async fn resolve_targets(
        &self,
        request: &ActionRequest,
        action: MessageAction,
        channel: &str,
        account_id: Option<&str>,
        params: &mut Map<String, Value>,
    ) -> Result<()> {
        if let Some(to) = read_string(params, "to") {
            let resolved = self
                .resolver
                .resolve(&request.config, channel, &to, account_id, None)
                .await
                .map_err(|err| ActionError::from_resolve(err, action))?;
            params.insert("to".into(), Value::String(resolved.to));
        }

        if let Some(channel_id) = read_string(params, "channelId") {
            let resolved = self
                .resolver
                .resolve(&request.config, channel, &channel_id, account_id, None)
                .await
                .map_err(|err| ActionError::from_resolve(err, action))?;
            if resolved.kind == TargetKind::User {
                return Err(ActionError::validation(format!(
                    "channelId \"{channel_id}\" resolved to a user; use `to` for direct messages"
                )));
            }
            let id = ["channel:", "group:"]
                .iter()
                .find_map(|prefix| {
                    resolved
                        .to
                        .get(..prefix.len())
                        .filter(|head| head.eq_ignore_ascii_case(prefix))
                        .map(|_| resolved.to[prefix.len()..].to_string())
                })
                .unwrap_or_else(|| resolved.to.clone());
            params.insert("channelId".into(), Value::String(id));
        }
        Ok(())
    }

    /// Origin marker for a cross-context send, labelled from the directory.
    async fn decoration(&self, ctx: &ResolvedActionContext<'_>) -> Option<Decoration> {
        let check = PolicyCheck {
            config: ctx.config,
            channel: &ctx.channel,
            action: ctx.action,
            params: &ctx.params,
            context: ctx.request.context.as_ref(),
        };
        let base = self.policy.build_decoration(&check, None)?;

        let context = check.context?;
        let (Some(provider), Some(origin_id)) = (
            context.current_channel_provider.as_deref(),
            context.current_channel_id.as_deref(),
        ) else {
            return Some(base);
        };
        let label = match self
            .resolver
            .lookup_display(ctx.config, provider, origin_id, ctx.account_id.as_deref())
            .await
        {
            Ok(label) => label,
            Err(err) => {
                debug!(error = %err, provider, "origin label lookup failed");
                None
            },
        };
        match label {
            Some(label) => self
                .policy
                .build_decoration(&check, Some(label.as_str()))
                .or(Some(base)),
            None => Some(base),
        }
    }

    async fn handle_send(&self, ctx: ResolvedActionContext<'_>) -> Result<ActionResult> {
        let params = &ctx.params;
        let to = read_string(params, "to").ok_or(ActionError::TargetRequired {
            action: MessageAction::Send,
        })?;
        let media_hint = read_string(params, "media")
            .or_else(|| read_string(params, "path"))
            .or_else(|| read_string(params, "filePath"));
        let has_card = params.get("card").is_some_and(Value::is_object);
        let message = match params.get("message") {
            Some(Value::String(text)) => text.clone(),
            None | Some(Value::Null) if media_hint.is_some() || has_card => String::new(),
            None | Some(Value::Null) => return Err(ActionError::validation("message required")),
            Some(other) => other.to_string(),
        };

        let current_message_id = ctx
            .request
            .context
            .as_ref()
            .and_then(|c| c.current_message_id.as_deref());
        let directives = self.directives.parse(&message, current_message_id);
        let reply_to = read_string(params, "replyTo").or(directives.reply_to_id);
        let media_url = media_hint.or_else(|| directives.media_urls.first().cloned());

        let mut text = directives.text;
        let mut embeds = params.get("embeds").and_then(Value::as_array).cloned();
        if let Some(decoration) = self.decoration(&ctx).await {
            let prefer_embeds = ctx
                .channel
                .parse::<ChannelType>()
                .is_ok_and(ChannelType::prefers_embeds);
            let decorated = self.policy.apply_decoration(&text, &decoration, prefer_embeds);
            text = decorated.message;
            if let Some(extra) = decorated.embeds {
                embeds.get_or_insert_with(Vec::new).extend(extra);
            }
        }

        let message = OutboundMessage {
            account_id: ctx.account_id.clone(),
            to: to.clone(),
            text,
            media_url,
            reply_to,
            thread_id: read_string(params, "threadId"),
            silent: read_bool(params, "silent").unwrap_or(false),
            gif_playback: read_bool(params, "gifPlayback").unwrap_or(false),
            audio_as_voice: directives.audio_as_voice
                || read_bool(params, "asVoice").unwrap_or(false),
            best_effort: read_bool(params, "bestEffort").unwrap_or(false),
            embeds,
            buttons: params.get("buttons").cloned(),
            card: params.get("card").cloned(),
        };

        if ctx.dry_run {
            info!(channel = %ctx.channel, to = %to, "dry run: send skipped");
            return Ok(ActionResult::Send {
                payload: json!({
                    "ok": true,
                    "dryRun": true,
                    "channel": ctx.channel,
                    "to": to,
                    "message": message,
                }),
                channel: ctx.channel,
                action: MessageAction::Send,
                to,
                handled_by: HandledBy::DryRun,
                tool_result: None,
                dry_run: true,
            });
        }

        let mirror = ctx.request.session_key.clone().map(|session_key| SendMirror {
            session_key,
            agent_id: ctx.request.agent_id.clone(),
        });
        let send = ctx
            .request
            .deps
            .as_ref()
            .and_then(|deps| deps.send.clone())
            .unwrap_or_else(|| Arc::clone(&self.send));
        let outcome = send
            .send(&SendRequest {
                channel: ctx.channel.clone(),
                message,
                gateway: ctx.gateway.cloned(),
                mirror,
            })
            .await
            .map_err(|source| ActionError::dispatch(&ctx.channel, source))?;
        info!(channel = %ctx.channel, to = %to, handled_by = ?outcome.handled_by, "message sent");

        Ok(ActionResult::Send {
            channel: ctx.channel,
            action: MessageAction::Send,
            to,
            handled_by: outcome.handled_by,
            payload: outcome.payload,
            tool_result: outcome.tool_result,
            dry_run: false,
        })
    }

    async fn handle_poll(&self, ctx: ResolvedActionContext<'_>) -> Result<ActionResult> {
        let params = &ctx.params;
        let to = read_string(params, "to").ok_or(ActionError::TargetRequired {
            action: MessageAction::Poll,
        })?;
        let question = read_string(params, "pollQuestion")
            .ok_or_else(|| ActionError::validation("pollQuestion required"))?;
        let options = read_string_array(params, "pollOption");
        if options.len() < 2 {
            return Err(ActionError::validation(
                "pollOption requires at least two values",
            ));
        }
        let max_selections = if read_bool(params, "pollMulti").unwrap_or(false) {
            options.len()
        } else {
            1
        };
        let duration_hours = read_u32(params, "pollDurationHours")?;

        let message = match params.get("message").and_then(Value::as_str) {
            Some(text) => match self.decoration(&ctx).await {
                Some(decoration) => Some(self.policy.apply_decoration(text, &decoration, false).message),
                None => Some(text.to_string()),
            },
            None => None,
        };

        let poll = OutboundPoll {
            account_id: ctx.account_id.clone(),
            to: to.clone(),
            question,
            options,
            max_selections,
            duration_hours,
            message,
            thread_id: read_string(params, "threadId"),
        };

        if ctx.dry_run {
            info!(channel = %ctx.channel, to = %to, "dry run: poll skipped");
            return Ok(ActionResult::Poll {
                payload: json!({
                    "ok": true,
                    "dryRun": true,
                    "channel": ctx.channel,
                    "to": to,
                    "poll": poll,
                }),
                channel: ctx.channel,
                action: MessageAction::Poll,
                to,
                handled_by: HandledBy::DryRun,
                tool_result: None,
                dry_run: true,
            });
        }

        let dispatcher = ctx
            .request
            .deps
            .as_ref()
            .and_then(|deps| deps.poll.clone())
            .unwrap_or_else(|| Arc::clone(&self.poll));
        let outcome = dispatcher
            .poll(&PollRequest {
                channel: ctx.channel.clone(),
                poll,
                gateway: ctx.gateway.cloned(),
            })
            .await
            .map_err(|source| ActionError::dispatch(&ctx.channel, source))?;

        Ok(ActionResult::Poll {
            channel: ctx.channel,
            action: MessageAction::Poll,
            to,
            handled_by: outcome.handled_by,
            payload: outcome.payload,
            tool_result: outcome.tool_result,
            dry_run: false,
        })
    }

    async fn handle_plugin_action(&self, ctx: ResolvedActionContext<'_>) -> Result<ActionResult> {
        let action = ctx.action;
        if ctx.dry_run {
            return Ok(ActionResult::Action {
                payload: json!({
                    "ok": true,
                    "dryRun": true,
                    "channel": ctx.channel,
                    "action": action,
                }),
                channel: ctx.channel,
                action,
                handled_by: HandledBy::DryRun,
                tool_result: None,
                dry_run: true,
            });
        }

        let dispatcher = ctx
            .request
            .deps
            .as_ref()
            .and_then(|deps| deps.plugin.clone())
            .unwrap_or_else(|| Arc::clone(&self.plugin));
        let request = ChannelActionRequest {
            action: action.as_str().to_string(),
            account_id: ctx.account_id.clone(),
            params: ctx.params,
            dry_run: false,
        };
        let handled = dispatcher
            .dispatch(&ctx.channel, &request)
            .await
            .map_err(|source| ActionError::dispatch(&ctx.channel, source))?;
        let Some(tool_result) = handled else {
            warn!(channel = %ctx.channel, action = %action, "no plugin handles action");
            return Err(ActionError::UnsupportedAction {
                action,
                channel: ctx.channel,
            });
        };

        Ok(ActionResult::Action {
            payload: extract_tool_payload(&tool_result),
            channel: ctx.channel,
            action,
            handled_by: HandledBy::Plugin,
            tool_result: Some(tool_result),
            dry_run: false,
        })
    }
}
