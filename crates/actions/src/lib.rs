//! Message action dispatch.
//!
//! [`ActionRunner::run`] takes one [`ActionRequest`] through parameter
//! decoding, target mapping, channel/account selection, target resolution,
//! the cross-context policy and finally the send, poll or plugin-action
//! dispatcher. Broadcasts fan out over the same single-action path.

pub mod action;
pub mod broadcast;
pub mod directives;
pub mod dispatch;
pub mod error;
pub mod params;
pub mod payload;
pub mod policy;
pub mod request;
pub mod result;
pub mod runner;
pub mod target;

pub use {
    action::MessageAction,
    directives::{DefaultDirectiveParser, ReplyDirectiveParser, ReplyDirectives},
    dispatch::{
        ActionDeps, DispatchOutcome, NoopPluginActionDispatcher, NoopPollDispatcher,
        NoopSendDispatcher, PluginActionDispatcher, PollDispatcher, PollRequest,
        RegistryDispatcher, SendDispatcher, SendMirror, SendRequest,
    },
    error::{ActionError, Result},
    payload::extract_tool_payload,
    policy::{
        AllowAllPolicy, CrossContextPolicy, DecoratedMessage, Decoration,
        DefaultCrossContextPolicy, PolicyCheck,
    },
    request::{ActionContext, ActionRequest, GatewayOptions, ResolvedActionContext},
    result::{ActionResult, BroadcastOutcome, HandledBy},
    runner::ActionRunner,
    target::{ActionTargetMode, apply_target_to_params, requires_target},
};
