//! `courier action`, `resolve`, `directory` and `actions`.

use std::sync::Arc;

use {
    anyhow::{Context, Result, anyhow, bail},
    clap::{Args, ValueEnum},
    courier_actions::{ActionContext, ActionRequest, ActionRunner, MessageAction},
    courier_channels::{ChannelRegistry, DirectoryQuery, normalize_channel_id},
    courier_config::CourierConfig,
    courier_routing::{DirectoryCache, TargetKind, TargetResolver},
    serde_json::{Map, Value},
};

#[derive(Args)]
pub struct ActionArgs {
    /// Action name, e.g. `send`, `poll`, `react`, `broadcast`.
    action: String,
    /// Channel to act on (`discord`, `slack`, ...; `all` for broadcasts).
    #[arg(long)]
    channel: Option<String>,
    /// Destination: id, `#name`, `@handle`, or a directory name.
    #[arg(long)]
    to: Option<String>,
    /// Message text.
    #[arg(short, long)]
    message: Option<String>,
    /// Account used when the request names none.
    #[arg(long)]
    account: Option<String>,
    /// Extra parameter; the value is parsed as JSON when it can be.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
    /// Parameters as one JSON object, applied before `--param`.
    #[arg(long, value_name = "JSON")]
    params_json: Option<String>,
    /// Validate and resolve everything without sending.
    #[arg(long)]
    dry_run: bool,
    /// Provider of the conversation the request originates from.
    #[arg(long)]
    context_provider: Option<String>,
    /// Conversation the request originates from.
    #[arg(long)]
    context_channel: Option<String>,
    /// Message being handled, for `[[reply_to_current]]`.
    #[arg(long)]
    context_message: Option<String>,
}

#[derive(Args)]
pub struct ResolveArgs {
    channel: String,
    /// Target as a user would type it.
    input: String,
    #[arg(long)]
    account: Option<String>,
    /// Kind to resolve as; detected from the input when omitted.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,
}

#[derive(Args)]
pub struct DirectoryArgs {
    channel: String,
    #[arg(long, value_enum, default_value_t = ListKind::Group)]
    kind: ListKind,
    /// Case-insensitive substring filter on id, name and handle.
    #[arg(short, long)]
    query: Option<String>,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    account: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    User,
    Group,
    Channel,
}

impl From<KindArg> for TargetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::User => Self::User,
            KindArg::Group => Self::Group,
            KindArg::Channel => Self::Channel,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ListKind {
    User,
    Group,
}

fn resolver(config: &CourierConfig) -> Arc<TargetResolver> {
    let registry = Arc::new(ChannelRegistry::from_config(config));
    Arc::new(TargetResolver::new(registry, Arc::new(DirectoryCache::new())))
}

/// Merge `--params-json`, `--param` and the shortcut flags, in that order.
fn collect_params(args: &ActionArgs) -> Result<Map<String, Value>> {
    let mut params = match args.params_json.as_deref() {
        Some(raw) => match serde_json::from_str(raw).context("--params-json must be valid JSON")? {
            Value::Object(map) => map,
            _ => bail!("--params-json must be a JSON object"),
        },
        None => Map::new(),
    };

    for pair in &args.params {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--param expects KEY=VALUE, got {pair:?}"))?;
        let value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        params.insert(key.trim().to_string(), value);
    }

    let shortcuts = [
        ("channel", &args.channel),
        ("to", &args.to),
        ("message", &args.message),
    ];
    for (key, value) in shortcuts {
        if let Some(value) = value {
            params.insert(key.into(), Value::String(value.clone()));
        }
    }
    Ok(params)
}

pub async fn handle_action(config: Arc<CourierConfig>, args: ActionArgs) -> Result<()> {
    let action: MessageAction = args.action.parse()?;
    let params = collect_params(&args)?;

    let mut request = ActionRequest::new(Arc::clone(&config), action, params);
    if let Some(account) = &args.account {
        request = request.with_default_account(account);
    }
    if args.dry_run {
        request = request.with_dry_run(true);
    }
    if args.context_provider.is_some() || args.context_channel.is_some() {
        request = request.with_context(ActionContext {
            current_channel_provider: args.context_provider.as_deref().map(normalize_channel_id),
            current_channel_id: args.context_channel.clone(),
            current_message_id: args.context_message.clone(),
            ..Default::default()
        });
    }

    let runner = ActionRunner::new(resolver(&config));
    let result = runner.run(&request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub async fn handle_resolve(config: Arc<CourierConfig>, args: ResolveArgs) -> Result<()> {
    let channel = normalize_channel_id(&args.channel);
    let resolved = resolver(&config)
        .resolve(
            &config,
            &channel,
            &args.input,
            args.account.as_deref(),
            args.kind.map(TargetKind::from),
        )
        .await?;
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

pub async fn handle_directory(config: Arc<CourierConfig>, args: DirectoryArgs) -> Result<()> {
    let channel = normalize_channel_id(&args.channel);
    let registry = ChannelRegistry::from_config(&config);
    let directory = registry
        .directory(&channel)
        .ok_or_else(|| anyhow!("channel {channel} has no directory"))?;
    let query = DirectoryQuery {
        query: args.query,
        limit: args.limit,
    };
    let entries = match args.kind {
        ListKind::User => directory.list_peers(args.account.as_deref(), &query).await?,
        ListKind::Group => directory.list_groups(args.account.as_deref(), &query).await?,
    };

    if entries.is_empty() {
        eprintln!("No entries.");
        return Ok(());
    }
    for entry in &entries {
        let label = entry
            .name
            .as_deref()
            .or(entry.handle.as_deref())
            .unwrap_or("");
        println!("{:<6} {:<24} {label}", entry.kind.as_str(), entry.id);
    }
    Ok(())
}

pub fn list_actions() {
    for action in MessageAction::ALL {
        let target = action.target_mode().param_key().unwrap_or("-");
        println!("{:<16} {target}", action.as_str());
    }
}
