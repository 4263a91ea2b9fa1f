//! Greet Bot Example
//!
//! Reads lines from stdin, treats each one as an inbound message and prints
//! replies to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package greet-bot -- --prefix '!' --author ada
//! ```
//!
//! Then type:
//!
//! ```text
//! !greet 2 Bob
//! !help
//! !about
//! !count
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use aphid::prelude::*;
use aphid::runtime::ConfigLoader;
use async_trait::async_trait;
use clap::Parser;
use futures::Stream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(about = "A terminal greeting bot")]
struct Args {
    /// Command prefix, overriding the configuration file.
    #[arg(long)]
    prefix: Option<String>,

    /// Bot author, overriding the configuration file.
    #[arg(long)]
    author: Option<String>,

    /// Explicit configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

// ============================================================================
// Channel
// ============================================================================

/// Writes replies to stdout.
struct StdoutChannel;

#[async_trait]
impl Channel for StdoutChannel {
    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        let mut stdout = tokio::io::stdout();
        let line = format!("{text}\n");
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        stdout
            .flush()
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))
    }
}

// ============================================================================
// Services and Modules
// ============================================================================

/// Counts greetings across the whole session.
#[derive(Default)]
struct Counter {
    greetings: AtomicU64,
}

impl Injectable for Counter {
    fn construct(_: Dependencies) -> ContainerResult<Self> {
        Ok(Self::default())
    }
}

struct Greeter {
    counter: Arc<Counter>,
}

aphid::component!(Counter, Greeter);

impl Injectable for Greeter {
    fn dependencies() -> Vec<TypeKey> {
        vec![TypeKey::of::<Counter>()]
    }

    fn construct(mut deps: Dependencies) -> ContainerResult<Self> {
        Ok(Self {
            counter: deps.next()?,
        })
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

async fn greet(
    greeter: Arc<Greeter>,
    _: Arc<AphidContext>,
    message: Arc<Message>,
    args: CommandArgs,
) -> String {
    let times = args.number("times").unwrap_or(1.0).clamp(1.0, 10.0) as usize;
    let name = args
        .string("name")
        .or(message.author())
        .unwrap_or("stranger");
    greeter.counter.greetings.fetch_add(1, Ordering::Relaxed);

    let mut words = vec!["hello"; times].join(" ");
    if !args.rest().is_empty() {
        words = format!("{words} (and {})", args.rest().join(" "));
    }
    format!("{words}, {name}!")
}

async fn help(
    _: Arc<Greeter>,
    ctx: Arc<AphidContext>,
    _: Arc<Message>,
    _: CommandArgs,
) -> String {
    let mut lines = vec!["Commands:".to_string()];
    for (trigger, command) in ctx.commands().triggers() {
        let mut line = format!("  {}{trigger}", ctx.prefix());
        let parameters = ctx
            .commands()
            .parameters(command.module.as_str(), &command.handler_key);
        for parameter in parameters {
            let param = &parameter.info;
            if param.required {
                line.push_str(&format!(" <{}: {}>", param.name, param.kind));
            } else {
                line.push_str(&format!(" [{}: {}]", param.name, param.kind));
            }
        }
        if !command.info.description.is_empty() {
            line.push_str(&format!(" - {}", command.info.description));
        }
        lines.push(line);
    }
    lines.join("\n")
}

async fn about(
    _: Arc<Greeter>,
    ctx: Arc<AphidContext>,
    _: Arc<Message>,
    _: CommandArgs,
) -> String {
    let modules = ctx
        .modules()
        .modules()
        .map(|(_, info)| info.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    match ctx.author() {
        "" => format!("Greet bot running modules: {modules}"),
        author => format!("Greet bot by {author}, running modules: {modules}"),
    }
}

async fn count(
    greeter: Arc<Greeter>,
    _: Arc<AphidContext>,
    message: Arc<Message>,
    _: CommandArgs,
) -> HandlerResult {
    let total = greeter.counter.greetings.load(Ordering::Relaxed);
    message.reply(format!("{total} greeting(s) so far")).await?;
    Ok(())
}

// ============================================================================
// Message Source
// ============================================================================

fn stdin_messages(channel: Arc<StdoutChannel>) -> impl Stream<Item = Message> {
    let lines = BufReader::new(tokio::io::stdin()).lines();
    futures::stream::unfold(lines, move |mut lines| {
        let channel = Arc::clone(&channel);
        async move {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let message = Message::new(line, channel).with_author("terminal");
                    Some((message, lines))
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "Failed to read from stdin");
                    None
                }
            }
        }
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_current_dir();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(prefix) = args.prefix {
        loader = loader.set("bot.prefix", prefix);
    }
    if let Some(author) = args.author {
        loader = loader.set("bot.author", author);
    }
    let config = loader.load()?;

    let runtime = AphidRuntime::from_config(config)
        .service::<Counter>()?
        .module::<Greeter>(ModuleInfo::new("Greeter", "Greets people"))?
        .command::<Greeter, _>(
            "greet",
            CommandInfo::new("greet", ["greet", "hello"]).with_description("Say hello"),
            greet,
        )?
        .parameter::<Greeter>(
            "greet",
            ParameterInfo::new("times", ParameterKind::Number)
                .with_description("How many times to say hello"),
        )?
        .parameter::<Greeter>(
            "greet",
            ParameterInfo::new("name", ParameterKind::String).optional(),
        )?
        .command::<Greeter, _>(
            "help",
            CommandInfo::new("help", ["help"]).with_description("List commands"),
            help,
        )?
        .command::<Greeter, _>(
            "about",
            CommandInfo::new("about", ["about"]).with_description("Show bot details"),
            about,
        )?
        .command::<Greeter, _>(
            "count",
            CommandInfo::new("count", ["count"]).with_description("Show greeting count"),
            count,
        )?
        .build()?;

    info!(prefix = %runtime.config().bot.prefix, "Type a command, or Ctrl+D to quit");
    runtime.run(stdin_messages(Arc::new(StdoutChannel))).await?;

    let stats = runtime.stats();
    info!(
        handled = stats.handled,
        rejected = stats.rejected,
        "Session finished"
    );
    runtime.teardown()?;
    Ok(())
}
