use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use payload_engine::{DiscoverOptions, Format, NormalizationAdapter, Node, Payload, QueryEncoding, QueryOptions};
use payload_util::{PayloadConfig, StandardAdapter, fetch_payload, format_from_extension};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "payload", version, about = "Read, write and flatten structured documents by path")]
struct Cli {
    /// Input format; inferred from the file extension when omitted.
    #[arg(long, short = 'f', global = true)]
    format: Option<Format>,

    /// Input file, or `-` for stdin.
    #[arg(long, short = 'i', global = true, default_value = "-")]
    input: String,

    /// Configuration file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every `path = value` pair.
    Discover {
        /// Discover below this path only.
        #[arg(long)]
        path: Option<String>,
        /// Immediate children only.
        #[arg(long)]
        shallow: bool,
    },
    /// Print the value at a path.
    Get {
        path: String,
        /// JSON value printed when the path is not readable.
        #[arg(long)]
        default: Option<String>,
    },
    /// Write a value (JSON, or a bare string) and print the document.
    Set {
        path: String,
        value: String,
        #[arg(long)]
        to: Option<Format>,
    },
    /// Print the document rooted at a path.
    Slice {
        path: String,
        #[arg(long)]
        to: Option<Format>,
    },
    /// Print whether the document is empty.
    Empty {
        #[arg(long)]
        strict: bool,
    },
    /// Re-encode the document.
    Convert {
        #[arg(long)]
        to: Format,
    },
    /// Print the document as a URL query string.
    Query {
        #[arg(long)]
        numeric_prefix: Option<String>,
        #[arg(long)]
        separator: Option<String>,
        /// Encode spaces as %20 instead of +.
        #[arg(long)]
        rfc3986: bool,
    },
    /// GET a URL and print the response document.
    Fetch {
        url: String,
        #[arg(long)]
        to: Option<Format>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PayloadConfig::load_from(path)?,
        None => PayloadConfig::load()?,
    };
    let adapter: Arc<dyn NormalizationAdapter> = Arc::new(StandardAdapter::new());

    match cli.command {
        Command::Fetch { url, to } => {
            let client = reqwest::Client::new();
            let payload = fetch_payload(&client, &url, cli.format, &config.codec, adapter)
                .await
                .with_context(|| format!("failed to fetch {url}"))?;
            let output = to.unwrap_or(config.default_format);
            println!("{}", payload.encode(output.as_str(), &config.codec)?);
            Ok(())
        }
        command => {
            let (payload, format) = load_input(&cli.input, cli.format, &config, adapter)?;
            run_command(command, payload, format, &config)
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_input(
    input: &str,
    explicit: Option<Format>,
    config: &PayloadConfig,
    adapter: Arc<dyn NormalizationAdapter>,
) -> Result<(Payload, Format)> {
    let data = if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?
    };

    let format = explicit
        .or_else(|| format_from_extension(Path::new(input)))
        .unwrap_or(config.default_format);
    debug!(%format, input, "parsing input");

    let payload = Payload::parse(&data, format.as_str(), &config.codec, adapter)
        .with_context(|| format!("failed to parse {input} as {format}"))?;
    Ok((payload, format))
}

fn run_command(command: Command, mut payload: Payload, format: Format, config: &PayloadConfig) -> Result<()> {
    match command {
        Command::Discover { path, shallow } => {
            let options = DiscoverOptions {
                path,
                recursive: !shallow,
            };
            for (path, value) in payload.discover(&options) {
                println!("{path} = {}", render(&value)?);
            }
        }
        Command::Get { path, default } => {
            let default = default.as_deref().map(parse_value).unwrap_or(Node::Null);
            println!("{}", render(&payload.get(&path, default))?);
        }
        Command::Set { path, value, to } => {
            payload.set(&path, parse_value(&value))?;
            let output = to.unwrap_or(format);
            println!("{}", payload.encode(output.as_str(), &config.codec)?);
        }
        Command::Slice { path, to } => {
            let slice = payload.slice(&path)?;
            let output = to.unwrap_or(format);
            println!("{}", slice.encode(output.as_str(), &config.codec)?);
        }
        Command::Empty { strict } => println!("{}", payload.is_empty(strict)),
        Command::Convert { to } => println!("{}", payload.encode(to.as_str(), &config.codec)?),
        Command::Query {
            numeric_prefix,
            separator,
            rfc3986,
        } => {
            let mut options: QueryOptions = config.query.clone();
            if numeric_prefix.is_some() {
                options.numeric_prefix = numeric_prefix;
            }
            if separator.is_some() {
                options.separator = separator;
            }
            if rfc3986 {
                options.encoding = QueryEncoding::Rfc3986;
            }
            println!("{}", payload.build_http_query(&options)?);
        }
        Command::Fetch { .. } => anyhow::bail!("fetch does not read local input"),
    }
    Ok(())
}

/// Command-line values are JSON when they parse as JSON and strings otherwise.
fn parse_value(text: &str) -> Node {
    serde_json::from_str(text).unwrap_or_else(|_| Node::String(text.to_string()))
}

fn render(value: &Node) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
