#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use regex::Regex;
use tracing_subscriber::prelude::*;

#[macro_use]
extern crate infraprobe;

use infraprobe::app::app_api::{AppAction, AppApiClient};
use infraprobe::app::aws_session::AwsSession;
use infraprobe::app::config::{DeploymentOutputs, ProbeSettings};
use infraprobe::app::data_plane::cloudtrail::{has_tag, CloudTrailClient};
use infraprobe::app::data_plane::cloudwatch_logs::{
    CloudWatchLogsClient, LogEvent, LogExpectation, LogTailPoller, TailOutcome, WaitOutcome,
};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "infraprobe",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT"), ")"),
    about = "Verify a deployed application through its AWS logs and audit trail"
)]
struct Cli {
    /// Settings file (TOML); defaults to the per-user config directory
    #[arg(long, global = true, env = "INFRAPROBE_CONFIG")]
    config: Option<PathBuf>,
    /// Region override
    #[arg(long, global = true)]
    region: Option<String>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List log groups
    Groups {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// List the streams of a log group
    Streams { group: String },
    /// Show the newest events of the most recently active stream
    Tail {
        /// Log group; defaults to the application log group
        group: Option<String>,
        #[arg(long)]
        limit: Option<i32>,
    },
    /// Poll a log group until the expected text shows up or time runs out
    Wait {
        group: Option<String>,
        /// Text to look for (repeat for several)
        #[arg(long = "contains", required = true)]
        needles: Vec<String>,
        /// Match the text against every tailed event, not only the newest
        #[arg(long, conflicts_with = "all")]
        any: bool,
        /// Require every --contains text to appear somewhere in the tail
        #[arg(long)]
        all: bool,
        /// Time budget in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Sleep a fixed time, then tail once
    Settle {
        group: Option<String>,
        /// Seconds to wait before tailing
        #[arg(long)]
        secs: Option<u64>,
    },
    /// Show the audit trail configuration and logging status
    Trail {
        /// Exact trail name or ARN
        #[arg(long, conflicts_with = "pattern")]
        name: Option<String>,
        /// Regex the trail name must match
        #[arg(long)]
        pattern: Option<String>,
        /// Require a tag, as key=value
        #[arg(long)]
        tag: Option<String>,
    },
    /// Call the application API, then wait for the call's access log line
    Action {
        /// Application base URL; defaults to http://<public ip> from the deployment outputs
        #[arg(long)]
        base_url: Option<String>,
        /// Deployment outputs key prefix holding the instance public IP
        #[arg(long, default_value = "AppInstancePublicIp")]
        ip_output: String,
        /// Time budget in seconds for the log line to show up
        #[arg(long)]
        timeout: Option<u64>,
        #[command(subcommand)]
        action: ActionCommand,
    },
    /// Look up a deployment output by key prefix
    Outputs {
        file: PathBuf,
        #[arg(long)]
        stack: Option<String>,
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[derive(Subcommand)]
enum ActionCommand {
    /// Upload an image file
    Upload { file: PathBuf },
    /// List uploaded images
    ListImages,
    /// Delete an image by id
    DeleteImage { id: String },
    /// Subscribe an email address to notifications
    Subscribe { email: String },
    /// Remove a notification subscription
    Unsubscribe { email: String },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "infraprobe=info,aws_config=warn,aws_smithy_runtime=warn,hyper=warn",
        1 => "infraprobe=debug,aws_config=warn,aws_smithy_runtime=warn,hyper=warn",
        _ => "infraprobe=trace,aws_config=debug,aws_smithy_runtime=debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
    );

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    // Bridge log crate records (our log_* macros, reqwest) into tracing
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize log-to-tracing bridge: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the check passed
async fn run(cli: Cli) -> Result<bool> {
    let config_path = cli.config.clone().or_else(ProbeSettings::default_path);
    let mut settings = ProbeSettings::load_or_default(config_path.as_deref())?.with_env_overrides();
    if let Some(region) = cli.region.clone() {
        settings.region = region;
    }
    settings.validate()?;
    tracing::debug!("Using settings: {:?}", settings);

    let session = AwsSession::new(settings.region.clone());
    let logs = CloudWatchLogsClient::new(session.clone());

    match cli.command {
        Commands::Groups { prefix } => {
            let groups = logs.list_log_groups(prefix.as_deref()).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                for group in &groups {
                    println!("{}", group.name);
                }
            }
            Ok(!groups.is_empty())
        }
        Commands::Streams { group } => {
            let names = logs.list_log_stream_names(&group).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
            Ok(true)
        }
        Commands::Tail { group, limit } => {
            let group = group.unwrap_or_else(|| settings.app_log_group.clone());
            let mut options = settings.tail_options();
            if let Some(limit) = limit {
                options = options.with_limit(limit);
            }
            let poller = LogTailPoller::new(logs).with_options(options);
            let outcome = poller.tail(&group).await;
            print_tail(&group, &outcome, cli.json)?;
            Ok(!outcome.is_fault())
        }
        Commands::Settle { group, secs } => {
            let group = group.unwrap_or_else(|| settings.app_log_group.clone());
            let settle = secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| settings.settle_delay());
            let poller = LogTailPoller::new(logs).with_options(settings.tail_options());
            let outcome = poller.settle_then_tail(&group, settle).await;
            print_tail(&group, &outcome, cli.json)?;
            Ok(!outcome.is_fault())
        }
        Commands::Wait {
            group,
            needles,
            any,
            all,
            timeout,
        } => {
            let group = group.unwrap_or_else(|| settings.app_log_group.clone());
            let expectation = build_expectation(any, all, needles)?;
            let mut policy = settings.wait_policy();
            if let Some(timeout) = timeout {
                policy.timeout = Duration::from_secs(timeout);
            }

            let poller = LogTailPoller::new(logs).with_options(settings.tail_options());
            let outcome = poller.wait_for(&group, &expectation, &policy).await;
            print_wait(&group, &expectation, &outcome, cli.json)?;
            Ok(outcome.is_satisfied())
        }
        Commands::Trail { name, pattern, tag } => {
            let trails = CloudTrailClient::new(session);
            let trail = match (name, pattern) {
                (Some(name), _) => trails.get_trail(&name).await?,
                (None, Some(pattern)) => {
                    let regex = Regex::new(&pattern)
                        .with_context(|| format!("Invalid trail pattern {}", pattern))?;
                    trails
                        .find_trail(&regex)
                        .await?
                        .ok_or_else(|| anyhow!("No trail matches {}", pattern))?
                }
                (None, None) => trails.first_trail().await?,
            };
            let status = trails.logging_status(&trail.name).await?;
            let tags = match trail.arn.as_deref() {
                Some(arn) => trails.trail_tags(arn).await?,
                None => Vec::new(),
            };

            if cli.json {
                let report = serde_json::json!({ "trail": trail, "status": status, "tags": tags });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("name:                 {}", trail.name);
                println!("multi-region:         {}", trail.is_multi_region);
                println!("log file validation:  {}", trail.log_file_validation_enabled);
                println!("kms encrypted:        {}", trail.is_kms_encrypted());
                println!("logging:              {}", status.is_logging);
                for tag in &tags {
                    println!("tag:                  {}={}", tag.key, tag.value.as_deref().unwrap_or(""));
                }
            }

            let tag_ok = match tag {
                Some(tag_arg) => {
                    let (key, value) = tag_arg
                        .split_once('=')
                        .ok_or_else(|| anyhow!("--tag expects key=value, got {}", tag_arg))?;
                    has_tag(&tags, key, value)
                }
                None => true,
            };
            Ok(status.is_logging && tag_ok)
        }
        Commands::Action {
            base_url,
            ip_output,
            timeout,
            action,
        } => {
            let api = match base_url {
                Some(base_url) => AppApiClient::new(&base_url)?,
                None => {
                    let path = settings.outputs_path.as_deref().ok_or_else(|| {
                        anyhow!("--base-url not given and no outputs_path configured")
                    })?;
                    let outputs = DeploymentOutputs::from_path(path)?;
                    let public_ip = outputs.require_stack(&settings.stack)?.require(&ip_output)?;
                    AppApiClient::for_public_ip(&public_ip)?
                }
            };

            let poller = LogTailPoller::new(logs).with_options(settings.tail_options());
            let group = settings.app_log_group.clone();
            // Lines already in the log must not satisfy the check
            let baseline = poller.tail(&group).await;
            if let TailOutcome::Fault(fault) = &baseline {
                log_warn!("Baseline tail of {} failed: {}", group, fault);
            }
            let baseline = baseline.latest_timestamp();

            let (app_action, response) = match action {
                ActionCommand::Upload { file } => {
                    (AppAction::UploadImage, api.upload_image(&file).await?)
                }
                ActionCommand::ListImages => (AppAction::ListImages, api.list_images().await?),
                ActionCommand::DeleteImage { id } => {
                    let response = api.delete_image(&id).await?;
                    (AppAction::DeleteImage(id), response)
                }
                ActionCommand::Subscribe { email } => {
                    let response = api.subscribe(&email).await?;
                    (AppAction::Subscribe(email), response)
                }
                ActionCommand::Unsubscribe { email } => {
                    let response = api.unsubscribe(&email).await?;
                    (AppAction::Unsubscribe(email), response)
                }
            };
            eprintln!("{} {} -> {}", app_action.method(), app_action.path(), response.status);
            if !response.is_success() {
                println!("{}", response.body);
                return Ok(false);
            }

            let mut policy = settings.wait_policy();
            if let Some(timeout) = timeout {
                policy.timeout = Duration::from_secs(timeout);
            }
            let expectation = app_action.log_expectation(baseline);
            let outcome = poller.wait_for(&group, &expectation, &policy).await;
            print_wait(&group, &expectation, &outcome, cli.json)?;
            Ok(outcome.is_satisfied())
        }
        Commands::Outputs {
            file,
            stack,
            prefix,
        } => {
            let outputs = DeploymentOutputs::from_path(&file)?;
            let stack = outputs.require_stack(stack.as_deref().unwrap_or(&settings.stack))?;
            match prefix {
                Some(prefix) => println!("{}", stack.require(&prefix)?),
                None => {
                    for key in stack.keys() {
                        println!("{}", key);
                    }
                }
            }
            Ok(true)
        }
    }
}

fn build_expectation(any: bool, all: bool, mut needles: Vec<String>) -> Result<LogExpectation> {
    if needles.is_empty() {
        return Err(anyhow!("at least one --contains value is required"));
    }
    if all {
        return Ok(LogExpectation::AllPresent(needles));
    }
    if needles.len() > 1 {
        log_warn!("Only the first --contains value is used without --all");
    }
    let needle = needles.swap_remove(0);
    Ok(if any {
        LogExpectation::AnyContains(needle)
    } else {
        LogExpectation::LatestContains(needle)
    })
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn print_events(events: &[LogEvent]) {
    for event in events {
        println!("{}  {}", format_timestamp(event.timestamp), event.message.trim_end());
    }
}

fn print_tail(group: &str, outcome: &TailOutcome, json: bool) -> Result<()> {
    if json {
        let report = match outcome {
            TailOutcome::Events(events) => serde_json::json!({ "group": group, "events": events }),
            TailOutcome::Empty(reason) => {
                serde_json::json!({ "group": group, "events": [], "empty": reason.to_string() })
            }
            TailOutcome::Fault(fault) => {
                serde_json::json!({ "group": group, "fault": fault.to_string() })
            }
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match outcome {
        TailOutcome::Events(events) => print_events(events),
        TailOutcome::Empty(reason) => eprintln!("{}: {}", group, reason),
        TailOutcome::Fault(fault) => eprintln!("{}: {}", group, fault),
    }
    Ok(())
}

fn print_wait(
    group: &str,
    expectation: &LogExpectation,
    outcome: &WaitOutcome,
    json: bool,
) -> Result<()> {
    if json {
        let report = match outcome {
            WaitOutcome::Satisfied {
                events,
                attempts,
                elapsed,
            } => serde_json::json!({
                "group": group,
                "satisfied": true,
                "attempts": attempts,
                "elapsed_ms": elapsed.as_millis() as u64,
                "events": events,
            }),
            WaitOutcome::TimedOut {
                last,
                attempts,
                elapsed,
            } => serde_json::json!({
                "group": group,
                "satisfied": false,
                "attempts": attempts,
                "elapsed_ms": elapsed.as_millis() as u64,
                "missing": expectation.missing(last.events()),
                "events": last.events(),
            }),
            WaitOutcome::Aborted { fault, attempts } => serde_json::json!({
                "group": group,
                "satisfied": false,
                "attempts": attempts,
                "fault": fault.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match outcome {
        WaitOutcome::Satisfied {
            events,
            attempts,
            elapsed,
        } => {
            print_events(events);
            eprintln!("{} after {} attempt(s) in {:?}", expectation, attempts, elapsed);
        }
        WaitOutcome::TimedOut {
            last,
            attempts,
            elapsed,
        } => {
            print_events(last.events());
            eprintln!(
                "timed out after {} attempt(s) in {:?}; missing {:?}",
                attempts,
                elapsed,
                expectation.missing(last.events())
            );
        }
        WaitOutcome::Aborted { fault, attempts } => {
            eprintln!("aborted after {} attempt(s): {}", attempts, fault);
        }
    }
    Ok(())
}
