//! Capture command implementation
//!
//! Pulls profiles from a Go process's `/debug/pprof` endpoints and uploads
//! each one to the collector, once or on an interval.

use super::ServerArg;
use crate::client::{ApiClient, HttpClient};
use crate::output;
use crate::retry::retry_with_backoff;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use perfkit_shared::utils::{format_size, parse_duration};
use perfkit_shared::utils::time::default_profile_name;
use perfkit_shared::ProfileKind;
use std::path::Path;
use std::time::Duration;

const UPLOAD_ATTEMPTS: u32 = 3;
const UPLOAD_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Args, Debug)]
pub struct CaptureArgs {
    /// Target base URL (e.g. http://localhost:6060)
    pub target: String,

    /// Comma-separated profiles to capture (cpu,heap,goroutine,block,mutex,allocs,threadcreate)
    #[arg(short, long, default_value = "all")]
    pub profiles: String,

    /// Capture interval for periodic mode (e.g. "30s", "1m")
    #[arg(short, long)]
    pub interval: Option<String>,

    /// Number of captures in interval mode (0 = until interrupted)
    #[arg(short = 'n', long, default_value = "0")]
    pub count: u32,

    /// CPU profile duration
    #[arg(long, default_value = "30s")]
    pub cpu_duration: String,

    /// Session name for grouping profiles
    #[arg(short, long)]
    pub session: Option<String>,

    /// Project name
    #[arg(long)]
    pub project: Option<String>,

    #[command(flatten)]
    pub server: ServerArg,
}

/// Parse the `--profiles` list; "all" selects every capturable kind.
fn parse_kinds(list: &str) -> Result<Vec<ProfileKind>> {
    if list.trim() == "all" {
        return Ok(ProfileKind::CAPTURABLE.to_vec());
    }

    let mut kinds = Vec::new();
    for part in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let kind: ProfileKind = part.parse()?;
        if kind.pprof_endpoint().is_none() {
            bail!("{} profiles cannot be captured from a pprof endpoint", kind);
        }
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        bail!("no profile types selected");
    }
    Ok(kinds)
}

/// Label printed next to a successful capture.
fn capture_label(kind: ProfileKind, cpu_seconds: u64) -> String {
    if kind.is_cumulative() {
        "cumulative".to_string()
    } else if kind == ProfileKind::Cpu {
        format!("{}s sample", cpu_seconds)
    } else {
        "snapshot".to_string()
    }
}

struct Capturer {
    target: String,
    http: HttpClient,
    api: ApiClient,
    cpu_seconds: u64,
    session: Option<String>,
    project: Option<String>,
}

impl Capturer {
    fn target_url(&self, kind: ProfileKind) -> Result<String> {
        let Some(endpoint) = kind.pprof_endpoint() else {
            bail!("unknown profile type: {}", kind);
        };
        let mut url = format!("{}{}", self.target.trim_end_matches('/'), endpoint);
        if kind == ProfileKind::Cpu {
            url.push_str(&format!("?seconds={}", self.cpu_seconds));
        }
        Ok(url)
    }

    async fn fetch(&self, kind: ProfileKind) -> Result<Vec<u8>> {
        let url = self.target_url(kind)?;

        let spinner = (kind == ProfileKind::Cpu).then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("  {spinner} {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("sampling cpu for {}s", self.cpu_seconds));
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });
        let result = self.http.get(&url).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        result.with_context(|| format!("fetch {}", kind))
    }

    fn ingest_url(&self, kind: ProfileKind) -> Result<String> {
        let name = default_profile_name(kind.as_str(), Utc::now());
        let mut params = vec![("type", kind.as_str()), ("source", "capture")];
        if let Some(session) = &self.session {
            params.push(("session", session.as_str()));
        }
        if let Some(project) = &self.project {
            params.push(("project", project.as_str()));
        }
        if kind.is_cumulative() {
            params.push(("cumulative", "true"));
        }
        params.push(("name", name.as_str()));
        self.api.ingest_url("pprof", &params)
    }

    async fn upload(&self, kind: ProfileKind, data: Vec<u8>) -> Result<()> {
        let url = self.ingest_url(kind)?;
        let url = url.as_str();
        let data = &data;
        let operation = format!("upload {}", kind);
        retry_with_backoff(&operation, UPLOAD_ATTEMPTS, UPLOAD_BACKOFF, move || {
            self.api.post(url, data.clone())
        })
        .await
        .context("send to server")?;
        Ok(())
    }

    /// Capture and upload one kind, returning the profile size.
    async fn capture(&self, kind: ProfileKind) -> Result<usize> {
        let data = self.fetch(kind).await?;
        let size = data.len();
        self.upload(kind, data).await?;
        Ok(size)
    }

    async fn round(&self, kinds: &[ProfileKind], round: Option<u32>) {
        let now = chrono::Local::now().format("%H:%M:%S");
        match round {
            Some(n) => println!("[{}] Capture round {}", now, n),
            None => println!("[{}] Capturing profiles...", now),
        }

        let mut failed = 0;
        for &kind in kinds {
            match self.capture(kind).await {
                Ok(size) => output::capture_ok(
                    kind,
                    &format_size(size as u64),
                    &capture_label(kind, self.cpu_seconds),
                ),
                Err(e) => {
                    failed += 1;
                    output::capture_failed(kind, &e);
                }
            }
        }
        if failed > 0 {
            output::warning(&format!("{} of {} profiles failed", failed, kinds.len()));
        }
    }
}

pub async fn run(args: CaptureArgs, config: Option<&Path>) -> Result<()> {
    let kinds = parse_kinds(&args.profiles)?;
    let cpu_duration =
        parse_duration(&args.cpu_duration).context("Failed to parse --cpu-duration")?;
    let interval = args
        .interval
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Failed to parse --interval")?
        .filter(|d| !d.is_zero());

    let api = args.server.client(config)?;
    let capturer = Capturer {
        target: args.target.clone(),
        http: HttpClient::new(),
        cpu_seconds: cpu_duration.as_secs().max(1),
        session: args.session.clone(),
        project: args.project.clone(),
        api,
    };

    println!("Capturing from {} → {}", args.target, capturer.api.base());
    if let Some(session) = &args.session {
        println!("Session: {}", session);
    }
    match interval {
        Some(every) => println!(
            "Interval: {}s | Profiles: {}",
            every.as_secs_f64(),
            args.profiles
        ),
        None => println!("Profiles: {}", args.profiles),
    }
    println!();

    let Some(every) = interval else {
        capturer.round(&kinds, None).await;
        return Ok(());
    };

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(every);
    let mut rounds = 0u32;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        rounds += 1;
        tokio::select! {
            _ = &mut shutdown => break,
            _ = capturer.round(&kinds, Some(rounds)) => {}
        }

        if args.count > 0 && rounds >= args.count {
            println!();
            output::success(&format!("Completed {} captures.", rounds));
            return Ok(());
        }
    }

    println!("\nStopping capture. Captured {} rounds.", rounds);
    Ok(())
}
