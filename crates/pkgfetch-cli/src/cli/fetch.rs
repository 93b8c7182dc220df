use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use pkgfetch::core::service_name;
use pkgfetch::{
    FetchConfig, FetchItem, FetchStatus, FileDestination, MirrorResolver, MirrorStrategy, NoResolver,
    RepositorySession, ReqwestConnector, SrvRecord, StaticResolver,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::progress::IndicatifSink;

/// Exit status of a fetch cut short by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MirrorType {
    /// Fetch the URL as given.
    None,
    /// Mirrors from `_http._tcp.<host>` service records.
    Srv,
    /// Mirrors from `--mirror`.
    Http,
}

#[derive(Clone, Debug, Args)]
pub struct FetchArg {
    /// URL of the artifact.
    pub url: String,

    /// Where to place the artifact.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Known modification time (epoch seconds); 0 fetches unconditionally.
    #[arg(long, default_value_t = 0)]
    pub mtime: i64,

    /// Expected size in bytes, used when the server sends none.
    #[arg(long, default_value_t = 0)]
    pub size: u64,

    /// Repository name used in diagnostics.
    #[arg(long, default_value = "default")]
    pub repo_name: String,

    /// Repository base URL; defaults to the artifact URL.
    #[arg(long)]
    pub repo_url: Option<String>,

    #[arg(long, value_enum, default_value_t = MirrorType::None)]
    pub mirror_type: MirrorType,

    /// Static mirror base URL, tried in the order given.
    #[arg(long = "mirror", value_name = "URL")]
    pub mirrors: Vec<String>,

    /// Service record answer for `--mirror-type srv`, as HOST:PORT.
    #[arg(long = "srv", value_name = "HOST:PORT", value_parser = parse_srv)]
    pub srv: Vec<SrvRecord>,

    /// Retries after the first attempt; overrides the configuration.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-attempt timeout in seconds; overrides the configuration.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not draw a progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

fn parse_srv(value: &str) -> Result<SrvRecord, String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got '{value}'"))?;
    if host.is_empty() {
        return Err(format!("missing host in '{value}'"));
    }
    let port = port.parse::<u16>().map_err(|e| format!("bad port in '{value}': {e}"))?;
    Ok(SrvRecord::new(host, port))
}

impl FetchArg {
    fn strategy(&self) -> MirrorStrategy {
        match self.mirror_type {
            MirrorType::None => MirrorStrategy::Direct,
            MirrorType::Srv => MirrorStrategy::ServiceDiscovery,
            MirrorType::Http => MirrorStrategy::StaticList(self.mirrors.clone()),
        }
    }

    fn resolver(&self, repo_url: &str) -> Result<Arc<dyn MirrorResolver>> {
        if self.srv.is_empty() {
            return Ok(Arc::new(NoResolver));
        }
        let service = service_name(repo_url)?;
        Ok(Arc::new(StaticResolver::new().with_service(service, self.srv.clone())))
    }

    fn config(&self, path: Option<&Path>, verbose: u8) -> Result<FetchConfig> {
        let mut config = FetchConfig::load(path).context("failed to load configuration")?;
        if let Some(retries) = self.retries {
            config = config.fetch_retry(retries);
        }
        if let Some(timeout) = self.timeout {
            config = config.fetch_timeout(timeout);
        }
        config.debug_level = config.debug_level.max(verbose);
        Ok(config)
    }
}

/// Fetch into `<output>.part` and move it over `output` only on success,
/// so an up-to-date or failed fetch leaves the existing file alone.
pub async fn run(arg: FetchArg, config_path: Option<&Path>, verbose: u8) -> Result<ExitCode> {
    let config = arg.config(config_path, verbose)?;
    let repo_url = arg.repo_url.clone().unwrap_or_else(|| arg.url.clone());
    debug!(?config, %repo_url, "fetch settings");

    let sink = Arc::new(IndicatifSink::new(!arg.no_progress));
    let mut session = RepositorySession::new(&arg.repo_name, &repo_url, ReqwestConnector)
        .with_strategy(arg.strategy())
        .with_resolver(arg.resolver(&repo_url)?)
        .with_events(sink.clone())
        .with_config(config);

    let partial = partial_path(&arg.output);
    let mut dest = FileDestination::create(&partial)
        .await
        .with_context(|| format!("failed to create {}", partial.display()))?;
    let mut item = FetchItem::new(&arg.url).size(arg.size).mtime(arg.mtime);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let status = session.fetch_with_cancel(&mut item, &mut dest, &cancel).await;
    session.close();
    drop(dest);
    sink.finish(&status);

    if matches!(status, FetchStatus::Ok) {
        tokio::fs::rename(&partial, &arg.output)
            .await
            .with_context(|| format!("failed to move {} into place", partial.display()))?;
    } else {
        let _ = tokio::fs::remove_file(&partial).await;
    }

    let code = match &status {
        FetchStatus::Ok | FetchStatus::UpToDate => {
            println!("{status} mtime={}", item.mtime);
            ExitCode::SUCCESS
        },
        FetchStatus::Fatal(_) => {
            eprintln!("{status}");
            ExitCode::FAILURE
        },
        FetchStatus::Cancelled => {
            eprintln!("{status}");
            ExitCode::from(EXIT_CANCELLED)
        },
    };
    Ok(code)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
