//! GreenProof service entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use greenproof::{AuditRequest, FidelityCurve, HEIC_SUPPORTED};
use greenproof_server::config::DEFAULT_ADDR;
use greenproof_server::{build_orchestrator, service_info, HttpTransport, ServiceConfig};

#[derive(Parser)]
#[command(
    name = "greenproof",
    about = "GreenProof: vegetation growth audits with trust scores and carbon credit estimates",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Directory for audit artifacts (env: GREENPROOF_ARTIFACT_DIR).
    #[arg(long, global = true)]
    artifact_dir: Option<String>,

    /// Maps API key (env: GOOGLE_MAPS_API_KEY).
    #[arg(long, global = true)]
    maps_api_key: Option<String>,

    /// Static-map endpoint (env: GREENPROOF_MAPS_BASE_URL).
    #[arg(long, global = true)]
    maps_base_url: Option<String>,

    /// How similarity maps to the fidelity sub-score (env: GREENPROOF_FIDELITY_CURVE).
    #[arg(long, value_enum, global = true)]
    fidelity_curve: Option<CurveArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CurveArg {
    /// Reward photos of the same site; unrelated photos score 0.
    SiteMatch,
    /// Penalize near-duplicate resubmissions.
    DuplicatePenalty,
}

impl From<CurveArg> for FidelityCurve {
    fn from(arg: CurveArg) -> Self {
        match arg {
            CurveArg::SiteMatch => FidelityCurve::SiteMatch,
            CurveArg::DuplicatePenalty => FidelityCurve::DuplicatePenalty,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (default).
    Serve {
        /// Listen address (host:port).
        #[arg(long, default_value = DEFAULT_ADDR)]
        addr: String,
    },

    /// Audit one image pair and print the JSON result.
    Audit {
        /// Baseline ("before") photo.
        #[arg(long)]
        previous: String,

        /// Current ("after") photo; its EXIF supplies timestamp and geotag.
        #[arg(long)]
        current: String,

        /// Project identifier recorded in the report.
        #[arg(long, default_value = "cli")]
        project: String,
    },

    /// Print version, scoring constants, and cross-validation status as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   greenproof completions bash > ~/.local/share/bash-completion/completions/greenproof
    ///   greenproof completions zsh > ~/.zfunc/_greenproof
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::resolve(
        cli.artifact_dir.as_deref(),
        cli.maps_api_key.as_deref(),
        cli.maps_base_url.as_deref(),
        cli.fidelity_curve.map(FidelityCurve::from),
    );

    match cli.command.unwrap_or(Commands::Serve {
        addr: DEFAULT_ADDR.to_string(),
    }) {
        Commands::Serve { addr } => {
            let orchestrator = build_orchestrator(&config).with_context(|| {
                format!("cannot open artifact dir {}", config.artifact_dir.display())
            })?;
            tracing::info!("GreenProof server");
            tracing::info!("Artifacts: {}", config.artifact_dir.display());
            tracing::info!("Fidelity curve: {}", config.scoring.fidelity_curve);
            tracing::info!(
                "HEIC support: {}",
                if HEIC_SUPPORTED { "enabled" } else { "disabled (build with --features heic)" }
            );
            HttpTransport::new(Arc::new(orchestrator)).run(&addr).await?;
        }

        Commands::Audit {
            previous,
            current,
            project,
        } => {
            let baseline = tokio::fs::read(&previous)
                .await
                .with_context(|| format!("cannot read {previous}"))?;
            let current_bytes = tokio::fs::read(&current)
                .await
                .with_context(|| format!("cannot read {current}"))?;

            let orchestrator = build_orchestrator(&config).with_context(|| {
                format!("cannot open artifact dir {}", config.artifact_dir.display())
            })?;
            let outcome = orchestrator
                .run(AuditRequest {
                    baseline,
                    current: current_bytes,
                    project_id: project,
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome.response)?);
        }

        Commands::Info => {
            println!("{}", serde_json::to_string_pretty(&service_info(&config))?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "greenproof", &mut std::io::stdout());
        }
    }

    Ok(())
}
