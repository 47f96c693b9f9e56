use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clause_guard_core::{
    artifacts::{render_pdf, ChartSpec},
    render_report, ChartRenderer, ClauseSource, DistributionService, FileClauseSource,
    OutputFormat, PngChartRenderer, PrintPdfRenderer, Renderers, Session, Severity, SmtpDefaults,
    SmtpMailTransport, SvgChartRenderer, DEFAULT_SUBJECT,
};
use colored::Colorize;
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "clause-guard",
    author,
    version,
    about = "Contract clause compliance reporting CLI"
)]
struct Cli {
    /// JSON file with the analyzed clause records
    #[arg(
        long,
        short,
        value_name = "FILE",
        default_value = "./clauses.json",
        global = true
    )]
    input: PathBuf,

    /// Optional configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the compliance summary, verdict and per-clause results
    Summary {
        /// Emit the report as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Show AI-generated modifications for High and Medium risk clauses
    Rewrites {
        #[arg(long)]
        json: bool,
        /// Also write the rewrite table as a PDF report
        #[arg(long, value_name = "PATH")]
        pdf: Option<PathBuf>,
    },
    /// Write the risk level distribution chart (PNG when PATH ends in `.png`, SVG otherwise)
    Chart {
        #[arg(long, value_name = "PATH", default_value = "risk_distribution.svg")]
        out: PathBuf,
    },
    /// Send the compliance report via email
    Send {
        /// Recipient email address
        #[arg(long, default_value = "")]
        to: String,
        /// Subject line (overrides the config file)
        #[arg(long)]
        subject: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    #[serde(default)]
    mail: MailConfig,
}

#[derive(Debug, Default, Deserialize)]
struct MailConfig {
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    subject: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let source = FileClauseSource::new(&cli.input);
    let store = source
        .load_store()
        .await
        .with_context(|| format!("failed to load clause records from {}", cli.input.display()))?;
    let mut session = Session::new(store);
    if session.store().is_empty() {
        println!("{}", clause_guard_core::EmptyInput.to_string().blue());
        return Ok(ExitCode::SUCCESS);
    }

    match cli.command.unwrap_or(Commands::Summary { json: false }) {
        Commands::Summary { json } => print_report(&session, json)?,
        Commands::Rewrites { json, pdf } => {
            session.expand_rewrites();
            print_report(&session, json)?;
            if let Some(path) = pdf {
                write_pdf(&session, &path)?;
            }
        }
        Commands::Chart { out } => write_chart(&session, &out)?,
        Commands::Send { to, subject } => {
            let subject = subject
                .or(config.mail.subject.clone())
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
            return send_report(&session, &to, &subject, &config).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    settings
        .try_deserialize()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

fn print_report(session: &Session, json: bool) -> Result<()> {
    let view = session.report_view()?;
    if json {
        println!("{}", render_report(&view, OutputFormat::Json)?);
        return Ok(());
    }

    let rendered = render_report(&view, OutputFormat::Human)?;
    let verdict = view.verdict.message();
    for line in rendered.lines() {
        if line.trim() == verdict {
            let styled = match view.severity {
                Severity::Error => line.red().bold(),
                Severity::Warning => line.yellow().bold(),
                Severity::Success => line.green().bold(),
            };
            println!("{styled}");
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

fn write_pdf(session: &Session, path: &Path) -> Result<()> {
    match render_pdf(&PrintPdfRenderer, &session.rewrites())? {
        Some(bytes) => {
            fs::write(path, bytes)
                .with_context(|| format!("failed to write PDF report to {}", path.display()))?;
            println!("PDF report written to {}", path.display());
        }
        None => println!("No high-risk clauses were found to rewrite; no PDF written."),
    }
    Ok(())
}

fn write_chart(session: &Session, out: &Path) -> Result<()> {
    let spec = ChartSpec::risk_distribution(&session.store().distribution());
    let is_png = out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    let bytes = if is_png {
        PngChartRenderer::default()
            .to_png(&spec)
            .context("failed to render risk chart")?
    } else {
        SvgChartRenderer::default()
            .to_svg(&spec)
            .context("failed to render risk chart")?
            .into_bytes()
    };
    fs::write(out, bytes).with_context(|| format!("failed to write chart to {}", out.display()))?;
    debug!(path = %out.display(), "chart written");
    println!("Chart written to {}", out.display());
    Ok(())
}

async fn send_report(
    session: &Session,
    recipient: &str,
    subject: &str,
    config: &AppConfig,
) -> Result<ExitCode> {
    let service = DistributionService::new(SmtpMailTransport).with_defaults(SmtpDefaults {
        host: config.mail.smtp_host.clone(),
        port: config.mail.smtp_port,
    });
    let chart = PngChartRenderer::default();
    let renderers = Renderers {
        pdf: &PrintPdfRenderer,
        chart: &chart as &dyn ChartRenderer,
    };
    let delivery = session
        .distribute(recipient, subject, &renderers, &service)
        .await;
    if delivery.success {
        println!("{}", delivery.message.green());
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{}", delivery.message.red());
        Ok(ExitCode::FAILURE)
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lettre=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
