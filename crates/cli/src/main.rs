mod formatter;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use formatter::{ColorWhen, OutputFormat};
use http::Method;
use loopback_rest_crud::{boot_project, Application, RestRequest};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lb")]
#[command(about = "Boot a LoopBack project and exercise its CRUD REST routes", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root containing datasources/, models/ and public-models/
    #[arg(long, global = true, env = "LB_PROJECT_ROOT", default_value = ".")]
    project: PathBuf,

    /// When to color the output
    #[arg(long, global = true, value_enum, default_value_t = ColorWhen::Auto)]
    color: ColorWhen,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the project and list what was registered or failed
    Boot,

    /// List the synthesized REST routes
    Routes,

    /// Handle a single request against the booted project
    Invoke {
        /// HTTP method (GET, POST, PATCH, PUT, DELETE)
        method: String,

        /// Request path including the query string, e.g. /products?filter=...
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Handle requests read from stdin, one `METHOD PATH [JSON]` per line,
    /// against a single booted application
    Batch {
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },
}

async fn boot(project: &Path) -> Result<Application> {
    let app = Application::new();
    let report = boot_project(&app, project)
        .await
        .with_context(|| format!("failed to boot project at {}", project.display()))?;
    for failure in &report.failures {
        warn!("{}", failure);
    }
    debug!(loaded = report.loaded.len(), "project booted");
    Ok(app)
}

fn parse_request(method: &str, path: &str, data: Option<&str>) -> Result<RestRequest> {
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| anyhow!("invalid HTTP method `{}`", method))?;
    let mut request =
        RestRequest::parse(method, path).with_context(|| format!("invalid path `{}`", path))?;
    if let Some(data) = data {
        let body: Value = serde_json::from_str(data).context("request body is not valid JSON")?;
        request = request.with_body(body);
    }
    Ok(request)
}

/// Split a batch line into method, path and optional JSON body.
fn parse_batch_line(line: &str) -> Result<Option<RestRequest>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.splitn(3, char::is_whitespace);
    let method = parts.next().unwrap_or_default();
    let path = parts
        .next()
        .ok_or_else(|| anyhow!("expected `METHOD PATH [JSON]`, got `{}`", line))?;
    let data = parts.next().map(str::trim).filter(|d| !d.is_empty());
    parse_request(method, path, data).map(Some)
}

async fn run_boot(project: PathBuf, color: ColorWhen) -> Result<()> {
    let colorize = color.enabled();
    let app = Application::new();
    let report = boot_project(&app, &project).await?;
    println!("{}", formatter::format_boot_report(&report, colorize));
    if !report.is_success() {
        bail!("{} artefact(s) failed to boot", report.failures.len());
    }
    Ok(())
}

async fn run_routes(project: PathBuf, color: ColorWhen) -> Result<()> {
    let colorize = color.enabled();
    let app = boot(&project).await?;
    let routes = app.routes();
    if routes.is_empty() {
        println!("No routes");
    }
    for route in routes {
        println!("{}", formatter::format_route(&route, colorize));
    }
    Ok(())
}

async fn run_invoke(
    project: PathBuf,
    color: ColorWhen,
    method: String,
    path: String,
    data: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let colorize = color.enabled();
    let request = parse_request(&method, &path, data.as_deref())?;
    let app = boot(&project).await?;

    let response = app.handle(request).await;
    println!(
        "{}",
        formatter::format_response(response.status, response.body.as_ref(), format, colorize)
    );
    if !response.is_success() {
        bail!("request failed with {}", response.status);
    }
    Ok(())
}

async fn run_batch(project: PathBuf, color: ColorWhen, format: OutputFormat) -> Result<()> {
    let colorize = color.enabled();
    let app = boot(&project).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failed = 0usize;
    while let Some(line) = lines.next_line().await? {
        let request = match parse_batch_line(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                warn!("{:#}", e);
                failed += 1;
                continue;
            }
        };
        let response = app.handle(request).await;
        if !response.is_success() {
            failed += 1;
        }
        println!(
            "{}",
            formatter::format_response(response.status, response.body.as_ref(), format, colorize)
        );
    }
    if failed > 0 {
        bail!("{} request(s) failed", failed);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (logs to stderr, keeping stdout clean for data)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Boot => run_boot(cli.project, cli.color).await,
        Commands::Routes => run_routes(cli.project, cli.color).await,
        Commands::Invoke {
            method,
            path,
            data,
            format,
        } => run_invoke(cli.project, cli.color, method, path, data, format).await,
        Commands::Batch { format } => run_batch(cli.project, cli.color, format).await,
    }
}
