//! Render a template directory from the command line.
//!
//! ```text
//! pageview --root ./templates --var title=Home --var 'items=[1,2]' home.html
//! pageview --config views.yaml --status 201 --headers page.twig
//! ```
//!
//! Values passed with `--var` are parsed as JSON when they parse, and kept as
//! plain strings otherwise. Logging goes to stderr and is controlled with
//! `RUST_LOG` (default `warn`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use http::StatusCode;
use pageview::{Adapter, Collaborators, RenderConfig, StaticTopology, StaticWebPage, Variables};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pageview")]
#[command(version)]
#[command(about = "Render a template into an HTTP response")]
struct Cli {
    /// Template to render, relative to the template root
    template: String,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template root directory
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Extra plugin directory (repeatable)
    #[arg(long = "plugins", value_name = "DIR")]
    plugins: Vec<PathBuf>,

    /// Template variable as key=value (repeatable)
    #[arg(short, long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, Value)>,

    /// Autoescape strategy (html, css, js, url, html_attr, xml)
    #[arg(long)]
    escape: Option<String>,

    /// Response status on success
    #[arg(short, long, default_value_t = 200)]
    status: u16,

    /// Print status and headers before the body
    #[arg(long)]
    headers: bool,
}

fn parse_var(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn load_config(cli: &Cli) -> Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::default(),
    };
    config = config.add_extensions_dirs(cli.plugins.iter().cloned());
    if let Some(token) = &cli.escape {
        config = config.with_auto_escape(token)?;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let status = StatusCode::from_u16(cli.status)
        .with_context(|| format!("invalid status code {}", cli.status))?;

    tracing::debug!(
        template = %cli.template,
        root = %cli.root.display(),
        variables = cli.vars.len(),
        auto_escape = ?config.auto_escape(),
        "rendering from command line"
    );

    let request = http::Request::get("/").body(())?;
    let collaborators = Collaborators::new(
        Arc::new(StaticTopology::new(&cli.root)),
        Arc::new(StaticWebPage::new()),
        request,
    );
    let adapter = Adapter::new(config, collaborators);

    let mut view = adapter.view()?;
    let vars: Variables = cli.vars.into_iter().collect();
    view.render(&cli.template, vars, Some(status))
        .with_context(|| format!("failed to render {}", cli.template))?;

    let response = view.into_response();
    if cli.headers {
        println!("{}", response.status());
        for (name, value) in response.headers() {
            println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
        }
        println!();
    }
    print!("{}", String::from_utf8_lossy(response.body().as_bytes()));
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())
}
