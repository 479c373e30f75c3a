use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use notion_diag::checks::remediation_tips;
use notion_diag::commands::{self, CheckReport};
use relay_core::notion::{HttpNotionClient, NotionApi};
use relay_core::{ProviderError, RelayConfig, http::build_client};
use relay_telemetry::{LogFormat, TelemetryConfig, init_telemetry, redact};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(author, version, about = "Notion relay integration diagnostics")]
struct Cli {
    /// Emit JSON output
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate NOTION_TOKEN and try to read a page
    Check {
        /// Defaults to PARENT_PAGE_ID
        #[arg(long)]
        page_id: Option<String>,
    },
    /// Print the extracted properties of a page
    Props {
        #[arg()]
        id: String,
    },
    /// Print a block's type and parent
    Block {
        #[arg()]
        id: String,
    },
    /// Rename a page through its title property
    SetTitle {
        #[arg()]
        id: String,
        #[arg()]
        title: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::from_env().context("load configuration")?;

    let mut telemetry = TelemetryConfig::from_env("notion-diag", env!("CARGO_PKG_VERSION"));
    telemetry.format = LogFormat::Text;
    if std::env::var("LOG_LEVEL").is_err() {
        telemetry.default_filter = "warn".into();
    }
    let _telemetry = init_telemetry(telemetry)?;

    let token = config.notion.token.clone();
    let client = match &token {
        Some(token) => Some(HttpNotionClient::new(
            build_client(config.http_timeout)?,
            Some(config.notion.api_base.clone()),
            token.clone(),
        )),
        None => None,
    };

    if let Commands::Check { page_id } = &cli.command {
        let page_id = page_id.clone().or_else(|| config.notion.parent_page_id.clone());
        let report = commands::check(
            client.as_ref().map(|c| c as &dyn NotionApi),
            token.as_deref(),
            page_id.as_deref(),
        )
        .await;
        if cli.json {
            print_json(&report)?;
        } else {
            print_check(&report, token.as_deref(), page_id.as_deref());
        }
        if !report.passed() {
            bail!("notion check failed");
        }
        return Ok(());
    }

    let Some(api) = client else {
        bail!("NOTION_TOKEN is not set");
    };
    match cli.command {
        Commands::Props { id } => {
            let props = commands::props(&api, &id).await.map_err(explain)?;
            if cli.json {
                print_json(&props)?;
            } else if props.is_empty() {
                println!("Page {id} has no properties");
            } else {
                if let Some(url) = &props.url {
                    println!("url: {url}");
                }
                for (name, value) in props.iter() {
                    let shown = value.to_string();
                    let shown = if shown.is_empty() { "—" } else { shown.as_str() };
                    println!("{name:<24} {shown}");
                }
            }
        }
        Commands::Block { id } => {
            let info = commands::block(&api, &id).await.map_err(explain)?;
            if cli.json {
                print_json(&info)?;
            } else {
                println!("id    : {}", info.id);
                println!("type  : {}", info.kind);
                println!(
                    "parent: {} {}",
                    info.parent_type.as_deref().unwrap_or("-"),
                    info.parent_id.as_deref().unwrap_or("")
                );
            }
        }
        Commands::SetTitle { id, title } => {
            let update = commands::set_title(&api, &id, &title).await?;
            if cli.json {
                print_json(&update)?;
            } else {
                println!(
                    "Updated {} of page {} to {:?}",
                    update.property, update.page_id, update.title
                );
            }
        }
        Commands::Check { .. } => {}
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_check(report: &CheckReport, token: Option<&str>, page_id: Option<&str>) {
    if let Some(token) = token {
        println!("token  : {}", redact(token));
    }
    if let Some(page_id) = page_id {
        println!("page id: {page_id}");
    }
    for finding in &report.findings {
        println!("{finding}");
    }
    if let Some(url) = &report.page_url {
        println!("[ok  ] page is reachable: {url}");
    }
    if let Some(error) = &report.error {
        println!("[FAIL] page lookup failed: {error}");
        for tip in &report.tips {
            println!("  - {tip}");
        }
    }
}

fn explain(err: ProviderError) -> anyhow::Error {
    for tip in remediation_tips(&err) {
        eprintln!("hint: {tip}");
    }
    anyhow::Error::new(err)
}
