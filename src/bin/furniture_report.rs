use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use furniture_admin::api::ApiClient;
use furniture_admin::config;
use furniture_admin::listview::ALL;
use furniture_admin::model::Role;
use furniture_admin::session::{self, SessionStore};
use furniture_admin::stats::{load_dashboard, ExportFormat, Report, ReportFilter};

#[derive(Parser, Debug)]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[arg(long, env = "FURNITURE_USERNAME")]
    username: String,

    #[arg(long, env = "FURNITURE_PASSWORD", hide_env_values = true)]
    password: String,

    /// Print the dashboard summary instead of exporting
    #[arg(long)]
    summary: bool,

    #[arg(long, value_enum, default_value = "csv")]
    format: ExportFormat,

    /// Write to this file instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value = ALL)]
    category: String,

    #[arg(long, default_value = ALL)]
    status: String,

    #[arg(long, default_value = ALL)]
    role: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let client = ApiClient::from_config(&cfg)?;

    let store = SessionStore::new();
    let session = session::login(&client, &store, &args.username, &args.password)
        .await
        .map_err(|e| anyhow!(e.display_message()))?;
    if session.role != Role::Admin {
        bail!("reports are only available to admin accounts");
    }
    let client = client.authorized(&session.token);

    let data = load_dashboard(&client)
        .await
        .context("failed to load report data")?;
    let filter = ReportFilter {
        category: args.category,
        status: args.status,
        role: args.role,
    };
    let report = Report::new(data, filter, Utc::now());

    if args.summary {
        let s = report.statistics();
        println!(
            "Products:   {} ({} active, {} low stock, {} inactive)",
            s.total_products, s.active_products, s.low_stock_products, s.inactive_products
        );
        println!(
            "Categories: {} ({} active)",
            s.total_categories, s.active_categories
        );
        println!(
            "Users:      {} ({} active, {} admin, {} user)",
            s.total_users, s.active_users, s.admin_count, s.user_count
        );
        println!("Top products:");
        for p in &s.top_products {
            println!(
                "  {:<30} sold {:>5}  revenue {:>14.0}",
                p.name, p.sold, p.revenue
            );
        }
        println!("Revenue (top products): {:.0}", s.total_revenue);
        println!("Category distribution:");
        for c in &s.category_distribution {
            println!(
                "  {:<30} {:>4} products  {:>3}%",
                c.name, c.product_count, c.percentage
            );
        }
        return Ok(());
    }

    let rendered = report.render(args.format)?;
    match args.out {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
