use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use furniture_admin::api::model::StockOperation;
use furniture_admin::api::{ApiClient, ResourceService};
use furniture_admin::config;
use furniture_admin::listview::{ListController, SortDirection, View};
use furniture_admin::model::{DeleteMode, Record, Resource};
use furniture_admin::nav::{Navigator, Route};
use furniture_admin::screens::{CategoriesScreen, ProductsScreen, UsersScreen};
use furniture_admin::session::SessionStore;
use furniture_admin::validate::{password_strength, PasswordStrength, Validate, MIN_PASSWORD_LEN};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[arg(long, env = "FURNITURE_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "FURNITURE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Products(ProductCommand),
    #[command(subcommand)]
    Categories(CategoryCommand),
    #[command(subcommand)]
    Users(UserCommand),
    /// Score a password without contacting the server
    CheckPassword { password: String },
}

#[derive(Debug, Subcommand)]
enum ProductCommand {
    List(ListArgs),
    /// Add to (or with --set, replace) a product's stock
    Stock {
        id: String,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
        #[arg(long)]
        set: bool,
    },
}

#[derive(Debug, Subcommand)]
enum CategoryCommand {
    List(ListArgs),
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
enum UserCommand {
    List(ListArgs),
    /// Deactivate a user, or remove it with --hard
    Delete {
        id: String,
        #[arg(long)]
        hard: bool,
    },
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,

    /// Categorical filter as `dimension=value`; repeatable
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,

    #[arg(long)]
    sort: Option<String>,

    #[arg(long)]
    desc: bool,

    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long)]
    page_size: Option<usize>,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((dim, value)) if !dim.trim().is_empty() => {
            Ok((dim.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected dimension=value, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let route = match &cli.command {
        Command::CheckPassword { password } => {
            check_password(password);
            return Ok(());
        }
        Command::Products(_) => Route::ProductList,
        Command::Categories(_) => Route::CategoryManagement,
        Command::Users(_) => Route::UserManagement,
    };

    let cfg = config::load(Some(&cli.config))
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let client = ApiClient::from_config(&cfg)?;
    let settings = cfg.list_settings();

    let client = sign_in(&cli, &client, route).await?;

    match cli.command {
        Command::Products(ProductCommand::List(args)) => {
            let mut screen = ProductsScreen::new(client, settings);
            show_list(
                screen.list_mut(),
                &args,
                &["name", "category", "price", "stock", "status"],
            )
            .await
        }
        Command::Products(ProductCommand::Stock { id, amount, set }) => {
            let mut screen = ProductsScreen::new(client, settings);
            screen.list_mut().mount().await.context("failed to load products")?;
            let operation = if set {
                StockOperation::Set
            } else {
                StockOperation::Add
            };
            screen
                .adjust_stock(&id, amount, operation)
                .await
                .map_err(|e| anyhow!(e.display_message()))?;
            report_notice(screen.list());
            Ok(())
        }
        Command::Categories(CategoryCommand::List(args)) => {
            let mut list: CategoriesScreen<ApiClient> = ListController::new(client, settings);
            show_list(&mut list, &args, &["name", "description", "product_count", "status"]).await
        }
        Command::Categories(CategoryCommand::Delete { id }) => {
            let mut list: CategoriesScreen<ApiClient> = ListController::new(client, settings);
            list.mount().await.context("failed to load categories")?;
            list.delete(&id, DeleteMode::Hard)
                .await
                .map_err(|e| anyhow!(e.display_message()))?;
            report_notice(&list);
            Ok(())
        }
        Command::Users(UserCommand::List(args)) => {
            let mut screen = UsersScreen::new(client, settings);
            show_list(
                screen.list_mut(),
                &args,
                &["name", "username", "email", "role", "status"],
            )
            .await
        }
        Command::Users(UserCommand::Delete { id, hard }) => {
            let mut screen = UsersScreen::new(client, settings);
            screen.list_mut().mount().await.context("failed to load users")?;
            let res = if hard {
                screen.remove(&id).await
            } else {
                screen.deactivate(&id).await
            };
            res.map_err(|e| anyhow!(e.display_message()))?;
            report_notice(screen.list());
            Ok(())
        }
        Command::CheckPassword { .. } => Ok(()),
    }
}

/// Log in and make sure the account may open `route`.
async fn sign_in(cli: &Cli, client: &ApiClient, route: Route) -> Result<ApiClient> {
    let (Some(username), Some(password)) = (cli.username.as_deref(), cli.password.as_deref())
    else {
        bail!(
            "credentials required: pass --username/--password \
             or set FURNITURE_USERNAME/FURNITURE_PASSWORD"
        );
    };

    let mut nav = Navigator::new(SessionStore::new());
    let session = nav
        .login(client, username, password)
        .await
        .map_err(|e| anyhow!(e.display_message()))?;
    info!(role = session.role.as_str(), landing = %nav.current(), "signed in");

    if nav.navigate(route.clone(), Utc::now()) != &route {
        bail!("account '{}' cannot open {}", username, route);
    }
    Ok(client.authorized(&session.token))
}

async fn show_list<R, S>(
    list: &mut ListController<R, S>,
    args: &ListArgs,
    columns: &[&str],
) -> Result<()>
where
    R: Resource + Validate,
    S: ResourceService<R>,
{
    for (dimension, _) in &args.filters {
        if !R::FILTER_DIMENSIONS.contains(&dimension.as_str()) {
            bail!(
                "cannot filter {} by '{}'; expected one of: {}",
                R::PATH,
                dimension,
                R::FILTER_DIMENSIONS.join(", ")
            );
        }
    }
    if let Some(key) = &args.sort {
        if !R::SORT_KEYS.contains(&key.as_str()) {
            bail!(
                "cannot sort {} by '{}'; expected one of: {}",
                R::PATH,
                key,
                R::SORT_KEYS.join(", ")
            );
        }
    }

    list.mount()
        .await
        .with_context(|| format!("failed to load {}", R::PATH))?;
    if let Some(size) = args.page_size {
        list.set_page_size(size);
    }
    if let Some(search) = &args.search {
        list.set_search(search);
    }
    for (dimension, value) in &args.filters {
        list.set_filter(dimension, value);
    }
    if let Some(key) = &args.sort {
        let direction = if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        list.set_sort(key, direction);
    }
    let view = list.set_page(args.page);
    print_view(&view, columns);
    Ok(())
}

fn print_view<R: Record>(view: &View<R>, columns: &[&str]) {
    println!("id\t{}", columns.join("\t"));
    for item in &view.items {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| item.field(c).map(|v| v.display()).unwrap_or_default())
            .collect();
        println!("{}\t{}", item.id().unwrap_or("-"), cells.join("\t"));
    }
    println!(
        "page {}/{} ({} matching)",
        view.page, view.total_pages, view.total
    );
}

fn report_notice<R, S>(list: &ListController<R, S>)
where
    R: Resource + Validate,
    S: ResourceService<R>,
{
    if let Some(notice) = list.notice() {
        println!("{}", notice.text);
    }
}

fn check_password(password: &str) {
    let score = password_strength(password);
    println!(
        "strength: {} ({}/100)",
        PasswordStrength::from_score(score).label(),
        score
    );
    if password.chars().count() < MIN_PASSWORD_LEN {
        println!("too short: at least {} characters required", MIN_PASSWORD_LEN);
    }
}
