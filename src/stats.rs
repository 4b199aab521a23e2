//! Dashboard statistics and exportable reports.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use tracing::{info, instrument};

use crate::api::{ApiError, ResourceService};
use crate::listview::ALL;
use crate::model::{Category, Product, Role, User};

/// Entries in each "top N" table.
pub const TOP_N: usize = 5;

/// Everything the dashboard, statistics and report pages read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub users: Vec<User>,
}

/// Fetch all three collections concurrently. One failure fails the load.
#[instrument(skip_all)]
pub async fn load_dashboard<S>(api: &S) -> Result<Dashboard, ApiError>
where
    S: ResourceService<Product> + ResourceService<Category> + ResourceService<User>,
{
    let (products, categories, users) = futures::try_join!(
        <S as ResourceService<Product>>::list(api),
        <S as ResourceService<Category>>::list(api),
        <S as ResourceService<User>>::list(api),
    )?;
    info!(
        products = products.len(),
        categories = categories.len(),
        users = users.len(),
        "dashboard data loaded"
    );
    Ok(Dashboard {
        products,
        categories,
        users,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopProduct {
    pub name: String,
    pub sold: u64,
    pub price: f64,
    pub revenue: f64,
    pub stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryShare {
    pub name: String,
    pub product_count: u64,
    /// Rounded share of all products.
    pub percentage: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total_products: usize,
    pub active_products: usize,
    pub low_stock_products: usize,
    pub inactive_products: usize,
    pub total_categories: usize,
    pub active_categories: usize,
    pub total_users: usize,
    pub active_users: usize,
    pub inactive_users: usize,
    pub admin_count: usize,
    pub user_count: usize,
    pub top_categories: Vec<CategoryShare>,
    pub top_products: Vec<TopProduct>,
    /// Sum over `top_products` only.
    pub total_revenue: f64,
    pub category_distribution: Vec<CategoryShare>,
}

pub fn percentage(value: u64, total: usize) -> u64 {
    if total == 0 {
        return 0;
    }
    (value as f64 / total as f64 * 100.0).round() as u64
}

impl Statistics {
    pub fn compute(data: &Dashboard) -> Self {
        let count_status = |label: &str| {
            data.products
                .iter()
                .filter(|p| p.status_label() == label)
                .count()
        };
        let total_products = data.products.len();

        let category_distribution: Vec<CategoryShare> = data
            .categories
            .iter()
            .map(|c| CategoryShare {
                name: c.name.clone(),
                product_count: c.product_count,
                percentage: percentage(c.product_count, total_products),
            })
            .collect();

        let mut top_categories = category_distribution.clone();
        top_categories.sort_by_key(|c| Reverse(c.product_count));
        top_categories.truncate(TOP_N);

        let mut by_sold: Vec<&Product> = data.products.iter().collect();
        by_sold.sort_by_key(|p| Reverse(p.sold));
        let top_products: Vec<TopProduct> = by_sold
            .into_iter()
            .take(TOP_N)
            .map(|p| TopProduct {
                name: p.name.clone(),
                sold: p.sold,
                price: p.price,
                revenue: p.revenue(),
                stock: p.stock,
            })
            .collect();
        let total_revenue = top_products.iter().map(|p| p.revenue).sum();

        let active_users = data.users.iter().filter(|u| u.is_active).count();
        let count_role = |role: Role| {
            data.users.iter().filter(|u| u.role() == Some(role)).count()
        };

        Self {
            total_products,
            active_products: count_status("active"),
            low_stock_products: count_status("low-stock"),
            inactive_products: count_status("inactive"),
            total_categories: data.categories.len(),
            active_categories: data.categories.iter().filter(|c| c.is_active).count(),
            total_users: data.users.len(),
            active_users,
            inactive_users: data.users.len() - active_users,
            admin_count: count_role(Role::Admin),
            user_count: count_role(Role::User),
            top_categories,
            top_products,
            total_revenue,
            category_distribution,
        }
    }
}

/// Which rows a report includes. `"all"` (the default) disables a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub category: String,
    pub status: String,
    pub role: String,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            category: ALL.to_string(),
            status: ALL.to_string(),
            role: ALL.to_string(),
        }
    }
}

fn matches(wanted: &str, actual: &str) -> bool {
    wanted.eq_ignore_ascii_case(ALL) || wanted.eq_ignore_ascii_case(actual)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Serialize)]
struct Summary {
    total_products: usize,
    total_users: usize,
    total_categories: usize,
    total_revenue: f64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    summary: Summary,
    products: Vec<&'a Product>,
    users: Vec<&'a User>,
    categories: &'a [Category],
    statistics: &'a Statistics,
}

pub struct Report {
    data: Dashboard,
    stats: Statistics,
    filter: ReportFilter,
    generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(data: Dashboard, filter: ReportFilter, generated_at: DateTime<Utc>) -> Self {
        let stats = Statistics::compute(&data);
        Self {
            data,
            stats,
            filter,
            generated_at,
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn products(&self) -> Vec<&Product> {
        self.data
            .products
            .iter()
            .filter(|p| matches(&self.filter.category, &p.category))
            .filter(|p| matches(&self.filter.status, p.status_label()))
            .collect()
    }

    pub fn users(&self) -> Vec<&User> {
        self.data
            .users
            .iter()
            .filter(|u| matches(&self.filter.role, &u.role))
            .collect()
    }

    pub fn render(&self, format: ExportFormat) -> Result<String, serde_json::Error> {
        match format {
            ExportFormat::Csv => Ok(self.to_csv()),
            ExportFormat::Json => self.to_json(),
        }
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str("FURNITURE INVENTORY REPORT\n");
        out.push_str(&format!("Date: {}\n\n", self.generated_at.format("%Y-%m-%d")));

        out.push_str("PRODUCTS\n");
        out.push_str("Name,Category,Price,Stock,Status\n");
        for p in self.products() {
            push_row(
                &mut out,
                &[
                    &p.name,
                    &p.category,
                    &p.price.to_string(),
                    &p.stock.to_string(),
                    p.status_label(),
                ],
            );
        }

        out.push_str("\n\nUSERS\n");
        out.push_str("Name,Username,Email,Role,Status\n");
        for u in self.users() {
            push_row(
                &mut out,
                &[&u.name, &u.username, &u.email, &u.role, u.status_label()],
            );
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let report = JsonReport {
            generated_at: self.generated_at,
            summary: Summary {
                total_products: self.stats.total_products,
                total_users: self.stats.total_users,
                total_categories: self.stats.total_categories,
                total_revenue: self.stats.total_revenue,
            },
            products: self.products(),
            users: self.users(),
            categories: &self.data.categories,
            statistics: &self.stats,
        };
        serde_json::to_string_pretty(&report)
    }
}

fn push_row(out: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// Quote a field when it contains a delimiter, quote or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
