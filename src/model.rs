use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Products with fewer units than this are reported as running low.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// A single display field read off a record for searching, filtering and sorting.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl FieldValue {
    /// Text used for substring search and categorical filters.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.is_finite() => {
                format!("{}", *n as i64)
            }
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Flag(b) => b.to_string(),
        }
    }

    /// Text compares case-insensitively, numbers numerically, flags false < true.
    /// Mixed kinds fall back to comparing their display text.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (FieldValue::Number(a), FieldValue::Number(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (FieldValue::Flag(a), FieldValue::Flag(b)) => a.cmp(b),
            (a, b) => a.display().to_lowercase().cmp(&b.display().to_lowercase()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Anything the list controller can search, filter and sort.
pub trait Record: Clone + Send + Sync + 'static {
    /// Fields matched by the free-text search.
    const SEARCH_FIELDS: &'static [&'static str];
    /// Categorical filter dimensions a screen offers.
    const FILTER_DIMENSIONS: &'static [&'static str];
    /// Keys a screen can sort by.
    const SORT_KEYS: &'static [&'static str];

    fn id(&self) -> Option<&str>;
    fn field(&self, key: &str) -> Option<FieldValue>;
    fn set_active(&mut self, active: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Mark the record inactive.
    Soft,
    /// Remove the record permanently.
    Hard,
}

/// A record type backed by a REST collection endpoint.
pub trait Resource: Record + Serialize + DeserializeOwned {
    /// Collection path relative to the API base, e.g. `products`.
    const PATH: &'static str;
    /// Singular name used in user-facing messages.
    const LABEL: &'static str;
    /// Whether `DELETE /{path}/{id}` deactivates instead of removing.
    const SOFT_DELETE: bool;

    /// Resources without soft delete always delete permanently.
    fn effective_delete(mode: DeleteMode) -> DeleteMode {
        if Self::SOFT_DELETE {
            mode
        } else {
            DeleteMode::Hard
        }
    }

    fn collection_path() -> String {
        Self::PATH.to_string()
    }

    fn item_path(id: &str) -> String {
        format!("{}/{}", Self::PATH, id)
    }

    fn delete_path(id: &str, mode: DeleteMode) -> String {
        match (Self::SOFT_DELETE, mode) {
            (true, DeleteMode::Hard) => format!("{}/{}/hard", Self::PATH, id),
            _ => Self::item_path(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Parse a role name as sent by the server; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Role> {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Stock-derived availability shown on the catalog detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    OutOfStock,
    Limited,
    InStock,
}

impl Availability {
    pub fn label(&self) -> &'static str {
        match self {
            Availability::OutOfStock => "out of stock",
            Availability::Limited => "limited stock",
            Availability::InStock => "in stock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub sold: u64,
}

impl Product {
    /// Derived status label: `inactive`, `low-stock` or `active`.
    pub fn status_label(&self) -> &'static str {
        if !self.is_active {
            "inactive"
        } else if self.stock < LOW_STOCK_THRESHOLD {
            "low-stock"
        } else {
            "active"
        }
    }

    pub fn availability(&self) -> Availability {
        if self.stock <= 0 {
            Availability::OutOfStock
        } else if self.stock < LOW_STOCK_THRESHOLD {
            Availability::Limited
        } else {
            Availability::InStock
        }
    }

    pub fn revenue(&self) -> f64 {
        self.sold as f64 * self.price
    }
}

impl Record for Product {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description", "category"];
    const FILTER_DIMENSIONS: &'static [&'static str] = &["category", "status", "active"];
    const SORT_KEYS: &'static [&'static str] = &["name", "price", "stock", "category", "sold"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "name" => Some(FieldValue::Text(self.name.clone())),
            "description" => Some(FieldValue::Text(self.description.clone())),
            "category" => Some(FieldValue::Text(self.category.clone())),
            "price" => Some(FieldValue::Number(self.price)),
            "stock" => Some(FieldValue::Number(self.stock as f64)),
            "sold" => Some(FieldValue::Number(self.sold as f64)),
            "rating" => self.rating.map(FieldValue::Number),
            "unit" => Some(FieldValue::Text(self.unit.clone())),
            "status" => Some(FieldValue::from(self.status_label())),
            "active" => Some(FieldValue::Flag(self.is_active)),
            _ => None,
        }
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

impl Resource for Product {
    const PATH: &'static str = "products";
    const LABEL: &'static str = "Product";
    const SOFT_DELETE: bool = true;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, alias = "productCount")]
    pub product_count: u64,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
}

impl Category {
    /// Template for the "add category" form.
    pub fn blank() -> Self {
        Self {
            id: None,
            name: String::new(),
            description: String::new(),
            icon: "bi-box-seam".to_string(),
            color: "#ff7b00".to_string(),
            product_count: 0,
            is_active: true,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "active"
        } else {
            "inactive"
        }
    }
}

impl Record for Category {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];
    const FILTER_DIMENSIONS: &'static [&'static str] = &["status"];
    const SORT_KEYS: &'static [&'static str] = &["name", "product_count"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "name" => Some(FieldValue::Text(self.name.clone())),
            "description" => Some(FieldValue::Text(self.description.clone())),
            "product_count" => Some(FieldValue::Number(self.product_count as f64)),
            "status" => Some(FieldValue::from(self.status_label())),
            "active" => Some(FieldValue::Flag(self.is_active)),
            _ => None,
        }
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

impl Resource for Category {
    const PATH: &'static str = "categories";
    const LABEL: &'static str = "Category";
    const SOFT_DELETE: bool = false;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(alias = "full_name")]
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: String,
    #[serde(default = "default_true", alias = "isActive")]
    pub is_active: bool,
    /// Only sent when creating a user or resetting their password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_name(&self.role)
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active {
            "active"
        } else {
            "inactive"
        }
    }
}

impl Record for User {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "username", "email"];
    const FILTER_DIMENSIONS: &'static [&'static str] = &["role", "status"];
    const SORT_KEYS: &'static [&'static str] = &["name", "username", "role", "email"];

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "name" => Some(FieldValue::Text(self.name.clone())),
            "username" => Some(FieldValue::Text(self.username.clone())),
            "email" => Some(FieldValue::Text(self.email.clone())),
            "phone" => self.phone.clone().map(FieldValue::Text),
            "role" => Some(FieldValue::Text(self.role.clone())),
            "status" => Some(FieldValue::from(self.status_label())),
            "active" => Some(FieldValue::Flag(self.is_active)),
            _ => None,
        }
    }

    fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}

impl Resource for User {
    const PATH: &'static str = "users";
    const LABEL: &'static str = "User";
    const SOFT_DELETE: bool = true;
}
