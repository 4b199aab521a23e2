#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use furniture_admin::api::model::{LoginResponse, Mutation, StockChange, StockOperation};
use furniture_admin::api::{ApiError, AuthService, ResourceService, StockService};
use furniture_admin::model::{Category, DeleteMode, Product, Resource, User};
use serde_json::json;
use tokio::sync::{Mutex, Notify};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Fetch(String),
    Create,
    Update(String),
    Delete(String, DeleteMode),
    Stock(String, i64, StockOperation),
    Login(String),
    ChangePassword,
}

/// In-memory stand-in for one REST collection that records every call.
#[derive(Clone)]
pub struct RecordingApi<R> {
    items: Arc<Mutex<Vec<R>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    fail_list: Arc<Mutex<bool>>,
    acknowledge_only: Arc<Mutex<bool>>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
    next_id: Arc<Mutex<u32>>,
}

impl<R: Resource> RecordingApi<R> {
    pub fn with_items(items: Vec<R>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            calls: Arc::default(),
            failing: Arc::default(),
            fail_list: Arc::default(),
            acknowledge_only: Arc::default(),
            gate: Arc::default(),
            next_id: Arc::default(),
        }
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, call: &Call) -> usize {
        self.calls.lock().await.iter().filter(|c| *c == call).count()
    }

    pub async fn stored(&self) -> Vec<R> {
        self.items.lock().await.clone()
    }

    pub async fn push_server_side(&self, item: R) {
        self.items.lock().await.push(item);
    }

    /// Mutations on `id` fail with a server error.
    pub async fn fail_on(&self, id: &str) {
        self.failing.lock().await.insert(id.to_string());
    }

    pub async fn fail_list(&self, fail: bool) {
        *self.fail_list.lock().await = fail;
    }

    /// Create/update answer with `{message}` only.
    pub async fn acknowledge_only(&self) {
        *self.acknowledge_only.lock().await = true;
    }

    /// `list` waits for a permit on `gate` from now on.
    pub async fn gate_list(&self, gate: Arc<Notify>) {
        *self.gate.lock().await = Some(gate);
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    async fn is_failing(&self, id: &str) -> bool {
        self.failing.lock().await.contains(id)
    }

    async fn respond(&self, item: R) -> Mutation<R> {
        if *self.acknowledge_only.lock().await {
            Mutation::Acknowledged {
                message: Some(format!("{} saved", R::LABEL)),
            }
        } else {
            Mutation::Saved(item)
        }
    }
}

fn with_id<R: Resource>(item: &R, id: &str) -> R {
    let mut value = serde_json::to_value(item).unwrap();
    value["id"] = json!(id);
    serde_json::from_value(value).unwrap()
}

#[async_trait]
impl<R: Resource> ResourceService<R> for RecordingApi<R> {
    async fn list(&self) -> Result<Vec<R>, ApiError> {
        self.record(Call::List).await;
        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if *self.fail_list.lock().await {
            return Err(ApiError::Transport("connection refused".into()));
        }
        Ok(self.items.lock().await.clone())
    }

    async fn fetch(&self, id: &str) -> Result<R, ApiError> {
        self.record(Call::Fetch(id.to_string())).await;
        self.items
            .lock()
            .await
            .iter()
            .find(|item| item.id() == Some(id))
            .cloned()
            .ok_or_else(|| ApiError::from_response(404, ""))
    }

    async fn create(&self, item: &R) -> Result<Mutation<R>, ApiError> {
        self.record(Call::Create).await;
        let id = {
            let mut next = self.next_id.lock().await;
            *next += 1;
            format!("new-{}", *next)
        };
        let stored = with_id(item, &id);
        self.items.lock().await.push(stored.clone());
        Ok(self.respond(stored).await)
    }

    async fn update(&self, id: &str, item: &R) -> Result<Mutation<R>, ApiError> {
        self.record(Call::Update(id.to_string())).await;
        if self.is_failing(id).await {
            return Err(ApiError::from_response(409, r#"{"message":"Data sudah dipakai"}"#));
        }
        let stored = with_id(item, id);
        let mut items = self.items.lock().await;
        match items.iter_mut().find(|x| x.id() == Some(id)) {
            Some(slot) => *slot = stored.clone(),
            None => return Err(ApiError::from_response(404, "")),
        }
        drop(items);
        Ok(self.respond(stored).await)
    }

    async fn delete(&self, id: &str, mode: DeleteMode) -> Result<(), ApiError> {
        self.record(Call::Delete(id.to_string(), mode)).await;
        if self.is_failing(id).await {
            return Err(ApiError::from_response(
                500,
                r#"{"message":"cannot delete record"}"#,
            ));
        }
        let mut items = self.items.lock().await;
        match mode {
            DeleteMode::Soft => {
                if let Some(item) = items.iter_mut().find(|x| x.id() == Some(id)) {
                    item.set_active(false);
                }
            }
            DeleteMode::Hard => items.retain(|x| x.id() != Some(id)),
        }
        Ok(())
    }
}

#[async_trait]
impl StockService for RecordingApi<Product> {
    async fn adjust_stock(
        &self,
        id: &str,
        change: StockChange,
    ) -> Result<Mutation<Product>, ApiError> {
        self.record(Call::Stock(id.to_string(), change.stock, change.operation))
            .await;
        let mut items = self.items.lock().await;
        let product = items
            .iter_mut()
            .find(|p| p.id.as_deref() == Some(id))
            .ok_or_else(|| ApiError::from_response(404, ""))?;
        match change.operation {
            StockOperation::Add => product.stock += change.stock,
            StockOperation::Set => product.stock = change.stock,
        }
        Ok(Mutation::Saved(product.clone()))
    }
}

#[async_trait]
impl AuthService for RecordingApi<User> {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.record(Call::Login(username.to_string())).await;
        let users = self.items.lock().await;
        let user = users
            .iter()
            .find(|u| u.username == username && u.password.as_deref() == Some(password))
            .ok_or_else(|| {
                ApiError::from_response(401, r#"{"message":"Username atau password salah"}"#)
            })?;
        Ok(LoginResponse {
            token: unsigned_token(r#"{"sub":"x"}"#),
            role: user.role.clone(),
            name: Some(user.name.clone()),
            username: Some(user.username.clone()),
            user_id: user.id.clone(),
            id: None,
        })
    }

    async fn change_password(
        &self,
        old_password: &str,
        _new_password: &str,
    ) -> Result<(), ApiError> {
        self.record(Call::ChangePassword).await;
        if old_password == "wrong-password" {
            return Err(ApiError::from_response(400, r#"{"message":"Password lama salah"}"#));
        }
        Ok(())
    }
}

/// JWT-shaped token with the given claims and a dummy signature.
pub fn unsigned_token(claims: &str) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.signature",
        URL_SAFE_NO_PAD.encode(claims.as_bytes())
    )
}

pub fn product(id: &str, name: &str, category: &str, stock: i64, price: f64) -> Product {
    Product {
        id: Some(id.to_string()),
        name: name.to_string(),
        description: String::new(),
        category: category.to_string(),
        price,
        stock,
        unit: "pcs".to_string(),
        is_active: true,
        image_url: None,
        rating: None,
        sold: 0,
    }
}

pub fn products() -> Vec<Product> {
    vec![
        product("p1", "Meja Makan Kayu Jati", "Meja", 2, 3_400_000.0),
        product("p2", "Tempat Tidur Queen Size", "Tempat Tidur", 4, 6_700_000.0),
        product("p3", "Lemari Baju", "Lemari", 8, 600_000.0),
        product("p4", "Kursi Ergonomis", "Kursi", 20, 300_000.0),
        product("p5", "Lemari Pakaian 3 Pintu", "Lemari", 15, 750_000.0),
        product("p6", "Rak Buku Minimalis", "Rak", 29, 800_000.0),
        product("p7", "Meja Belajar Anak", "Meja", 12, 1_150_000.0),
    ]
}

pub fn category(id: &str, name: &str, product_count: u64) -> Category {
    Category {
        id: Some(id.to_string()),
        name: name.to_string(),
        product_count,
        ..Category::blank()
    }
}

pub fn user(id: &str, name: &str, username: &str, role: &str) -> User {
    User {
        id: Some(id.to_string()),
        name: name.to_string(),
        username: username.to_string(),
        email: format!("{}@furniture.com", username),
        phone: Some("081234567890".to_string()),
        role: role.to_string(),
        is_active: true,
        password: None,
    }
}
