//! Wire shapes of the back-office REST API.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Paging metadata some list endpoints attach; informational only.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub per_page: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u64,
}

#[derive(Deserialize, Debug)]
pub struct PagedItems<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub metadata: Option<PageMetadata>,
}

/// `GET /{resource}` answers either with a bare array or with the
/// `{success, message, data}` envelope.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ListBody<T> {
    Bare(Vec<T>),
    Paged { data: PagedItems<T> },
    Wrapped { data: Vec<T> },
}

impl<T> ListBody<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) => items,
            ListBody::Paged { data } => data.items,
            ListBody::Wrapped { data } => data,
        }
    }
}

/// Single-item responses: `{data: item}`, the bare item, `{message}`, or any
/// other acknowledgement body.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ItemBody<T> {
    Wrapped {
        data: T,
        #[serde(default)]
        message: Option<String>,
    },
    Bare(T),
    Message {
        message: String,
    },
    Other(Value),
}

/// Outcome of a create or update call.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
    /// The server echoed the stored record.
    Saved(T),
    /// The server only acknowledged; the caller has to re-fetch.
    Acknowledged { message: Option<String> },
}

impl<T> From<ItemBody<T>> for Mutation<T> {
    fn from(body: ItemBody<T>) -> Self {
        match body {
            ItemBody::Wrapped { data, .. } => Mutation::Saved(data),
            ItemBody::Bare(item) => Mutation::Saved(item),
            ItemBody::Message { message } => Mutation::Acknowledged {
                message: Some(message),
            },
            ItemBody::Other(_) => Mutation::Acknowledged { message: None },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Canonical `POST /auth/login` contract (flat envelope).
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl LoginResponse {
    /// `userId` wins over `id` when both are present.
    pub fn account_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .or(self.id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub old_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Add,
    Set,
}

/// Body of `PATCH /products/{id}/stock`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub stock: i64,
    pub operation: StockOperation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use serde_json::json;

    #[test]
    fn list_body_accepts_all_envelopes() {
        let bare: ListBody<Category> =
            serde_json::from_value(json!([{ "name": "Meja" }])).unwrap();
        assert_eq!(bare.into_items().len(), 1);

        let paged: ListBody<Category> = serde_json::from_value(json!({
            "success": true,
            "message": "ok",
            "data": {
                "items": [{ "name": "Meja" }, { "name": "Kursi" }],
                "metadata": { "page": 1, "per_page": 10, "total": 2, "total_pages": 1 }
            }
        }))
        .unwrap();
        assert_eq!(paged.into_items().len(), 2);

        let wrapped: ListBody<Category> =
            serde_json::from_value(json!({ "data": [{ "name": "Rak" }] })).unwrap();
        assert_eq!(wrapped.into_items()[0].name, "Rak");
    }

    #[test]
    fn item_body_message_only_is_an_acknowledgement() {
        let body: ItemBody<Category> =
            serde_json::from_value(json!({ "message": "Kategori ditambahkan" })).unwrap();
        assert_eq!(
            Mutation::from(body),
            Mutation::Acknowledged {
                message: Some("Kategori ditambahkan".into())
            }
        );

        let body: ItemBody<Category> = serde_json::from_value(json!({
            "success": true,
            "message": "created",
            "data": { "_id": "c9", "name": "Lemari" }
        }))
        .unwrap();
        match Mutation::from(body) {
            Mutation::Saved(c) => assert_eq!(c.id.as_deref(), Some("c9")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn login_response_rejects_nested_envelope() {
        let nested = json!({
            "success": true,
            "data": { "token": "t", "user": { "role": { "name": "admin" } } }
        });
        assert!(serde_json::from_value::<LoginResponse>(nested).is_err());

        let flat: LoginResponse = serde_json::from_value(json!({
            "token": "t", "role": "admin", "name": "Budi", "id": "u7"
        }))
        .unwrap();
        assert_eq!(flat.account_id(), Some("u7"));
    }

    #[test]
    fn stock_change_serializes_operation_lowercase() {
        let body = serde_json::to_value(StockChange {
            stock: 4,
            operation: StockOperation::Add,
        })
        .unwrap();
        assert_eq!(body, json!({ "stock": 4, "operation": "add" }));
    }
}
