use std::collections::BTreeSet;
use tracing::instrument;

use crate::api::model::{StockChange, StockOperation};
use crate::api::{ResourceService, StockService};
use crate::listview::{ListController, ListError, ListSettings};
use crate::model::{Product, LOW_STOCK_THRESHOLD};
use crate::validate::ValidationError;

/// Admin product list with stock adjustments.
pub struct ProductsScreen<S>
where
    S: ResourceService<Product> + StockService + Clone,
{
    list: ListController<Product, S>,
    stock: S,
}

impl<S> ProductsScreen<S>
where
    S: ResourceService<Product> + StockService + Clone,
{
    pub fn new(service: S, settings: ListSettings) -> Self {
        Self {
            stock: service.clone(),
            list: ListController::new(service, settings),
        }
    }

    pub fn list(&self) -> &ListController<Product, S> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<Product, S> {
        &mut self.list
    }

    /// Distinct category names for the category filter, sorted.
    pub fn category_options(&self) -> Vec<String> {
        self.list
            .collection()
            .items()
            .iter()
            .map(|p| p.category.clone())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn low_stock(&self) -> Vec<&Product> {
        self.list
            .collection()
            .items()
            .iter()
            .filter(|p| p.is_active && p.stock < LOW_STOCK_THRESHOLD)
            .collect()
    }

    /// `Add` changes stock by `amount` (may be negative), `Set` replaces it.
    #[instrument(skip_all, fields(id = %id, amount, ?operation))]
    pub async fn adjust_stock(
        &mut self,
        id: &str,
        amount: i64,
        operation: StockOperation,
    ) -> Result<(), ListError> {
        let current = match self.list.collection().get(id) {
            Some(product) => product.stock,
            None => return Err(self.list.reject(ListError::UnknownItem(id.to_string()))),
        };
        let resulting = match operation {
            StockOperation::Add => current.saturating_add(amount),
            StockOperation::Set => amount,
        };
        if operation == StockOperation::Add && amount == 0 {
            let err = ValidationError::new("stock", "amount must not be zero");
            return Err(self.list.reject(err.into()));
        }
        if resulting < 0 {
            let err = ValidationError::new("stock", "stock cannot go below zero");
            return Err(self.list.reject(err.into()));
        }

        let change = StockChange {
            stock: amount,
            operation,
        };
        let call = self.stock.adjust_stock(id, change);
        self.list
            .apply_mutation(call, "Stock updated successfully")
            .await
    }
}
