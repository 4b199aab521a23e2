//! End-user catalog and product detail.
use tracing::{instrument, warn};

use crate::api::{ApiError, ResourceService};
use crate::listview::{ListController, ListError, ListSettings, View};
use crate::model::{Availability, Product};

/// Most related products shown under a detail page.
pub const RELATED_LIMIT: usize = 4;

/// Browsable list of active products.
pub struct CatalogScreen<S: ResourceService<Product>> {
    list: ListController<Product, S>,
}

impl<S: ResourceService<Product>> CatalogScreen<S> {
    pub fn new(service: S, settings: ListSettings) -> Self {
        Self {
            list: ListController::new(service, settings),
        }
    }

    pub async fn mount(&mut self) -> Result<View<Product>, ListError> {
        self.list.mount().await?;
        Ok(self.list.set_filter("active", "true"))
    }

    pub fn unmount(&mut self) {
        self.list.unmount();
    }

    pub fn search(&mut self, text: &str) -> View<Product> {
        self.list.set_search(text)
    }

    pub fn set_page(&mut self, page: usize) -> View<Product> {
        self.list.set_page(page)
    }

    pub fn view(&self) -> View<Product> {
        self.list.view()
    }

    pub fn list(&self) -> &ListController<Product, S> {
        &self.list
    }
}

/// Products in the same category, excluding `product` itself.
pub fn related_products(product: &Product, all: &[Product]) -> Vec<Product> {
    all.iter()
        .filter(|p| p.category == product.category)
        .filter(|p| p.id.is_none() || p.id != product.id)
        .take(RELATED_LIMIT)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductDetail {
    product: Product,
    quantity: i64,
    related: Vec<Product>,
}

impl ProductDetail {
    pub fn new(product: Product, all: &[Product]) -> Self {
        let related = related_products(&product, all);
        Self {
            product,
            quantity: 1,
            related,
        }
    }

    /// Fetch the product, then its related products. A failure on the
    /// second call leaves the related list empty.
    #[instrument(skip(service))]
    pub async fn load<S>(service: &S, id: &str) -> Result<Self, ApiError>
    where
        S: ResourceService<Product> + ?Sized,
    {
        let product = service.fetch(id).await?;
        let all = match service.list().await {
            Ok(all) => all,
            Err(err) => {
                warn!(?err, "failed to load related products");
                Vec::new()
            }
        };
        Ok(Self::new(product, &all))
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn related(&self) -> &[Product] {
        &self.related
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Bounded by stock; returns whether the quantity changed.
    pub fn increment(&mut self) -> bool {
        if self.quantity < self.product.stock {
            self.quantity += 1;
            true
        } else {
            false
        }
    }

    pub fn decrement(&mut self) -> bool {
        if self.quantity > 1 {
            self.quantity -= 1;
            true
        } else {
            false
        }
    }

    pub fn total_price(&self) -> f64 {
        self.product.price * self.quantity as f64
    }

    pub fn in_stock(&self) -> bool {
        self.product.stock > 0
    }

    pub fn availability(&self) -> Availability {
        self.product.availability()
    }
}
