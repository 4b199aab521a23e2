//! Screens built on the generic list controller.
use crate::listview::ListController;
use crate::model::Category;

pub mod catalog;
pub mod products;
pub mod profile;
pub mod users;

pub use catalog::{related_products, CatalogScreen, ProductDetail, RELATED_LIMIT};
pub use products::ProductsScreen;
pub use profile::{ProfileError, ProfileForm, ProfileScreen};
pub use users::UsersScreen;

/// Categories need nothing beyond the generic list behaviour.
pub type CategoriesScreen<S> = ListController<Category, S>;
