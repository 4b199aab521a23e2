use crate::api::ResourceService;
use crate::listview::{ListController, ListError, ListSettings, View, ALL};
use crate::model::{DeleteMode, Role, User};

/// Admin user management. Delete deactivates; `remove` deletes permanently.
pub struct UsersScreen<S: ResourceService<User>> {
    list: ListController<User, S>,
}

impl<S: ResourceService<User>> UsersScreen<S> {
    pub fn new(service: S, settings: ListSettings) -> Self {
        Self {
            list: ListController::new(service, settings),
        }
    }

    pub fn list(&self) -> &ListController<User, S> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut ListController<User, S> {
        &mut self.list
    }

    pub async fn deactivate(&mut self, id: &str) -> Result<(), ListError> {
        self.list.delete(id, DeleteMode::Soft).await
    }

    pub async fn remove(&mut self, id: &str) -> Result<(), ListError> {
        self.list.delete(id, DeleteMode::Hard).await
    }

    /// `None` shows every role.
    pub fn filter_role(&mut self, role: Option<Role>) -> View<User> {
        self.list
            .set_filter("role", role.map_or(ALL, |r| r.as_str()))
    }

    pub fn count_by_role(&self, role: Role) -> usize {
        self.list
            .collection()
            .items()
            .iter()
            .filter(|u| u.role() == Some(role))
            .count()
    }
}
