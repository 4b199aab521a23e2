//! Route table and role-based guards.
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, warn};

use crate::api::AuthService;
use crate::model::Role;
use crate::session::{self, AuthError, Session, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    AdminDashboard,
    ProductList,
    CategoryManagement,
    UserManagement,
    Statistics,
    Reports,
    AdminProfile,
    AdminSettings,
    Catalog,
    ProductDetail(String),
    UserProfile,
    UserSettings,
}

impl Route {
    /// Unknown paths resolve to `Login`.
    pub fn parse(path: &str) -> Route {
        let segments: Vec<&str> = path
            .split('?')
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            ["admin"] | ["admin", "admin-dashboard"] => Route::AdminDashboard,
            ["admin", "product-list"] => Route::ProductList,
            ["admin", "category-management"] => Route::CategoryManagement,
            ["admin", "user-management"] => Route::UserManagement,
            ["admin", "statistics"] => Route::Statistics,
            ["admin", "reports"] => Route::Reports,
            ["admin", "profile"] => Route::AdminProfile,
            ["admin", "settings"] => Route::AdminSettings,
            ["user"] | ["user", "user-view"] => Route::Catalog,
            ["user", "product-detail", id] => Route::ProductDetail(id.to_string()),
            ["user", "profile"] => Route::UserProfile,
            ["user", "settings"] => Route::UserSettings,
            _ => Route::Login,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::AdminDashboard => "/admin/admin-dashboard".to_string(),
            Route::ProductList => "/admin/product-list".to_string(),
            Route::CategoryManagement => "/admin/category-management".to_string(),
            Route::UserManagement => "/admin/user-management".to_string(),
            Route::Statistics => "/admin/statistics".to_string(),
            Route::Reports => "/admin/reports".to_string(),
            Route::AdminProfile => "/admin/profile".to_string(),
            Route::AdminSettings => "/admin/settings".to_string(),
            Route::Catalog => "/user/user-view".to_string(),
            Route::ProductDetail(id) => format!("/user/product-detail/{}", id),
            Route::UserProfile => "/user/profile".to_string(),
            Route::UserSettings => "/user/settings".to_string(),
        }
    }

    /// `None` for routes open to everyone.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Login => None,
            Route::AdminDashboard
            | Route::ProductList
            | Route::CategoryManagement
            | Route::UserManagement
            | Route::Statistics
            | Route::Reports
            | Route::AdminProfile
            | Route::AdminSettings => Some(Role::Admin),
            Route::Catalog
            | Route::ProductDetail(_)
            | Route::UserProfile
            | Route::UserSettings => Some(Role::User),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub fn landing_for(role: Role) -> Route {
    match role {
        Role::Admin => Route::AdminDashboard,
        Role::User => Route::Catalog,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Allow,
    Redirect(Route),
}

pub fn guard(route: &Route, store: &SessionStore, now: DateTime<Utc>) -> Guard {
    let Some(required) = route.required_role() else {
        return Guard::Allow;
    };
    let session = match store.ensure_valid(now) {
        Ok(session) => session,
        Err(err) => {
            debug!(%route, ?err, "not signed in; redirecting to login");
            return Guard::Redirect(Route::Login);
        }
    };
    if session.role == required {
        Guard::Allow
    } else {
        warn!(
            %route,
            expected = required.as_str(),
            actual = session.role.as_str(),
            "role mismatch"
        );
        Guard::Redirect(landing_for(session.role))
    }
}

/// Current route plus guarded transitions.
#[derive(Debug, Clone)]
pub struct Navigator {
    store: SessionStore,
    current: Route,
}

impl Navigator {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            current: Route::Login,
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    /// Follows at most one redirect; returns where we ended up.
    pub fn navigate(&mut self, route: Route, now: DateTime<Utc>) -> &Route {
        self.current = match guard(&route, &self.store, now) {
            Guard::Allow => route,
            Guard::Redirect(target) => target,
        };
        &self.current
    }

    /// Route by the role name the server returned.
    pub fn after_login(&mut self, role_name: &str) -> Result<&Route, AuthError> {
        let role = Role::from_name(role_name)
            .ok_or_else(|| AuthError::UnknownRole(role_name.to_string()))?;
        self.current = landing_for(role);
        Ok(&self.current)
    }

    /// Sign in and move to the role's landing page. On failure the route is
    /// left untouched.
    pub async fn login<A: AuthService + ?Sized>(
        &mut self,
        auth: &A,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = session::login(auth, &self.store, username, password).await?;
        self.current = landing_for(session.role);
        Ok(session)
    }

    pub fn logout(&mut self) {
        self.store.clear();
        self.current = Route::Login;
    }
}
