mod common;

use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::{unsigned_token, user, Call, RecordingApi};
use furniture_admin::model::{Role, User};
use furniture_admin::nav::{guard, Guard, Navigator, Route};
use furniture_admin::screens::{ProfileError, ProfileForm, ProfileScreen};
use furniture_admin::session::{self, AuthError, Session, SessionStore, DEFAULT_DISPLAY_NAME};
use furniture_admin::validate::PasswordChange;

fn accounts() -> RecordingApi<User> {
    let mut admin = user("u1", "Admin Toko", "admin", "admin");
    admin.password = Some("admin12345".into());
    let mut siti = user("u2", "Siti Rahma", "siti", "user");
    siti.password = Some("siti12345".into());
    let mut ghost = user("u3", "Gudang", "gudang", "warehouse");
    ghost.password = Some("gudang12345".into());
    RecordingApi::with_items(vec![admin, siti, ghost])
}

fn session_with_exp(role: Role, exp: i64) -> Session {
    Session {
        token: unsigned_token(&format!(r#"{{"exp":{}}}"#, exp)),
        role,
        user_id: Some("u1".into()),
        username: "admin".into(),
        name: None,
    }
}

#[tokio::test]
async fn login_routes_by_role() {
    let api = accounts();

    let mut nav = Navigator::new(SessionStore::new());
    nav.login(&api, "admin", "admin12345").await.unwrap();
    assert_eq!(nav.current(), &Route::AdminDashboard);
    assert_eq!(nav.session().role(), Some(Role::Admin));

    let mut nav = Navigator::new(SessionStore::new());
    nav.login(&api, "siti", "siti12345").await.unwrap();
    assert_eq!(nav.current(), &Route::Catalog);
    assert_eq!(nav.session().display_name(), "Siti Rahma");
}

#[tokio::test]
async fn unknown_role_is_an_error_and_starts_no_session() {
    let api = accounts();
    let mut nav = Navigator::new(SessionStore::new());

    let err = nav.login(&api, "gudang", "gudang12345").await.unwrap_err();
    assert_eq!(err, AuthError::UnknownRole("warehouse".into()));
    assert_eq!(nav.current(), &Route::Login);
    assert!(nav.session().current().is_none());
}

#[tokio::test]
async fn rejected_credentials_surface_server_message() {
    let api = accounts();
    let store = SessionStore::new();

    let err = session::login(&api, &store, "admin", "nope").await.unwrap_err();
    assert_eq!(err, AuthError::Rejected("Username atau password salah".into()));
    assert!(store.current().is_none());

    let err = session::login(&api, &store, "  ", "x").await.unwrap_err();
    assert_eq!(err, AuthError::MissingCredentials);
    assert_eq!(api.count(&Call::Login("admin".into())).await, 1);
}

#[test]
fn guard_checks_expiry_and_role() {
    let store = SessionStore::new();
    store.begin(session_with_exp(Role::User, 2_000));
    let before = Utc.timestamp_opt(1_000, 0).unwrap();
    let after = Utc.timestamp_opt(3_000, 0).unwrap();

    assert_eq!(guard(&Route::Catalog, &store, before), Guard::Allow);
    assert_eq!(
        guard(&Route::ProductDetail("p1".into()), &store, before),
        Guard::Allow
    );
    assert_eq!(
        guard(&Route::UserManagement, &store, before),
        Guard::Redirect(Route::Catalog)
    );

    assert_eq!(
        guard(&Route::Catalog, &store, after),
        Guard::Redirect(Route::Login)
    );
    assert!(store.current().is_none());
}

#[test]
fn navigator_applies_guard_and_logout() {
    let store = SessionStore::new();
    store.begin(session_with_exp(Role::Admin, i64::from(i32::MAX)));
    let mut nav = Navigator::new(store.clone());
    let now = Utc.timestamp_opt(1_000, 0).unwrap();

    assert_eq!(nav.navigate(Route::parse("/admin/reports"), now), &Route::Reports);
    assert_eq!(
        nav.navigate(Route::parse("/user/user-view"), now),
        &Route::AdminDashboard
    );

    nav.logout();
    assert_eq!(nav.current(), &Route::Login);
    assert!(store.current().is_none());
    assert_eq!(store.display_name(), DEFAULT_DISPLAY_NAME);
}

#[tokio::test]
async fn profile_save_publishes_display_name() {
    let api = accounts();
    let store = SessionStore::new();
    session::login(&api, &store, "admin", "admin12345")
        .await
        .unwrap();
    let mut names = store.subscribe();
    let mut profile = ProfileScreen::new(api.clone(), store.clone(), Duration::from_secs(3));

    let form = profile.load().await.unwrap().clone();
    assert_eq!(form.email, "admin@furniture.com");
    assert_eq!(api.count(&Call::Fetch("u1".into())).await, 1);

    let edited = ProfileForm {
        name: "Admin Utama".into(),
        ..form
    };
    profile.save(edited).await.unwrap();

    assert_eq!(names.changed().await.as_deref(), Some("Admin Utama"));
    assert_eq!(store.display_name(), "Admin Utama");
    let stored = api.stored().await;
    assert_eq!(stored[0].name, "Admin Utama");
    assert_eq!(stored[0].password, None);
}

#[tokio::test]
async fn profile_rejects_invalid_phone_without_calling_server() {
    let api = accounts();
    let store = SessionStore::new();
    session::login(&api, &store, "siti", "siti12345").await.unwrap();
    let mut profile = ProfileScreen::new(api.clone(), store, Duration::from_secs(3));
    let form = profile.load().await.unwrap().clone();

    let err = profile
        .save(ProfileForm {
            phone: "12345".into(),
            ..form
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ProfileError::Validation(ref v) if v.field == "phone"));
    assert_eq!(api.count(&Call::Update("u2".into())).await, 0);
}

#[tokio::test]
async fn password_change_ends_the_session() {
    let api = accounts();
    let store = SessionStore::new();
    session::login(&api, &store, "admin", "admin12345")
        .await
        .unwrap();
    let mut profile = ProfileScreen::new(api.clone(), store.clone(), Duration::from_secs(3));

    let mismatch = PasswordChange {
        old_password: "admin12345".into(),
        new_password: "Baru12345!".into(),
        confirm_password: "Baru12345?".into(),
    };
    assert!(profile.change_password(mismatch).await.is_err());
    assert_eq!(api.count(&Call::ChangePassword).await, 0);

    let wrong_old = PasswordChange {
        old_password: "wrong-password".into(),
        new_password: "Baru12345!".into(),
        confirm_password: "Baru12345!".into(),
    };
    let err = profile.change_password(wrong_old).await.unwrap_err();
    assert_eq!(err.display_message(), "Password lama salah");
    assert!(store.current().is_some());

    let ok = PasswordChange {
        old_password: "admin12345".into(),
        new_password: "Baru12345!".into(),
        confirm_password: "Baru12345!".into(),
    };
    profile.change_password(ok).await.unwrap();
    assert!(store.current().is_none());
    assert_eq!(
        profile.notice().unwrap().text,
        "Password changed. Please sign in again."
    );
}
