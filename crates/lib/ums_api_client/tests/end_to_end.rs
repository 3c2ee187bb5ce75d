//! End-to-end: the client against the real router on an ephemeral port, with
//! a hand-driven clock so access tokens can be expired on demand.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::net::TcpListener;
use ums_api::config::ApiConfig;
use ums_api::{AppState, router};
use ums_api_client::models::{ImageFile, ListUsersQuery, RegisterRequest, Role, UserForm};
use ums_api_client::{ApiClient, FileStorage, MemoryStorage, SessionEvent, SessionState};
use ums_core::clock::Clock;
use ums_core::images::LocalImageStore;
use ums_core::store::MemoryUserStore;

const SUPER_ADMIN: &str = "root@example.com";

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

struct Server {
    base: String,
    clock: Arc<ManualClock>,
    _uploads: tempfile::TempDir,
}

async fn spawn_server() -> Server {
    let uploads = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: None,
        access_secret: "e2e-access".into(),
        refresh_secret: "e2e-refresh".into(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 21_600,
        refresh_cookie_max_age_secs: 1800,
        super_admin_email: SUPER_ADMIN.into(),
        production: false,
        frontend_url: "http://localhost:5173".into(),
        upload_dir: uploads.path().to_path_buf(),
        public_base_url: base.clone(),
        default_user_password: "HelloWorld@123".into(),
    };
    let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
    let images = Arc::new(LocalImageStore::new(uploads.path(), base.clone()));
    let state = AppState::new(config, Arc::new(MemoryUserStore::new()), images)
        .with_clock(clock.clone());
    let app = router(state);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        base,
        clock,
        _uploads: uploads,
    }
}

fn registration(name: &str, email: &str, mobile: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.into(),
        email: email.into(),
        mobile: mobile.into(),
        password: "Secret@123".into(),
        role: None,
    }
}

#[tokio::test]
async fn expired_access_token_is_refreshed_transparently() {
    let server = spawn_server().await;
    let client = ApiClient::new(&server.base, Arc::new(MemoryStorage::new())).unwrap();
    let mut events = client.subscribe();

    let user = client
        .register(&registration("Asha", "asha@example.com", "9876543210"))
        .await
        .unwrap();
    assert_eq!(client.session().state(), SessionState::Authenticated);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::LoggedIn(user.clone()));
    let first_token = client.session().access_token().unwrap();

    server.clock.advance(Duration::minutes(16));

    let me = client.me().await.unwrap();
    assert_eq!(me.id, user.id);
    let second_token = client.session().access_token().unwrap();
    assert_ne!(first_token, second_token);

    // Past the refresh token's lifetime the session ends.
    server.clock.advance(Duration::hours(7));
    let err = client.get_profile().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(client.session().state(), SessionState::Anonymous);
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Expired {
            message: "Refresh token expired. Please login again.".into()
        }
    );

    // Logging in again re-arms the expiry notification.
    client.login("asha@example.com", "Secret@123").await.unwrap();
    assert_eq!(client.session().state(), SessionState::Authenticated);
}

#[tokio::test]
async fn profile_admin_and_logout_flow() {
    let server = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join("session.json");

    let root = ApiClient::new(&server.base, Arc::new(FileStorage::new(&session_file))).unwrap();
    let root_user = root
        .register(&registration("Root", SUPER_ADMIN, "9000000000"))
        .await
        .unwrap();
    assert_eq!(root_user.role, Role::Admin);
    assert!(session_file.exists());

    let created = root
        .create_user(&UserForm {
            name: Some("Dev".into()),
            email: Some("dev@example.com".into()),
            mobile: Some("9111111111".into()),
            image: Some(ImageFile {
                file_name: "dev.png".into(),
                content_type: "image/png".into(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(created.message, "New user account created successfully.");
    assert!(created.new_user_data.profile_pic.is_some());

    let page = root
        .list_users(&ListUsersQuery {
            search: Some("dev".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.users[0].email, "dev@example.com");

    let dev = ApiClient::new(&server.base, Arc::new(MemoryStorage::new())).unwrap();
    dev.login("dev@example.com", "HelloWorld@123").await.unwrap();
    let updated = dev
        .update_profile(&UserForm {
            name: Some("Developer".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.name, "Developer");
    assert_eq!(dev.session().user().unwrap().name, "Developer");

    let message = dev
        .change_password("HelloWorld@123", "Another@123")
        .await
        .unwrap();
    assert_eq!(message, "Password updated successfully");

    // An ordinary user cannot reach the admin panel, and a 403 never
    // triggers a refresh or ends the session.
    let denied = dev.list_users(&ListUsersQuery::default()).await.unwrap_err();
    assert_eq!(denied.status().map(|s| s.as_u16()), Some(403));
    assert_eq!(dev.session().state(), SessionState::Authenticated);

    let msg = root
        .update_user(
            created.new_user_data.id,
            &UserForm {
                is_blocked: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(msg, "User information updated successfully");

    let msg = root.soft_delete_user(created.new_user_data.id).await.unwrap();
    assert_eq!(msg, "User has been marked as deleted.");
    let msg = root.delete_user(created.new_user_data.id).await.unwrap();
    assert_eq!(msg, "User has been permanently deleted.");

    let bye = root.logout().await.unwrap();
    assert_eq!(bye, "Logged out successfully");
    assert_eq!(root.session().state(), SessionState::Anonymous);
    assert!(!session_file.exists());
}
