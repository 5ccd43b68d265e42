mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use serde_json::json;
use watchd_client::auth::{SessionEvent, SessionManager};
use watchd_client::client::ApiClient;
use watchd_client::error::Error;
use watchd_client::store::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, GUEST_KEY, TOKEN_KEY,
    USER_EMAIL_KEY, USER_ID_KEY, USER_NAME_KEY,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_restore_persisted_session() {
    let server = MockServer::start().await;
    let session = SessionManager::new(signed_in_api(&server));

    let current = session.current().expect("session should be restored");
    assert_eq!(current.token, TOKEN);
    assert_eq!(current.user.id, 1);
    assert_eq!(current.user.name, "Ada");
    assert!(!current.user.is_guest);
}

#[tokio::test]
async fn test_login_persists_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_json(
            "fresh-token",
            3,
            "Ada",
            Some("ada@example.com"),
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api);
    let mut events = session.events();
    assert!(!session.is_authenticated());

    let user = session.login("ada@example.com", "hunter22").await.unwrap();

    assert_eq!(user.id, 3);
    assert_eq!(store.load(TOKEN_KEY).as_deref(), Some("fresh-token"));
    assert_eq!(store.load(USER_EMAIL_KEY).as_deref(), Some("ada@example.com"));
    assert_eq!(store.load(GUEST_KEY).as_deref(), Some("false"));
    assert!(session.is_authenticated());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedIn(user));
}

#[tokio::test]
async fn test_bad_credentials_do_not_expire_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = signed_out_api(&server);
    let mut unauthorized = api.on_unauthorized();
    let session = SessionManager::new(api);

    let result = session.login("ada@example.com", "wrong").await;

    assert!(matches!(result, Err(Error::Server { status: 401, .. })));
    assert_eq!(session.state().error.as_deref(), Some("Invalid credentials"));
    assert!(unauthorized.try_recv().is_err());
}

#[tokio::test]
async fn test_guest_then_upgrade() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/guest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_json("guest-token", 5, "Guest 4821", None, true)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/upgrade"))
        .and(header("Authorization", "Bearer guest-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_json(
            "member-token",
            5,
            "Guest 4821",
            Some("new@example.com"),
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api);

    let guest = session.guest_login().await.unwrap();
    assert!(guest.is_guest);
    assert_eq!(store.load(GUEST_KEY).as_deref(), Some("true"));
    assert_eq!(store.load(USER_EMAIL_KEY), None);

    let member = session
        .upgrade_account("new@example.com", "hunter22")
        .await
        .unwrap();
    assert!(!member.is_guest);
    assert_eq!(store.load(TOKEN_KEY).as_deref(), Some("member-token"));
    assert_eq!(store.load(GUEST_KEY).as_deref(), Some("false"));
}

#[tokio::test]
async fn test_update_name_persists() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/me"))
        .and(body_json(json!({"name": "Grace"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": 1, "name": "Grace", "email": null, "is_guest": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api);

    session.update_name("  Grace ").await.unwrap();

    assert_eq!(store.load(USER_NAME_KEY).as_deref(), Some("Grace"));
    assert_eq!(session.current().unwrap().user.name, "Grace");
    assert!(session.update_name("   ").await.is_err());
}

#[tokio::test]
async fn test_password_reset_returns_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(json!({"email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Mail sent"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({"token": "reset-1", "newPassword": "hunter23"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Password updated"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionManager::new(signed_out_api(&server));

    assert_eq!(
        session.forgot_password(" ada@example.com ").await.unwrap(),
        "Mail sent"
    );
    assert_eq!(
        session.reset_password("reset-1", "hunter23").await.unwrap(),
        "Password updated"
    );
}

#[tokio::test]
async fn test_logout_clears_credentials() {
    let server = MockServer::start().await;
    let store = signed_in_store();
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api);
    let mut events = session.events();

    session.logout().await;

    assert!(!session.is_authenticated());
    assert_eq!(store.load(TOKEN_KEY), None);
    assert_eq!(store.load(USER_NAME_KEY), None);
    assert_eq!(events.recv().await.unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn test_concurrent_unauthorized_expires_session_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(50)))
        .expect(3)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api.clone());
    let mut events = session.events();
    let listener = session.spawn_unauthorized_listener();

    let (a, b, c) = tokio::join!(api.get_rooms(), api.get_rooms(), api.get_rooms());
    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert!(c.unwrap_err().is_unauthorized());

    let first = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("no session event")
        .unwrap();
    assert_eq!(first, SessionEvent::Expired);
    assert!(
        tokio::time::timeout(Duration::from_millis(200), events.recv())
            .await
            .is_err(),
        "session expired more than once"
    );

    assert!(!session.is_authenticated());
    assert_eq!(store.load(TOKEN_KEY), None);
    assert_eq!(
        session.state().error.as_deref(),
        Some("Session expired. Please log in again.")
    );
    listener.abort();
}

#[tokio::test]
async fn test_handle_unauthorized_tears_down_once() {
    let server = MockServer::start().await;
    let session = SessionManager::new(signed_in_api(&server));

    let (a, b, c) = tokio::join!(
        session.handle_unauthorized(TOKEN),
        session.handle_unauthorized(TOKEN),
        session.handle_unauthorized(TOKEN)
    );

    assert_eq!([a, b, c].iter().filter(|torn_down| **torn_down).count(), 1);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"name": "Ada", "email": "ada@example.com", "password": "hunter22"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(auth_json(
            "file-token",
            8,
            "Ada",
            Some("ada@example.com"),
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("credentials.json");

    {
        let store = Arc::new(FileCredentialStore::open(&file).unwrap());
        let session = SessionManager::new(ApiClient::new(options(&server), store).unwrap());
        session
            .register("Ada", "ada@example.com", "hunter22")
            .await
            .unwrap();
    }

    let store = Arc::new(FileCredentialStore::open(&file).unwrap());
    let session = SessionManager::new(ApiClient::new(options(&server), store).unwrap());
    let restored = session.current().expect("session should survive a restart");
    assert_eq!(restored.token, "file-token");
    assert_eq!(restored.user.id, 8);
}

#[tokio::test]
async fn test_restore_rereads_store() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryCredentialStore::new());
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api);
    assert!(session.restore().is_none());

    for (key, value) in [(TOKEN_KEY, "late-token"), (USER_ID_KEY, "4"), (USER_NAME_KEY, "Bo")] {
        store.save(key, value).unwrap();
    }

    let restored = session.restore().expect("session should be restored");
    assert_eq!(restored.token, "late-token");
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_late_unauthorized_keeps_newer_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(auth_json(
            "fresh-token",
            1,
            "Ada",
            Some("ada@example.com"),
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let session = SessionManager::new(api);
    session.login("ada@example.com", "hunter22").await.unwrap();

    // A 401 for a request sent under the previous token arrives late.
    assert!(!session.handle_unauthorized(TOKEN).await);

    assert_eq!(session.current().unwrap().token, "fresh-token");
    assert_eq!(store.load(TOKEN_KEY).as_deref(), Some("fresh-token"));
    assert!(session.state().error.is_none());
}

#[tokio::test]
async fn test_unauthorized_clears_token_without_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rooms"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(TOKEN_KEY, TOKEN).unwrap();
    store.save(USER_ID_KEY, "not-a-number").unwrap();
    let api = ApiClient::new(options(&server), store.clone()).unwrap();
    let mut signals = api.on_unauthorized();
    let session = SessionManager::new(api.clone());
    assert!(!session.is_authenticated());

    assert!(api.get_rooms().await.unwrap_err().is_unauthorized());
    let token = signals.recv().await.unwrap();
    assert_eq!(token, TOKEN);

    assert!(!session.handle_unauthorized(&token).await);
    assert_eq!(store.load(TOKEN_KEY), None);
    assert_eq!(store.load(USER_ID_KEY), None);
}

/// Store whose writes of the display name fail
struct NameWriteFails(MemoryCredentialStore);

impl CredentialStore for NameWriteFails {
    fn save(&self, key: &str, value: &str) -> watchd_client::error::Result<()> {
        if key == USER_NAME_KEY {
            return Err(Error::store("disk full"));
        }
        self.0.save(key, value)
    }

    fn load(&self, key: &str) -> Option<String> {
        self.0.load(key)
    }

    fn delete(&self, key: &str) {
        self.0.delete(key)
    }
}

#[tokio::test]
async fn test_update_name_store_failure_clears_loading() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"id": 1, "name": "Grace", "email": null, "is_guest": false}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let inner = MemoryCredentialStore::new();
    inner.save(TOKEN_KEY, TOKEN).unwrap();
    inner.save(USER_ID_KEY, "1").unwrap();
    inner.save(USER_NAME_KEY, "Ada").unwrap();
    let store = Arc::new(NameWriteFails(inner));
    let session = SessionManager::new(ApiClient::new(options(&server), store).unwrap());

    let result = session.update_name("Grace").await;

    assert!(matches!(result, Err(Error::Store(_))));
    let state = session.state();
    assert!(!state.is_loading);
    assert!(state.error.is_some());
}
