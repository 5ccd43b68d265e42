#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use watchd_client::client::ApiClient;
use watchd_client::config::ClientOptions;
use watchd_client::rooms::Room;
use watchd_client::store::{
    CredentialStore, MemoryCredentialStore, GUEST_KEY, TOKEN_KEY, USER_ID_KEY, USER_NAME_KEY,
};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";
pub const ROOM_ID: i64 = 7;

pub fn init_tracing() {
    dotenv::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn options(server: &MockServer) -> ClientOptions {
    ClientOptions::default()
        .with_api_base_url(&server.uri())
        .with_min_loading_duration(None)
}

/// Store holding a persisted session for user 1
pub fn signed_in_store() -> Arc<MemoryCredentialStore> {
    let store = MemoryCredentialStore::new();
    store.save(TOKEN_KEY, TOKEN).unwrap();
    store.save(USER_ID_KEY, "1").unwrap();
    store.save(USER_NAME_KEY, "Ada").unwrap();
    store.save(GUEST_KEY, "false").unwrap();
    Arc::new(store)
}

pub fn signed_in_api(server: &MockServer) -> ApiClient {
    init_tracing();
    ApiClient::new(options(server), signed_in_store()).unwrap()
}

pub fn signed_out_api(server: &MockServer) -> ApiClient {
    init_tracing();
    ApiClient::new(options(server), Arc::new(MemoryCredentialStore::new())).unwrap()
}

pub fn movie_json(id: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Movie {}", id),
        "overview": "",
        "poster_path": format!("/poster-{}.jpg", id),
        "release_date": "2001-01-01",
        "vote_average": 7.1,
        "streaming_options": [{
            "monetization_type": "flatrate",
            "presentation_type": "hd",
            "package": {"clear_name": "Netflix"}
        }]
    })
}

/// Feed page with movies `first..first + count`
pub fn feed_page(page: u32, first: i64, count: i64) -> Value {
    let movies: Vec<Value> = (first..first + count).map(movie_json).collect();
    json!({"page": page, "movies": movies})
}

pub fn room_json(id: i64, code: &str, status: &str) -> Value {
    json!({
        "id": id,
        "code": code,
        "created_by": 1,
        "created_at": "2024-05-01T12:00:00Z",
        "name": null,
        "status": status,
        "filters": null,
        "last_activity_at": "2024-05-02T08:30:00Z"
    })
}

pub fn room(id: i64) -> Room {
    serde_json::from_value(room_json(id, "AB12CD", "active")).unwrap()
}

pub fn auth_json(token: &str, id: i64, name: &str, email: Option<&str>, is_guest: bool) -> Value {
    json!({
        "token": token,
        "user": {"id": id, "name": name, "email": email, "is_guest": is_guest}
    })
}

pub fn swipe_json(movie_id: i64, direction: &str) -> Value {
    json!({
        "swipe": {"user_id": 1, "movie_id": movie_id, "room_id": ROOM_ID, "direction": direction},
        "match": null
    })
}
