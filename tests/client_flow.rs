//! End-to-end: the auth session and chat client against a live server

use std::sync::Arc;
use std::time::Duration;

use readefy::build_router;
use readefy::client::{AuthSession, ChatClient, ClientError, TOKEN_KEY, USER_NAME_KEY};
use readefy::config::Config;
use readefy::db::{initialize_schema, MessageRepository};
use readefy::state::AppState;
use readefy::storage::{KeyValueStore, MemoryStore};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

struct TestApp {
    api_url: String,
    pool: SqlitePool,
}

async fn spawn_app(token_ttl_days: i64) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    initialize_schema(&pool).await.unwrap();

    let mut config = Config::default();
    config.auth.bcrypt_cost = 4;
    config.auth.token_ttl_days = token_ttl_days;
    let app = build_router(AppState::new(config, pool.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        api_url: format!("http://{}/api", addr),
        pool,
    }
}

fn session(app: &TestApp, storage: &MemoryStore) -> AuthSession {
    AuthSession::new(app.api_url.clone(), Arc::new(storage.clone()))
}

#[tokio::test]
async fn test_signup_login_logout_restore() {
    let app = spawn_app(7).await;
    let storage = MemoryStore::new();
    let auth = session(&app, &storage);

    let user = auth
        .signup("reader@example.com", "secret1", "Reader", Some("REG-7"))
        .await
        .unwrap();
    assert_eq!(user.name, "Reader");
    assert!(auth.is_authenticated());
    assert_eq!(
        storage.get(USER_NAME_KEY).await.unwrap().as_deref(),
        Some("Reader")
    );

    // A fresh session picks the stored token up again
    let restored = session(&app, &storage);
    assert_eq!(restored.restore().await, Some(user.clone()));

    auth.logout().await;
    assert!(!auth.is_authenticated());
    assert!(!storage.contains_key(TOKEN_KEY));
    assert!(!storage.contains_key(USER_NAME_KEY));

    let err = auth.login("reader@example.com", "wrong-pass").await.unwrap_err();
    assert!(matches!(
        &err,
        ClientError::Api { status: 401, message } if message == "Incorrect password."
    ));

    let again = auth.login("reader@example.com", "secret1").await.unwrap();
    assert_eq!(again, user);
}

#[tokio::test]
async fn test_duplicate_signup_surfaces_server_message() {
    let app = spawn_app(7).await;
    let auth = session(&app, &MemoryStore::new());
    auth.signup("dup@example.com", "secret1", "One", None)
        .await
        .unwrap();

    let err = auth
        .signup("dup@example.com", "secret1", "Two", None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.to_string(), "This email is already taken.");
}

#[tokio::test]
async fn test_restore_drops_rejected_token() {
    let app = spawn_app(7).await;
    let storage = MemoryStore::new();
    storage.set(TOKEN_KEY, "forged.token.value").await.unwrap();
    storage.set(USER_NAME_KEY, "Mallory").await.unwrap();

    let auth = session(&app, &storage);
    assert!(auth.restore().await.is_none());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_chat_send_and_fetch_oldest_first() {
    let app = spawn_app(7).await;
    let auth = session(&app, &MemoryStore::new());
    auth.signup("chatter@example.com", "secret1", "Chatter", None)
        .await
        .unwrap();

    let chat = ChatClient::new(auth, 2);
    for text in ["first", "second", "third"] {
        let sent = chat.send(text).await.unwrap();
        assert_eq!(sent.message, text);
        assert_eq!(sent.user_name, "Chatter");
    }

    // The refresh after the last send published the newest page
    let texts: Vec<String> = chat.messages().into_iter().map(|m| m.message).collect();
    assert_eq!(texts, vec!["second", "third"]);

    let older: Vec<String> = chat
        .fetch(2)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message)
        .collect();
    assert_eq!(older, vec!["first"]);
}

#[tokio::test]
async fn test_oversized_message_never_reaches_server() {
    let app = spawn_app(7).await;
    let auth = session(&app, &MemoryStore::new());
    auth.signup("long@example.com", "secret1", "Long", None)
        .await
        .unwrap();

    let chat = ChatClient::new(auth, 50);
    let err = chat.send(&"x".repeat(1001)).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let count = MessageRepository::new(&app.pool).count().await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_rejected_token_on_send_signs_out() {
    // Tokens are issued already expired
    let app = spawn_app(-1).await;
    let storage = MemoryStore::new();
    let auth = session(&app, &storage);
    auth.signup("expired@example.com", "secret1", "Expired", None)
        .await
        .unwrap();
    assert!(auth.is_authenticated());

    let chat = ChatClient::new(auth.clone(), 50);
    let err = chat.send("hello").await.unwrap_err();
    assert!(matches!(err, ClientError::NotAuthenticated));
    assert!(!auth.is_authenticated());
    assert!(!storage.contains_key(TOKEN_KEY));
}

#[tokio::test]
async fn test_poller_publishes_new_messages() {
    let app = spawn_app(7).await;
    let auth = session(&app, &MemoryStore::new());
    auth.signup("poll@example.com", "secret1", "Poller", None)
        .await
        .unwrap();

    // A second client writes; the first one only polls
    let writer = ChatClient::new(auth.clone(), 50);
    let reader = ChatClient::new(auth, 50).with_poll_interval(Duration::from_millis(50));
    let mut rx = reader.subscribe();
    let poller = reader.start_polling();

    writer.send("ping").await.unwrap();

    let seen = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            if rx.borrow().iter().any(|m| m.message == "ping") {
                break;
            }
        }
    })
    .await;
    assert!(seen.is_ok());
    drop(poller);
}
