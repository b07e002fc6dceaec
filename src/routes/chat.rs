//! Chat API routes
//!
//! `GET /messages` is public; `POST /messages` needs a bearer token.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::{ChatMessage, MessageRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Longest accepted message, in characters after trimming
pub const MAX_MESSAGE_LEN: usize = 1000;

const DEFAULT_LIMIT: i64 = 50;

/// Create the chat router
pub fn router() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(send_message))
}

/// Paging parameters; unparsable values fall back to the defaults
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListQuery {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|o| *o > 0)
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageList {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: ChatMessage,
}

/// List one page of messages, newest first
async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<MessageList>> {
    let messages = MessageRepository::new(state.db())
        .list_recent(query.limit(), query.offset())
        .await?;
    Ok(Json(MessageList { messages }))
}

/// Trimmed message text, or the validation error to report
pub fn validate_message(message: Option<&serde_json::Value>) -> Result<String> {
    let Some(serde_json::Value::String(text)) = message else {
        return Err(AppError::BadRequest("Message is required".to_string()));
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Message cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(
            "Message is too long (max 1000 characters)".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    payload: std::result::Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SendMessageResponse>)> {
    let Json(req) = payload?;
    let text = validate_message(req.message.as_ref())?;

    let author = UserRepository::new(state.db())
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let user_name = if author.name.is_empty() {
        "Anonymous"
    } else {
        author.name.as_str()
    };

    let message = MessageRepository::new(state.db())
        .create(author.id, user_name, &text)
        .await?;
    tracing::debug!(user_id = author.id, message_id = message.id, "Chat message stored");

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            message,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    use super::*;
    use crate::auth::issue_token;
    use crate::config::Config;
    use crate::db::{setup_test_db, NewUser};

    struct Fixture {
        server: TestServer,
        state: AppState,
        user_id: i64,
        token: HeaderValue,
    }

    async fn fixture(name: &str) -> Fixture {
        let state = AppState::new(Config::default(), setup_test_db().await);
        let user = UserRepository::new(state.db())
            .create(&NewUser {
                email: "reader@example.com",
                password_hash: "unused",
                name,
                registration_no: None,
            })
            .await
            .unwrap();
        let auth = &state.config().auth;
        let token = issue_token(user.id, &user.email, &auth.jwt_secret, 1).unwrap();
        let server = TestServer::new(crate::build_router(state.clone())).unwrap();

        Fixture {
            server,
            state,
            user_id: user.id,
            token: HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        }
    }

    #[test]
    fn test_query_defaults() {
        let query = ListQuery::default();
        assert_eq!((query.limit(), query.offset()), (50, 0));

        let query = ListQuery {
            limit: Some("abc".to_string()),
            offset: Some("-4".to_string()),
        };
        assert_eq!((query.limit(), query.offset()), (50, 0));

        let query = ListQuery {
            limit: Some("0".to_string()),
            offset: Some("10".to_string()),
        };
        assert_eq!((query.limit(), query.offset()), (50, 10));
    }

    #[test]
    fn test_validate_message() {
        assert_eq!(validate_message(Some(&json!("  hi  "))).unwrap(), "hi");
        assert!(validate_message(None).is_err());
        assert!(validate_message(Some(&json!(42))).is_err());
        assert!(validate_message(Some(&json!("   "))).is_err());
        assert!(validate_message(Some(&json!("x".repeat(1000)))).is_ok());
        assert!(validate_message(Some(&json!("x".repeat(1001)))).is_err());
    }

    #[tokio::test]
    async fn test_send_and_list() {
        let f = fixture("Reader").await;

        for text in ["one", "  two  ", "three"] {
            let response = f
                .server
                .post("/api/chat/messages")
                .add_header(AUTHORIZATION, f.token.clone())
                .json(&json!({ "message": text }))
                .await;
            response.assert_status(StatusCode::CREATED);
            let body = response.json::<SendMessageResponse>();
            assert!(body.success);
            assert_eq!(body.message.user_id, f.user_id);
            assert_eq!(body.message.user_name, "Reader");
        }

        let response = f
            .server
            .get("/api/chat/messages")
            .add_query_param("limit", 2)
            .await;
        response.assert_status(StatusCode::OK);
        let list = response.json::<MessageList>();
        let texts: Vec<&str> = list.messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["three", "two"]);
    }

    #[tokio::test]
    async fn test_send_requires_token() {
        let f = fixture("Reader").await;

        let response = f
            .server
            .post("/api/chat/messages")
            .json(&json!({ "message": "hi" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "Authentication required");

        let response = f
            .server
            .post("/api/chat/messages")
            .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
            .json(&json!({ "message": "hi" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_send_validation() {
        let f = fixture("Reader").await;
        let cases = [
            (json!({}), "Message is required"),
            (json!({ "message": 5 }), "Message is required"),
            (json!({ "message": "   " }), "Message cannot be empty"),
            (json!({ "message": "y".repeat(1001) }), "Message is too long (max 1000 characters)"),
        ];

        for (body, expected) in cases {
            let response = f
                .server
                .post("/api/chat/messages")
                .add_header(AUTHORIZATION, f.token.clone())
                .json(&body)
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<Value>()["error"], expected);
        }
    }

    #[tokio::test]
    async fn test_empty_name_posts_as_anonymous() {
        for (name, expected) in [("", "Anonymous"), ("   ", "   ")] {
            let f = fixture(name).await;
            let response = f
                .server
                .post("/api/chat/messages")
                .add_header(AUTHORIZATION, f.token.clone())
                .json(&json!({ "message": "hello" }))
                .await;
            response.assert_status(StatusCode::CREATED);
            assert_eq!(
                response.json::<SendMessageResponse>().message.user_name,
                expected
            );
        }
    }

    #[tokio::test]
    async fn test_token_from_another_secret_rejected() {
        let f = fixture("Reader").await;
        let forged = issue_token(f.user_id, "reader@example.com", "readefy-development-secret", 1)
            .unwrap();

        let response = f
            .server
            .post("/api/chat/messages")
            .add_header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", forged)).unwrap(),
            )
            .json(&json!({ "message": "hi" }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "Invalid or expired token");

        let count = MessageRepository::new(f.state.db()).count().await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_deleted_user_gets_not_found() {
        let f = fixture("Reader").await;
        UserRepository::new(f.state.db())
            .delete(f.user_id)
            .await
            .unwrap();

        let response = f
            .server
            .post("/api/chat/messages")
            .add_header(AUTHORIZATION, f.token.clone())
            .json(&json!({ "message": "hello" }))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["error"], "User not found");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let f = fixture("Reader").await;
        let response = f.server.get("/api/nothing-here").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>(), json!({ "error": "Endpoint not found" }));

        let response = f.server.get("/api/health").await;
        response.assert_status(StatusCode::OK);
        assert_eq!(
            response.json::<Value>(),
            json!({ "status": "ok", "message": "ReaDefy server is running" })
        );
    }
}
