//! Bearer token issue and verification (HS256 JWT)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for `user_id` valid for `ttl_days`
pub fn issue_token(user_id: i64, email: &str, secret: &str, ttl_days: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::days(ttl_days)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Check signature and expiry and return the claims
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_round_trip() {
        let token = issue_token(42, "a@example.com", SECRET, 7).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_claims_use_user_id_key() {
        let claims = Claims {
            user_id: 1,
            email: "a@example.com".to_string(),
            iat: 0,
            exp: 1,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 1);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(1, "a@example.com", SECRET, 7).unwrap();
        assert!(matches!(
            verify_token(&token, "other-secret"),
            Err(AppError::Token(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(1, "a@example.com", SECRET, -2).unwrap();
        assert!(matches!(verify_token(&token, SECRET), Err(AppError::Token(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verify_token("not.a.token", SECRET).is_err());
    }
}
