//! Email/password authentication
//!
//! Passwords are stored as bcrypt hashes and sessions are stateless HS256
//! bearer tokens carrying the user id and email.

pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::{bearer_token, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{issue_token, verify_token, Claims};
