//! Admin session: password check at login, signed cookie afterwards.
//!
//! The cookie carries an HS256 JWT whose `sub` is the admin username. There
//! is no server-side session table; logout just expires the cookie.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

pub const SESSION_COOKIE: &str = "desk_session";
const SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &str, secure: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            secure,
        }
    }

    /// Signed session token for `username`.
    pub fn issue(&self, username: &str) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(SESSION_TTL_HOURS)).timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    /// Username of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<String> {
        let validation = Validation::new(Algorithm::HS256);
        match jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims.sub),
            Err(e) => {
                tracing::debug!("rejected admin session cookie: {}", e);
                None
            }
        }
    }

    /// Admin username from the request's session cookie, if any.
    pub fn admin_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        cookie_value(headers, SESSION_COOKIE).and_then(|token| self.verify(&token))
    }

    pub fn set_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            SESSION_TTL_HOURS * 3600
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, phc: &str) -> bool {
    let parsed = match PasswordHash::new(phc) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("ADMIN_PASSWORD_HASH is not a valid PHC string: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Username compared in constant time, then the password hash verified.
pub fn credentials_match(
    expected_username: &str,
    password_hash: &str,
    username: &str,
    password: &str,
) -> bool {
    let name_ok: bool = expected_username
        .as_bytes()
        .ct_eq(username.as_bytes())
        .into();
    // verify even on a wrong name so timing does not reveal valid usernames
    let password_ok = verify_password(password, password_hash);
    name_ok && password_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = SessionKeys::new("test-secret", false);
        let token = keys.issue("admin").unwrap();
        assert_eq!(keys.verify(&token).as_deref(), Some("admin"));
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let token = SessionKeys::new("one", false).issue("admin").unwrap();
        assert_eq!(SessionKeys::new("two", false).verify(&token), None);
        assert_eq!(SessionKeys::new("one", false).verify("garbage"), None);
    }

    #[test]
    fn test_cookie_parsing_among_others() {
        let keys = SessionKeys::new("s", false);
        let token = keys.issue("root").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}; lang=th", SESSION_COOKIE, token))
                .unwrap(),
        );
        assert_eq!(keys.admin_from_headers(&headers).as_deref(), Some("root"));
        assert_eq!(keys.admin_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_secure_flag_only_in_production() {
        assert!(!SessionKeys::new("s", false).set_cookie("t").contains("Secure"));
        assert!(SessionKeys::new("s", true).set_cookie("t").contains("; Secure"));
        assert!(SessionKeys::new("s", false).clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_password_hash_verifies() {
        let phc = hash_password("correct horse").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password("correct horse", &phc));
        assert!(!verify_password("wrong", &phc));
        assert!(!verify_password("correct horse", "not-a-phc"));
    }

    #[test]
    fn test_credentials_need_both_parts() {
        let phc = hash_password("pw").unwrap();
        assert!(credentials_match("admin", &phc, "admin", "pw"));
        assert!(!credentials_match("admin", &phc, "Admin", "pw"));
        assert!(!credentials_match("admin", &phc, "admin", "nope"));
    }
}
