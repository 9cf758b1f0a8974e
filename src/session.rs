use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Authenticated identity derived from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Subject {
    Num(i64),
    Text(String),
}

#[derive(Deserialize)]
struct Claims {
    sub: Subject,
    username: String,
    exp: i64,
}

/// Decodes the claims segment of a JWT and checks the expiry against
/// the current time. Any decode failure counts as a malformed token.
pub fn decode_session(token: &str) -> Result<Session, TokenError> {
    let payload = token.split('.').nth(1).ok_or(TokenError::Malformed)?;
    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;
    let user_id = match claims.sub {
        Subject::Num(n) => n,
        Subject::Text(s) => s.parse().map_err(|_| TokenError::Malformed)?,
    };
    if claims.exp <= chrono::Utc::now().timestamp() {
        return Err(TokenError::Expired);
    }
    Ok(Session {
        token: token.to_string(),
        user_id,
        username: claims.username,
    })
}

/// Persists the bearer token as a single file under the data dir.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("token"),
        }
    }

    /// Reads and validates the persisted token. A missing file means no
    /// session; an expired or undecodable token is discarded along with
    /// the stale file.
    pub fn load(&self) -> Option<Session> {
        let token = match std::fs::read_to_string(&self.path) {
            Ok(t) => t.trim().to_string(),
            Err(_) => return None,
        };
        match decode_session(&token) {
            Ok(session) => {
                tracing::debug!(user = %session.username, "restored session from token file");
                Some(session)
            }
            Err(e) => {
                tracing::debug!(error = %e, "discarding persisted token");
                let _ = std::fs::remove_file(&self.path);
                None
            }
        }
    }

    pub fn save(&self, token: &str) {
        if let Err(e) = std::fs::write(&self.path, token) {
            tracing::warn!(error = %e, "failed to persist token");
        }
    }

    pub fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(sub: &str, username: &str, exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(
            serde_json::json!({ "sub": sub, "username": username, "exp": exp }).to_string(),
        );
        format!("{header}.{claims}.sig")
    }

    #[test]
    fn valid_token_yields_identity() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let session = decode_session(&make_token("42", "miyako", exp)).unwrap();
        assert_eq!(session.user_id, 42);
        assert_eq!(session.username, "miyako");
    }

    #[test]
    fn expired_token_is_rejected() {
        let exp = chrono::Utc::now().timestamp() - 1;
        assert!(matches!(
            decode_session(&make_token("42", "miyako", exp)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode_session("not-a-jwt"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(
            decode_session("a.b.c"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        assert!(matches!(
            decode_session(&make_token("nobody", "x", exp)),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn store_discards_expired_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let exp = chrono::Utc::now().timestamp() - 60;
        store.save(&make_token("7", "gone", exp));
        assert!(store.load().is_none());
        assert!(!dir.path().join("token").exists());
    }

    #[test]
    fn store_round_trips_valid_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let exp = chrono::Utc::now().timestamp() + 3600;
        store.save(&make_token("7", "back", exp));
        let session = store.load().unwrap();
        assert_eq!(session.user_id, 7);
        store.clear();
        assert!(store.load().is_none());
    }
}
