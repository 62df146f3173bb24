//! HTTP Basic authentication against stored teacher credentials.
//!
//! The username is the teacher's email and the password is checked against
//! the argon2 PHC string on their profile. On success the request carries a
//! [`TeacherId`] extension for the API handlers.

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;
use rubriq_api::TeacherId;
use rubriq_core::store::GradingStore;
use uuid::Uuid;

use crate::error::Error;

/// State for [`require_teacher`].
pub struct AuthState<S> {
  pub store: Arc<S>,
}

impl<S> Clone for AuthState<S> {
  fn clone(&self) -> Self { Self { store: self.store.clone() } }
}

/// Split a `Basic` authorization header into `(username, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), Error> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| Error::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Hash `password` into an argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Check `password` against an argon2 PHC string.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), Error> {
  let parsed_hash = PasswordHash::new(password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)
}

/// Resolve the teacher a request's credentials belong to.
pub async fn authenticate<S: GradingStore>(
  store: &S,
  headers: &HeaderMap,
) -> Result<Uuid, Error> {
  let (email, password) = basic_credentials(headers)?;

  let credentials = store
    .get_credentials(email)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?
    .ok_or(Error::Unauthorized)?;

  verify_password(&password, &credentials.password_hash)?;
  Ok(credentials.profile_id)
}

/// Middleware: reject unauthenticated requests with 401, otherwise insert
/// the caller's [`TeacherId`] and continue.
pub async fn require_teacher<S: GradingStore>(
  State(state): State<AuthState<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  match authenticate(&*state.store, req.headers()).await {
    Ok(teacher_id) => {
      req.extensions_mut().insert(TeacherId(teacher_id));
      next.run(req).await
    }
    Err(e) => {
      tracing::debug!(path = %req.uri().path(), error = %e, "request rejected");
      e.into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let value = format!("Basic {}", B64.encode(format!("{user}:{pass}")));
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
    headers
  }

  #[test]
  fn splits_on_the_first_colon() {
    let (user, pass) = basic_credentials(&basic("a@school.test", "pa:ss")).unwrap();
    assert_eq!(user, "a@school.test");
    assert_eq!(pass, "pa:ss");
  }

  #[test]
  fn missing_header() {
    assert!(matches!(basic_credentials(&HeaderMap::new()), Err(Error::Unauthorized)));
  }

  #[test]
  fn bearer_scheme_is_rejected() {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert!(matches!(basic_credentials(&headers), Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_static("Basic !!!not-base64!!!"),
    );
    assert!(matches!(basic_credentials(&headers), Err(Error::Unauthorized)));
  }

  #[test]
  fn password_verification() {
    let hash = hash_password("secret").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("secret", &hash).is_ok());
    assert!(matches!(verify_password("wrong", &hash), Err(Error::Unauthorized)));
    assert!(matches!(verify_password("secret", "not-a-phc"), Err(Error::Unauthorized)));
  }
}
