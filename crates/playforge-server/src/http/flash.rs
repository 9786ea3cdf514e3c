//! One-shot messages carried across a redirect
//!
//! The message travels in the `playforge_flash` cookie as base64url-encoded JSON and
//! is cleared by the next page that renders it.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{self, HeaderName};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "playforge_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    /// CSS class used by the page layout
    pub fn css_class(&self) -> &'static str {
        match self.level {
            FlashLevel::Success => "flash-success",
            FlashLevel::Warning => "flash-warning",
            FlashLevel::Error => "flash-error",
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a plain struct of strings cannot fail
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// The flash message sent with the request, if any
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<FlashMessage>);

impl Flash {
    /// Take the message for rendering; the page must then clear the cookie
    pub fn into_inner(self) -> Option<FlashMessage> {
        self.0
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let message = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == FLASH_COOKIE)
            .and_then(|(_, value)| FlashMessage::decode(value));
        Ok(Flash(message))
    }
}

/// `Set-Cookie` header storing `flash`
pub fn set_cookie(flash: &FlashMessage) -> (HeaderName, String) {
    (
        header::SET_COOKIE,
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            FLASH_COOKIE,
            flash.encode()
        ),
    )
}

/// `Set-Cookie` header expiring the flash cookie
pub fn clear_cookie() -> (HeaderName, String) {
    (
        header::SET_COOKIE,
        format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", FLASH_COOKIE),
    )
}

/// Redirect (303) carrying a flash message
pub fn redirect_with(to: &str, flash: FlashMessage) -> Response {
    ([set_cookie(&flash)], Redirect::to(to)).into_response()
}
