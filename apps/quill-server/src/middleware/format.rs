//! Response format negotiation.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header};
use std::future::{Ready, ready};

/// Whether the client wants a rendered page or a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Html,
    Json,
}

impl ResponseFormat {
    /// JSON when the `Accept` header mentions json or the request is an XHR.
    pub fn of(req: &HttpRequest) -> Self {
        let accepts_json = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().contains("json"));

        let is_xhr = req
            .headers()
            .get("X-Requested-With")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        if accepts_json || is_xhr {
            Self::Json
        } else {
            Self::Html
        }
    }

    pub fn is_json(self) -> bool {
        self == Self::Json
    }

    pub fn is_html(self) -> bool {
        self == Self::Html
    }
}

impl FromRequest for ResponseFormat {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self::of(req)))
    }
}
