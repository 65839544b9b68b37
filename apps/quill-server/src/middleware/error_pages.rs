//! Rendered error pages for browser clients.
//!
//! JSON clients keep the problem-details body produced by the handler.

use actix_web::{
    HttpMessage, Result,
    dev::ServiceResponse,
    http::{
        StatusCode,
        header::{self, HeaderValue},
    },
    middleware::{ErrorHandlerResponse, ErrorHandlers},
    web,
};

use crate::middleware::ResponseFormat;
use crate::middleware::auth::viewer_of;
use crate::observability::RequestId;
use crate::state::AppState;
use crate::templates::page_context;

/// Error handlers that swap error bodies for an HTML page on page requests.
pub fn error_pages<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new()
        .handler(StatusCode::FORBIDDEN, render_error_page)
        .handler(StatusCode::NOT_FOUND, render_error_page)
        .handler(StatusCode::METHOD_NOT_ALLOWED, render_error_page)
        .handler(StatusCode::INTERNAL_SERVER_ERROR, render_error_page)
}

fn message_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::FORBIDDEN => "You are not allowed to do that.",
        StatusCode::NOT_FOUND => "The page you were looking for could not be found.",
        StatusCode::METHOD_NOT_ALLOWED => "That action is not supported here.",
        _ => "Something went wrong on our end. Please try again later.",
    }
}

fn render_error_page<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    if ResponseFormat::of(res.request()).is_json() {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let Some(state) = res.request().app_data::<web::Data<AppState>>().cloned() else {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    };

    let status = res.status();
    let viewer = viewer_of(res.request());
    let request_id = res
        .request()
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string());

    let mut context = page_context(viewer.as_ref());
    context.insert("status", &status.as_u16());
    context.insert("reason", status.canonical_reason().unwrap_or("Error"));
    context.insert("message", message_for(status));
    context.insert("request_id", &request_id);

    match state.templates.render("errors/error.html", &context) {
        Ok(html) => {
            let (req, res) = res.into_parts();
            let mut res = res.set_body(html);
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
            let res = ServiceResponse::new(req, res)
                .map_into_boxed_body()
                .map_into_right_body();
            Ok(ErrorHandlerResponse::Response(res))
        }
        Err(e) => {
            tracing::error!(error = ?e, "Failed to render error page");
            Ok(ErrorHandlerResponse::Response(res.map_into_left_body()))
        }
    }
}
