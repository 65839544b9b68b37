//! Server-rendered pages on Tera templates compiled into the binary.

use actix_web::{HttpResponse, http::StatusCode, http::header::ContentType};
use tera::{Context, Tera};

use crate::middleware::{AppResult, Identity};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("posts/_form.html", include_str!("../templates/posts/_form.html")),
    ("posts/index.html", include_str!("../templates/posts/index.html")),
    ("posts/show.html", include_str!("../templates/posts/show.html")),
    ("posts/create.html", include_str!("../templates/posts/create.html")),
    ("posts/edit.html", include_str!("../templates/posts/edit.html")),
    ("auth/login.html", include_str!("../templates/auth/login.html")),
    ("auth/register.html", include_str!("../templates/auth/register.html")),
    ("errors/error.html", include_str!("../templates/errors/error.html")),
];

/// Compiled page templates. HTML output is auto-escaped.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn load() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String, tera::Error> {
        self.tera.render(name, context)
    }

    /// Render `name` into an HTML response with the given status.
    pub fn page(&self, status: StatusCode, name: &str, context: &Context) -> AppResult<HttpResponse> {
        let html = self.render(name, context)?;
        Ok(HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(html))
    }
}

/// Context shared by every page: the signed-in visitor for the nav bar.
pub fn page_context(viewer: Option<&Identity>) -> Context {
    let mut context = Context::new();
    context.insert("viewer", &viewer);
    context
}
