//! Post handlers: the public listing and detail pages, and owner-only
//! creation, editing and deletion.
//!
//! Every handler answers browsers with a rendered page and API clients
//! (see [`ResponseFormat`]) with JSON.

use actix_web::{
    Either, HttpResponse,
    http::{StatusCode, header},
    web,
};
use serde::Deserialize;
use uuid::Uuid;

use quill_core::DomainError;
use quill_core::domain::policy::{self, PostAction};
use quill_core::domain::{Author, PostInput, PostWithAuthor, ValidationErrors};
use quill_shared::ApiResponse;
use quill_shared::dto::{AuthorResponse, PageMeta, PaginatedResponse, PostRequest, PostResponse};

use crate::middleware::{AppError, AppResult, Identity, OptionalIdentity, ResponseFormat};
use crate::state::AppState;
use crate::templates::page_context;

/// Post payload from an API client or an HTML form.
type PostBody = Either<web::Json<PostRequest>, web::Form<PostRequest>>;

fn into_request(body: PostBody) -> PostRequest {
    match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
}

impl ListQuery {
    /// Requested page; anything that is not a positive number means page 1.
    fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

fn post_path(id: Uuid) -> String {
    format!("/posts/{}", id)
}

fn redirect(status: StatusCode, location: &str) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header((header::LOCATION, location))
        .finish()
}

fn post_response(item: &PostWithAuthor) -> PostResponse {
    PostResponse {
        id: item.post.id.to_string(),
        title: item.post.title.clone(),
        body: item.post.body.clone(),
        author: AuthorResponse {
            id: item.author.id.to_string(),
            name: item.author.name.clone(),
        },
        created_at: item.post.created_at.to_rfc3339(),
        updated_at: item.post.updated_at.to_rfc3339(),
    }
}

enum FormPage {
    Create,
    Edit(Uuid),
}

fn render_form(
    state: &AppState,
    viewer: &Identity,
    page: FormPage,
    form: &PostRequest,
    errors: &ValidationErrors,
    status: StatusCode,
) -> AppResult<HttpResponse> {
    let mut context = page_context(Some(viewer));
    context.insert("form", form);
    context.insert("errors", errors);

    let template = match page {
        FormPage::Create => "posts/create.html",
        FormPage::Edit(id) => {
            context.insert("post_id", &id);
            "posts/edit.html"
        }
    };
    state.templates.page(status, template, &context)
}

/// GET /
pub async fn home() -> HttpResponse {
    redirect(StatusCode::FOUND, "/posts")
}

/// GET /posts?page=N
pub async fn index(
    state: web::Data<AppState>,
    format: ResponseFormat,
    viewer: OptionalIdentity,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let page = state.posts.list(query.page()).await?;
    let (has_previous, has_next) = (page.has_previous(), page.has_next());
    let page = page.map(|item| post_response(&item));

    let listing = PaginatedResponse {
        meta: PageMeta {
            current_page: page.page,
            per_page: page.per_page,
            total: page.total_items,
            last_page: page.total_pages,
        },
        data: page.items,
    };

    match format {
        ResponseFormat::Json => Ok(HttpResponse::Ok().json(listing)),
        ResponseFormat::Html => {
            let mut context = page_context(viewer.identity());
            context.insert("posts", &listing.data);
            context.insert("meta", &listing.meta);
            context.insert("has_previous", &has_previous);
            context.insert("has_next", &has_next);
            state
                .templates
                .page(StatusCode::OK, "posts/index.html", &context)
        }
    }
}

/// GET /posts/create
pub async fn create(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    render_form(
        &state,
        &identity,
        FormPage::Create,
        &PostRequest::default(),
        &ValidationErrors::new(),
        StatusCode::OK,
    )
}

/// POST /posts
pub async fn store(
    state: web::Data<AppState>,
    format: ResponseFormat,
    identity: Identity,
    body: PostBody,
) -> AppResult<HttpResponse> {
    let form = into_request(body);
    let input = PostInput::new(form.title.clone(), form.body.clone());

    match state.posts.create(identity.user_id, input).await {
        Ok(post) => Ok(redirect(StatusCode::FOUND, &post_path(post.id))),
        Err(DomainError::Validation(errors)) if format.is_html() => render_form(
            &state,
            &identity,
            FormPage::Create,
            &form,
            &errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(e) => Err(e.into()),
    }
}

/// GET /posts/{id}
pub async fn show(
    state: web::Data<AppState>,
    format: ResponseFormat,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let found = state.posts.show(path.into_inner()).await?;
    let post = post_response(&found);

    match format {
        ResponseFormat::Json => Ok(HttpResponse::Ok().json(ApiResponse::ok(post))),
        ResponseFormat::Html => {
            let can_edit = policy::can(PostAction::Update, &found.post, viewer.user_id());
            let mut context = page_context(viewer.identity());
            context.insert("post", &post);
            context.insert("can_edit", &can_edit);
            state
                .templates
                .page(StatusCode::OK, "posts/show.html", &context)
        }
    }
}

/// GET /posts/{id}/edit
pub async fn edit(
    state: web::Data<AppState>,
    format: ResponseFormat,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = state.posts.edit(identity.user_id, path.into_inner()).await?;

    match format {
        ResponseFormat::Json => {
            let author = Author {
                id: identity.user_id,
                name: identity.name.clone(),
            };
            let item = PostWithAuthor { post, author };
            Ok(HttpResponse::Ok().json(ApiResponse::ok(post_response(&item))))
        }
        ResponseFormat::Html => {
            let form = PostRequest {
                title: post.title,
                body: post.body,
                method: None,
            };
            render_form(
                &state,
                &identity,
                FormPage::Edit(post.id),
                &form,
                &ValidationErrors::new(),
                StatusCode::OK,
            )
        }
    }
}

/// PUT /posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    format: ResponseFormat,
    identity: Identity,
    path: web::Path<Uuid>,
    body: PostBody,
) -> AppResult<HttpResponse> {
    update_post(&state, format, &identity, path.into_inner(), into_request(body)).await
}

async fn update_post(
    state: &AppState,
    format: ResponseFormat,
    identity: &Identity,
    id: Uuid,
    form: PostRequest,
) -> AppResult<HttpResponse> {
    let input = PostInput::new(form.title.clone(), form.body.clone());

    match state.posts.update(identity.user_id, id, input).await {
        Ok(post) => Ok(redirect(StatusCode::FOUND, &post_path(post.id))),
        Err(DomainError::Validation(errors)) if format.is_html() => render_form(
            state,
            identity,
            FormPage::Edit(id),
            &form,
            &errors,
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        Err(e) => Err(e.into()),
    }
}

/// DELETE /posts/{id}
pub async fn destroy(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .destroy(identity.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /posts/{id} with a `_method` field, for HTML forms.
pub async fn method_override(
    state: web::Data<AppState>,
    format: ResponseFormat,
    identity: Identity,
    path: web::Path<Uuid>,
    body: PostBody,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let form = into_request(body);
    let method = form
        .method
        .as_deref()
        .map(|m| m.trim().to_ascii_uppercase())
        .unwrap_or_default();

    match method.as_str() {
        "PUT" | "PATCH" => update_post(&state, format, &identity, id, form).await,
        "DELETE" => {
            state.posts.destroy(identity.user_id, id).await?;
            match format {
                ResponseFormat::Json => Ok(HttpResponse::NoContent().finish()),
                ResponseFormat::Html => Ok(redirect(StatusCode::SEE_OTHER, "/posts")),
            }
        }
        "" => Err(AppError::MethodNotAllowed("POST".to_string())),
        other => Err(AppError::MethodNotAllowed(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{
        http::{StatusCode, header},
        test,
    };
    use serde_json::json;

    use crate::test_support::{TestApp, read_text, test_app};

    fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
        resp.headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[actix_web::test]
    async fn test_index_shows_empty_state() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::get().uri("/posts").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(read_text(resp).await.contains("No posts yet."));
    }

    #[actix_web::test]
    async fn test_root_redirects_to_listing() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/posts");
    }

    #[actix_web::test]
    async fn test_listing_is_paginated_by_three() {
        let ctx = TestApp::new().await;
        for i in 0..4 {
            ctx.post_by(&ctx.alice, &format!("Post {i}"), "Body").await;
        }
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::get()
            .uri("/posts?page=abc")
            .insert_header((header::ACCEPT, "application/json"))
            .to_request();
        let first: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first["meta"]["current_page"], 1);
        assert_eq!(first["meta"]["last_page"], 2);
        assert_eq!(first["meta"]["total"], 4);
        assert_eq!(first["data"].as_array().unwrap().len(), 3);
        assert_eq!(first["data"][0]["title"], "Post 0");
        assert_eq!(first["data"][0]["author"]["name"], "Alice");

        let req = test::TestRequest::get()
            .uri("/posts?page=2")
            .insert_header((header::ACCEPT, "application/json"))
            .to_request();
        let second: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(second["data"].as_array().unwrap().len(), 1);
        assert_eq!(second["data"][0]["title"], "Post 3");

        let req = test::TestRequest::get().uri("/posts?page=2").to_request();
        let html = read_text(test::call_service(&app, req).await).await;
        assert!(html.contains("Post 3"));
        assert!(html.contains("rel=\"prev\""));
        assert!(!html.contains("rel=\"next\""));
    }

    #[actix_web::test]
    async fn test_guest_is_sent_to_login() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::get().uri("/posts/create").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login?next=%2Fposts%2Fcreate");

        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header((header::ACCEPT, "application/json"))
            .set_json(json!({ "title": "T", "body": "B" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ctx.state.posts.list(1).await.unwrap().total_items, 0);
    }

    #[actix_web::test]
    async fn test_store_redirects_to_new_post() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.alice.session_cookie())
            .set_form([("title", "Hello world"), ("body", "First post")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let target = location(&resp);
        assert!(target.starts_with("/posts/"));

        let req = test::TestRequest::get()
            .uri(&target)
            .cookie(ctx.alice.session_cookie())
            .to_request();
        let html = read_text(test::call_service(&app, req).await).await;
        assert!(html.contains("Hello world"));
        assert!(html.contains("by Alice"));
        assert!(html.contains("/edit"));

        let req = test::TestRequest::get()
            .uri(&target)
            .cookie(ctx.bob.session_cookie())
            .to_request();
        let html = read_text(test::call_service(&app, req).await).await;
        assert!(!html.contains("/edit"));
    }

    #[actix_web::test]
    async fn test_invalid_store_rerenders_form_with_old_input() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::post()
            .uri("/posts")
            .cookie(ctx.alice.session_cookie())
            .set_form([("title", "   "), ("body", "Keep me")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let html = read_text(resp).await;
        assert!(html.contains("The title field is required."));
        assert!(html.contains("Keep me"));
        assert_eq!(ctx.state.posts.list(1).await.unwrap().total_items, 0);
    }

    #[actix_web::test]
    async fn test_invalid_store_json_lists_field_errors() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let long_title = "x".repeat(256);
        let req = test::TestRequest::post()
            .uri("/posts")
            .insert_header(ctx.alice.bearer())
            .insert_header((header::ACCEPT, "application/json"))
            .set_json(json!({ "title": long_title, "body": "" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["errors"]["title"].is_array());
        assert_eq!(body["errors"]["body"][0], "The body field is required.");
    }

    #[actix_web::test]
    async fn test_show_escapes_user_content() {
        let ctx = TestApp::new().await;
        let post = ctx
            .post_by(&ctx.alice, "<script>alert(1)</script>", "line one\nline two")
            .await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", post.id))
            .to_request();
        let html = read_text(test::call_service(&app, req).await).await;
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("line one<br>line two"));
    }

    #[actix_web::test]
    async fn test_missing_or_malformed_id_is_not_found() {
        let ctx = TestApp::new().await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::get()
            .uri(&format!("/posts/{}", uuid::Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(read_text(resp).await.contains("404 Not Found"));

        let req = test::TestRequest::get().uri("/posts/not-a-uuid").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_non_owner_is_forbidden() {
        let ctx = TestApp::new().await;
        let post = ctx.post_by(&ctx.alice, "Mine", "Body").await;
        let app = test_app!(ctx.state.clone());
        let uri = format!("/posts/{}", post.id);

        let req = test::TestRequest::get()
            .uri(&format!("{}/edit", uri))
            .cookie(ctx.bob.session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(read_text(resp).await.contains("403 Forbidden"));

        let req = test::TestRequest::put()
            .uri(&uri)
            .insert_header(ctx.bob.bearer())
            .insert_header((header::ACCEPT, "application/json"))
            .set_json(json!({ "title": "Hijacked", "body": "Body" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header(ctx.bob.bearer())
            .insert_header((header::ACCEPT, "application/json"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let unchanged = ctx.state.posts.show(post.id).await.unwrap();
        assert_eq!(unchanged.post, post);
    }

    #[actix_web::test]
    async fn test_owner_edits_through_form_override() {
        let ctx = TestApp::new().await;
        let post = ctx.post_by(&ctx.alice, "Draft", "Old body").await;
        let app = test_app!(ctx.state.clone());
        let uri = format!("/posts/{}", post.id);

        let req = test::TestRequest::get()
            .uri(&format!("{}/edit", uri))
            .cookie(ctx.alice.session_cookie())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = read_text(resp).await;
        assert!(html.contains("value=\"Draft\""));
        assert!(html.contains("value=\"PUT\""));

        let req = test::TestRequest::post()
            .uri(&uri)
            .cookie(ctx.alice.session_cookie())
            .set_form([("_method", "PUT"), ("title", "Final"), ("body", "New body")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), uri);

        let updated = ctx.state.posts.show(post.id).await.unwrap().post;
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.body, "New body");
        assert_eq!(updated.created_at, post.created_at);
    }

    #[actix_web::test]
    async fn test_invalid_update_keeps_post() {
        let ctx = TestApp::new().await;
        let post = ctx.post_by(&ctx.alice, "Stable", "Body").await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::put()
            .uri(&format!("/posts/{}", post.id))
            .cookie(ctx.alice.session_cookie())
            .set_form([("title", ""), ("body", "Changed")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(read_text(resp).await.contains("Changed"));

        assert_eq!(ctx.state.posts.show(post.id).await.unwrap().post, post);
    }

    #[actix_web::test]
    async fn test_owner_delete_then_not_found() {
        let ctx = TestApp::new().await;
        let post = ctx.post_by(&ctx.alice, "Short-lived", "Body").await;
        let app = test_app!(ctx.state.clone());
        let uri = format!("/posts/{}", post.id);

        let req = test::TestRequest::delete()
            .uri(&uri)
            .insert_header(ctx.alice.bearer())
            .insert_header((header::ACCEPT, "application/json"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(test::read_body(resp).await.is_empty());

        let req = test::TestRequest::get()
            .uri(&uri)
            .insert_header((header::ACCEPT, "application/json"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_form_delete_redirects_to_listing() {
        let ctx = TestApp::new().await;
        let post = ctx.post_by(&ctx.alice, "Bye", "Body").await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}", post.id))
            .cookie(ctx.alice.session_cookie())
            .set_form([("_method", "DELETE")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/posts");
        assert!(ctx.state.posts.show(post.id).await.is_err());
    }

    #[actix_web::test]
    async fn test_unknown_override_is_rejected() {
        let ctx = TestApp::new().await;
        let post = ctx.post_by(&ctx.alice, "Kept", "Body").await;
        let app = test_app!(ctx.state.clone());

        let req = test::TestRequest::post()
            .uri(&format!("/posts/{}", post.id))
            .cookie(ctx.alice.session_cookie())
            .set_form([("_method", "PURGE")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(ctx.state.posts.show(post.id).await.is_ok());
    }
}
