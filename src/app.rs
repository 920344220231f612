use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{collections, export, library, profiles, recipes, social, sync};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(recipes::router())
                .merge(library::router())
                .merge(collections::router())
                .merge(social::router())
                .merge(profiles::router())
                .merge(export::router())
                .merge(sync::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms = latency.as_millis() as u64, "response");
                        } else {
                            tracing::info!(%status, latency_ms = latency.as_millis() as u64, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::jwt::JwtKeys,
        llm::{FakeProvider, LlmError},
        recipes::services::tests::sample_recipe,
    };

    fn bearer(state: &AppState, user: Uuid) -> String {
        format!("Bearer {}", JwtKeys::new(&state.config.jwt).sign_access(user))
    }

    fn request(method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(a) = auth {
            req = req.header(header::AUTHORIZATION, a);
        }
        match body {
            Some(v) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, req).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, request(Method::GET, "/api/v1/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn anonymous_generation_returns_recipe_without_history() {
        let state = AppState::fake();
        let app = build_app(state.clone());

        let (status, body) = send_json(
            &app,
            request(
                Method::POST,
                "/api/v1/recipes/generate",
                None,
                Some(json!({ "query": "Jollof Rice" })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Jollof Rice");
        assert!(!body["ingredients"].as_array().unwrap().is_empty());
        assert!(body["imageUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://image.pollinations.ai/prompt/"));
        assert!(state
            .store
            .list_public_recipes(10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn authenticated_generation_lands_in_history() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let user = Uuid::new_v4();
        let auth = bearer(&state, user);

        let (status, _) = send_json(
            &app,
            request(
                Method::POST,
                "/api/v1/recipes/generate",
                Some(&auth),
                Some(json!({ "query": "jollof", "spicinessLevel": "Liberian Hot" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, history) =
            send_json(&app, request(Method::GET, "/api/v1/history", Some(&auth), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["recipe"]["title"], "Jollof Rice");
    }

    #[tokio::test]
    async fn rate_limit_maps_to_429() {
        let state = AppState::fake_with_llm(Arc::new(FakeProvider::failing(
            LlmError::RateLimited {
                retry_after_secs: Some(30),
            },
        )));
        let app = build_app(state);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/recipes/generate",
                None,
                Some(json!({ "query": "fufu" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Too many requests right now. Please wait a moment and try again."
        );
    }

    #[tokio::test]
    async fn saved_requires_token() {
        let app = build_app(AppState::fake());
        let (status, _) = send(&app, request(Method::GET, "/api/v1/saved", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_token_on_optional_route_is_rejected() {
        let app = build_app(AppState::fake());
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/recipes/generate",
                Some("Bearer not-a-jwt"),
                Some(json!({ "query": "fufu" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn toggle_saved_round_trip() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4());
        let recipe = serde_json::to_value(sample_recipe("Cassava Leaf")).unwrap();

        let (_, first) = send_json(
            &app,
            request(Method::POST, "/api/v1/saved/toggle", Some(&auth), Some(recipe.clone())),
        )
        .await;
        assert_eq!(first["saved"], true);

        let (_, list) = send_json(&app, request(Method::GET, "/api/v1/saved", Some(&auth), None)).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (_, second) = send_json(
            &app,
            request(Method::POST, "/api/v1/saved/toggle", Some(&auth), Some(recipe)),
        )
        .await;
        assert_eq!(second["saved"], false);
    }

    #[tokio::test]
    async fn duplicate_ingredients_are_unprocessable() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let user = Uuid::new_v4();
        let auth = bearer(&state, user);
        let recipe = sample_recipe("Palm Butter");
        crate::recipes::services::ensure_recipe_stored(&state, &recipe, user)
            .await
            .unwrap();

        let (status, body) = send(
            &app,
            request(
                Method::PUT,
                &format!("/api/v1/recipes/{}/ingredients", recipe.id),
                Some(&auth),
                Some(json!({ "ingredients": ["Palm nut", "palm NUT"] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Duplicate ingredient found: \"palm NUT\""
        );
    }

    #[tokio::test]
    async fn calendar_export_is_an_attachment() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let recipe = sample_recipe("Jollof Rice");
        crate::recipes::services::ensure_recipe_stored(&state, &recipe, Uuid::new_v4())
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(request(
                Method::GET,
                &format!("/api/v1/recipes/{}/calendar.ics", recipe.id),
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Jollof_Rice.ics\""
        );
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert!(std::str::from_utf8(&body)
            .unwrap()
            .contains("SUMMARY:Cook Jollof Rice"));
    }

    #[tokio::test]
    async fn unknown_recipe_is_404() {
        let app = build_app(AppState::fake());
        let (status, _) = send(
            &app,
            request(
                Method::GET,
                &format!("/api/v1/recipes/{}", Uuid::new_v4()),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn self_follow_is_bad_request() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let me = Uuid::new_v4();
        let auth = bearer(&state, me);
        let (status, _) = send(
            &app,
            request(
                Method::PUT,
                &format!("/api/v1/users/{me}/follow"),
                Some(&auth),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_and_avatar() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let me = Uuid::new_v4();
        let auth = bearer(&state, me);

        let (status, profile) = send_json(
            &app,
            request(
                Method::PUT,
                "/api/v1/me",
                Some(&auth),
                Some(json!({ "username": "  mama_g " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["username"], "mama_g");

        let (status, profile) = send_json(
            &app,
            request(
                Method::POST,
                "/api/v1/me/avatar",
                Some(&auth),
                Some(json!({ "image": "data:image/png;base64,QUJD" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["username"], "mama_g");
        assert!(profile["avatarUrl"]
            .as_str()
            .unwrap()
            .starts_with(&format!("https://storage.test/avatars/{me}-")));
    }

    fn large_inline_image() -> String {
        // About 2.4MB of base64, past axum's 2MB default body limit.
        format!("data:image/png;base64,{}", "QUJD".repeat(600_000))
    }

    #[tokio::test]
    async fn saving_a_recipe_with_a_large_inline_image_uploads_it() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let auth = bearer(&state, Uuid::new_v4());
        let mut recipe = sample_recipe("Palm Butter");
        recipe.image_url = Some(large_inline_image());

        let (status, body) = send_json(
            &app,
            request(
                Method::PUT,
                "/api/v1/saved",
                Some(&auth),
                Some(serde_json::to_value(&recipe).unwrap()),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["imageUrl"],
            format!("https://storage.test/recipe-images/{}.png", recipe.id)
        );
    }

    #[tokio::test]
    async fn local_snapshot_with_large_images_migrates() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let user = Uuid::new_v4();
        let auth = bearer(&state, user);
        let recipes: Vec<_> = ["Jollof Rice", "Fufu"]
            .into_iter()
            .map(|title| {
                let mut r = sample_recipe(title);
                r.image_url = Some(large_inline_image());
                r
            })
            .collect();

        let (status, report) = send_json(
            &app,
            request(
                Method::POST,
                "/api/v1/sync/local",
                Some(&auth),
                Some(json!({ "liberian_recipes": recipes })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["saved"], 2);
        assert_eq!(state.store.list_saved(user).await.unwrap().len(), 2);
    }
}
