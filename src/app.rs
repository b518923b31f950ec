use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppResult;
use crate::state::AppState;
use crate::{access, audit, auth, cars, messages, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(access::router())
                .merge(cars::router())
                .merge(messages::router())
                .merge(audit::router())
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.store.health_check().await?;
    Ok(Json(json!({ "status": "ok", "store": state.store.backend_name() })))
}

pub async fn serve(app: Router, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::access::seed::seed_reference_data;

    async fn seeded_app() -> Router {
        let state = AppState::for_tests();
        seed_reference_data(state.store.as_ref()).await.unwrap();
        build_app(state)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn user_body(email: &str) -> Value {
        json!({
            "name": "Admin",
            "email": email,
            "password": "password123",
            "password_confirmation": "password123",
            "role": "admin",
            "status": "active"
        })
    }

    async fn login(app: &Router, email: &str) -> (String, String) {
        let (status, body) = call(app, Method::POST, "/api/v1/users", None, Some(user_body(email))).await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        let (status, body) = call(
            app,
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": email, "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (body["access_token"].as_str().unwrap().to_string(), user_id)
    }

    #[tokio::test]
    async fn health_reports_backend() {
        let app = seeded_app().await;
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["store"], "memory");
    }

    #[tokio::test]
    async fn duplicate_email_is_unprocessable() {
        let app = seeded_app().await;
        login(&app, "root@example.com").await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/users",
            None,
            Some(user_body("root@example.com")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "validation_failed");
        assert_eq!(body["errors"]["email"][0], "The email has already been taken.");

        let (_, users) = call(&app, Method::GET, "/api/v1/users", None, None).await;
        let users = users.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn car_writes_require_token_and_track_creator() {
        let app = seeded_app().await;
        let car = json!({
            "serial_number": "WVW-123",
            "brand": "Volkswagen",
            "model": "Golf",
            "year": 2020,
            "price": 18500.0,
            "mileage": 30000,
            "seats": 5,
            "doors": 5,
            "status": "available"
        });

        let (status, body) = call(&app, Method::POST, "/api/v1/cars", None, Some(car.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthorized");

        let (token, user_id) = login(&app, "staff@example.com").await;
        let (status, body) = call(&app, Method::POST, "/api/v1/cars", Some(&token), Some(car)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["created_by"], user_id.as_str());

        let (status, body) = call(&app, Method::GET, "/api/v1/cars?status=available", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = call(&app, Method::GET, "/api/v1/cars?status=scrapped", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn role_delete_conflicts_while_assigned() {
        let app = seeded_app().await;
        login(&app, "root@example.com").await;

        let (_, roles) = call(&app, Method::GET, "/api/v1/roles", None, None).await;
        let roles = roles.as_array().unwrap();
        let id_of = |name: &str| {
            roles
                .iter()
                .find(|r| r["name"] == name)
                .and_then(|r| r["id"].as_str())
                .unwrap()
                .to_string()
        };

        let (status, body) = call(&app, Method::DELETE, &format!("/api/v1/roles/{}", id_of("admin")), None, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");

        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/roles/{}", id_of("guest")), None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::GET, &format!("/api/v1/roles/{}", id_of("guest")), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn user_permission_grants_are_idempotent_over_http() {
        let app = seeded_app().await;
        let (_, user_id) = login(&app, "root@example.com").await;
        let (_, permissions) = call(&app, Method::GET, "/api/v1/permissions", None, None).await;
        let permission_id = permissions
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == "send_message")
            .and_then(|p| p["id"].as_str())
            .unwrap()
            .to_string();
        let uri = format!("/api/v1/users/{}/permissions/{}", user_id, permission_id);

        let (_, first) = call(&app, Method::PUT, &uri, None, None).await;
        let (status, second) = call(&app, Method::PUT, &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["changed"], true);
        assert_eq!(second["changed"], false);

        let (_, listed) = call(&app, Method::GET, &format!("/api/v1/users/{}/permissions", user_id), None, None).await;
        assert_eq!(listed["permissions"].as_array().unwrap().len(), 1);

        let access_uri = format!("/api/v1/users/{}/access/send_message", user_id);
        let (status, access) = call(&app, Method::GET, &access_uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(access["granted"], true);
        assert_eq!(access["is_admin"], true);

        let (_, revoked) = call(&app, Method::DELETE, &uri, None, None).await;
        let (_, again) = call(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(revoked["changed"], true);
        assert_eq!(again["changed"], false);
    }

    #[tokio::test]
    async fn message_round_trip_over_http() {
        let app = seeded_app().await;
        let (token, sender) = login(&app, "alice@example.com").await;
        let (_, receiver) = login(&app, "bob@example.com").await;

        let (status, sent) = call(
            &app,
            Method::POST,
            "/api/v1/messages",
            Some(&token),
            Some(json!({ "receiver_id": receiver, "content": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = sent["id"].as_str().unwrap();
        let (status, read) = call(&app, Method::GET, &format!("/api/v1/messages/{}", id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["sender_id"], sender.as_str());
        assert_eq!(read["receiver_id"], receiver.as_str());
        assert_eq!(read["content"], "hello");
    }

    #[tokio::test]
    async fn activity_log_attributed_to_caller() {
        let app = seeded_app().await;
        let (token, user_id) = login(&app, "auditor@example.com").await;
        let (status, log) = call(
            &app,
            Method::POST,
            "/api/v1/activity-logs",
            Some(&token),
            Some(json!({ "action": "export_activity_log", "description": "weekly" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(log["user_id"], user_id.as_str());

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/activity-logs",
            Some(&token),
            Some(json!({ "action": "fly" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"]["action"].is_array());

        let (_, other_id) = login(&app, "other@example.com").await;
        let (status, updated) = call(
            &app,
            Method::PUT,
            &format!("/api/v1/activity-logs/{}", log["id"].as_str().unwrap()),
            Some(&token),
            Some(json!({ "user_id": other_id, "action": "export_activity_log" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["user_id"], user_id.as_str());
    }
}
