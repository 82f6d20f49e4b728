use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{auth, health, rate_limit::limit_by_client, state::AppState, views};

pub fn build_app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let limiter = state.rate_limiter.clone();

    Router::new()
        .route("/", get(|| async { views::index() }))
        .merge(auth::router())
        .merge(health::router())
        .fallback_service(static_files)
        .with_state(state)
        .layer(middleware::from_fn_with_state(limiter, limit_by_client))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
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

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        health::repo::{fakes::MemoryHealthRepo, Measurement},
        rate_limit::{RateLimiter, MSG_TOO_MANY_REQUESTS},
    };

    async fn body_string(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        req.body(Body::empty()).unwrap()
    }

    fn location(res: &Response) -> &str {
        res.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// `health_sid=<token>` taken from the Set-Cookie header.
    fn cookie_pair(res: &Response) -> String {
        let set = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .expect("set-cookie header");
        set.split(';').next().unwrap().to_string()
    }

    async fn register_and_login(app: &Router) -> String {
        let res = app
            .clone()
            .oneshot(form(
                "/register",
                "name=Budi&email=Budi%40Example.com&password=rahasia&confirm_password=rahasia",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");

        let res = app
            .clone()
            .oneshot(form("/login", "email=budi%40example.com&password=rahasia", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/halaman-utama");
        cookie_pair(&res)
    }

    #[tokio::test]
    async fn public_pages_render() {
        let app = build_app(AppState::fake());
        for uri in ["/", "/login", "/register", "/check-weight-blood", "/check-spo2"] {
            let res = app.clone().oneshot(get(uri, None)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn security_headers_are_set() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get("/", None)).await.unwrap();
        assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(res.headers()[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(res.headers()[header::REFERRER_POLICY], "no-referrer");
    }

    #[tokio::test]
    async fn home_requires_session() {
        let app = build_app(AppState::fake());

        let res = app.clone().oneshot(get("/halaman-utama", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");

        let res = app
            .oneshot(get("/halaman-utama", Some("health_sid=made-up")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
    }

    #[tokio::test]
    async fn register_login_home_logout_flow() {
        let app = build_app(AppState::fake());
        let cookie = register_and_login(&app).await;

        let res = app
            .clone()
            .oneshot(get("/halaman-utama", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Selamat datang, Budi"));

        let res = app.clone().oneshot(get("/logout", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
        assert_eq!(cookie_pair(&res), "health_sid=");

        let res = app.oneshot(get("/halaman-utama", Some(&cookie))).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/login");
    }

    #[tokio::test]
    async fn logout_without_session_still_redirects() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get("/logout", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/");
    }

    #[tokio::test]
    async fn login_replaces_previous_session() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let first = register_and_login(&app).await;

        let res = app
            .oneshot(form(
                "/login",
                "email=budi%40example.com&password=rahasia",
                Some(&first),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let second = cookie_pair(&res);
        assert_ne!(first, second);

        let old_id = first.trim_start_matches("health_sid=");
        assert!(state.auth.sessions().get(old_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn bad_login_rerenders_form_with_generic_error() {
        let app = build_app(AppState::fake());
        register_and_login(&app).await;

        let res = app
            .clone()
            .oneshot(form("/login", "email=budi%40example.com&password=salah123", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().get(header::SET_COOKIE).is_none());
        let wrong_password = body_string(res).await;

        let res = app
            .oneshot(form("/login", "email=siapa%40example.com&password=salah123", None))
            .await
            .unwrap();
        let unknown_email = body_string(res).await;

        assert!(wrong_password.contains("Email atau password salah"));
        assert_eq!(wrong_password, unknown_email);
    }

    #[tokio::test]
    async fn register_errors_rerender_form() {
        let app = build_app(AppState::fake());
        let res = app
            .clone()
            .oneshot(form(
                "/register",
                "name=Budi&email=budi%40example.com&password=rahasia&confirm_password=lain",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(res).await.contains("Konfirmasi password tidak cocok"));

        register_and_login(&app).await;
        let res = app
            .oneshot(form(
                "/register",
                "name=Budi&email=BUDI%40example.com&password=rahasia&confirm_password=rahasia",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert!(body_string(res).await.contains("Email sudah terdaftar"));
    }

    #[tokio::test]
    async fn weight_blood_is_classified_and_stored() {
        let health = Arc::new(MemoryHealthRepo::default());
        let app = build_app(AppState::fake_with(health.clone(), false));

        let res = app
            .oneshot(form(
                "/check-weight-blood",
                "name=Ani&age=40&height=160&weight=90&systolic=135&diastolic=85",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_string(res).await;
        assert!(body.contains("35.16"));
        assert!(body.contains("Obese"));
        assert!(body.contains("High Blood Pressure Stage 1"));

        let records = health.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ani");
        assert_eq!(records[0].age, 40);
        assert_eq!(
            records[0].measurement,
            Measurement::WeightBlood {
                height: 160.0,
                weight: 90.0,
                systolic: 135.0,
                diastolic: 85.0
            }
        );
    }

    #[tokio::test]
    async fn spo2_is_classified_and_stored() {
        let health = Arc::new(MemoryHealthRepo::default());
        let app = build_app(AppState::fake_with(health.clone(), false));

        let res = app
            .oneshot(form("/check-spo2", "name=Ani&age=40&spo2=92", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Low (Perlu perhatian)"));
        assert_eq!(
            health.records().await[0].measurement,
            Measurement::Spo2 { spo2: 92.0 }
        );
    }

    #[tokio::test]
    async fn lenient_mode_renders_result_when_store_fails() {
        let app = build_app(AppState::fake_with(Arc::new(MemoryHealthRepo::failing()), false));
        let res = app
            .oneshot(form("/check-spo2", "name=Ani&age=40&spo2=85", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Very Low"));
    }

    #[tokio::test]
    async fn strict_mode_fails_when_store_fails() {
        let app = build_app(AppState::fake_with(Arc::new(MemoryHealthRepo::failing()), true));
        let res = app
            .oneshot(form("/check-spo2", "name=Ani&age=40&spo2=85", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(res).await.contains("Terjadi kesalahan sistem"));
    }

    #[tokio::test]
    async fn non_numeric_measurement_is_rejected() {
        let health = Arc::new(MemoryHealthRepo::default());
        let app = build_app(AppState::fake_with(health.clone(), false));
        let res = app
            .oneshot(form("/check-spo2", "name=Ani&age=40&spo2=abc", None))
            .await
            .unwrap();
        assert!(res.status().is_client_error());
        assert!(health.records().await.is_empty());
    }

    #[tokio::test]
    async fn overlong_name_is_rejected_before_store() {
        let health = Arc::new(MemoryHealthRepo::default());
        let app = build_app(AppState::fake_with(health.clone(), false));
        let name = "x".repeat(256);

        let res = app
            .clone()
            .oneshot(form(
                "/check-weight-blood",
                &format!("name={name}&age=40&height=160&weight=60&systolic=110&diastolic=70"),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(res).await.contains("Nama harus 1-255 karakter"));

        let res = app
            .oneshot(form("/check-spo2", &format!("name={name}&age=40&spo2=97"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(health.records().await.is_empty());
    }

    fn from_peer(mut req: Request<Body>, ip: [u8; 4]) -> Request<Body> {
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        req
    }

    #[tokio::test]
    async fn requests_over_the_limit_get_429() {
        let mut state = AppState::fake();
        state.rate_limiter = RateLimiter::new(3, std::time::Duration::from_secs(60));
        let app = build_app(state);

        for _ in 0..3 {
            let res = app
                .clone()
                .oneshot(from_peer(get("/login", None), [10, 0, 0, 1]))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app
            .clone()
            .oneshot(from_peer(get("/login", None), [10, 0, 0, 1]))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(body_string(res).await.contains(MSG_TOO_MANY_REQUESTS));

        // a different client is unaffected
        let res = app
            .oneshot(from_peer(get("/login", None), [10, 0, 0, 2]))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
