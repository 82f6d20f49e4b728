mod app;
mod auth;
mod config;
mod health;
mod rate_limit;
mod sessions;
mod state;
mod views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "health_check=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    let sweeper = match app_state.config.session.sweep_secs {
        0 => None,
        secs => Some(sessions::spawn_sweeper(
            app_state.auth.sessions().clone(),
            std::time::Duration::from_secs(secs),
        )),
    };

    let result = app::serve(app::build_app(app_state.clone())).await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    app_state.close().await;
    result
}
