use tokio::net::TcpListener;

use ventichat::config::Config;
use ventichat::routes;
use ventichat::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ventichat=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    let db = ventichat::db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");

    let state = AppState::new(db, config.timeouts);
    let app = routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app).await.expect("server error");
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36mventichat\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m             {}", config.port);
    eprintln!("  \x1b[2mdatabase\x1b[0m         {}", config.database_url);
    eprintln!(
        "  \x1b[2mauth timeout\x1b[0m     {}s",
        config.timeouts.auth.as_secs()
    );
    eprintln!(
        "  \x1b[2mheartbeat grace\x1b[0m  {}s",
        config.timeouts.heartbeat_grace.as_secs()
    );
    eprintln!();
}
