use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use feedback_portal::{
    AppState,
    backend::{FeedbackBackend, MemoryBackend, PgBackend},
    clock::SystemClock,
    config::Config,
    router::create_router,
    session::DeviceSessions,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 远程存储：配置了数据库则用 Postgres，否则用进程内存储
    let backend: Arc<dyn FeedbackBackend> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        conn.execute("SET application_name = 'feedback_portal';")
                            .await?;
                        Ok(())
                    })
                })
                .connect(url)
                .await
                .expect("Failed to connect to Postgres");
            Arc::new(PgBackend::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory backend");
            Arc::new(MemoryBackend::new())
        }
    };

    // 设备本地存储：配置了 Redis 则按设备命名空间存放
    let redis = config.redis_url.as_ref().map(|url| {
        Arc::new(redis::Client::open(url.as_str()).expect("Failed to create Redis client"))
    });
    if redis.is_none() {
        tracing::warn!("REDIS_URL not set, device state is kept in process memory");
    }

    let limits = config.rate_limits;
    tracing::info!(
        "Rate limits: create_bug {}/{:?}, create_feature {}/{:?}, vote {}/{:?}",
        limits.create_bug.max_requests,
        limits.create_bug.window(),
        limits.create_feature.max_requests,
        limits.create_feature.window(),
        limits.vote.max_requests,
        limits.vote.window(),
    );

    // 设置应用状态
    let state = AppState {
        config: config.clone(),
        sessions: Arc::new(DeviceSessions::new(
            redis,
            backend,
            Arc::new(SystemClock),
            limits,
            config.sessions,
        )),
    };

    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}
