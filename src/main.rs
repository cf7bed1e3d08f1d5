use std::net::SocketAddr;
use std::sync::Arc;
use sqlx::postgres::PgPoolOptions;
use std::env;
use dotenvy::dotenv;
use codetrack::create_app;
use codetrack::scrape::transport::Transport;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let database_url = env::var("POSTGRES_URI")
        .expect("POSTGRES_URI must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to create pool");

    let transport = Arc::new(Transport::new().expect("Failed to build scrape transport"));

    let app = create_app(pool, transport);

    // Run our application
    let addr = SocketAddr::from(([127, 0, 0, 1], 8000));
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
