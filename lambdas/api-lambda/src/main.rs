use lambda_http::{run, service_fn, Error, Request};
use aws_sdk_dynamodb::Client as DynamoClient;
use coachlife_shared::{config::Config, AppState};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_http::tracing::init_default_subscriber();

    let config = Config::from_env()?;
    tracing::info!(
        "Starting CoachLife API - table: {} timezone: {} translation: {}",
        config.table_name,
        config.timezone,
        if config.translation.is_some() { "enabled" } else { "disabled" }
    );

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;
    let state = AppState::from_config(&config, DynamoClient::new(&aws_config));

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
