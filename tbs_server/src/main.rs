use std::env;

use dotenvy::dotenv;
use log::{error, info};
use tbs_server::{config::ServerConfig, server::run_server};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = ServerConfig::from_env_or_default();
    if !preflight_check(&config) {
        eprintln!("🚀️ Preflight check failed. Exiting. Check the logs for details.");
        return;
    }

    info!("🚀️ Starting Ticket Booking Server on {}:{}", config.host, config.port);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

fn preflight_check(config: &ServerConfig) -> bool {
    if env::var("TBS_SKIP_PREFLIGHT").ok() == Some("Yes".to_string()) {
        info!("🚦️ Skipping preflight checks. I hope you know what you're doing!");
        return true;
    }
    let mut result = true;
    info!("🚦️ Running preflight checks...");
    if config.database_url.is_empty() {
        error!("🚦️ DATABASE_URL is not set. Please set it to the URL of the booking database.");
        result = false;
    }
    if config.jwt_secret.reveal().is_empty() {
        error!("🚦️ JWT_SECRET is not set. Bearer tokens cannot be validated without it.");
        result = false;
    }
    if config.payment_webhook_secret.reveal().is_empty() {
        error!("🚦️ PAYMENT_WEBHOOK_SECRET is not set. Webhook signatures cannot be verified without it.");
        result = false;
    }
    if result {
        info!("🚦️ Preflight check PASSED.");
    } else {
        error!("🚦️ Preflight check FAILED: Please fix the issues above before starting the server.");
        info!(
            "🚦️ If you really know what you're doing and want to skip the preflight check, set `TBS_SKIP_PREFLIGHT` \
             to `Yes` in your environment variables"
        );
    }
    result
}
