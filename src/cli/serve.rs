use crate::{config::Config, error, server};

pub async fn serve() {
    server::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Cannot load configuration. Err: {}", e),
    };

    if let Err(e) = server::start_api_server(&config).await {
        error!("Server failed. Err: {}", e);
    }
}
