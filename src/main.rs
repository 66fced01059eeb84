use std::io;

use log::info;

use chat_socket::config::ServerConfig;
use chat_socket::hub;
use chat_socket::server::start_server_with_config;

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env();
    info!("starting chat broker on port {}", config.port);

    // a bind/listen failure is the only error that escapes to the process
    let events = start_server_with_config(config.clone()).await?;
    hub::run(events, config).await;

    Ok(())
}
