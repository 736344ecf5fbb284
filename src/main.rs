mod etherscan;
mod primitives;
mod rates;
mod server;
mod session;
mod settings;
mod store;

use server::Server;

use crate::settings::Settings;

const CONFIG_FILE: &str = "Settings.toml";

#[tokio::main]
async fn main() {
    let settings = Settings::from_toml(CONFIG_FILE);

    let _ = tracing_subscriber::fmt()
        .with_env_filter("explorer=info,sqlx=warn")
        .try_init();

    let server = Server::new(settings)
        .await
        .expect("Failed to initialize server");
    server.run().await;
}
