pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::etherscan::EtherscanClient;
use crate::rates::{HttpRateSource, RateSource};
use crate::server::handlers::HandlerState;
use crate::session::Sessions;
use crate::settings::Settings;
use crate::store::TxStore;

pub struct Server {
    pub port: u16,
    pub state: HandlerState,
}

impl Server {
    pub async fn new(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let store = TxStore::from_db_url(&settings.db_url).await?;
        store.create_tables().await?;

        let rates: Arc<dyn RateSource> = Arc::new(HttpRateSource::new(settings.rates_url));
        let state = HandlerState {
            store,
            etherscan: EtherscanClient::new(settings.etherscan_url, settings.etherscan_api_key),
            rates,
            sessions: Arc::new(Sessions::new()),
        };

        Ok(Self {
            port: settings.port,
            state,
        })
    }

    pub async fn run(&self) {
        // Basic CORS setup
        let cors = CorsLayer::new()
            .allow_methods(vec![Method::GET, Method::POST])
            .allow_origin(Any)
            .allow_headers(AllowHeaders::any());

        let app = Router::new()
            .route("/", get(handlers::home))
            .route("/health", get(handlers::health))
            .route(
                "/address",
                post(handlers::search).get(handlers::search_rejected),
            )
            .route(
                "/address/",
                post(handlers::search).get(handlers::search_rejected),
            )
            .route("/address/{address}", get(handlers::address))
            .route(
                "/conversion",
                get(handlers::conversion_form).post(handlers::convert),
            )
            .route("/error", get(handlers::error_page))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, app).await.unwrap();
    }
}
