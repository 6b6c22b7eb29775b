#![warn(clippy::pedantic)]

use std::{net::SocketAddr, sync::Arc};

use petzli::{backend, config::Config, ratelimit, trace, State};
use tower_governor::GovernorLayer;

#[derive(Debug, thiserror::Error)]
enum InitError {
	#[error("{0}")]
	Config(#[from] petzli::config::Error),
	#[error("{0}")]
	Trace(#[from] trace::Error),
	#[error("{0}")]
	Backend(#[from] backend::ConnectError),
	#[error("invalid rate limit quota")]
	RateLimit,
	#[error("error binding tcp listener: {0}")]
	TcpBind(std::io::Error),
	#[error("error serving: {0}")]
	TcpServe(std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
	let config = Config::from_env()?;
	let _guard = trace::init(&config)?;

	let state = State {
		backend: backend::connect(&config)?,
		config: Arc::new(config),
	};
	let address = SocketAddr::new(state.config.host, state.config.port);

	let governor = ratelimit::default().ok_or(InitError::RateLimit)?;

	ratelimit::cleanup_old_limits(&[&governor]);

	let app = petzli::app(state).layer(GovernorLayer { config: governor });

	let listener = tokio::net::TcpListener::bind(address)
		.await
		.map_err(InitError::TcpBind)?;

	tracing::info!(%address, "listening");

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await
	.map_err(InitError::TcpServe)
}
