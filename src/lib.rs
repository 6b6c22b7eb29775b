#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod debounce;
pub mod error;
pub mod extract;
pub mod model;
pub mod page;
pub mod ratelimit;
pub mod redirect;
pub mod route;
pub mod session;
pub mod trace;
pub mod username;
pub mod wizard;

#[cfg(test)]
mod test;

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

pub use error::Error;

pub type AppState = State;

/// The shared application state.
///
/// Handlers pick the part they need with `State<SharedBackend>` or
/// `State<Arc<Config>>`.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub backend: backend::SharedBackend,
	pub config: Arc<config::Config>,
}

/// Builds the router with its request id, tracing and compression layers.
///
/// Rate limiting needs the peer address, so it is added by the binary.
pub fn app(state: State) -> Router {
	route::routes().with_state(state).layer(
		ServiceBuilder::new()
			.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
			.layer(TraceLayer::new_for_http())
			.layer(PropagateRequestIdLayer::x_request_id())
			.layer(CompressionLayer::new()),
	)
}
