use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

pub type Config = GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// 10 requests per second per peer address, with bursts of up to 50.
///
/// Returns `None` if the quota is rejected by the builder.
pub fn default() -> Option<Arc<Config>> {
	GovernorConfigBuilder::default()
		.per_second(10)
		.burst_size(50)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	crate::Error::RateLimited(error).into_response()
}

/// Periodically drops limiter state for peers that have gone quiet.
pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!(size = limiter.len(), "rate limiting storage");

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	use axum::http::StatusCode;

	use super::*;

	#[test]
	fn test_default_quota_is_accepted() {
		assert!(default().is_some());
	}

	#[test]
	fn test_too_many_requests_is_json() {
		let response = error_handler(GovernorError::TooManyRequests {
			wait_time: 1,
			headers: None,
		});

		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
	}
}
