use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("error parsing .env file: {0}")]
	Dotenv(#[from] dotenvy::Error),
	#[error("error parsing environment: {0}")]
	Envy(#[from] envy::Error),
}

/// Settings read from the environment (and `.env`, when present).
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	#[serde(default = "default_host")]
	pub host: IpAddr,
	#[serde(default = "default_port")]
	pub port: u16,
	/// Public origin of this site, used to build the links the backend emails.
	#[serde(default = "default_site_origin")]
	pub site_origin: String,
	pub backend_url: Option<String>,
	pub backend_anon_key: Option<String>,
	#[serde(default = "default_storage_bucket")]
	pub storage_bucket: String,
	#[serde(default = "default_oauth_provider")]
	pub oauth_provider: String,
	#[serde(default = "default_backend_timeout_secs")]
	pub backend_timeout_secs: u64,
	pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_host() -> IpAddr {
	IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
	3000
}

fn default_site_origin() -> String {
	"http://localhost:3000".into()
}

fn default_storage_bucket() -> String {
	"posts".into()
}

fn default_oauth_provider() -> String {
	"github".into()
}

fn default_backend_timeout_secs() -> u64 {
	10
}

impl Default for Config {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
			site_origin: default_site_origin(),
			backend_url: None,
			backend_anon_key: None,
			storage_bucket: default_storage_bucket(),
			oauth_provider: default_oauth_provider(),
			backend_timeout_secs: default_backend_timeout_secs(),
			otel_exporter_otlp_endpoint: None,
		}
	}
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		if let Err(error) = dotenvy::dotenv() {
			if !error.not_found() {
				return Err(error.into());
			}
		}

		Ok(envy::from_env()?)
	}

	/// The absolute `/auth/callback` URL, optionally forwarding to `redirect_to` afterwards.
	pub fn callback_url(&self, redirect_to: Option<&str>) -> String {
		let origin = self.site_origin.trim_end_matches('/');

		match redirect_to {
			Some(path) => format!(
				"{origin}/auth/callback?{}",
				url::form_urlencoded::Serializer::new(String::new())
					.append_pair("redirect_to", path)
					.finish()
			),
			None => format!("{origin}/auth/callback"),
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_callback_url() {
		let config = Config {
			site_origin: "https://petzli.dev/".into(),
			..Config::default()
		};

		assert_eq!(config.callback_url(None), "https://petzli.dev/auth/callback");
		assert_eq!(
			config.callback_url(Some("/protected/reset-password")),
			"https://petzli.dev/auth/callback?redirect_to=%2Fprotected%2Freset-password"
		);
	}

	#[test]
	fn test_defaults_from_empty_environment() {
		let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

		assert_eq!(config.port, 3000);
		assert_eq!(config.storage_bucket, "posts");
		assert!(config.backend_url.is_none());
	}
}
