use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an account uses Petzli. Chosen in the first sign-up step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserType {
	PetOwner,
	NoPet,
}

impl UserType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::PetOwner => "pet-owner",
			Self::NoPet => "no-pet",
		}
	}
}

impl FromStr for UserType {
	type Err = ();

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"pet-owner" => Ok(Self::PetOwner),
			"no-pet" => Ok(Self::NoPet),
			_ => Err(()),
		}
	}
}

impl fmt::Display for UserType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetGender {
	Male,
	Female,
}

impl FromStr for PetGender {
	type Err = ();

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value {
			"male" => Ok(Self::Male),
			"female" => Ok(Self::Female),
			_ => Err(()),
		}
	}
}

/// Metadata attached to an account when it is created.
///
/// The pet fields are only set for pet owners; no separate pet entity exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetadata {
	pub user_name: String,
	pub user_type: UserType,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pet_name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pet_age: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pet_gender: Option<PetGender>,
}

/// A validated account, ready to be created on the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAccount {
	pub email: String,
	pub password: String,
	pub metadata: AccountMetadata,
}

/// The authenticated user, as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
	pub id: Uuid,
	#[serde(default)]
	pub email: Option<String>,
}

/// A backend session. Only the access token is kept in the browser.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthSession {
	pub access_token: String,
	#[serde(default)]
	pub refresh_token: Option<String>,
	pub user: AuthUser,
}

/// Public profile fields, joined onto posts in the feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
	pub user_name: String,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

/// A post row as it is inserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewPost {
	pub title: String,
	pub description: Option<String>,
	pub location: Option<String>,
	/// Storage object path of the uploaded image.
	pub image: String,
	pub author_id: Uuid,
}

/// A post row as it is read back, with the author's profile joined.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
	pub id: i64,
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub location: Option<String>,
	pub image: String,
	pub author_id: Uuid,
	pub created_at: DateTime<Utc>,
	#[serde(default)]
	pub profiles: Option<Profile>,
}

/// A post ready to be rendered in the feed.
#[derive(Clone, Debug, Serialize)]
pub struct FeedPost {
	pub post: Post,
	pub image_url: String,
}
