use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::Error;
use crate::{
	model::{AccountMetadata, NewAccount, PetGender, UserType},
	username::{self, Availability},
	wizard::{self, Draft},
};

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
	let mut error = ValidationError::new(code);

	error.message = Some(message.into());
	error
}

fn validate_username(name: &str) -> Result<(), ValidationError> {
	match name.chars().count() {
		..=2 => Err(invalid("username_length", "Username must be at least 3 characters")),
		31.. => Err(invalid("username_length", "Username cannot exceed 30 characters")),
		_ if !username::is_well_formed(name) => Err(invalid(
			"username_charset",
			"Username may only contain letters, numbers and underscores",
		)),
		_ => Ok(()),
	}
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
	match password.chars().count() {
		..=7 => Err(invalid("password_length", "Password must be at least 8 characters")),
		31.. => Err(invalid("password_length", "Password cannot exceed 30 characters")),
		_ => Ok(()),
	}
}

fn validate_pet_gender(gender: &str) -> Result<(), ValidationError> {
	gender
		.parse::<PetGender>()
		.map(drop)
		.map_err(|()| invalid("pet_gender", "Pet gender must be male or female"))
}

/// Ages are whole years, 1 through 40.
fn validate_pet_age(age: &str) -> Result<(), ValidationError> {
	let age = age
		.trim()
		.parse::<i64>()
		.map_err(|_| invalid("pet_age", "Pet age must be a number"))?;

	match age {
		..=-1 => Err(invalid("pet_age", "Pet age cannot be negative")),
		0 => Err(invalid("pet_age", "Age must be a positive number")),
		age if age > i64::from(wizard::MAX_PET_AGE) => {
			Err(invalid("pet_age", "Pet age cannot exceed 40 years"))
		}
		_ => Ok(()),
	}
}

/// The raw registration form. Every field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
	pub user_type: Option<String>,
	#[serde(alias = "user_name")]
	pub username: Option<String>,
	pub email: Option<String>,
	pub password: Option<String>,
	pub pet_name: Option<String>,
	pub pet_gender: Option<String>,
	pub pet_age: Option<String>,
}

impl RegisterForm {
	/// Checks that the required fields are present, without validating them.
	pub fn into_registration(self) -> Result<Registration, Error> {
		let present = |value: Option<String>| value.filter(|value| !value.is_empty());

		let (Some(user_type), Some(username), Some(email), Some(password)) = (
			present(self.user_type),
			present(self.username),
			present(self.email),
			present(self.password),
		) else {
			return Err(Error::MissingFields);
		};

		let credentials = Credentials {
			username,
			email,
			password,
		};

		match user_type.parse::<UserType>() {
			Ok(UserType::PetOwner) => {
				let (Some(name), Some(gender), Some(age)) = (
					present(self.pet_name),
					present(self.pet_gender),
					present(self.pet_age),
				) else {
					return Err(Error::MissingPetInfo);
				};

				Ok(Registration::PetOwner(PetOwnerRegistration {
					credentials,
					pet: PetInput { name, gender, age },
				}))
			}
			Ok(UserType::NoPet) => Ok(Registration::NoPet(NoPetRegistration { credentials })),
			Err(()) => Err(Error::Invalid("Account type must be pet-owner or no-pet".into())),
		}
	}
}

#[derive(Debug, Validate)]
pub struct Credentials {
	#[validate(custom(function = "validate_username"))]
	pub username: String,
	#[validate(
		email(message = "Please enter a valid email address"),
		length(max = 60, message = "Email cannot exceed 60 characters")
	)]
	pub email: String,
	#[validate(custom(function = "validate_password"))]
	pub password: String,
}

#[derive(Debug, Validate)]
pub struct PetInput {
	#[validate(length(min = 1, message = "Pet name is required"))]
	pub name: String,
	#[validate(custom(function = "validate_pet_gender"))]
	pub gender: String,
	#[validate(custom(function = "validate_pet_age"))]
	pub age: String,
}

#[derive(Debug, Validate)]
pub struct PetOwnerRegistration {
	#[validate(nested)]
	pub credentials: Credentials,
	#[validate(nested)]
	pub pet: PetInput,
}

#[derive(Debug, Validate)]
pub struct NoPetRegistration {
	#[validate(nested)]
	pub credentials: Credentials,
}

/// Registration fields in the order their messages are reported, nested
/// struct names included.
pub const FIELDS: &[&str] = &[
	"credentials",
	"username",
	"email",
	"password",
	"pet",
	"name",
	"gender",
	"age",
];

/// A registration, discriminated by account type.
#[derive(Debug)]
pub enum Registration {
	PetOwner(PetOwnerRegistration),
	NoPet(NoPetRegistration),
}

impl Validate for Registration {
	fn validate(&self) -> Result<(), ValidationErrors> {
		match self {
			Self::PetOwner(registration) => registration.validate(),
			Self::NoPet(registration) => registration.validate(),
		}
	}
}

impl Registration {
	pub fn credentials(&self) -> &Credentials {
		match self {
			Self::PetOwner(registration) => &registration.credentials,
			Self::NoPet(registration) => &registration.credentials,
		}
	}

	/// Converts a validated registration into the account to create.
	pub fn into_account(self) -> NewAccount {
		let (credentials, user_type, pet) = match self {
			Self::PetOwner(registration) => (
				registration.credentials,
				UserType::PetOwner,
				Some(registration.pet),
			),
			Self::NoPet(registration) => (registration.credentials, UserType::NoPet, None),
		};

		NewAccount {
			email: credentials.email,
			password: credentials.password,
			metadata: AccountMetadata {
				user_name: credentials.username,
				user_type,
				pet_age: pet.as_ref().and_then(|pet| pet.age.trim().parse().ok()),
				pet_gender: pet.as_ref().and_then(|pet| pet.gender.parse().ok()),
				pet_name: pet.map(|pet| pet.name),
			},
		}
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct SignInForm {
	pub email: Option<String>,
	pub password: Option<String>,
}

#[derive(Debug, Validate)]
pub struct SignInInput {
	#[validate(email, length(min = 1, max = 60))]
	pub email: String,
	#[validate(length(min = 8, max = 30))]
	pub password: String,
}

impl From<SignInForm> for SignInInput {
	fn from(form: SignInForm) -> Self {
		Self {
			email: form.email.unwrap_or_default().trim().to_lowercase(),
			password: form.password.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordForm {
	pub email: Option<String>,
	pub callback_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
	pub password: Option<String>,
	pub confirm_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthForm {
	pub provider: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
	pub code: Option<String>,
	pub redirect_to: Option<String>,
	pub error_description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UsernameQuery {
	#[validate(length(min = 1, max = 64, message = "Username is required"))]
	pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
	pub username: String,
	pub available: bool,
	pub status: Availability,
}

impl UsernameAvailability {
	pub fn new(username: String, status: Availability) -> Self {
		Self {
			username,
			available: status == Availability::Available,
			status,
		}
	}
}

/// A sign-up wizard submission: the step being left, the button pressed and the draft.
#[derive(Debug, Deserialize)]
pub struct StepForm {
	#[serde(default)]
	pub step: String,
	#[serde(default)]
	pub intent: String,
	#[serde(flatten)]
	pub draft: Draft,
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::error::messages;

	fn form(user_type: &str) -> RegisterForm {
		RegisterForm {
			user_type: Some(user_type.into()),
			username: Some("rex".into()),
			email: Some("rex@petzli.dev".into()),
			password: Some("hunter2hunter".into()),
			pet_name: Some("Rex".into()),
			pet_gender: Some("male".into()),
			pet_age: Some("4".into()),
		}
	}

	fn errors(form: RegisterForm) -> Vec<String> {
		let registration = form.into_registration().unwrap();

		registration
			.validate()
			.map_or_else(|errors| messages(&errors, FIELDS), |()| Vec::new())
	}

	#[test]
	fn test_presence_runs_before_validation() {
		let missing = RegisterForm {
			email: Some(String::new()),
			..form("no-pet")
		};
		assert!(matches!(missing.into_registration(), Err(Error::MissingFields)));

		let missing_pet = RegisterForm {
			pet_age: None,
			..form("pet-owner")
		};
		assert!(matches!(missing_pet.into_registration(), Err(Error::MissingPetInfo)));

		let no_pet = RegisterForm {
			pet_age: None,
			..form("no-pet")
		};
		assert!(no_pet.into_registration().is_ok());
	}

	#[test]
	fn test_pet_age_bounds() {
		for (age, expected) in [
			("0", Some("Age must be a positive number")),
			("-2", Some("Pet age cannot be negative")),
			("41", Some("Pet age cannot exceed 40 years")),
			("old", Some("Pet age must be a number")),
			("1", None),
			("40", None),
		] {
			let errors = errors(RegisterForm {
				pet_age: Some(age.into()),
				..form("pet-owner")
			});

			assert_eq!(errors.first().map(String::as_str), expected, "age {age}");
		}
	}

	#[test]
	fn test_messages_are_joined_in_field_order() {
		let errors = errors(RegisterForm {
			username: Some("ab".into()),
			password: Some("short".into()),
			pet_gender: Some("other".into()),
			..form("pet-owner")
		});

		assert_eq!(
			errors.join(", "),
			"Username must be at least 3 characters, Password must be at least 8 characters, Pet gender must be male or female"
		);
	}

	#[test]
	fn test_pet_messages_follow_the_form() {
		let errors = errors(RegisterForm {
			email: Some("not-an-email".into()),
			pet_gender: Some("other".into()),
			pet_age: Some("0".into()),
			..form("pet-owner")
		});

		assert_eq!(
			errors,
			[
				"Please enter a valid email address",
				"Pet gender must be male or female",
				"Age must be a positive number"
			]
		);
	}

	#[test]
	fn test_into_account_carries_metadata() {
		let account = form("pet-owner").into_registration().unwrap().into_account();

		assert_eq!(account.metadata.user_name, "rex");
		assert_eq!(account.metadata.user_type, UserType::PetOwner);
		assert_eq!(account.metadata.pet_age, Some(4));
		assert_eq!(account.metadata.pet_gender, Some(PetGender::Male));

		let account = form("no-pet").into_registration().unwrap().into_account();

		assert_eq!(account.metadata.pet_name, None);
		assert_eq!(account.metadata.pet_age, None);
	}

	#[test]
	fn test_sign_in_is_normalized() {
		let input = SignInInput::from(SignInForm {
			email: Some("  Rex@Petzli.DEV ".into()),
			password: Some("hunter2hunter".into()),
		});

		assert_eq!(input.email, "rex@petzli.dev");
		assert!(input.validate().is_ok());
	}
}
