//! The sign-up wizard.
//!
//! Four steps: choose an account type, enter credentials, describe the pet,
//! and the terminal confirmation. The guards are pure functions of the draft
//! and the last known username availability, so the same rules serve the
//! server-driven step endpoint and its tests.

pub mod probe;

use std::fmt;

use serde::Deserialize;

use crate::{
	model::UserType,
	redirect::FormMessage,
	route::auth::model::RegisterForm,
	username::{self, Availability},
};

pub const MAX_PET_AGE: u8 = 40;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
	#[default]
	ChooseType,
	Credentials,
	Details,
	Done,
}

impl Step {
	pub const fn number(self) -> u8 {
		match self {
			Self::ChooseType => 1,
			Self::Credentials => 2,
			Self::Details => 3,
			Self::Done => 4,
		}
	}

	pub const fn from_number(number: u8) -> Option<Self> {
		match number {
			1 => Some(Self::ChooseType),
			2 => Some(Self::Credentials),
			3 => Some(Self::Details),
			4 => Some(Self::Done),
			_ => None,
		}
	}

	const fn previous(self) -> Option<Self> {
		match self {
			Self::Credentials => Some(Self::ChooseType),
			Self::Details => Some(Self::Credentials),
			Self::ChooseType | Self::Done => None,
		}
	}
}

/// Everything entered so far, exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Draft {
	pub user_type: String,
	#[serde(alias = "user_name")]
	pub username: String,
	pub email: String,
	pub password: String,
	pub pet_name: String,
	pub pet_gender: String,
	pub pet_age: String,
}

impl Draft {
	pub fn user_type(&self) -> Option<UserType> {
		self.user_type.parse().ok()
	}
}

impl From<&Draft> for RegisterForm {
	fn from(draft: &Draft) -> Self {
		let field = |value: &str| (!value.is_empty()).then(|| value.to_owned());

		Self {
			user_type: field(&draft.user_type),
			username: field(&draft.username),
			email: field(&draft.email),
			password: field(&draft.password),
			pet_name: field(&draft.pet_name),
			pet_gender: field(&draft.pet_gender),
			pet_age: field(&draft.pet_age),
		}
	}
}

/// The first unmet condition for leaving a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blocker {
	TypeRequired,
	Email,
	Password,
	Username,
	UsernameUnavailable(Availability),
	PetInfo,
	PetAge,
}

impl fmt::Display for Blocker {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::TypeRequired => "Choose an account type",
			Self::Email => "Enter a valid email address",
			Self::Password => "Password must be between 8 and 30 characters",
			Self::Username => "Username must be between 3 and 30 characters",
			Self::UsernameUnavailable(Availability::Taken) => "Username is already taken",
			Self::UsernameUnavailable(Availability::Invalid) => {
				"Username may only contain letters, numbers and underscores"
			}
			Self::UsernameUnavailable(_) => "Username availability has not been confirmed",
			Self::PetInfo => "All pet information is required",
			Self::PetAge => "Pet age must be between 1 and 40",
		})
	}
}

/// Checks whether the wizard may move forward from `step`.
pub fn check(step: Step, draft: &Draft, availability: Availability) -> Result<(), Blocker> {
	match step {
		Step::ChooseType => draft.user_type().map(drop).ok_or(Blocker::TypeRequired),
		Step::Credentials => {
			let email = draft.email.chars().count();

			if !draft.email.contains('@') || !(1..=60).contains(&email) {
				return Err(Blocker::Email);
			}

			if !(8..=30).contains(&draft.password.chars().count()) {
				return Err(Blocker::Password);
			}

			if !(username::MIN_LENGTH..=username::MAX_LENGTH).contains(&draft.username.chars().count()) {
				return Err(Blocker::Username);
			}

			match availability {
				Availability::Available => Ok(()),
				other => Err(Blocker::UsernameUnavailable(other)),
			}
		}
		Step::Details => match draft.user_type() {
			Some(UserType::NoPet) => Ok(()),
			None => Err(Blocker::TypeRequired),
			Some(UserType::PetOwner) => {
				if draft.pet_name.trim().is_empty()
					|| draft.pet_gender.is_empty()
					|| draft.pet_age.trim().is_empty()
				{
					return Err(Blocker::PetInfo);
				}

				match draft.pet_age.trim().parse::<u8>() {
					Ok(age) if (1..=MAX_PET_AGE).contains(&age) => Ok(()),
					_ => Err(Blocker::PetAge),
				}
			}
		},
		Step::Done => Ok(()),
	}
}

pub fn can_leave(step: Step, draft: &Draft, availability: Availability) -> bool {
	check(step, draft, availability).is_ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
	Next,
	Back,
	/// The page was loaded with a message from a form action.
	Redirected(FormMessage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
	Moved { from: Step, to: Step },
	Blocked(Blocker),
	/// The draft is complete and should be sent as a registration.
	Submit(RegisterForm),
	Ignored,
}

#[derive(Clone, Debug, Default)]
pub struct Wizard {
	step: Step,
	draft: Draft,
	availability: Availability,
}

impl Wizard {
	pub fn resume(step: Step, draft: Draft, availability: Availability) -> Self {
		Self {
			step,
			draft,
			availability,
		}
	}

	pub fn step(&self) -> Step {
		self.step
	}

	pub fn draft(&self) -> &Draft {
		&self.draft
	}

	pub fn availability(&self) -> Availability {
		self.availability
	}

	pub fn into_draft(self) -> Draft {
		self.draft
	}

	pub fn apply(&mut self, event: Event) -> Transition {
		let from = self.step;

		match event {
			Event::Back => match from.previous() {
				Some(to) => self.move_to(to),
				None => Transition::Ignored,
			},
			Event::Redirected(message) if message.is_success() && from == Step::Details => {
				self.move_to(Step::Done)
			}
			Event::Redirected(_) => Transition::Ignored,
			Event::Next => {
				if from == Step::Done {
					return Transition::Ignored;
				}

				if let Err(blocker) = check(from, &self.draft, self.availability) {
					return Transition::Blocked(blocker);
				}

				match (from, self.draft.user_type()) {
					(Step::ChooseType, _) => self.move_to(Step::Credentials),
					(Step::Credentials, Some(UserType::PetOwner)) => self.move_to(Step::Details),
					_ => Transition::Submit(RegisterForm::from(&self.draft)),
				}
			}
		}
	}

	fn move_to(&mut self, to: Step) -> Transition {
		let from = self.step;

		self.step = to;
		Transition::Moved { from, to }
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn credentials(user_type: &str) -> Draft {
		Draft {
			user_type: user_type.into(),
			username: "rex".into(),
			email: "rex@petzli.dev".into(),
			password: "hunter2hunter".into(),
			..Draft::default()
		}
	}

	#[test]
	fn test_step_one_needs_a_type() {
		let mut wizard = Wizard::default();

		assert_eq!(wizard.apply(Event::Next), Transition::Blocked(Blocker::TypeRequired));

		let mut wizard = Wizard::resume(Step::ChooseType, credentials("pet-owner"), Availability::Unknown);

		assert_eq!(
			wizard.apply(Event::Next),
			Transition::Moved {
				from: Step::ChooseType,
				to: Step::Credentials
			}
		);
	}

	#[test]
	fn test_step_two_needs_an_available_username() {
		for availability in [
			Availability::Unknown,
			Availability::Checking,
			Availability::Taken,
			Availability::Invalid,
		] {
			assert!(!can_leave(Step::Credentials, &credentials("no-pet"), availability));
		}

		assert!(can_leave(Step::Credentials, &credentials("no-pet"), Availability::Available));
	}

	#[test]
	fn test_step_two_bounds() {
		let draft = Draft {
			email: "rex.petzli.dev".into(),
			..credentials("no-pet")
		};
		assert_eq!(check(Step::Credentials, &draft, Availability::Available), Err(Blocker::Email));

		let draft = Draft {
			password: "short".into(),
			..credentials("no-pet")
		};
		assert_eq!(check(Step::Credentials, &draft, Availability::Available), Err(Blocker::Password));

		let draft = Draft {
			username: "ab".into(),
			..credentials("no-pet")
		};
		assert_eq!(check(Step::Credentials, &draft, Availability::Available), Err(Blocker::Username));
	}

	#[test]
	fn test_no_pet_submits_from_step_two() {
		let mut wizard = Wizard::resume(Step::Credentials, credentials("no-pet"), Availability::Available);

		let Transition::Submit(form) = wizard.apply(Event::Next) else {
			panic!("expected a submission");
		};

		assert_eq!(form.user_type.as_deref(), Some("no-pet"));
		assert_eq!(form.pet_name, None);
		assert_eq!(wizard.step(), Step::Credentials);
	}

	#[test]
	fn test_pet_owner_needs_pet_details() {
		let mut wizard = Wizard::resume(Step::Credentials, credentials("pet-owner"), Availability::Available);

		assert_eq!(
			wizard.apply(Event::Next),
			Transition::Moved {
				from: Step::Credentials,
				to: Step::Details
			}
		);
		assert_eq!(wizard.apply(Event::Next), Transition::Blocked(Blocker::PetInfo));

		let draft = Draft {
			pet_name: "Rex".into(),
			pet_gender: "male".into(),
			pet_age: "0".into(),
			..credentials("pet-owner")
		};
		assert_eq!(check(Step::Details, &draft, Availability::Unknown), Err(Blocker::PetAge));

		let mut wizard = Wizard::resume(
			Step::Details,
			Draft {
				pet_age: "4".into(),
				..draft
			},
			Availability::Unknown,
		);
		assert!(matches!(wizard.apply(Event::Next), Transition::Submit(..)));
	}

	#[test]
	fn test_back_only_from_steps_two_and_three() {
		for (step, expected) in [
			(Step::ChooseType, None),
			(Step::Credentials, Some(Step::ChooseType)),
			(Step::Details, Some(Step::Credentials)),
			(Step::Done, None),
		] {
			let mut wizard = Wizard::resume(step, Draft::default(), Availability::Unknown);
			let transition = wizard.apply(Event::Back);

			match expected {
				Some(to) => assert_eq!(transition, Transition::Moved { from: step, to }),
				None => assert_eq!(transition, Transition::Ignored),
			}
		}
	}

	#[test]
	fn test_success_redirect_jumps_to_done() {
		let success = FormMessage::Success("Thanks".into());

		let mut wizard = Wizard::resume(Step::Details, Draft::default(), Availability::Unknown);
		assert_eq!(
			wizard.apply(Event::Redirected(success.clone())),
			Transition::Moved {
				from: Step::Details,
				to: Step::Done
			}
		);
		assert_eq!(wizard.apply(Event::Next), Transition::Ignored);

		let mut wizard = Wizard::resume(Step::Credentials, Draft::default(), Availability::Unknown);
		assert_eq!(wizard.apply(Event::Redirected(success)), Transition::Ignored);

		let mut wizard = Wizard::resume(Step::Details, Draft::default(), Availability::Unknown);
		assert_eq!(
			wizard.apply(Event::Redirected(FormMessage::Error("nope".into()))),
			Transition::Ignored
		);
	}
}
