//! The sign-up wizard page.
//!
//! Each step is one form posting to `/sign-up/step`. Fields of the other steps
//! travel along as hidden inputs, so the server holds no wizard state.

use axum::response::Html;
use maud::{html, Markup};

use super::{layout, message_box};
use crate::{
	model::UserType,
	redirect::FormMessage,
	username::Availability,
	wizard::{Draft, Step, Wizard, MAX_PET_AGE},
};

fn fields(draft: &Draft) -> [(&'static str, &str); 7] {
	[
		("userType", &draft.user_type),
		("username", &draft.username),
		("email", &draft.email),
		("password", &draft.password),
		("petName", &draft.pet_name),
		("petGender", &draft.pet_gender),
		("petAge", &draft.pet_age),
	]
}

/// Hidden inputs for every draft field the current step does not show.
fn carried(draft: &Draft, shown: &[&str]) -> Markup {
	html! {
		@for (name, value) in fields(draft) {
			@if !shown.contains(&name) && !value.is_empty() {
				input type="hidden" name=(name) value=(value);
			}
		}
	}
}

fn progress(step: Step) -> Markup {
	html! {
		ol.progress {
			@for number in 1..=3 {
				li.done[number < step.number()].current[number == step.number()] { (number) }
			}
		}
	}
}

fn buttons(step: Step, last: bool) -> Markup {
	html! {
		div.buttons {
			@if step != Step::ChooseType {
				button type="submit" name="intent" value="back" formnovalidate { "Back" }
			}
			button type="submit" name="intent" value="next" {
				@if last { "Sign up" } @else { "Next" }
			}
		}
	}
}

fn choose_type(draft: &Draft) -> Markup {
	let selected = draft.user_type();

	html! {
		h2 { "Choose how you'd like to use our platform" }
		label.choice {
			input type="radio" name="userType" value=(UserType::PetOwner.as_str())
				checked[selected == Some(UserType::PetOwner)];
			strong { "I have a pet" }
			p { "Show off your pet's best moments" }
		}
		label.choice {
			input type="radio" name="userType" value=(UserType::NoPet.as_str())
				checked[selected == Some(UserType::NoPet)];
			strong { "I don't have a pet" }
			p { "Explore pets and meet their humans" }
		}
	}
}

fn availability_hint(draft: &Draft, availability: Availability) -> Option<&'static str> {
	match availability {
		Availability::Available => Some("This username is available!"),
		Availability::Taken | Availability::Invalid => Some("This username is not available or invalid."),
		Availability::Checking => Some("Checking availability..."),
		Availability::Unknown if !draft.username.is_empty() && draft.username.chars().count() < 3 => {
			Some("Username must be at least 3 characters.")
		}
		Availability::Unknown => None,
	}
}

fn credentials(draft: &Draft, availability: Availability) -> Markup {
	html! {
		label for="email" { "Email address" }
		input id="email" type="email" name="email" value=(draft.email)
			placeholder="Example: furry.pet@gmail.com" required;
		label for="password" { "Password" }
		input id="password" type="password" name="password" value=(draft.password)
			placeholder="Don't forget pas-sword" minlength="8" maxlength="30" required;
		label for="username" { "Username" }
		input id="username" type="text" name="username" value=(draft.username)
			placeholder="Choose the furry little paw username" minlength="3" maxlength="30"
			autocomplete="off" data-availability="/api/username-availability" required;
		@if let Some(hint) = availability_hint(draft, availability) {
			p.hint.available[availability == Availability::Available] { (hint) }
		}
	}
}

fn details(draft: &Draft) -> Markup {
	html! {
		h2 { "Tell us about your pet" }
		p { "Help us create a profile for your furry friend" }
		label for="petName" { "Pet name" }
		input id="petName" type="text" name="petName" value=(draft.pet_name)
			placeholder="What's your pet's name?" required;
		label for="petGender" { "Pet gender" }
		select id="petGender" name="petGender" required {
			option value="" disabled selected[draft.pet_gender.is_empty()] { "Choose your pet's gender" }
			option value="male" selected[draft.pet_gender == "male"] { "Male" }
			option value="female" selected[draft.pet_gender == "female"] { "Female" }
		}
		label for="petAge" { "Pet age" }
		input id="petAge" type="number" name="petAge" value=(draft.pet_age)
			placeholder="How old is your pet?" min="1" max=(MAX_PET_AGE) required;
		p.hint { "Enter age in years" }
	}
}

/// `provider` is the display name of the OAuth provider offered on the first step.
pub fn render(wizard: &Wizard, message: &FormMessage, provider: &str) -> Html<String> {
	let step = wizard.step();
	let draft = wizard.draft();
	let last = step == Step::Details
		|| (step == Step::Credentials && draft.user_type() == Some(UserType::NoPet));

	let content = html! {
		h1 { "Sign up to see furry animals." }
		@if step == Step::Done {
			section.done {
				h2 { "Check your email" }
				@if draft.email.is_empty() {
					p { "We have sent you an account verification email." }
				} @else {
					p { "We have sent an account verification email to " strong { (draft.email) } }
				}
				(message_box(message))
				a href="/sign-in" { "Back to sign in" }
			}
		} @else {
			(progress(step))
			form.wizard method="post" action="/sign-up/step" {
				input type="hidden" name="step" value=(step.number());
				@match step {
					Step::ChooseType => {
						(carried(draft, &["userType"]))
						(choose_type(draft))
					}
					Step::Credentials => {
						(carried(draft, &["username", "email", "password"]))
						(credentials(draft, wizard.availability()))
					}
					_ => {
						(carried(draft, &["petName", "petGender", "petAge"]))
						(details(draft))
					}
				}
				(buttons(step, last))
				(message_box(message))
			}
			@if step == Step::ChooseType {
				form.oauth method="post" action="/auth/oauth" {
					button type="submit" { "Sign up with " (provider) }
				}
			}
			p {
				"Already have an account? "
				a href="/sign-in" { "Log in" }
			}
		}
	};

	layout("Sign up", false, &content)
}

#[cfg(test)]
mod test {
	use super::*;

	fn draft() -> Draft {
		Draft {
			user_type: "pet-owner".into(),
			username: "rex".into(),
			email: "rex@petzli.dev".into(),
			password: "hunter2hunter".into(),
			pet_name: "Rex \"the good boy\"".into(),
			..Draft::default()
		}
	}

	#[test]
	fn test_other_steps_are_carried() {
		let wizard = Wizard::resume(Step::Credentials, draft(), Availability::Available);
		let html = render(&wizard, &FormMessage::None, "GitHub").0;

		assert!(html.contains(r#"<input type="hidden" name="step" value="2">"#));
		assert!(html.contains(r#"<input type="hidden" name="userType" value="pet-owner">"#));
		assert!(html.contains(r#"name="petName" value="Rex &quot;the good boy&quot;""#));
		assert!(html.contains("This username is available!"));
		assert!(!html.contains(r#"name="petGender""#));
		assert!(!html.contains("Sign up with GitHub"));
	}

	#[test]
	fn test_first_step_offers_oauth() {
		let html = render(&Wizard::default(), &FormMessage::None, "GitHub").0;

		assert!(html.contains(r#"action="/auth/oauth""#));
		assert!(html.contains("Sign up with GitHub"));
	}

	#[test]
	fn test_done_step() {
		let wizard = Wizard::resume(Step::Done, draft(), Availability::Unknown);
		let html = render(&wizard, &FormMessage::Success("Thanks for signing up!".into()), "GitHub").0;

		assert!(html.contains("Check your email"));
		assert!(html.contains("rex@petzli.dev"));
		assert!(!html.contains(r#"name="step""#));
	}
}
