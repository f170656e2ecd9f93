use crate::models::{CommentForm, FormErrors, NewComment};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

pub const NAME_MAX_LENGTH: usize = 100;
pub const EMAIL_MAX_LENGTH: usize = 255;
pub const URL_MAX_LENGTH: usize = 200;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Invalid email regex pattern")
});

/// Check a submitted comment form. Surrounding whitespace is trimmed from
/// every field; `url` may be left blank.
pub fn validate(form: &CommentForm) -> Result<NewComment, FormErrors> {
    let mut errors = FormErrors::default();

    let name = form.name.trim();
    let email = form.email.trim();
    let url = form.url.trim();
    let text = form.text.trim();

    if name.is_empty() {
        errors.add("name", "This field is required.");
    } else if name.chars().count() > NAME_MAX_LENGTH {
        errors.add(
            "name",
            format!("Ensure this value has at most {} characters.", NAME_MAX_LENGTH),
        );
    }

    if email.is_empty() {
        errors.add("email", "This field is required.");
    } else if email.chars().count() > EMAIL_MAX_LENGTH {
        errors.add(
            "email",
            format!("Ensure this value has at most {} characters.", EMAIL_MAX_LENGTH),
        );
    } else if !EMAIL_REGEX.is_match(email) {
        errors.add("email", "Enter a valid email address.");
    }

    if !url.is_empty() {
        if url.chars().count() > URL_MAX_LENGTH {
            errors.add(
                "url",
                format!("Ensure this value has at most {} characters.", URL_MAX_LENGTH),
            );
        } else if !is_web_url(url) {
            errors.add("url", "Enter a valid URL.");
        }
    }

    if text.is_empty() {
        errors.add("text", "This field is required.");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewComment {
        name: name.to_string(),
        email: email.to_string(),
        url: url.to_string(),
        text: text.to_string(),
    })
}

fn is_web_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
