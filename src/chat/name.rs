//! Full-name parsing for the guest name-collection step.

/// Re-prompt shown when a reply does not contain both names.
pub const NAME_REPROMPT: &str =
    "Could you share both your first and last name? For example: 'John Smith'";

/// A visitor's name split into first and last parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("expected a first and last name, got {tokens} word(s)")]
    TooFewParts { tokens: usize },
}

/// Split a free-text reply into first and last name.
///
/// The first whitespace-separated token is the first name; every remaining
/// token, joined by a single space, is the last name.
pub fn parse_name(text: &str) -> Result<PersonName, NameError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(NameError::TooFewParts {
            tokens: tokens.len(),
        });
    }
    Ok(PersonName {
        first_name: tokens[0].to_string(),
        last_name: tokens[1..].join(" "),
    })
}
