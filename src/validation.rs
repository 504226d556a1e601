//! Caller-facing input validation.
//!
//! Runs before any request reaches the store or the identity provider, so
//! rejected input never costs a round trip.

use crate::error::TodoError;
use crate::types::{TodoDraft, TodoPatch};

/// Minimum password length accepted by the sign-up form.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Trims a title and rejects it if nothing is left.
///
/// # Examples
///
/// ```
/// use todo_sync::validation::normalize_title;
///
/// assert_eq!(normalize_title("  Walk the dog ").unwrap(), "Walk the dog");
/// assert!(normalize_title("   ").is_err());
/// ```
pub fn normalize_title(title: &str) -> Result<String, TodoError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TodoError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// Normalizes a draft: trims the title and description, and drops a
/// description that is empty after trimming.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the title is empty after trimming.
///
/// # Examples
///
/// ```
/// use todo_sync::types::TodoDraft;
/// use todo_sync::validation::normalize_draft;
///
/// let draft = normalize_draft(TodoDraft::new(" Pay rent ").with_description("  ")).unwrap();
/// assert_eq!(draft.title, "Pay rent");
/// assert!(draft.description.is_none());
/// ```
pub fn normalize_draft(draft: TodoDraft) -> Result<TodoDraft, TodoError> {
    Ok(TodoDraft {
        title: normalize_title(&draft.title)?,
        description: normalize_description(draft.description),
        ..draft
    })
}

/// Normalizes a patch with the same rules as [`normalize_draft`].
///
/// A description that trims to nothing becomes a clear.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the patch sets an empty title or
/// touches no field at all.
pub fn normalize_patch(patch: TodoPatch) -> Result<TodoPatch, TodoError> {
    if patch.is_empty() {
        return Err(TodoError::Validation("update touches no field".to_string()));
    }
    let title = match patch.title {
        Some(title) => Some(normalize_title(&title)?),
        None => None,
    };
    Ok(TodoPatch {
        title,
        description: patch.description.map(normalize_description),
        ..patch
    })
}

/// Checks the sign-up form before calling the identity provider.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] when the email is blank, the passwords
/// differ, or the password is shorter than [`MIN_PASSWORD_LENGTH`].
///
/// # Examples
///
/// ```
/// use todo_sync::validation::validate_sign_up;
///
/// assert!(validate_sign_up("a@b.c", "secret1", "secret1").is_ok());
/// assert!(validate_sign_up("a@b.c", "secret1", "secret2").is_err());
/// assert!(validate_sign_up("a@b.c", "abc", "abc").is_err());
/// ```
pub fn validate_sign_up(email: &str, password: &str, confirm: &str) -> Result<(), TodoError> {
    if email.trim().is_empty() {
        return Err(TodoError::Validation("email must not be empty".to_string()));
    }
    if password != confirm {
        return Err(TodoError::Validation("passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(TodoError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    #[test]
    fn draft_keeps_priority_and_due_date() {
        let due = chrono::Utc::now();
        let draft = normalize_draft(
            TodoDraft::new("x")
                .with_priority(Priority::Low)
                .with_due_date(due)
                .with_description(" notes "),
        )
        .unwrap();
        assert_eq!(draft.priority, Priority::Low);
        assert_eq!(draft.due_date, Some(due));
        assert_eq!(draft.description.as_deref(), Some("notes"));
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let err = normalize_draft(TodoDraft::new("  \t ")).unwrap_err();
        assert!(matches!(err, TodoError::Validation(_)));
    }

    #[test]
    fn patch_blank_description_becomes_clear() {
        let patch = normalize_patch(TodoPatch::new().description("   ")).unwrap();
        assert_eq!(patch.description, Some(None));
    }

    #[test]
    fn patch_rejects_blank_title_and_empty_patch() {
        assert!(normalize_patch(TodoPatch::new().title(" ")).is_err());
        assert!(normalize_patch(TodoPatch::new()).is_err());
        let patch = normalize_patch(TodoPatch::new().title(" ok ")).unwrap();
        assert_eq!(patch.title.as_deref(), Some("ok"));
    }

    #[test]
    fn sign_up_rules() {
        assert!(validate_sign_up("  ", "secret1", "secret1").is_err());
        assert!(validate_sign_up("a@b.c", "12345", "12345").is_err());
        assert!(validate_sign_up("a@b.c", "123456", "123456").is_ok());
    }
}
