use std::fmt;

use crate::security::{GIT_RESERVED_CHARS, SHELL_METACHARACTERS, ValidationError};

/// A branch name that is safe to hand to git as a single argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedBranchName(String);

impl ValidatedBranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ValidatedBranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedBranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a branch name before it reaches git or a command line.
///
/// Each rule fails with its own reason so the rejection can be reported
/// verbatim. Accepted names start with an alphanumeric character and contain
/// only alphanumerics, `-`, `_`, `/` and `.` in well-formed combinations.
pub fn validate_branch_name(name: &str) -> Result<ValidatedBranchName, ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::branch(name, "branch name cannot be empty"));
    }

    if name.starts_with('-') {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot start with a dash"),
        ));
    }

    if let Some(meta) = SHELL_METACHARACTERS.iter().find(|meta| name.contains(*meta)) {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" contains shell metacharacter '{meta}'"),
        ));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::branch(
            name,
            format!("{name:?} contains control characters"),
        ));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot contain whitespace"),
        ));
    }

    if name.contains("..") {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot contain consecutive periods (..)"),
        ));
    }

    if name.contains("@{") {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot contain @{{"),
        ));
    }

    if name.ends_with(".lock") {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot end with .lock"),
        ));
    }

    if name.contains("//") {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot contain consecutive slashes"),
        ));
    }

    if name.ends_with('/') {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot end with a slash"),
        ));
    }

    if name.starts_with('.') {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot start with a period"),
        ));
    }

    if name.ends_with('.') {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" cannot end with a period"),
        ));
    }

    if name.split('/').any(|part| part.starts_with('.')) {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" has a path component starting with a period"),
        ));
    }

    if let Some(reserved) = name.chars().find(|c| GIT_RESERVED_CHARS.contains(c)) {
        return Err(ValidationError::branch(
            name,
            format!("\"{name}\" contains reserved git character '{reserved}'"),
        ));
    }

    let mut chars = name.chars();
    let starts_alphanumeric = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
    let rest_allowed = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'));
    if !starts_alphanumeric || !rest_allowed {
        return Err(ValidationError::branch(
            name,
            format!(
                "\"{name}\" must start with an alphanumeric character and contain only \
                 alphanumerics, forward slashes, hyphens, underscores or periods"
            ),
        ));
    }

    Ok(ValidatedBranchName(name.to_string()))
}
