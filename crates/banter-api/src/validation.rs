use crate::types::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty field {0}")]
    Empty(&'static str),
    #[error("too long {0}")]
    TooLong(&'static str),
    #[error("invalid {0}")]
    Invalid(&'static str),
}

pub fn validate_text(text: &str, limits: &ValidationLimits) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Empty("text"));
    }
    if text.chars().count() > limits.max_text_len {
        return Err(ValidationError::TooLong("text"));
    }
    Ok(())
}

pub fn validate_username(username: &str, limits: &ValidationLimits) -> Result<(), ValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("username"));
    }
    if trimmed.len() > limits.max_username_len {
        return Err(ValidationError::TooLong("username"));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ValidationError::Invalid("username"));
    }
    Ok(())
}

pub fn validate_biography(text: &str, limits: &ValidationLimits) -> Result<(), ValidationError> {
    if text.chars().count() > limits.max_biography_len {
        return Err(ValidationError::TooLong("biography"));
    }
    Ok(())
}

pub fn validate_thread_id(thread_id: &str) -> Result<(), ValidationError> {
    if thread_id.is_empty() {
        return Err(ValidationError::Empty("thread_id"));
    }
    if !thread_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid("thread_id"));
    }
    Ok(())
}

pub fn validate_item_id(item_id: &str) -> Result<(), ValidationError> {
    if item_id.is_empty() {
        return Err(ValidationError::Empty("item_id"));
    }
    if !item_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid("item_id"));
    }
    Ok(())
}

pub fn validate_recipients(user_ids: &[String]) -> Result<(), ValidationError> {
    if user_ids.is_empty() {
        return Err(ValidationError::Empty("recipients"));
    }
    for user_id in user_ids.iter() {
        if user_id.is_empty() || !user_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::Invalid("recipient"));
        }
    }
    Ok(())
}

pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationError> {
    if credentials.username.trim().is_empty() {
        return Err(ValidationError::Empty("username"));
    }
    if credentials.password.is_empty() && credentials.state.is_none() {
        return Err(ValidationError::Empty("password"));
    }
    Ok(())
}
