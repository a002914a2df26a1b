// SPDX-License-Identifier: MIT

//! Request validation

use crate::adk::error::HubError;
use once_cell::sync::Lazy;
use regex::Regex;

static CHAT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-f0-9-]+$").unwrap());

pub const MAX_MESSAGE_CHARS: usize = 4000;

pub const ALLOWED_EXTENSIONS: [&str; 5] = [".txt", ".pdf", ".doc", ".docx", ".md"];

pub fn validate_chat_id(chat_id: &str) -> Result<(), HubError> {
    if chat_id.is_empty() {
        return Err(HubError::validation("Chat ID cannot be empty"));
    }
    if !CHAT_ID.is_match(chat_id) {
        return Err(HubError::validation("Invalid chat ID format"));
    }
    Ok(())
}

/// Trimmed message text
pub fn validate_message(message: &str) -> Result<String, HubError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(HubError::validation("Message cannot be empty"));
    }
    if trimmed.chars().count() > MAX_MESSAGE_CHARS {
        return Err(HubError::validation(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_upload(filename: &str, size: u64, limit: u64) -> Result<(), HubError> {
    let lowered = filename.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| lowered.ends_with(ext)) {
        return Err(HubError::FileProcessing(format!(
            "File type not allowed. Allowed types: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }
    if size > limit {
        return Err(HubError::FileTooLarge { limit_bytes: limit });
    }
    Ok(())
}
