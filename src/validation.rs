use rustrict::CensorStr;

/// Validate and sanitize a participant display name.
/// Returns the trimmed name on success, or an error message.
pub fn validate_display_name(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if trimmed.len() > 32 {
        return Err("Name must be 32 characters or fewer".to_string());
    }
    if trimmed.is_inappropriate() {
        return Err("Name contains inappropriate language".to_string());
    }
    Ok(trimmed.to_string())
}

/// Validate a class tag such as `101` or `7B`.
/// Returns the trimmed tag on success, or an error message.
pub fn validate_class_tag(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("Class cannot be empty".to_string());
    }
    if trimmed.len() > 16 {
        return Err("Class must be 16 characters or fewer".to_string());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err("Class may only contain letters, digits and dashes".to_string());
    }
    Ok(trimmed.to_string())
}
