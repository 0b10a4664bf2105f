use anyhow::{Result, anyhow};

pub fn validate_phone(phone: &str) -> Result<()> {
    if phone.is_empty() {
        return Err(anyhow!("Phone number cannot be empty"));
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();

    if !(10..=15).contains(&digits) {
        return Err(anyhow!(
            "Phone number must contain between 10 and 15 digits"
        ));
    }

    let valid_chars = phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ' || c == '(' || c == ')');

    if !valid_chars {
        return Err(anyhow!("Phone number contains invalid characters"));
    }

    Ok(())
}

pub fn validate_message_template(template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(anyhow!("Message template cannot be empty"));
    }

    // WhatsApp message limit
    if template.len() > 4096 {
        return Err(anyhow!(
            "Message template is too long (max 4096 characters)"
        ));
    }

    Ok(())
}
