//! Input validation, checked before anything touches the store. Bounds
//! match the provisioned column sizes.

use crate::error::{Error, Result};

pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 5000;
pub const MESSAGE_MAX: usize = 5000;
pub const NAME_MAX: usize = 128;
pub const PASSWORD_MIN: usize = 8;

pub fn ticket_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title is required".to_string()));
    }
    if title.len() > TITLE_MAX {
        return Err(Error::Validation(format!(
            "title exceeds {TITLE_MAX} characters"
        )));
    }
    Ok(())
}

pub fn ticket_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::Validation("description is required".to_string()));
    }
    if description.len() > DESCRIPTION_MAX {
        return Err(Error::Validation(format!(
            "description exceeds {DESCRIPTION_MAX} characters"
        )));
    }
    Ok(())
}

pub fn message_body(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Err(Error::Validation("message body is required".to_string()));
    }
    if body.len() > MESSAGE_MAX {
        return Err(Error::Validation(format!(
            "message exceeds {MESSAGE_MAX} characters"
        )));
    }
    Ok(())
}

pub fn registration(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() || name.len() > NAME_MAX {
        return Err(Error::Validation("name is required".to_string()));
    }
    // Shallow shape check; deliverability is not our problem.
    if !email.contains('@') || email.len() > NAME_MAX {
        return Err(Error::Validation("a valid email is required".to_string()));
    }
    if password.len() < PASSWORD_MIN {
        return Err(Error::Validation(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_bodies_rejected() {
        assert!(matches!(message_body(""), Err(Error::Validation(_))));
        assert!(matches!(message_body("   \n\t"), Err(Error::Validation(_))));
        assert!(message_body("It's still broken").is_ok());
    }

    #[test]
    fn ticket_fields_must_be_present_and_bounded() {
        assert!(ticket_title("Printer broken").is_ok());
        assert!(matches!(ticket_title(""), Err(Error::Validation(_))));
        assert!(matches!(
            ticket_title(&"x".repeat(TITLE_MAX + 1)),
            Err(Error::Validation(_))
        ));

        assert!(ticket_description("No power").is_ok());
        assert!(matches!(ticket_description(" "), Err(Error::Validation(_))));
        assert!(matches!(
            ticket_description(&"x".repeat(DESCRIPTION_MAX + 1)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn registration_checks_each_field() {
        assert!(registration("Ada", "ada@example.com", "correct-horse").is_ok());
        assert!(registration("", "ada@example.com", "correct-horse").is_err());
        assert!(registration("Ada", "not-an-email", "correct-horse").is_err());
        assert!(registration("Ada", "ada@example.com", "short").is_err());
    }
}
