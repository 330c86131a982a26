use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Passwords do not match!")]
    PasswordMismatch,
    #[error("{field} is required")]
    Missing { field: &'static str },
}

/// Fields of the account-creation form. Nothing is submitted anywhere; the
/// form only checks itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("Full name", &self.full_name),
            ("Email", &self.email),
            ("Password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Missing { field });
            }
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }
}
