//! Client-side form validation. Every problem is collected per field and returned together
//! as [`DomainError::InvalidForm`]; nothing invalid is ever handed to the gateway.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, UserRole, WorkshopId};
use crate::errors::{DomainError, FieldError};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default)]
struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, DomainError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(DomainError::InvalidForm(self.0))
        }
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty()).map(str::to_owned)
}

/// Raw input from the "new part request" form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreatePartRequest {
    pub part_name: String,
    pub part_number: String,
    pub quantity: i64,
    pub priority: Priority,
    pub workshop_id: Option<WorkshopId>,
    pub required_date: Option<NaiveDate>,
    pub description: String,
    /// Free text as typed; parsed as a decimal amount.
    pub estimated_cost: Option<String>,
}

/// A request ready to be posted; field names match the backend body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPartRequest {
    pub part_name: String,
    pub part_number: String,
    pub quantity: u32,
    pub priority: Priority,
    pub workshop_id: WorkshopId,
    pub required_date: DateTime<Utc>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Decimal>,
}

impl CreatePartRequest {
    /// `today` is the caller's current date; a required date before it is refused.
    pub fn validate(&self, today: NaiveDate) -> Result<NewPartRequest, DomainError> {
        let mut errors = FieldErrors::default();

        if blank(&self.part_name) {
            errors.push("partName", "Part name is required");
        }
        if blank(&self.part_number) {
            errors.push("partNumber", "Part number is required");
        }
        let quantity = match u32::try_from(self.quantity) {
            Ok(quantity) if quantity >= 1 => quantity,
            _ => {
                errors.push("quantity", "Quantity must be at least 1");
                0
            }
        };
        if self.workshop_id.is_none() {
            errors.push("workshopId", "Select a workshop");
        }
        match self.required_date {
            None => errors.push("requiredDate", "Required date is required"),
            Some(date) if date < today => {
                errors.push("requiredDate", "Required date cannot be in the past")
            }
            Some(_) => {}
        }

        let estimated_cost = match optional_text(&self.estimated_cost) {
            None => None,
            Some(raw) => match Decimal::from_str(&raw) {
                Ok(cost) if cost.is_sign_negative() && !cost.is_zero() => {
                    errors.push("estimatedCost", "Estimated cost cannot be negative");
                    None
                }
                Ok(cost) => Some(cost),
                Err(_) => {
                    errors.push("estimatedCost", "Estimated cost must be a valid number");
                    None
                }
            },
        };

        let (Some(workshop_id), Some(required_date)) = (self.workshop_id, self.required_date)
        else {
            return Err(DomainError::InvalidForm(errors.0));
        };

        errors.finish(NewPartRequest {
            part_name: self.part_name.trim().to_owned(),
            part_number: self.part_number.trim().to_owned(),
            quantity,
            priority: self.priority,
            workshop_id,
            required_date: required_date.and_time(chrono::NaiveTime::MIN).and_utc(),
            description: self.description.trim().to_owned(),
            estimated_cost,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
    pub rank: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub rank: Option<String>,
    pub phone_number: Option<String>,
    pub department: Option<String>,
    pub role: UserRole,
}

impl CreateUser {
    pub fn validate(&self) -> Result<NewUser, DomainError> {
        let mut errors = FieldErrors::default();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push("username", "Username is required");
        } else if username.chars().count() < MIN_USERNAME_LEN {
            errors.push("username", "Username must be at least 3 characters");
        } else if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.push("username", "Username may only contain letters, digits and underscores");
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.push("email", "Email is required");
        } else if !looks_like_email(email) {
            errors.push("email", "Enter a valid email address");
        }

        if self.password.is_empty() {
            errors.push("password", "Password is required");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("password", "Password must be at least 6 characters");
        }
        if self.confirm_password.is_empty() {
            errors.push("confirmPassword", "Confirm the password");
        } else if self.confirm_password != self.password {
            errors.push("confirmPassword", "Passwords do not match");
        }

        if blank(&self.first_name) {
            errors.push("firstName", "First name is required");
        }

        let Some(role) = self.role else {
            errors.push("role", "Select a role");
            return Err(DomainError::InvalidForm(errors.0));
        };

        errors.finish(NewUser {
            username: username.to_owned(),
            email: email.to_lowercase(),
            password: self.password.clone(),
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            rank: optional_text(&self.rank),
            phone_number: optional_text(&self.phone_number),
            department: optional_text(&self.department),
            role,
        })
    }
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreateWorkshop {
    pub name: String,
    pub location: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewWorkshop {
    pub name: String,
    pub location: String,
}

impl CreateWorkshop {
    pub fn validate(&self) -> Result<NewWorkshop, DomainError> {
        let mut errors = FieldErrors::default();
        if blank(&self.name) {
            errors.push("name", "Workshop name is required");
        }
        if blank(&self.location) {
            errors.push("location", "Location is required");
        }
        errors.finish(NewWorkshop {
            name: self.name.trim().to_owned(),
            location: self.location.trim().to_owned(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

impl CreateRole {
    pub fn validate(&self) -> Result<NewRole, DomainError> {
        let mut errors = FieldErrors::default();
        if blank(&self.name) {
            errors.push("name", "Role name is required");
        }

        let mut permissions: Vec<String> = self
            .permissions
            .iter()
            .map(|permission| permission.trim().to_owned())
            .filter(|permission| !permission.is_empty())
            .collect();
        permissions.sort();
        permissions.dedup();

        errors.finish(NewRole {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            permissions,
        })
    }
}
