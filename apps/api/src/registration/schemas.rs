//! Per-step form schemas for the applicant registration wizard.
//!
//! Each validator takes the values exactly as typed and returns either the
//! normalized step data (trimmed strings, ISO dates, lower-cased email) or a
//! map of field name → message.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::FieldErrors;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: String,
    #[validate(length(min = 1, message = "Date of birth is required"))]
    pub dob: String,
    #[validate(length(min = 1, message = "Please select your gender"))]
    pub sex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationInfo {
    #[validate(length(min = 2, message = "Degree is required"))]
    pub degree: String,
    #[validate(length(min = 2, message = "Institution name is required"))]
    pub institution: String,
    /// Institution address.
    #[validate(length(min = 5, message = "Institution address is required"))]
    pub address: String,
    pub start_date: String,
    pub end_date: String,
    pub grade: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    #[validate(length(min = 10, message = "Phone number must be at least 10 digits"))]
    pub phone: String,
    pub alternate_phone: String,
    #[validate(
        length(min = 1, message = "Email cannot be empty"),
        email(message = "Invalid email address")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(
        length(min = 6, message = "Please confirm your password"),
        must_match(other = "password", message = "Passwords don't match")
    )]
    pub confirm_password: String,
}

impl ContactInfo {
    /// The same record without its secrets, for anything that outlives the request.
    pub fn redacted(&self) -> Self {
        Self {
            password: String::new(),
            confirm_password: String::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkExperience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

/// Accepts `DD-MM-YY`, `DD-MM-YYYY` and ISO `YYYY-MM-DD` (also with `/`).
pub fn parse_form_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split(['-', '/']).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let normalized = parts.join("-");

    match (parts[0].len(), parts[2].len()) {
        (4, _) => NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok(),
        (_, 2) => NaiveDate::parse_from_str(&normalized, "%d-%m-%y").ok(),
        (_, 4) => NaiveDate::parse_from_str(&normalized, "%d-%m-%Y").ok(),
        _ => None,
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// `confirm_password` → `confirmPassword`, matching the wire names.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// A missing value is reported before a malformed one.
fn first_message(errors: &[ValidationError]) -> Option<String> {
    errors
        .iter()
        .find(|e| e.code == "length")
        .or_else(|| errors.first())
        .map(|e| {
            e.message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string())
        })
}

fn field_errors(result: Result<(), ValidationErrors>) -> FieldErrors {
    let Err(errors) = result else {
        return FieldErrors::new();
    };
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, list)| Some((wire_name(&field.to_string()), first_message(list)?)))
        .collect()
}

/// Validates an optional date field. Returns the ISO date when present and valid.
fn optional_date(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<NaiveDate> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse_form_date(raw);
    if parsed.is_none() {
        errors.insert(field.to_string(), "Please select a valid date".to_string());
    }
    parsed
}

fn check_date_order(errors: &mut FieldErrors, start: Option<NaiveDate>, end: Option<NaiveDate>) {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.insert(
                "endDate".to_string(),
                "End date must be after start date".to_string(),
            );
        }
    }
}

fn iso(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn result_or_errors<T>(value: T, errors: FieldErrors) -> Result<T, FieldErrors> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

pub fn validate_personal(input: &PersonalInfo) -> Result<PersonalInfo, FieldErrors> {
    let mut trimmed = PersonalInfo {
        name: input.name.trim().to_string(),
        address: input.address.trim().to_string(),
        dob: input.dob.trim().to_string(),
        sex: input.sex.trim().to_string(),
    };
    let mut errors = field_errors(trimmed.validate());

    if !trimmed.dob.is_empty() {
        match parse_form_date(&trimmed.dob) {
            Some(dob) => trimmed.dob = iso(Some(dob)),
            None => {
                errors.insert(
                    "dob".to_string(),
                    "Please enter a valid date in DD-MM-YY format".to_string(),
                );
            }
        }
    }

    result_or_errors(trimmed, errors)
}

pub fn validate_education(input: &EducationInfo) -> Result<EducationInfo, FieldErrors> {
    let mut trimmed = EducationInfo {
        degree: input.degree.trim().to_string(),
        institution: input.institution.trim().to_string(),
        address: input.address.trim().to_string(),
        start_date: String::new(),
        end_date: String::new(),
        grade: input.grade.trim().to_string(),
    };
    let mut errors = field_errors(trimmed.validate());

    let start = optional_date(&mut errors, "startDate", &input.start_date);
    let end = optional_date(&mut errors, "endDate", &input.end_date);
    check_date_order(&mut errors, start, end);
    trimmed.start_date = iso(start);
    trimmed.end_date = iso(end);

    result_or_errors(trimmed, errors)
}

pub fn validate_contact(input: &ContactInfo) -> Result<ContactInfo, FieldErrors> {
    let normalized = ContactInfo {
        phone: input.phone.trim().to_string(),
        alternate_phone: input.alternate_phone.trim().to_string(),
        email: normalize_email(&input.email),
        password: input.password.clone(),
        confirm_password: input.confirm_password.clone(),
    };
    let errors = field_errors(normalized.validate());
    result_or_errors(normalized, errors)
}

pub fn validate_work_experience(input: &WorkExperience) -> Result<WorkExperience, FieldErrors> {
    let mut errors = FieldErrors::new();
    let start = optional_date(&mut errors, "startDate", &input.start_date);
    let end = optional_date(&mut errors, "endDate", &input.end_date);
    check_date_order(&mut errors, start, end);

    result_or_errors(
        WorkExperience {
            company: input.company.trim().to_string(),
            position: input.position.trim().to_string(),
            start_date: iso(start),
            end_date: iso(end),
            description: input.description.trim().to_string(),
        },
        errors,
    )
}
