use std::collections::HashMap;
use std::result::Result as DefaultResult;
use std::sync::OnceLock;

use regex::Regex;

use crate::constant::{REGEX_EMAIL_RFC5322, REGEX_PHONE_NATIONAL};
use crate::error::{AppError, AppErrorCode};

/// Identity of a customer, owned by the identity store. The order core only
/// reads it, the store validates every profile it saves.
#[derive(Debug, Clone)]
pub struct CustomerModel {
    pub id: u32,
    pub phone: String,
    pub name: String,
    pub email: String,
    pub address: String,
    pub active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

type CompiledPattern = OnceLock<DefaultResult<Regex, regex::Error>>;

static PHONE_PATTERN: CompiledPattern = OnceLock::new();
static EMAIL_PATTERN: CompiledPattern = OnceLock::new();

fn compiled_pattern(
    cell: &'static CompiledPattern,
    pattern: &str,
) -> DefaultResult<&'static Regex, AppError> {
    cell.get_or_init(|| Regex::new(pattern))
        .as_ref()
        .map_err(|e| AppError {
            code: AppErrorCode::Unknown,
            detail: Some(format!("regex-compile, {e}")),
        })
}

fn exact_match(re: &Regex, value: &str) -> bool {
    // the pattern must cover the entire given value
    re.find(value)
        .map(|m| m.start() == 0 && m.end() == value.len())
        .unwrap_or(false)
}

impl CustomerModel {
    pub fn try_new(
        id: u32,
        phone: &str,
        name: &str,
        email: &str,
        address: &str,
    ) -> DefaultResult<Self, AppError> {
        let obj = Self {
            id,
            phone: phone.to_string(),
            name: name.to_string(),
            email: Self::normalize_email(email),
            address: address.to_string(),
            active: true,
            is_staff: false,
            is_superuser: false,
        };
        obj.validate()?;
        Ok(obj)
    } // end of fn try_new

    pub fn validate(&self) -> DefaultResult<(), AppError> {
        let id = self.id;
        if self.phone.is_empty() || self.name.is_empty() || self.email.is_empty() {
            let detail = format!("customer:{id}, mandatory-field-empty");
            return Err(AppError {
                code: AppErrorCode::EmptyInputData,
                detail: Some(detail),
            });
        }
        if !Self::check_phone(self.phone.as_str())? {
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(format!("customer:{id}, phone:{}", self.phone)),
            });
        }
        if !Self::check_email(self.email.as_str())? {
            return Err(AppError {
                code: AppErrorCode::InvalidInput,
                detail: Some(format!("customer:{id}, email:{}", self.email)),
            });
        }
        Ok(())
    }

    /// Each phone number belongs to at most one customer. `taken` lists the
    /// phone numbers already in the store along with their owner.
    pub fn check_phone_unique(
        items: &[Self],
        taken: Vec<(String, u32)>,
    ) -> DefaultResult<(), AppError> {
        let mut owners: HashMap<String, u32> = taken.into_iter().collect();
        // profiles in the same batch replace their own stored version
        owners.retain(|_phone, owner| !items.iter().any(|c| c.id == *owner));
        let clash = items.iter().find(|c| {
            let prev = owners.insert(c.phone.clone(), c.id);
            matches!(prev, Some(owner) if owner != c.id)
        });
        if let Some(c) = clash {
            Err(AppError {
                code: AppErrorCode::DuplicatePhone,
                detail: Some(format!("customer:{}, phone:{}", c.id, c.phone)),
            })
        } else {
            Ok(())
        }
    }

    /// 11 digits when the number starts with zero, 10 digits otherwise
    pub fn check_phone(value: &str) -> DefaultResult<bool, AppError> {
        let re = compiled_pattern(&PHONE_PATTERN, REGEX_PHONE_NATIONAL)?;
        Ok(exact_match(re, value))
    }

    pub fn check_email(value: &str) -> DefaultResult<bool, AppError> {
        let re = compiled_pattern(&EMAIL_PATTERN, REGEX_EMAIL_RFC5322)?;
        Ok(exact_match(re, value.to_lowercase().as_str()))
    }

    // only the domain part is case-insensitive
    pub fn normalize_email(value: &str) -> String {
        match value.trim().rsplit_once('@') {
            Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
            None => value.trim().to_string(),
        }
    }
} // end of impl CustomerModel
