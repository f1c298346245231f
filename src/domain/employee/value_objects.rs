use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use super::errors::{PhoneError, UnknownRole};

// ============================================================================
// Employee Value Objects
// ============================================================================

static MOBILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+251|0)?9\d{8}$").expect("mobile pattern is valid"));

const COUNTRY_PREFIX: &str = "+251";

/// Mobile number as typed by an employee, with its canonical `+251…` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    raw: String,
    cleaned: String,
    normalized: String,
}

impl PhoneNumber {
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        let raw = input.trim().to_string();
        if raw.is_empty() {
            return Err(PhoneError::Empty);
        }

        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
            .collect();

        if !MOBILE_PATTERN.is_match(&cleaned) {
            return Err(PhoneError::InvalidFormat(raw));
        }

        let normalized = if cleaned.starts_with(COUNTRY_PREFIX) {
            cleaned.clone()
        } else if let Some(local) = cleaned.strip_prefix('0') {
            format!("{COUNTRY_PREFIX}{local}")
        } else {
            format!("{COUNTRY_PREFIX}{cleaned}")
        };

        Ok(Self { raw, cleaned, normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Every spelling a stored phone column might hold for this number
    pub fn variants(&self) -> Vec<String> {
        let mut variants: Vec<String> = Vec::with_capacity(3);
        for candidate in [&self.raw, &self.cleaned, &self.normalized] {
            if !variants.contains(candidate) {
                variants.push(candidate.clone());
            }
        }
        variants
    }
}

/// Who is running a client of this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Employee,
}

impl Role {
    /// Operators see every order change in-app; employees hear via Telegram
    pub fn receives_order_notifications(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "super_admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "employee" => Ok(Role::Employee),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
