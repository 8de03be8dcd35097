//! Phone number type used for OTP login.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than digits, spaces, dashes or a leading +.
    #[error("phone number contains invalid character '{0}'")]
    InvalidCharacter(char),
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number normalized to E.164 form (`+<country><subscriber>`).
///
/// Numbers entered without a country code are assumed to be Indian
/// (`+91`) when they have exactly ten digits, which is what the login
/// screen accepts.
///
/// ## Examples
///
/// ```
/// use saverush_core::PhoneNumber;
///
/// assert_eq!(PhoneNumber::parse("98765 43210").unwrap().as_str(), "+919876543210");
/// assert_eq!(PhoneNumber::parse("+1-415-555-0100").unwrap().as_str(), "+14155550100");
///
/// assert!(PhoneNumber::parse("").is_err());
/// assert!(PhoneNumber::parse("12ab").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Minimum digits in an E.164 number (excluding `+`).
    pub const MIN_DIGITS: usize = 8;
    /// Maximum digits in an E.164 number (excluding `+`).
    pub const MAX_DIGITS: usize = 15;
    /// Country code applied to bare ten-digit numbers.
    pub const DEFAULT_COUNTRY_CODE: &'static str = "91";

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters other than
    /// digits, spaces, dashes and a leading `+`, or has an invalid digit count.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let (has_plus, rest) = trimmed
            .strip_prefix('+')
            .map_or((false, trimmed), |rest| (true, rest));

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' => {}
                other => return Err(PhoneNumberError::InvalidCharacter(other)),
            }
        }

        if !has_plus && digits.len() == 10 {
            digits.insert_str(0, Self::DEFAULT_COUNTRY_CODE);
        }

        if digits.len() < Self::MIN_DIGITS || digits.len() > Self::MAX_DIGITS {
            return Err(PhoneNumberError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(format!("+{digits}")))
    }

    /// Returns the E.164 representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number with all but the last four digits masked.
    #[must_use]
    pub fn masked(&self) -> String {
        let visible = 4;
        let len = self.0.chars().count();
        self.0
            .chars()
            .enumerate()
            .map(|(i, c)| if i == 0 || i + visible >= len { c } else { '*' })
            .collect()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
