use crate::model::error::SignalError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of decimal digits in a rendezvous code.
pub const CODE_LEN: usize = 6;

/// Короткий код рандеву: ровно шесть десятичных цифр.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Generate a random code in `100000..=999999`, so it never starts with a zero.
    pub fn generate() -> Self {
        let value: u32 = rand::thread_rng().gen_range(100_000..=999_999);
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Code {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != CODE_LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SignalError::InvalidPayload(format!(
                "code must be {} decimal digits, got {:?}",
                CODE_LEN, s
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl TryFrom<String> for Code {
    type Error = SignalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
