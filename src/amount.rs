use serde::{Deserialize, Serialize};
use std::fmt;

/// Money in centavos, the unit the gateway speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub fn from_cents(value: i64) -> Self {
        Amount(value)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    /// Formats as Brazilian reais, e.g. `R$ 1.234,56`.
    pub fn to_brl(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        format!("{sign}R$ {grouped},{frac:02}")
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_brl())
    }
}
