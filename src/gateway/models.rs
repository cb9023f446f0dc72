//! Wire shapes exchanged with the payment gateway (through the proxy).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::amount::Amount;
use crate::validation::{
    normalize_cpf, sanitize_string, validate_cpf, validate_full_name, ValidationError,
};

pub const PIX_PAYMENT_METHOD: &str = "PIX";
pub const CPF_DOCUMENT_TYPE: &str = "CPF";
pub const DEFAULT_EXPIRES_IN_DAYS: u32 = 1;

/// What is being sold. One item, quantity one, unit price equal to the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub title: String,
    pub amount: Amount,
}

/// Contact fields the checkout does not ask the customer for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDefaults {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub customer: Customer,
    pub payment_method: &'static str,
    pub amount: Amount,
    pub items: Vec<Item>,
    pub pix: PixOptions,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: Document,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Document {
    pub number: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub unit_price: Amount,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PixOptions {
    pub expires_in_days: u32,
}

impl TransactionRequest {
    /// Builds a PIX request. Fails if the name or the CPF does not validate,
    /// so no request ever carries an unchecked tax id.
    pub fn new(
        name: &str,
        cpf: &str,
        product: &Product,
        contact: &ContactDefaults,
        expires_in_days: u32,
    ) -> Result<Self, ValidationError> {
        validate_full_name(name)?;
        validate_cpf(cpf)?;

        Ok(Self {
            customer: Customer {
                name: sanitize_string(name),
                email: contact.email.clone(),
                phone: contact.phone.clone(),
                document: Document {
                    number: normalize_cpf(cpf),
                    kind: CPF_DOCUMENT_TYPE,
                },
            },
            payment_method: PIX_PAYMENT_METHOD,
            amount: product.amount,
            items: vec![Item {
                title: product.title.clone(),
                unit_price: product.amount,
                quantity: 1,
            }],
            pix: PixOptions { expires_in_days },
        })
    }
}

/// Gateway-defined transaction status. Unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    WaitingPayment,
    InAnalysis,
    Paid,
    Refused,
    Failed,
    Expired,
    Canceled,
    Chargeback,
    Refunded,
    Other(String),
}

impl TransactionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::WaitingPayment => "waiting_payment",
            TransactionStatus::InAnalysis => "in_analysis",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Refused => "refused",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Canceled => "canceled",
            TransactionStatus::Chargeback => "chargeback",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "waiting_payment" => TransactionStatus::WaitingPayment,
            "in_analysis" => TransactionStatus::InAnalysis,
            "paid" => TransactionStatus::Paid,
            "refused" => TransactionStatus::Refused,
            "failed" => TransactionStatus::Failed,
            "expired" => TransactionStatus::Expired,
            "canceled" => TransactionStatus::Canceled,
            "chargeback" => TransactionStatus::Chargeback,
            "refunded" => TransactionStatus::Refunded,
            _ => TransactionStatus::Other(normalized),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        TransactionStatus::from(value.as_str())
    }
}

impl From<TransactionStatus> for String {
    fn from(value: TransactionStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The encoded PIX "copy and paste" string and its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentArtifact {
    #[serde(default)]
    pub qrcode_text: String,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

impl PaymentArtifact {
    /// Parses the expiration as an RFC 3339 timestamp or a bare date (midnight UTC).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiration_date.as_deref()?.trim();

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }

        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub amount: Amount,
    pub status: TransactionStatus,
    #[serde(default)]
    pub pix: Option<PaymentArtifact>,
}

/// The slice of a transaction lookup that polling cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub status: TransactionStatus,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
