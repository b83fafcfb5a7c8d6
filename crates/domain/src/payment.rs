//! Payment record and its status state machine.

use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Status of a payment.
///
/// ```text
/// Incomplete ──(process, compare-and-swap)──► Terminal(status)
/// ```
///
/// A payment leaves `Incomplete` at most once. Terminal values are supplied
/// by the caller (`"completed"`, `"failed"`, ...) and are never changed again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    #[default]
    Incomplete,
    Terminal(String),
}

impl PaymentStatus {
    /// Wire value of the initial status.
    pub const INCOMPLETE: &'static str = "incomplete";

    /// Parses a caller-requested terminal status.
    ///
    /// Surrounding whitespace is dropped. Blank values and any spelling of
    /// `"incomplete"` are rejected: allowing the latter would let a
    /// processed payment be processed a second time.
    pub fn terminal(status: impl Into<String>) -> Result<Self> {
        let status = status.into();
        let trimmed = status.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField { field: "status" });
        }
        if trimmed.eq_ignore_ascii_case(Self::INCOMPLETE) {
            return Err(ValidationError::ReservedStatus { status });
        }
        Ok(Self::Terminal(trimmed.to_string()))
    }

    /// Returns true while the payment is still waiting to be processed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, PaymentStatus::Incomplete)
    }

    /// Returns the wire value of the status.
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Incomplete => Self::INCOMPLETE,
            PaymentStatus::Terminal(status) => status,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        if value == Self::INCOMPLETE {
            PaymentStatus::Incomplete
        } else {
            PaymentStatus::Terminal(value)
        }
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Incomplete => PaymentStatus::INCOMPLETE.to_string(),
            PaymentStatus::Terminal(status) => status,
        }
    }
}

/// A payment as persisted in the Payments collection, keyed by `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub order_id: OrderId,
    pub total_price: i64,
    pub status: PaymentStatus,
}

impl Payment {
    /// Creates the initial, unprocessed payment for an order.
    pub fn incomplete(order_id: OrderId, total_price: i64) -> Self {
        Self {
            order_id,
            total_price,
            status: PaymentStatus::Incomplete,
        }
    }
}

/// Input for processing a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessPaymentRequest {
    pub order_id: String,
    pub status: String,
}

impl ProcessPaymentRequest {
    pub fn new(order_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: status.into(),
        }
    }

    /// Validates the request, returning the target order and terminal status.
    pub fn validate(&self) -> Result<(OrderId, PaymentStatus)> {
        if self.order_id.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "order_id" });
        }
        let status = PaymentStatus::terminal(self.status.clone())?;
        Ok((OrderId::from(self.order_id.clone()), status))
    }
}
