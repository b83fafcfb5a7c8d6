//! Order record and the request that creates it.

use common::OrderId;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// An order as persisted in the Orders collection.
///
/// `shipping_ready` starts out `false` and is only ever flipped to `true`
/// once a payment for this order has been processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    pub item: String,
    pub quantity: i32,
    pub total_price: i64,
    pub shipping_ready: bool,
}

impl Order {
    /// Validates a creation request and builds a new order with a fresh id.
    pub fn create(request: CreateOrderRequest) -> Result<Self> {
        request.validate()?;

        Ok(Self {
            order_id: OrderId::generate(),
            user_id: request.user_id,
            item: request.item,
            quantity: request.quantity,
            total_price: request.total_price,
            shipping_ready: false,
        })
    }
}

/// Input for creating an order.
///
/// Absent fields decode to their zero value so that a missing field is
/// reported by [`CreateOrderRequest::validate`] rather than by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub item: String,
    pub quantity: i32,
    pub total_price: i64,
}

impl CreateOrderRequest {
    /// Creates a request from its fields.
    pub fn new(
        user_id: impl Into<String>,
        item: impl Into<String>,
        quantity: i32,
        total_price: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            item: item.into(),
            quantity,
            total_price,
        }
    }

    /// Checks that every field is present and in range.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "user_id" });
        }
        if self.item.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "item" });
        }
        if self.quantity <= 0 {
            return Err(ValidationError::NonPositive {
                field: "quantity",
                value: i64::from(self.quantity),
            });
        }
        if self.total_price <= 0 {
            return Err(ValidationError::NonPositive {
                field: "total_price",
                value: self.total_price,
            });
        }
        Ok(())
    }
}
