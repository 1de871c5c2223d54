//! Cancellation policy and cancellation record models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppError;
use crate::AppResult;

/// Cancellation policy type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CancellationPolicyType {
    /// Full refund before the deadline
    #[default]
    Free,
    /// Partial refund before the deadline
    Partial,
    /// Never refunded
    NonRefundable,
}

impl fmt::Display for CancellationPolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancellationPolicyType::Free => write!(f, "free"),
            CancellationPolicyType::Partial => write!(f, "partial"),
            CancellationPolicyType::NonRefundable => write!(f, "non-refundable"),
        }
    }
}

impl CancellationPolicyType {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "free" => Some(CancellationPolicyType::Free),
            "partial" => Some(CancellationPolicyType::Partial),
            "non-refundable" => Some(CancellationPolicyType::NonRefundable),
            _ => None,
        }
    }
}

/// Cancellation policy
///
/// Cancelling at least `deadline_hours` before check-in refunds
/// `refund_percentage` of what was paid; later cancellations refund
/// `late_refund_percentage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    pub policy_type: CancellationPolicyType,
    pub deadline_hours: i64,
    pub refund_percentage: Decimal,
    #[serde(default)]
    pub late_refund_percentage: Decimal,
}

impl CancellationPolicy {
    /// 100% refund up to `deadline_hours` before check-in
    pub fn free(deadline_hours: i64) -> Self {
        Self {
            policy_type: CancellationPolicyType::Free,
            deadline_hours,
            refund_percentage: Decimal::ONE_HUNDRED,
            late_refund_percentage: Decimal::ZERO,
        }
    }

    /// `refund_percentage` refund up to `deadline_hours` before check-in
    pub fn partial(deadline_hours: i64, refund_percentage: Decimal) -> Self {
        Self {
            policy_type: CancellationPolicyType::Partial,
            deadline_hours,
            refund_percentage,
            late_refund_percentage: Decimal::ZERO,
        }
    }

    pub fn non_refundable() -> Self {
        Self {
            policy_type: CancellationPolicyType::NonRefundable,
            deadline_hours: 0,
            refund_percentage: Decimal::ZERO,
            late_refund_percentage: Decimal::ZERO,
        }
    }

    /// Reject percentages outside 0..=100 and negative deadlines
    pub fn validate(&self) -> AppResult<()> {
        let range = Decimal::ZERO..=Decimal::ONE_HUNDRED;
        if !range.contains(&self.refund_percentage) || !range.contains(&self.late_refund_percentage)
        {
            return Err(AppError::Validation(
                "refund percentages must be between 0 and 100".to_string(),
            ));
        }
        if self.deadline_hours < 0 {
            return Err(AppError::Validation(
                "deadline_hours must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::free(48)
    }
}

/// Refund settlement status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Awaiting execution by the payment gateway
    #[default]
    Pending,
    Processed,
    Failed,
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefundStatus::Pending => write!(f, "pending"),
            RefundStatus::Processed => write!(f, "processed"),
            RefundStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Cancellation record
///
/// Written once when a booking is cancelled. Only `refund_status` moves
/// afterwards, and only out of `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCancellation {
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: Option<String>,

    /// Hours between cancellation and check-in (negative once check-in passed)
    pub hours_before_check_in: i64,

    /// Percentage of `amount_paid` refunded
    pub refund_percentage: Decimal,
    pub refund_amount: Decimal,
    pub refund_status: RefundStatus,

    /// Policy in force when the cancellation was made
    pub policy: CancellationPolicy,
    pub refund_settled_at: Option<DateTime<Utc>>,
}

impl BookingCancellation {
    /// Move the refund out of `pending`
    pub fn settle_refund(&mut self, processed: bool, at: DateTime<Utc>) -> AppResult<()> {
        let target = if processed {
            RefundStatus::Processed
        } else {
            RefundStatus::Failed
        };

        if self.refund_status != RefundStatus::Pending {
            return Err(AppError::InvalidTransition {
                from: format!("refund {}", self.refund_status),
                to: format!("refund {}", target),
            });
        }

        self.refund_status = target;
        self.refund_settled_at = Some(at);
        Ok(())
    }
}
