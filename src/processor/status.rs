use crate::domain::payment::PaymentStatus;
use crate::processor::ProcessorSession;

/// The only place a local status is derived from processor fields.
pub fn map_external_status(session: &ProcessorSession) -> PaymentStatus {
    if session.payment_status.as_deref() == Some("paid") {
        return PaymentStatus::Completed;
    }
    match session.status.as_deref() {
        Some("complete") => PaymentStatus::Completed,
        Some("expired") => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

/// Allowed transitions: pending -> completed and pending -> failed.
///
/// The repository enforces the same table with a conditional update.
pub fn next_status(current: PaymentStatus, derived: PaymentStatus) -> Option<PaymentStatus> {
    match (current, derived) {
        (PaymentStatus::Pending, PaymentStatus::Completed) => Some(PaymentStatus::Completed),
        (PaymentStatus::Pending, PaymentStatus::Failed) => Some(PaymentStatus::Failed),
        _ => None,
    }
}
