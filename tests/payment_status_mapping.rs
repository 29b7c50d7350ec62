use club_portal::domain::payment::PaymentStatus;
use club_portal::processor::status::{map_external_status, next_status};
use club_portal::processor::ProcessorSession;

fn session(status: Option<&str>, payment_status: Option<&str>) -> ProcessorSession {
    ProcessorSession {
        id: "cs_test".to_string(),
        status: status.map(str::to_string),
        payment_status: payment_status.map(str::to_string),
        ..Default::default()
    }
}

#[test]
fn paid_sessions_complete() {
    assert_eq!(map_external_status(&session(Some("open"), Some("paid"))), PaymentStatus::Completed);
    assert_eq!(map_external_status(&session(None, Some("paid"))), PaymentStatus::Completed);
}

#[test]
fn complete_sessions_complete() {
    assert_eq!(
        map_external_status(&session(Some("complete"), Some("unpaid"))),
        PaymentStatus::Completed
    );
}

#[test]
fn expired_sessions_fail() {
    assert_eq!(map_external_status(&session(Some("expired"), Some("unpaid"))), PaymentStatus::Failed);
}

#[test]
fn anything_else_stays_pending() {
    assert_eq!(map_external_status(&session(Some("open"), Some("unpaid"))), PaymentStatus::Pending);
    assert_eq!(map_external_status(&session(None, None)), PaymentStatus::Pending);
    assert_eq!(
        map_external_status(&session(Some("something_new"), Some("no_payment_required"))),
        PaymentStatus::Pending
    );
}

#[test]
fn only_pending_moves_forward() {
    assert_eq!(
        next_status(PaymentStatus::Pending, PaymentStatus::Completed),
        Some(PaymentStatus::Completed)
    );
    assert_eq!(
        next_status(PaymentStatus::Pending, PaymentStatus::Failed),
        Some(PaymentStatus::Failed)
    );
    assert_eq!(next_status(PaymentStatus::Pending, PaymentStatus::Pending), None);
}

#[test]
fn terminal_statuses_never_transition() {
    let all = [PaymentStatus::Pending, PaymentStatus::Completed, PaymentStatus::Failed];
    for current in [PaymentStatus::Completed, PaymentStatus::Failed] {
        for derived in all {
            assert_eq!(next_status(current, derived), None, "{current:?} -> {derived:?}");
        }
    }
}
