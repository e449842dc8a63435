use chrono::{Duration, Utc};
use photostudio_api::middleware::auth::{
    AuthUser, ensure_admin, ensure_any_role, ensure_editor, ensure_staff,
};
use photostudio_api::models::{Revision, Role};
use photostudio_api::workflow::{
    self, OrderEvent, OrderStatus, TransitionError, latest_pending, next_status,
};
use uuid::Uuid;

#[test]
fn assigning_an_editor_moves_live_orders_to_in_progress() {
    for status in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Assigned,
        OrderStatus::InProgress,
    ] {
        assert_eq!(
            next_status(status, OrderEvent::EditorAssigned { assigned: true }),
            Ok(OrderStatus::InProgress),
        );
    }
}

#[test]
fn unassigning_resets_to_pending() {
    assert_eq!(
        next_status(
            OrderStatus::InProgress,
            OrderEvent::EditorAssigned { assigned: false }
        ),
        Ok(OrderStatus::Pending),
    );
}

#[test]
fn assignment_is_rejected_once_delivered_or_dead() {
    for status in [
        OrderStatus::Completed,
        OrderStatus::Revision,
        OrderStatus::Cancelled,
    ] {
        assert!(matches!(
            next_status(status, OrderEvent::EditorAssigned { assigned: true }),
            Err(TransitionError::Invalid { .. })
        ));
    }
}

#[test]
fn first_delivery_completes_an_in_progress_order() {
    assert_eq!(
        next_status(
            OrderStatus::InProgress,
            OrderEvent::EditedImageUploaded {
                fulfills_revision: false
            }
        ),
        Ok(OrderStatus::Completed),
    );
    // A plain delivery is not valid once the order is already completed;
    // only a revision fulfillment applies there.
    assert!(
        next_status(
            OrderStatus::Completed,
            OrderEvent::EditedImageUploaded {
                fulfills_revision: false
            }
        )
        .is_err()
    );
}

#[test]
fn revision_fulfillment_returns_the_order_to_completed() {
    assert_eq!(
        next_status(
            OrderStatus::Revision,
            OrderEvent::EditedImageUploaded {
                fulfills_revision: true
            }
        ),
        Ok(OrderStatus::Completed),
    );
    assert!(
        next_status(
            OrderStatus::Pending,
            OrderEvent::EditedImageUploaded {
                fulfills_revision: true
            }
        )
        .is_err()
    );
}

#[test]
fn revisions_can_only_be_requested_after_completion() {
    assert_eq!(
        next_status(OrderStatus::Completed, OrderEvent::RevisionRequested),
        Ok(OrderStatus::Revision),
    );
    for status in [
        OrderStatus::Pending,
        OrderStatus::InProgress,
        OrderStatus::Revision,
        OrderStatus::Cancelled,
    ] {
        assert!(next_status(status, OrderEvent::RevisionRequested).is_err());
    }
}

#[test]
fn cancellation_works_from_any_live_state_and_is_terminal() {
    for status in OrderStatus::ALL {
        let result = next_status(status, OrderEvent::OrderCancelled);
        if status == OrderStatus::Cancelled {
            assert!(result.is_err());
        } else {
            assert_eq!(result, Ok(OrderStatus::Cancelled));
        }
    }
}

#[test]
fn status_text_round_trips() {
    for status in OrderStatus::ALL {
        assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(OrderStatus::parse("shipped"), None);
}

#[test]
fn revision_eligibility_requires_all_three_conditions() {
    assert!(workflow::revision_eligible(OrderStatus::Completed, 1, false));

    // Flipping any single condition makes the item ineligible.
    assert!(!workflow::revision_eligible(OrderStatus::InProgress, 1, false));
    assert!(!workflow::revision_eligible(OrderStatus::Completed, 0, false));
    assert!(!workflow::revision_eligible(OrderStatus::Completed, 1, true));
}

#[test]
fn effective_editor_prefers_the_item_assignment() {
    let item_editor = Uuid::new_v4();
    let order_editor = Uuid::new_v4();

    assert_eq!(
        workflow::effective_editor(Some(item_editor), Some(order_editor)),
        Some(item_editor),
    );
    assert_eq!(
        workflow::effective_editor(None, Some(order_editor)),
        Some(order_editor),
    );
    assert_eq!(workflow::effective_editor(None, None), None);
}

fn revision_at(status: &str, created_at: chrono::DateTime<Utc>) -> Revision {
    Revision {
        id: Uuid::new_v4(),
        order_item_id: Uuid::new_v4(),
        status: status.to_string(),
        assigned_to: None,
        requested_by: Uuid::new_v4(),
        notes: String::new(),
        created_at,
        completed_at: None,
    }
}

#[test]
fn the_newest_pending_revision_wins_the_tie_break() {
    let t0 = Utc::now();
    let older = revision_at("pending", t0);
    let newer = revision_at("pending", t0 + Duration::seconds(30));
    let closed = revision_at("completed", t0 + Duration::seconds(60));

    let revisions = vec![closed, older.clone(), newer.clone()];
    let picked = latest_pending(&revisions).expect("one pending revision expected");
    assert_eq!(picked.id, newer.id);
    assert_ne!(picked.id, older.id);
}

#[test]
fn latest_pending_ignores_completed_revisions() {
    let t0 = Utc::now();
    let revisions = vec![revision_at("completed", t0)];
    assert!(latest_pending(&revisions).is_none());
    assert!(latest_pending::<Revision>(&[]).is_none());
}

#[test]
fn role_predicates_match_the_hierarchy() {
    assert!(Role::Admin.is_admin());
    for role in [Role::Customer, Role::Editor, Role::Staff] {
        assert!(!role.is_admin());
    }

    for role in [Role::Admin, Role::Staff] {
        assert!(role.is_staff());
    }
    for role in [Role::Customer, Role::Editor] {
        assert!(!role.is_staff());
    }

    for role in [Role::Admin, Role::Staff, Role::Editor] {
        assert!(role.is_editor());
    }
    assert!(!Role::Customer.is_editor());
}

fn user_with_role(role: Role) -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        email: "guard@example.com".to_string(),
        role,
    }
}

#[test]
fn route_guards_follow_the_role_predicates() {
    assert!(ensure_admin(&user_with_role(Role::Admin)).is_ok());
    assert!(ensure_admin(&user_with_role(Role::Staff)).is_err());

    assert!(ensure_staff(&user_with_role(Role::Staff)).is_ok());
    assert!(ensure_staff(&user_with_role(Role::Editor)).is_err());

    assert!(ensure_editor(&user_with_role(Role::Editor)).is_ok());
    assert!(ensure_editor(&user_with_role(Role::Customer)).is_err());

    let any = [Role::Customer, Role::Editor];
    assert!(ensure_any_role(&user_with_role(Role::Customer), &any).is_ok());
    assert!(ensure_any_role(&user_with_role(Role::Editor), &any).is_ok());
    assert!(ensure_any_role(&user_with_role(Role::Admin), &any).is_err());
}

#[test]
fn role_text_round_trips() {
    for role in [Role::Customer, Role::Editor, Role::Staff, Role::Admin] {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("superuser"), None);
}
