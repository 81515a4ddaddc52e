//! Property tests over the static transition table. No database needed.

use caseflow::error::Error;
use caseflow::model::{CaseStatus, Role};
use caseflow::transitions::{TRANSITIONS, available_transitions, find_transition};

const ALL_STATUSES: [CaseStatus; 7] = [
    CaseStatus::Draft,
    CaseStatus::Submitted,
    CaseStatus::UnderReview,
    CaseStatus::Processing,
    CaseStatus::OnHold,
    CaseStatus::Completed,
    CaseStatus::Rejected,
];

const ALL_ROLES: [Role; 4] = [Role::Client, Role::Agent, Role::Supervisor, Role::Admin];

fn pair_exists(from: CaseStatus, to: CaseStatus) -> bool {
    TRANSITIONS.iter().any(|t| t.from == from && t.to == to)
}

#[test]
fn absent_pairs_fail_invalid_transition_for_every_role() {
    for from in ALL_STATUSES {
        for to in ALL_STATUSES {
            if pair_exists(from, to) {
                continue;
            }
            for role in ALL_ROLES {
                match find_transition(from, to, role) {
                    Err(Error::InvalidTransition { .. }) => {}
                    other => panic!("({from}, {to}, {role}): expected InvalidTransition, got {other:?}"),
                }
            }
        }
    }
}

#[test]
fn present_pairs_with_unlisted_roles_fail_forbidden() {
    for t in TRANSITIONS {
        for role in ALL_ROLES {
            if t.allowed_roles.contains(&role) {
                assert!(find_transition(t.from, t.to, role).is_ok());
            } else {
                match find_transition(t.from, t.to, role) {
                    Err(Error::Forbidden { .. }) => {}
                    other => panic!(
                        "({}, {}, {role}): expected Forbidden, got {other:?}",
                        t.from, t.to
                    ),
                }
            }
        }
    }
}

#[test]
fn terminal_statuses_offer_no_actions_to_anyone() {
    for role in ALL_ROLES {
        assert!(available_transitions(CaseStatus::Completed, role).is_empty());
        assert!(available_transitions(CaseStatus::Rejected, role).is_empty());
    }
}

#[test]
fn every_status_change_reaches_a_terminal_state() {
    // From any non-terminal status there is a path to Completed or
    // Rejected; nothing dead-ends.
    for start in ALL_STATUSES.iter().filter(|s| !s.is_terminal()) {
        let mut reachable = vec![*start];
        let mut frontier = vec![*start];
        while let Some(from) = frontier.pop() {
            for t in TRANSITIONS.iter().filter(|t| t.from == from) {
                if !reachable.contains(&t.to) {
                    reachable.push(t.to);
                    frontier.push(t.to);
                }
            }
        }
        assert!(
            reachable.iter().any(|s| s.is_terminal()),
            "no terminal status reachable from {start}"
        );
    }
}

#[test]
fn base_staff_cannot_reject_under_review() {
    // Rejection of a case under review requires an elevated role.
    let err = find_transition(CaseStatus::UnderReview, CaseStatus::Rejected, Role::Agent)
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
    assert!(find_transition(CaseStatus::UnderReview, CaseStatus::Rejected, Role::Supervisor).is_ok());
}

#[test]
fn submission_side_effects_in_table_order() {
    let t = find_transition(CaseStatus::Draft, CaseStatus::Submitted, Role::Client).unwrap();
    let names: Vec<_> = t.side_effects.iter().map(|e| e.event_name()).collect();
    assert_eq!(
        names,
        [
            "case.assignment.requested",
            "case.sla.schedule",
            "case.room.create"
        ]
    );
}
