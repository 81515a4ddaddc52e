//! Static transition table.
//!
//! Policy data, not code: each entry says which roles may move a case
//! from one status to another, which side effects fire afterwards, and
//! whether a reason must accompany the change. Lookup is a linear scan —
//! the table is tens of entries and never grows at runtime.

use crate::error::{Error, Result};
use crate::model::{CaseStatus, Role};

/// A named, best-effort downstream action dispatched after a committed
/// transition. Tags map 1:1 to event names on the sink; external
/// listeners do the actual work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Kick the assignment engine for a freshly submitted case.
    TriggerAutoAssignment,
    /// Have the SLA listener compute and set the deadline.
    ScheduleSlaDeadline,
    /// Open the client communication room for the case.
    CreateCommunicationRoom,
    /// Notify the originating client of the status change.
    NotifyClient,
    /// Notify the assigned worker of the status change.
    NotifyAssignee,
}

impl SideEffect {
    /// Event name published on the sink for this tag.
    pub fn event_name(self) -> &'static str {
        match self {
            SideEffect::TriggerAutoAssignment => "case.assignment.requested",
            SideEffect::ScheduleSlaDeadline => "case.sla.schedule",
            SideEffect::CreateCommunicationRoom => "case.room.create",
            SideEffect::NotifyClient => "case.notify.client",
            SideEffect::NotifyAssignee => "case.notify.assignee",
        }
    }
}

/// One legal transition.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: CaseStatus,
    pub to: CaseStatus,
    /// Explicit enumeration; no role inherits another's permissions.
    pub allowed_roles: &'static [Role],
    /// Dispatched post-commit, in this order.
    pub side_effects: &'static [SideEffect],
    /// When true, the caller must supply a non-empty reason.
    pub requires_reason: bool,
}

use CaseStatus::*;
use Role::*;
use SideEffect::*;

/// The full table. Terminal statuses (`Completed`, `Rejected`) have no
/// outgoing entries.
pub static TRANSITIONS: &[Transition] = &[
    Transition {
        from: Draft,
        to: Submitted,
        allowed_roles: &[Client, Admin],
        side_effects: &[
            TriggerAutoAssignment,
            ScheduleSlaDeadline,
            CreateCommunicationRoom,
        ],
        requires_reason: false,
    },
    Transition {
        from: Submitted,
        to: Draft,
        allowed_roles: &[Client, Admin],
        side_effects: &[],
        requires_reason: true,
    },
    Transition {
        from: Submitted,
        to: UnderReview,
        allowed_roles: &[Agent, Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: false,
    },
    Transition {
        from: Submitted,
        to: Rejected,
        allowed_roles: &[Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: true,
    },
    Transition {
        from: UnderReview,
        to: Processing,
        allowed_roles: &[Agent, Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: false,
    },
    Transition {
        from: UnderReview,
        to: Submitted,
        allowed_roles: &[Agent, Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: true,
    },
    Transition {
        from: UnderReview,
        to: Rejected,
        allowed_roles: &[Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: true,
    },
    Transition {
        from: Processing,
        to: OnHold,
        allowed_roles: &[Agent, Supervisor, Admin],
        side_effects: &[NotifyClient, NotifyAssignee],
        requires_reason: true,
    },
    Transition {
        from: OnHold,
        to: Processing,
        allowed_roles: &[Agent, Supervisor, Admin],
        side_effects: &[NotifyAssignee],
        requires_reason: false,
    },
    Transition {
        from: OnHold,
        to: Rejected,
        allowed_roles: &[Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: true,
    },
    Transition {
        from: Processing,
        to: Completed,
        allowed_roles: &[Agent, Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: false,
    },
    Transition {
        from: Processing,
        to: Rejected,
        allowed_roles: &[Supervisor, Admin],
        side_effects: &[NotifyClient],
        requires_reason: true,
    },
];

/// Find the table entry for `(from, to)` and check the actor role.
///
/// `InvalidTransition` when no `(from, to)` pair exists at all;
/// `Forbidden` when the pair exists but the role is not listed.
pub fn find_transition(from: CaseStatus, to: CaseStatus, role: Role) -> Result<&'static Transition> {
    let entry = TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.to == to)
        .ok_or(Error::InvalidTransition { from, to })?;

    if entry.allowed_roles.contains(&role) {
        Ok(entry)
    } else {
        Err(Error::Forbidden {
            role,
            action: format!("transition {from} -> {to}"),
        })
    }
}

/// All transitions available to `role` from `from`. Read-only; drives
/// UI affordances.
pub fn available_transitions(from: CaseStatus, role: Role) -> Vec<&'static Transition> {
    TRANSITIONS
        .iter()
        .filter(|t| t.from == from && t.allowed_roles.contains(&role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_have_no_outgoing_entries() {
        assert!(!TRANSITIONS.iter().any(|t| t.from.is_terminal()));
    }

    #[test]
    fn unknown_pair_is_invalid_for_every_role() {
        for role in [Client, Agent, Supervisor, Admin] {
            let err = find_transition(Draft, Completed, role).unwrap_err();
            assert!(matches!(err, Error::InvalidTransition { .. }), "{err}");
        }
    }

    #[test]
    fn known_pair_with_unlisted_role_is_forbidden() {
        let err = find_transition(UnderReview, Rejected, Agent).unwrap_err();
        assert!(matches!(err, Error::Forbidden { role: Agent, .. }), "{err}");
    }

    #[test]
    fn client_submits_draft_with_expected_side_effects() {
        let t = find_transition(Draft, Submitted, Client).unwrap();
        assert_eq!(
            t.side_effects,
            &[
                TriggerAutoAssignment,
                ScheduleSlaDeadline,
                CreateCommunicationRoom
            ]
        );
        assert!(!t.requires_reason);
    }

    #[test]
    fn rejections_always_require_a_reason() {
        for t in TRANSITIONS.iter().filter(|t| t.to == Rejected) {
            assert!(t.requires_reason, "{} -> rejected must require reason", t.from);
        }
    }

    #[test]
    fn rejections_exclude_base_staff() {
        for t in TRANSITIONS.iter().filter(|t| t.to == Rejected) {
            assert!(!t.allowed_roles.contains(&Agent));
            assert!(!t.allowed_roles.contains(&Client));
        }
    }

    #[test]
    fn available_transitions_filters_by_role() {
        let client = available_transitions(Submitted, Client);
        assert_eq!(client.len(), 1);
        assert_eq!(client[0].to, Draft);

        let supervisor = available_transitions(Submitted, Supervisor);
        let targets: Vec<_> = supervisor.iter().map(|t| t.to).collect();
        assert!(targets.contains(&UnderReview));
        assert!(targets.contains(&Rejected));

        assert!(available_transitions(Completed, Admin).is_empty());
    }
}
