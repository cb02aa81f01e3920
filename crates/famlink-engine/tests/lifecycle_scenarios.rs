//! End-to-end lifecycle scenarios against the in-memory store, directory
//! and notifier, with a manually driven clock.

use std::sync::Arc;

use famlink_adapters::{AccountProfile, InMemoryDirectory, NotificationTopic, RecordingNotifier};
use famlink_core::{AccountCode, AccountId, ManualClock, Timestamp};
use famlink_engine::{EngineConfig, LifecycleEngine, LinkError};
use famlink_state::{LinkPolicy, LinkStatus, ResendEligibility};
use famlink_store::{InMemoryLinkStore, LinkStore, StatusFilter};
use proptest::prelude::*;

fn acct(s: &str) -> AccountId {
    AccountId::new(s).unwrap()
}

fn code(s: &str) -> AccountCode {
    AccountCode::new(s).unwrap()
}

fn profile(id: &str, code_str: &str, name: &str) -> AccountProfile {
    AccountProfile {
        id: acct(id),
        code: code(code_str),
        display_name: name.to_string(),
        email: Some(format!("{id}@example.com")),
        phone: Some("5550100".to_string()),
        country_code: Some("+44".to_string()),
    }
}

struct Harness {
    engine: LifecycleEngine,
    store: InMemoryLinkStore,
    notifier: RecordingNotifier,
    clock: ManualClock,
    policy: LinkPolicy,
}

impl Harness {
    fn new() -> Self {
        Self::with_policy(LinkPolicy::default())
    }

    fn with_policy(policy: LinkPolicy) -> Self {
        let store = InMemoryLinkStore::new();
        let directory = InMemoryDirectory::with_accounts([
            profile("S", "S001", "Sam"),
            profile("M", "M001", "Max"),
            profile("N", "N001", "Nia"),
            profile("T", "T001", "Tom"),
        ])
        .unwrap();
        let notifier = RecordingNotifier::new();
        let clock = ManualClock::new(Timestamp::parse("2026-01-05T08:00:00Z").unwrap());
        let engine = LifecycleEngine::new(
            Arc::new(store.clone()),
            Arc::new(directory),
            Arc::new(notifier.clone()),
            Arc::new(clock.clone()),
            EngineConfig::with_policy(policy),
        )
        .unwrap();
        Self {
            engine,
            store,
            notifier,
            clock,
            policy,
        }
    }

    fn s(&self) -> AccountId {
        acct("S")
    }

    fn m(&self) -> AccountId {
        acct("M")
    }

    fn request(&self) -> Result<LinkStatus, LinkError> {
        self.engine
            .request_link(&self.s(), &code("M001"))
            .map(|l| l.status)
    }

    fn reject(&self) {
        self.engine.decide(&self.m(), &self.s(), false).unwrap();
    }
}

// ── Single transitions ───────────────────────────────────────────────

#[test]
fn request_on_absent_pair_yields_initiated_with_no_rejections() {
    let h = Harness::new();
    let link = h.engine.request_link(&h.s(), &code("M001")).unwrap();
    assert_eq!(link.status, LinkStatus::Initiated);
    assert_eq!(link.reject_count, 0);
    assert_eq!(link.sponsor_id, h.s());
    assert_eq!(link.member_id, h.m());
    assert!(link.is_active);
}

#[test]
fn approval_notifies_the_sponsor_exactly_once() {
    let h = Harness::new();
    h.request().unwrap();
    let link = h.engine.decide(&h.m(), &h.s(), true).unwrap();
    assert_eq!(link.status, LinkStatus::Approved);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].topic, NotificationTopic::MemberAddition);
    assert_eq!(sent[0].recipient, h.s());
}

#[test]
fn decline_counts_one_rejection_and_stamps_the_date() {
    let h = Harness::new();
    h.request().unwrap();
    h.clock.advance_secs(3_600);
    let now = Timestamp::parse("2026-01-05T09:00:00Z").unwrap();
    let link = h.engine.decide(&h.m(), &h.s(), false).unwrap();
    assert_eq!(link.status, LinkStatus::Rejected);
    assert_eq!(link.reject_count, 1);
    assert_eq!(link.last_reject_date, Some(now));
    assert!(h.notifier.sent().is_empty());
}

#[test]
fn member_leaving_lands_in_rejected_and_notifies_sponsor() {
    let h = Harness::new();
    h.request().unwrap();
    h.engine.decide(&h.m(), &h.s(), true).unwrap();
    h.notifier.clear();

    let link = h.engine.remove_sponsor(&h.m(), &h.s()).unwrap();
    assert_eq!(link.status, LinkStatus::Rejected);
    assert_eq!(link.reject_count, 1);
    let sent = h.notifier.sent_with_topic(NotificationTopic::SelfDeletion);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, h.s());
}

#[test]
fn sponsor_removal_notifies_the_member() {
    let h = Harness::new();
    h.request().unwrap();
    h.engine.decide(&h.m(), &h.s(), true).unwrap();
    h.engine.remove_member(&h.s(), &h.m(), &h.s()).unwrap();
    let sent = h.notifier.sent_with_topic(NotificationTopic::MemberDeletion);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, h.m());
}

#[test]
fn duplicate_and_already_linked_requests_are_refused() {
    let h = Harness::new();
    let first = h.engine.request_link(&h.s(), &code("M001")).unwrap();
    h.clock.advance_days(2);
    assert_eq!(
        h.request(),
        Err(LinkError::DuplicateRequest {
            requested_at: first.created_date
        })
    );
    h.engine.decide(&h.m(), &h.s(), true).unwrap();
    assert_eq!(h.request(), Err(LinkError::AlreadyLinked));
    assert_eq!(h.store.len(), 1);
}

#[test]
fn out_of_order_triggers_are_invalid_transitions() {
    let h = Harness::new();
    h.request().unwrap();
    assert_eq!(
        h.engine.remove_member(&h.s(), &h.m(), &h.s()),
        Err(LinkError::InvalidTransition {
            from: LinkStatus::Initiated,
            to: LinkStatus::Revoked
        })
    );
    h.engine.decide(&h.m(), &h.s(), true).unwrap();
    assert_eq!(
        h.engine.decide(&h.m(), &h.s(), false),
        Err(LinkError::InvalidTransition {
            from: LinkStatus::Approved,
            to: LinkStatus::Rejected
        })
    );
    let link = h.engine.get_link(&h.s(), &h.m()).unwrap();
    assert_eq!(link.status, LinkStatus::Approved);
    assert_eq!(link.reject_count, 0);
}

#[test]
fn self_link_fails_without_touching_the_store() {
    let h = Harness::new();
    assert_eq!(
        h.engine.request_link(&h.s(), &code("S001")),
        Err(LinkError::SelfLinkNotAllowed)
    );
    assert!(h.store.is_empty());
}

// ── Cooldowns and the attempt ceiling ────────────────────────────────

#[test]
fn reject_cooldown_carries_the_retry_date() {
    let h = Harness::new();
    h.request().unwrap();
    h.reject();
    let rejected_at = h.clock_now();

    h.clock.advance_days(h.policy.reject_cooldown_days - 1);
    assert_eq!(
        h.request(),
        Err(LinkError::CooldownActive {
            retry_at: rejected_at.plus_days(h.policy.reject_cooldown_days)
        })
    );

    h.clock.advance_days(1);
    assert_eq!(h.request(), Ok(LinkStatus::Initiated));
}

#[test]
fn scenario_revoke_then_cooldown_then_re_request() {
    let h = Harness::new();
    assert_eq!(h.request(), Ok(LinkStatus::Initiated));
    assert_eq!(
        h.engine.decide(&h.m(), &h.s(), true).map(|l| l.status),
        Ok(LinkStatus::Approved)
    );

    let revoked = h.engine.remove_member(&h.s(), &h.m(), &h.s()).unwrap();
    assert_eq!(revoked.status, LinkStatus::Revoked);
    assert_eq!(revoked.reject_count, 1);
    let revoked_at = h.clock_now();

    h.clock.advance_days(h.policy.revoke_cooldown_days - 1);
    assert_eq!(
        h.request(),
        Err(LinkError::CooldownActive {
            retry_at: revoked_at.plus_days(h.policy.revoke_cooldown_days)
        })
    );

    h.clock.advance_days(1);
    let link = h.engine.request_link(&h.s(), &code("M001")).unwrap();
    assert_eq!(link.status, LinkStatus::Initiated);
    assert_eq!(link.id, revoked.id);
    assert_eq!(link.new_request_date, Some(h.clock_now()));
    assert_eq!(h.store.len(), 1);
}

#[test]
fn scenario_three_rejections_lock_the_pair_for_good() {
    let h = Harness::new();
    h.request().unwrap();
    for round in 1..=h.policy.max_reject_attempts {
        h.reject();
        h.clock.advance_days(h.policy.reject_cooldown_days);
        let attempt = h.request();
        if round < h.policy.max_reject_attempts {
            assert_eq!(attempt, Ok(LinkStatus::Initiated), "round {round}");
        } else {
            assert_eq!(
                attempt,
                Err(LinkError::LimitExceeded {
                    reject_count: 3,
                    max: 3
                })
            );
        }
    }

    h.clock.advance_days(3_650);
    assert_eq!(
        h.request(),
        Err(LinkError::LimitExceeded {
            reject_count: 3,
            max: 3
        })
    );
}

#[test]
fn leaving_counts_toward_the_ceiling() {
    let h = Harness::with_policy(LinkPolicy {
        max_reject_attempts: 2,
        ..LinkPolicy::default()
    });
    h.request().unwrap();
    h.reject();
    h.clock.advance_days(h.policy.reject_cooldown_days);
    h.request().unwrap();
    h.engine.decide(&h.m(), &h.s(), true).unwrap();
    h.engine.remove_sponsor(&h.m(), &h.s()).unwrap();

    h.clock.advance_days(h.policy.reject_cooldown_days);
    assert_eq!(
        h.request(),
        Err(LinkError::LimitExceeded {
            reject_count: 2,
            max: 2
        })
    );
}

#[test]
fn revoked_path_ignores_the_reject_count() {
    let h = Harness::new();
    h.request().unwrap();
    for _ in 0..5 {
        h.engine.decide(&h.m(), &h.s(), true).unwrap();
        h.engine.remove_member(&h.s(), &h.m(), &h.s()).unwrap();
        h.clock.advance_days(h.policy.revoke_cooldown_days);
        assert_eq!(h.request(), Ok(LinkStatus::Initiated));
    }
    let link = h.engine.get_link(&h.s(), &h.m()).unwrap();
    assert_eq!(link.reject_count, 5);
    assert!(link.reject_count > h.policy.max_reject_attempts);
}

#[test]
fn cooldown_is_anchored_on_the_latest_re_request() {
    // After a re-request new_request_date is the later of the two dates.
    let h = Harness::new();
    h.request().unwrap();
    h.reject();
    h.clock.advance_days(10);
    h.request().unwrap();
    let re_requested_at = h.clock_now();
    let link = h.engine.get_link(&h.s(), &h.m()).unwrap();
    assert_eq!(link.cooldown_anchor(), Some(re_requested_at));
}

// ── Queries ──────────────────────────────────────────────────────────

#[test]
fn listings_split_by_role_and_status() {
    let h = Harness::new();
    // S → M approved, S → N pending, S → T rejected.
    h.request().unwrap();
    h.engine.decide(&h.m(), &h.s(), true).unwrap();
    h.clock.advance_secs(1);
    h.engine.request_link(&h.s(), &code("N001")).unwrap();
    h.clock.advance_secs(1);
    h.engine.request_link(&h.s(), &code("T001")).unwrap();
    h.engine.decide(&acct("T"), &h.s(), false).unwrap();

    let members = h.engine.list_members(&h.s()).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].counterpart_id, h.m());
    assert_eq!(members[0].counterpart_name, "Max");

    let sponsors = h.engine.list_sponsors(&h.m()).unwrap();
    assert_eq!(sponsors.len(), 1);
    assert_eq!(sponsors[0].counterpart_name, "Sam");

    let outgoing = h.engine.list_outgoing_non_approved(&h.s()).unwrap();
    let statuses: Vec<_> = outgoing.iter().map(|v| v.status).collect();
    assert_eq!(statuses, vec![LinkStatus::Initiated, LinkStatus::Rejected]);
    assert!(matches!(
        outgoing[0].eligibility,
        Some(ResendEligibility::AwaitingDecision { .. })
    ));
    assert!(matches!(
        outgoing[1].eligibility,
        Some(ResendEligibility::CooldownActive { .. })
    ));
    assert_eq!(outgoing[1].remaining_attempts, Some(2));

    let incoming = h.engine.list_incoming_pending(&acct("N")).unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].counterpart_id, h.s());
    assert!(h.engine.list_incoming_pending(&acct("T")).unwrap().is_empty());
}

#[test]
fn eligibility_check_reports_without_mutating() {
    let h = Harness::new();
    assert!(matches!(
        h.engine.check_eligibility(&h.s(), &h.m()),
        Err(LinkError::LinkNotFound { .. })
    ));
    h.request().unwrap();
    h.reject();
    let before = h.engine.get_link(&h.s(), &h.m()).unwrap();

    let report = h.engine.check_eligibility(&h.s(), &h.m()).unwrap();
    assert_eq!(report.status, LinkStatus::Rejected);
    assert_eq!(report.remaining_attempts, Some(2));
    assert!(!report.eligibility.is_eligible());

    h.clock.advance_days(h.policy.reject_cooldown_days);
    assert!(h
        .engine
        .check_eligibility(&h.s(), &h.m())
        .unwrap()
        .eligibility
        .is_eligible());
    assert_eq!(h.engine.get_link(&h.s(), &h.m()).unwrap(), before);
}

// ── Concurrency ──────────────────────────────────────────────────────

#[test]
fn concurrent_requests_for_one_pair_create_one_record() {
    let h = Harness::new();
    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| h.engine.request_link(&h.s(), &code("M001"))))
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for outcome in outcomes.iter().filter(|r| r.is_err()) {
        assert!(matches!(outcome, Err(LinkError::DuplicateRequest { .. })));
    }
    assert_eq!(h.store.len(), 1);
    assert_eq!(
        h.store
            .list_by_sponsor(&h.s(), StatusFilter::Any)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn concurrent_decisions_apply_exactly_one_transition() {
    let h = Harness::new();
    h.request().unwrap();
    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = &h.engine;
                let (m, s) = (h.m(), h.s());
                scope.spawn(move || engine.decide(&m, &s, i % 2 == 0))
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let link = h.engine.get_link(&h.s(), &h.m()).unwrap();
    // Creation plus exactly one decision.
    assert_eq!(link.transitions.len(), 2);
}

impl Harness {
    fn clock_now(&self) -> Timestamp {
        use famlink_core::Clock;
        self.clock.now()
    }
}

// ── Properties ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Request(usize),
    Approve(usize),
    Decline(usize),
    RemoveMember(usize),
    RemoveSponsor(usize),
    Advance(u32),
}

const MEMBERS: [(&str, &str); 3] = [("M", "M001"), ("N", "N001"), ("T", "T001")];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3usize).prop_map(Op::Request),
        (0..3usize).prop_map(Op::Approve),
        (0..3usize).prop_map(Op::Decline),
        (0..3usize).prop_map(Op::RemoveMember),
        (0..3usize).prop_map(Op::RemoveSponsor),
        (0..40u32).prop_map(Op::Advance),
    ]
}

proptest! {
    #[test]
    fn random_operation_sequences_keep_one_record_per_pair(
        ops in proptest::collection::vec(op_strategy(), 1..60)
    ) {
        let h = Harness::new();
        let mut last_counts = [0u32; 3];
        for op in ops {
            let _ = match op {
                Op::Request(i) => h.engine.request_link(&h.s(), &code(MEMBERS[i].1)).map(|_| ()),
                Op::Approve(i) => h.engine.decide(&acct(MEMBERS[i].0), &h.s(), true).map(|_| ()),
                Op::Decline(i) => h.engine.decide(&acct(MEMBERS[i].0), &h.s(), false).map(|_| ()),
                Op::RemoveMember(i) => h.engine.remove_member(&h.s(), &acct(MEMBERS[i].0), &h.s()).map(|_| ()),
                Op::RemoveSponsor(i) => h.engine.remove_sponsor(&acct(MEMBERS[i].0), &h.s()).map(|_| ()),
                Op::Advance(days) => {
                    h.clock.advance_days(days);
                    Ok(())
                }
            };

            for (i, (member, _)) in MEMBERS.iter().enumerate() {
                let found = h.store.find_by_pair(&h.s(), &acct(member));
                prop_assert!(found.is_ok());
                if let Ok(Some(link)) = found {
                    prop_assert!(link.reject_count >= last_counts[i]);
                    last_counts[i] = link.reject_count;
                }
            }
            prop_assert!(h.store.len() <= MEMBERS.len());
        }
    }
}
