//! # Lifecycle Engine
//!
//! Every mutating operation is one read → decide → conditional-write unit:
//!
//! 1. Resolve identities through the directory (outside the retry loop).
//! 2. Read the active record for the pair.
//! 3. Apply the state machine to a copy of it.
//! 4. `upsert` the copy. The store accepts it only if nobody else wrote the
//!    pair since step 2; otherwise go back to step 2.
//! 5. Hand back the winning write as a [`CommittedTransition`]. Its
//!    notification goes out on [`LifecycleEngine::publish`], after the
//!    caller has made the write durable.

use std::sync::Arc;

use famlink_adapters::{DirectoryAdapter, Notification, NotificationTopic, NotifierAdapter};
use famlink_core::{AccountCode, AccountId, Clock, Timestamp};
use famlink_state::{
    FamilyLink, LinkPolicy, LinkStatus, LinkTransitionEvidence, PolicyError,
};
use famlink_store::{LinkStore, StatusFilter, StoreError};

use crate::command::{CommittedTransition, LinkCommand, PendingNotification};
use crate::config::EngineConfig;
use crate::error::LinkError;
use crate::view::{EligibilityReport, LinkView, Viewer};

const TRANSITIONS_TOTAL: &str = "famlink_transitions_total";
const GUARD_REFUSALS_TOTAL: &str = "famlink_guard_refusals_total";
const STORE_CONFLICTS_TOTAL: &str = "famlink_store_conflicts_total";
const NOTIFY_FAILURES_TOTAL: &str = "famlink_notify_failures_total";

/// The family-linkage lifecycle engine.
///
/// Cheap to share: every collaborator sits behind an `Arc`, and the engine
/// itself holds no mutable state.
pub struct LifecycleEngine {
    store: Arc<dyn LinkStore>,
    directory: Arc<dyn DirectoryAdapter>,
    notifier: Arc<dyn NotifierAdapter>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("directory", &self.directory.adapter_name())
            .field("notifier", &self.notifier.adapter_name())
            .field("config", &self.config)
            .finish()
    }
}

impl LifecycleEngine {
    /// Build an engine. Fails if the policy would lock every pair.
    pub fn new(
        store: Arc<dyn LinkStore>,
        directory: Arc<dyn DirectoryAdapter>,
        notifier: Arc<dyn NotifierAdapter>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, PolicyError> {
        config.validate()?;
        Ok(Self {
            store,
            directory,
            notifier,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &LinkPolicy {
        &self.config.policy
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Sponsor asks to link the member identified by `member_code`.
    ///
    /// Creates the pair's record in `INITIATED`, or re-requests an existing
    /// `REJECTED` / `REVOKED` record subject to the attempt ceiling and
    /// cooldowns.
    pub fn request_link(
        &self,
        sponsor_id: &AccountId,
        member_code: &AccountCode,
    ) -> Result<FamilyLink, LinkError> {
        self.execute(LinkCommand::Request {
            sponsor_id: sponsor_id.clone(),
            member_code: member_code.clone(),
        })
    }

    /// Member accepts (`approve = true`) or declines a pending request.
    pub fn decide(
        &self,
        member_id: &AccountId,
        sponsor_id: &AccountId,
        approve: bool,
    ) -> Result<FamilyLink, LinkError> {
        self.execute(LinkCommand::Decide {
            member_id: member_id.clone(),
            sponsor_id: sponsor_id.clone(),
            approve,
        })
    }

    /// Sponsor removes an approved member (`APPROVED → REVOKED`).
    ///
    /// `acting_account` is the account performing the call. It must not be
    /// the member being removed.
    pub fn remove_member(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
        acting_account: &AccountId,
    ) -> Result<FamilyLink, LinkError> {
        self.execute(LinkCommand::RemoveMember {
            sponsor_id: sponsor_id.clone(),
            member_id: member_id.clone(),
            acting_account: acting_account.clone(),
        })
    }

    /// Member leaves an approved link (`APPROVED → REJECTED`).
    pub fn remove_sponsor(
        &self,
        member_id: &AccountId,
        sponsor_id: &AccountId,
    ) -> Result<FamilyLink, LinkError> {
        self.execute(LinkCommand::RemoveSponsor {
            member_id: member_id.clone(),
            sponsor_id: sponsor_id.clone(),
        })
    }

    /// Commit `command` and publish it straight away. For callers whose
    /// link store is the durable one.
    pub fn execute(&self, command: LinkCommand) -> Result<FamilyLink, LinkError> {
        self.commit(&command).map(|committed| self.publish(committed))
    }

    /// Apply `command` to the link store, holding back its notification.
    pub fn commit(&self, command: &LinkCommand) -> Result<CommittedTransition, LinkError> {
        let result = match command {
            LinkCommand::Request {
                sponsor_id,
                member_code,
            } => self.commit_request(sponsor_id, member_code),
            LinkCommand::Decide {
                member_id,
                sponsor_id,
                approve,
            } => self.commit_decision(member_id, sponsor_id, *approve),
            LinkCommand::RemoveMember {
                sponsor_id,
                member_id,
                acting_account,
            } => self.commit_member_removal(sponsor_id, member_id, acting_account),
            LinkCommand::RemoveSponsor {
                member_id,
                sponsor_id,
            } => self.commit_sponsor_removal(member_id, sponsor_id),
        };
        self.observe(command.operation(), result)
    }

    /// Send the held-back notification of a durable transition.
    pub fn publish(&self, committed: CommittedTransition) -> FamilyLink {
        if let Some(pending) = &committed.notification {
            self.notify(&pending.recipient, pending.topic, &committed.link);
        }
        committed.link
    }

    /// Undo a transition that could not be made durable.
    ///
    /// The pair goes back to its previous record, or is archived if the
    /// transition created it. If another writer has moved the pair on since,
    /// that write stands and nothing is undone. No notification is sent.
    pub fn revert(&self, committed: CommittedTransition) -> Result<(), LinkError> {
        let stored = committed.link;
        let mut restored = match committed.previous {
            Some(previous) => previous,
            None => {
                let mut archived = stored.clone();
                archived.is_active = false;
                archived
            }
        };
        restored.version = stored.version;

        match self.store.upsert(&restored) {
            Ok(link) => {
                tracing::warn!(
                    link_id = %link.id,
                    from = %stored.status,
                    to = %link.status,
                    is_active = link.is_active,
                    "link transition reverted"
                );
                Ok(())
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::warn!(
                    link_id = %stored.id,
                    "pair changed after the transition, keeping the newer write"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn commit_request(
        &self,
        sponsor_id: &AccountId,
        member_code: &AccountCode,
    ) -> Result<CommittedTransition, LinkError> {
        let sponsor = self
            .directory
            .resolve_by_id(sponsor_id)
            .map_err(LinkError::from_sponsor_lookup)?;
        if &sponsor.code == member_code {
            return Err(LinkError::SelfLinkNotAllowed);
        }

        let member = self
            .directory
            .resolve_by_code(member_code)
            .map_err(LinkError::from_member_lookup)?;
        if &member.id == sponsor_id {
            return Err(LinkError::SelfLinkNotAllowed);
        }
        let missing = member.missing_contact_fields();
        if !missing.is_empty() {
            return Err(LinkError::IncompleteContactInfo {
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        let display_name = format!("{} — {}", sponsor.display_name, member.display_name);
        let policy = self.config.policy;

        self.commit_with_retry(sponsor_id, &member.id, None, |current, now| {
            let evidence = LinkTransitionEvidence::new(sponsor_id.clone(), "sponsor_requested");
            match current {
                None => Ok(FamilyLink::initiate(
                    sponsor_id.clone(),
                    member.id.clone(),
                    display_name.clone(),
                    evidence,
                    now,
                )),
                Some(mut link) => {
                    link.re_request(&policy, display_name.clone(), evidence, now)?;
                    Ok(link)
                }
            }
        })
    }

    fn commit_decision(
        &self,
        member_id: &AccountId,
        sponsor_id: &AccountId,
        approve: bool,
    ) -> Result<CommittedTransition, LinkError> {
        let notification = approve.then(|| PendingNotification {
            recipient: sponsor_id.clone(),
            topic: NotificationTopic::MemberAddition,
        });
        self.commit_with_retry(sponsor_id, member_id, notification, |current, now| {
            let mut link = current.ok_or_else(|| link_not_found(sponsor_id, member_id))?;
            if approve {
                let evidence = LinkTransitionEvidence::new(member_id.clone(), "member_approved");
                link.approve(evidence, now)?;
            } else {
                let evidence = LinkTransitionEvidence::new(member_id.clone(), "member_declined");
                link.decline(evidence, now)?;
            }
            Ok(link)
        })
    }

    fn commit_member_removal(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
        acting_account: &AccountId,
    ) -> Result<CommittedTransition, LinkError> {
        if acting_account == member_id {
            return Err(LinkError::ActiveSessionRemoval);
        }
        let notification = PendingNotification {
            recipient: member_id.clone(),
            topic: NotificationTopic::MemberDeletion,
        };
        self.commit_with_retry(sponsor_id, member_id, Some(notification), |current, now| {
            let mut link = current.ok_or_else(|| link_not_found(sponsor_id, member_id))?;
            let evidence = LinkTransitionEvidence::new(acting_account.clone(), "sponsor_removed_member");
            link.revoke(evidence, now)?;
            Ok(link)
        })
    }

    fn commit_sponsor_removal(
        &self,
        member_id: &AccountId,
        sponsor_id: &AccountId,
    ) -> Result<CommittedTransition, LinkError> {
        let notification = PendingNotification {
            recipient: sponsor_id.clone(),
            topic: NotificationTopic::SelfDeletion,
        };
        self.commit_with_retry(sponsor_id, member_id, Some(notification), |current, now| {
            let mut link = current.ok_or_else(|| link_not_found(sponsor_id, member_id))?;
            let evidence = LinkTransitionEvidence::new(member_id.clone(), "member_left");
            link.leave(evidence, now)?;
            Ok(link)
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Approved links where `sponsor_id` is the sponsor.
    pub fn list_members(&self, sponsor_id: &AccountId) -> Result<Vec<LinkView>, LinkError> {
        let links = self
            .store
            .list_by_sponsor(sponsor_id, StatusFilter::Only(LinkStatus::Approved))?;
        Ok(links
            .iter()
            .map(|link| self.view(link, Viewer::Sponsor))
            .collect())
    }

    /// Approved links where `member_id` is the member.
    pub fn list_sponsors(&self, member_id: &AccountId) -> Result<Vec<LinkView>, LinkError> {
        let links = self
            .store
            .list_by_member(member_id, StatusFilter::Only(LinkStatus::Approved))?;
        Ok(links
            .iter()
            .map(|link| self.view(link, Viewer::Member))
            .collect())
    }

    /// The sponsor's pending and failed requests, each with its resend
    /// eligibility.
    pub fn list_outgoing_non_approved(
        &self,
        sponsor_id: &AccountId,
    ) -> Result<Vec<LinkView>, LinkError> {
        let links = self
            .store
            .list_by_sponsor(sponsor_id, StatusFilter::NotApproved)?;
        let now = self.clock.now();
        Ok(links
            .iter()
            .map(|link| {
                self.view(link, Viewer::Sponsor)
                    .with_eligibility(link, &self.config.policy, now)
            })
            .collect())
    }

    /// Requests awaiting the member's decision.
    pub fn list_incoming_pending(&self, member_id: &AccountId) -> Result<Vec<LinkView>, LinkError> {
        let links = self
            .store
            .list_by_member(member_id, StatusFilter::Only(LinkStatus::Initiated))?;
        Ok(links
            .iter()
            .map(|link| self.view(link, Viewer::Member))
            .collect())
    }

    /// The active record for the pair.
    pub fn get_link(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
    ) -> Result<FamilyLink, LinkError> {
        self.store
            .find_by_pair(sponsor_id, member_id)?
            .ok_or_else(|| link_not_found(sponsor_id, member_id))
    }

    /// Whether the sponsor could re-request the member right now.
    pub fn check_eligibility(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
    ) -> Result<EligibilityReport, LinkError> {
        let link = self.get_link(sponsor_id, member_id)?;
        Ok(EligibilityReport::evaluate(
            &link,
            &self.config.policy,
            self.clock.now(),
        ))
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Run `decide` against the current record until a write wins or the
    /// retry budget is spent.
    fn commit_with_retry<F>(
        &self,
        sponsor_id: &AccountId,
        member_id: &AccountId,
        notification: Option<PendingNotification>,
        decide: F,
    ) -> Result<CommittedTransition, LinkError>
    where
        F: Fn(Option<FamilyLink>, Timestamp) -> Result<FamilyLink, LinkError>,
    {
        let attempts = self.config.max_conflict_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let current = self.store.find_by_pair(sponsor_id, member_id)?;
            let from = current.as_ref().map(|link| link.status);
            let next = decide(current.clone(), self.clock.now())?;

            match self.store.upsert(&next) {
                Ok(link) => {
                    tracing::info!(
                        link_id = %link.id,
                        sponsor_id = %link.sponsor_id,
                        member_id = %link.member_id,
                        from = from.map_or("ABSENT", |s| s.as_str()),
                        to = %link.status,
                        reject_count = link.reject_count,
                        "link transition committed"
                    );
                    metrics::counter!(TRANSITIONS_TOTAL, "to" => link.status.as_str()).increment(1);
                    return Ok(CommittedTransition {
                        link,
                        previous: current,
                        notification,
                    });
                }
                Err(StoreError::Conflict { .. }) => {
                    metrics::counter!(STORE_CONFLICTS_TOTAL).increment(1);
                    tracing::warn!(
                        sponsor_id = %sponsor_id,
                        member_id = %member_id,
                        attempt,
                        "concurrent write on link pair, re-reading"
                    );
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(LinkError::ConflictRetriesExhausted { attempts })
    }

    /// Log and count a failed operation, then hand the result back.
    fn observe<T>(&self, operation: &'static str, result: Result<T, LinkError>) -> Result<T, LinkError> {
        if let Err(err) = &result {
            if err.is_guard_refusal() {
                metrics::counter!(GUARD_REFUSALS_TOTAL, "kind" => err.kind()).increment(1);
                tracing::debug!(operation, kind = err.kind(), error = %err, "operation refused");
            } else {
                tracing::error!(operation, kind = err.kind(), error = %err, "operation failed");
            }
        }
        result
    }

    /// Best-effort notification after a durable transition.
    fn notify(&self, recipient: &AccountId, topic: NotificationTopic, link: &FamilyLink) {
        let notification = Notification::new(recipient.clone(), topic)
            .with_param("sponsor_name", self.account_name(&link.sponsor_id))
            .with_param("member_name", self.account_name(&link.member_id))
            .with_param("link_id", link.id.to_string());

        if let Err(err) = self.notifier.notify(&notification) {
            metrics::counter!(NOTIFY_FAILURES_TOTAL).increment(1);
            tracing::warn!(
                link_id = %link.id,
                recipient = %recipient,
                topic = %topic,
                error = %err,
                "notification failed; transition stays committed"
            );
        }
    }

    /// Display name from the directory, or the raw id if it cannot be resolved.
    fn account_name(&self, id: &AccountId) -> String {
        match self.directory.resolve_by_id(id) {
            Ok(summary) => summary.display_name,
            Err(err) => {
                tracing::warn!(account_id = %id, error = %err, "could not resolve account name");
                id.to_string()
            }
        }
    }

    fn view(&self, link: &FamilyLink, viewer: Viewer) -> LinkView {
        let counterpart = match viewer {
            Viewer::Sponsor => &link.member_id,
            Viewer::Member => &link.sponsor_id,
        };
        let name = match self.directory.resolve_by_id(counterpart) {
            Ok(summary) => summary.display_name,
            Err(err) => {
                tracing::warn!(
                    link_id = %link.id,
                    account_id = %counterpart,
                    error = %err,
                    "counterpart not resolvable, using stored display name"
                );
                link.display_name.clone()
            }
        };
        LinkView::new(link, viewer, name)
    }
}

fn link_not_found(sponsor_id: &AccountId, member_id: &AccountId) -> LinkError {
    LinkError::LinkNotFound {
        sponsor_id: sponsor_id.clone(),
        member_id: member_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use famlink_adapters::{AccountProfile, InMemoryDirectory, RecordingNotifier};
    use famlink_core::ManualClock;
    use famlink_store::InMemoryLinkStore;

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
            country_code: Some("+1".to_string()),
        }
    }

    /// Delegates to an in-memory store but fails the first `conflicts`
    /// upserts, optionally letting a competing write land first.
    struct ContendedStore {
        inner: InMemoryLinkStore,
        conflicts: AtomicU32,
        competitor: Option<FamilyLink>,
    }

    impl LinkStore for ContendedStore {
        fn find_by_pair(&self, s: &AccountId, m: &AccountId) -> Result<Option<FamilyLink>, StoreError> {
            self.inner.find_by_pair(s, m)
        }

        fn upsert(&self, link: &FamilyLink) -> Result<FamilyLink, StoreError> {
            let remaining = self.conflicts.load(Ordering::SeqCst);
            if remaining > 0 {
                self.conflicts.store(remaining - 1, Ordering::SeqCst);
                if let Some(competitor) = &self.competitor {
                    let _ = self.inner.upsert(competitor);
                }
                return Err(StoreError::Conflict {
                    sponsor_id: link.sponsor_id.clone(),
                    member_id: link.member_id.clone(),
                });
            }
            self.inner.upsert(link)
        }

        fn list_by_sponsor(&self, s: &AccountId, f: StatusFilter) -> Result<Vec<FamilyLink>, StoreError> {
            self.inner.list_by_sponsor(s, f)
        }

        fn list_by_member(&self, m: &AccountId, f: StatusFilter) -> Result<Vec<FamilyLink>, StoreError> {
            self.inner.list_by_member(m, f)
        }

        fn get(&self, id: famlink_core::LinkId) -> Result<Option<FamilyLink>, StoreError> {
            self.inner.get(id)
        }

        fn archive(&self, id: famlink_core::LinkId) -> Result<FamilyLink, StoreError> {
            self.inner.archive(id)
        }
    }

    struct Fixture {
        engine: LifecycleEngine,
        directory: InMemoryDirectory,
        notifier: RecordingNotifier,
    }

    fn fixture_with_store(store: Arc<dyn LinkStore>) -> Fixture {
        let directory = InMemoryDirectory::with_accounts([
            profile("sponsor", "S001", "Sam"),
            profile("member", "M001", "Max"),
        ])
        .unwrap();
        let notifier = RecordingNotifier::new();
        let clock = ManualClock::new(Timestamp::parse("2026-04-01T12:00:00Z").unwrap());
        let engine = LifecycleEngine::new(
            store,
            Arc::new(directory.clone()),
            Arc::new(notifier.clone()),
            Arc::new(clock),
            EngineConfig::default(),
        )
        .unwrap();
        Fixture {
            engine,
            directory,
            notifier,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_store(Arc::new(InMemoryLinkStore::new()))
    }

    #[test]
    fn zero_attempt_policy_is_refused_at_construction() {
        let config = EngineConfig::with_policy(LinkPolicy {
            max_reject_attempts: 0,
            ..LinkPolicy::default()
        });
        let result = LifecycleEngine::new(
            Arc::new(InMemoryLinkStore::new()),
            Arc::new(InMemoryDirectory::new()),
            Arc::new(RecordingNotifier::new()),
            Arc::new(famlink_core::SystemClock),
            config,
        );
        assert_eq!(result.unwrap_err(), PolicyError::ZeroAttempts);
    }

    #[test]
    fn request_sets_display_name_from_both_parties() {
        let fx = fixture();
        let link = fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        assert_eq!(link.display_name, "Sam — Max");
        assert_eq!(link.version, 1);
        assert_eq!(link.transitions[0].reason, "sponsor_requested");
    }

    #[test]
    fn unknown_sponsor_and_member_are_distinguished() {
        let fx = fixture();
        assert!(matches!(
            fx.engine.request_link(&acct("ghost"), &code("M001")),
            Err(LinkError::SponsorNotFound(_))
        ));
        assert!(matches!(
            fx.engine.request_link(&acct("sponsor"), &code("NOPE")),
            Err(LinkError::MemberNotFound(_))
        ));
    }

    #[test]
    fn incomplete_member_contact_is_refused() {
        let fx = fixture();
        let mut max = profile("member", "M001", "Max");
        max.email = None;
        fx.directory.insert(max).unwrap();
        let err = fx
            .engine
            .request_link(&acct("sponsor"), &code("M001"))
            .unwrap_err();
        assert_eq!(
            err,
            LinkError::IncompleteContactInfo {
                missing: vec!["email".to_string()]
            }
        );
    }

    #[test]
    fn member_code_resolving_to_sponsor_is_self_link() {
        let fx = fixture();
        // A second code pointing at the sponsor's own account.
        fx.directory.insert(profile("sponsor", "S002", "Sam")).unwrap();
        assert_eq!(
            fx.engine.request_link(&acct("sponsor"), &code("S002")),
            Err(LinkError::SelfLinkNotAllowed)
        );
    }

    #[test]
    fn directory_outage_surfaces_as_unavailable() {
        let fx = fixture();
        fx.directory.set_outage(true);
        assert!(matches!(
            fx.engine.request_link(&acct("sponsor"), &code("M001")),
            Err(LinkError::DirectoryUnavailable(_))
        ));
    }

    #[test]
    fn conflicts_are_retried_transparently() {
        let store = Arc::new(ContendedStore {
            inner: InMemoryLinkStore::new(),
            conflicts: AtomicU32::new(2),
            competitor: None,
        });
        let fx = fixture_with_store(store);
        let link = fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        assert_eq!(link.status, LinkStatus::Initiated);
    }

    #[test]
    fn conflicts_beyond_budget_exhaust() {
        let store = Arc::new(ContendedStore {
            inner: InMemoryLinkStore::new(),
            conflicts: AtomicU32::new(10),
            competitor: None,
        });
        let fx = fixture_with_store(store);
        assert_eq!(
            fx.engine.request_link(&acct("sponsor"), &code("M001")),
            Err(LinkError::ConflictRetriesExhausted { attempts: 4 })
        );
    }

    #[test]
    fn losing_writer_re_evaluates_against_the_winner() {
        let winner = FamilyLink::initiate(
            acct("sponsor"),
            acct("member"),
            "Sam — Max".to_string(),
            LinkTransitionEvidence::new(acct("sponsor"), "sponsor_requested"),
            Timestamp::parse("2026-04-01T11:00:00Z").unwrap(),
        );
        let store = Arc::new(ContendedStore {
            inner: InMemoryLinkStore::new(),
            conflicts: AtomicU32::new(1),
            competitor: Some(winner.clone()),
        });
        let fx = fixture_with_store(store);
        let err = fx
            .engine
            .request_link(&acct("sponsor"), &code("M001"))
            .unwrap_err();
        assert_eq!(
            err,
            LinkError::DuplicateRequest {
                requested_at: winner.created_date
            }
        );
    }

    #[test]
    fn hydrated_duplicates_are_refused_as_anomaly() {
        let store = InMemoryLinkStore::new();
        let make = || {
            FamilyLink::initiate(
                acct("sponsor"),
                acct("member"),
                "Sam — Max".to_string(),
                LinkTransitionEvidence::new(acct("sponsor"), "sponsor_requested"),
                Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
            )
        };
        store.hydrate([make(), make()]);
        let fx = fixture_with_store(Arc::new(store));
        assert!(matches!(
            fx.engine.decide(&acct("member"), &acct("sponsor"), true),
            Err(LinkError::MultipleActiveLinksAnomaly { count: 2, .. })
        ));
        assert!(fx.notifier.sent().is_empty());
    }

    #[test]
    fn notifier_failure_does_not_fail_the_transition() {
        let fx = fixture();
        fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        fx.notifier.set_failing(true);
        let link = fx
            .engine
            .decide(&acct("member"), &acct("sponsor"), true)
            .unwrap();
        assert_eq!(link.status, LinkStatus::Approved);
        assert_eq!(
            fx.engine.get_link(&acct("sponsor"), &acct("member")).unwrap().status,
            LinkStatus::Approved
        );
    }

    #[test]
    fn notification_carries_names_and_link_id() {
        let fx = fixture();
        fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        let link = fx
            .engine
            .decide(&acct("member"), &acct("sponsor"), true)
            .unwrap();
        let sent = fx.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, acct("sponsor"));
        assert_eq!(sent[0].param("sponsor_name"), Some("Sam"));
        assert_eq!(sent[0].param("member_name"), Some("Max"));
        assert_eq!(sent[0].param("link_id"), Some(link.id.to_string().as_str()));
    }

    fn approve_command() -> LinkCommand {
        LinkCommand::Decide {
            member_id: acct("member"),
            sponsor_id: acct("sponsor"),
            approve: true,
        }
    }

    #[test]
    fn commit_holds_back_the_notification_until_published() {
        let fx = fixture();
        fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();

        let committed = fx.engine.commit(&approve_command()).unwrap();
        assert_eq!(committed.link().status, LinkStatus::Approved);
        assert_eq!(committed.previous().map(|l| l.status), Some(LinkStatus::Initiated));
        assert_eq!(
            committed.notification(),
            Some(&PendingNotification {
                recipient: acct("sponsor"),
                topic: NotificationTopic::MemberAddition,
            })
        );
        assert!(fx.notifier.sent().is_empty());

        let link = fx.engine.publish(committed);
        assert_eq!(link.status, LinkStatus::Approved);
        assert_eq!(fx.notifier.sent_with_topic(NotificationTopic::MemberAddition).len(), 1);
    }

    #[test]
    fn revert_restores_the_previous_record_without_notifying() {
        let fx = fixture();
        fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();

        let committed = fx.engine.commit(&approve_command()).unwrap();
        fx.engine.revert(committed).unwrap();

        let link = fx.engine.get_link(&acct("sponsor"), &acct("member")).unwrap();
        assert_eq!(link.status, LinkStatus::Initiated);
        assert!(fx.notifier.sent().is_empty());
        // The pending request can still be decided.
        let link = fx.engine.decide(&acct("member"), &acct("sponsor"), true).unwrap();
        assert_eq!(link.status, LinkStatus::Approved);
    }

    #[test]
    fn reverting_a_first_request_archives_it() {
        let fx = fixture();
        let command = LinkCommand::Request {
            sponsor_id: acct("sponsor"),
            member_code: code("M001"),
        };
        let committed = fx.engine.commit(&command).unwrap();
        assert!(committed.previous().is_none());
        fx.engine.revert(committed).unwrap();

        assert!(matches!(
            fx.engine.get_link(&acct("sponsor"), &acct("member")),
            Err(LinkError::LinkNotFound { .. })
        ));
        let link = fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        assert_eq!(link.status, LinkStatus::Initiated);
    }

    #[test]
    fn revert_keeps_a_newer_write() {
        let fx = fixture();
        fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        let committed = fx.engine.commit(&approve_command()).unwrap();
        fx.engine
            .remove_sponsor(&acct("member"), &acct("sponsor"))
            .unwrap();

        fx.engine.revert(committed).unwrap();
        let link = fx.engine.get_link(&acct("sponsor"), &acct("member")).unwrap();
        assert_eq!(link.status, LinkStatus::Rejected);
    }

    #[test]
    fn remove_member_by_the_member_is_refused_before_store_access() {
        let fx = fixture();
        assert_eq!(
            fx.engine
                .remove_member(&acct("sponsor"), &acct("member"), &acct("member")),
            Err(LinkError::ActiveSessionRemoval)
        );
    }

    #[test]
    fn decide_on_missing_pair_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.engine.decide(&acct("member"), &acct("sponsor"), false),
            Err(LinkError::LinkNotFound { .. })
        ));
    }

    #[test]
    fn listing_falls_back_to_stored_display_name() {
        let fx = fixture();
        fx.engine.request_link(&acct("sponsor"), &code("M001")).unwrap();
        fx.directory.set_outage(true);
        let incoming = fx.engine.list_incoming_pending(&acct("member")).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].counterpart_name, "Sam — Max");
        assert_eq!(incoming[0].counterpart_id, acct("sponsor"));
    }
}
