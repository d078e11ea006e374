//! Pure relationship predicates shared by every store backend.
//!
//! The Postgres store expresses the same rules as SQL guards; the in-memory
//! store calls these directly while holding its lock.

use crate::domain::social_graph::FollowStatus;

pub struct BlockPolicy;

impl BlockPolicy {
    /// A block in either direction separates the pair.
    pub fn separates(a_blocks_b: bool, b_blocks_a: bool) -> bool {
        a_blocks_b || b_blocks_a
    }
}

pub struct FollowPolicy;

impl FollowPolicy {
    /// Status a brand-new follow edge starts in.
    pub fn initial_status(target_is_private: bool) -> FollowStatus {
        if target_is_private {
            FollowStatus::Pending
        } else {
            FollowStatus::Accepted
        }
    }

    /// Status after a follow request is issued again for an existing edge.
    /// Never moves an accepted edge back to pending.
    pub fn reissue(current: FollowStatus, target_is_private: bool) -> FollowStatus {
        match current {
            FollowStatus::Accepted => FollowStatus::Accepted,
            FollowStatus::Pending => Self::initial_status(target_is_private),
        }
    }

    /// Explicit acceptance only applies to a pending edge.
    pub fn accept(current: FollowStatus) -> Option<FollowStatus> {
        match current {
            FollowStatus::Pending => Some(FollowStatus::Accepted),
            FollowStatus::Accepted => None,
        }
    }

    /// Only an accepted edge opens a private account to its follower.
    pub fn grants_access(status: Option<FollowStatus>) -> bool {
        status == Some(FollowStatus::Accepted)
    }

    /// Whether a transition moved the edge into `accepted`, which is when the
    /// follower/following counters change.
    pub fn counts_transition(before: Option<FollowStatus>, after: FollowStatus) -> bool {
        after == FollowStatus::Accepted && before != Some(FollowStatus::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_symmetric() {
        assert!(BlockPolicy::separates(true, false));
        assert!(BlockPolicy::separates(false, true));
        assert!(!BlockPolicy::separates(false, false));
    }

    #[test]
    fn new_follow_status_tracks_privacy() {
        assert_eq!(FollowPolicy::initial_status(false), FollowStatus::Accepted);
        assert_eq!(FollowPolicy::initial_status(true), FollowStatus::Pending);
    }

    #[test]
    fn reissue_never_downgrades() {
        assert_eq!(
            FollowPolicy::reissue(FollowStatus::Accepted, true),
            FollowStatus::Accepted
        );
        assert_eq!(
            FollowPolicy::reissue(FollowStatus::Pending, true),
            FollowStatus::Pending
        );
        assert_eq!(
            FollowPolicy::reissue(FollowStatus::Pending, false),
            FollowStatus::Accepted
        );
    }

    #[test]
    fn accept_only_moves_pending() {
        assert_eq!(
            FollowPolicy::accept(FollowStatus::Pending),
            Some(FollowStatus::Accepted)
        );
        assert_eq!(FollowPolicy::accept(FollowStatus::Accepted), None);
    }

    #[test]
    fn counters_move_once_per_acceptance() {
        assert!(FollowPolicy::counts_transition(None, FollowStatus::Accepted));
        assert!(FollowPolicy::counts_transition(
            Some(FollowStatus::Pending),
            FollowStatus::Accepted
        ));
        assert!(!FollowPolicy::counts_transition(
            Some(FollowStatus::Accepted),
            FollowStatus::Accepted
        ));
        assert!(!FollowPolicy::counts_transition(None, FollowStatus::Pending));
    }
}
