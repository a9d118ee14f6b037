//! Reconnection guard: decides whether a connection attempt may join a session.
//!
//! Host absence is tracked with a timestamp on the session row rather than
//! a timer task. The grace window is evaluated here, lazily, on every
//! admission attempt.

use chrono::{DateTime, Duration, Utc};

use storyhub_core::types::id::UserId;
use storyhub_entity::participant::Participant;
use storyhub_entity::session::CollabSession;

use crate::connection::CloseReason;

/// Admission limits.
#[derive(Debug, Clone, Copy)]
pub struct GuardPolicy {
    /// How long an absent host may come back.
    pub host_grace: Duration,
    /// Concurrent connections per session, all processes included.
    pub max_connections: u32,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the caller in. `reconnecting` is set for an existing member.
    Admit { reconnecting: bool },
    /// Refuse with a close code; the session is left untouched.
    Refuse(CloseReason),
    /// The session outlived `expires_at`; end it and refuse.
    Expired,
    /// The host's grace window elapsed; tear the session down and refuse.
    TearDown,
}

/// Evaluates one admission attempt against the locked session state.
pub fn check(
    session: &CollabSession,
    participants: &[Participant],
    user: UserId,
    now: DateTime<Utc>,
    policy: &GuardPolicy,
) -> Verdict {
    if !session.is_active {
        return Verdict::Refuse(CloseReason::NotEligible);
    }
    if session.is_expired(now) {
        return Verdict::Expired;
    }

    let grace_elapsed = session.host_grace_elapsed(now, policy.host_grace);
    let existing = participants.iter().find(|p| p.user_id == user);

    let reconnecting = if session.is_host(user) {
        if grace_elapsed {
            return Verdict::TearDown;
        }
        true
    } else if let Some(member) = existing {
        if member.is_kicked() {
            return Verdict::Refuse(CloseReason::Kicked);
        }
        true
    } else {
        if grace_elapsed {
            return Verdict::TearDown;
        }
        if !session.is_lobby_open {
            return Verdict::Refuse(CloseReason::NotEligible);
        }
        if participants.len() >= session.max_participants as usize {
            return Verdict::Refuse(CloseReason::RoomFull);
        }
        false
    };

    if session.connection_count >= policy.max_connections {
        return Verdict::Refuse(CloseReason::RoomFull);
    }

    Verdict::Admit { reconnecting }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyhub_entity::participant::ParticipantRole;
    use storyhub_entity::session::{NewSession, StoryDraft};

    fn policy() -> GuardPolicy {
        GuardPolicy {
            host_grace: Duration::minutes(5),
            max_connections: 3,
        }
    }

    fn setup() -> (CollabSession, Vec<Participant>, DateTime<Utc>) {
        let now = Utc::now();
        let host = UserId::new();
        let session = CollabSession::open(
            &NewSession {
                host_id: host,
                host_username: "host".into(),
                draft: StoryDraft::default(),
                max_participants: 3,
                lifetime: Duration::hours(24),
            },
            "ABCDE".into(),
            now,
        );
        let host_row = Participant::new(
            session.id,
            host,
            "host",
            ParticipantRole::Host,
            "#FF6B6B",
            now,
        );
        (session, vec![host_row], now)
    }

    fn member(session: &CollabSession, now: DateTime<Utc>) -> Participant {
        Participant::new(
            session.id,
            UserId::new(),
            "member",
            ParticipantRole::Participant,
            "#4ECDC4",
            now,
        )
    }

    #[test]
    fn test_open_lobby_admits_newcomer() {
        let (session, people, now) = setup();
        assert_eq!(
            check(&session, &people, UserId::new(), now, &policy()),
            Verdict::Admit {
                reconnecting: false
            }
        );
    }

    #[test]
    fn test_closed_lobby_refuses_newcomer_but_not_member() {
        let (mut session, mut people, now) = setup();
        session.is_lobby_open = false;
        let m = member(&session, now);
        let m_id = m.user_id;
        people.push(m);

        assert_eq!(
            check(&session, &people, UserId::new(), now, &policy()),
            Verdict::Refuse(CloseReason::NotEligible)
        );
        assert_eq!(
            check(&session, &people, m_id, now, &policy()),
            Verdict::Admit { reconnecting: true }
        );
    }

    #[test]
    fn test_host_within_grace_is_admitted() {
        let (mut session, people, now) = setup();
        session.is_lobby_open = false;
        session.host_disconnected_at = Some(now - Duration::minutes(4));
        assert_eq!(
            check(&session, &people, session.host_id, now, &policy()),
            Verdict::Admit { reconnecting: true }
        );
    }

    #[test]
    fn test_host_after_grace_tears_down() {
        let (mut session, people, now) = setup();
        session.host_disconnected_at = Some(now - Duration::minutes(6));
        assert_eq!(
            check(&session, &people, session.host_id, now, &policy()),
            Verdict::TearDown
        );
        assert_eq!(
            check(&session, &people, UserId::new(), now, &policy()),
            Verdict::TearDown
        );
    }

    #[test]
    fn test_existing_member_survives_elapsed_grace() {
        let (mut session, mut people, now) = setup();
        session.host_disconnected_at = Some(now - Duration::minutes(30));
        let m = member(&session, now);
        let m_id = m.user_id;
        people.push(m);
        assert_eq!(
            check(&session, &people, m_id, now, &policy()),
            Verdict::Admit { reconnecting: true }
        );
    }

    #[test]
    fn test_connection_cap_is_room_full() {
        let (mut session, people, now) = setup();
        session.connection_count = 3;
        assert_eq!(
            check(&session, &people, session.host_id, now, &policy()),
            Verdict::Refuse(CloseReason::RoomFull)
        );
    }

    #[test]
    fn test_participant_cap_is_room_full_for_newcomers() {
        let (session, mut people, now) = setup();
        people.push(member(&session, now));
        people.push(member(&session, now));
        assert_eq!(
            check(&session, &people, UserId::new(), now, &policy()),
            Verdict::Refuse(CloseReason::RoomFull)
        );
    }

    #[test]
    fn test_kicked_member_is_refused() {
        let (session, mut people, now) = setup();
        let mut m = member(&session, now);
        m.kicked_at = Some(now);
        let m_id = m.user_id;
        people.push(m);
        assert_eq!(
            check(&session, &people, m_id, now, &policy()),
            Verdict::Refuse(CloseReason::Kicked)
        );
    }

    #[test]
    fn test_inactive_and_expired_sessions() {
        let (mut session, people, now) = setup();
        session.expires_at = now - Duration::seconds(1);
        assert_eq!(
            check(&session, &people, session.host_id, now, &policy()),
            Verdict::Expired
        );

        session.deactivate();
        assert_eq!(
            check(&session, &people, session.host_id, now, &policy()),
            Verdict::Refuse(CloseReason::NotEligible)
        );
    }
}
