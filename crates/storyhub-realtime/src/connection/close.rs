//! WebSocket close codes sent by the server.

/// Why the server closes (or refuses) a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// The session was finalized or ended by the host.
    SessionEnded,
    /// The server is shutting down.
    ServerShutdown,
    /// Unexpected server-side failure during admission.
    InternalError,
    /// Missing, invalid or expired credential.
    Unauthenticated,
    /// Per-session connection cap or participant limit reached.
    RoomFull,
    /// Lobby closed, session ended or expired.
    NotEligible,
    /// Unknown session id.
    SessionNotFound,
    /// Removed by the host.
    Kicked,
    /// The host's reconnection window elapsed.
    HostLeft,
    /// The outbound queue overflowed.
    SlowConsumer,
}

impl CloseReason {
    /// WebSocket close code.
    pub fn code(self) -> u16 {
        match self {
            Self::SessionEnded => 1000,
            Self::ServerShutdown => 1001,
            Self::InternalError => 1011,
            Self::Unauthenticated => 4001,
            Self::RoomFull => 4002,
            Self::NotEligible => 4003,
            Self::SessionNotFound => 4004,
            Self::Kicked => 4005,
            Self::HostLeft => 4006,
            Self::SlowConsumer => 4007,
        }
    }

    /// Close frame reason text.
    pub fn reason(self) -> &'static str {
        match self {
            Self::SessionEnded => "session_ended",
            Self::ServerShutdown => "server_shutdown",
            Self::InternalError => "internal_error",
            Self::Unauthenticated => "unauthenticated",
            Self::RoomFull => "room_full",
            Self::NotEligible => "not_eligible",
            Self::SessionNotFound => "session_not_found",
            Self::Kicked => "kicked",
            Self::HostLeft => "host_left",
            Self::SlowConsumer => "slow_consumer",
        }
    }

    /// Whether messages still queued should be flushed before the close frame.
    pub fn flushes_queue(self) -> bool {
        !matches!(self, Self::SlowConsumer)
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.reason(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusal_codes_are_distinct() {
        let refusals = [
            CloseReason::Unauthenticated,
            CloseReason::RoomFull,
            CloseReason::NotEligible,
            CloseReason::SessionNotFound,
            CloseReason::Kicked,
            CloseReason::HostLeft,
            CloseReason::SlowConsumer,
        ];
        let codes: Vec<u16> = refusals.iter().map(|r| r.code()).collect();
        assert_eq!(codes, vec![4001, 4002, 4003, 4004, 4005, 4006, 4007]);
    }

    #[test]
    fn test_slow_consumer_skips_flush() {
        assert!(!CloseReason::SlowConsumer.flushes_queue());
        assert!(CloseReason::HostLeft.flushes_queue());
    }
}
