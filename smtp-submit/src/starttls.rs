use crate::config::StartTlsMode;
use crate::request::Request;
use crate::response::Decoded;

/// Sits between the decoder and the conversation state machine. Watches
/// for the outbound `STARTTLS` command and the response that follows it,
/// and tells the connection driver what to do about the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartTlsFilter {
    Idle,
    AwaitingResponse(StartTlsMode),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTlsAction {
    /// Not our concern; forward the response to the state machine as-is.
    PassThrough,
    /// The server accepted `STARTTLS`: install the TLS wrapper and
    /// forward the (now irrelevant) response without advancing state
    /// further than the state machine's own `StartTlsSent` handling.
    InstallTls,
    /// The server rejected `STARTTLS` under `ifAvailable`: synthesize a
    /// success so the conversation continues in plaintext.
    ContinuePlaintext { synthesized: Decoded },
    /// The server rejected `STARTTLS` under `always`: fail the submission.
    PropagateFailure,
}

impl StartTlsFilter {
    #[must_use]
    pub const fn new() -> Self {
        Self::Idle
    }

    /// Call immediately before writing `request` to the wire.
    pub fn observe_outbound(&mut self, request: &Request, mode: StartTlsMode) {
        if matches!(request, Request::StartTls) {
            *self = Self::AwaitingResponse(mode);
        }
    }

    /// Call with the decoded response that follows an outbound command.
    #[must_use]
    pub fn observe_inbound(&mut self, decoded: &Decoded) -> StartTlsAction {
        let Self::AwaitingResponse(mode) = *self else {
            return StartTlsAction::PassThrough;
        };

        match decoded {
            Decoded::Success { .. } => {
                *self = Self::Done;
                StartTlsAction::InstallTls
            }
            Decoded::Failure { .. } if mode == StartTlsMode::IfAvailable => {
                *self = Self::Done;
                StartTlsAction::ContinuePlaintext {
                    synthesized: Decoded::Success {
                        code: 201,
                        tail: "STARTTLS is not supported".to_string(),
                    },
                }
            }
            Decoded::Failure { .. } => StartTlsAction::PropagateFailure,
            Decoded::Suppressed => StartTlsAction::PassThrough,
        }
    }
}

impl Default for StartTlsFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_triggers_tls_install() {
        let mut filter = StartTlsFilter::new();
        filter.observe_outbound(&Request::StartTls, StartTlsMode::Always);
        let action = filter.observe_inbound(&Decoded::Success { code: 220, tail: "Ready".into() });
        assert_eq!(action, StartTlsAction::InstallTls);
    }

    #[test]
    fn failure_under_always_propagates() {
        let mut filter = StartTlsFilter::new();
        filter.observe_outbound(&Request::StartTls, StartTlsMode::Always);
        let action = filter.observe_inbound(&Decoded::Failure { message: "454 unavailable".into() });
        assert_eq!(action, StartTlsAction::PropagateFailure);
    }

    #[test]
    fn failure_under_if_available_synthesizes_success() {
        let mut filter = StartTlsFilter::new();
        filter.observe_outbound(&Request::StartTls, StartTlsMode::IfAvailable);
        let action = filter.observe_inbound(&Decoded::Failure { message: "454 unavailable".into() });
        assert!(matches!(
            action,
            StartTlsAction::ContinuePlaintext { synthesized: Decoded::Success { code: 201, .. } }
        ));
    }

    #[test]
    fn unrelated_responses_pass_through() {
        let mut filter = StartTlsFilter::new();
        let action = filter.observe_inbound(&Decoded::Success { code: 250, tail: "OK".into() });
        assert_eq!(action, StartTlsAction::PassThrough);
    }
}
