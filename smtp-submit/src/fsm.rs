use chrono::{DateTime, FixedOffset};
use smtp_submit_common::FiniteStateMachine;

use crate::config::{Encryption, FeatureFlags};
use crate::email::Email;
use crate::request::Request;

/// Conversation state. Advances only on a successfully decoded terminal
/// response; a failed response is handled by the driving loop, which
/// never calls [`transition`](FiniteStateMachine::transition) in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Idle { sent: bool },
    HelloSent { after_start_tls: bool },
    StartTlsSent,
    AuthBegan,
    UsernameSent,
    PasswordSent,
    MailFromSent,
    RecipientSent { next_index: usize },
    DataCommandSent,
    MailDataSent,
    QuitSent,
}

impl State {
    #[must_use]
    pub const fn new() -> Self {
        Self::Idle { sent: false }
    }

    /// `LeftOverBytes`/`UncleanShutdown` are expected noise once the
    /// conversation has asked to quit or has finished.
    #[must_use]
    pub fn tolerates_shutdown_noise(&self) -> bool {
        matches!(self, Self::QuitSent | Self::Idle { sent: true })
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Idle { sent: true })
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable scratch space the state machine writes the next outbound
/// [`Request`] into, and reads fixed submission data from.
pub struct Context {
    pub server_name: String,
    pub use_esmtp: bool,
    pub encryption: Encryption,
    pub credentials: Option<(String, String)>,
    pub feature_flags: FeatureFlags,
    pub recipients: Vec<String>,
    pub email: Email,
    pub date: DateTime<FixedOffset>,
    pub next_request: Option<Request>,
}

impl FiniteStateMachine for State {
    type Input = ();
    type Context = Context;

    fn transition(self, (): Self::Input, context: &mut Self::Context) -> Self {
        match self {
            Self::Idle { sent: false } => {
                context.next_request = Some(Request::SayHello {
                    server_name: context.server_name.clone(),
                    use_ehlo: context.use_esmtp,
                });
                Self::HelloSent { after_start_tls: false }
            }

            Self::HelloSent { after_start_tls: false } if context.encryption.start_tls_mode().is_some() => {
                context.next_request = Some(Request::StartTls);
                Self::StartTlsSent
            }

            Self::HelloSent { .. } if context.credentials.is_some() => {
                context.next_request = Some(Request::BeginAuth);
                Self::AuthBegan
            }

            Self::HelloSent { .. } => {
                context.next_request = Some(Request::MailFrom(context.email.sender.email_address.clone()));
                Self::MailFromSent
            }

            Self::StartTlsSent => {
                context.next_request = Some(Request::SayHello {
                    server_name: context.server_name.clone(),
                    use_ehlo: context.use_esmtp,
                });
                Self::HelloSent { after_start_tls: true }
            }

            Self::AuthBegan => {
                let username = context.credentials.as_ref().map_or_else(String::new, |c| c.0.clone());
                context.next_request = Some(Request::AuthUser(username));
                Self::UsernameSent
            }

            Self::UsernameSent => {
                let password = context.credentials.as_ref().map_or_else(String::new, |c| c.1.clone());
                context.next_request = Some(Request::AuthPassword(password));
                Self::PasswordSent
            }

            Self::PasswordSent => {
                context.next_request = Some(Request::MailFrom(context.email.sender.email_address.clone()));
                Self::MailFromSent
            }

            Self::MailFromSent => {
                let addr = context.recipients[0].clone();
                context.next_request = Some(Request::Recipient(addr));
                Self::RecipientSent { next_index: 1 }
            }

            Self::RecipientSent { next_index } if next_index < context.recipients.len() => {
                let addr = context.recipients[next_index].clone();
                context.next_request = Some(Request::Recipient(addr));
                Self::RecipientSent { next_index: next_index + 1 }
            }

            Self::RecipientSent { .. } => {
                context.next_request = Some(Request::Data);
                Self::DataCommandSent
            }

            Self::DataCommandSent => {
                context.next_request = Some(Request::TransferData {
                    date: context.date,
                    email: context.email.clone(),
                    flags: context.feature_flags,
                });
                Self::MailDataSent
            }

            Self::MailDataSent => {
                context.next_request = Some(Request::Quit);
                Self::QuitSent
            }

            Self::QuitSent => {
                context.next_request = None;
                Self::Idle { sent: true }
            }

            done @ Self::Idle { sent: true } => {
                context.next_request = None;
                done
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartTlsMode;
    use crate::email::{Body, Contact, EmailBuilder};
    use chrono::TimeZone;

    fn context(encryption: Encryption, credentials: Option<(String, String)>) -> Context {
        let sender = Contact::new("s@e.com").unwrap();
        let email = EmailBuilder::new(sender, "hi", Body::Plain("hi".into()))
            .to(Contact::new("r1@e.com").unwrap())
            .to(Contact::new("r2@e.com").unwrap())
            .build()
            .unwrap();
        Context {
            server_name: "localhost".to_string(),
            use_esmtp: true,
            encryption,
            credentials,
            feature_flags: FeatureFlags::default(),
            recipients: email.all_recipients().map(|c| c.email_address.clone()).collect(),
            email,
            date: FixedOffset::east_opt(0).unwrap().timestamp_opt(0, 0).unwrap(),
            next_request: None,
        }
    }

    #[test]
    fn ehlo_transition_sends_hello() {
        let mut ctx = context(Encryption::Plain, None);
        let state = State::new().transition((), &mut ctx);
        assert_eq!(state, State::HelloSent { after_start_tls: false });
        assert!(matches!(ctx.next_request, Some(Request::SayHello { use_ehlo: true, .. })));
    }

    #[test]
    fn plain_no_auth_goes_straight_to_mail_from() {
        let mut ctx = context(Encryption::Plain, None);
        let state = State::HelloSent { after_start_tls: false }.transition((), &mut ctx);
        assert_eq!(state, State::MailFromSent);
    }

    #[test]
    fn start_tls_is_negotiated_before_auth() {
        let mut ctx = context(
            Encryption::StartTls(StartTlsMode::Always),
            Some(("user".into(), "pass".into())),
        );
        let state = State::HelloSent { after_start_tls: false }.transition((), &mut ctx);
        assert_eq!(state, State::StartTlsSent);
        let state = state.transition((), &mut ctx);
        assert_eq!(state, State::HelloSent { after_start_tls: true });
        let state = state.transition((), &mut ctx);
        assert_eq!(state, State::AuthBegan);
    }

    #[test]
    fn auth_sequence_sends_user_then_password() {
        let mut ctx = context(Encryption::Plain, Some(("user".into(), "pass".into())));
        let state = State::AuthBegan.transition((), &mut ctx);
        assert_eq!(state, State::UsernameSent);
        assert!(matches!(ctx.next_request, Some(Request::AuthUser(ref u)) if u == "user"));
        let state = state.transition((), &mut ctx);
        assert_eq!(state, State::PasswordSent);
        assert!(matches!(ctx.next_request, Some(Request::AuthPassword(ref p)) if p == "pass"));
    }

    #[test]
    fn recipients_are_sent_in_order_then_data() {
        let mut ctx = context(Encryption::Plain, None);
        let state = State::MailFromSent.transition((), &mut ctx);
        assert_eq!(state, State::RecipientSent { next_index: 1 });
        let state = state.transition((), &mut ctx);
        assert_eq!(state, State::DataCommandSent);
        assert!(matches!(ctx.next_request, Some(Request::Data)));
    }

    #[test]
    fn quit_reaches_terminal_idle_state() {
        let mut ctx = context(Encryption::Plain, None);
        let state = State::QuitSent.transition((), &mut ctx);
        assert!(state.is_done());
        assert!(state.tolerates_shutdown_noise());
    }

    #[test]
    fn terminal_state_is_stable() {
        let mut ctx = context(Encryption::Plain, None);
        let state = State::Idle { sent: true }.transition((), &mut ctx);
        assert_eq!(state, State::Idle { sent: true });
    }
}
