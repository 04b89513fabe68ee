//! Integration tests for the POP3 session engine.
//!
//! These tests use a mock stream that replays scripted server
//! responses, one line per read, without a real server connection.
//! Writes are captured so tests can assert exactly what went on the
//! wire (and what did not).

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use maildrop_pop3::{
    AuthMechanism, Credential, Error, MechanismRegistry, PopConnection, PopSession, Result,
    Security, SessionProfile, SessionState, StreamUpgrade, negotiate,
};

/// Mock stream that returns one scripted response line per read.
///
/// Returning a single line per read keeps the connection's buffered
/// reader empty at every protocol synchronization point, which is what
/// a real socket looks like between exchanges (and what STLS relies
/// on).
struct MockStream {
    responses: Vec<Vec<u8>>,
    position: usize,
    sent: Arc<Mutex<Vec<u8>>>,
    /// When `true`, reads past the script hang instead of reporting
    /// EOF, to exercise deadlines.
    pending_on_exhaust: bool,
}

type SentLog = Arc<Mutex<Vec<u8>>>;

fn mock(lines: &[&str]) -> (MockStream, SentLog) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let stream = MockStream {
        responses: lines
            .iter()
            .map(|line| format!("{line}\r\n").into_bytes())
            .collect(),
        position: 0,
        sent: Arc::clone(&sent),
        pending_on_exhaust: false,
    };
    (stream, sent)
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.position >= self.responses.len() {
            if self.pending_on_exhaust {
                // No waker is stored; only a timer can end the wait.
                return Poll::Pending;
            }
            return Poll::Ready(Ok(()));
        }

        let line = self.responses[self.position].clone();
        assert!(buf.remaining() >= line.len(), "scripted line too long");
        buf.put_slice(&line);
        self.position += 1;

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl StreamUpgrade for MockStream {
    async fn upgrade(self, _host: &str) -> Result<Self> {
        Ok(self)
    }
}

fn connection(stream: MockStream) -> PopConnection<MockStream> {
    PopConnection::from_stream(stream, "pop.example.net", 110, false, Duration::from_secs(60))
}

async fn session_with(lines: &[&str]) -> (PopSession<MockStream>, SentLog) {
    let (stream, sent) = mock(lines);
    let session = PopSession::start(connection(stream), None).await.unwrap();
    (session, sent)
}

fn sent_text(sent: &SentLog) -> String {
    String::from_utf8(sent.lock().unwrap().clone()).unwrap()
}

const GREETING: &str = "+OK POP3 server ready <1896.697170952@dbc.mtview.ca.us>";

#[tokio::test]
async fn greeting_enters_authorization_and_captures_timestamp() {
    let (session, sent) = session_with(&[GREETING]).await;

    assert_eq!(session.state(), SessionState::Authorization);
    assert_eq!(
        session.timestamp(),
        Some("<1896.697170952@dbc.mtview.ca.us>")
    );
    assert_eq!(session.authority().to_string(), "pop://pop.example.net");
    // The greeting is read, never answered.
    assert!(sent_text(&sent).is_empty());
}

#[tokio::test]
async fn rejected_greeting_is_a_connection_error() {
    let (stream, _sent) = mock(&["-ERR maildrop busy"]);

    let result = PopSession::start(connection(stream), None).await;
    assert!(matches!(result, Err(Error::ConnectionFailed(_))));
}

#[tokio::test]
async fn apop_uses_rfc1939_digest() {
    let (mut session, sent) = session_with(&[GREETING, "+OK maildrop locked and ready"]).await;

    let result = session.apop("mrose", "tanstaaf").await.unwrap();

    assert!(result.succeeded());
    assert_eq!(session.state(), SessionState::Transaction);
    assert_eq!(
        session.authority().to_string(),
        "pop://mrose;AUTH=+APOP@pop.example.net"
    );
    // The worked example from RFC 1939 §7.
    assert!(
        sent_text(&sent).contains("APOP mrose c4c9334bac560ecc979e58001b3e22fb\r\n")
    );
}

#[tokio::test]
async fn apop_without_timestamp_fails_before_any_io() {
    let (mut session, sent) = session_with(&["+OK POP3 server ready"]).await;

    let result = session.apop("mrose", "tanstaaf").await;

    assert!(matches!(result, Err(Error::Incapable(_))));
    assert!(sent_text(&sent).is_empty());
    assert_eq!(session.state(), SessionState::Authorization);
}

#[tokio::test]
async fn user_pass_login_enters_transaction_state() {
    let (mut session, sent) =
        session_with(&[GREETING, "+OK send PASS", "+OK maildrop locked"]).await;

    let result = session.login("mrose", "secret").await.unwrap();

    assert!(result.succeeded());
    assert_eq!(session.state(), SessionState::Transaction);
    assert_eq!(session.authority().username.as_deref(), Some("mrose"));
    assert_eq!(session.authority().mechanism, Some(AuthMechanism::Login));
    assert!(sent_text(&sent).contains("USER mrose\r\nPASS secret\r\n"));
}

#[tokio::test]
async fn pass_before_user_is_a_contract_error() {
    let (mut session, sent) = session_with(&[GREETING]).await;

    let result = session.pass("secret").await;

    assert!(matches!(result, Err(Error::InvalidState(_))));
    assert!(sent_text(&sent).is_empty());
}

#[tokio::test]
async fn rejected_user_short_circuits_login() {
    let (mut session, sent) = session_with(&[GREETING, "-ERR never heard of you"]).await;

    let result = session.login("nobody", "secret").await.unwrap();

    assert!(result.failed());
    assert_eq!(session.state(), SessionState::Authorization);
    assert!(!sent_text(&sent).contains("PASS"));
}

#[tokio::test]
async fn maildrop_commands_require_transaction_state() {
    let (mut session, sent) = session_with(&[GREETING]).await;

    assert!(matches!(session.stat().await, Err(Error::InvalidState(_))));
    assert!(matches!(session.dele(1).await, Err(Error::InvalidState(_))));
    assert!(sent_text(&sent).is_empty());
}

#[tokio::test]
async fn zero_message_number_is_rejected_before_io() {
    let (mut session, sent) =
        session_with(&[GREETING, "+OK", "+OK logged in"]).await;
    session.login("mrose", "secret").await.unwrap();
    let sent_before = sent_text(&sent);

    assert!(matches!(
        session.retr(0).await,
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(sent_text(&sent), sent_before);
}

#[tokio::test]
async fn stat_returns_drop_listing() {
    let (mut session, _sent) =
        session_with(&[GREETING, "+OK", "+OK logged in", "+OK 2 320"]).await;
    session.login("mrose", "secret").await.unwrap();

    let (result, listing) = session.stat().await.unwrap();
    let listing = listing.unwrap();

    assert!(result.succeeded());
    assert_eq!(listing.count, 2);
    assert_eq!(listing.octets, 320);
}

#[tokio::test]
async fn negative_reply_is_data_not_error() {
    let (mut session, _sent) = session_with(&[
        GREETING,
        "+OK",
        "+OK logged in",
        "-ERR no such message",
        "+OK",
    ])
    .await;
    session.login("mrose", "secret").await.unwrap();

    let result = session.dele(9).await.unwrap();
    assert!(result.failed());
    assert_eq!(result.text(), "no such message");

    // The connection stays usable.
    assert_eq!(session.state(), SessionState::Transaction);
    assert!(session.noop().await.unwrap().succeeded());
}

#[tokio::test]
async fn retr_returns_unstuffed_body() {
    let (mut session, _sent) = session_with(&[
        GREETING,
        "+OK",
        "+OK logged in",
        "+OK 54 octets",
        "From: tim@example.net",
        "",
        "..starts with a dot",
        ".",
    ])
    .await;
    session.login("mrose", "secret").await.unwrap();

    let (result, body) = session.retr(1).await.unwrap();
    let body = body.unwrap();

    assert!(result.succeeded());
    assert_eq!(
        body.as_bytes(),
        b"From: tim@example.net\r\n\r\n.starts with a dot\r\n"
    );
}

#[tokio::test]
async fn list_and_uidl_parse_listings() {
    let (mut session, _sent) = session_with(&[
        GREETING,
        "+OK",
        "+OK logged in",
        "+OK 2 messages (320 octets)",
        "1 120",
        "2 200",
        ".",
        "+OK",
        "1 whqtswO00WBw418f9t5JxYwZ",
        "2 QhdPYR:00WBw1Ph7x7",
        ".",
        "+OK 2 200",
    ])
    .await;
    session.login("mrose", "secret").await.unwrap();

    let (_, listings) = session.list().await.unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[1].number, 2);
    assert_eq!(listings[1].octets, 200);

    let (_, ids) = session.uidl().await.unwrap();
    assert_eq!(ids[0].id, "whqtswO00WBw418f9t5JxYwZ");

    let (_, one) = session.list_message(2).await.unwrap();
    assert_eq!(one.unwrap().octets, 200);
}

#[tokio::test]
async fn capa_replaces_snapshot_wholesale() {
    let (mut session, _sent) = session_with(&[
        GREETING,
        "+OK capability list follows",
        "TOP",
        "SASL PLAIN LOGIN",
        "STLS",
        ".",
        "-ERR not today",
    ])
    .await;

    let result = session.capa().await.unwrap();
    assert!(result.succeeded());
    assert!(session.capabilities().supports("STLS"));
    assert!(session.capabilities().supports_sasl("PLAIN"));

    // A rejected CAPA empties the snapshot instead of keeping stale
    // capabilities around.
    let result = session.capa().await.unwrap();
    assert!(result.failed());
    assert!(session.capabilities().is_empty());
}

#[tokio::test]
async fn stls_discards_capabilities_and_secures_connection() {
    let (mut session, sent) = session_with(&[
        GREETING,
        "+OK capability list follows",
        "STLS",
        "SASL PLAIN",
        ".",
        "+OK begin TLS negotiation",
    ])
    .await;

    session.capa().await.unwrap();
    assert!(!session.is_secure());

    let result = session.stls().await.unwrap();

    assert!(result.succeeded());
    assert!(session.is_secure());
    assert_eq!(session.state(), SessionState::Authorization);
    // Plaintext capabilities no longer apply after the handshake.
    assert!(session.capabilities().is_empty());
    assert!(sent_text(&sent).contains("STLS\r\n"));
}

#[tokio::test]
async fn refused_stls_leaves_plaintext_connection_usable() {
    let (mut session, _sent) = session_with(&[GREETING, "-ERR TLS unavailable", "+OK"]).await;

    let result = session.stls().await.unwrap();

    assert!(result.failed());
    assert!(!session.is_secure());
    assert!(session.user("mrose").await.unwrap().succeeded());
}

#[tokio::test]
async fn auth_plain_sends_initial_response() {
    let (mut session, sent) = session_with(&[GREETING, "+OK maildrop locked"]).await;

    let registry = MechanismRegistry::builtin();
    let mechanism = registry
        .create("PLAIN", Credential::new("tim", "tanstaaftanstaaf"))
        .unwrap();

    let result = session.auth(mechanism).await.unwrap();

    assert!(result.succeeded());
    // The PLAIN example from RFC 2595 §6.
    assert!(sent_text(&sent).contains("AUTH PLAIN AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n"));
    assert_eq!(session.authority().username.as_deref(), Some("tim"));
    assert_eq!(session.authority().mechanism, Some(AuthMechanism::Plain));
}

#[tokio::test]
async fn auth_login_drives_challenge_loop() {
    let (mut session, sent) = session_with(&[
        GREETING,
        "+ VXNlcm5hbWU6",
        "+ UGFzc3dvcmQ6",
        "+OK maildrop locked",
    ])
    .await;

    let registry = MechanismRegistry::builtin();
    let mechanism = registry
        .create("LOGIN", Credential::new("tim", "secret"))
        .unwrap();

    let result = session.auth(mechanism).await.unwrap();

    assert!(result.succeeded());
    let wire = sent_text(&sent);
    assert!(wire.contains("AUTH LOGIN\r\n"));
    assert!(wire.contains("dGlt\r\n"));
    assert!(wire.contains("c2VjcmV0\r\n"));
}

#[tokio::test]
async fn failed_auth_leaves_authorization_state() {
    let (mut session, _sent) =
        session_with(&[GREETING, "-ERR [AUTH] invalid credentials"]).await;

    let registry = MechanismRegistry::builtin();
    let mechanism = registry
        .create("PLAIN", Credential::new("tim", "wrong"))
        .unwrap();

    let result = session.auth(mechanism).await.unwrap();

    assert!(result.failed());
    assert_eq!(session.state(), SessionState::Authorization);
    assert_eq!(session.authority().username, None);
}

#[tokio::test]
async fn authenticate_by_name_resolves_credential() {
    let (mut session, sent) = session_with(&[GREETING, "+OK maildrop locked"]).await;

    let credential = Credential::new("mrose", "tanstaaf");
    let registry = MechanismRegistry::builtin();

    assert!(session.apop_available());
    let result = session
        .authenticate(&AuthMechanism::Apop, &credential, &registry)
        .await
        .unwrap();

    assert!(result.succeeded());
    assert!(sent_text(&sent).contains("APOP mrose "));
}

#[tokio::test]
async fn authenticate_without_credential_is_a_request_failure() {
    let (mut session, sent) = session_with(&[GREETING]).await;

    let registry = MechanismRegistry::builtin();

    struct Nothing;
    impl maildrop_pop3::CredentialSource for Nothing {
        fn lookup(
            &self,
            _host: &str,
            _port: u16,
            _username: Option<&str>,
            _mechanism: Option<&AuthMechanism>,
        ) -> Option<Credential> {
            None
        }
    }

    let result = session
        .authenticate(&AuthMechanism::Plain, &Nothing, &registry)
        .await
        .unwrap();

    assert!(result.failed());
    assert_eq!(session.state(), SessionState::Authorization);
    assert!(sent_text(&sent).is_empty());
}

#[tokio::test]
async fn quit_closes_and_is_idempotent() {
    let (mut session, sent) =
        session_with(&[GREETING, "+OK", "+OK logged in", "+OK bye"]).await;
    session.login("mrose", "secret").await.unwrap();

    let result = session.quit().await.unwrap();
    assert!(result.succeeded());
    assert_eq!(session.state(), SessionState::NotConnected);

    // A second QUIT succeeds without touching the wire.
    let wire_before = sent_text(&sent);
    let result = session.quit().await.unwrap();
    assert!(result.succeeded());
    assert_eq!(result.text(), "already logged out");
    assert_eq!(sent_text(&sent), wire_before);
}

#[tokio::test]
async fn disposed_session_rejects_everything() {
    let (mut session, _sent) = session_with(&[GREETING, "+OK bye"]).await;

    session.disconnect(true).await;

    assert!(matches!(session.capa().await, Err(Error::Disposed)));
    assert!(matches!(session.quit().await, Err(Error::Disposed)));
    // disconnect itself stays idempotent
    session.disconnect(true).await;
}

#[tokio::test(start_paused = true)]
async fn transaction_deadline_abandons_worker_and_tears_down() {
    let (mut stream, _sent) = mock(&[GREETING, "+OK", "+OK logged in"]);
    stream.pending_on_exhaust = true;

    let mut session = PopSession::start(connection(stream), None).await.unwrap();
    session.login("mrose", "secret").await.unwrap();

    session.set_transaction_timeout(Some(Duration::from_secs(5)));

    let result = session.noop().await;
    assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_secs(5)));

    // The session is torn down; the worker was abandoned, not joined.
    assert_eq!(session.state(), SessionState::NotConnected);
    assert!(matches!(session.stat().await, Err(Error::InvalidState(_))));
    assert!(session.quit().await.unwrap().succeeded());
}

#[tokio::test]
async fn eof_mid_exchange_escalates_and_tears_down() {
    let (mut session, _sent) = session_with(&[GREETING, "+OK", "+OK logged in"]).await;
    session.login("mrose", "secret").await.unwrap();

    // The script is exhausted: the next read sees EOF.
    let result = session.noop().await;

    assert!(matches!(result, Err(Error::Io(_))));
    assert_eq!(session.state(), SessionState::NotConnected);
}

mod negotiation {
    use super::*;

    fn profile(username: Option<&str>) -> SessionProfile {
        let mut profile = SessionProfile::new("pop.example.net");
        profile.security = Security::None;
        profile.username = username.map(str::to_string);
        profile
    }

    #[tokio::test]
    async fn selects_advertised_sasl_mechanism() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            "USER",
            "SASL PLAIN",
            ".",
            "+OK maildrop locked",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("tim"));
        profile.allow_insecure_login = true;
        let credential = Credential::new("tim", "tanstaaftanstaaf");
        let registry = MechanismRegistry::builtin();

        negotiate(&mut session, &profile, &credential, &registry)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Transaction);
        assert!(sent_text(&sent).contains("AUTH PLAIN AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n"));
    }

    #[tokio::test]
    async fn refuses_plaintext_on_insecure_connection() {
        // A greeting without a timestamp, so APOP is not a candidate
        // either; with allow_insecure_login unset nothing remains.
        let (stream, sent) = mock(&[
            "+OK POP3 server ready",
            "+OK capability list follows",
            "USER",
            "SASL PLAIN",
            ".",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let credential = Credential::new("tim", "tanstaaftanstaaf");
        let registry = MechanismRegistry::builtin();

        let result = negotiate(&mut session, &profile(Some("tim")), &credential, &registry).await;

        assert!(matches!(result, Err(Error::Auth(_))));
        let wire = sent_text(&sent);
        assert!(!wire.contains("AUTH"));
        assert!(!wire.contains("USER tim"));
        assert!(!wire.contains("PASS"));
    }

    #[tokio::test]
    async fn falls_back_to_apop_when_no_sasl_fits() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            "TOP",
            ".",
            "+OK maildrop locked",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("tim"));
        profile.allow_insecure_login = true;
        let credential = Credential::new("tim", "tanstaaf");
        let registry = MechanismRegistry::builtin();

        negotiate(&mut session, &profile, &credential, &registry)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Transaction);
        assert!(sent_text(&sent).contains("APOP tim "));
        assert_eq!(session.authority().mechanism, Some(AuthMechanism::Apop));
    }

    #[tokio::test]
    async fn apop_fallback_requires_insecure_login_permission() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            "TOP",
            ".",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let credential = Credential::new("tim", "tanstaaf");
        let registry = MechanismRegistry::builtin();

        let result = negotiate(&mut session, &profile(Some("tim")), &credential, &registry).await;

        assert!(matches!(result, Err(Error::Auth(_))));
        let wire = sent_text(&sent);
        assert!(!wire.contains("APOP"));
        assert!(!wire.contains("USER"));
    }

    #[tokio::test]
    async fn automatic_selection_never_uses_anonymous() {
        // ANONYMOUS is advertised first; picking it would send the
        // password as the anonymous trace identity.
        let (stream, sent) = mock(&[
            "+OK POP3 server ready",
            "+OK capability list follows",
            "SASL ANONYMOUS",
            ".",
            "+OK send PASS",
            "+OK maildrop locked",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("tim"));
        profile.allow_insecure_login = true;
        let credential = Credential::new("tim", "hunter2");
        let registry = MechanismRegistry::builtin();

        negotiate(&mut session, &profile, &credential, &registry)
            .await
            .unwrap();

        let wire = sent_text(&sent);
        assert!(!wire.contains("ANONYMOUS"));
        assert!(wire.contains("USER tim\r\nPASS hunter2\r\n"));
        assert_eq!(session.state(), SessionState::Transaction);
    }

    #[tokio::test]
    async fn explicit_plaintext_mechanism_is_attempted_on_insecure_connection() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            ".",
            "+OK maildrop locked",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("tim"));
        profile.mechanism = Some(AuthMechanism::Plain);
        let credential = Credential::new("tim", "tanstaaftanstaaf");
        let registry = MechanismRegistry::builtin();

        negotiate(&mut session, &profile, &credential, &registry)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Transaction);
        assert!(sent_text(&sent).contains("AUTH PLAIN AHRpbQB0YW5zdGFhZnRhbnN0YWFm\r\n"));
    }

    #[tokio::test]
    async fn profile_sasl_preference_order_wins() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            "SASL PLAIN LOGIN",
            ".",
            "+ VXNlcm5hbWU6",
            "+ UGFzc3dvcmQ6",
            "+OK maildrop locked",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("tim"));
        profile.allow_insecure_login = true;
        profile.sasl_mechanisms = Some(vec!["LOGIN".to_string()]);
        let credential = Credential::new("tim", "secret");
        let registry = MechanismRegistry::builtin();

        negotiate(&mut session, &profile, &credential, &registry)
            .await
            .unwrap();

        let wire = sent_text(&sent);
        assert!(wire.contains("AUTH LOGIN\r\n"));
        assert!(!wire.contains("AUTH PLAIN"));
    }

    #[tokio::test]
    async fn explicit_anonymous_does_not_fall_back() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            "SASL ANONYMOUS",
            ".",
            "-ERR anonymous access denied",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("mrose@example.net"));
        profile.mechanism = Some(AuthMechanism::Anonymous);
        let credential = Credential::anonymous("mrose@example.net");
        let registry = MechanismRegistry::builtin();

        let result = negotiate(&mut session, &profile, &credential, &registry).await;

        assert!(matches!(result, Err(Error::Auth(_))));
        let wire = sent_text(&sent);
        // The profile's user name is the trace identity.
        assert!(wire.contains("AUTH ANONYMOUS bXJvc2VAZXhhbXBsZS5uZXQ=\r\n"));
        assert!(!wire.contains("USER"));
    }

    #[tokio::test]
    async fn explicit_mechanism_never_downgrades() {
        let (stream, sent) = mock(&[GREETING, "+OK capability list follows", "USER", "."]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let mut profile = profile(Some("tim"));
        profile.mechanism = Some(AuthMechanism::CramMd5);
        let credential = Credential::new("tim", "tanstaaf");
        let registry = MechanismRegistry::builtin();

        let result = negotiate(&mut session, &profile, &credential, &registry).await;

        // CRAM-MD5 is not available in-process and nothing weaker is
        // tried in its place.
        assert!(matches!(result, Err(Error::Auth(_))));
        let wire = sent_text(&sent);
        assert!(!wire.contains("AUTH"));
        assert!(!wire.contains("APOP"));
        assert!(!wire.contains("PASS"));
    }

    #[tokio::test]
    async fn anonymous_access_falls_back_to_user_pass() {
        let (stream, sent) = mock(&[
            GREETING,
            "+OK capability list follows",
            "USER",
            ".",
            "+OK send PASS",
            "+OK maildrop locked",
        ]);
        let mut session = PopSession::start(connection(stream), None).await.unwrap();

        let credential = Credential::anonymous("anonymous@");
        let registry = MechanismRegistry::builtin();

        negotiate(&mut session, &profile(None), &credential, &registry)
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Transaction);
        assert!(sent_text(&sent).contains("USER anonymous\r\nPASS anonymous@\r\n"));
    }
}

mod properties {
    use maildrop_pop3::apop_digest;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn apop_digest_is_lowercase_hex(
            timestamp in "<[a-z0-9.@]{1,40}>",
            secret in "[ -~]{0,40}",
        ) {
            let digest = apop_digest(&timestamp, &secret);
            prop_assert_eq!(digest.len(), 32);
            prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }
}
