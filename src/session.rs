use thiserror::Error;
use tracing::{debug, info, warn};

pub mod adaptive;
pub mod native;

/// Terminal failure reasons for a playback session. Shown in the in-view
/// banner together with the raw stream URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamSessionError {
    #[error("network error: cannot reach the stream")]
    Network,
    #[error("media error: playback failed")]
    Media,
    #[error("this host cannot play HLS streams")]
    Unsupported,
    #[error("stream playback failed")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Connecting,
    Ready,
    Error(StreamSessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    /// Decode-side failure; the one class that gets a recovery attempt.
    Media,
    Other,
}

/// Notifications delivered by the host's media/network layer. Everything is
/// cooperative: these arrive on the same thread, possibly long after the
/// session they were meant for is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    MetadataLoaded,
    ManifestParsed,
    /// Host refused to start playback without a user gesture. Not a failure.
    AutoplayBlocked,
    Failure { kind: FailureKind, fatal: bool },
}

/// Generation token handed out per session. Continuations must present it;
/// a token that no longer matches the live session marks the event stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

/// Which event a strategy treats as "media is flowing".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    MetadataLoaded,
    ManifestParsed,
}

/// The host's rendering surface and decoder. Attach points the decoder at a
/// source; detach must leave the surface reusable.
pub trait MediaSurface {
    fn attach_source(&mut self, url: &str);
    fn detach_source(&mut self);
}

/// An adaptive-bitrate client in the hls.js mold: fetches and parses the
/// manifest itself and feeds segments to the surface.
pub trait AdaptiveClient {
    fn load(&mut self, url: &str);
    /// Try an in-place media recovery. `false` means it could not even be
    /// attempted and the failure must be treated as fatal.
    fn recover_media(&mut self) -> bool;
    fn destroy(&mut self);
}

/// One playback tactic behind a common start/recover/dispose contract, so
/// the session state machine is written once. Selected a single time at
/// session creation and never swapped afterwards.
pub trait PlaybackStrategy {
    fn start(&mut self, url: &str);

    fn readiness(&self) -> Readiness;

    fn recover(&mut self) -> bool;

    /// Release everything the strategy opened. Must be safe to call twice.
    fn dispose(&mut self);
}

/// Host integration seam: capability probes plus the handles a strategy
/// drives. A view supplies one of these when it opens a preview.
pub trait PlaybackHost {
    fn supports_native_hls(&self) -> bool;
    fn supports_adaptive(&self) -> bool;
    fn surface(&mut self) -> Box<dyn MediaSurface>;
    fn adaptive_client(&mut self) -> Box<dyn AdaptiveClient>;
}

struct StreamSession {
    token: SessionToken,
    url: String,
    state: PlaybackState,
    strategy: Option<Box<dyn PlaybackStrategy>>,
    recovery_spent: bool,
    disposed: bool,
}

impl StreamSession {
    /// Idempotent. The first call releases the strategy's resources and
    /// marks the session inactive; later calls and late events see the
    /// marker and do nothing.
    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.dispose();
        }
    }
}

/// Single-session playback manager, one per viewing surface. At most one
/// session is `Connecting` or `Ready` at a time; opening a new target fully
/// disposes the previous session first.
#[derive(Default)]
pub struct StreamSessionManager {
    next_token: u64,
    current: Option<StreamSession>,
}

impl StreamSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session against `url`, picking the playback strategy from the
    /// host's capabilities. Any live session is torn down before the new
    /// one starts connecting.
    pub fn open(&mut self, url: &str, host: &mut dyn PlaybackHost) -> SessionToken {
        self.close();

        self.next_token += 1;
        let token = SessionToken(self.next_token);

        let (state, strategy): (PlaybackState, Option<Box<dyn PlaybackStrategy>>) =
            if host.supports_native_hls() {
                (
                    PlaybackState::Connecting,
                    Some(Box::new(native::NativePlayback::new(host.surface()))),
                )
            } else if host.supports_adaptive() {
                (
                    PlaybackState::Connecting,
                    Some(Box::new(adaptive::AdaptivePlayback::new(
                        host.surface(),
                        host.adaptive_client(),
                    ))),
                )
            } else {
                warn!(url = url, "no playback path available on this host");
                (PlaybackState::Error(StreamSessionError::Unsupported), None)
            };

        let mut session = StreamSession {
            token,
            url: url.to_string(),
            state,
            strategy,
            recovery_spent: false,
            disposed: false,
        };
        if let Some(strategy) = session.strategy.as_mut() {
            strategy.start(url);
            info!(url = url, "stream session connecting");
        }
        self.current = Some(session);

        token
    }

    /// Tear down the live session, whatever state it is in. Safe to call
    /// with no session open.
    pub fn close(&mut self) {
        if let Some(mut session) = self.current.take() {
            session.dispose();
            info!(url = %session.url, "stream session closed");
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.current
            .as_ref()
            .map(|s| s.state)
            .unwrap_or(PlaybackState::Idle)
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.url.as_str())
    }

    /// Failure reason plus the raw stream URL, for the persistent error
    /// banner.
    pub fn error_banner(&self) -> Option<(StreamSessionError, &str)> {
        match self.current.as_ref() {
            Some(session) => match session.state {
                PlaybackState::Error(reason) => Some((reason, session.url.as_str())),
                _ => None,
            },
            None => None,
        }
    }

    /// Feed a media/network notification into the state machine. Events
    /// whose token does not match the live session are stale and ignored.
    pub fn handle_event(&mut self, token: SessionToken, event: SessionEvent) {
        let Some(session) = self.current.as_mut() else {
            debug!(?token, ?event, "event after teardown, ignored");
            return;
        };
        if session.token != token || session.disposed {
            debug!(?token, ?event, "stale session event, ignored");
            return;
        }
        if matches!(session.state, PlaybackState::Error(_)) {
            // Terminal for this session; only disposal remains.
            return;
        }

        match event {
            SessionEvent::MetadataLoaded | SessionEvent::ManifestParsed => {
                let readiness = session
                    .strategy
                    .as_ref()
                    .map(|s| s.readiness())
                    .unwrap_or(Readiness::MetadataLoaded);
                let expected = match readiness {
                    Readiness::MetadataLoaded => SessionEvent::MetadataLoaded,
                    Readiness::ManifestParsed => SessionEvent::ManifestParsed,
                };
                if event == expected && session.state == PlaybackState::Connecting {
                    session.state = PlaybackState::Ready;
                    info!(url = %session.url, "stream session ready");
                }
            }
            SessionEvent::AutoplayBlocked => {
                // Playback starts on the next user gesture; the session is
                // still healthy.
                debug!(url = %session.url, "autoplay blocked by host policy");
            }
            SessionEvent::Failure { fatal: false, .. } => {
                // Transient; the strategy handles it internally.
            }
            SessionEvent::Failure {
                kind: FailureKind::Network,
                fatal: true,
            } => {
                warn!(url = %session.url, "fatal network failure");
                session.state = PlaybackState::Error(StreamSessionError::Network);
            }
            SessionEvent::Failure {
                kind: FailureKind::Media,
                fatal: true,
            } => {
                if !session.recovery_spent {
                    session.recovery_spent = true;
                    let recovered = session
                        .strategy
                        .as_mut()
                        .map(|s| s.recover())
                        .unwrap_or(false);
                    if recovered {
                        warn!(url = %session.url, "media failure, recovery attempted");
                        return;
                    }
                }
                warn!(url = %session.url, "fatal media failure");
                session.dispose();
                session.state = PlaybackState::Error(StreamSessionError::Media);
            }
            SessionEvent::Failure {
                kind: FailureKind::Other,
                fatal: true,
            } => {
                warn!(url = %session.url, "unclassified fatal failure");
                session.dispose();
                session.state = PlaybackState::Error(StreamSessionError::Other);
            }
        }
    }
}

impl Drop for StreamSessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{
        AdaptiveClient, FailureKind, MediaSurface, PlaybackHost, PlaybackState, SessionEvent,
        StreamSessionError, StreamSessionManager,
    };

    #[derive(Default, Clone)]
    struct Counters {
        attaches: Arc<AtomicUsize>,
        detaches: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
        recovers: Arc<AtomicUsize>,
        destroys: Arc<AtomicUsize>,
    }

    impl Counters {
        fn detaches(&self) -> usize {
            self.detaches.load(Ordering::SeqCst)
        }

        fn destroys(&self) -> usize {
            self.destroys.load(Ordering::SeqCst)
        }

        fn recovers(&self) -> usize {
            self.recovers.load(Ordering::SeqCst)
        }
    }

    struct FakeSurface {
        counters: Counters,
    }

    impl MediaSurface for FakeSurface {
        fn attach_source(&mut self, _url: &str) {
            self.counters.attaches.fetch_add(1, Ordering::SeqCst);
        }

        fn detach_source(&mut self) {
            self.counters.detaches.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeClient {
        counters: Counters,
        recover_ok: bool,
    }

    impl AdaptiveClient for FakeClient {
        fn load(&mut self, _url: &str) {
            self.counters.loads.fetch_add(1, Ordering::SeqCst);
        }

        fn recover_media(&mut self) -> bool {
            self.counters.recovers.fetch_add(1, Ordering::SeqCst);
            self.recover_ok
        }

        fn destroy(&mut self) {
            self.counters.destroys.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Hands out one `Counters` per session so tests can watch each
    /// session's releases separately.
    struct FakeHost {
        native: bool,
        adaptive: bool,
        recover_ok: bool,
        sessions: Vec<Counters>,
    }

    impl FakeHost {
        fn native() -> Self {
            Self {
                native: true,
                adaptive: false,
                recover_ok: true,
                sessions: Vec::new(),
            }
        }

        fn adaptive() -> Self {
            Self {
                native: false,
                adaptive: true,
                recover_ok: true,
                sessions: Vec::new(),
            }
        }

        fn unsupported() -> Self {
            Self {
                native: false,
                adaptive: false,
                recover_ok: false,
                sessions: Vec::new(),
            }
        }

        fn session(&self, index: usize) -> &Counters {
            &self.sessions[index]
        }

        fn current(&mut self) -> Counters {
            if self.sessions.is_empty() {
                self.sessions.push(Counters::default());
            }
            self.sessions.last().unwrap().clone()
        }
    }

    impl PlaybackHost for FakeHost {
        fn supports_native_hls(&self) -> bool {
            self.native
        }

        fn supports_adaptive(&self) -> bool {
            self.adaptive
        }

        fn surface(&mut self) -> Box<dyn MediaSurface> {
            // First handle requested for a session starts a new counter set.
            self.sessions.push(Counters::default());
            Box::new(FakeSurface {
                counters: self.sessions.last().unwrap().clone(),
            })
        }

        fn adaptive_client(&mut self) -> Box<dyn AdaptiveClient> {
            Box::new(FakeClient {
                counters: self.current(),
                recover_ok: self.recover_ok,
            })
        }
    }

    fn fatal(kind: FailureKind) -> SessionEvent {
        SessionEvent::Failure { kind, fatal: true }
    }

    #[test]
    pub fn test_native_ready_on_metadata() {
        let mut host = FakeHost::native();
        let mut mgr = StreamSessionManager::new();

        assert_eq!(mgr.state(), PlaybackState::Idle);
        let token = mgr.open("http://example/live.m3u8", &mut host);
        assert_eq!(mgr.state(), PlaybackState::Connecting);

        // The manifest event belongs to the adaptive path; a native session
        // ignores it.
        mgr.handle_event(token, SessionEvent::ManifestParsed);
        assert_eq!(mgr.state(), PlaybackState::Connecting);

        mgr.handle_event(token, SessionEvent::MetadataLoaded);
        assert_eq!(mgr.state(), PlaybackState::Ready);
    }

    #[test]
    pub fn test_adaptive_ready_on_manifest() {
        let mut host = FakeHost::adaptive();
        let mut mgr = StreamSessionManager::new();

        let token = mgr.open("http://example/live.m3u8", &mut host);
        mgr.handle_event(token, SessionEvent::ManifestParsed);
        assert_eq!(mgr.state(), PlaybackState::Ready);
    }

    #[test]
    pub fn test_unsupported_host_errors_immediately() {
        let mut host = FakeHost::unsupported();
        let mut mgr = StreamSessionManager::new();

        mgr.open("http://example/live.m3u8", &mut host);
        assert_eq!(
            mgr.state(),
            PlaybackState::Error(StreamSessionError::Unsupported)
        );
        assert_eq!(
            mgr.error_banner(),
            Some((StreamSessionError::Unsupported, "http://example/live.m3u8"))
        );
    }

    #[test]
    pub fn test_network_failure_is_terminal() {
        let mut host = FakeHost::adaptive();
        let mut mgr = StreamSessionManager::new();

        let token = mgr.open("http://example/live.m3u8", &mut host);
        mgr.handle_event(token, SessionEvent::ManifestParsed);
        mgr.handle_event(token, fatal(FailureKind::Network));
        assert_eq!(
            mgr.state(),
            PlaybackState::Error(StreamSessionError::Network)
        );

        // No retry: a late readiness event cannot resurrect the session.
        mgr.handle_event(token, SessionEvent::ManifestParsed);
        assert_eq!(
            mgr.state(),
            PlaybackState::Error(StreamSessionError::Network)
        );

        // Resources go when the view closes.
        mgr.close();
        assert_eq!(host.session(0).destroys(), 1);
        assert_eq!(host.session(0).detaches(), 1);
    }

    #[test]
    pub fn test_media_failure_recovers_once_then_fatal() {
        let mut host = FakeHost::adaptive();
        let mut mgr = StreamSessionManager::new();

        let token = mgr.open("http://example/live.m3u8", &mut host);
        mgr.handle_event(token, SessionEvent::ManifestParsed);

        mgr.handle_event(token, fatal(FailureKind::Media));
        assert_eq!(mgr.state(), PlaybackState::Ready);
        assert_eq!(host.session(0).recovers(), 1);

        mgr.handle_event(token, fatal(FailureKind::Media));
        assert_eq!(mgr.state(), PlaybackState::Error(StreamSessionError::Media));
        assert_eq!(host.session(0).recovers(), 1);
        assert_eq!(host.session(0).destroys(), 1);
        assert_eq!(host.session(0).detaches(), 1);

        // Close after a fatal release must not release twice.
        mgr.close();
        assert_eq!(host.session(0).destroys(), 1);
        assert_eq!(host.session(0).detaches(), 1);
    }

    #[test]
    pub fn test_recovery_unavailable_falls_through_to_fatal() {
        let mut host = FakeHost::adaptive();
        host.recover_ok = false;
        let mut mgr = StreamSessionManager::new();

        let token = mgr.open("http://example/live.m3u8", &mut host);
        mgr.handle_event(token, SessionEvent::ManifestParsed);
        mgr.handle_event(token, fatal(FailureKind::Media));

        assert_eq!(mgr.state(), PlaybackState::Error(StreamSessionError::Media));
        assert_eq!(host.session(0).destroys(), 1);
    }

    #[test]
    pub fn test_nonfatal_and_autoplay_absorbed() {
        let mut host = FakeHost::native();
        let mut mgr = StreamSessionManager::new();

        let token = mgr.open("http://example/live.m3u8", &mut host);
        mgr.handle_event(token, SessionEvent::MetadataLoaded);

        mgr.handle_event(
            token,
            SessionEvent::Failure {
                kind: FailureKind::Media,
                fatal: false,
            },
        );
        assert_eq!(mgr.state(), PlaybackState::Ready);

        mgr.handle_event(token, SessionEvent::AutoplayBlocked);
        assert_eq!(mgr.state(), PlaybackState::Ready);
    }

    #[test]
    pub fn test_switch_disposes_old_before_new_connects() {
        let mut host = FakeHost::adaptive();
        let mut mgr = StreamSessionManager::new();

        let token_a = mgr.open("http://example/a.m3u8", &mut host);
        assert_eq!(mgr.state(), PlaybackState::Connecting);

        // Switch away before A ever reaches Ready.
        let token_b = mgr.open("http://example/b.m3u8", &mut host);
        assert_eq!(host.session(0).destroys(), 1);
        assert_eq!(host.session(0).detaches(), 1);
        assert_eq!(mgr.state(), PlaybackState::Connecting);
        assert_eq!(mgr.current_url(), Some("http://example/b.m3u8"));

        // A's late readiness event is stale and must not touch B.
        mgr.handle_event(token_a, SessionEvent::ManifestParsed);
        assert_eq!(mgr.state(), PlaybackState::Connecting);

        mgr.handle_event(token_b, SessionEvent::ManifestParsed);
        assert_eq!(mgr.state(), PlaybackState::Ready);
        assert_eq!(host.session(1).destroys(), 0);
    }

    #[test]
    pub fn test_disposal_is_idempotent() {
        let mut host = FakeHost::adaptive();
        let mut mgr = StreamSessionManager::new();

        // Closing with nothing open releases nothing.
        mgr.close();
        assert!(host.sessions.is_empty());

        let token = mgr.open("http://example/live.m3u8", &mut host);
        mgr.close();
        mgr.close();
        assert_eq!(host.session(0).destroys(), 1);
        assert_eq!(host.session(0).detaches(), 1);
        assert_eq!(mgr.state(), PlaybackState::Idle);

        // Event after teardown is ignored, not an error.
        mgr.handle_event(token, SessionEvent::ManifestParsed);
        assert_eq!(mgr.state(), PlaybackState::Idle);
    }
}
