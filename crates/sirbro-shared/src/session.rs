//! Tokio host for a [`LinkFlow`].
//!
//! A [`LinkSession`] owns exactly one fallback timer and one visibility
//! observer. They live in a single spawned task that races
//! `tokio::time::sleep` against the visibility channel; whichever side wins
//! is fed back into the flow and the other is dropped with the task.
//! Teardown (explicit or by dropping the session) aborts the task, so a late
//! timer can never fire after the page went away.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::orchestrator::{Effect, LinkEvent, LinkFlow, LinkState};
use crate::platform::Platform;

/// Document navigation capability supplied by the host.
pub trait Navigator: Send + Sync + 'static {
    /// Replace the current document location.
    fn navigate(&self, url: &str);

    /// Open `url` in a new browsing context.
    fn open_external(&self, url: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

struct Shared<F> {
    flow: Mutex<F>,
    state: watch::Sender<LinkState>,
    navigator: Arc<dyn Navigator>,
}

impl<F: LinkFlow> Shared<F> {
    /// Feed one event to the flow and carry out its effects. Returns the
    /// timer to start, if the flow asked for one.
    fn dispatch(&self, event: LinkEvent) -> Option<Duration> {
        let effects = {
            let mut flow = self.flow.lock().unwrap_or_else(PoisonError::into_inner);
            let effects = flow.handle(event);
            self.state.send_replace(flow.state().clone());
            effects
        };

        let mut timer = None;
        for effect in effects {
            match effect {
                Effect::Log(record) => {
                    let record = Value::Object(record);
                    info!(record = %record, "Deep link attempt");
                }
                Effect::Navigate(url) => self.navigator.navigate(&url),
                Effect::OpenExternal(url) => self.navigator.open_external(&url),
                Effect::StartTimer(delay) => timer = Some(delay),
                // The race task stops both sides when it returns.
                Effect::CancelTimer
                | Effect::ObserveVisibility
                | Effect::StopObservingVisibility => {}
            }
        }
        timer
    }
}

pub struct LinkSession<F> {
    shared: Arc<Shared<F>>,
    state_rx: watch::Receiver<LinkState>,
    race: Option<JoinHandle<()>>,
    released: bool,
}

impl<F> LinkSession<F>
where
    F: LinkFlow + Send + 'static,
{
    /// Hand `initial` to the flow and, if it starts a timer, spawn the race.
    ///
    /// Must be called from within a tokio runtime when the flow may start a
    /// timer (mobile invite attempts, successful magic-link exchanges).
    pub fn start(
        flow: F,
        initial: LinkEvent,
        navigator: Arc<dyn Navigator>,
        mut visibility: watch::Receiver<Visibility>,
    ) -> Self {
        // Only changes after mount count as a signal.
        visibility.borrow_and_update();

        let (state_tx, state_rx) = watch::channel(flow.state().clone());
        let shared = Arc::new(Shared {
            flow: Mutex::new(flow),
            state: state_tx,
            navigator,
        });

        let race = shared
            .dispatch(initial)
            .map(|delay| tokio::spawn(run_race(Arc::clone(&shared), delay, visibility)));

        Self {
            shared,
            state_rx,
            race,
            released: false,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state_rx.clone()
    }

    /// Wait until the timer/visibility race is decided.
    pub async fn settled(&mut self) -> LinkState {
        if let Some(handle) = self.race.as_mut() {
            // A cancelled race has nothing left to report.
            let _ = handle.await;
            self.race = None;
        }
        self.state()
    }

    /// "Open app" button.
    pub fn open_app(&self) {
        self.shared.dispatch(LinkEvent::OpenApp);
    }

    /// Store button for `platform`. A no-op when that store is not configured.
    pub fn download_for(&self, platform: Platform) {
        self.shared.dispatch(LinkEvent::Download(platform));
    }

    /// Cancel the pending timer and stop observing visibility.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        if let Some(handle) = self.race.take() {
            handle.abort();
        }
        self.shared.dispatch(LinkEvent::Teardown);
        debug!("Link session released");
    }
}

impl<F> Drop for LinkSession<F> {
    fn drop(&mut self) {
        if let Some(handle) = self.race.take() {
            handle.abort();
        }
    }
}

async fn run_race<F: LinkFlow>(
    shared: Arc<Shared<F>>,
    delay: Duration,
    mut visibility: watch::Receiver<Visibility>,
) {
    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);
    let mut observing = true;

    let winner = loop {
        tokio::select! {
            _ = &mut timer => break LinkEvent::TimerFired,
            changed = visibility.changed(), if observing => match changed {
                Ok(()) => {
                    if *visibility.borrow_and_update() == Visibility::Hidden {
                        break LinkEvent::PageHidden;
                    }
                }
                // The host dropped its visibility source; only the timer is left.
                Err(_) => observing = false,
            },
        }
    };

    debug!(event = ?winner, "Link race decided");
    shared.dispatch(winner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deeplink::{AuthCallback, DeepLinkConfig, InviteRequest};
    use crate::orchestrator::{InviteFlow, MagicLinkFlow};
    use crate::platform::detect;

    const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 11; Pixel 5)";
    const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
    const PLAY_STORE: &str = "https://play.google.com/store/apps/details?id=ai.levantem.sirbro";
    const IOS_STORE: &str = "https://apps.apple.com/app/sirbro/id1";
    const DEEP_LINK: &str = "scheme://channels/join?channelId=abc&token=xyz123456789";

    #[derive(Default)]
    struct SpyNavigator {
        navigations: Mutex<Vec<String>>,
        external: Mutex<Vec<String>>,
    }

    impl SpyNavigator {
        fn navigations(&self) -> Vec<String> {
            self.navigations.lock().unwrap().clone()
        }

        fn external(&self) -> Vec<String> {
            self.external.lock().unwrap().clone()
        }
    }

    impl Navigator for SpyNavigator {
        fn navigate(&self, url: &str) {
            self.navigations.lock().unwrap().push(url.to_string());
        }

        fn open_external(&self, url: &str) {
            self.external.lock().unwrap().push(url.to_string());
        }
    }

    fn android_flow() -> InviteFlow {
        InviteFlow::new(
            DeepLinkConfig::new("scheme")
                .with_ios_store(IOS_STORE)
                .with_android_store(PLAY_STORE),
            InviteRequest::new("abc", Some("xyz123456789".into())),
            detect(ANDROID_UA),
        )
    }

    fn start(
        flow: InviteFlow,
    ) -> (
        LinkSession<InviteFlow>,
        Arc<SpyNavigator>,
        watch::Sender<Visibility>,
    ) {
        let spy = Arc::new(SpyNavigator::default());
        let (vis_tx, vis_rx) = watch::channel(Visibility::Visible);
        let session = LinkSession::start(flow, LinkEvent::Mount, spy.clone(), vis_rx);
        (session, spy, vis_tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_android_attempt_times_out_into_fallback() {
        let (mut session, spy, _vis) = start(android_flow());

        assert_eq!(session.state(), LinkState::Attempting);
        assert_eq!(spy.navigations(), vec![DEEP_LINK]);

        let started = tokio::time::Instant::now();
        assert_eq!(session.settled().await, LinkState::Fallback);
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(spy.navigations(), vec![DEEP_LINK, PLAY_STORE]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_before_timer_suppresses_fallback() {
        let (mut session, spy, vis) = start(android_flow());

        vis.send(Visibility::Hidden).unwrap();
        assert_eq!(session.settled().await, LinkState::Resolved);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.state(), LinkState::Resolved);
        assert_eq!(spy.navigations(), vec![DEEP_LINK]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_changes_do_not_resolve() {
        let (mut session, spy, vis) = start(android_flow());

        vis.send(Visibility::Visible).unwrap();
        assert_eq!(session.settled().await, LinkState::Fallback);
        assert_eq!(spy.navigations().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_visibility_source_still_times_out() {
        let (mut session, _spy, vis) = start(android_flow());
        drop(vis);
        assert_eq!(session.settled().await, LinkState::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_timer() {
        let (session, spy, _vis) = start(android_flow());
        session.teardown();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(spy.navigations(), vec![DEEP_LINK]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (session, spy, _vis) = start(android_flow());
        drop(session);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(spy.navigations(), vec![DEEP_LINK]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_own_their_races() {
        let (mut first, _spy1, vis1) = start(android_flow());
        let (mut second, spy2, _vis2) = start(android_flow());

        vis1.send(Visibility::Hidden).unwrap();

        assert_eq!(first.settled().await, LinkState::Resolved);
        assert_eq!(second.settled().await, LinkState::Fallback);
        assert_eq!(spy2.navigations(), vec![DEEP_LINK, PLAY_STORE]);
    }

    #[tokio::test]
    async fn test_desktop_session_has_no_race() {
        let flow = InviteFlow::new(
            DeepLinkConfig::new("scheme").with_android_store(PLAY_STORE),
            InviteRequest::new("abc", None),
            detect(DESKTOP_UA),
        );
        let (mut session, spy, _vis) = start(flow);

        assert_eq!(session.settled().await, LinkState::Fallback);
        assert!(spy.navigations().is_empty());

        session.download_for(Platform::Ios);
        session.download_for(Platform::Android);
        assert_eq!(spy.external(), vec![PLAY_STORE]);

        session.open_app();
        assert_eq!(spy.navigations(), vec!["scheme://channels/join?channelId=abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_subscription_sees_fallback() {
        let (session, _spy, _vis) = start(android_flow());
        let mut states = session.subscribe();

        states
            .wait_for(|s| *s == LinkState::Fallback)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_magic_session_redirects_and_resolves() {
        let spy = Arc::new(SpyNavigator::default());
        let (vis_tx, vis_rx) = watch::channel(Visibility::Visible);
        let flow = MagicLinkFlow::new(DeepLinkConfig::new("sirbro"), detect(ANDROID_UA));
        let callback = AuthCallback {
            access_token: "a".repeat(20),
            refresh_token: "r".repeat(20),
            user_id: "u1".into(),
            email: "bro@example.com".into(),
            name: "Bro".into(),
            locale: "pt".into(),
        };

        let mut session =
            LinkSession::start(flow, LinkEvent::ExchangeSucceeded(callback), spy.clone(), vis_rx);
        assert_eq!(session.state(), LinkState::Redirecting);
        assert!(spy.navigations()[0].starts_with("intent://"));

        vis_tx.send(Visibility::Hidden).unwrap();
        assert_eq!(session.settled().await, LinkState::Resolved);
    }

    #[tokio::test]
    async fn test_magic_session_error_has_no_race() {
        let spy = Arc::new(SpyNavigator::default());
        let (_vis_tx, vis_rx) = watch::channel(Visibility::Visible);
        let flow = MagicLinkFlow::new(DeepLinkConfig::new("sirbro"), detect(ANDROID_UA));

        let mut session = LinkSession::start(
            flow,
            LinkEvent::ExchangeFailed("expired".into()),
            spy.clone(),
            vis_rx,
        );

        assert_eq!(
            session.settled().await,
            LinkState::Error { message: "expired".into() }
        );
        assert!(spy.navigations().is_empty());
    }
}
