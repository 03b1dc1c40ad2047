//! Deep-link state machines.
//!
//! The flows here perform no I/O. Each call to [`LinkFlow::handle`] moves the
//! machine and returns the [`Effect`]s the host has to carry out (navigate,
//! start a timer, log). [`crate::session::LinkSession`] is the tokio host; the
//! HTTP server renders the same effects into the page it serves.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::FALLBACK_DELAY_MS;
use crate::deeplink::{auth_open_url, channel_join_url, AuthCallback, DeepLinkConfig, InviteRequest};
use crate::platform::{supports_deep_linking, Platform, PlatformInfo};
use crate::redact::create_safe_log_data;

/// UI state exposed to the host. The host owns all markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LinkState {
    Initializing,
    /// Deep link issued, fallback timer running.
    Attempting,
    /// The page was hidden before the timer fired: the app most likely opened.
    Resolved,
    /// Manual "open app" / "download" choices are shown.
    Fallback,
    /// Magic-link exchange in flight.
    Loading,
    /// Magic-link session exchanged, app-open URL issued.
    Redirecting,
    Error { message: String },
}

impl LinkState {
    pub fn name(&self) -> &'static str {
        match self {
            LinkState::Initializing => "initializing",
            LinkState::Attempting => "attempting",
            LinkState::Resolved => "resolved",
            LinkState::Fallback => "fallback",
            LinkState::Loading => "loading",
            LinkState::Redirecting => "redirecting",
            LinkState::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The page was mounted.
    Mount,
    /// The magic-link exchange finished.
    ExchangeSucceeded(AuthCallback),
    ExchangeFailed(String),
    TimerFired,
    PageHidden,
    /// User pressed "open app".
    OpenApp,
    /// User pressed a store button.
    Download(Platform),
    /// The page is going away.
    Teardown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Emit a record that has already been passed through the redactor.
    Log(Map<String, Value>),
    /// Replace the current document location.
    Navigate(String),
    /// Open a URL in a new browsing context.
    OpenExternal(String),
    StartTimer(Duration),
    CancelTimer,
    ObserveVisibility,
    StopObservingVisibility,
}

/// Common surface of the invite and magic-login flows.
pub trait LinkFlow {
    fn state(&self) -> &LinkState;

    fn handle(&mut self, event: LinkEvent) -> Vec<Effect>;
}

/// Decides "open the app or show the web fallback" for one invite link.
#[derive(Debug, Clone)]
pub struct InviteFlow {
    config: DeepLinkConfig,
    request: InviteRequest,
    platform: PlatformInfo,
    fallback_delay: Duration,
    store_redirect: bool,
    deep_link_url: String,
    state: LinkState,
    torn_down: bool,
}

impl InviteFlow {
    /// `request.channel_id` is not validated here; hosts check it first.
    pub fn new(config: DeepLinkConfig, request: InviteRequest, platform: PlatformInfo) -> Self {
        let deep_link_url = channel_join_url(&config.app_custom_scheme, &request);
        Self {
            config,
            request,
            platform,
            fallback_delay: Duration::from_millis(FALLBACK_DELAY_MS),
            store_redirect: true,
            deep_link_url,
            state: LinkState::Initializing,
            torn_down: false,
        }
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Whether a timed-out attempt navigates straight to the store.
    pub fn with_store_redirect(mut self, enabled: bool) -> Self {
        self.store_redirect = enabled;
        self
    }

    pub fn deep_link_url(&self) -> &str {
        &self.deep_link_url
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn request(&self) -> &InviteRequest {
        &self.request
    }

    /// Store URL followed automatically when the attempt times out, if any.
    pub fn timeout_store_url(&self) -> Option<&str> {
        if self.store_redirect {
            self.config.store_url(self.platform.platform)
        } else {
            None
        }
    }

    /// Platforms that get a download button in the fallback view.
    pub fn download_options(&self) -> Vec<Platform> {
        self.config.download_platforms()
    }

    pub fn store_url(&self, platform: Platform) -> Option<&str> {
        self.config.store_url(platform)
    }

    fn log_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("channelId".into(), Value::from(self.request.channel_id.clone()));
        record.insert(
            "token".into(),
            self.request.token.clone().map(Value::from).unwrap_or(Value::Null),
        );
        record.insert("platform".into(), Value::from(self.platform.platform.as_str()));
        record.insert("userAgent".into(), Value::from(self.platform.user_agent.clone()));
        record.insert("timestamp".into(), Value::from(Utc::now().to_rfc3339()));
        create_safe_log_data(&record)
    }

    fn mount(&mut self) -> Vec<Effect> {
        let mut effects = vec![Effect::Log(self.log_record())];

        if supports_deep_linking(self.platform.platform) {
            self.state = LinkState::Attempting;
            effects.extend([
                Effect::Navigate(self.deep_link_url.clone()),
                Effect::StartTimer(self.fallback_delay),
                Effect::ObserveVisibility,
            ]);
        } else {
            self.state = LinkState::Fallback;
        }

        effects
    }

    fn timer_fired(&mut self) -> Vec<Effect> {
        self.state = LinkState::Fallback;
        let mut effects = vec![Effect::StopObservingVisibility];
        if let Some(url) = self.timeout_store_url() {
            effects.push(Effect::Navigate(url.to_string()));
        }
        effects
    }
}

impl LinkFlow for InviteFlow {
    fn state(&self) -> &LinkState {
        &self.state
    }

    fn handle(&mut self, event: LinkEvent) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }

        match (self.state.clone(), event) {
            (LinkState::Initializing, LinkEvent::Mount) => self.mount(),
            (LinkState::Attempting, LinkEvent::TimerFired) => self.timer_fired(),
            (LinkState::Attempting, LinkEvent::PageHidden) => {
                self.state = LinkState::Resolved;
                vec![Effect::CancelTimer, Effect::StopObservingVisibility]
            }
            (LinkState::Fallback, LinkEvent::OpenApp) => {
                vec![Effect::Navigate(self.deep_link_url.clone())]
            }
            (LinkState::Fallback, LinkEvent::Download(platform)) => self
                .store_url(platform)
                .map(|url| vec![Effect::OpenExternal(url.to_string())])
                .unwrap_or_default(),
            (state, LinkEvent::Teardown) => {
                let attempting = state == LinkState::Attempting;
                self.torn_down = true;
                if attempting {
                    vec![Effect::CancelTimer, Effect::StopObservingVisibility]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

/// Magic-login variant: waits for the token exchange, then issues the app
/// URL with the same timer/visibility race. There is no separate fallback
/// view; the manual actions stay available while `Redirecting`.
#[derive(Debug, Clone)]
pub struct MagicLinkFlow {
    config: DeepLinkConfig,
    platform: PlatformInfo,
    fallback_delay: Duration,
    open_url: Option<String>,
    state: LinkState,
    racing: bool,
    torn_down: bool,
}

impl MagicLinkFlow {
    pub fn new(config: DeepLinkConfig, platform: PlatformInfo) -> Self {
        Self {
            config,
            platform,
            fallback_delay: Duration::from_millis(FALLBACK_DELAY_MS),
            open_url: None,
            state: LinkState::Loading,
            racing: false,
            torn_down: false,
        }
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// Intent URL on Android, scheme URL elsewhere. `None` until exchanged.
    pub fn open_url(&self) -> Option<&str> {
        self.open_url.as_deref()
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    /// Store for the visitor's own platform; `None` on desktop.
    pub fn store_url(&self) -> Option<&str> {
        self.config.store_url(self.platform.platform)
    }

    fn exchanged(&mut self, callback: AuthCallback) -> Vec<Effect> {
        let url = auth_open_url(self.platform.platform, &self.config, &callback);

        let mut record = Map::new();
        record.insert("userId".into(), Value::from(callback.user_id.clone()));
        record.insert("accessToken".into(), Value::from(callback.access_token.clone()));
        record.insert("refreshToken".into(), Value::from(callback.refresh_token.clone()));
        record.insert("platform".into(), Value::from(self.platform.platform.as_str()));
        record.insert("locale".into(), Value::from(callback.locale.clone()));
        record.insert("timestamp".into(), Value::from(Utc::now().to_rfc3339()));

        self.open_url = Some(url.clone());
        self.state = LinkState::Redirecting;
        self.racing = true;

        vec![
            Effect::Log(create_safe_log_data(&record)),
            Effect::Navigate(url),
            Effect::StartTimer(self.fallback_delay),
            Effect::ObserveVisibility,
        ]
    }
}

impl LinkFlow for MagicLinkFlow {
    fn state(&self) -> &LinkState {
        &self.state
    }

    fn handle(&mut self, event: LinkEvent) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }

        match (self.state.clone(), event) {
            (LinkState::Loading, LinkEvent::ExchangeSucceeded(callback)) => self.exchanged(callback),
            (LinkState::Loading, LinkEvent::ExchangeFailed(message)) => {
                self.state = LinkState::Error { message };
                Vec::new()
            }
            (LinkState::Redirecting, LinkEvent::TimerFired) if self.racing => {
                self.racing = false;
                vec![Effect::StopObservingVisibility]
            }
            (LinkState::Redirecting, LinkEvent::PageHidden) if self.racing => {
                self.racing = false;
                self.state = LinkState::Resolved;
                vec![Effect::CancelTimer, Effect::StopObservingVisibility]
            }
            (LinkState::Redirecting, LinkEvent::OpenApp) => self
                .open_url
                .clone()
                .map(|url| vec![Effect::Navigate(url)])
                .unwrap_or_default(),
            (LinkState::Redirecting, LinkEvent::Download(platform)) => self
                .config
                .store_url(platform)
                .map(|url| vec![Effect::OpenExternal(url.to_string())])
                .unwrap_or_default(),
            (_, LinkEvent::Teardown) => {
                self.torn_down = true;
                if std::mem::take(&mut self.racing) {
                    vec![Effect::CancelTimer, Effect::StopObservingVisibility]
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}
