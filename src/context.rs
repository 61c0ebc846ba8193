//! Service context bundling the port trait objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::adapters::live::{LiveClock, LiveTaskFeed};
use crate::adapters::memory::LocalIdentitySession;
use crate::adapters::polling::PollingTaskFeed;
use crate::adapters::recording::RecordingTaskFeed;
use crate::adapters::replaying::ReplayingTaskFeed;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::CassetteError;
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::ports::{Clock, Identity, IdentitySession, TaskFeed};

/// Bundles the port trait objects a [`TaskStore`](crate::store::TaskStore)
/// runs against.
///
/// Constructors wire up different adapter sets (live, polling, replaying).
/// [`recording`](Self::recording) wraps whichever feed is present.
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Arc<dyn Clock>,
    /// Remote task document feed.
    pub feed: Arc<dyn TaskFeed>,
    /// Identity provider session.
    pub identity: Arc<dyn IdentitySession>,
    /// Optional cassette recorder; written to disk on drop.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        feed: Arc<dyn TaskFeed>,
        identity: Arc<dyn IdentitySession>,
    ) -> Self {
        Self { clock, feed, identity, recorder: None }
    }

    /// Creates a live context streaming from the service at `base_url`.
    #[must_use]
    pub fn live(base_url: &str, token: Option<String>, identity: Arc<dyn IdentitySession>) -> Self {
        Self::new(Arc::new(LiveClock), Arc::new(LiveTaskFeed::new(base_url, token)), identity)
    }

    /// Creates a live context that polls the service every `interval`
    /// instead of holding a stream open.
    #[must_use]
    pub fn polling(
        base_url: &str,
        token: Option<String>,
        interval: Duration,
        identity: Arc<dyn IdentitySession>,
    ) -> Self {
        let inner: Arc<dyn TaskFeed> = Arc::new(LiveTaskFeed::new(base_url, token));
        Self::new(Arc::new(LiveClock), Arc::new(PollingTaskFeed::new(inner, interval)), identity)
    }

    /// Creates a context whose feed is served from a cassette file.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be read or parsed.
    pub fn replaying(path: &Path, identity: Arc<dyn IdentitySession>) -> Result<Self, CassetteError> {
        let feed = ReplayingTaskFeed::load(path)?;
        Ok(Self::new(Arc::new(LiveClock), Arc::new(feed), identity))
    }

    /// Records all feed traffic into a cassette at `path`, written when this
    /// context is dropped. `source` names where the traffic came from.
    #[must_use]
    pub fn recording(mut self, path: impl Into<PathBuf>, source: &str) -> Self {
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, "quadrant-session", source)));
        self.feed = Arc::new(RecordingTaskFeed::new(Arc::clone(&self.feed), Arc::clone(&recorder)));
        self.recorder = Some(recorder);
        self
    }

    /// Builds the context described by `config`, signed in as its owner.
    ///
    /// A replay cassette takes precedence over a feed URL. A poll interval
    /// selects the polling feed.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the owner or the feed source is
    /// missing, or when the replay cassette cannot be loaded.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let owner = config.owner.clone().ok_or(ConfigError::Missing("QUADRANT_OWNER"))?;
        let identity: Arc<dyn IdentitySession> =
            Arc::new(LocalIdentitySession::signed_in(Identity::new(owner)));

        let (ctx, source) = if let Some(path) = &config.replay {
            let ctx = Self::replaying(path, identity).map_err(|error| {
                tracing::error!(%error, "cannot load replay cassette");
                ConfigError::Invalid {
                    key: "QUADRANT_REPLAY",
                    value: path.display().to_string(),
                    reason: "cassette could not be loaded",
                }
            })?;
            (ctx, format!("replay:{}", path.display()))
        } else {
            let url = config.feed_url.as_deref().ok_or(ConfigError::Missing("QUADRANT_FEED_URL"))?;
            let token = config.feed_token.clone();
            let ctx = match config.poll_interval {
                Some(interval) => Self::polling(url, token, interval, identity),
                None => Self::live(url, token, identity),
            };
            (ctx, url.to_string())
        };

        Ok(match &config.record {
            Some(path) => ctx.recording(path.clone(), &source),
            None => ctx,
        })
    }

    /// Whether feed traffic is being recorded.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let mut recorder = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(error) = recorder.finish() {
                tracing::warn!(%error, "failed to write cassette");
            }
        }
    }
}
