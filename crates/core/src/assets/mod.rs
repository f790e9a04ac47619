use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{config::AssetConfig, Year};

/// Key of the background loop track in the audio store.
pub const LOOP_KEY: &str = "loop";
/// Key of the transition ding in the audio store.
pub const DING_KEY: &str = "ding";

/// Identifies a single asset. Images are keyed by year only; audio adds the
/// two named clips.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKey {
    Year(Year),
    Named(String),
}

impl AssetKey {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn background_loop() -> Self {
        Self::named(LOOP_KEY)
    }

    pub fn ding() -> Self {
        Self::named(DING_KEY)
    }
}

impl From<Year> for AssetKey {
    fn from(year: Year) -> Self {
        Self::Year(year)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Completion flag handed to a loader. It can only ever be raised, and may be
/// raised from any thread.
#[derive(Debug, Clone, Default)]
pub struct ReadyFlag(Arc<AtomicBool>);

impl ReadyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A registered resource together with its load state.
#[derive(Debug)]
pub struct AssetEntry<H> {
    key: AssetKey,
    path: PathBuf,
    handle: H,
    ready: ReadyFlag,
}

impl<H> AssetEntry<H> {
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_ready()
    }
}

/// Which entries must be loaded before the store counts as ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessPolicy {
    All,
    /// Only the listed keys are checked. Used as a cheap proxy for large sets.
    Subset(Vec<AssetKey>),
}

/// Registry for a fixed set of resources of one kind.
///
/// Resources are registered up front, then [`AssetStore::init`] hands each
/// one to the loader exactly once. Loading is fire-and-forget: completion is
/// observed by polling [`AssetStore::is_ready`].
#[derive(Debug)]
pub struct AssetStore<H> {
    label: &'static str,
    manifest: BTreeMap<AssetKey, PathBuf>,
    entries: BTreeMap<AssetKey, AssetEntry<H>>,
    policy: ReadinessPolicy,
    initialized: bool,
}

impl<H> AssetStore<H> {
    pub fn new(label: &'static str, policy: ReadinessPolicy) -> Self {
        Self {
            label,
            manifest: BTreeMap::new(),
            entries: BTreeMap::new(),
            policy,
            initialized: false,
        }
    }

    /// Background images for the documented subset of years.
    pub fn images(config: &AssetConfig) -> Self {
        let root = Path::new(&config.root);
        let mut store = Self::new("images", ReadinessPolicy::All);
        for &year in &config.image_years {
            store.register(year, root.join(config.image_path(year)));
        }
        store
    }

    /// Year clips plus the loop and ding.
    ///
    /// Readiness only tracks the background loop and the earliest year's clip.
    /// Callers polling [`AssetStore::is_ready`] on this store get that
    /// approximation, not full-set completion.
    pub fn audio(config: &AssetConfig) -> Self {
        let root = Path::new(&config.root);
        let policy = ReadinessPolicy::Subset(vec![
            AssetKey::background_loop(),
            AssetKey::Year(Year::START),
        ]);
        let mut store = Self::new("audio", policy);
        for year in Year::all() {
            store.register(year, root.join(config.audio_path(year)));
        }
        store.register(AssetKey::background_loop(), root.join(&config.loop_clip));
        store.register(AssetKey::ding(), root.join(&config.ding_clip));
        store
    }

    /// Adds a resource to the manifest. The key set is frozen once loading
    /// has started.
    pub fn register(&mut self, key: impl Into<AssetKey>, path: impl Into<PathBuf>) {
        let key = key.into();
        if self.initialized {
            tracing::warn!(store = self.label, %key, "ignoring registration after init");
            return;
        }
        self.manifest.insert(key, path.into());
    }

    /// Starts loading every registered resource.
    ///
    /// `loader` receives the key, path and completion flag of each entry and
    /// returns the handle the store keeps. Calling this twice does nothing.
    pub fn init<F>(&mut self, mut loader: F)
    where
        F: FnMut(&AssetKey, &Path, ReadyFlag) -> H,
    {
        if self.initialized {
            tracing::warn!(store = self.label, "asset store already initialised");
            return;
        }
        self.initialized = true;

        let manifest = std::mem::take(&mut self.manifest);
        for (key, path) in manifest {
            let ready = ReadyFlag::new();
            let handle = loader(&key, path.as_path(), ready.clone());
            self.entries.insert(
                key.clone(),
                AssetEntry {
                    key,
                    path,
                    handle,
                    ready,
                },
            );
        }
        tracing::debug!(store = self.label, count = self.entries.len(), "loading assets");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// True once every tracked entry has finished loading.
    pub fn is_ready(&self) -> bool {
        if !self.initialized {
            return false;
        }
        match &self.policy {
            ReadinessPolicy::All => self.entries.values().all(AssetEntry::is_ready),
            ReadinessPolicy::Subset(keys) => keys
                .iter()
                .all(|key| self.entries.get(key).is_some_and(AssetEntry::is_ready)),
        }
    }

    /// Whether `key` belongs to the store, loaded or not.
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.entries.contains_key(key) || self.manifest.contains_key(key)
    }

    pub fn get(&self, key: &AssetKey) -> Option<&AssetEntry<H>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &AssetKey) -> Option<&mut AssetEntry<H>> {
        self.entries.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &AssetKey> {
        self.entries.keys().chain(self.manifest.keys())
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.manifest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
