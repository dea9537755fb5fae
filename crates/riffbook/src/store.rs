//! Progress store adapter.
//!
//! The store holds one [`UserData`] document per user and offers two
//! operations: a live subscription that yields full snapshots, and a
//! field-level merge write. [`SqliteStore`] implements both on top of
//! [`Storage`]; writes made by other processes are picked up by polling the
//! document revision.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{PartialUpdate, UserData};
use crate::storage::{Storage, StorageStats};

/// A remote document store holding one document per user.
#[async_trait]
pub trait ProgressStore: Send + Sync + fmt::Debug {
    /// Subscribe to a user's document.
    ///
    /// The subscription yields the current snapshot first (empty if the
    /// document does not exist), then a new snapshot after every change,
    /// including changes made by this process.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store cannot be read.
    async fn subscribe(&self, user_id: &str) -> Result<Subscription>;

    /// Merge the present fields of `update` into a user's document.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    async fn update(&self, user_id: &str, update: &PartialUpdate) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Snapshot {
    revision: i64,
    data: UserData,
}

/// Publishing side of a subscription.
///
/// Snapshots are conflated: a slow subscriber only ever sees the latest one.
#[derive(Debug)]
pub struct SnapshotFeed {
    tx: watch::Sender<Snapshot>,
}

impl SnapshotFeed {
    /// Create a feed holding an initial snapshot.
    #[must_use]
    pub fn new(revision: i64, data: UserData) -> Self {
        let (tx, _) = watch::channel(Snapshot { revision, data });
        Self { tx }
    }

    /// Open a new subscription on this feed.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            primed: false,
        }
    }

    /// Publish a snapshot if it is newer than the current one.
    ///
    /// Returns `true` if subscribers were notified.
    pub fn publish(&self, revision: i64, data: UserData) -> bool {
        self.tx.send_if_modified(|current| {
            if revision > current.revision {
                *current = Snapshot { revision, data };
                true
            } else {
                false
            }
        })
    }

    /// Publish a snapshot if its revision differs from the current one.
    ///
    /// Used for what was read back from storage, where a lower revision
    /// means the document was deleted.
    pub fn replace(&self, revision: i64, data: UserData) -> bool {
        self.tx.send_if_modified(|current| {
            if revision == current.revision {
                false
            } else {
                *current = Snapshot { revision, data };
                true
            }
        })
    }

    /// Revision of the latest published snapshot.
    #[must_use]
    pub fn revision(&self) -> i64 {
        self.tx.borrow().revision
    }

    /// True when every subscription has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// A live stream of snapshots of one user's document.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
    primed: bool,
}

impl Subscription {
    /// Wait for the next snapshot.
    ///
    /// The first call returns immediately with the current snapshot. Returns
    /// `None` once the store side has shut down.
    pub async fn next(&mut self) -> Option<UserData> {
        if self.primed {
            self.rx.changed().await.ok()?;
        } else {
            self.primed = true;
        }
        Some(self.rx.borrow_and_update().data.clone())
    }

    /// The next snapshot if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<UserData> {
        if self.has_changed() {
            self.primed = true;
            Some(self.rx.borrow_and_update().data.clone())
        } else {
            None
        }
    }

    /// The latest snapshot, without waiting.
    #[must_use]
    pub fn latest(&self) -> UserData {
        self.rx.borrow().data.clone()
    }

    /// True when a snapshot newer than the last one returned is available.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        !self.primed || self.rx.has_changed().unwrap_or(false)
    }
}

/// `SQLite`-backed progress store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    storage: Mutex<Storage>,
    app_id: String,
    poll_interval: Duration,
    feeds: Mutex<HashMap<String, Arc<SnapshotFeed>>>,
}

impl SqliteStore {
    /// Wrap an opened storage.
    #[must_use]
    pub fn new(storage: Storage, app_id: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage: Mutex::new(storage),
                app_id: app_id.into(),
                poll_interval,
                feeds: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Open the store described by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        Ok(Self::new(
            storage,
            config.storage.app_id.clone(),
            config.poll_interval(),
        ))
    }

    /// The application id documents are keyed under.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.inner.app_id
    }

    /// Storage statistics for a user's document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self, user_id: &str) -> Result<StorageStats> {
        lock(&self.inner.storage)?.stats(&self.inner.app_id, user_id)
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn subscribe(&self, user_id: &str) -> Result<Subscription> {
        let inner = Arc::clone(&self.inner);
        let owned = user_id.to_string();
        let (subscription, started) = blocking(move || inner.join_or_open(&owned))
            .await
            .map_err(|e| {
                warn!(user_id, error = %e, "Failed to read document for subscription");
                Error::store_unavailable(e.to_string())
            })?;

        match started {
            Some(feed) => {
                info!(user_id, revision = feed.revision(), "Subscribed to document");
                tokio::spawn(watch_document(
                    Arc::clone(&self.inner),
                    user_id.to_string(),
                    feed,
                ));
            }
            None => debug!(user_id, "Joined existing document subscription"),
        }
        Ok(subscription)
    }

    async fn update(&self, user_id: &str, update: &PartialUpdate) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let owned = user_id.to_string();
        let update = update.clone();
        blocking(move || inner.write(&owned, &update))
            .await
            .map_err(|e| {
                error!(user_id, error = %e, "Failed to write document");
                Error::store_unavailable(e.to_string())
            })
    }
}

// Lock order is storage, then feeds. Snapshots are published while the
// storage lock is held, so feeds see writes in the order they hit the
// database.
impl Inner {
    fn load(&self, storage: &Storage, user_id: &str) -> Result<Snapshot> {
        Ok(storage
            .load_document(&self.app_id, user_id)?
            .map(|doc| Snapshot {
                revision: doc.revision,
                data: doc.data,
            })
            .unwrap_or_default())
    }

    /// Join the user's live feed, or open one. The new feed is returned so
    /// the caller can start its poller.
    fn join_or_open(&self, user_id: &str) -> Result<(Subscription, Option<Arc<SnapshotFeed>>)> {
        let storage = lock(&self.storage)?;
        let mut feeds = lock(&self.feeds)?;
        if let Some(feed) = feeds.get(user_id) {
            if !feed.is_closed() {
                return Ok((feed.subscribe(), None));
            }
        }

        let snapshot = self.load(&storage, user_id)?;
        let feed = Arc::new(SnapshotFeed::new(snapshot.revision, snapshot.data));
        let subscription = feed.subscribe();
        feeds.insert(user_id.to_string(), Arc::clone(&feed));
        Ok((subscription, Some(feed)))
    }

    fn write(&self, user_id: &str, update: &PartialUpdate) -> Result<()> {
        let storage = lock(&self.storage)?;
        storage.merge_document(&self.app_id, user_id, update)?;
        let snapshot = self.load(&storage, user_id)?;

        if let Some(feed) = lock(&self.feeds)?.get(user_id) {
            if feed.publish(snapshot.revision, snapshot.data) {
                debug!(user_id, revision = snapshot.revision, "Published local write");
            }
        }
        Ok(())
    }

    /// Publish the stored document if its revision differs from the feed's.
    ///
    /// A lower revision means the document was deleted (revision 0) or
    /// deleted and written again.
    fn refresh(&self, user_id: &str, feed: &SnapshotFeed) -> Result<Option<i64>> {
        let storage = lock(&self.storage)?;
        let revision = storage.revision(&self.app_id, user_id)?.unwrap_or(0);
        if revision == feed.revision() {
            return Ok(None);
        }

        let snapshot = self.load(&storage, user_id)?;
        let revision = snapshot.revision;
        Ok(feed.replace(revision, snapshot.data).then_some(revision))
    }
}

/// Run `SQLite` work off the async worker threads.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::internal(format!("storage task failed: {e}")))?
}

/// Poll a document's revision and publish snapshots written elsewhere.
///
/// Exits once every subscription on the feed has been dropped.
async fn watch_document(inner: Arc<Inner>, user_id: String, feed: Arc<SnapshotFeed>) {
    let mut ticker = tokio::time::interval(inner.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = feed.closed() => {
                debug!(user_id = %user_id, "Document subscription closed");
                break;
            }
            _ = ticker.tick() => {
                let (store, owned, watched) = (Arc::clone(&inner), user_id.clone(), Arc::clone(&feed));
                match blocking(move || store.refresh(&owned, &watched)).await {
                    Ok(Some(revision)) => {
                        debug!(user_id = %user_id, revision, "Published external write");
                    }
                    Ok(None) => {}
                    Err(e) => warn!(user_id = %user_id, error = %e, "Failed to poll document"),
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::internal("store lock poisoned"))
}
