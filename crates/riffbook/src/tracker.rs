//! The tracker session.
//!
//! [`Tracker`] keeps a local copy of the user's document. Writes are merged
//! into the local copy first and then sent to the store; the local copy is
//! a cache that the next subscription snapshot overwrites.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identity::UserSession;
use crate::model::{PartialUpdate, UserData};
use crate::store::{ProgressStore, Subscription};

/// A user's live view of their document.
#[derive(Debug)]
pub struct Tracker {
    store: Arc<dyn ProgressStore>,
    session: UserSession,
    subscription: Subscription,
    data: UserData,
}

impl Tracker {
    /// Subscribe to the user's document and wait for the first snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the subscription cannot be opened or
    /// closes before yielding a snapshot.
    pub async fn open(store: Arc<dyn ProgressStore>, session: UserSession) -> Result<Self> {
        let mut subscription = store.subscribe(&session.user_id).await?;
        let data = subscription
            .next()
            .await
            .ok_or_else(|| Error::store_unavailable("subscription closed before first snapshot"))?;

        debug!(
            user_id = %session.user_id,
            plans = data.plans.len(),
            entries = data.progress.len(),
            "Tracker opened"
        );
        Ok(Self {
            store,
            session,
            subscription,
            data,
        })
    }

    /// The local copy of the document.
    #[must_use]
    pub fn data(&self) -> &UserData {
        &self.data
    }

    /// The user this tracker acts for.
    #[must_use]
    pub fn session(&self) -> &UserSession {
        &self.session
    }

    /// Apply an update: merge locally, then write it to the store.
    ///
    /// The local merge is kept even if the write fails; the next snapshot
    /// from the subscription brings the two back in line.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the write fails.
    pub async fn apply(&mut self, update: PartialUpdate) -> Result<()> {
        self.data.apply(&update);

        if let Err(e) = self.store.update(&self.session.user_id, &update).await {
            warn!(
                user_id = %self.session.user_id,
                error = %e,
                "Write failed; local state diverges until the next snapshot"
            );
            return Err(match e {
                Error::StoreUnavailable { .. } => e,
                other => Error::store_unavailable(other.to_string()),
            });
        }
        Ok(())
    }

    /// Replace the local copy with a snapshot from the store.
    pub fn reconcile(&mut self, snapshot: UserData) {
        if snapshot != self.data {
            debug!(user_id = %self.session.user_id, "Local state replaced by snapshot");
        }
        self.data = snapshot;
    }

    /// Take the latest snapshot if one arrived since the last sync.
    ///
    /// Returns `true` if the local copy was replaced.
    pub fn sync(&mut self) -> bool {
        match self.subscription.try_next() {
            Some(snapshot) => {
                self.reconcile(snapshot);
                true
            }
            None => false,
        }
    }

    /// Wait for the next snapshot and reconcile with it.
    ///
    /// Returns `false` once the subscription has ended.
    pub async fn next_snapshot(&mut self) -> bool {
        match self.subscription.next().await {
            Some(snapshot) => {
                self.reconcile(snapshot);
                true
            }
            None => false,
        }
    }
}
