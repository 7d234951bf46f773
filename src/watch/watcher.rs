//! Long-lived watches that feed a [`ResourceEventHandler`]
//!
//! Each watch runs on its own task. `kube::runtime::watcher` owns the
//! list/watch protocol, including reconnects and relists after the stream
//! breaks; this module only turns its events into add/update/delete calls.

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use kube::api::Api;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::Resource;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::handler::{object_key, ResourceEventHandler};

/// A change derived from the watch stream
#[derive(Clone, Debug, PartialEq)]
pub enum Notification<K> {
    Added(K),
    Modified { old: K, new: K },
    Deleted(K),
}

/// Last-seen state of every object in one watch.
///
/// The watch API only reports "applied", so the tracker decides whether an
/// object is new or modified. After a relist, objects that vanished while the
/// stream was down are reported as deleted.
#[derive(Debug)]
pub struct ChangeTracker<K> {
    known: BTreeMap<String, K>,
    relisting: Option<BTreeMap<String, K>>,
}

impl<K> Default for ChangeTracker<K> {
    fn default() -> Self {
        Self {
            known: BTreeMap::new(),
            relisting: None,
        }
    }
}

impl<K: Resource + Clone> ChangeTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    pub fn apply(&mut self, event: Event<K>) -> Vec<Notification<K>> {
        match event {
            Event::Apply(obj) => vec![self.upsert(obj)],
            Event::Delete(obj) => {
                self.known.remove(&object_key(&obj));
                vec![Notification::Deleted(obj)]
            }
            Event::Init => {
                self.relisting = Some(BTreeMap::new());
                Vec::new()
            }
            Event::InitApply(obj) => match self.relisting.as_mut() {
                Some(listed) => {
                    listed.insert(object_key(&obj), obj);
                    Vec::new()
                }
                None => vec![self.upsert(obj)],
            },
            Event::InitDone => {
                let listed = self.relisting.take().unwrap_or_default();
                self.replace(listed)
            }
        }
    }

    fn upsert(&mut self, obj: K) -> Notification<K> {
        match self.known.insert(object_key(&obj), obj.clone()) {
            Some(old) => Notification::Modified { old, new: obj },
            None => Notification::Added(obj),
        }
    }

    fn replace(&mut self, listed: BTreeMap<String, K>) -> Vec<Notification<K>> {
        let mut notifications = Vec::new();
        let previous = std::mem::take(&mut self.known);

        for (key, old) in &previous {
            if !listed.contains_key(key) {
                notifications.push(Notification::Deleted(old.clone()));
            }
        }

        for (key, obj) in &listed {
            match previous.get(key) {
                None => notifications.push(Notification::Added(obj.clone())),
                Some(old) if old.meta().resource_version != obj.meta().resource_version => {
                    notifications.push(Notification::Modified {
                        old: old.clone(),
                        new: obj.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        self.known = listed;
        notifications
    }
}

/// Handle for one running watch.
///
/// Stopping is single-shot and consumes the handle. Dropping the handle
/// also ends the watch.
pub struct WatchHandle {
    kind: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the watch loop to exit and wait for it
    pub async fn stop(self) {
        if self.stop.send(()).is_err() {
            warn!(kind = %self.kind, "Watch loop had already exited");
        }
        if let Err(e) = self.task.await {
            error!(kind = %self.kind, "Watch task failed: {}", e);
        }
    }
}

/// Starts watches against the cluster API
pub struct ResourceWatcher;

impl ResourceWatcher {
    /// List then watch every object visible through `api`, with no resync.
    pub fn watch<K, H>(kind: &str, api: Api<K>, handler: Arc<H>) -> WatchHandle
    where
        K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
        H: ResourceEventHandler<K> + ?Sized + 'static,
    {
        let stream = watcher::watcher(api, watcher::Config::default()).default_backoff();
        Self::watch_stream(kind, stream, handler)
    }

    /// Drive an arbitrary event stream on a new task
    pub fn watch_stream<K, S, E, H>(kind: &str, stream: S, handler: Arc<H>) -> WatchHandle
    where
        K: Resource + Clone + Send + Sync + 'static,
        S: Stream<Item = Result<Event<K>, E>> + Send + 'static,
        E: Display + Send + 'static,
        H: ResourceEventHandler<K> + ?Sized + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run_watch(kind.to_string(), stream, handler, stop_rx));
        WatchHandle {
            kind: kind.to_string(),
            stop: stop_tx,
            task,
        }
    }
}

/// Deliver notifications from `stream` to `handler` until stopped.
///
/// Handler errors are logged and do not end the watch.
pub async fn run_watch<K, S, E, H>(
    kind: String,
    stream: S,
    handler: Arc<H>,
    mut stop: oneshot::Receiver<()>,
) where
    K: Resource + Clone + Send + Sync,
    S: Stream<Item = Result<Event<K>, E>>,
    E: Display,
    H: ResourceEventHandler<K> + ?Sized,
{
    let mut stream = std::pin::pin!(stream);
    let mut tracker = ChangeTracker::new();

    info!(kind = %kind, "Starting watch");

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!(kind = %kind, "Stopping watch");
                break;
            }
            next = stream.next() => {
                match next {
                    Some(Ok(event)) => {
                        for notification in tracker.apply(event) {
                            dispatch(&kind, handler.as_ref(), notification).await;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(kind = %kind, "Watch stream error: {}", e);
                    }
                    None => {
                        warn!(kind = %kind, "Watch stream ended");
                        break;
                    }
                }
            }
        }
    }
}

async fn dispatch<K, H>(kind: &str, handler: &H, notification: Notification<K>)
where
    K: Resource + Send + Sync,
    H: ResourceEventHandler<K> + ?Sized,
{
    let (result, key) = match &notification {
        Notification::Added(obj) => (handler.on_add(obj).await, object_key(obj)),
        Notification::Modified { old, new } => {
            (handler.on_update(old, new).await, object_key(new))
        }
        Notification::Deleted(obj) => (handler.on_delete(obj).await, object_key(obj)),
    };

    if let Err(e) = result {
        error!(kind = %kind, "Error handling event for {}: {}", key, e);
    }
}
