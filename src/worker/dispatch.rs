//! Event loop driving a [`CacheRouter`]
//!
//! Lifecycle events run one at a time in arrival order. Fetch, sync, push and
//! click events are spawned onto their own tasks, so a slow network never
//! holds up the queue.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use super::notification::{ClickOutcome, Notification, NotificationClick};
use super::router::{ActivateOutcome, CacheRouter, FetchOutcome, InstallOutcome, SyncOutcome};
use crate::error::{Error, Result};
use crate::http::Request;

const EVENT_QUEUE_DEPTH: usize = 64;

/// Events delivered by the host
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { payload: Option<Vec<u8>> },
    NotificationClick(NotificationClick),
}

impl WorkerEvent {
    fn is_lifecycle(&self) -> bool {
        matches!(self, WorkerEvent::Install | WorkerEvent::Activate)
    }
}

/// Reply to one [`WorkerEvent`]
#[derive(Debug, Clone)]
pub enum WorkerReply {
    Installed(InstallOutcome),
    Activated(ActivateOutcome),
    Fetched(FetchOutcome),
    Synced(SyncOutcome),
    Notified(Option<Notification>),
    Clicked(ClickOutcome),
}

struct Envelope {
    event: WorkerEvent,
    reply: oneshot::Sender<Result<WorkerReply>>,
}

/// Handle to a running worker loop
pub struct WorkerHandle {
    router: Arc<CacheRouter>,
    sender: mpsc::Sender<Envelope>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn spawn(router: CacheRouter) -> Self {
        let router = Arc::new(router);
        let (sender, receiver) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let task = tokio::spawn(run(router.clone(), receiver));
        Self {
            router,
            sender,
            task,
        }
    }

    pub fn router(&self) -> &CacheRouter {
        &self.router
    }

    /// Deliver one event and wait for its reply
    pub async fn dispatch(&self, event: WorkerEvent) -> Result<WorkerReply> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(Envelope { event, reply })
            .await
            .map_err(|_| Error::WorkerGone)?;
        receiver.await.map_err(|_| Error::WorkerGone)?
    }

    pub async fn install(&self) -> Result<InstallOutcome> {
        match self.dispatch(WorkerEvent::Install).await? {
            WorkerReply::Installed(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn activate(&self) -> Result<ActivateOutcome> {
        match self.dispatch(WorkerEvent::Activate).await? {
            WorkerReply::Activated(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn fetch(&self, request: Request) -> Result<FetchOutcome> {
        match self.dispatch(WorkerEvent::Fetch(request)).await? {
            WorkerReply::Fetched(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn sync(&self, tag: impl Into<String>) -> Result<SyncOutcome> {
        match self.dispatch(WorkerEvent::Sync { tag: tag.into() }).await? {
            WorkerReply::Synced(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn push(&self, payload: Option<Vec<u8>>) -> Result<Option<Notification>> {
        match self.dispatch(WorkerEvent::Push { payload }).await? {
            WorkerReply::Notified(notification) => Ok(notification),
            other => Err(unexpected(other)),
        }
    }

    pub async fn notification_click(&self, click: NotificationClick) -> Result<ClickOutcome> {
        match self.dispatch(WorkerEvent::NotificationClick(click)).await? {
            WorkerReply::Clicked(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    /// Stop accepting events and wait for in-flight ones to finish
    pub async fn shutdown(self) -> Result<Arc<CacheRouter>> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| Error::Other(format!("worker loop panicked: {}", e)))?;
        Ok(self.router)
    }
}

fn unexpected(reply: WorkerReply) -> Error {
    Error::Other(format!("unexpected worker reply: {:?}", reply))
}

async fn run(router: Arc<CacheRouter>, mut receiver: mpsc::Receiver<Envelope>) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            envelope = receiver.recv() => {
                let Some(Envelope { event, reply }) = envelope else {
                    break;
                };
                if event.is_lifecycle() {
                    let _ = reply.send(handle(&router, event).await);
                } else {
                    let router = router.clone();
                    in_flight.spawn(async move {
                        let _ = reply.send(handle(&router, event).await);
                    });
                }
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    log::debug!("Worker loop stopped");
}

async fn handle(router: &CacheRouter, event: WorkerEvent) -> Result<WorkerReply> {
    Ok(match event {
        WorkerEvent::Install => WorkerReply::Installed(router.install().await?),
        WorkerEvent::Activate => WorkerReply::Activated(router.activate().await?),
        WorkerEvent::Fetch(request) => WorkerReply::Fetched(router.fetch(&request).await),
        WorkerEvent::Sync { tag } => WorkerReply::Synced(router.sync(&tag)),
        WorkerEvent::Push { payload } => WorkerReply::Notified(router.push(payload.as_deref())),
        WorkerEvent::NotificationClick(click) => {
            WorkerReply::Clicked(router.notification_click(&click))
        }
    })
}
