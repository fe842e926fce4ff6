use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ViewerConfig;
use crate::models::StreamDescriptor;

use super::clock::{Clock, ClockTick};
use super::media::MediaHost;
use super::session::{EpisodeSession, ViewCommand, ViewNotice};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const NOTICE_CAPACITY: usize = 32;

/// Handle onto a mounted episode view running on the tokio runtime.
///
/// Dropping the handle stops the view; [`EpisodeView::teardown`] also waits
/// for it to settle.
pub struct EpisodeView {
    id: Uuid,
    clock: Clock,
    commands: mpsc::Sender<ViewCommand>,
    notices: broadcast::Sender<ViewNotice>,
    /// Subscribed before the loop started, so mount-time notices are kept.
    primed: Option<broadcast::Receiver<ViewNotice>>,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Mount a view over `descriptors` and start driving it.
///
/// Must be called from within a tokio runtime.
pub fn mount_episode_view(
    duration: f64,
    descriptors: Vec<StreamDescriptor>,
    host: Arc<dyn MediaHost>,
    config: ViewerConfig,
) -> Result<EpisodeView> {
    let runtime = tokio::runtime::Handle::try_current()
        .context("episode view must be mounted inside a tokio runtime")?;

    let id = Uuid::new_v4();
    let session = EpisodeSession::mount(duration, &descriptors, host.as_ref(), &config);
    let clock = session.clock().clone();

    let (command_tx, command_rx) = mpsc::channel(config.sync.command_buffer.max(1));
    let (notice_tx, primed) = broadcast::channel(NOTICE_CAPACITY);
    let cancel_token = CancellationToken::new();

    let handle = runtime.spawn(view_loop(
        id,
        session,
        command_rx,
        notice_tx.clone(),
        cancel_token.clone(),
        config.sync.reconcile_interval(),
    ));

    log_info!("episode view {id} started");

    Ok(EpisodeView {
        id,
        clock,
        commands: command_tx,
        notices: notice_tx,
        primed: Some(primed),
        cancel_token,
        handle: Some(handle),
    })
}

impl EpisodeView {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }

    pub fn on_clock_tick(&self) -> watch::Receiver<ClockTick> {
        self.clock.subscribe()
    }

    /// Notice stream for the display layer. The first call also yields
    /// everything published since mount.
    pub fn notices(&mut self) -> broadcast::Receiver<ViewNotice> {
        self.primed
            .take()
            .unwrap_or_else(|| self.notices.subscribe())
    }

    pub async fn send(&self, command: ViewCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("episode view has stopped"))
    }

    /// Non-blocking variant for host callbacks that cannot await.
    pub fn dispatch(&self, command: ViewCommand) -> Result<()> {
        self.commands.try_send(command).map_err(|err| match err {
            mpsc::error::TrySendError::Full(command) => {
                anyhow!("episode view command queue full; dropped {command:?}")
            }
            mpsc::error::TrySendError::Closed(_) => anyhow!("episode view has stopped"),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the view: resolve any drag, pause the streams, and wait for the
    /// loop to exit.
    pub async fn teardown(mut self) -> Result<()> {
        self.cancel_token.cancel();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("episode view task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Drop for EpisodeView {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn view_loop(
    id: Uuid,
    mut session: EpisodeSession,
    mut commands: mpsc::Receiver<ViewCommand>,
    notices: broadcast::Sender<ViewNotice>,
    cancel_token: CancellationToken,
    reconcile_every: Duration,
) {
    let mut clock_rx = session.clock().subscribe();
    let mut reconcile = time::interval(reconcile_every);
    reconcile.set_missed_tick_behavior(MissedTickBehavior::Delay);

    publish(&mut session, &notices);

    loop {
        let deadline = session.next_deadline();

        tokio::select! {
            _ = cancel_token.cancelled() => {
                log_debug!("episode view {id} cancelled");
                break;
            }
            command = commands.recv() => match command {
                Some(command) => session.handle(command, Instant::now()),
                None => {
                    log_debug!("episode view command channel closed");
                    break;
                }
            },
            _ = sleep_until(deadline) => session.flush_scrub(Instant::now()),
            _ = reconcile.tick() => session.reconcile(),
            changed = clock_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                clock_rx.borrow_and_update();
                // external writers (host seeks) reach the streams here
                session.propagate();
            }
        }

        publish(&mut session, &notices);
    }

    session.shutdown();
    publish(&mut session, &notices);
    log_info!("episode view {id} stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

fn publish(session: &mut EpisodeSession, notices: &broadcast::Sender<ViewNotice>) {
    for notice in session.drain_notices() {
        // nobody listening is fine
        let _ = notices.send(notice);
    }
}
