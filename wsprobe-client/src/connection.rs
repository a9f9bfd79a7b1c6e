//! Async probe driver
//!
//! Runs a [`Sequencer`] against a live stream: a reader task forwards socket
//! events over a channel while the driver task selects between those events,
//! the pacing tick, the overall deadline and the close watchdog.

use crate::config::ProbeConfig;
use crate::report::ProbeReport;
use crate::sequencer::{Action, ProbeState, Sequencer};
use bytes::Bytes;
use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior, Sleep};
use wsprobe_core::error::TimeoutError;
use wsprobe_core::transport::{Connector, TransportStream};
use wsprobe_core::{Error, Result};

const READ_BUFFER_SIZE: usize = 8192;
const EVENT_CHANNEL_CAPACITY: usize = 64;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Event delivered by the reader task
#[derive(Debug)]
pub enum SocketEvent {
    /// Bytes read from the socket
    Data(Bytes),
    /// The peer closed the socket
    Closed,
    /// Reading failed
    Error(Error),
}

/// A configured probe, ready to run
#[derive(Debug, Clone)]
pub struct Probe {
    config: ProbeConfig,
}

impl Probe {
    /// Create a probe, validating the configuration
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the probe configuration
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Connect through `connector` and run the sequence
    ///
    /// Connection failures are recorded in the report like any other failure.
    #[cfg_attr(
        feature = "logging",
        tracing::instrument(skip(self, connector), fields(host = %self.config.host, port = self.config.port))
    )]
    pub async fn run_with<C: Connector>(&self, connector: &C) -> ProbeReport {
        let started = Instant::now();
        let mut sequencer = Sequencer::new(&self.config);
        sequencer.start();

        let options = self.config.connect_options();
        crate::log_debug!("connecting to {}", options.address());

        let connect = tokio::time::timeout(options.connect_timeout, connector.connect(&options));
        let stream = match connect.await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                sequencer.on_error(&err);
                return sequencer.report(started.elapsed());
            }
            Err(_) => {
                sequencer.on_error(&Error::Timeout(TimeoutError::Connect {
                    timeout: options.connect_timeout,
                }));
                return sequencer.report(started.elapsed());
            }
        };

        self.drive(sequencer, stream, started).await
    }

    /// Run the sequence over an already connected stream
    pub async fn run_on_stream<S: TransportStream>(&self, stream: S) -> ProbeReport {
        let mut sequencer = Sequencer::new(&self.config);
        sequencer.start();
        self.drive(sequencer, stream, Instant::now()).await
    }

    /// Run a prepared sequencer over a connected stream
    pub async fn run_sequencer<S: TransportStream>(
        &self,
        mut sequencer: Sequencer,
        stream: S,
    ) -> ProbeReport {
        sequencer.start();
        self.drive(sequencer, stream, Instant::now()).await
    }

    async fn drive<S: TransportStream>(
        &self,
        mut sequencer: Sequencer,
        stream: S,
        started: Instant,
    ) -> ProbeReport {
        if let Ok(addr) = stream.remote_addr() {
            crate::log_info!("connected to {} (secure: {})", addr, stream.is_secure());
        }
        sequencer.on_connected();

        let (reader, mut writer) = tokio::io::split(stream);
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let reader_task = tokio::spawn(read_loop(reader, tx));

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = sleep(self.config.timeout);
        tokio::pin!(deadline);
        let mut watchdog: Option<Pin<Box<Sleep>>> = None;

        while !sequencer.is_done() {
            let actions = tokio::select! {
                event = rx.recv() => match event {
                    Some(SocketEvent::Data(bytes)) => sequencer.on_data(&bytes),
                    Some(SocketEvent::Error(err)) => {
                        sequencer.on_error(&err);
                        Vec::new()
                    }
                    Some(SocketEvent::Closed) | None => {
                        sequencer.on_closed();
                        Vec::new()
                    }
                },
                _ = ticker.tick() => sequencer.on_tick(),
                _ = &mut deadline, if sequencer.state() < ProbeState::ClosingWatchdog => {
                    sequencer.on_deadline();
                    Vec::new()
                }
                _ = expire(&mut watchdog) => {
                    sequencer.on_watchdog();
                    Vec::new()
                }
            };

            for action in actions {
                match action {
                    Action::Write(bytes) => {
                        if let Err(err) = write_all(&mut writer, &bytes).await {
                            sequencer.on_error(&err);
                            break;
                        }
                    }
                    Action::ArmWatchdog(duration) => {
                        watchdog = Some(Box::pin(sleep(duration)));
                    }
                }
            }
        }

        reader_task.abort();
        let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, writer.shutdown()).await;

        let report = sequencer.report(started.elapsed());
        if report.is_error() {
            crate::log_warn!("probe finished with errors: {}", report);
        } else {
            crate::log_info!("probe finished: {}", report);
        }
        report
    }
}

async fn write_all<S: TransportStream>(writer: &mut WriteHalf<S>, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Resolves when the watchdog fires; never while it is unarmed
async fn expire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

async fn read_loop<R>(mut reader: R, tx: mpsc::Sender<SocketEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => SocketEvent::Closed,
            Ok(n) => SocketEvent::Data(Bytes::copy_from_slice(&buf[..n])),
            Err(err) => SocketEvent::Error(Error::Io(err)),
        };
        let last = !matches!(event, SocketEvent::Data(_));
        if tx.send(event).await.is_err() || last {
            break;
        }
    }
}
