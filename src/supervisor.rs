//! Connection supervisor.
//!
//! Owns the whole device lifecycle: register the service, wait for the two
//! HID channels, then run the frame → events → reports loop, returning to
//! the right awaiting state whenever a channel drops. All socket waits are
//! select arms on one task, so channel connects can arrive in either order
//! and a hangup on one never starves the other.

use crate::domain::gestures::GestureInterpreter;
use crate::domain::models::LandmarkFrame;
use crate::domain::settings::Settings;
use crate::hid::encoder::ReportEncoder;
use crate::infrastructure::bluetooth::profile::{ProfileRegistrar, ServiceDescriptor};
use crate::infrastructure::bluetooth::transport::{Channel, ChannelRole, L2capListener};
use crate::infrastructure::frames;
use anyhow::{bail, Context};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Lifecycle of the emulated device. Owned exclusively by the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Unregistered,
    Registered,
    AwaitingControl,
    AwaitingInterrupt,
    Active,
    Closing,
}

/// Awaiting state to re-enter after losing a channel. Losing control tears
/// down the whole session; losing only interrupt keeps control connected.
pub fn state_after_loss(role: ChannelRole) -> ConnectionState {
    match role {
        ChannelRole::Control => ConnectionState::AwaitingControl,
        ChannelRole::Interrupt => ConnectionState::AwaitingInterrupt,
    }
}

/// Largest control/interrupt message we expect from a host (SET_PROTOCOL,
/// LED output reports and the like are all a handful of bytes).
const HOST_MESSAGE_BUF_LEN: usize = 64;

/// What one `select!` round in a connected state resolved to.
enum Step {
    NewControl(Channel),
    NewInterrupt(Channel),
    ControlTraffic(usize),
    ControlLost,
    InterruptTraffic(usize),
    InterruptLost,
    Frame(LandmarkFrame),
    FramesEnded,
    Shutdown,
}

pub struct Supervisor {
    descriptor: ServiceDescriptor,
    interpreter: GestureInterpreter,
    encoder: ReportEncoder,
    frames_rx: mpsc::Receiver<LandmarkFrame>,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
    max_write_failures: u32,
    write_failures: u32,
}

impl Supervisor {
    pub fn new(
        settings: &Settings,
        frames_rx: mpsc::Receiver<LandmarkFrame>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            descriptor: ServiceDescriptor::hid_combo(&settings.device_name),
            interpreter: GestureInterpreter::new(settings.gesture_config()),
            encoder: ReportEncoder::new(),
            frames_rx,
            shutdown,
            state: ConnectionState::Unregistered,
            max_write_failures: settings.max_write_failures,
            write_failures: 0,
        }
    }

    /// Register, listen, supervise. Returns only on shutdown or a fatal
    /// error; either way registration and sockets are released before this
    /// function returns.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let registrar = ProfileRegistrar::connect()
            .await
            .context("Bluetooth daemon is required to advertise the HID service")?;
        let registration = registrar
            .register(&self.descriptor)
            .await
            .context("HID service registration failed")?;
        self.state = ConnectionState::Registered;

        let control_listener =
            L2capListener::bind(ChannelRole::Control, self.descriptor.control_psm)
                .await
                .context("cannot bind HID control PSM")?;
        let interrupt_listener =
            L2capListener::bind(ChannelRole::Interrupt, self.descriptor.interrupt_psm)
                .await
                .context("cannot bind HID interrupt PSM")?;

        let result = self.supervise(&control_listener, &interrupt_listener).await;

        // Teardown runs on every exit path: channels died with supervise,
        // listeners and the registration handle drop here, deregistering
        // the service before the process exits.
        self.state = ConnectionState::Closing;
        drop(registration);
        info!("HID service deregistered, supervisor closed");
        result
    }

    async fn supervise(
        &mut self,
        control_listener: &L2capListener,
        interrupt_listener: &L2capListener,
    ) -> anyhow::Result<()> {
        let mut control: Option<Channel> = None;
        let mut interrupt: Option<Channel> = None;
        self.state = ConnectionState::AwaitingControl;
        info!("waiting for a host to connect");

        loop {
            let step = match self.state {
                ConnectionState::AwaitingControl => {
                    // A session needs both channels; anything left from a
                    // torn-down session is closed here.
                    control = None;
                    interrupt = None;
                    tokio::select! {
                        accepted = control_listener.accept() => Step::NewControl(accepted?),
                        _ = self.shutdown.changed() => Step::Shutdown,
                    }
                }
                ConnectionState::AwaitingInterrupt => {
                    let Some(active_control) = control.as_ref() else {
                        self.state = ConnectionState::AwaitingControl;
                        continue;
                    };
                    let mut buf = [0u8; HOST_MESSAGE_BUF_LEN];
                    tokio::select! {
                        accepted = interrupt_listener.accept() => Step::NewInterrupt(accepted?),
                        // A fresh control connection replaces the old one.
                        accepted = control_listener.accept() => Step::NewControl(accepted?),
                        received = active_control.recv(&mut buf) => match received {
                            Ok(n) => Step::ControlTraffic(n),
                            Err(_) => Step::ControlLost,
                        },
                        _ = self.shutdown.changed() => Step::Shutdown,
                    }
                }
                ConnectionState::Active => {
                    let (Some(active_control), Some(active_interrupt)) =
                        (control.as_ref(), interrupt.as_ref())
                    else {
                        self.state = ConnectionState::AwaitingControl;
                        continue;
                    };
                    let mut control_buf = [0u8; HOST_MESSAGE_BUF_LEN];
                    let mut interrupt_buf = [0u8; HOST_MESSAGE_BUF_LEN];
                    tokio::select! {
                        maybe_frame = self.frames_rx.recv() => match maybe_frame {
                            Some(frame) => Step::Frame(frame),
                            None => Step::FramesEnded,
                        },
                        received = active_control.recv(&mut control_buf) => match received {
                            Ok(n) => Step::ControlTraffic(n),
                            Err(_) => Step::ControlLost,
                        },
                        received = active_interrupt.recv(&mut interrupt_buf) => match received {
                            Ok(n) => Step::InterruptTraffic(n),
                            Err(_) => Step::InterruptLost,
                        },
                        accepted = control_listener.accept() => Step::NewControl(accepted?),
                        accepted = interrupt_listener.accept() => Step::NewInterrupt(accepted?),
                        _ = self.shutdown.changed() => Step::Shutdown,
                    }
                }
                // Only connected states loop here.
                _ => bail!("supervisor entered unexpected state {:?}", self.state),
            };

            match step {
                Step::NewControl(channel) => {
                    if control.is_some() {
                        warn!("replacing existing control channel with {}", channel.peer());
                    }
                    // An interrupt channel cannot outlive its control pair.
                    control = Some(channel);
                    interrupt = None;
                    self.state = ConnectionState::AwaitingInterrupt;
                }
                Step::NewInterrupt(channel) => {
                    if interrupt.is_some() {
                        warn!("replacing existing interrupt channel with {}", channel.peer());
                    }
                    interrupt = Some(channel);
                    self.enter_active();
                }
                Step::ControlTraffic(len) => {
                    debug!("control channel message from host ({} bytes)", len);
                }
                Step::InterruptTraffic(len) => {
                    // Hosts push LED output reports here; nothing to do.
                    debug!("interrupt channel message from host ({} bytes)", len);
                }
                Step::ControlLost => {
                    warn!("control channel lost, awaiting new control connection");
                    control = None;
                    interrupt = None;
                    self.state = state_after_loss(ChannelRole::Control);
                }
                Step::InterruptLost => {
                    warn!("interrupt channel lost, awaiting new interrupt connection");
                    interrupt = None;
                    self.state = state_after_loss(ChannelRole::Interrupt);
                }
                Step::Frame(first) => {
                    let frame = frames::drain_to_latest(&mut self.frames_rx, first);
                    let events = self.interpreter.push_frame(&frame);
                    if events.is_empty() {
                        continue;
                    }
                    let reports = self
                        .encoder
                        .encode(&events)
                        .context("gesture event violated the encoder contract")?;

                    for report in reports {
                        let Some(active_interrupt) = interrupt.as_ref() else {
                            break;
                        };
                        match active_interrupt.send(&report.to_bytes()).await {
                            Ok(()) => self.write_failures = 0,
                            Err(e) => {
                                self.write_failures += 1;
                                warn!(
                                    "report write failed ({} consecutive): {}",
                                    self.write_failures, e
                                );
                                if self.write_failures >= self.max_write_failures {
                                    bail!(
                                        "interrupt channel failed {} consecutive writes",
                                        self.write_failures
                                    );
                                }
                                interrupt = None;
                                self.state = state_after_loss(ChannelRole::Interrupt);
                                break;
                            }
                        }
                    }
                }
                Step::FramesEnded => {
                    info!("frame source ended, shutting down");
                    return Ok(());
                }
                Step::Shutdown => {
                    info!("shutdown signal received");
                    return Ok(());
                }
            }
        }
    }

    fn enter_active(&mut self) {
        self.state = ConnectionState::Active;
        // Stale deltas or a held button bit must never survive into a new
        // session's first report.
        self.interpreter.reset();
        self.encoder.reset();
        info!("both channels connected, session active");
    }
}
