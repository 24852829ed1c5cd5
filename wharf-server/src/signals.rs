//! `spec.md` §6's signal contract: `SIGHUP` reloads, `SIGTERM`/`SIGINT`
//! request a clean exit, `SIGUSR2` dumps the component tree. Wired with
//! `tokio::signal::unix`, replacing the teacher's raw `libc::signal` call
//! with the tokio-native equivalent (see `DESIGN.md`'s dependency-drop
//! note for `libc`).

use tokio::signal::unix::{signal, SignalKind};

/// What woke the control loop up.
pub enum ControlEvent {
    Reload,
    Shutdown,
    DumpTree,
}

/// One registration per signal kind; `next()` resolves to whichever fires
/// first. Kept as a struct (rather than a free function spawning tasks) so
/// the control loop can `tokio::select!` it alongside a run-time deadline
/// and other futures without losing already-registered signal state.
pub struct SignalListener {
    hangup: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    user2: tokio::signal::unix::Signal,
}

impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            hangup: signal(SignalKind::hangup())?,
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            user2: signal(SignalKind::user_defined2())?,
        })
    }

    pub async fn next(&mut self) -> ControlEvent {
        tokio::select! {
            _ = self.hangup.recv() => ControlEvent::Reload,
            _ = self.terminate.recv() => ControlEvent::Shutdown,
            _ = self.interrupt.recv() => ControlEvent::Shutdown,
            _ = self.user2.recv() => ControlEvent::DumpTree,
        }
    }
}
