//! Cooperative cancellation of a streaming session.
//!
//! A [`CancellationController`] is armed for exactly one session.  It watches an
//! [`InterruptSource`] from a background task and flips a
//! [`CancellationToken`] the first time an interrupt arrives.  The decode loop
//! polls the token between reads.  Dropping the controller stops the watcher,
//! so an interrupt delivered after the session ends is not seen by it.

use std::future::Future;
use std::pin::Pin;

use futures::future;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::INTERRUPTS;

/// A future that resolves when the next interrupt is delivered.
pub type Interrupt = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Something that delivers user interrupts.
pub trait InterruptSource: Send + Sync {
    /// Subscribe to the next interrupt delivered after this call.
    fn subscribe(&self) -> Interrupt;
}

/// Interrupts raised by code, e.g. an embedding application or a test.
///
/// Like [`CtrlC`], an interrupt reaches only the sessions armed when it is
/// raised.  One raised while no session is armed is dropped.
#[derive(Clone, Debug)]
pub struct Interrupter {
    sender: broadcast::Sender<()>,
}

impl Interrupter {
    /// Creates a source with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(4);
        Self { sender }
    }

    /// Interrupt every currently armed session.
    pub fn interrupt(&self) {
        let _ = self.sender.send(());
    }
}

impl Default for Interrupter {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptSource for Interrupter {
    fn subscribe(&self) -> Interrupt {
        let mut receiver = self.sender.subscribe();
        Box::pin(async move {
            match receiver.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => future::pending::<()>().await,
            }
        })
    }
}

/// Process-wide Ctrl+C delivery.
///
/// The OS handler is installed once per process and fans each interrupt out to
/// whichever sessions are subscribed at that moment.  With no subscriber the
/// interrupt is dropped rather than terminating the process.
#[derive(Clone, Debug)]
pub struct CtrlC {
    interrupter: Interrupter,
}

impl CtrlC {
    /// Install the Ctrl+C handler.
    ///
    /// Fails if a handler is already installed for this process.
    pub fn install() -> Result<Self> {
        let interrupter = Interrupter::new();
        let handler = interrupter.clone();
        ctrlc::set_handler(move || handler.interrupt())
            .map_err(|e| Error::signal(format!("could not install Ctrl+C handler: {e}")))?;
        Ok(Self { interrupter })
    }
}

impl InterruptSource for CtrlC {
    fn subscribe(&self) -> Interrupt {
        self.interrupter.subscribe()
    }
}

/// The stop signal of one streaming session.
#[derive(Debug)]
pub struct CancellationController {
    token: CancellationToken,
    observer: JoinHandle<()>,
}

impl CancellationController {
    /// Begin observing `source`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(source: &dyn InterruptSource) -> Self {
        let token = CancellationToken::new();
        let interrupt = source.subscribe();
        let trigger = token.clone();
        let observer = tokio::spawn(async move {
            interrupt.await;
            INTERRUPTS.click();
            trigger.cancel();
        });
        Self { token, observer }
    }

    /// Whether an interrupt has been observed.
    pub fn triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once an interrupt has been observed.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

impl Drop for CancellationController {
    fn drop(&mut self) {
        self.observer.abort();
    }
}
