//! Input dispatch: filter -> reassembler -> (callback | queue).
//!
//! - Driver thread: [`InputDispatch::on_raw_event`]
//! - Application thread: polling, callback switching, ignore flags
//!
//! The driver side never waits on the application beyond the short
//! producer lock that port open/close also take. The user callback runs with
//! no lock held.

use crate::config::InputConfig;
use crate::error::{Error, ErrorCallback, Result};
use crate::filter::IgnoreFlags;
use crate::message::{status, MidiMessage};
use crate::queue::{message_queue, QueueConsumer, QueueProducer};
use crate::sysex::{Anomaly, Fragment, SysexReassembler};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Handler invoked on the driver thread for every delivered message.
///
/// Whatever the closure captures plays the role of the user data.
/// The handler must not block and must not open or close the port it is
/// invoked from.
pub(crate) struct InputCallback {
    handler: Box<dyn Fn(&MidiMessage) + Send + Sync>,
}

impl InputCallback {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&MidiMessage) + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
        }
    }

    #[inline]
    pub fn call(&self, message: &MidiMessage) {
        (self.handler)(message)
    }
}

impl std::fmt::Debug for InputCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputCallback").finish_non_exhaustive()
    }
}

/// State only the driver thread touches while a port is open.
struct ProducerState {
    queue: QueueProducer,
    reassembler: SysexReassembler,
    last_timestamp: Option<Duration>,
}

/// Shared between a backend's driver thread and the application.
///
/// Backends hold it in an `Arc` and call [`on_raw_event`](Self::on_raw_event)
/// from their own thread; the facade calls everything else.
pub struct InputDispatch {
    producer: Mutex<ProducerState>,
    consumer: Mutex<QueueConsumer>,
    callback: ArcSwapOption<InputCallback>,
    /// Serializes callback set/cancel against each other.
    switch: Mutex<()>,
    ignore: AtomicU8,
    open: AtomicBool,
    error_callback: ArcSwapOption<ErrorCallback>,
}

impl InputDispatch {
    pub fn new(config: &InputConfig) -> Result<Self> {
        config.validate()?;
        let (queue, consumer) = message_queue(config.queue_size_limit)?;
        Ok(Self {
            producer: Mutex::new(ProducerState {
                queue,
                reassembler: SysexReassembler::new(),
                last_timestamp: None,
            }),
            consumer: Mutex::new(consumer),
            callback: ArcSwapOption::empty(),
            switch: Mutex::new(()),
            ignore: AtomicU8::new(config.ignore.to_bits()),
            open: AtomicBool::new(false),
            error_callback: ArcSwapOption::empty(),
        })
    }

    /// Default configuration with a different queue bound.
    pub fn with_capacity(queue_size_limit: usize) -> Result<Self> {
        Self::new(&InputConfig {
            queue_size_limit,
            ..Default::default()
        })
    }

    /// Entry point for the backend driver thread.
    ///
    /// `timestamp` is the driver's monotonic clock for this packet; it is
    /// turned into the delta since the previous accepted packet. Packets
    /// arriving outside `port_opened`/`port_closed` are dropped.
    pub fn on_raw_event(&self, bytes: &[u8], timestamp: Duration) {
        let Some(&first) = bytes.first() else {
            trace!("Dropping empty MIDI packet");
            return;
        };
        let flags = self.ignore_flags();
        let mut warnings: SmallVec<[Error; 2]> = SmallVec::new();

        let mut state = self.producer.lock();
        // Checked under the producer lock so nothing lands after `port_closed`.
        if !self.is_port_open() {
            trace!(len = bytes.len(), "Dropping MIDI packet with no port open");
            return;
        }
        let (consumed, cut) = state.reassembler.skip_continuation(bytes);
        if consumed {
            trace!(len = bytes.len(), "Skipping continuation of ignored sysex");
            return;
        }
        warnings.extend(cut.map(anomaly_warning));
        if flags.should_ignore(first, state.reassembler.is_accumulating()) {
            if first == status::SYSEX_START {
                warnings.extend(state.reassembler.skip(bytes).map(anomaly_warning));
            }
            drop(state);
            trace!(status = first, "Ignoring MIDI message");
            self.report_all(&warnings);
            return;
        }

        let delta = match state.last_timestamp {
            Some(previous) => timestamp.saturating_sub(previous).as_secs_f64(),
            None => 0.0,
        };
        state.last_timestamp = Some(timestamp);

        let (fragment, anomaly) = state.reassembler.feed(bytes);
        if let Some(anomaly) = anomaly {
            warnings.push(anomaly_warning(anomaly));
        }
        let message = match fragment {
            Fragment::Complete(bytes) => Some(MidiMessage::new(delta, bytes)),
            Fragment::Pending | Fragment::Dropped => None,
        };

        if let Some(message) = message {
            match self.callback.load_full() {
                Some(callback) => {
                    drop(state);
                    self.report_all(&warnings);
                    callback.call(&message);
                    return;
                }
                None => {
                    if !state.queue.push(message) {
                        warnings.push(Error::Warning("message queue limit reached".to_string()));
                    }
                }
            }
        }
        drop(state);
        self.report_all(&warnings);
    }

    /// Called by the backend right before it starts delivering packets.
    pub fn port_opened(&self) {
        let mut state = self.producer.lock();
        state.reassembler.reset();
        state.last_timestamp = None;
        self.open.store(true, Ordering::Release);
        debug!("Input dispatch attached to port");
    }

    pub fn port_closed(&self) {
        let mut state = self.producer.lock();
        state.reassembler.reset();
        self.open.store(false, Ordering::Release);
        debug!("Input dispatch detached from port");
    }

    #[inline]
    pub fn is_port_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Pops the oldest queued message.
    ///
    /// Returns the empty record when nothing is queued. Fails while a
    /// callback is installed or while no port is open.
    pub fn get_message(&self) -> Result<MidiMessage> {
        if self.has_callback() {
            return Err(Error::invalid_use(
                "get_message called while a callback is set",
            ));
        }
        if !self.is_port_open() {
            return Err(Error::invalid_use("get_message called with no port open"));
        }
        Ok(self.consumer.lock().pop())
    }

    /// Messages currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.consumer.lock().occupied()
    }

    pub fn queue_size_limit(&self) -> usize {
        self.consumer.lock().capacity()
    }

    /// Switches to callback delivery. Messages already queued stay queued.
    pub fn set_callback<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&MidiMessage) + Send + Sync + 'static,
    {
        let _switch = self.switch.lock();
        if self.callback.load().is_some() {
            return Err(Error::invalid_use(
                "a callback is already set; cancel it first",
            ));
        }
        self.callback.store(Some(Arc::new(InputCallback::new(handler))));
        debug!("Input callback installed");
        Ok(())
    }

    /// Switches back to queueing.
    ///
    /// A delivery already running on the driver thread finishes with the
    /// old handler; later messages are queued.
    pub fn cancel_callback(&self) -> Result<()> {
        let _switch = self.switch.lock();
        if self.callback.swap(None).is_none() {
            return Err(Error::invalid_use("no callback is set"));
        }
        debug!("Input callback cancelled");
        Ok(())
    }

    #[inline]
    pub fn has_callback(&self) -> bool {
        self.callback.load().is_some()
    }

    /// Sets which categories are discarded on arrival.
    pub fn ignore_types(&self, sysex: bool, timing: bool, active_sensing: bool) {
        self.set_ignore_flags(IgnoreFlags::new(sysex, timing, active_sensing));
    }

    pub fn set_ignore_flags(&self, flags: IgnoreFlags) {
        self.ignore.store(flags.to_bits(), Ordering::Release);
        debug!(?flags, "Input ignore flags updated");
    }

    #[inline]
    pub fn ignore_flags(&self) -> IgnoreFlags {
        IgnoreFlags::from_bits(self.ignore.load(Ordering::Acquire))
    }

    /// Installs the observer for warnings raised on the driver thread.
    pub fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        self.error_callback.store(callback.map(Arc::new));
    }

    /// Reports a warning or error raised outside of a direct call.
    ///
    /// Goes to the error callback if one is installed; always logged.
    pub fn report(&self, error: &Error) {
        warn!("{error}");
        if let Some(callback) = self.error_callback.load_full() {
            callback.report(error);
        }
    }

    fn report_all(&self, errors: &[Error]) {
        for error in errors {
            self.report(error);
        }
    }
}

fn anomaly_warning(anomaly: Anomaly) -> Error {
    if anomaly.is_debug() {
        Error::DebugWarning(anomaly.to_string())
    } else {
        Error::Warning(anomaly.to_string())
    }
}

impl std::fmt::Debug for InputDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDispatch")
            .field("open", &self.is_port_open())
            .field("callback", &self.has_callback())
            .field("ignore", &self.ignore_flags())
            .finish_non_exhaustive()
    }
}
