//! Pre-allocating strategy.
//!
//! A producer thread keeps a bounded queue topped up with ids drawn from a
//! [`LockGenerator`]; callers dequeue on the hot path. The producer sleeps
//! while the queue is at least half full and is woken by consumers once it
//! drops below that. An empty queue never blocks a caller: it allocates
//! synchronously from the same [`LockGenerator`] instead, which is also how a
//! clock rollback seen by the producer reaches the caller.
//!
//! The producer allocates and enqueues each id under a hand-off lock, and the
//! fallback takes that lock and re-checks the queue before allocating. An id
//! allocated synchronously is therefore newer than everything ever queued
//! before it, and everything queued after it is newer still.
//!
//! Ids sitting in the queue when the process dies are never issued. That
//! wasted sequence space is the price of keeping allocation off the hot path.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle, Thread},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::{
    BitLayout, Error, IdAllocator, Identity, LockGenerator, Poll, RandSource, Result,
    ThreadRandom, TimeSource,
    generator::{Mutex, interface::backoff},
};

/// How long an idle producer sleeps before re-checking the queue on its own.
const PRODUCER_IDLE: Duration = Duration::from_millis(10);

/// How long the producer backs off after a failed allocation.
const PRODUCER_BACKOFF: Duration = Duration::from_millis(100);

/// An allocator that serves ids from a pre-filled, bounded queue.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Allocation work batched off the caller's path
/// - ✅ Ids from one instance are strictly increasing in the order they are
///   handed out, whether dequeued or allocated synchronously
///
/// Dropping the generator stops and joins the producer thread.
///
/// ## See Also
/// - [`LockGenerator`]
/// - [`AtomicGenerator`]
///
/// [`AtomicGenerator`]: crate::AtomicGenerator
pub struct CachedGenerator<T, R = ThreadRandom>
where
    T: TimeSource,
    R: RandSource,
{
    source: Arc<LockGenerator<T, R>>,
    handoff: Arc<Mutex<()>>,
    queue: Receiver<i64>,
    threshold: usize,
    producer: Producer,
}

impl<T, R> CachedGenerator<T, R>
where
    T: TimeSource + Send + Sync + 'static,
    R: RandSource + Send + Sync + 'static,
{
    /// Wraps `source` in a queue of `capacity` ids and starts the producer.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] if `capacity` is zero.
    /// - [`Error::ProducerSpawn`] if the producer thread cannot be started.
    ///
    /// # Example
    /// ```
    /// use keyflake::{BitLayout, CachedGenerator, IdAllocator, Identity, LockGenerator, Resolution, SystemClock};
    ///
    /// let layout = BitLayout::standard(Resolution::Millisecond, 0);
    /// let source = LockGenerator::new(layout, Identity::default(), SystemClock);
    /// let generator = CachedGenerator::new(source, 1024).unwrap();
    ///
    /// let id = generator.next_id().unwrap();
    /// assert!(id > 0);
    /// ```
    pub fn new(source: LockGenerator<T, R>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("cache size must be greater than 0"));
        }

        let source = Arc::new(source);
        let handoff = Arc::new(Mutex::new(()));
        let (tx, rx) = bounded(capacity);
        let threshold = (capacity / 2).max(1);
        let producer = Producer::spawn(
            Arc::clone(&source),
            Arc::clone(&handoff),
            tx,
            threshold,
        )?;

        #[cfg(feature = "tracing")]
        tracing::debug!(capacity, threshold, "started id cache producer");

        Ok(Self {
            source,
            handoff,
            queue: rx,
            threshold,
            producer,
        })
    }
}

impl<T, R> CachedGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    /// Maximum number of ids held in the queue.
    pub fn capacity(&self) -> usize {
        self.queue.capacity().unwrap_or_default()
    }

    /// Ids currently waiting in the queue.
    pub fn cached(&self) -> usize {
        self.queue.len()
    }

    /// Takes a queued id, or allocates one synchronously if the queue is
    /// empty.
    ///
    /// # Errors
    ///
    /// Only the synchronous fallback can fail; see
    /// [`LockGenerator::try_poll_id`].
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<Poll> {
        let polled = match self.queue.try_recv() {
            Ok(id) => Poll::Ready { id },
            Err(_) => self.allocate_unqueued()?,
        };

        if self.queue.len() < self.threshold {
            self.producer.wake();
        }

        Ok(polled)
    }

    fn allocate_unqueued(&self) -> Result<Poll> {
        let _handoff = {
            #[cfg(feature = "parking-lot")]
            {
                self.handoff.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.handoff.lock()?
            }
        };

        // Every id the producer allocated so far is in the queue by now.
        if let Ok(id) = self.queue.try_recv() {
            return Ok(Poll::Ready { id });
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("id cache empty; allocating synchronously");
        self.source.try_poll_id()
    }
}

impl<T, R> IdAllocator for CachedGenerator<T, R>
where
    T: TimeSource,
    R: RandSource,
{
    fn layout(&self) -> &BitLayout {
        self.source.layout()
    }

    fn identity(&self) -> Identity {
        self.source.identity()
    }

    fn try_poll_id(&self) -> Result<Poll> {
        self.try_poll_id()
    }
}

/// Handle to the background thread refilling the queue.
struct Producer {
    shutdown: Arc<AtomicBool>,
    thread: Thread,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    fn spawn<T, R>(
        source: Arc<LockGenerator<T, R>>,
        handoff: Arc<Mutex<()>>,
        tx: Sender<i64>,
        threshold: usize,
    ) -> Result<Self>
    where
        T: TimeSource + Send + Sync + 'static,
        R: RandSource + Send + Sync + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("keyflake-producer".into())
            .spawn(move || produce(&source, &handoff, &tx, threshold, &flag))
            .map_err(|e| Error::ProducerSpawn {
                reason: e.to_string(),
            })?;

        Ok(Self {
            shutdown,
            thread: handle.thread().clone(),
            handle: Some(handle),
        })
    }

    fn wake(&self) {
        self.thread.unpark();
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.thread.unpark();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                #[cfg(feature = "tracing")]
                tracing::error!("id cache producer panicked");
            }
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

fn produce<T, R>(
    source: &LockGenerator<T, R>,
    handoff: &Mutex<()>,
    tx: &Sender<i64>,
    threshold: usize,
    shutdown: &AtomicBool,
) where
    T: TimeSource,
    R: RandSource,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("id cache producer started");

    while !shutdown.load(Ordering::Acquire) {
        if tx.len() < threshold {
            match refill(source, handoff, tx, shutdown) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => break,
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(error = %_e, "id cache refill failed; backing off");
                    thread::park_timeout(PRODUCER_BACKOFF);
                    continue;
                }
            }
        }
        thread::park_timeout(PRODUCER_IDLE);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("id cache producer stopped");
}

/// Tops the queue up to capacity.
///
/// Each id is allocated and enqueued under `handoff`; the lock is released
/// while waiting for the next tick.
fn refill<T, R>(
    source: &LockGenerator<T, R>,
    handoff: &Mutex<()>,
    tx: &Sender<i64>,
    shutdown: &AtomicBool,
) -> Result<Flow>
where
    T: TimeSource,
    R: RandSource,
{
    let capacity = tx.capacity().unwrap_or_default();
    while tx.len() < capacity {
        if shutdown.load(Ordering::Acquire) {
            return Ok(Flow::Stop);
        }

        let yield_for = {
            let _handoff = {
                #[cfg(feature = "parking-lot")]
                {
                    handoff.lock()
                }
                #[cfg(not(feature = "parking-lot"))]
                {
                    handoff.lock()?
                }
            };

            match source.try_poll_id()? {
                Poll::Ready { id } => match tx.try_send(id) {
                    Ok(()) => continue,
                    // Only this thread sends, so the queue cannot fill up
                    // between the length check and here.
                    Err(TrySendError::Full(_)) => break,
                    Err(TrySendError::Disconnected(_)) => return Ok(Flow::Stop),
                },
                Poll::Pending { yield_for } => yield_for,
            }
        };
        backoff(yield_for);
    }
    Ok(Flow::Continue)
}
