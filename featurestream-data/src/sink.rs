//! The producer half of a feature stream.
//!
//! A [`FeatureSink`] wraps the sending side of a bounded channel. Pushing
//! blocks while the channel is full, which is what keeps the producer from
//! racing ahead of the consumer.

use featurestream_core::{FeatureRecord, StreamError};
use tokio::sync::mpsc;

/// Messages carried from the producer to the consumer handle.
#[derive(Debug)]
pub(crate) enum Message {
    Feature(FeatureRecord),
    Failed(StreamError),
    Finished,
}

/// Why a streaming stage stopped early.
#[derive(Debug)]
pub(crate) enum Halt {
    /// The stage failed; the error is delivered to the consumer.
    Failed(StreamError),
    /// The consumer dropped its handle; nothing more is delivered.
    Disengaged,
}

impl From<StreamError> for Halt {
    fn from(err: StreamError) -> Self {
        Self::Failed(err)
    }
}

/// Sending side of a single feature stream.
#[derive(Debug)]
pub(crate) struct FeatureSink {
    sender: mpsc::Sender<Message>,
    pushed: u64,
}

impl FeatureSink {
    /// Build a sink and the receiver the consumer handle polls.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender, pushed: 0 }, receiver)
    }

    /// Deliver a record, waiting until the consumer has room for it.
    ///
    /// Must not be called from within an asynchronous task.
    pub(crate) fn push(&mut self, record: FeatureRecord) -> Result<(), Halt> {
        self.sender
            .blocking_send(Message::Feature(record))
            .map_err(|_| Halt::Disengaged)?;
        self.pushed += 1;
        Ok(())
    }

    /// Number of records accepted so far.
    pub(crate) const fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Deliver the terminal event for `outcome`, consuming the sink.
    pub(crate) fn finish(self, outcome: Result<(), Halt>) {
        let terminal = match outcome {
            Ok(()) => Message::Finished,
            Err(Halt::Failed(err)) => Message::Failed(err),
            Err(Halt::Disengaged) => return,
        };
        // A consumer that has already gone away has no use for the terminal event.
        if self.sender.blocking_send(terminal).is_err() {
            log::debug!("consumer disengaged before the terminal event");
        }
    }
}
