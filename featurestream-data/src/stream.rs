//! The feature stream facade.
//!
//! [`stream_features`] returns a [`FeatureStream`] without touching the
//! filesystem. The first poll starts a producer that sniffs the file,
//! routes it to the matching streamer and pushes records through a bounded
//! channel. The producer runs on Tokio's blocking pool when a runtime is
//! available and on a dedicated thread otherwise.
//!
//! # Runtime behaviour
//!
//! Every stage is synchronous and blocks while the channel is full, so the
//! producer is never more than [`StreamOptions::channel_capacity`] records
//! ahead of the consumer. Dropping the handle closes the channel; the
//! producer notices on its next push and releases its file handles and
//! temporary directories.

use std::{
    pin::Pin,
    task::{Context, Poll, ready},
    thread,
};

use camino::{Utf8Path, Utf8PathBuf};
use featurestream_core::{FeatureRecord, FileType, StreamError, StreamOptions};
use futures_util::stream::{FusedStream, Stream};
use log::{debug, warn};
use thiserror::Error;
use tokio::{runtime::Handle, sync::mpsc};

use crate::{
    archive,
    decode::VectorKind,
    geojson_file,
    sink::{FeatureSink, Halt, Message},
    sniff::sniff,
    tabular,
};

const PRODUCER_THREAD: &str = "featurestream-producer";

/// Reported when the producer ends without a terminal event.
#[derive(Debug, Error)]
#[error("feature producer stopped before completing the stream")]
struct ProducerStopped;

/// Stream the features stored at `path` with default options.
///
/// # Examples
/// ```no_run
/// use futures_util::StreamExt;
///
/// # async fn run() -> Result<(), featurestream_core::StreamError> {
/// let mut features = featurestream_data::stream_features("parks.geojson");
/// while let Some(feature) = features.next().await {
///     println!("{:?}", feature?.geometry_type());
/// }
/// # Ok(())
/// # }
/// ```
pub fn stream_features(path: impl Into<Utf8PathBuf>) -> FeatureStream {
    stream_features_with(path, StreamOptions::default())
}

/// Stream the features stored at `path` using `options`.
pub fn stream_features_with(
    path: impl Into<Utf8PathBuf>,
    options: StreamOptions,
) -> FeatureStream {
    FeatureStream {
        state: State::Pending(Request {
            path: path.into(),
            options,
        }),
    }
}

/// Everything a producer needs to serve one stream.
#[derive(Debug)]
struct Request {
    path: Utf8PathBuf,
    options: StreamOptions,
}

impl Request {
    fn run(&self, sink: &mut FeatureSink) -> Result<(), Halt> {
        let file_type = sniff(&self.path, self.options.sniff_probe_bytes())?;
        debug!("dispatching {} as {file_type}", self.path);
        dispatch(sink, &self.path, &file_type, &self.options)
    }
}

fn dispatch(
    sink: &mut FeatureSink,
    path: &Utf8Path,
    file_type: &FileType,
    options: &StreamOptions,
) -> Result<(), Halt> {
    match file_type {
        FileType::GeoJson => geojson_file::stream(sink, path),
        FileType::Csv => tabular::stream(sink, path, VectorKind::Csv, options),
        FileType::Shapefile => tabular::stream(sink, path, VectorKind::Shapefile, options),
        FileType::Zip => archive::stream(sink, path, options),
        FileType::Unrecognized(tag) => Err(Halt::Failed(StreamError::invalid(format!(
            "Unknown file type \"{tag}\": accepts .geojson, .csv, or .shp (zipped or unzipped)"
        )))),
    }
}

fn produce(request: Request, mut sink: FeatureSink) {
    let outcome = request.run(&mut sink);
    match &outcome {
        Ok(()) => debug!("finished streaming {}", request.path),
        Err(Halt::Failed(err)) => debug!("streaming {} failed: {err}", request.path),
        Err(Halt::Disengaged) => debug!("consumer released the stream for {}", request.path),
    }
    sink.finish(outcome);
}

fn spawn_producer(request: Request) -> mpsc::Receiver<Message> {
    let (sink, receiver) = FeatureSink::channel(request.options.channel_capacity());
    if let Ok(handle) = Handle::try_current() {
        // The join handle is not needed: completion is signalled through the channel.
        drop(handle.spawn_blocking(move || produce(request, sink)));
    } else {
        let spawned = thread::Builder::new()
            .name(PRODUCER_THREAD.to_owned())
            .spawn(move || produce(request, sink));
        if let Err(err) = spawned {
            warn!("failed to start the feature producer: {err}");
        }
    }
    receiver
}

/// Lifecycle of a [`FeatureStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Created but never polled; no I/O has happened.
    Pending,
    /// A producer is running or has records waiting.
    Active,
    /// The terminal event has been delivered.
    Closed,
}

#[derive(Debug)]
enum State {
    Pending(Request),
    Active(mpsc::Receiver<Message>),
    Closed,
}

/// A lazy, pull-based stream of feature records.
///
/// Yields `Ok` records in source order, then ends either cleanly or with
/// exactly one `Err`. Nothing is yielded after the terminal event.
#[derive(Debug)]
#[must_use = "streams do nothing until polled"]
pub struct FeatureStream {
    state: State,
}

impl FeatureStream {
    /// Current lifecycle stage.
    #[must_use]
    pub fn state(&self) -> StreamState {
        match self.state {
            State::Pending(_) => StreamState::Pending,
            State::Active(_) => StreamState::Active,
            State::Closed => StreamState::Closed,
        }
    }

    /// Consume the stream from synchronous code.
    ///
    /// The iterator blocks the calling thread while it waits for records and
    /// must not be driven from inside an asynchronous task.
    pub fn into_blocking_iter(self) -> BlockingFeatures {
        BlockingFeatures { stream: self }
    }

    fn start(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Closed);
        self.state = match state {
            State::Pending(request) => State::Active(spawn_producer(request)),
            other => other,
        };
    }

    fn settle(&mut self, message: Option<Message>) -> Option<Result<FeatureRecord, StreamError>> {
        match message {
            Some(Message::Feature(record)) => Some(Ok(record)),
            Some(Message::Finished) => {
                self.state = State::Closed;
                None
            }
            Some(Message::Failed(err)) => {
                self.state = State::Closed;
                Some(Err(err))
            }
            None => {
                self.state = State::Closed;
                Some(Err(StreamError::system(ProducerStopped)))
            }
        }
    }
}

impl Stream for FeatureStream {
    type Item = Result<FeatureRecord, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.start();
        let State::Active(receiver) = &mut this.state else {
            return Poll::Ready(None);
        };
        let message = ready!(receiver.poll_recv(cx));
        Poll::Ready(this.settle(message))
    }
}

impl FusedStream for FeatureStream {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Closed)
    }
}

/// Blocking adapter returned by [`FeatureStream::into_blocking_iter`].
#[derive(Debug)]
pub struct BlockingFeatures {
    stream: FeatureStream,
}

impl Iterator for BlockingFeatures {
    type Item = Result<FeatureRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.start();
        let State::Active(receiver) = &mut self.stream.state else {
            return None;
        };
        let message = receiver.blocking_recv();
        self.stream.settle(message)
    }
}
