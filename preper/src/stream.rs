// SPDX-License-Identifier: MIT

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::error::PackError;

/// Number of events to buffer in the channel.
/// Lets the producer read ahead of the consumer by a few chunks without
/// unbounded memory growth.
pub(crate) const CHANNEL_CAPACITY: usize = 4;

/// An item of a [`PackStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackEvent {
    /// The prepare phase finished (or was skipped). Sent once, before any data.
    Prepared,
    /// A chunk of the gzip'd tarball.
    Data(Bytes),
}

/// A [`Stream`] of lifecycle events and archive bytes for one pack operation.
///
/// Ends with `None` on success. On failure exactly one `Err` is yielded and
/// the stream is fused afterwards. Dropping the stream stops the producer at
/// its next send.
#[derive(Debug)]
pub struct PackStream {
    rx: mpsc::Receiver<Result<PackEvent, PackError>>,
    finished: bool,
}

impl Stream for PackStream {
    type Item = Result<PackEvent, PackError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let item = std::task::ready!(self.rx.poll_recv(cx));
        match &item {
            Some(Err(_)) | None => {
                self.finished = true;
                self.rx.close();
            }
            Some(Ok(_)) => {}
        }
        Poll::Ready(item)
    }
}

/// Producer side of a [`PackStream`].
#[derive(Debug)]
pub(crate) struct PackSink {
    tx: mpsc::Sender<Result<PackEvent, PackError>>,
}

impl PackSink {
    pub(crate) async fn prepared(&self) -> Result<(), PackError> {
        self.send(Ok(PackEvent::Prepared)).await
    }

    pub(crate) async fn data(&self, chunk: Bytes) -> Result<(), PackError> {
        self.send(Ok(PackEvent::Data(chunk))).await
    }

    /// Report the terminal error. Consumes the sink so nothing can follow it.
    pub(crate) async fn fail(self, err: PackError) {
        // A consumer that went away does not need to hear about it.
        let _ = self.tx.send(Err(err)).await;
    }

    async fn send(&self, item: Result<PackEvent, PackError>) -> Result<(), PackError> {
        self.tx.send(item).await.map_err(|_| PackError::Closed)
    }
}

pub(crate) fn channel(capacity: usize) -> (PackSink, PackStream) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        PackSink { tx },
        PackStream {
            rx,
            finished: false,
        },
    )
}
