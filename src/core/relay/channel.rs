//! Duplex byte channels shared between the two copy tasks of a relay session.
//!
//! A [`Channel`] can be read by one task, written by another and closed by
//! either. Closing wakes any pending read or write on the channel, so the task
//! blocked on it observes end-of-stream (reads) or a broken pipe (writes) and
//! exits.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

/// One endpoint of a relay session
#[async_trait]
pub trait Channel: Send + Sync {
    /// Read into `buf`, returning `Ok(0)` on end-of-stream or once the channel is closed
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write from `buf`, returning how many bytes were accepted
    async fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Write the whole buffer
    async fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf).await? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole buffer",
                    ))
                }
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    /// Close the channel. Calling it again is a no-op.
    fn close(&self);

    /// Whether [`Channel::close`] has been called
    fn is_closed(&self) -> bool;

    /// Human readable name used in logs
    fn describe(&self) -> String;
}

/// Latched close flag that async tasks can wait on
#[derive(Debug)]
pub struct CloseSignal {
    tx: watch::Sender<bool>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Latch the signal. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal is latched
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns once the flag is set.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "channel closed")
}

/// [`Channel`] over a pair of tokio reader/writer halves.
///
/// TCP connections use this with `OwnedReadHalf`/`OwnedWriteHalf`; tests use
/// it over `tokio::io::duplex` to stand in for a serial device.
pub struct StreamChannel<R, W> {
    reader: Mutex<Option<R>>,
    writer: Mutex<Option<W>>,
    closed: CloseSignal,
    label: String,
}

impl<R, W> StreamChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, label: impl Into<String>) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            writer: Mutex::new(Some(writer)),
            closed: CloseSignal::new(),
            label: label.into(),
        }
    }
}

impl<S> StreamChannel<tokio::io::ReadHalf<S>, tokio::io::WriteHalf<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Split a duplex stream into a channel
    pub fn from_stream(stream: S, label: impl Into<String>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer, label)
    }
}

#[async_trait]
impl<R, W> Channel for StreamChannel<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut guard = self.reader.lock().await;
        if self.closed.is_closed() {
            guard.take();
            return Ok(0);
        }
        let Some(reader) = guard.as_mut() else {
            return Ok(0);
        };

        let outcome = tokio::select! {
            biased;
            _ = self.closed.closed() => None,
            result = reader.read(buf) => Some(result),
        };

        match outcome {
            Some(result) => result,
            None => {
                guard.take();
                Ok(0)
            }
        }
    }

    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.writer.lock().await;
        if self.closed.is_closed() {
            if let Some(mut writer) = guard.take() {
                let _ = writer.shutdown().await;
            }
            return Err(closed_error());
        }
        let Some(writer) = guard.as_mut() else {
            return Err(closed_error());
        };

        let outcome = tokio::select! {
            biased;
            _ = self.closed.closed() => None,
            result = async {
                let n = writer.write(buf).await?;
                writer.flush().await?;
                Ok::<usize, io::Error>(n)
            } => Some(result),
        };

        match outcome {
            Some(result) => result,
            None => {
                if let Some(mut writer) = guard.take() {
                    let _ = writer.shutdown().await;
                }
                Err(closed_error())
            }
        }
    }

    fn close(&self) {
        if !self.closed.close() {
            return;
        }
        // Halves held by an in-flight operation are released by that operation.
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
