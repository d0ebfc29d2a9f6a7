//! Response body wrapper that reports completion.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Buf;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use super::lifecycle::Exchange;

pin_project! {
    /// The body of every response passing through
    /// [`RequestLogService`](super::RequestLogService).
    ///
    /// Frames are forwarded untouched. Reaching end of stream, or handing
    /// over the last byte of a body with a known length, logs
    /// `request finish`; being dropped before that (or yielding an error)
    /// logs `request socket closed`.
    pub struct LoggedBody<B> {
        #[pin]
        inner: B,
        exchange: Option<Exchange>,
        remaining: Option<u64>,
    }
}

impl<B: Body> LoggedBody<B> {
    /// `declared` is the response's `content-length`, if any; without it the
    /// body's exact size hint is used. hyper stops polling a known-length
    /// body once that many bytes are written, so completion is counted here
    /// rather than waiting for end of stream.
    ///
    /// A body that is already complete (empty, or the response to `HEAD`)
    /// may never be polled, so it finishes here. Its duration does not
    /// include writing the response head.
    pub(crate) fn new(inner: B, mut exchange: Exchange, complete: bool, declared: Option<u64>) -> Self {
        let remaining = declared.or_else(|| inner.size_hint().exact());
        if complete || remaining == Some(0) || inner.is_end_stream() {
            exchange.finish();
        }
        Self { inner, exchange: Some(exchange), remaining }
    }
}

impl<B: Body> Body for LoggedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        match &frame {
            None => finish(this.exchange),
            Some(Ok(frame)) => {
                if let (Some(remaining), Some(data)) = (this.remaining.as_mut(), frame.data_ref()) {
                    *remaining = remaining.saturating_sub(data.remaining() as u64);
                }
                if *this.remaining == Some(0) || this.inner.is_end_stream() {
                    finish(this.exchange);
                }
            }
            // Dropping the exchange logs the close.
            Some(Err(_)) => drop(this.exchange.take()),
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

fn finish(exchange: &mut Option<Exchange>) {
    if let Some(mut exchange) = exchange.take() {
        exchange.finish();
    }
}
