//! Delivery channel for rendered messages.

use std::future::Future;

/// A connected (and, when required, authenticated) mail channel.
///
/// Implementations own the wire protocol; a message only hands over the
/// envelope addresses and the rendered content.
pub trait Transport {
    /// Error returned by the channel.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Declares the envelope sender and every recipient.
    fn send_envelope(
        &mut self,
        from: &str,
        recipients: &[&str],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Transmits the rendered message content.
    fn send_data(&mut self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
