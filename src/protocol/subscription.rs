//! Subscription parameters.

use super::message::Destination;

/// Default maximum quality of service for new subscriptions.
const DEFAULT_QOS: u8 = 2;

/// Parameters of a `Subscribe` request.
///
/// # Example
///
/// ```
/// use jsonmsg::Subscription;
///
/// let subscription = Subscription::topic("audit", "logs/#")
///     .with_durable(true)
///     .with_shared(1);
///
/// assert_eq!(subscription.qos(), 2);
/// assert_eq!(subscription.shared(), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    name: String,
    destination: Destination,
    durable: bool,
    shared: u8,
    nolocal: bool,
    qos: u8,
}

impl Subscription {
    /// Creates a subscription.
    #[must_use]
    pub fn new(name: impl Into<String>, destination: Destination) -> Self {
        Self {
            name: name.into(),
            destination,
            durable: false,
            shared: 0,
            nolocal: false,
            qos: DEFAULT_QOS,
        }
    }

    /// Creates a topic subscription.
    #[inline]
    #[must_use]
    pub fn topic(name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::new(name, Destination::Topic(topic.into()))
    }

    /// Creates a queue subscription.
    #[inline]
    #[must_use]
    pub fn queue(name: impl Into<String>, queue: impl Into<String>) -> Self {
        Self::new(name, Destination::Queue(queue.into()))
    }

    /// Keeps the subscription when the client disconnects.
    #[must_use]
    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Sets the shared mode. Values other than 1 and 2 mean not shared.
    #[must_use]
    pub fn with_shared(mut self, shared: u8) -> Self {
        self.shared = shared;
        self
    }

    /// Suppresses this client's own publications. Ignored when shared.
    #[must_use]
    pub fn with_nolocal(mut self, nolocal: bool) -> Self {
        self.nolocal = nolocal;
        self
    }

    /// Sets the maximum quality of service, clamped to 2.
    #[must_use]
    pub fn with_qos(mut self, qos: u8) -> Self {
        self.qos = qos.min(2);
        self
    }

    /// Subscription name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination.
    #[inline]
    #[must_use]
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Returns `true` if durable.
    #[inline]
    #[must_use]
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Shared mode, if the subscription is shared.
    #[inline]
    #[must_use]
    pub fn shared(&self) -> Option<u8> {
        matches!(self.shared, 1 | 2).then_some(self.shared)
    }

    /// Returns `true` if local publications are suppressed.
    #[inline]
    #[must_use]
    pub fn is_nolocal(&self) -> bool {
        self.nolocal
    }

    /// Maximum quality of service.
    #[inline]
    #[must_use]
    pub fn qos(&self) -> u8 {
        self.qos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_out_of_range_is_unshared() {
        assert_eq!(Subscription::topic("s", "t").with_shared(3).shared(), None);
        assert_eq!(Subscription::topic("s", "t").with_shared(2).shared(), Some(2));
        assert_eq!(Subscription::topic("s", "t").shared(), None);
    }

    #[test]
    fn test_defaults() {
        let subscription = Subscription::queue("s", "q");
        assert_eq!(subscription.qos(), 2);
        assert!(!subscription.is_durable());
        assert!(!subscription.is_nolocal());
        assert!(subscription.destination().is_queue());
    }
}
