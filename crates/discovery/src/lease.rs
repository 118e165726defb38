use std::fmt;

use tokio_util::sync::CancellationToken;

/// Opaque identifier of a lease issued by the coordination backend.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LeaseId(u64);

impl LeaseId {
    /// Creates a lease id from its raw backend value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw backend value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Read handle onto a time-bounded liveness claim.
///
/// The issuing backend owns the lease and is the only party that mutates
/// it; worker processes hold cloned read handles. Revocation ends serving.
#[derive(Clone, Debug)]
pub struct Lease {
    id: LeaseId,
    ttl_seconds: u64,
    token: CancellationToken,
}

impl Lease {
    /// Creates a live lease. Called by backend implementations when a
    /// leased registration is established.
    #[must_use]
    pub fn new(id: LeaseId, ttl_seconds: u64) -> Self {
        Self {
            id,
            ttl_seconds,
            token: CancellationToken::new(),
        }
    }

    /// The lease id token.
    #[must_use]
    pub const fn id(&self) -> LeaseId {
        self.id
    }

    /// The time-to-live the lease was requested with.
    #[must_use]
    pub const fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Whether the backend has revoked the lease.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the backend revokes the lease.
    pub async fn revoked(&self) {
        self.token.cancelled().await;
    }

    /// Revokes the lease. Called by the issuing backend on expiry or
    /// explicit revocation; all read handles observe it.
    pub fn revoke(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revocation_is_visible_to_all_handles() {
        let lease = Lease::new(LeaseId::new(7), 30);
        let handle = lease.clone();
        assert!(!handle.is_revoked());

        lease.revoke();

        assert!(handle.is_revoked());
        handle.revoked().await;
        assert_eq!(handle.id(), LeaseId::new(7));
        assert_eq!(handle.ttl_seconds(), 30);
    }
}
