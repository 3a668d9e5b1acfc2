use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of actor a [`Pkr`] identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrincipalKind {
    Kernel,
    TopLevelSubsystem,
    ChildSubsystem,
    Friend,
    Resource,
}

/// Public Key Record: an immutable identity reference. Once minted, every
/// field is final; identity never mutates in place, it is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pkr {
    pub uuid: Uuid,
    pub kind: PrincipalKind,
    pub metadata: serde_json::Value,
    pub issuer: Option<Uuid>,
    pub expires_at: Option<u64>,
}

impl Pkr {
    pub fn new(kind: PrincipalKind) -> Self {
        Self { uuid: Uuid::new_v4(), kind, metadata: serde_json::Value::Null, issuer: None, expires_at: None }
    }

    pub fn new_kernel() -> Self {
        Self::new(PrincipalKind::Kernel)
    }

    pub fn issued_by(mut self, issuer: Uuid) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn expiring_in_secs(mut self, secs: u64) -> Self {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        self.expires_at = Some(now + secs);
        self
    }

    pub fn is_expired_at(&self, now_secs: u64) -> bool {
        self.expires_at.map(|exp| now_secs >= exp).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pkr_has_no_expiry() {
        let pkr = Pkr::new_kernel();
        assert_eq!(pkr.kind, PrincipalKind::Kernel);
        assert!(pkr.expires_at.is_none());
        assert!(!pkr.is_expired_at(u64::MAX));
    }

    #[test]
    fn expiry_is_checked_against_a_supplied_clock() {
        let pkr = Pkr::new(PrincipalKind::Friend).expiring_in_secs(0);
        assert!(pkr.is_expired_at(pkr.expires_at.unwrap()));
    }
}
