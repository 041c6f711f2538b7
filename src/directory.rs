//! External party lookup — the boundary to whatever owns professional and
//! client records. The engine only needs three facts about a professional
//! (rate, status, timezone) plus best-effort display names for enrichment.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use ulid::Ulid;

/// Whether a professional's profile accepts new bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfessionalStatus {
    Active,
    Inactive,
    Suspended,
}

/// The slice of a professional's profile the engine consumes.
#[derive(Debug, Clone)]
pub struct ProfessionalProfile {
    pub hourly_rate: Decimal,
    pub status: ProfessionalStatus,
    /// IANA zone id, e.g. `Europe/Helsinki`. May be invalid — normalization
    /// degrades to UTC.
    pub timezone: String,
}

/// Lookup failure at the directory boundary. Treated as infrastructure:
/// profile lookups propagate it, display-name enrichment swallows it.
#[derive(Debug)]
pub struct DirectoryError(pub String);

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "directory lookup failed: {}", self.0)
    }
}

impl std::error::Error for DirectoryError {}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve a professional's profile. `Ok(None)` means no such
    /// professional; `Err` means the backing store is unavailable.
    async fn professional(&self, id: Ulid) -> Result<Option<ProfessionalProfile>, DirectoryError>;

    /// Display name for any party (client or professional).
    async fn display_name(&self, party_id: Ulid) -> Result<Option<String>, DirectoryError>;
}

/// Map-backed directory for tests and single-process embedding.
#[derive(Default)]
pub struct InMemoryDirectory {
    profiles: DashMap<Ulid, ProfessionalProfile>,
    names: DashMap<Ulid, String>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_professional(&self, id: Ulid, profile: ProfessionalProfile) {
        self.profiles.insert(id, profile);
    }

    pub fn insert_name(&self, party_id: Ulid, name: impl Into<String>) {
        self.names.insert(party_id, name.into());
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn professional(&self, id: Ulid) -> Result<Option<ProfessionalProfile>, DirectoryError> {
        Ok(self.profiles.get(&id).map(|e| e.value().clone()))
    }

    async fn display_name(&self, party_id: Ulid) -> Result<Option<String>, DirectoryError> {
        Ok(self.names.get(&party_id).map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_lookups() {
        let dir = InMemoryDirectory::new();
        let id = Ulid::new();
        dir.insert_professional(
            id,
            ProfessionalProfile {
                hourly_rate: Decimal::from(80),
                status: ProfessionalStatus::Active,
                timezone: "UTC".into(),
            },
        );
        dir.insert_name(id, "Dr. Vasquez");

        let profile = dir.professional(id).await.unwrap().unwrap();
        assert_eq!(profile.hourly_rate, Decimal::from(80));
        assert_eq!(dir.display_name(id).await.unwrap().as_deref(), Some("Dr. Vasquez"));
        assert!(dir.professional(Ulid::new()).await.unwrap().is_none());
    }
}
