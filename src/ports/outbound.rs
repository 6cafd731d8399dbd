//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{Activity, ActivityKind, Bill, DomainError, Media, User};

/// User repository port. One query per call.
#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new row and return its id. Does not check e-mail uniqueness.
    async fn insert_user(&self, user: &User) -> Result<i64, DomainError>;

    /// Overwrite every column of the row identified by `user.id`.
    async fn update_user(&self, user: &User) -> Result<(), DomainError>;

    async fn delete_user(&self, id: i64) -> Result<(), DomainError>;

    async fn all_users(&self) -> Result<Vec<User>, DomainError>;

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, DomainError>;

    /// Exact match on `email`.
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    async fn user_by_alias(&self, alias: &str) -> Result<Option<User>, DomainError>;

    async fn user_by_confirmation(&self, code: &str) -> Result<Option<User>, DomainError>;

    /// Number of users whose e-mail equals `email`, ignoring case.
    async fn count_by_email_ci(&self, email: &str) -> Result<u64, DomainError>;

    async fn alias_taken(&self, alias: &str) -> Result<bool, DomainError>;

    /// Users whose name or e-mail contains `key` (literal substring), in id order.
    async fn search_users(&self, key: &str) -> Result<Vec<User>, DomainError>;
}

/// Bill (proposição) repository port.
#[async_trait::async_trait]
pub trait BillRepo: Send + Sync {
    async fn insert_bill(&self, bill: &Bill) -> Result<i64, DomainError>;

    async fn update_bill(&self, bill: &Bill) -> Result<(), DomainError>;

    async fn delete_bill(&self, id: i64) -> Result<(), DomainError>;

    async fn all_bills(&self) -> Result<Vec<Bill>, DomainError>;

    async fn bill_by_id(&self, id: i64) -> Result<Option<Bill>, DomainError>;

    async fn bill_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError>;
}

/// Activity feed port.
#[async_trait::async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn record_activity(
        &self,
        owner_id: i64,
        kind: &ActivityKind,
    ) -> Result<Activity, DomainError>;

    /// Activities of `owner_id`, newest (highest id) first.
    async fn activities_by_owner(&self, owner_id: i64) -> Result<Vec<Activity>, DomainError>;
}

/// Media store port (avatars).
#[async_trait::async_trait]
pub trait MediaRepo: Send + Sync {
    async fn insert_media(&self, path: &str) -> Result<Media, DomainError>;

    async fn media_by_id(&self, id: i64) -> Result<Option<Media>, DomainError>;

    async fn delete_media(&self, id: i64) -> Result<(), DomainError>;
}

/// One-way password encoding. The same input always yields the same output.
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, plain: &str) -> String;
}

/// Câmara dos Deputados web service. Returns bills already mapped from the XML payload.
#[async_trait::async_trait]
pub trait BillFeed: Send + Sync {
    /// List bills of type `sigla` (e.g. "PL") presented in `year`.
    async fn list_bills(&self, sigla: &str, year: i32) -> Result<Vec<Bill>, DomainError>;

    /// Fetch one bill by its chamber id. `None` when the payload holds no bill.
    async fn bill_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError>;
}
