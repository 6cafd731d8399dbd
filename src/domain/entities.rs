//! Domain entities. Pure data structures for the core business.
//!
//! No SQL/HTTP types here; adapters map rows and feed payloads into these.

use crate::domain::DomainError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Display name used when a user has neither a name nor an alias.
pub const NO_NAME: &str = "----";

/// Storage format for `created_at` / `updated_at` columns (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const INVALID_ROLE: &str = "Usuário com permissão inválida";

/// User role. Stored as an integer column; values are part of the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Default,
    Admin,
    Colaborador,
}

impl Role {
    pub fn as_i64(self) -> i64 {
        match self {
            Role::Default => 0,
            Role::Admin => 1,
            Role::Colaborador => 2,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Role::Default),
            1 => Some(Role::Admin),
            2 => Some(Role::Colaborador),
            _ => None,
        }
    }

    /// Human-readable label shown on profile pages.
    pub fn description(self) -> &'static str {
        match self {
            Role::Default => "Usuário",
            Role::Admin => "Admin",
            Role::Colaborador => "Colaborador",
        }
    }
}

/// Account status. Stored as an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Disabled,
    Active,
    Waiting,
    NoAccount,
}

impl UserStatus {
    pub fn as_i64(self) -> i64 {
        match self {
            UserStatus::Disabled => 0,
            UserStatus::Active => 1,
            UserStatus::Waiting => 2,
            UserStatus::NoAccount => 3,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(UserStatus::Disabled),
            1 => Some(UserStatus::Active),
            2 => Some(UserStatus::Waiting),
            3 => Some(UserStatus::NoAccount),
            _ => None,
        }
    }
}

/// A registered user (row of `users`). `id` is `None` until inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub name: Option<String>,
    /// Encoded password, never plaintext.
    pub password: Option<String>,
    pub avatar_id: Option<i64>,
    pub alias: Option<String>,
    pub bio: Option<String>,
    pub city: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub confirmation: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            email: String::new(),
            name: None,
            password: None,
            avatar_id: None,
            alias: None,
            bio: None,
            city: None,
            role: Role::Colaborador,
            status: UserStatus::Disabled,
            confirmation: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl User {
    /// Trimmed name, falling back to the alias, then to [`NO_NAME`].
    pub fn display_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or("").trim();
        if !name.is_empty() {
            return name.to_string();
        }
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => NO_NAME.to_string(),
        }
    }

    /// Display name, or the e-mail when the user has no usable name.
    pub fn name_or_email(&self) -> String {
        let name = self.display_name();
        if name == NO_NAME {
            self.email.clone()
        } else {
            name
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn role_description(&self) -> &'static str {
        self.role.description()
    }

    /// Only plain users can be promoted to collaborator.
    pub fn can_authorize(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !self.has_role(Role::Default) {
            errors.push(INVALID_ROLE.to_string());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Promote to [`Role::Colaborador`]. Role is untouched on error.
    pub fn authorize(&mut self) -> Result<(), DomainError> {
        self.can_authorize()
            .map_err(|errors| DomainError::InvalidRoleTransition(errors.join(",")))?;
        self.role = Role::Colaborador;
        Ok(())
    }

    /// Only collaborators can be demoted back to plain users.
    pub fn can_deauthorize(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !self.has_role(Role::Colaborador) {
            errors.push(INVALID_ROLE.to_string());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Demote to [`Role::Default`]. Role is untouched on error.
    pub fn deauthorize(&mut self) -> Result<(), DomainError> {
        self.can_deauthorize()
            .map_err(|errors| DomainError::InvalidRoleTransition(errors.join(",")))?;
        self.role = Role::Default;
        Ok(())
    }

    /// Store a pending confirmation code; the account waits until it is checked.
    pub fn set_confirmation(&mut self, code: String) {
        self.confirmation = Some(code);
        self.status = UserStatus::Waiting;
    }
}

/// Input for registering a new account. `password` is plaintext here.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Result row of a user search: id plus the field that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMatch {
    pub id: i64,
    pub text: String,
}

/// A legislative bill (proposição) tracked by the Câmara dos Deputados.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    /// External id assigned by the chamber (`idProposicao`).
    pub camara_id: i64,
}

/// Stored media file (user avatars).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub path: String,
}

impl Media {
    /// Path of a rendition. `Some("thumb")` turns `a/b.png` into `a/b_thumb.png`.
    /// Returns `None` when no path is stored.
    pub fn path_for(&self, style: Option<&str>) -> Option<String> {
        if self.path.is_empty() {
            return None;
        }
        let style = match style {
            Some(s) if !s.is_empty() => s,
            _ => return Some(self.path.clone()),
        };
        let file_start = self.path.rfind('/').map(|i| i + 1).unwrap_or(0);
        match self.path[file_start..].rfind('.') {
            Some(dot) if dot > 0 => {
                let dot = file_start + dot;
                Some(format!("{}_{}{}", &self.path[..dot], style, &self.path[dot..]))
            }
            _ => Some(format!("{}_{}", self.path, style)),
        }
    }
}

/// What happened in a user's activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    Registered,
    AccountConfirmed,
    PasswordReset,
    AvatarChanged { media_id: i64 },
    RoleChanged { from: Role, to: Role },
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Registered => write!(f, "registered"),
            ActivityKind::AccountConfirmed => write!(f, "account confirmed"),
            ActivityKind::PasswordReset => write!(f, "password reset"),
            ActivityKind::AvatarChanged { media_id } => write!(f, "avatar changed (media {})", media_id),
            ActivityKind::RoleChanged { from, to } => {
                write!(f, "role changed: {} -> {}", from.description(), to.description())
            }
        }
    }
}

/// Entry of a user's activity feed (row of `activity`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub owner_id: i64,
    pub kind: ActivityKind,
    pub created_at: Option<NaiveDateTime>,
}
