//! User accounts: registration, aliases, confirmation, passwords, avatars, roles.
//!
//! Each method issues one or a few repository calls; timestamps are stamped here
//! (UTC, second precision) rather than by the storage layer.

use crate::domain::alias::{alias_base, alias_candidate};
use crate::domain::secrets;
use crate::domain::{
    Activity, ActivityKind, DomainError, NewUser, Role, User, UserMatch, UserStatus,
};
use crate::ports::{ActivityRepo, MediaRepo, PasswordEncoder, UserRepo};
use chrono::{NaiveDateTime, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Site-level values needed to render user links.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Site root without trailing slash, e.g. `https://plenario.org.br`.
    pub base_url: String,
    /// Avatar path used when a user has none.
    pub default_avatar: String,
}

fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

pub struct UserService {
    users: Arc<dyn UserRepo>,
    activity: Arc<dyn ActivityRepo>,
    media: Arc<dyn MediaRepo>,
    encoder: Arc<dyn PasswordEncoder>,
    site: SiteSettings,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        activity: Arc<dyn ActivityRepo>,
        media: Arc<dyn MediaRepo>,
        encoder: Arc<dyn PasswordEncoder>,
        site: SiteSettings,
    ) -> Self {
        Self {
            users,
            activity,
            media,
            encoder,
            site,
        }
    }

    /// Register a new account. The password is encoded and the alias generated
    /// before the single insert.
    pub async fn create(&self, new_user: NewUser) -> Result<User, DomainError> {
        let email = new_user.email.trim();
        if email.is_empty() || new_user.password.is_empty() {
            return Err(DomainError::Validation(
                "e-mail and password are required".into(),
            ));
        }

        let mut user = User {
            email: email.to_string(),
            name: new_user.name,
            password: Some(self.encrypt_password(&new_user.password)),
            ..User::default()
        };
        self.ensure_alias(&mut user, false).await?;
        self.insert(&mut user).await?;

        if let Some(id) = user.id {
            self.activity
                .record_activity(id, &ActivityKind::Registered)
                .await?;
        }
        Ok(user)
    }

    /// Insert `user` and assign its id. Rejects e-mails already registered (any case).
    pub async fn insert(&self, user: &mut User) -> Result<(), DomainError> {
        if self.email_exists(&user.email).await? {
            return Err(DomainError::EmailTaken(user.email.clone()));
        }

        let ts = now();
        user.created_at = Some(ts);
        user.updated_at = Some(ts);

        let id = self.users.insert_user(user).await?;
        user.id = Some(id);
        info!(user_id = id, alias = ?user.alias, "user created");
        Ok(())
    }

    pub async fn update(&self, user: &mut User) -> Result<(), DomainError> {
        if user.email.trim().is_empty() {
            return Err(DomainError::Validation("e-mail is required".into()));
        }
        user.updated_at = Some(now());
        self.users.update_user(user).await?;
        debug!(user_id = ?user.id, "user updated");
        Ok(())
    }

    /// Remove the account and its avatar media. Unsaved users are a no-op.
    pub async fn delete(&self, user: &User) -> Result<(), DomainError> {
        let Some(id) = user.id else {
            return Ok(());
        };
        self.users.delete_user(id).await?;
        if let Some(avatar_id) = user.avatar_id {
            self.media.delete_media(avatar_id).await?;
        }
        info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn get_all(&self) -> Result<Vec<User>, DomainError> {
        self.users.all_users().await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        self.users.user_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.users.user_by_email(email).await
    }

    pub async fn get_by_alias(&self, alias: &str) -> Result<Option<User>, DomainError> {
        self.users.user_by_alias(alias).await
    }

    pub fn encrypt_password(&self, plain: &str) -> String {
        self.encoder.encode(plain)
    }

    /// `Some(user)` when `email` exists and `password` matches the stored digest.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let Some(user) = self.users.user_by_email(email.trim()).await? else {
            return Ok(None);
        };
        let encoded = self.encrypt_password(password);
        if user.password.as_deref() == Some(encoded.as_str()) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Replace the password with a random 8-character one and return it in clear.
    pub async fn reset_password(&self, user: &mut User) -> Result<String, DomainError> {
        let Some(id) = user.id else {
            return Err(DomainError::Validation(
                "cannot reset the password of an unsaved user".into(),
            ));
        };

        let password = secrets::temporary_password();
        user.password = Some(self.encrypt_password(&password));
        self.update(user).await?;
        self.activity
            .record_activity(id, &ActivityKind::PasswordReset)
            .await?;

        info!(user_id = id, "password changed");
        Ok(password)
    }

    /// Case-insensitive: `Ana@X.org` collides with `ana@x.org`.
    pub async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        Ok(self.users.count_by_email_ci(email).await? > 0)
    }

    /// Issue a new confirmation code and put the account in `Waiting`.
    /// Stored users are updated right away; unsaved ones keep it until inserted.
    pub async fn request_confirmation(&self, user: &mut User) -> Result<String, DomainError> {
        let code = secrets::confirmation_code();
        user.set_confirmation(code.clone());
        if user.id.is_some() {
            self.update(user).await?;
        }
        Ok(code)
    }

    /// Activate the account holding `code`. `None` when the code is empty or unknown.
    pub async fn check_confirmation(&self, code: &str) -> Result<Option<User>, DomainError> {
        if code.is_empty() {
            return Ok(None);
        }
        let Some(mut user) = self.users.user_by_confirmation(code).await? else {
            return Ok(None);
        };

        user.confirmation = None;
        user.status = UserStatus::Active;
        self.update(&mut user).await?;
        if let Some(id) = user.id {
            self.activity
                .record_activity(id, &ActivityKind::AccountConfirmed)
                .await?;
            info!(user_id = id, "account confirmed");
        }
        Ok(Some(user))
    }

    /// Replace the user's avatar with the media at `path`. The previous media row is
    /// removed only after the user points at the new one; on failure the old avatar stays.
    pub async fn add_avatar(&self, user: &mut User, path: &str) -> Result<(), DomainError> {
        let media = self.media.insert_media(path).await?;
        let old_id = user.avatar_id.replace(media.id);
        if let Err(e) = self.update(user).await {
            user.avatar_id = old_id;
            self.media.delete_media(media.id).await?;
            return Err(e);
        }

        if let Some(old_id) = old_id.filter(|&old| old != media.id) {
            self.media.delete_media(old_id).await?;
        }

        if let Some(id) = user.id {
            self.activity
                .record_activity(id, &ActivityKind::AvatarChanged { media_id: media.id })
                .await?;
        }
        Ok(())
    }

    /// Avatar path for `style` (e.g. `Some("thumb")`), or the site default.
    pub async fn avatar_url(&self, user: &User, style: Option<&str>) -> Result<String, DomainError> {
        if let Some(avatar_id) = user.avatar_id {
            if let Some(media) = self.media.media_by_id(avatar_id).await? {
                if let Some(path) = media.path_for(style) {
                    return Ok(path);
                }
            }
        }
        Ok(self.site.default_avatar.clone())
    }

    /// Public profile URL. `None` for unsaved users.
    pub fn profile_url(&self, user: &User) -> Option<String> {
        user.id
            .map(|id| format!("{}/user/view/{}", self.site.base_url, id))
    }

    /// Activity feed, newest first. `None` for unsaved users.
    pub async fn activities(&self, user: &User) -> Result<Option<Vec<Activity>>, DomainError> {
        match user.id {
            Some(id) => Ok(Some(self.activity.activities_by_owner(id).await?)),
            None => Ok(None),
        }
    }

    /// Users whose name or e-mail contains `key`. Each hit shows the name when it
    /// matches, otherwise the e-mail.
    pub async fn search(&self, key: &str) -> Result<Vec<UserMatch>, DomainError> {
        let users = self.users.search_users(key).await?;
        let needle = key.to_lowercase();

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for user in users {
            let Some(id) = user.id else { continue };
            let text = match user.name.as_deref() {
                Some(name) if name.to_lowercase().contains(&needle) => name.to_string(),
                _ if user.email.to_lowercase().contains(&needle) => user.email.clone(),
                _ => continue,
            };
            if seen.insert(id) {
                out.push(UserMatch { id, text });
            }
        }
        Ok(out)
    }

    /// Return the user's alias, generating a unique one from the display name when
    /// unset (`base`, `base_1`, `base_2`, ...). With `save`, a new alias is persisted,
    /// which needs a stored user.
    pub async fn ensure_alias(&self, user: &mut User, save: bool) -> Result<String, DomainError> {
        if let Some(alias) = user.alias.as_deref().filter(|a| !a.is_empty()) {
            return Ok(alias.to_string());
        }
        if save && user.id.is_none() {
            return Err(DomainError::Validation(
                "cannot save the alias of an unsaved user".into(),
            ));
        }

        let base = alias_base(&user.display_name());
        let mut attempt = 0u32;
        let alias = loop {
            let candidate = alias_candidate(&base, attempt);
            if !self.users.alias_taken(&candidate).await? {
                break candidate;
            }
            attempt += 1;
        };
        debug!(alias = %alias, attempts = attempt, "alias generated");

        user.alias = Some(alias.clone());
        if save {
            self.update(user).await?;
        }
        Ok(alias)
    }

    /// Promote a plain user to collaborator and persist it.
    pub async fn authorize(&self, user: &mut User) -> Result<(), DomainError> {
        let from = user.role;
        user.authorize()?;
        self.persist_role_change(user, from).await
    }

    /// Demote a collaborator to plain user and persist it.
    pub async fn deauthorize(&self, user: &mut User) -> Result<(), DomainError> {
        let from = user.role;
        user.deauthorize()?;
        self.persist_role_change(user, from).await
    }

    async fn persist_role_change(
        &self,
        user: &mut User,
        from: Role,
    ) -> Result<(), DomainError> {
        self.update(user).await?;
        if let Some(id) = user.id {
            let kind = ActivityKind::RoleChanged { from, to: user.role };
            self.activity.record_activity(id, &kind).await?;
            info!(user_id = id, role = user.role_description(), "role changed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::crypto::ShaPasswordEncoder;
    use crate::adapters::persistence::sqlite_repo::SqliteRepo;

    async fn service() -> (tempfile::TempDir, UserService) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(SqliteRepo::connect(dir.path()).await.unwrap());
        let service = UserService::new(
            Arc::clone(&repo) as Arc<dyn UserRepo>,
            Arc::clone(&repo) as Arc<dyn ActivityRepo>,
            Arc::clone(&repo) as Arc<dyn MediaRepo>,
            Arc::new(ShaPasswordEncoder::new("teste")),
            SiteSettings {
                base_url: "https://plenario.org.br".to_string(),
                default_avatar: "/img/default.png".to_string(),
            },
        );
        (dir, service)
    }

    fn new_user(email: &str, name: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password: "senha123".to_string(),
            name: Some(name.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_requires_email_and_password() {
        let (_dir, svc) = service().await;
        let missing_password = NewUser {
            email: "a@x.org".to_string(),
            ..NewUser::default()
        };
        assert!(matches!(
            svc.create(missing_password).await,
            Err(DomainError::Validation(_))
        ));
        let missing_email = NewUser {
            password: "x".to_string(),
            ..NewUser::default()
        };
        assert!(matches!(
            svc.create(missing_email).await,
            Err(DomainError::Validation(_))
        ));
        assert!(svc.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_stores_encoded_password_and_alias() {
        let (_dir, svc) = service().await;
        let user = svc.create(new_user("ana@x.org", "Ana Souza")).await.unwrap();

        let stored = svc.get_by_email("ana@x.org").await.unwrap().unwrap();
        assert_eq!(stored.id, user.id);
        assert_eq!(stored.alias.as_deref(), Some("Ana_Souza"));
        assert_eq!(stored.password, Some(svc.encrypt_password("senha123")));
        assert_ne!(stored.password.as_deref(), Some("senha123"));
        assert!(stored.created_at.is_some());
        assert_eq!(stored.created_at, stored.updated_at);
        assert_eq!(stored.role, Role::Colaborador);
        assert_eq!(stored.status, UserStatus::Disabled);
        assert!(svc.get_by_alias("Ana_Souza").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_ignoring_case() {
        let (_dir, svc) = service().await;
        svc.create(new_user("ana@x.org", "Ana")).await.unwrap();
        assert!(svc.email_exists("ANA@X.ORG").await.unwrap());
        assert!(matches!(
            svc.create(new_user("Ana@X.org", "Outra Ana")).await,
            Err(DomainError::EmailTaken(_))
        ));
        assert_eq!(svc.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_alias_suffixes_on_collision() {
        let (_dir, svc) = service().await;
        let mut aliases = Vec::new();
        for email in ["j1@x.org", "j2@x.org", "j3@x.org"] {
            let user = svc.create(new_user(email, "João Silva")).await.unwrap();
            aliases.push(user.alias.unwrap());
        }
        assert_eq!(aliases, vec!["Joao_Silva", "Joao_Silva_1", "Joao_Silva_2"]);
    }

    #[tokio::test]
    async fn test_alias_falls_back_when_nameless() {
        let (_dir, svc) = service().await;
        let user = svc
            .create(NewUser {
                email: "sem@x.org".to_string(),
                password: "x".to_string(),
                name: None,
            })
            .await
            .unwrap();
        assert_eq!(user.alias.as_deref(), Some("_"));
    }

    #[tokio::test]
    async fn test_ensure_alias_keeps_existing_and_saves() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        assert_eq!(svc.ensure_alias(&mut user, true).await.unwrap(), "Ana");

        user.alias = None;
        user.name = Some("Ana Maria".to_string());
        let alias = svc.ensure_alias(&mut user, true).await.unwrap();
        assert_eq!(alias, "Ana_Maria");
        let stored = svc.get_by_id(user.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.alias.as_deref(), Some("Ana_Maria"));
    }

    #[tokio::test]
    async fn test_ensure_alias_save_needs_stored_user() {
        let (_dir, svc) = service().await;
        let mut unsaved = User {
            email: "a@x.org".to_string(),
            name: Some("Ana".to_string()),
            ..User::default()
        };
        assert!(matches!(
            svc.ensure_alias(&mut unsaved, true).await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(unsaved.alias, None);

        assert_eq!(svc.ensure_alias(&mut unsaved, false).await.unwrap(), "Ana");
        assert_eq!(unsaved.alias.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_update_requires_email() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        user.email = " ".to_string();
        assert!(matches!(
            svc.update(&mut user).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_reset_password() {
        let (_dir, svc) = service().await;
        let mut unsaved = User {
            email: "x@x.org".to_string(),
            ..User::default()
        };
        assert!(matches!(
            svc.reset_password(&mut unsaved).await,
            Err(DomainError::Validation(_))
        ));

        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        let plain = svc.reset_password(&mut user).await.unwrap();
        assert_eq!(plain.len(), 8);
        assert!(svc.authenticate("a@x.org", "senha123").await.unwrap().is_none());
        let logged = svc.authenticate("a@x.org", &plain).await.unwrap();
        assert_eq!(logged.and_then(|u| u.id), user.id);
    }

    #[tokio::test]
    async fn test_confirmation_flow() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        let code = svc.request_confirmation(&mut user).await.unwrap();
        assert_eq!(code.len(), 24);

        let waiting = svc.get_by_id(user.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(waiting.status, UserStatus::Waiting);
        assert_eq!(waiting.confirmation.as_deref(), Some(code.as_str()));

        assert!(svc.check_confirmation("").await.unwrap().is_none());
        assert!(svc.check_confirmation("nope").await.unwrap().is_none());

        let confirmed = svc.check_confirmation(&code).await.unwrap().unwrap();
        assert!(confirmed.is_active());
        assert_eq!(confirmed.confirmation, None);
        let stored = svc.get_by_id(user.id.unwrap()).await.unwrap().unwrap();
        assert!(stored.is_active());
        assert!(svc.check_confirmation(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_avatar_replace_and_urls() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        assert_eq!(svc.avatar_url(&user, None).await.unwrap(), "/img/default.png");

        svc.add_avatar(&mut user, "uploads/ana.png").await.unwrap();
        let first = user.avatar_id.unwrap();
        assert_eq!(
            svc.avatar_url(&user, Some("thumb")).await.unwrap(),
            "uploads/ana_thumb.png"
        );

        svc.add_avatar(&mut user, "uploads/ana2.jpg").await.unwrap();
        assert_ne!(user.avatar_id, Some(first));
        assert_eq!(svc.avatar_url(&user, None).await.unwrap(), "uploads/ana2.jpg");

        let stale = User {
            avatar_id: Some(first),
            ..user.clone()
        };
        assert_eq!(svc.avatar_url(&stale, None).await.unwrap(), "/img/default.png");
    }

    #[tokio::test]
    async fn test_failed_avatar_replace_keeps_old_avatar() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        svc.add_avatar(&mut user, "uploads/ana.png").await.unwrap();
        let current = user.avatar_id;

        assert!(matches!(
            svc.add_avatar(&mut user, "  ").await,
            Err(DomainError::Media(_))
        ));
        assert_eq!(user.avatar_id, current);

        let stored = svc.get_by_id(user.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.avatar_id, current);
        assert_eq!(svc.avatar_url(&stored, None).await.unwrap(), "uploads/ana.png");
    }

    #[tokio::test]
    async fn test_avatar_update_failure_drops_new_media() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        svc.add_avatar(&mut user, "uploads/ana.png").await.unwrap();
        let current = user.avatar_id;

        user.email = String::new();
        assert!(matches!(
            svc.add_avatar(&mut user, "uploads/new.png").await,
            Err(DomainError::Validation(_))
        ));
        assert_eq!(user.avatar_id, current);
        let next = User {
            avatar_id: current.map(|id| id + 1),
            ..user.clone()
        };
        assert_eq!(svc.avatar_url(&next, None).await.unwrap(), "/img/default.png");
        assert_eq!(svc.avatar_url(&user, None).await.unwrap(), "uploads/ana.png");
    }

    #[tokio::test]
    async fn test_delete_removes_user_and_avatar() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        svc.add_avatar(&mut user, "uploads/ana.png").await.unwrap();

        svc.delete(&user).await.unwrap();
        assert!(svc.get_by_id(user.id.unwrap()).await.unwrap().is_none());
        assert_eq!(svc.avatar_url(&user, None).await.unwrap(), "/img/default.png");
        assert!(!svc.email_exists("a@x.org").await.unwrap());

        svc.delete(&User::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_profile_url_and_activities() {
        let (_dir, svc) = service().await;
        let unsaved = User::default();
        assert_eq!(svc.profile_url(&unsaved), None);
        assert!(svc.activities(&unsaved).await.unwrap().is_none());

        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();
        let id = user.id.unwrap();
        assert_eq!(
            svc.profile_url(&user),
            Some(format!("https://plenario.org.br/user/view/{}", id))
        );

        svc.reset_password(&mut user).await.unwrap();
        let feed = svc.activities(&user).await.unwrap().unwrap();
        let kinds: Vec<_> = feed.into_iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ActivityKind::PasswordReset, ActivityKind::Registered]
        );
    }

    #[tokio::test]
    async fn test_search_prefers_name_then_email() {
        let (_dir, svc) = service().await;
        let ana = svc.create(new_user("ana@x.org", "Ana Lima")).await.unwrap();
        let bia = svc.create(new_user("bia.lima@x.org", "Beatriz")).await.unwrap();
        svc.create(new_user("carlos@x.org", "Carlos")).await.unwrap();

        let hits = svc.search("LIMA").await.unwrap();
        assert_eq!(
            hits,
            vec![
                UserMatch {
                    id: ana.id.unwrap(),
                    text: "Ana Lima".to_string()
                },
                UserMatch {
                    id: bia.id.unwrap(),
                    text: "bia.lima@x.org".to_string()
                },
            ]
        );
        assert!(svc.search("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_accented_name_in_other_case() {
        let (_dir, svc) = service().await;
        let joao = svc.create(new_user("js@x.org", "JOÃO SILVA")).await.unwrap();

        let hits = svc.search("joão").await.unwrap();
        assert_eq!(
            hits,
            vec![UserMatch {
                id: joao.id.unwrap(),
                text: "JOÃO SILVA".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_role_transitions_persist() {
        let (_dir, svc) = service().await;
        let mut user = svc.create(new_user("a@x.org", "Ana")).await.unwrap();

        let err = svc.authorize(&mut user).await.unwrap_err();
        assert_eq!(err.to_string(), "Usuário com permissão inválida");
        assert_eq!(user.role, Role::Colaborador);

        svc.deauthorize(&mut user).await.unwrap();
        let stored = svc.get_by_id(user.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Default);
        assert_eq!(stored.role_description(), "Usuário");

        svc.authorize(&mut user).await.unwrap();
        let stored = svc.get_by_id(user.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Colaborador);

        let feed = svc.activities(&user).await.unwrap().unwrap();
        assert_eq!(
            feed[0].kind,
            ActivityKind::RoleChanged {
                from: Role::Default,
                to: Role::Colaborador
            }
        );
    }
}
