//! SQLite-backed repository via libsql. Implements every storage port.
//!
//! All tables share one database file: data/plenario.db
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text (UTC); enums as integers.
//! `name_lc` / `email_lc` hold Unicode-lowercased copies: SQLite's LIKE and LOWER
//! fold ASCII only, so accented names are matched against these columns.

use crate::domain::{
    Activity, ActivityKind, Bill, DomainError, Media, Role, TIMESTAMP_FORMAT, User, UserStatus,
};
use crate::ports::{ActivityRepo, BillRepo, MediaRepo, UserRepo};
use chrono::{NaiveDateTime, Utc};
use libsql::{Connection, Database, Row, Value, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DB_FILE: &str = "plenario.db";

const USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL,
    name TEXT,
    password TEXT,
    avatar_id INTEGER,
    alias TEXT,
    bio TEXT,
    city TEXT,
    roles INTEGER NOT NULL DEFAULT 2,
    status INTEGER NOT NULL DEFAULT 0,
    confirmation TEXT,
    created_at TEXT,
    updated_at TEXT,
    name_lc TEXT,
    email_lc TEXT NOT NULL DEFAULT ''
)"#;
const USERS_ALIAS_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_alias ON users (alias)";
const USERS_EMAIL_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_users_email ON users (email)";
const USERS_EMAIL_LC_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_users_email_lc ON users (email_lc)";

const PROPOSICOES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS proposicoes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nome TEXT NOT NULL DEFAULT '',
    descricao TEXT NOT NULL DEFAULT '',
    camara_id INTEGER NOT NULL DEFAULT 0
)"#;
const PROPOSICOES_CAMARA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_proposicoes_camara ON proposicoes (camara_id)";

const MEDIA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#;

/// Activity feed. `kind_json` holds the serde-JSON of `ActivityKind`.
const ACTIVITY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS activity (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    kind_json TEXT NOT NULL,
    created_at TEXT NOT NULL
)"#;
const ACTIVITY_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_activity_owner ON activity (owner_id, id DESC)";

const USER_COLUMNS: &str = "id, email, name, password, avatar_id, alias, bio, city, roles, status, confirmation, created_at, updated_at";

/// SQLite repository. One database file (plenario.db) in the given base directory.
pub struct SqliteRepo {
    db: Database,
}

fn repo_err(e: libsql::Error) -> DomainError {
    DomainError::Repo(e.to_string())
}

fn now_text() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn ts_to_text(ts: Option<NaiveDateTime>) -> Option<String> {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
}

fn text_to_ts(s: Option<String>) -> Option<NaiveDateTime> {
    s.and_then(|s| NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).ok())
}

fn col_i64(row: &Row, idx: i32) -> Result<i64, DomainError> {
    match row.get_value(idx).map_err(repo_err)? {
        Value::Integer(n) => Ok(n),
        other => Err(DomainError::Repo(format!(
            "column {}: expected integer, got {:?}",
            idx, other
        ))),
    }
}

fn col_opt_i64(row: &Row, idx: i32) -> Result<Option<i64>, DomainError> {
    match row.get_value(idx).map_err(repo_err)? {
        Value::Null => Ok(None),
        Value::Integer(n) => Ok(Some(n)),
        other => Err(DomainError::Repo(format!(
            "column {}: expected integer, got {:?}",
            idx, other
        ))),
    }
}

fn col_opt_text(row: &Row, idx: i32) -> Result<Option<String>, DomainError> {
    match row.get_value(idx).map_err(repo_err)? {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(DomainError::Repo(format!(
            "column {}: expected text, got {:?}",
            idx, other
        ))),
    }
}

fn col_text(row: &Row, idx: i32) -> Result<String, DomainError> {
    Ok(col_opt_text(row, idx)?.unwrap_or_default())
}

fn lowercase_name(user: &User) -> Option<String> {
    user.name.as_deref().map(str::to_lowercase)
}

/// `%key%` with LIKE wildcards in `key` escaped by `\`.
fn like_pattern(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len() + 2);
    escaped.push('%');
    for c in key.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl SqliteRepo {
    /// Connect to (or create) the SQLite database and ensure the schema exists.
    /// Call this once at startup; the returned repo is safe to share via Arc.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Repo(e.to_string()))?;
        let db_path: PathBuf = base.join(DB_FILE);
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(repo_err)?;
        let conn = db.connect().map_err(repo_err)?;

        // PRAGMA returns a row (new value); use query and consume rows (execute fails when rows are returned).
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Repo(format!("{} failed: {}", pragma, e)))?;
            while rows.next().await.map_err(repo_err)?.is_some() {}
        }

        for ddl in [
            USERS_TABLE,
            USERS_ALIAS_INDEX,
            USERS_EMAIL_INDEX,
            USERS_EMAIL_LC_INDEX,
            PROPOSICOES_TABLE,
            PROPOSICOES_CAMARA_INDEX,
            MEDIA_TABLE,
            ACTIVITY_TABLE,
            ACTIVITY_OWNER_INDEX,
        ] {
            conn.execute(ddl, ()).await.map_err(repo_err)?;
        }

        info!(
            path = %db_path.display(),
            "SQLite connected with WAL mode (users, proposicoes, media, activity)"
        );

        Ok(Self { db })
    }

    fn conn(&self) -> Result<Connection, DomainError> {
        self.db.connect().map_err(repo_err)
    }

    fn row_to_user(row: &Row) -> Result<User, DomainError> {
        let roles = col_i64(row, 8)?;
        let status = col_i64(row, 9)?;
        Ok(User {
            id: Some(col_i64(row, 0)?),
            email: col_text(row, 1)?,
            name: col_opt_text(row, 2)?,
            password: col_opt_text(row, 3)?,
            avatar_id: col_opt_i64(row, 4)?,
            alias: col_opt_text(row, 5)?,
            bio: col_opt_text(row, 6)?,
            city: col_opt_text(row, 7)?,
            role: Role::from_i64(roles)
                .ok_or_else(|| DomainError::Repo(format!("unknown role code {}", roles)))?,
            status: UserStatus::from_i64(status)
                .ok_or_else(|| DomainError::Repo(format!("unknown status code {}", status)))?,
            confirmation: col_opt_text(row, 10)?,
            created_at: text_to_ts(col_opt_text(row, 11)?),
            updated_at: text_to_ts(col_opt_text(row, 12)?),
        })
    }

    fn row_to_bill(row: &Row) -> Result<Bill, DomainError> {
        Ok(Bill {
            id: Some(col_i64(row, 0)?),
            name: col_text(row, 1)?,
            description: col_text(row, 2)?,
            camara_id: col_i64(row, 3)?,
        })
    }

    fn row_to_activity(row: &Row) -> Result<Activity, DomainError> {
        let kind_json = col_text(row, 2)?;
        let kind: ActivityKind = serde_json::from_str(&kind_json)
            .map_err(|e| DomainError::Repo(format!("bad activity payload: {}", e)))?;
        Ok(Activity {
            id: col_i64(row, 0)?,
            owner_id: col_i64(row, 1)?,
            kind,
            created_at: text_to_ts(col_opt_text(row, 3)?),
        })
    }

    async fn query_users(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<User>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn.query(sql, params).await.map_err(repo_err)?;
        let mut users = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            users.push(Self::row_to_user(&row)?);
        }
        Ok(users)
    }

    async fn query_bills(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Bill>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn.query(sql, params).await.map_err(repo_err)?;
        let mut bills = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            bills.push(Self::row_to_bill(&row)?);
        }
        Ok(bills)
    }
}

#[async_trait::async_trait]
impl UserRepo for SqliteRepo {
    async fn insert_user(&self, user: &User) -> Result<i64, DomainError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO users (email, name, password, avatar_id, alias, bio, city, roles, status, confirmation, created_at, updated_at, name_lc, email_lc)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                user.email.as_str(),
                user.name.clone(),
                user.password.clone(),
                user.avatar_id,
                user.alias.clone(),
                user.bio.clone(),
                user.city.clone(),
                user.role.as_i64(),
                user.status.as_i64(),
                user.confirmation.clone(),
                ts_to_text(user.created_at),
                ts_to_text(user.updated_at),
                lowercase_name(user),
                user.email.to_lowercase()
            ],
        )
        .await
        .map_err(repo_err)?;
        let id = conn.last_insert_rowid();
        debug!(id, email = %user.email, "inserted user");
        Ok(id)
    }

    async fn update_user(&self, user: &User) -> Result<(), DomainError> {
        let id = user
            .id
            .ok_or_else(|| DomainError::Validation("cannot update a user without id".into()))?;
        let conn = self.conn()?;
        let changed = conn
            .execute(
                r#"
                UPDATE users SET
                    email = ?2, name = ?3, password = ?4, avatar_id = ?5, alias = ?6, bio = ?7,
                    city = ?8, roles = ?9, status = ?10, confirmation = ?11, created_at = ?12,
                    updated_at = ?13, name_lc = ?14, email_lc = ?15
                WHERE id = ?1
                "#,
                params![
                    id,
                    user.email.as_str(),
                    user.name.clone(),
                    user.password.clone(),
                    user.avatar_id,
                    user.alias.clone(),
                    user.bio.clone(),
                    user.city.clone(),
                    user.role.as_i64(),
                    user.status.as_i64(),
                    user.confirmation.clone(),
                    ts_to_text(user.created_at),
                    ts_to_text(user.updated_at),
                    lowercase_name(user),
                    user.email.to_lowercase()
                ],
            )
            .await
            .map_err(repo_err)?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM users WHERE id = ?1", params![id])
            .await
            .map_err(repo_err)?;
        Ok(())
    }

    async fn all_users(&self) -> Result<Vec<User>, DomainError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        self.query_users(&sql, ()).await
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1 LIMIT 1", USER_COLUMNS);
        Ok(self.query_users(&sql, params![id]).await?.into_iter().next())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = ?1 ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        Ok(self.query_users(&sql, params![email]).await?.into_iter().next())
    }

    async fn user_by_alias(&self, alias: &str) -> Result<Option<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE alias = ?1 LIMIT 1",
            USER_COLUMNS
        );
        Ok(self.query_users(&sql, params![alias]).await?.into_iter().next())
    }

    async fn user_by_confirmation(&self, code: &str) -> Result<Option<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE confirmation = ?1 ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        Ok(self.query_users(&sql, params![code]).await?.into_iter().next())
    }

    async fn count_by_email_ci(&self, email: &str) -> Result<u64, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*) FROM users WHERE email_lc = ?1",
                params![email.to_lowercase()],
            )
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(col_i64(&row, 0)?.max(0) as u64),
            None => Ok(0),
        }
    }

    async fn alias_taken(&self, alias: &str) -> Result<bool, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query("SELECT 1 FROM users WHERE alias = ?1 LIMIT 1", params![alias])
            .await
            .map_err(repo_err)?;
        Ok(rows.next().await.map_err(repo_err)?.is_some())
    }

    async fn search_users(&self, key: &str) -> Result<Vec<User>, DomainError> {
        let sql = format!(
            r#"SELECT {} FROM users
               WHERE name_lc LIKE ?1 ESCAPE '\' OR email_lc LIKE ?1 ESCAPE '\'
               ORDER BY id"#,
            USER_COLUMNS
        );
        self.query_users(&sql, params![like_pattern(&key.to_lowercase())])
            .await
    }
}

#[async_trait::async_trait]
impl BillRepo for SqliteRepo {
    async fn insert_bill(&self, bill: &Bill) -> Result<i64, DomainError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO proposicoes (nome, descricao, camara_id) VALUES (?1, ?2, ?3)",
            params![bill.name.as_str(), bill.description.as_str(), bill.camara_id],
        )
        .await
        .map_err(repo_err)?;
        Ok(conn.last_insert_rowid())
    }

    async fn update_bill(&self, bill: &Bill) -> Result<(), DomainError> {
        let id = bill
            .id
            .ok_or_else(|| DomainError::Validation("cannot update a bill without id".into()))?;
        let conn = self.conn()?;
        let changed = conn
            .execute(
                "UPDATE proposicoes SET nome = ?2, descricao = ?3, camara_id = ?4 WHERE id = ?1",
                params![id, bill.name.as_str(), bill.description.as_str(), bill.camara_id],
            )
            .await
            .map_err(repo_err)?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("proposição {}", id)));
        }
        Ok(())
    }

    async fn delete_bill(&self, id: i64) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM proposicoes WHERE id = ?1", params![id])
            .await
            .map_err(repo_err)?;
        Ok(())
    }

    async fn all_bills(&self) -> Result<Vec<Bill>, DomainError> {
        self.query_bills(
            "SELECT id, nome, descricao, camara_id FROM proposicoes ORDER BY id",
            (),
        )
        .await
    }

    async fn bill_by_id(&self, id: i64) -> Result<Option<Bill>, DomainError> {
        Ok(self
            .query_bills(
                "SELECT id, nome, descricao, camara_id FROM proposicoes WHERE id = ?1",
                params![id],
            )
            .await?
            .into_iter()
            .next())
    }

    async fn bill_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError> {
        Ok(self
            .query_bills(
                "SELECT id, nome, descricao, camara_id FROM proposicoes WHERE camara_id = ?1 ORDER BY id LIMIT 1",
                params![camara_id],
            )
            .await?
            .into_iter()
            .next())
    }
}

#[async_trait::async_trait]
impl ActivityRepo for SqliteRepo {
    async fn record_activity(
        &self,
        owner_id: i64,
        kind: &ActivityKind,
    ) -> Result<Activity, DomainError> {
        let kind_json =
            serde_json::to_string(kind).map_err(|e| DomainError::Repo(e.to_string()))?;
        let created_at = now_text();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO activity (owner_id, kind_json, created_at) VALUES (?1, ?2, ?3)",
            params![owner_id, kind_json, created_at.as_str()],
        )
        .await
        .map_err(repo_err)?;
        Ok(Activity {
            id: conn.last_insert_rowid(),
            owner_id,
            kind: kind.clone(),
            created_at: text_to_ts(Some(created_at)),
        })
    }

    async fn activities_by_owner(&self, owner_id: i64) -> Result<Vec<Activity>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query(
                "SELECT id, owner_id, kind_json, created_at FROM activity WHERE owner_id = ?1 ORDER BY id DESC",
                params![owner_id],
            )
            .await
            .map_err(repo_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(repo_err)? {
            out.push(Self::row_to_activity(&row)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl MediaRepo for SqliteRepo {
    async fn insert_media(&self, path: &str) -> Result<Media, DomainError> {
        if path.trim().is_empty() {
            return Err(DomainError::Media("empty media path".into()));
        }
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO media (path, created_at) VALUES (?1, ?2)",
            params![path, now_text()],
        )
        .await
        .map_err(repo_err)?;
        Ok(Media {
            id: conn.last_insert_rowid(),
            path: path.to_string(),
        })
    }

    async fn media_by_id(&self, id: i64) -> Result<Option<Media>, DomainError> {
        let conn = self.conn()?;
        let mut rows = conn
            .query("SELECT id, path FROM media WHERE id = ?1", params![id])
            .await
            .map_err(repo_err)?;
        match rows.next().await.map_err(repo_err)? {
            Some(row) => Ok(Some(Media {
                id: col_i64(&row, 0)?,
                path: col_text(&row, 1)?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_media(&self, id: i64) -> Result<(), DomainError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM media WHERE id = ?1", params![id])
            .await
            .map_err(repo_err)?;
        Ok(())
    }
}
