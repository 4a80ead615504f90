use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, params};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::broadcast::traits::{BroadcastRecord, DestinationCatalog, PinVault, StatsRecorder};
use crate::broadcast::types::{ChatCategory, Destination};

/// Bound on any single database operation, liveness floor for the handlers.
const DB_TIMEOUT: Duration = Duration::from_secs(5);

pub fn get_database_path() -> PathBuf {
    std::env::var("DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("broadcastbot.db"))
}

/// SQLite access with a bounded number of concurrent connections. Every
/// closure runs on the blocking pool and is cut off after `DB_TIMEOUT`.
pub struct DatabasePool {
    path: PathBuf,
    semaphore: Arc<Semaphore>,
}

impl DatabasePool {
    pub fn new(path: impl Into<PathBuf>, max_connections: usize) -> Self {
        DatabasePool {
            path: path.into(),
            semaphore: Arc::new(Semaphore::new(max_connections)),
        }
    }

    pub async fn execute_with_timeout<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = timeout(DB_TIMEOUT, self.semaphore.clone().acquire_owned())
            .await
            .map_err(|_| anyhow!("timed out waiting for a database connection"))?
            .context("database pool closed")?;

        let path = self.path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut conn = Connection::open(&path)?;
            conn.busy_timeout(Duration::from_secs(5))?;
            f(&mut conn)
        });

        let result = timeout(DB_TIMEOUT, handle)
            .await
            .map_err(|_| anyhow!("database operation timed out"))?
            .map_err(|e| anyhow!("database task panicked: {e}"))?;

        Ok(result?)
    }
}

pub fn init_database(path: &Path) -> anyhow::Result<()> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS admins (
             user_id    INTEGER PRIMARY KEY,
             username   TEXT,
             full_name  TEXT,
             pin_code   TEXT NOT NULL,
             added_date TEXT DEFAULT CURRENT_TIMESTAMP
         );
         CREATE TABLE IF NOT EXISTS super_admins (
             user_id    INTEGER PRIMARY KEY,
             added_date TEXT DEFAULT CURRENT_TIMESTAMP
         );
         CREATE TABLE IF NOT EXISTS users (
             user_id    INTEGER PRIMARY KEY,
             username   TEXT,
             full_name  TEXT,
             first_seen TEXT DEFAULT CURRENT_TIMESTAMP
         );
         CREATE TABLE IF NOT EXISTS chats (
             chat_id    INTEGER PRIMARY KEY,
             chat_type  TEXT NOT NULL,
             title      TEXT NOT NULL,
             username   TEXT,
             is_active  INTEGER NOT NULL DEFAULT 1,
             added_date TEXT DEFAULT CURRENT_TIMESTAMP
         );
         CREATE TABLE IF NOT EXISTS broadcasts (
             id             INTEGER PRIMARY KEY AUTOINCREMENT,
             admin_id       INTEGER NOT NULL,
             total_chats    INTEGER NOT NULL DEFAULT 0,
             success        INTEGER NOT NULL DEFAULT 0,
             failed         INTEGER NOT NULL DEFAULT 0,
             send_mode      TEXT NOT NULL,
             message_type   TEXT,
             message_text   TEXT,
             broadcast_date TEXT DEFAULT CURRENT_TIMESTAMP
         );",
    )?;

    Ok(())
}

/// Random 4-digit PIN for a newly added admin.
pub fn generate_pin() -> String {
    let mut rng = rand::rng();
    (0..4)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[derive(Clone, Debug)]
pub struct AdminRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub added_date: String,
}

#[derive(Clone, Debug)]
pub struct UserRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub first_seen: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChatCounts {
    pub channels: i64,
    pub groups: i64,
    pub supergroups: i64,
    pub total: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastTotals {
    pub broadcasts: i64,
    pub success: i64,
    pub failed: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastTimeStats {
    pub today: i64,
    pub week: i64,
    pub month: i64,
    pub total: i64,
}

fn destination_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Destination> {
    let chat_type: String = row.get(1)?;
    Ok(Destination {
        chat_id: row.get(0)?,
        category: ChatCategory::from_str(&chat_type).unwrap_or(ChatCategory::Group),
        title: row.get(2)?,
        username: row.get(3)?,
    })
}

impl DatabasePool {
    // ----- admins -----

    pub async fn is_admin(&self, user_id: i64) -> anyhow::Result<bool> {
        self.execute_with_timeout(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM admins WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    pub async fn is_super_admin(&self, user_id: i64) -> anyhow::Result<bool> {
        self.execute_with_timeout(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM super_admins WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Inserts the admin with a fresh PIN, or returns the stored PIN when
    /// the row already exists (startup seeding must not rotate PINs).
    pub async fn ensure_admin(&self, user_id: i64) -> anyhow::Result<String> {
        let pin = generate_pin();
        self.execute_with_timeout(move |conn| {
            if let Some(existing) = conn
                .query_row(
                    "SELECT pin_code FROM admins WHERE user_id = ?1",
                    [user_id],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
            {
                return Ok(existing);
            }
            conn.execute(
                "INSERT INTO admins (user_id, pin_code) VALUES (?1, ?2)",
                params![user_id, pin],
            )?;
            Ok(pin)
        })
        .await
    }

    pub async fn add_admin(
        &self,
        user_id: i64,
        username: Option<String>,
        full_name: Option<String>,
    ) -> anyhow::Result<String> {
        let pin = generate_pin();
        let stored = pin.clone();
        self.execute_with_timeout(move |conn| {
            conn.execute(
                "INSERT INTO admins (user_id, username, full_name, pin_code)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id) DO UPDATE SET pin_code = ?4",
                params![user_id, username, full_name, stored],
            )?;
            Ok(())
        })
        .await?;
        Ok(pin)
    }

    pub async fn remove_admin(&self, user_id: i64) -> anyhow::Result<()> {
        self.execute_with_timeout(move |conn| {
            conn.execute("DELETE FROM admins WHERE user_id = ?1", [user_id])?;
            Ok(())
        })
        .await
    }

    pub async fn add_super_admin(&self, user_id: i64) -> anyhow::Result<()> {
        self.execute_with_timeout(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO super_admins (user_id) VALUES (?1)",
                [user_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_all_admins(&self) -> anyhow::Result<Vec<AdminRow>> {
        self.execute_with_timeout(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username, full_name, added_date
                 FROM admins ORDER BY added_date DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(AdminRow {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    added_date: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    pub async fn get_super_admin_ids(&self) -> anyhow::Result<Vec<i64>> {
        self.execute_with_timeout(|conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM super_admins")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
    }

    // ----- PINs -----

    pub async fn get_admin_pin(&self, user_id: i64) -> anyhow::Result<Option<String>> {
        self.execute_with_timeout(move |conn| {
            conn.query_row(
                "SELECT pin_code FROM admins WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    pub async fn update_pin(&self, user_id: i64, new_pin: String) -> anyhow::Result<()> {
        self.execute_with_timeout(move |conn| {
            conn.execute(
                "UPDATE admins SET pin_code = ?1 WHERE user_id = ?2",
                params![new_pin, user_id],
            )?;
            Ok(())
        })
        .await
    }

    // ----- users -----

    /// Upserts the user. Returns true when the row is new.
    pub async fn add_user(
        &self,
        user_id: i64,
        username: Option<String>,
        full_name: Option<String>,
    ) -> anyhow::Result<bool> {
        self.execute_with_timeout(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM users WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;

            if exists.is_some() {
                conn.execute(
                    "UPDATE users SET username = ?2, full_name = ?3 WHERE user_id = ?1",
                    params![user_id, username, full_name],
                )?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO users (user_id, username, full_name) VALUES (?1, ?2, ?3)",
                    params![user_id, username, full_name],
                )?;
                Ok(true)
            }
        })
        .await
    }

    pub async fn get_all_users(&self) -> anyhow::Result<Vec<UserRow>> {
        self.execute_with_timeout(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, username, full_name, first_seen
                 FROM users ORDER BY first_seen DESC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(UserRow {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    full_name: row.get(2)?,
                    first_seen: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
    }

    // ----- chats -----

    /// Registers or reactivates a chat the bot was promoted in.
    pub async fn upsert_chat(&self, destination: Destination) -> anyhow::Result<()> {
        self.execute_with_timeout(move |conn| {
            conn.execute(
                "INSERT INTO chats (chat_id, chat_type, title, username, is_active)
                 VALUES (?1, ?2, ?3, ?4, 1)
                 ON CONFLICT (chat_id) DO UPDATE SET
                     chat_type = excluded.chat_type,
                     title = excluded.title,
                     username = excluded.username,
                     is_active = 1",
                params![
                    destination.chat_id,
                    destination.category.as_str(),
                    destination.title,
                    destination.username
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Removes a chat from the catalog. Returns true when a row was deleted.
    pub async fn delete_chat(&self, chat_id: i64) -> anyhow::Result<bool> {
        self.execute_with_timeout(move |conn| {
            let affected = conn.execute("DELETE FROM chats WHERE chat_id = ?1", [chat_id])?;
            Ok(affected > 0)
        })
        .await
    }

    pub async fn get_all_chats(&self) -> anyhow::Result<Vec<Destination>> {
        self.execute_with_timeout(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, chat_type, title, username FROM chats
                 WHERE is_active = 1 ORDER BY added_date DESC",
            )?;
            let rows = stmt.query_map([], destination_from_row)?;
            rows.collect()
        })
        .await
    }

    pub async fn get_chats_by_type(
        &self,
        category: ChatCategory,
    ) -> anyhow::Result<Vec<Destination>> {
        self.execute_with_timeout(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, chat_type, title, username FROM chats
                 WHERE chat_type = ?1 AND is_active = 1 ORDER BY added_date DESC",
            )?;
            let rows = stmt.query_map([category.as_str()], destination_from_row)?;
            rows.collect()
        })
        .await
    }

    pub async fn get_chat_counts(&self) -> anyhow::Result<ChatCounts> {
        self.execute_with_timeout(|conn| {
            let count = |conn: &Connection, chat_type: &str| -> rusqlite::Result<i64> {
                conn.query_row(
                    "SELECT COUNT(*) FROM chats WHERE chat_type = ?1 AND is_active = 1",
                    [chat_type],
                    |row| row.get(0),
                )
            };
            Ok(ChatCounts {
                channels: count(conn, "channel")?,
                groups: count(conn, "group")?,
                supergroups: count(conn, "supergroup")?,
                total: conn.query_row(
                    "SELECT COUNT(*) FROM chats WHERE is_active = 1",
                    [],
                    |row| row.get(0),
                )?,
            })
        })
        .await
    }

    // ----- broadcast history -----

    pub async fn add_broadcast(&self, record: BroadcastRecord) -> anyhow::Result<()> {
        self.execute_with_timeout(move |conn| {
            conn.execute(
                "INSERT INTO broadcasts
                     (admin_id, total_chats, success, failed, send_mode, message_type, message_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.admin_id,
                    record.total,
                    record.success,
                    record.failed,
                    record.mode.as_str(),
                    record.message_type,
                    record.message_text
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_broadcast_totals(&self) -> anyhow::Result<BroadcastTotals> {
        self.execute_with_timeout(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(success), 0), COALESCE(SUM(failed), 0)
                 FROM broadcasts",
                [],
                |row| {
                    Ok(BroadcastTotals {
                        broadcasts: row.get(0)?,
                        success: row.get(1)?,
                        failed: row.get(2)?,
                    })
                },
            )
        })
        .await
    }

    pub async fn get_broadcast_time_stats(&self) -> anyhow::Result<BroadcastTimeStats> {
        self.execute_with_timeout(|conn| {
            let count = |conn: &Connection, filter: &str| -> rusqlite::Result<i64> {
                conn.query_row(
                    &format!("SELECT COUNT(*) FROM broadcasts {filter}"),
                    [],
                    |row| row.get(0),
                )
            };
            Ok(BroadcastTimeStats {
                today: count(conn, "WHERE DATE(broadcast_date) = DATE('now')")?,
                week: count(conn, "WHERE broadcast_date >= datetime('now', '-7 days')")?,
                month: count(
                    conn,
                    "WHERE strftime('%Y-%m', broadcast_date) = strftime('%Y-%m', 'now')",
                )?,
                total: count(conn, "")?,
            })
        })
        .await
    }

    /// Display names of admins who ran a broadcast today.
    pub async fn get_today_broadcast_admins(&self) -> anyhow::Result<Vec<String>> {
        self.execute_with_timeout(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT COALESCE(a.username, a.full_name, CAST(b.admin_id AS TEXT))
                 FROM broadcasts b
                 LEFT JOIN admins a ON b.admin_id = a.user_id
                 WHERE DATE(b.broadcast_date) = DATE('now')",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
    }
}

#[async_trait]
impl DestinationCatalog for DatabasePool {
    async fn list_active(&self) -> anyhow::Result<Vec<Destination>> {
        self.get_all_chats().await
    }

    async fn list_by_category(&self, category: ChatCategory) -> anyhow::Result<Vec<Destination>> {
        self.get_chats_by_type(category).await
    }
}

#[async_trait]
impl PinVault for DatabasePool {
    async fn verify_pin(&self, admin_id: i64, candidate: &str) -> anyhow::Result<bool> {
        match self.get_admin_pin(admin_id).await? {
            Some(stored) => Ok(stored == candidate),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl StatsRecorder for DatabasePool {
    async fn record(&self, record: &BroadcastRecord) -> anyhow::Result<()> {
        self.add_broadcast(record.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::types::SendMode;
    use tempfile::TempDir;

    fn test_pool() -> (TempDir, DatabasePool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("test.db");
        init_database(&path).expect("schema");
        (dir, DatabasePool::new(path, 2))
    }

    fn chat(chat_id: i64, category: ChatCategory) -> Destination {
        Destination {
            chat_id,
            category,
            title: format!("chat {chat_id}"),
            username: None,
        }
    }

    #[test]
    fn generated_pin_is_four_digits() {
        for _ in 0..20 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 4);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn catalog_honors_category_and_active_flag() {
        let (_dir, pool) = test_pool();

        pool.upsert_chat(chat(-1, ChatCategory::Channel)).await.unwrap();
        pool.upsert_chat(chat(-2, ChatCategory::Group)).await.unwrap();
        pool.upsert_chat(chat(-3, ChatCategory::Supergroup)).await.unwrap();
        pool.delete_chat(-2).await.unwrap();

        let all = pool.list_active().await.unwrap();
        assert_eq!(all.len(), 2);

        let channels = pool.list_by_category(ChatCategory::Channel).await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].chat_id, -1);

        let groups = pool.list_by_category(ChatCategory::Group).await.unwrap();
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn delete_chat_reports_whether_a_row_was_removed() {
        let (_dir, pool) = test_pool();

        pool.upsert_chat(chat(-9, ChatCategory::Group)).await.unwrap();
        assert!(pool.delete_chat(-9).await.unwrap());
        assert!(!pool.delete_chat(-9).await.unwrap());
    }

    #[tokio::test]
    async fn upsert_reactivates_and_retitles() {
        let (_dir, pool) = test_pool();

        pool.upsert_chat(chat(-5, ChatCategory::Group)).await.unwrap();
        let mut renamed = chat(-5, ChatCategory::Supergroup);
        renamed.title = "migrated".into();
        pool.upsert_chat(renamed).await.unwrap();

        let all = pool.get_all_chats().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].category, ChatCategory::Supergroup);
        assert_eq!(all[0].title, "migrated");
    }

    #[tokio::test]
    async fn pin_verification_matches_only_the_stored_pair() {
        let (_dir, pool) = test_pool();

        let pin = pool.add_admin(100, None, None).await.unwrap();
        assert!(pool.verify_pin(100, &pin).await.unwrap());
        assert!(!pool.verify_pin(100, "0000").await.unwrap() || pin == "0000");
        assert!(!pool.verify_pin(200, &pin).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_admin_keeps_the_existing_pin() {
        let (_dir, pool) = test_pool();

        let first = pool.ensure_admin(100).await.unwrap();
        let second = pool.ensure_admin(100).await.unwrap();
        assert_eq!(first, second);
        assert!(pool.is_admin(100).await.unwrap());
    }

    #[tokio::test]
    async fn broadcast_record_feeds_the_aggregates() {
        let (_dir, pool) = test_pool();

        let record = BroadcastRecord {
            admin_id: 100,
            total: 3,
            success: 2,
            failed: 1,
            mode: SendMode::Copy,
            message_type: "text",
            message_text: Some("hello".into()),
        };
        pool.record(&record).await.unwrap();

        let totals = pool.get_broadcast_totals().await.unwrap();
        assert_eq!(totals.broadcasts, 1);
        assert_eq!(totals.success, 2);
        assert_eq!(totals.failed, 1);

        let buckets = pool.get_broadcast_time_stats().await.unwrap();
        assert_eq!(buckets.today, 1);
        assert_eq!(buckets.week, 1);
        assert_eq!(buckets.month, 1);
        assert_eq!(buckets.total, 1);
    }

    #[tokio::test]
    async fn user_upsert_reports_newness_once() {
        let (_dir, pool) = test_pool();

        assert!(pool.add_user(7, Some("a".into()), None).await.unwrap());
        assert!(!pool.add_user(7, Some("b".into()), None).await.unwrap());

        let users = pool.get_all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username.as_deref(), Some("b"));
    }
}
