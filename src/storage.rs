// ABOUTME: SQLite-backed key-value storage behind the internal config API server.
// ABOUTME: Channels, members, daily meeting configs, and predefined replies.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::types::{ChannelRecord, DailyMeeting, Member, PredefinedReply};

/// Storage for the API server. One connection behind a mutex; every
/// operation is a single short statement.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        storage.initialize_schema()?;
        Ok(storage)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS channels (
                id      TEXT PRIMARY KEY,
                name    TEXT NOT NULL DEFAULT '',
                team_id TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS members (
                id         TEXT NOT NULL,
                name       TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                team_id    TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS daily_meetings (
                channel_id TEXT PRIMARY KEY,
                config     TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS replies (
                channel_id   TEXT NOT NULL,
                question     INTEGER NOT NULL,
                reply        TEXT NOT NULL,
                pattern      TEXT NOT NULL,
                match_on_hit INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Create-if-not-exists; repeated creates of the same channel succeed.
    pub fn create_channel(&self, channel: &ChannelRecord) -> Result<()> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO channels (id, name, team_id) VALUES (?1, ?2, ?3)",
            params![channel.id, channel.name, channel.team_id],
        )?;
        Ok(())
    }

    pub fn channel_count(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        let count: usize = conn.query_row("SELECT COUNT(*) FROM channels", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn insert_member(&self, member: &Member) -> Result<()> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        conn.execute(
            "INSERT INTO members (id, name, channel_id, team_id) VALUES (?1, ?2, ?3, ?4)",
            params![member.id, member.name, member.channel_id, member.team_id],
        )?;
        Ok(())
    }

    /// Returns false when no matching member existed.
    pub fn delete_member(&self, channel_id: &str, member_id: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        let changed = conn.execute(
            "DELETE FROM members WHERE channel_id = ?1 AND id = ?2",
            params![channel_id, member_id],
        )?;
        Ok(changed > 0)
    }

    /// Members in insertion order — the round iterates in this order.
    pub fn members_by_channel(&self, channel_id: &str) -> Result<Vec<Member>> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, channel_id, team_id FROM members
             WHERE channel_id = ?1 ORDER BY rowid",
        )?;
        let members = stmt
            .query_map(params![channel_id], |row| {
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    channel_id: row.get(2)?,
                    team_id: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    pub fn upsert_meeting(&self, meeting: &DailyMeeting) -> Result<()> {
        let config = serde_json::to_string(meeting)?;
        let conn = self.conn.lock().expect("storage lock poisoned");
        conn.execute(
            "INSERT INTO daily_meetings (channel_id, config) VALUES (?1, ?2)
             ON CONFLICT(channel_id) DO UPDATE SET config = excluded.config",
            params![meeting.channel_id, config],
        )?;
        Ok(())
    }

    pub fn list_meetings(&self) -> Result<Vec<DailyMeeting>> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        let mut stmt = conn.prepare("SELECT config FROM daily_meetings ORDER BY channel_id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut meetings = Vec::with_capacity(rows.len());
        for raw in rows {
            meetings.push(serde_json::from_str(&raw).context("corrupt daily meeting config")?);
        }
        Ok(meetings)
    }

    pub fn insert_reply(&self, reply: &PredefinedReply) -> Result<()> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        conn.execute(
            "INSERT INTO replies (channel_id, question, reply, pattern, match_on_hit)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reply.channel_id,
                reply.question,
                reply.reply,
                reply.pattern,
                reply.match_on_hit
            ],
        )?;
        Ok(())
    }

    /// Replies in insertion order — rule evaluation honors this order.
    pub fn replies_by_channel(&self, channel_id: &str) -> Result<Vec<PredefinedReply>> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT channel_id, question, reply, pattern, match_on_hit FROM replies
             WHERE channel_id = ?1 ORDER BY rowid",
        )?;
        let replies = stmt
            .query_map(params![channel_id], |row| {
                Ok(PredefinedReply {
                    channel_id: row.get(0)?,
                    question: row.get(1)?,
                    reply: row.get(2)?,
                    pattern: row.get(3)?,
                    match_on_hit: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(replies)
    }

    pub fn delete_replies(&self, channel_id: &str, question: u8) -> Result<usize> {
        let conn = self.conn.lock().expect("storage lock poisoned");
        let deleted = conn.execute(
            "DELETE FROM replies WHERE channel_id = ?1 AND question = ?2",
            params![channel_id, question],
        )?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};

    fn member(id: &str, channel: &str) -> Member {
        Member {
            id: id.to_string(),
            name: format!("<@{}>", id),
            channel_id: channel.to_string(),
            team_id: "T1".to_string(),
        }
    }

    #[test]
    fn channel_create_is_idempotent() {
        let storage = Storage::open_in_memory().unwrap();
        let channel = ChannelRecord {
            id: "C1".to_string(),
            name: String::new(),
            team_id: "T1".to_string(),
        };
        storage.create_channel(&channel).unwrap();
        storage.create_channel(&channel).unwrap();
        assert_eq!(storage.channel_count().unwrap(), 1);
    }

    #[test]
    fn members_keep_insertion_order() {
        let storage = Storage::open_in_memory().unwrap();
        storage.insert_member(&member("U2", "C1")).unwrap();
        storage.insert_member(&member("U1", "C1")).unwrap();
        storage.insert_member(&member("U3", "C2")).unwrap();

        let ids: Vec<String> = storage
            .members_by_channel("C1")
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["U2", "U1"]);
    }

    #[test]
    fn delete_member_reports_missing() {
        let storage = Storage::open_in_memory().unwrap();
        storage.insert_member(&member("U1", "C1")).unwrap();
        assert!(storage.delete_member("C1", "U1").unwrap());
        assert!(!storage.delete_member("C1", "U1").unwrap());
    }

    #[test]
    fn meeting_round_trips_and_upserts() {
        let storage = Storage::open_in_memory().unwrap();
        let mut meeting = DailyMeeting {
            channel_id: "C1".to_string(),
            last_daily: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            limit_time: None,
            days: vec![Weekday::Mon, Weekday::Wed],
        };
        storage.upsert_meeting(&meeting).unwrap();

        meeting.start_time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        storage.upsert_meeting(&meeting).unwrap();

        let meetings = storage.list_meetings().unwrap();
        assert_eq!(meetings.len(), 1);
        assert_eq!(meetings[0].start_time, meeting.start_time);
        assert_eq!(meetings[0].days, meeting.days);
    }

    #[test]
    fn replies_scoped_by_channel_and_question() {
        let storage = Storage::open_in_memory().unwrap();
        let rule = PredefinedReply {
            channel_id: "C1".to_string(),
            question: 0,
            reply: "nice!".to_string(),
            pattern: "done".to_string(),
            match_on_hit: true,
        };
        storage.insert_reply(&rule).unwrap();
        storage
            .insert_reply(&PredefinedReply {
                question: 1,
                ..rule.clone()
            })
            .unwrap();

        assert_eq!(storage.replies_by_channel("C1").unwrap().len(), 2);
        assert_eq!(storage.delete_replies("C1", 0).unwrap(), 1);
        assert_eq!(storage.replies_by_channel("C1").unwrap().len(), 1);
    }
}
