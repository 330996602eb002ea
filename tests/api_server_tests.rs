// ABOUTME: End-to-end tests of the config API — ApiClient against a served axum router.
// ABOUTME: Also covers on-disk persistence of the SQLite storage across reopen.

use std::sync::Arc;

use chrono::{NaiveTime, Weekday};
use dailybot::apiclient::ApiClient;
use dailybot::server;
use dailybot::storage::Storage;
use dailybot::store::{ConfigStore, StoreError};
use dailybot::types::{ChannelRecord, DailyMeeting, Member, PredefinedReply};
use tempfile::TempDir;

async fn spawn_api() -> ApiClient {
    let storage = Arc::new(Storage::open_in_memory().expect("Failed to open storage"));
    let app = server::router(storage);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("API server died");
    });
    ApiClient::new(&format!("http://{}", addr))
}

fn member(id: &str, channel: &str) -> Member {
    Member {
        id: id.to_string(),
        name: format!("<@{}>", id),
        channel_id: channel.to_string(),
        team_id: "T1".to_string(),
    }
}

#[tokio::test]
async fn test_channel_create_is_idempotent_over_http() {
    let client = spawn_api().await;
    let channel = ChannelRecord {
        id: "C1".to_string(),
        name: String::new(),
        team_id: "T1".to_string(),
    };

    client.create_channel(&channel).await.unwrap();
    client.create_channel(&channel).await.unwrap();
}

#[tokio::test]
async fn test_member_lifecycle_over_http() {
    let client = spawn_api().await;

    client.add_member(&member("U1", "C1")).await.unwrap();
    client.add_member(&member("U2", "C1")).await.unwrap();
    client.add_member(&member("U3", "C2")).await.unwrap();

    let listed = client.list_members("C1").await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["U1", "U2"]);

    client.delete_member("C1", "U1").await.unwrap();
    assert!(matches!(
        client.delete_member("C1", "U1").await,
        Err(StoreError::NotFound)
    ));

    assert_eq!(client.list_members("C1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_meeting_upsert_over_http() {
    let client = spawn_api().await;
    let mut meeting = DailyMeeting {
        channel_id: "C1".to_string(),
        last_daily: None,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        limit_time: Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
        days: vec![Weekday::Mon, Weekday::Fri],
    };
    client.put_daily_meeting(&meeting).await.unwrap();

    meeting.start_time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
    client.put_daily_meeting(&meeting).await.unwrap();

    let meetings = client.list_daily_meetings().await.unwrap();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].start_time, meeting.start_time);
    assert_eq!(
        meetings[0].limit_time,
        Some(NaiveTime::from_hms_opt(10, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_reply_rules_and_scoped_delete_over_http() {
    let client = spawn_api().await;
    let rule = PredefinedReply {
        channel_id: "C1".to_string(),
        question: 0,
        reply: "nice!".to_string(),
        pattern: "done".to_string(),
        match_on_hit: true,
    };
    client.add_reply(&rule).await.unwrap();
    client
        .add_reply(&PredefinedReply {
            question: 2,
            ..rule.clone()
        })
        .await
        .unwrap();

    assert_eq!(client.list_replies("C1").await.unwrap().len(), 2);

    // Deletion is scoped to the (channel, question) pair.
    assert_eq!(client.delete_replies("C1", 0).await.unwrap(), 1);
    assert_eq!(client.delete_replies("C1", 0).await.unwrap(), 0);
    assert_eq!(client.list_replies("C1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_a_store_failure() {
    // Nothing listens on this port.
    let client = ApiClient::new("http://127.0.0.1:9");
    assert!(matches!(
        client.list_members("C1").await,
        Err(StoreError::Failed(_))
    ));
}

#[test]
fn test_storage_persists_across_reopen() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("dailybot.db");

    {
        let storage = Storage::open(&db_path).unwrap();
        storage.insert_member(&member("U1", "C1")).unwrap();
        storage
            .upsert_meeting(&DailyMeeting {
                channel_id: "C1".to_string(),
                last_daily: None,
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                limit_time: None,
                days: vec![Weekday::Tue],
            })
            .unwrap();
    }

    let storage = Storage::open(&db_path).unwrap();
    assert_eq!(storage.members_by_channel("C1").unwrap().len(), 1);
    assert_eq!(storage.list_meetings().unwrap().len(), 1);
}
