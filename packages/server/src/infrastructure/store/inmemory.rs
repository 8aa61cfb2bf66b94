//! InMemory メッセージストア実装
//!
//! ドメイン層が定義する MessageStore trait の具体的な実装。
//! ルームごとの追記ログを HashMap で保持し、連番とメッセージ ID を採番します。
//!
//! ## 技術的負債
//!
//! 単一ノードの簡易ケースとしてプロセスメモリに保持しています。
//! 複数ノードで動かす場合はここを共有ストア（DBMS）実装に差し替えます。
//! ドキュメント DB 実装時に対応予定。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    CorrelationId, MessageContent, MessageEvent, MessageIdFactory, MessageStore, PersistenceError,
    RoomId, Sequence, Timestamp, UserId,
};
use tsunagi_shared::time::get_utc_timestamp;

const DEFAULT_ROOM_LOG_CAPACITY: usize = 1000;

/// ルームごとの追記ログ
#[derive(Debug, Default)]
struct RoomLog {
    next_sequence: u64,
    events: Vec<MessageEvent>,
}

/// インメモリ MessageStore 実装
pub struct InMemoryMessageStore {
    rooms: Mutex<HashMap<RoomId, RoomLog>>,
    /// ルームごとの保持上限。超過した追記は拒否される。
    capacity_per_room: usize,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity_per_room: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            capacity_per_room,
        }
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        content: MessageContent,
        correlation_id: Option<CorrelationId>,
    ) -> Result<MessageEvent, PersistenceError> {
        let mut rooms = self.rooms.lock().await;
        let log = rooms.entry(room_id.clone()).or_default();

        if log.events.len() >= self.capacity_per_room {
            return Err(PersistenceError::AppendRejected(format!(
                "room '{}' log is full ({} messages)",
                room_id.as_str(),
                self.capacity_per_room
            )));
        }

        log.next_sequence += 1;
        let event = MessageEvent {
            id: MessageIdFactory::generate(),
            room_id,
            sender_id,
            content,
            sequence: Sequence::new(log.next_sequence),
            timestamp: Timestamp::new(get_utc_timestamp()),
            correlation_id,
        };
        log.events.push(event.clone());

        Ok(event)
    }

    async fn fetch_since(
        &self,
        room_id: &RoomId,
        since: Sequence,
    ) -> Result<Vec<MessageEvent>, PersistenceError> {
        let rooms = self.rooms.lock().await;
        let events = rooms
            .get(room_id)
            .map(|log| {
                // events は追記順 = 採番順で並んでいる
                log.events
                    .iter()
                    .filter(|event| event.sequence > since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }
}
