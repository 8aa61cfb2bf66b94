//! Server state shared across handlers.

use std::sync::Arc;

use crate::domain::MessagePusher;
use crate::usecase::{
    ConnectUseCase, DisconnectUseCase, FetchHistoryUseCase, JoinRoomUseCase, LeaveRoomUseCase,
    MarkReadUseCase, PresenceTracker, SendMessageUseCase, TypingCoordinator,
};

/// Shared application state
pub struct AppState {
    /// ConnectUseCase（接続確立のユースケース）
    pub connect_usecase: Arc<ConnectUseCase>,
    /// DisconnectUseCase（接続解除のユースケース）
    pub disconnect_usecase: Arc<DisconnectUseCase>,
    /// JoinRoomUseCase（ルーム参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// LeaveRoomUseCase（ルーム離脱のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// TypingCoordinator（タイピング調停のユースケース）
    pub typing_coordinator: Arc<TypingCoordinator>,
    /// MarkReadUseCase（既読通知のユースケース）
    pub mark_read_usecase: Arc<MarkReadUseCase>,
    /// FetchHistoryUseCase（履歴再送のユースケース）
    pub fetch_history_usecase: Arc<FetchHistoryUseCase>,
    /// PresenceTracker（プレゼンス追跡のユースケース）
    pub presence_tracker: Arc<PresenceTracker>,
    /// MessagePusher（要求元接続への直接応答に使う）
    pub pusher: Arc<dyn MessagePusher>,
}
