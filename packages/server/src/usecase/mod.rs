//! ユースケース層
//!
//! 1 操作 = 1 ユースケース。各ユースケースはドメイン層の trait
//! （`Arc<dyn …>`）と共有状態（`Arc<Mutex<…>>`）を注入されて動く。
//! プロトコルのコアであるメッセージディスパッチ（[`SendMessageUseCase`]）、
//! プレゼンス追跡（[`PresenceTracker`]）、タイピング調停
//! （[`TypingCoordinator`]）もこの層に属する。

pub mod connect;
pub mod disconnect;
pub mod error;
pub mod fetch_history;
pub mod join_room;
pub mod leave_room;
pub mod mark_read;
pub mod presence;
pub mod send_message;
pub mod typing;

#[cfg(test)]
pub(crate) mod test_support;

pub use connect::ConnectUseCase;
pub use disconnect::DisconnectUseCase;
pub use error::{ConnectError, FetchHistoryError, JoinRoomError, MarkReadError, SendMessageError};
pub use fetch_history::FetchHistoryUseCase;
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use mark_read::MarkReadUseCase;
pub use presence::PresenceTracker;
pub use send_message::SendMessageUseCase;
pub use typing::TypingCoordinator;
