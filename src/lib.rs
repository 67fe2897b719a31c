pub mod core;
pub mod listener;
pub mod strategies;
pub mod utils;

// 选择性导出，避免命名冲突
pub use crate::core::{config::*, error::*, types::*};
// WebSocket 单独导出避免 Result 冲突
pub use crate::core::websocket::{ConnectionState, SocketEvent, WebSocketClient};
pub use listener::*;
pub use strategies::*;
