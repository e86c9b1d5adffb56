//! # 発行サービスのエンドポイント
//!
//! - POST /create-token: トークン発行パイプライン
//! - GET /health: 稼働状態の確認

pub mod create_token;
pub mod health;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use create_token::{handle_create_token, handle_preflight};
pub use health::handle_health;
