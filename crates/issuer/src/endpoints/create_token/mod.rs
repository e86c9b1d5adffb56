//! # /create-token エンドポイント
//!
//! トークン発行パイプラインの本体
//!
//! ## 処理フロー
//! 1. リクエストを検証（ウォレットアドレス、トークン仕様）
//! 2. 手数料支払いトランザクションを検証（読み取りのみ、冪等）
//! 3. 画像とメタデータ文書をアセットホストへ公開
//! 4. ミント作成とメタデータ付与（単一トランザクション）
//! 5. 受取アカウント作成と供給量発行
//! 6. ミント権限とフリーズ権限の移譲
//!
//! ## 失敗時の扱い
//! - ステップ1〜5の失敗は到達済みステージ付きの500で返す
//! - ステップ6の失敗は200のまま finalized=false と警告文で返す。
//!   供給量はすでにユーザーの手元にあり、失敗扱いにすると成功した発行を
//!   隠してしまうため

mod handler;

#[cfg(test)]
mod tests;

pub use handler::{handle_create_token, handle_preflight};
