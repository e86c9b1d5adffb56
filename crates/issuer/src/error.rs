//! # 発行サービスのエラー型
//!
//! 全コンポーネント共通のエラー型と、HTTPレスポンスへの変換。
//! パイプライン内の失敗は一律で失敗エンベロープ（HTTP 500）として返す。

use axum::http::StatusCode;
use axum::Json;

use quickmint_types::{CreateTokenFailure, IssuanceStage};

/// 発行サービスのエラー型。
#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    /// 不正なリクエスト（アドレス解釈失敗、フィールド検証失敗）
    #[error("不正なリクエスト: {0}")]
    InvalidRequest(String),
    /// 支払いトランザクションがチェーン上に見つからない
    #[error("支払いトランザクションが見つかりません: {0}")]
    PaymentNotFound(String),
    /// トランザクションに使用可能な送金命令が含まれていない
    #[error("送金命令が見つかりません: {0}")]
    NoTransferInstruction(String),
    /// 送金先がプラットフォームの受取アドレスと一致しない
    #[error("支払い先がプラットフォームのアドレスではありません: {0}")]
    WrongRecipient(String),
    /// 送金額が必要手数料に満たない
    #[error("支払い額が不足しています: {got} lamports（必要額 {required} lamports）")]
    InsufficientAmount {
        /// 実際の送金額
        got: u64,
        /// 必要な手数料
        required: u64,
    },
    /// アセットホストがアップロードを拒否した（ホスト側のエラー詳細を含む）
    #[error("アセットホストがアップロードを拒否しました: {0}")]
    UploadRejected(String),
    /// アセットホストに到達できない
    #[error("アセットホストに到達できません: {0}")]
    HostUnreachable(String),
    /// RPC通信またはトランザクション処理の失敗
    #[error("RPCエラー: {0}")]
    Rpc(String),
    /// 内部エラー（シリアライズ失敗等）
    #[error("内部エラー: {0}")]
    Internal(String),
}

/// パイプラインの失敗。完了していた最後のステージを保持する。
#[derive(Debug)]
pub struct PipelineFailure {
    /// 失敗時点で完了していた最後のステージ
    pub stage: IssuanceStage,
    /// 失敗の内容
    pub error: IssuerError,
}

impl PipelineFailure {
    pub fn new(stage: IssuanceStage, error: IssuerError) -> Self {
        Self { stage, error }
    }
}

impl axum::response::IntoResponse for PipelineFailure {
    fn into_response(self) -> axum::response::Response {
        tracing::error!(
            stage = self.stage.as_str(),
            error = %self.error,
            "発行パイプラインが失敗しました"
        );
        let body = CreateTokenFailure {
            success: false,
            error: self.error.to_string(),
            stage: Some(self.stage),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
