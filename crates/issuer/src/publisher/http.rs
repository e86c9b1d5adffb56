//! # HTTPアセットホスト
//!
//! アップロードエンドポイントにJSONをPOSTする本番実装。
//! 2xx以外のレスポンスはホスト側のエラー本文をそのまま呼び出し元に見せる。

use anyhow::Context;

use quickmint_types::{UploadRequest, UploadResponse};

use super::{AssetHost, PublishedAsset};
use crate::error::IssuerError;

/// HTTPアセットホスト。
pub struct HttpAssetHost {
    /// アップロードエンドポイントURL
    endpoint: String,
    /// Bearerトークン（設定されている場合のみ付与）
    token: Option<String>,
    /// HTTPクライアント
    client: reqwest::Client,
}

impl HttpAssetHost {
    pub fn new(endpoint: String, token: Option<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint,
            token,
            client,
        }
    }

    /// 環境変数からHTTPアセットホストを構築する。
    /// ASSET_HOST_URLは必須、ASSET_HOST_TOKENは任意。
    pub fn from_env(client: reqwest::Client) -> anyhow::Result<Self> {
        let endpoint =
            std::env::var("ASSET_HOST_URL").context("ASSET_HOST_URLが設定されていません")?;
        let token = std::env::var("ASSET_HOST_TOKEN").ok();
        Ok(Self::new(endpoint, token, client))
    }
}

#[async_trait::async_trait]
impl AssetHost for HttpAssetHost {
    async fn upload(&self, request: &UploadRequest) -> Result<PublishedAsset, IssuerError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| IssuerError::HostUnreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IssuerError::HostUnreachable(format!("レスポンス読み取り失敗: {e}")))?;

        if !status.is_success() {
            return Err(IssuerError::UploadRejected(format!(
                "ステータス {status}: {body}"
            )));
        }

        let parsed: UploadResponse = serde_json::from_str(&body)
            .map_err(|e| IssuerError::UploadRejected(format!("レスポンスのパースに失敗: {e}")))?;
        Ok(PublishedAsset { uri: parsed.url })
    }
}
