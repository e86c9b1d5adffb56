//! # Solana JSON-RPCクライアント
//!
//! 発行サービスが必要とする最小限のRPCメソッドのみを実装する。
//! トランザクションの取得と送信はすべてfinalizedコミットメントを基準にする。

use base64::Engine;
use serde::Deserialize;
use solana_sdk::hash::Hash;
use solana_sdk::transaction::Transaction;
use std::str::FromStr;
use std::time::Duration;

use crate::error::IssuerError;

/// Base64エンジン（Standard）
pub(crate) fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// sendTransactionでRPCノード側に依頼する再送回数
const SEND_MAX_RETRIES: u32 = 5;
/// ファイナライズ待ちポーリングの最大試行回数
const CONFIRM_MAX_ATTEMPTS: u32 = 30;
/// ファイナライズ待ちポーリングの間隔
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// レスポンスモデル (encoding: "json")
// ---------------------------------------------------------------------------

/// getTransactionで取得したトランザクション。
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedTransaction {
    /// トランザクション本体
    pub transaction: TransactionBody,
    /// 実行結果メタデータ（Lookup Table経由のアドレスを含む）
    pub meta: Option<TransactionMeta>,
}

/// トランザクション本体。
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionBody {
    pub message: TransactionMessage,
}

/// トランザクションメッセージ。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMessage {
    /// 静的アカウントキー（Base58）
    pub account_keys: Vec<String>,
    /// コンパイル済み命令
    pub instructions: Vec<CompiledInstruction>,
}

/// コンパイル済み命令。アカウントはキー一覧へのインデックスで参照する。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledInstruction {
    /// プログラムIDのインデックス
    pub program_id_index: u8,
    /// 参照アカウントのインデックス一覧
    pub accounts: Vec<u8>,
    /// Base58エンコードされた命令データ
    pub data: String,
}

/// トランザクションの実行結果メタデータ。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    /// Address Lookup Table経由で解決されたアドレス
    pub loaded_addresses: Option<LoadedAddresses>,
}

/// Lookup Table経由で解決されたアドレス。
/// 完全なキー一覧は 静的キー + writable + readonly の順で構成される。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadedAddresses {
    pub writable: Vec<String>,
    pub readonly: Vec<String>,
}

// ---------------------------------------------------------------------------
// クライアント
// ---------------------------------------------------------------------------

/// 単一エンドポイントへのJSON-RPCクライアント。
pub struct SolanaRpc {
    url: String,
    client: reqwest::Client,
}

impl SolanaRpc {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { url, client }
    }

    /// JSON-RPCリクエストを送信し、resultフィールドを返す。
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, IssuerError> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| IssuerError::Rpc(format!("RPC送信失敗 ({method}): {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| IssuerError::Rpc(format!("RPCレスポンスのパースに失敗 ({method}): {e}")))?;

        if let Some(error) = body.get("error") {
            return Err(IssuerError::Rpc(format!("RPCエラー ({method}): {error}")));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| IssuerError::Rpc(format!("RPCレスポンスにresultがありません ({method})")))
    }

    /// finalizedなトランザクションを署名から取得する。存在しない場合はNone。
    /// Versioned Transaction（Lookup Table利用）も取得できるようにversion 0まで許可する。
    pub async fn get_transaction(
        &self,
        signature: &str,
    ) -> Result<Option<ConfirmedTransaction>, IssuerError> {
        let result = self
            .call(
                "getTransaction",
                serde_json::json!([
                    signature,
                    {
                        "encoding": "json",
                        "commitment": "finalized",
                        "maxSupportedTransactionVersion": 0
                    }
                ]),
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let tx: ConfirmedTransaction = serde_json::from_value(result)
            .map_err(|e| IssuerError::Rpc(format!("getTransactionレスポンスのパースに失敗: {e}")))?;
        Ok(Some(tx))
    }

    /// 最新のblockhashを取得する。
    pub async fn get_latest_blockhash(&self) -> Result<Hash, IssuerError> {
        let result = self
            .call(
                "getLatestBlockhash",
                serde_json::json!([{"commitment": "finalized"}]),
            )
            .await?;

        let blockhash = result
            .get("value")
            .and_then(|v| v.get("blockhash"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                IssuerError::Rpc("getLatestBlockhashレスポンスにblockhashがありません".to_string())
            })?;

        Hash::from_str(blockhash)
            .map_err(|e| IssuerError::Rpc(format!("blockhashのパースに失敗: {e}")))
    }

    /// トランザクションをブロードキャストし、署名を返す。
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<String, IssuerError> {
        let tx_bytes = bincode::serialize(tx)
            .map_err(|e| IssuerError::Internal(format!("トランザクションのシリアライズに失敗: {e}")))?;
        let tx_b64 = b64().encode(&tx_bytes);

        let result = self
            .call(
                "sendTransaction",
                serde_json::json!([
                    tx_b64,
                    {"encoding": "base64", "maxRetries": SEND_MAX_RETRIES}
                ]),
            )
            .await?;

        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| {
                IssuerError::Rpc("sendTransactionレスポンスが署名文字列ではありません".to_string())
            })
    }

    /// 署名ステータスをポーリングし、finalizedになるまで待つ。
    pub async fn confirm_transaction(&self, signature: &str) -> Result<(), IssuerError> {
        for _ in 0..CONFIRM_MAX_ATTEMPTS {
            let result = self
                .call("getSignatureStatuses", serde_json::json!([[signature]]))
                .await?;

            let status = result
                .get("value")
                .and_then(|v| v.get(0))
                .cloned()
                .unwrap_or(serde_json::Value::Null);

            if !status.is_null() {
                if let Some(err) = status.get("err") {
                    if !err.is_null() {
                        return Err(IssuerError::Rpc(format!(
                            "トランザクションが失敗しました ({signature}): {err}"
                        )));
                    }
                }
                let confirmation = status.get("confirmationStatus").and_then(|v| v.as_str());
                if confirmation == Some("finalized") {
                    return Ok(());
                }
            }

            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }

        Err(IssuerError::Rpc(format!(
            "ファイナライズ待ちがタイムアウトしました ({signature})"
        )))
    }

    /// ブロードキャストしてファイナライズまで待ち、署名を返す。
    pub async fn send_and_confirm(&self, tx: &Transaction) -> Result<String, IssuerError> {
        let signature = self.send_transaction(tx).await?;
        tracing::debug!(signature = %signature, "トランザクションを送信しました");
        self.confirm_transaction(&signature).await?;
        Ok(signature)
    }

    /// 現在のスロットを取得する。ヘルスチェックの到達性確認に使う。
    pub async fn get_slot(&self) -> Result<u64, IssuerError> {
        let result = self.call("getSlot", serde_json::json!([])).await?;
        result
            .as_u64()
            .ok_or_else(|| IssuerError::Rpc("getSlotレスポンスが数値ではありません".to_string()))
    }
}
