//! # エンドポイントテスト用共通ヘルパー
//!
//! モックのSolana RPCノードとアセットホストをin-processのaxumサーバーとして
//! 起動する。RPCノードはsendTransactionで受理したトランザクションを
//! デシリアライズして保持し、テスト側で命令バイト列を検証できるようにする。

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use base58::ToBase58;
use base64::Engine;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;

use quickmint_types::{EnvChecks, UploadRequest, UploadResponse};

use crate::config::{Config, IssuerState};
use crate::publisher::HttpAssetHost;
use crate::rpc::b64;

// ---------------------------------------------------------------------------
// モックRPCノード
// ---------------------------------------------------------------------------

/// モックRPCノードの台帳。
#[derive(Default)]
pub struct MockLedger {
    /// getTransactionが返すレスポンス（署名 → レスポンスJSON）
    pub transactions: Mutex<HashMap<String, serde_json::Value>>,
    /// sendTransactionで受理したトランザクション
    pub sent: Mutex<Vec<Transaction>>,
    /// sendTransactionの呼び出し回数（失敗した呼び出しも数える）
    pub send_count: AtomicUsize,
    /// この件数を受理した後のsendTransactionを失敗させる（Noneなら無制限に受理）
    pub fail_sends_after: Option<usize>,
    /// getSlotを失敗させるか
    pub fail_get_slot: bool,
}

impl MockLedger {
    /// System Programの送金を含むトランザクションを台帳に登録する。
    /// 命令データは本物のエンコーダ（system_instruction::transfer）で生成する。
    pub fn register_payment(&self, signature: &str, from: &Pubkey, to: &Pubkey, lamports: u64) {
        let ix = system_instruction::transfer(from, to, lamports);
        let response = serde_json::json!({
            "slot": 1000,
            "transaction": {
                "message": {
                    "accountKeys": [
                        from.to_string(),
                        to.to_string(),
                        solana_sdk::system_program::id().to_string(),
                    ],
                    "instructions": [{
                        "programIdIndex": 2,
                        "accounts": [0, 1],
                        "data": ix.data.to_base58(),
                    }],
                },
                "signatures": [signature],
            },
            "meta": { "err": null },
        });
        self.transactions
            .lock()
            .unwrap()
            .insert(signature.to_string(), response);
    }
}

async fn handle_mock_rpc(
    State(ledger): State<Arc<MockLedger>>,
    Json(request): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let method = request
        .get("method")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    let params = request
        .get("params")
        .cloned()
        .unwrap_or(serde_json::Value::Null);

    let result = match method {
        "getTransaction" => {
            let signature = params.get(0).and_then(|v| v.as_str()).unwrap_or_default();
            ledger
                .transactions
                .lock()
                .unwrap()
                .get(signature)
                .cloned()
                .unwrap_or(serde_json::Value::Null)
        }
        "getLatestBlockhash" => serde_json::json!({
            "context": { "slot": 1000 },
            "value": {
                "blockhash": Hash::new_unique().to_string(),
                "lastValidBlockHeight": 2000,
            },
        }),
        "sendTransaction" => {
            let count = ledger.send_count.fetch_add(1, Ordering::SeqCst);
            if let Some(limit) = ledger.fail_sends_after {
                if count >= limit {
                    return rpc_error(-32002, "Transaction simulation failed");
                }
            }
            let tx_b64 = params.get(0).and_then(|v| v.as_str()).unwrap_or_default();
            let tx_bytes = b64().decode(tx_b64).unwrap();
            let tx: Transaction = bincode::deserialize(&tx_bytes).unwrap();
            let signature = tx.signatures[0].to_string();
            ledger.sent.lock().unwrap().push(tx);
            serde_json::Value::String(signature)
        }
        "getSignatureStatuses" => serde_json::json!({
            "context": { "slot": 1000 },
            "value": [{
                "slot": 1000,
                "confirmations": null,
                "err": null,
                "confirmationStatus": "finalized",
            }],
        }),
        "getSlot" => {
            if ledger.fail_get_slot {
                return rpc_error(-32000, "node is unhealthy");
            }
            serde_json::json!(1234)
        }
        _ => serde_json::Value::Null,
    };

    Json(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(code: i64, message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message },
    }))
}

/// モックRPCノードを起動し、エンドポイントURLを返す。
pub async fn start_mock_rpc(ledger: Arc<MockLedger>) -> String {
    let app = axum::Router::new()
        .route("/", post(handle_mock_rpc))
        .with_state(ledger);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// モックアセットホスト
// ---------------------------------------------------------------------------

/// モックアセットホストの状態。
#[derive(Default)]
pub struct MockAssetHostState {
    /// 受理したアップロードリクエスト
    pub uploads: Mutex<Vec<UploadRequest>>,
    /// アップロード呼び出し回数（拒否した呼び出しも数える）
    pub upload_count: AtomicUsize,
    /// すべてのアップロードを拒否するか
    pub reject_uploads: bool,
}

async fn handle_mock_upload(
    State(state): State<Arc<MockAssetHostState>>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, (StatusCode, String)> {
    state.upload_count.fetch_add(1, Ordering::SeqCst);
    if state.reject_uploads {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "アップロードを受け付けられません".to_string(),
        ));
    }

    let url = format!("https://assets.example.com/{}", request.file_name);
    state.uploads.lock().unwrap().push(request);
    Ok(Json(UploadResponse {
        url,
        sha: Some("abc123".to_string()),
    }))
}

/// モックアセットホストを起動し、エンドポイントURLを返す。
pub async fn start_mock_asset_host(state: Arc<MockAssetHostState>) -> String {
    let app = axum::Router::new()
        .route("/", post(handle_mock_upload))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://{addr}")
}

// ---------------------------------------------------------------------------
// 共有状態とサービス起動
// ---------------------------------------------------------------------------

/// テスト用のIssuerStateを構築する。
/// 両ネットワークのRPCとアセットホストをモックサーバーに向ける。
pub fn test_state(rpc_url: &str, asset_host_url: &str, platform: Keypair) -> Arc<IssuerState> {
    let client = reqwest::Client::new();
    let config = Config {
        mainnet_rpc_url: rpc_url.to_string(),
        devnet_rpc_url: rpc_url.to_string(),
        platform_wallet: platform,
        platform_wallet_devnet: None,
        bind_addr: "127.0.0.1:0".to_string(),
        env_checks: EnvChecks {
            platform_wallet: true,
            platform_wallet_devnet: false,
            mainnet_rpc_url: false,
            asset_host: true,
        },
    };

    Arc::new(IssuerState {
        config,
        http_client: client.clone(),
        asset_host: Box::new(HttpAssetHost::new(asset_host_url.to_string(), None, client)),
    })
}

/// 完全なルーター（CORSミドルウェア込み）を空きポートで起動し、ベースURLを返す。
pub async fn start_service(state: Arc<IssuerState>) -> String {
    let app = crate::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://{addr}")
}
