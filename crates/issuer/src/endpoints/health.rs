//! # ヘルスチェックエンドポイント
//!
//! 役割:
//! - 起動時に解決された設定の有無を返す（環境変数の生値は返さない）
//! - 各RPCエンドポイントへgetSlotを投げて到達性を確認する
//! - すべて到達可能なら200 healthy、ひとつでも落ちていれば503 degraded

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use quickmint_types::{HealthChecks, HealthResponse, Network, RpcCheck};

use crate::config::IssuerState;

/// GET /health
pub async fn handle_health(
    State(state): State<Arc<IssuerState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let mut rpc = vec![check_rpc(&state, Network::Devnet).await];
    // mainnet RPCは明示設定されている場合のみ確認する。デフォルトの公開
    // エンドポイントはレート制限が厳しく、チェック自体がノイズになる。
    if state.config.env_checks.mainnet_rpc_url {
        rpc.push(check_rpc(&state, Network::MainnetBeta).await);
    }

    let healthy = rpc.iter().all(|check| check.reachable);
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        checks: HealthChecks {
            environment: state.config.env_checks.clone(),
            rpc,
        },
    };

    (status_code, Json(response))
}

async fn check_rpc(state: &IssuerState, network: Network) -> RpcCheck {
    match state.rpc(network).get_slot().await {
        Ok(slot) => RpcCheck {
            network,
            reachable: true,
            slot: Some(slot),
            error: None,
        },
        Err(e) => RpcCheck {
            network,
            reachable: false,
            slot: None,
            error: Some(e.to_string()),
        },
    }
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
