//! # QuickMint 発行サーバー
//!
//! 手数料支払いの検証からトークン発行、権限移譲までを
//! 単一エンドポイントで処理するHTTPサービスのエントリポイント。
//!
//! ## 起動シーケンス
//! 1. 環境変数からプラットフォーム鍵とRPCエンドポイントを解決
//! 2. アセットホストクライアントを構築
//! 3. /create-token と /health を公開

mod authority;
mod config;
mod endpoints;
mod error;
mod minting;
mod payment;
mod publisher;
mod rpc;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::Response;
use solana_sdk::signer::Signer;

use crate::config::{Config, IssuerState};
use crate::publisher::HttpAssetHost;

/// アプリケーションルーターを構築する。
/// テストからも同じルーター（CORSミドルウェア込み）を起動できるよう分離している。
pub fn build_router(state: Arc<IssuerState>) -> axum::Router {
    axum::Router::new()
        .route(
            "/create-token",
            axum::routing::post(endpoints::handle_create_token)
                .options(endpoints::handle_preflight),
        )
        .route("/health", axum::routing::get(endpoints::handle_health))
        .layer(axum::middleware::map_response(apply_cors_headers))
        .with_state(state)
}

/// すべてのレスポンスにCORSヘッダを付与する。
/// ブラウザ上のフロントエンドから直接呼ばれるためオリジン制限はしない。
async fn apply_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
    );
    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let http_client = reqwest::Client::new();
    let asset_host = HttpAssetHost::from_env(http_client.clone())?;

    tracing::info!(
        platform_wallet = %config.platform_wallet.pubkey(),
        devnet_wallet_configured = config.platform_wallet_devnet.is_some(),
        "プラットフォームウォレットを読み込みました"
    );

    let addr = config.bind_addr.clone();
    let state = Arc::new(IssuerState {
        config,
        http_client,
        asset_host: Box::new(asset_host),
    });

    let app = build_router(state);

    tracing::info!("発行サーバーを {} で起動します", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
