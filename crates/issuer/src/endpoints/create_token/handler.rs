//! /create-token ハンドラ実装

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use quickmint_types::{CreateTokenRequest, CreateTokenSuccess, IssuanceStage};

use crate::authority;
use crate::config::IssuerState;
use crate::error::{IssuerError, PipelineFailure};
use crate::minting;
use crate::payment;
use crate::publisher;

/// /create-token エンドポイントハンドラ。
///
/// ボディはValueで受け、パース失敗も統一の失敗エンベロープで返す。
/// ステージカーソルは各ステップの完了後にのみ前進させる。
pub async fn handle_create_token(
    State(state): State<Arc<IssuerState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CreateTokenSuccess>, PipelineFailure> {
    let request_id = uuid::Uuid::new_v4();
    let mut stage = IssuanceStage::Received;

    let request: CreateTokenRequest = serde_json::from_value(body).map_err(|e| {
        PipelineFailure::new(
            stage,
            IssuerError::InvalidRequest(format!("リクエストのパースに失敗: {e}")),
        )
    })?;

    let network = request.network;
    tracing::info!(
        request_id = %request_id,
        network = network.as_str(),
        symbol = %request.token_data.symbol,
        "トークン発行リクエストを受理しました"
    );

    // Step 1: 入力検証（副作用なし）
    let (recipient, base_units) =
        validate_request(&request).map_err(|e| PipelineFailure::new(stage, e))?;

    let rpc = state.rpc(network);
    let platform = state.config.wallet(network);

    // Step 2: 手数料支払いの検証（読み取りのみ、冪等）
    let paid = payment::fetch_and_verify(
        &rpc,
        &request.payment_signature,
        &platform.pubkey(),
        payment::REQUIRED_FEE_LAMPORTS,
    )
    .await
    .map_err(|e| PipelineFailure::new(stage, e))?;
    stage = IssuanceStage::PaymentVerified;

    tracing::info!(
        request_id = %request_id,
        payer = %paid.payer,
        payee = %paid.payee,
        lamports = paid.lamports,
        "手数料支払いを確認しました"
    );

    // Step 3: アセット公開（オンチェーン操作の前に完了させる）
    let (image, metadata) =
        publisher::publish_token_assets(state.asset_host.as_ref(), &request.token_data)
            .await
            .map_err(|e| PipelineFailure::new(stage, e))?;
    stage = IssuanceStage::AssetsPublished;

    tracing::info!(
        request_id = %request_id,
        metadata_uri = %metadata.uri,
        "アセットを公開しました"
    );

    // Step 4: ミント作成とメタデータ付与。
    // ミントアドレスはリクエストごとに新規生成し、再利用しない。
    let mint = Keypair::new();
    minting::create_mint_with_metadata(
        &rpc,
        platform,
        &mint,
        &request.token_data.name,
        &request.token_data.symbol,
        &metadata.uri,
        request.token_data.decimals,
    )
    .await
    .map_err(|e| PipelineFailure::new(stage, e))?;
    stage = IssuanceStage::MintCreated;

    tracing::info!(
        request_id = %request_id,
        mint = %mint.pubkey(),
        "ミントを作成しました"
    );

    // Step 5: 受取アカウント作成と供給量発行。
    // 権限移譲の前に発行を終えていないと、約束した供給量を
    // 発行できなくなるため順序は固定。
    let holding_account =
        minting::ensure_holding_account(&rpc, platform, &recipient, &mint.pubkey())
            .await
            .map_err(|e| PipelineFailure::new(stage, e))?;

    let mint_signature = minting::issue_supply(
        &rpc,
        platform,
        &mint.pubkey(),
        &holding_account,
        base_units,
    )
    .await
    .map_err(|e| PipelineFailure::new(stage, e))?;
    stage = IssuanceStage::SupplyIssued;

    tracing::info!(
        request_id = %request_id,
        signature = %mint_signature,
        base_units = base_units,
        "初期供給を発行しました"
    );

    // Step 6: 権限移譲。供給量はすでにユーザーの手元にあるため、
    // ここの失敗は500ではなく finalized=false の警告付き成功で返す。
    let (finalized, warning) = match authority::finalize_authorities(
        &rpc,
        platform,
        &mint.pubkey(),
        &recipient,
        request.token_data.revoke_mint,
    )
    .await
    {
        Ok(()) => {
            stage = IssuanceStage::Finalized;
            tracing::info!(
                request_id = %request_id,
                mint = %mint.pubkey(),
                stage = stage.as_str(),
                "発行パイプラインが完了しました"
            );
            (true, None)
        }
        Err(handoff) => {
            tracing::warn!(
                request_id = %request_id,
                mint = %mint.pubkey(),
                stage = stage.as_str(),
                error = %handoff.error,
                "権限移譲が未完のまま応答します。手動での対応が必要です"
            );
            (false, Some(handoff.warning_message()))
        }
    };

    Ok(Json(CreateTokenSuccess {
        success: true,
        mint_address: mint.pubkey().to_string(),
        user_token_account: holding_account.to_string(),
        mint_signature,
        metadata_uri: metadata.uri,
        image_uri: image.uri,
        finalized,
        warning,
    }))
}

/// OPTIONS /create-token ハンドラ。
/// CORSヘッダ自体はルーター側のミドルウェアが全レスポンスに付与する。
pub async fn handle_preflight() -> StatusCode {
    StatusCode::OK
}

/// リクエストを検証し、（受取ウォレット, 基準単位の発行量）を返す。
fn validate_request(request: &CreateTokenRequest) -> Result<(Pubkey, u64), IssuerError> {
    let recipient = Pubkey::from_str(&request.user_wallet).map_err(|e| {
        IssuerError::InvalidRequest(format!("userWalletのBase58デコードに失敗: {e}"))
    })?;

    if request.payment_signature.trim().is_empty() {
        return Err(IssuerError::InvalidRequest(
            "paymentSignatureが空です".into(),
        ));
    }

    let token = &request.token_data;
    if token.name.is_empty() || token.name.len() > minting::MAX_NAME_LEN {
        return Err(IssuerError::InvalidRequest(format!(
            "nameは1〜{}バイトである必要があります",
            minting::MAX_NAME_LEN
        )));
    }
    if token.symbol.is_empty() || token.symbol.len() > minting::MAX_SYMBOL_LEN {
        return Err(IssuerError::InvalidRequest(format!(
            "symbolは1〜{}バイトである必要があります",
            minting::MAX_SYMBOL_LEN
        )));
    }
    if token.decimals > minting::MAX_DECIMALS {
        return Err(IssuerError::InvalidRequest(format!(
            "decimalsは0〜{}である必要があります: {}",
            minting::MAX_DECIMALS,
            token.decimals
        )));
    }
    if token.image_base64.trim().is_empty() {
        return Err(IssuerError::InvalidRequest("imageBase64が空です".into()));
    }

    let base_units = minting::compute_base_units(&token.supply, token.decimals)?;

    Ok((recipient, base_units))
}
