//! # ミント作成と供給量発行
//!
//! トークンのミント、受取アカウント、供給量発行の各トランザクションを
//! 構築して送信する。ミント初期化とメタデータ作成はToken Metadata
//! プログラムのCreateV1命令一つで原子的に行う。
//!
//! トランザクション構築は純粋関数として分離し、署名者数や命令バイト列を
//! ネットワークなしで検証できるようにしている。

use mpl_token_metadata::accounts::Metadata;
use mpl_token_metadata::instructions::CreateV1Builder;
use mpl_token_metadata::types::TokenStandard;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use crate::error::IssuerError;
use crate::rpc::SolanaRpc;

/// トークン名の最大長（Token Metadataプログラムの制限）
pub const MAX_NAME_LEN: usize = 32;
/// シンボルの最大長（Token Metadataプログラムの制限）
pub const MAX_SYMBOL_LEN: usize = 10;
/// メタデータURIの最大長（Token Metadataプログラムの制限）
pub const MAX_URI_LEN: usize = 200;
/// 小数点以下桁数の上限。ミント作成後は変更できない。
pub const MAX_DECIMALS: u8 = 9;

// ---------------------------------------------------------------------------
// 発行量計算
// ---------------------------------------------------------------------------

/// 発行総数文字列と小数桁から基準単位の発行量を計算する。
/// u128で乗算してからu64に収まることを確認する。浮動小数点は使わない。
pub fn compute_base_units(supply: &str, decimals: u8) -> Result<u64, IssuerError> {
    let supply: u128 = supply.trim().parse().map_err(|_| {
        IssuerError::InvalidRequest(format!("発行総数が整数ではありません: {supply}"))
    })?;
    if supply == 0 {
        return Err(IssuerError::InvalidRequest(
            "発行総数は1以上である必要があります".to_string(),
        ));
    }

    let multiplier = 10u128.checked_pow(decimals as u32).ok_or_else(|| {
        IssuerError::InvalidRequest(format!("小数桁が大きすぎます: {decimals}"))
    })?;
    let base_units = supply.checked_mul(multiplier).ok_or_else(|| {
        IssuerError::InvalidRequest("発行総数が大きすぎます".to_string())
    })?;

    base_units.try_into().map_err(|_| {
        IssuerError::InvalidRequest("発行総数が基準単位でu64の上限を超えています".to_string())
    })
}

// ---------------------------------------------------------------------------
// アドレス導出
// ---------------------------------------------------------------------------

/// 受取アカウント（Associated Token Account）のアドレスを導出する。
/// （所有者, ミント）のペアから決定論的に定まり、何度呼んでも同じアドレスを返す。
pub fn derive_holding_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

// ---------------------------------------------------------------------------
// トランザクション構築
// ---------------------------------------------------------------------------

/// ミント作成 + メタデータ付与のトランザクションを構築する。
///
/// プラットフォーム鍵がpayerと各権限（mint / freeze / update）の初期保持者を兼ねる。
/// 署名者はプラットフォームと新規ミントキーペアの2つ。
pub fn build_create_token_tx(
    platform: &Keypair,
    mint: &Keypair,
    name: &str,
    symbol: &str,
    metadata_uri: &str,
    decimals: u8,
    blockhash: &Hash,
) -> Transaction {
    let platform_pubkey = platform.pubkey();
    let mint_pubkey = mint.pubkey();
    let (metadata_pda, _) = Metadata::find_pda(&mint_pubkey);

    let create_ix = CreateV1Builder::new()
        .metadata(metadata_pda)
        .mint(mint_pubkey, true)
        .authority(platform_pubkey)
        .payer(platform_pubkey)
        .update_authority(platform_pubkey, true)
        .name(name.to_string())
        .symbol(symbol.to_string())
        .uri(metadata_uri.to_string())
        .seller_fee_basis_points(0)
        .token_standard(TokenStandard::Fungible)
        .decimals(decimals)
        .instruction();

    Transaction::new_signed_with_payer(
        &[create_ix],
        Some(&platform_pubkey),
        &[platform, mint],
        *blockhash,
    )
}

/// 受取アカウント作成のトランザクションを構築する。
/// 既に存在する場合は何もしない冪等な命令を使うため、再実行しても失敗しない。
pub fn build_create_holding_account_tx(
    platform: &Keypair,
    owner: &Pubkey,
    mint: &Pubkey,
    blockhash: &Hash,
) -> Transaction {
    let ix = create_associated_token_account_idempotent(
        &platform.pubkey(),
        owner,
        mint,
        &spl_token::ID,
    );
    Transaction::new_signed_with_payer(&[ix], Some(&platform.pubkey()), &[platform], *blockhash)
}

/// 供給量発行（mint_to）のトランザクションを構築する。
/// 発行権限はこの時点ではまだプラットフォームが保持している。
pub fn build_issue_supply_tx(
    platform: &Keypair,
    mint: &Pubkey,
    destination: &Pubkey,
    base_units: u64,
    blockhash: &Hash,
) -> Result<Transaction, IssuerError> {
    let ix = spl_token::instruction::mint_to(
        &spl_token::ID,
        mint,
        destination,
        &platform.pubkey(),
        &[],
        base_units,
    )
    .map_err(|e| IssuerError::Internal(format!("mint_to命令の構築に失敗: {e}")))?;

    Ok(Transaction::new_signed_with_payer(
        &[ix],
        Some(&platform.pubkey()),
        &[platform],
        *blockhash,
    ))
}

// ---------------------------------------------------------------------------
// 送信
// ---------------------------------------------------------------------------

/// ミント+メタデータ作成を送信し、ファイナライズまで待つ。
pub async fn create_mint_with_metadata(
    rpc: &SolanaRpc,
    platform: &Keypair,
    mint: &Keypair,
    name: &str,
    symbol: &str,
    metadata_uri: &str,
    decimals: u8,
) -> Result<String, IssuerError> {
    if metadata_uri.len() > MAX_URI_LEN {
        return Err(IssuerError::Internal(format!(
            "メタデータURIが長すぎます（{}バイト、最大{}バイト）",
            metadata_uri.len(),
            MAX_URI_LEN
        )));
    }

    let blockhash = rpc.get_latest_blockhash().await?;
    let tx =
        build_create_token_tx(platform, mint, name, symbol, metadata_uri, decimals, &blockhash);
    rpc.send_and_confirm(&tx).await
}

/// 受取アカウントを作成（既存なら再利用）し、そのアドレスを返す。
pub async fn ensure_holding_account(
    rpc: &SolanaRpc,
    platform: &Keypair,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<Pubkey, IssuerError> {
    let holding_account = derive_holding_account(owner, mint);
    let blockhash = rpc.get_latest_blockhash().await?;
    let tx = build_create_holding_account_tx(platform, owner, mint, &blockhash);
    rpc.send_and_confirm(&tx).await?;
    Ok(holding_account)
}

/// 供給量を受取アカウントへ発行し、トランザクション署名を返す。
pub async fn issue_supply(
    rpc: &SolanaRpc,
    platform: &Keypair,
    mint: &Pubkey,
    destination: &Pubkey,
    base_units: u64,
) -> Result<String, IssuerError> {
    let blockhash = rpc.get_latest_blockhash().await?;
    let tx = build_issue_supply_tx(platform, mint, destination, base_units, &blockhash)?;
    rpc.send_and_confirm(&tx).await
}
