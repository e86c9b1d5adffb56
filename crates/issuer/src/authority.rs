//! # 権限移譲
//!
//! 供給量の発行後、ミント権限とフリーズ権限をユーザーの選択に従って移譲する。
//! 2つのスロットは独立したトランザクションとして順に処理する。
//! 途中で失敗した場合は未処理のスロットを保持したエラーを返し、
//! 呼び出し側が縮退成功として扱えるようにする。

use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use spl_token::instruction::{set_authority, AuthorityType};

use crate::error::IssuerError;
use crate::rpc::SolanaRpc;

/// 移譲対象の権限スロット。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthoritySlot {
    /// ミント権限（追加発行）
    Mint,
    /// フリーズ権限（口座凍結）
    Freeze,
}

impl AuthoritySlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthoritySlot::Mint => "mint",
            AuthoritySlot::Freeze => "freeze",
        }
    }
}

/// 権限移譲の途中失敗。移譲が完了していないスロットを保持する。
#[derive(Debug)]
pub struct AuthorityHandoffError {
    /// 移譲が完了していないスロット
    pub pending: Vec<AuthoritySlot>,
    /// 失敗の内容
    pub error: IssuerError,
}

impl AuthorityHandoffError {
    /// 縮退成功レスポンスに載せる警告メッセージ。
    pub fn warning_message(&self) -> String {
        let pending: Vec<&str> = self.pending.iter().map(|s| s.as_str()).collect();
        format!(
            "権限移譲が完了していません（未処理: {}）: {}",
            pending.join(", "),
            self.error
        )
    }
}

// ---------------------------------------------------------------------------
// トランザクション構築
// ---------------------------------------------------------------------------

/// ミント権限移譲のトランザクションを構築する。
/// new_authorityがNoneの場合は権限を破棄する（追加発行は恒久的に不可能になる）。
pub fn build_set_mint_authority_tx(
    platform: &Keypair,
    mint: &Pubkey,
    new_authority: Option<&Pubkey>,
    blockhash: &Hash,
) -> Result<Transaction, IssuerError> {
    let ix = set_authority(
        &spl_token::ID,
        mint,
        new_authority,
        AuthorityType::MintTokens,
        &platform.pubkey(),
        &[],
    )
    .map_err(|e| IssuerError::Internal(format!("set_authority命令の構築に失敗: {e}")))?;

    Ok(Transaction::new_signed_with_payer(
        &[ix],
        Some(&platform.pubkey()),
        &[platform],
        *blockhash,
    ))
}

/// フリーズ権限移譲のトランザクションを構築する。移譲先は常にユーザー。
pub fn build_set_freeze_authority_tx(
    platform: &Keypair,
    mint: &Pubkey,
    new_authority: &Pubkey,
    blockhash: &Hash,
) -> Result<Transaction, IssuerError> {
    let ix = set_authority(
        &spl_token::ID,
        mint,
        Some(new_authority),
        AuthorityType::FreezeAccount,
        &platform.pubkey(),
        &[],
    )
    .map_err(|e| IssuerError::Internal(format!("set_authority命令の構築に失敗: {e}")))?;

    Ok(Transaction::new_signed_with_payer(
        &[ix],
        Some(&platform.pubkey()),
        &[platform],
        *blockhash,
    ))
}

// ---------------------------------------------------------------------------
// 移譲の実行
// ---------------------------------------------------------------------------

/// ミント権限、フリーズ権限の順に移譲を実行する。
///
/// - ミント権限: revoke_mintがtrueなら破棄、falseならユーザーへ移譲
/// - フリーズ権限: 常にユーザーへ移譲
///
/// どちらの遷移もこのリクエスト内では終端で、巻き戻しはしない。
pub async fn finalize_authorities(
    rpc: &SolanaRpc,
    platform: &Keypair,
    mint: &Pubkey,
    recipient: &Pubkey,
    revoke_mint: bool,
) -> Result<(), AuthorityHandoffError> {
    let new_mint_authority = if revoke_mint { None } else { Some(recipient) };
    if let Err(error) = set_mint_slot(rpc, platform, mint, new_mint_authority).await {
        return Err(AuthorityHandoffError {
            pending: vec![AuthoritySlot::Mint, AuthoritySlot::Freeze],
            error,
        });
    }

    if let Err(error) = set_freeze_slot(rpc, platform, mint, recipient).await {
        return Err(AuthorityHandoffError {
            pending: vec![AuthoritySlot::Freeze],
            error,
        });
    }

    Ok(())
}

async fn set_mint_slot(
    rpc: &SolanaRpc,
    platform: &Keypair,
    mint: &Pubkey,
    new_authority: Option<&Pubkey>,
) -> Result<(), IssuerError> {
    let blockhash = rpc.get_latest_blockhash().await?;
    let tx = build_set_mint_authority_tx(platform, mint, new_authority, &blockhash)?;
    let signature = rpc.send_and_confirm(&tx).await?;
    tracing::info!(slot = "mint", signature = %signature, "権限を移譲しました");
    Ok(())
}

async fn set_freeze_slot(
    rpc: &SolanaRpc,
    platform: &Keypair,
    mint: &Pubkey,
    recipient: &Pubkey,
) -> Result<(), IssuerError> {
    let blockhash = rpc.get_latest_blockhash().await?;
    let tx = build_set_freeze_authority_tx(platform, mint, recipient, &blockhash)?;
    let signature = rpc.send_and_confirm(&tx).await?;
    tracing::info!(slot = "freeze", signature = %signature, "権限を移譲しました");
    Ok(())
}
