//! # 支払い検証
//!
//! 手数料支払いトランザクションをチェーンから取得し、System Programの
//! 送金命令を直接デコードして宛先と金額を検証する。
//! 口座残高の前後差分による検証は行わない。
//!
//! 検証ロジック本体はネットワークに依存しない純粋関数として分離し、
//! 取得済みトランザクションに対して単体でテストできるようにしている。

use base58::FromBase58;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::IssuerError;
use crate::rpc::{CompiledInstruction, ConfirmedTransaction, SolanaRpc};

/// 発行手数料（0.15 SOL）。ユーザー入力ではなくポリシー定数。
pub const REQUIRED_FEE_LAMPORTS: u64 = 150_000_000;

/// 検証済み支払い。チェーンデータから導出される読み取り専用の値。
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// 送金元アドレス
    pub payer: Pubkey,
    /// 送金先アドレス（プラットフォームの受取アドレス）
    pub payee: Pubkey,
    /// 送金額
    pub lamports: u64,
}

/// 送金命令のデータ部からlamports額を取り出す。
/// レイアウト: 4バイトの命令種別 + 8バイトのリトルエンディアン符号なし整数。
/// 12バイトに満たないデータは送金命令として扱わない。
pub fn decode_transfer_lamports(data: &[u8]) -> Option<u64> {
    if data.len() < 12 {
        return None;
    }
    let mut amount = [0u8; 8];
    amount.copy_from_slice(&data[4..12]);
    Some(u64::from_le_bytes(amount))
}

/// トランザクションの完全なアカウントキー一覧を構築する。
/// 静的キーの後にLookup Table経由のアドレス（writable、readonlyの順）が続く。
fn resolve_account_keys(tx: &ConfirmedTransaction) -> Vec<String> {
    let mut keys = tx.transaction.message.account_keys.clone();
    if let Some(loaded) = tx.meta.as_ref().and_then(|m| m.loaded_addresses.as_ref()) {
        keys.extend(loaded.writable.iter().cloned());
        keys.extend(loaded.readonly.iter().cloned());
    }
    keys
}

/// 命令が参照するposition番目のアカウントをキー一覧から解決する。
fn instruction_account(
    keys: &[String],
    ix: &CompiledInstruction,
    position: usize,
) -> Result<Pubkey, IssuerError> {
    let index = *ix.accounts.get(position).ok_or_else(|| {
        IssuerError::NoTransferInstruction(format!(
            "命令のアカウント参照が不足しています (位置 {position})"
        ))
    })? as usize;
    let key = keys.get(index).ok_or_else(|| {
        IssuerError::NoTransferInstruction(format!("アカウントインデックス {index} が範囲外です"))
    })?;
    Pubkey::from_str(key)
        .map_err(|e| IssuerError::Internal(format!("アカウントキーのパースに失敗 ({key}): {e}")))
}

/// 取得済みトランザクションに対する検証本体。
///
/// System Programの命令のうち最初のものを送金命令とみなし、
/// 宛先がexpected_payee、金額がmin_lamports以上であることを確認する。
/// 読み取り専用で冪等。同じトランザクションには常に同じ結果を返す。
pub fn verify_payment(
    tx: &ConfirmedTransaction,
    expected_payee: &Pubkey,
    min_lamports: u64,
) -> Result<VerifiedPayment, IssuerError> {
    let keys = resolve_account_keys(tx);
    let system_program = solana_sdk::system_program::id().to_string();

    let transfer_ix = tx
        .transaction
        .message
        .instructions
        .iter()
        .find(|ix| keys.get(ix.program_id_index as usize) == Some(&system_program))
        .ok_or_else(|| {
            IssuerError::NoTransferInstruction(
                "System Programの命令が含まれていません".to_string(),
            )
        })?;

    let data = transfer_ix.data.from_base58().map_err(|_| {
        IssuerError::NoTransferInstruction("命令データのBase58デコードに失敗".to_string())
    })?;
    let lamports = decode_transfer_lamports(&data).ok_or_else(|| {
        IssuerError::NoTransferInstruction("命令データが送金レイアウトではありません".to_string())
    })?;

    // 送金命令の参照アカウントは（送金元, 送金先）の順
    let payer = instruction_account(&keys, transfer_ix, 0)?;
    let payee = instruction_account(&keys, transfer_ix, 1)?;

    if payee != *expected_payee {
        return Err(IssuerError::WrongRecipient(payee.to_string()));
    }
    if lamports < min_lamports {
        return Err(IssuerError::InsufficientAmount {
            got: lamports,
            required: min_lamports,
        });
    }

    Ok(VerifiedPayment {
        payer,
        payee,
        lamports,
    })
}

/// 署名からトランザクションを取得して検証する。
pub async fn fetch_and_verify(
    rpc: &SolanaRpc,
    signature: &str,
    expected_payee: &Pubkey,
    min_lamports: u64,
) -> Result<VerifiedPayment, IssuerError> {
    let tx = rpc
        .get_transaction(signature)
        .await?
        .ok_or_else(|| IssuerError::PaymentNotFound(signature.to_string()))?;
    verify_payment(&tx, expected_payee, min_lamports)
}
