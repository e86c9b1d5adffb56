//! # QuickMint 共有型定義
//!
//! 発行サービスと外部コラボレータの間で交換されるJSON構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - Base58: Solanaアドレス、トランザクション署名
//! - Base64: バイナリデータ（トークン画像等）
//! - JSONフィールド名はすべてcamelCase

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ネットワーク
// ---------------------------------------------------------------------------

/// 発行先のSolanaネットワーク。
/// リクエストで省略された場合はmainnet-beta扱い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Network {
    /// 開発用ネットワーク
    #[serde(rename = "devnet")]
    Devnet,
    /// 本番ネットワーク
    #[default]
    #[serde(rename = "mainnet-beta")]
    MainnetBeta,
}

impl Network {
    /// ログおよびヘルスチェック表示用のネットワーク名。
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::MainnetBeta => "mainnet-beta",
        }
    }
}

// ---------------------------------------------------------------------------
// 発行リクエスト
// ---------------------------------------------------------------------------

/// POST /create-token リクエスト本文。受理後は不変。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    /// Base58エンコードされた支払い元ウォレットアドレス。
    /// 発行されたトークンと権限の受取先でもある。
    pub user_wallet: String,
    /// 手数料支払いトランザクションのBase58署名
    pub payment_signature: String,
    /// 発行先ネットワーク（省略時はmainnet-beta）
    #[serde(default)]
    pub network: Network,
    /// 発行するトークンの仕様
    pub token_data: TokenData,
}

/// 発行するトークンの仕様。副作用の前に検証される。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    /// トークン名（最大32バイト）
    pub name: String,
    /// シンボル（最大10バイト）
    pub symbol: String,
    /// 小数点以下桁数（0〜9）
    pub decimals: u8,
    /// 発行総数（人間可読単位の整数文字列、任意精度）
    pub supply: String,
    /// トークンの説明文
    pub description: String,
    /// Base64エンコードされた画像バイナリ。
    /// データURL形式（`data:image/png;base64,...`）も受け付ける。
    pub image_base64: String,
    /// フリーズ権限放棄フラグ。
    /// 現行挙動ではフリーズ権限は常にユーザーへ移譲されるため動作に影響しない。
    #[serde(default)]
    pub revoke_freeze: bool,
    /// ミント権限を破棄するか。trueなら追加発行は恒久的に不可能になる。
    #[serde(default)]
    pub revoke_mint: bool,
    /// Telegramリンク（Optional）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    /// ウェブサイトURL（Optional）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Twitter/Xリンク（Optional）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

// ---------------------------------------------------------------------------
// 発行レスポンス
// ---------------------------------------------------------------------------

/// 発行成功レスポンス（HTTP 200）。構築後は不変。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenSuccess {
    /// 常にtrue
    pub success: bool,
    /// Base58エンコードされたミントアドレス
    pub mint_address: String,
    /// Base58エンコードされたユーザーのAssociated Token Accountアドレス
    pub user_token_account: String,
    /// 供給量発行トランザクションのBase58署名
    pub mint_signature: String,
    /// メタデータ文書のURI
    pub metadata_uri: String,
    /// 画像のURI
    pub image_uri: String,
    /// 権限移譲まで完了したか。
    /// falseの場合、トークンと供給量は確定済みだが権限の一部がプラットフォームに残っている。
    pub finalized: bool,
    /// 権限移譲が未完の場合の警告メッセージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// 発行失敗レスポンス（HTTP 500）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenFailure {
    /// 常にfalse
    pub success: bool,
    /// 人間可読のエラーメッセージ
    pub error: String,
    /// 失敗時点で完了していた最後のステージ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<IssuanceStage>,
}

// ---------------------------------------------------------------------------
// 進行ステージ
// ---------------------------------------------------------------------------

/// 発行パイプラインの進行カーソル。単調に前進し、後退しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssuanceStage {
    /// リクエスト受理済み（検証前）
    Received,
    /// 手数料支払いの検証完了
    PaymentVerified,
    /// 画像とメタデータ文書の公開完了
    AssetsPublished,
    /// ミントとオンチェーンメタデータの作成完了
    MintCreated,
    /// 供給量の発行完了
    SupplyIssued,
    /// 権限移譲まで完了
    Finalized,
}

impl IssuanceStage {
    /// ログ出力用のステージ名。
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceStage::Received => "received",
            IssuanceStage::PaymentVerified => "payment-verified",
            IssuanceStage::AssetsPublished => "assets-published",
            IssuanceStage::MintCreated => "mint-created",
            IssuanceStage::SupplyIssued => "supply-issued",
            IssuanceStage::Finalized => "finalized",
        }
    }
}

// ---------------------------------------------------------------------------
// アセットホスト連携
// ---------------------------------------------------------------------------

/// アセットホストへのアップロード種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    /// トークン画像（PNGバイナリ）
    Image,
    /// トークンメタデータ文書（JSON）
    Metadata,
}

/// アセットホストへのアップロードリクエスト。
/// `content`は画像アップロード時、`metadata`はメタデータアップロード時に設定する。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// アップロード種別
    #[serde(rename = "type")]
    pub kind: UploadKind,
    /// 保存ファイル名（シンボル小文字 + タイムスタンプで衝突を回避）
    pub file_name: String,
    /// Base64エンコードされた画像バイナリ（画像アップロード時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// メタデータ文書（メタデータアップロード時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TokenMetadataDoc>,
}

/// アセットホストからのアップロードレスポンス（2xx時）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// 公開されたアセットの取得URL
    pub url: String,
    /// ホスト側のコンテンツ識別子（存在する場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

// ---------------------------------------------------------------------------
// トークンメタデータ文書
// ---------------------------------------------------------------------------

/// ホストに公開されるトークンメタデータ文書。
/// ミントのURIフィールドから参照される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadataDoc {
    /// トークン名
    pub name: String,
    /// シンボル
    pub symbol: String,
    /// 説明文
    pub description: String,
    /// 画像のURI
    pub image: String,
    /// ファイル一覧（画像への参照を含む）
    pub properties: MetadataProperties,
    /// ソーシャルリンクとミント権限マーカー（いずれかが存在する場合のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<MetadataExtensions>,
}

/// メタデータ文書のproperties部。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataProperties {
    /// 添付ファイル一覧
    pub files: Vec<MetadataFile>,
}

/// メタデータ文書に添付されるファイル参照。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFile {
    /// ファイルのURI
    pub uri: String,
    /// MIMEタイプ（例: "image/png"）
    #[serde(rename = "type")]
    pub file_type: String,
}

/// メタデータ文書のextensions部。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataExtensions {
    /// ウェブサイトURL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Twitter/Xリンク
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    /// Telegramリンク
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    /// ミント権限破棄マーカー（破棄を選択した場合のみtrue）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoke_mint: Option<bool>,
    /// ミント権限破棄オプションの表示価格（SOL建て文字列）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_authority_price: Option<String>,
}

// ---------------------------------------------------------------------------
// ヘルスチェック
// ---------------------------------------------------------------------------

/// GET /health レスポンス。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" または "degraded"
    pub status: String,
    /// レスポンス生成時刻（UNIXタイムスタンプ、秒）
    pub timestamp: u64,
    /// 個別チェック結果
    pub checks: HealthChecks,
}

/// ヘルスチェックの内訳。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthChecks {
    /// 起動時に解決された設定の有無
    pub environment: EnvChecks,
    /// RPCエンドポイントの到達性
    pub rpc: Vec<RpcCheck>,
}

/// 起動時に解決された設定の有無。環境変数の生値は含めない。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvChecks {
    /// mainnet用プラットフォーム鍵が設定されているか
    pub platform_wallet: bool,
    /// devnet専用プラットフォーム鍵が設定されているか
    pub platform_wallet_devnet: bool,
    /// mainnet RPC URLが明示設定されているか
    pub mainnet_rpc_url: bool,
    /// アセットホストのエンドポイントが設定されているか
    pub asset_host: bool,
}

/// 単一RPCエンドポイントの到達性チェック結果。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCheck {
    /// 対象ネットワーク
    pub network: Network,
    /// 到達可能だったか
    pub reachable: bool,
    /// 取得できた現在スロット（到達できた場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    /// 失敗理由（到達できなかった場合）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
