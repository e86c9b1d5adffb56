//! # 設定・共有状態
//!
//! 環境変数からの設定読み込みと発行サービスの共有状態の定義。
//! 設定は起動時に一度だけ解決され、以後は不変。各コンポーネントには
//! 必要な値を明示的に渡し、深い場所からの環境変数参照はしない。

use anyhow::Context;
use base58::FromBase58;
use base64::Engine;
use solana_sdk::signature::Keypair;

use quickmint_types::{EnvChecks, Network};

use crate::publisher::AssetHost;
use crate::rpc::{b64, SolanaRpc};

/// mainnet-betaのデフォルトRPCエンドポイント
const DEFAULT_MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
/// devnetのデフォルトRPCエンドポイント
const DEFAULT_DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
/// デフォルトの待受アドレス
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// 発行サービスの設定。起動時に解決され、以後変更されない。
pub struct Config {
    /// mainnet用RPCエンドポイント
    pub mainnet_rpc_url: String,
    /// devnet用RPCエンドポイント
    pub devnet_rpc_url: String,
    /// mainnet用プラットフォーム署名鍵。
    /// 手数料の受取アドレスであり、発行操作のpayer兼初期権限保持者でもある。
    pub platform_wallet: Keypair,
    /// devnet専用プラットフォーム署名鍵（未設定ならmainnet用を流用する）
    pub platform_wallet_devnet: Option<Keypair>,
    /// HTTPサーバーの待受アドレス
    pub bind_addr: String,
    /// ヘルスチェック用に起動時点の設定有無を記録したもの
    pub env_checks: EnvChecks,
}

impl Config {
    /// 環境変数から設定を解決する。必須項目が欠けていれば起動を中止する。
    pub fn from_env() -> anyhow::Result<Self> {
        let key_raw = std::env::var("PLATFORM_WALLET_PRIVATE_KEY")
            .context("PLATFORM_WALLET_PRIVATE_KEYが設定されていません")?;
        let platform_wallet = decode_platform_key(&key_raw)
            .context("PLATFORM_WALLET_PRIVATE_KEYのデコードに失敗")?;

        let platform_wallet_devnet = match std::env::var("PLATFORM_WALLET_PRIVATE_KEY_DEVNET") {
            Ok(raw) => Some(
                decode_platform_key(&raw)
                    .context("PLATFORM_WALLET_PRIVATE_KEY_DEVNETのデコードに失敗")?,
            ),
            Err(_) => None,
        };

        let mainnet_rpc_override = std::env::var("MAINNET_RPC_URL").ok();
        let env_checks = EnvChecks {
            platform_wallet: true,
            platform_wallet_devnet: platform_wallet_devnet.is_some(),
            mainnet_rpc_url: mainnet_rpc_override.is_some(),
            asset_host: std::env::var("ASSET_HOST_URL").is_ok(),
        };

        Ok(Self {
            mainnet_rpc_url: mainnet_rpc_override
                .unwrap_or_else(|| DEFAULT_MAINNET_RPC_URL.to_string()),
            devnet_rpc_url: std::env::var("DEVNET_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_DEVNET_RPC_URL.to_string()),
            platform_wallet,
            platform_wallet_devnet,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            env_checks,
        })
    }

    /// ネットワークに対応するRPCエンドポイントを返す。
    pub fn rpc_url(&self, network: Network) -> &str {
        match network {
            Network::Devnet => &self.devnet_rpc_url,
            Network::MainnetBeta => &self.mainnet_rpc_url,
        }
    }

    /// ネットワークに対応するプラットフォーム署名鍵を返す。
    /// devnet専用鍵が未設定の場合はmainnet用の鍵を使う。
    pub fn wallet(&self, network: Network) -> &Keypair {
        match network {
            Network::Devnet => self
                .platform_wallet_devnet
                .as_ref()
                .unwrap_or(&self.platform_wallet),
            Network::MainnetBeta => &self.platform_wallet,
        }
    }
}

/// プラットフォーム鍵をデコードする。
///
/// JSON配列、Base58、Base64の候補を順に試し、最初に64バイトの秘密鍵として
/// 成立したものを採用する。すべて失敗した場合は形式を列挙した単一のエラーを返す。
pub fn decode_platform_key(raw: &str) -> anyhow::Result<Keypair> {
    let raw = raw.trim();

    let candidates = [
        serde_json::from_str::<Vec<u8>>(raw).ok(),
        raw.from_base58().ok(),
        b64().decode(raw).ok(),
    ];

    for bytes in candidates.into_iter().flatten() {
        if bytes.len() != 64 {
            continue;
        }
        if let Ok(keypair) = Keypair::from_bytes(&bytes) {
            return Ok(keypair);
        }
    }

    anyhow::bail!(
        "鍵の形式を認識できません（JSON配列 / Base58 / Base64 のいずれかで64バイトの秘密鍵が必要です）"
    )
}

/// 発行サービスの共有状態。起動後は全フィールド不変。
pub struct IssuerState {
    /// 起動時に解決された設定
    pub config: Config,
    /// HTTPクライアント（RPCとアセットホストで共用）
    pub http_client: reqwest::Client,
    /// アセットホスト（トレイトで抽象化）
    pub asset_host: Box<dyn AssetHost>,
}

impl IssuerState {
    /// ネットワークに対応するRPCクライアントを作る。
    pub fn rpc(&self, network: Network) -> SolanaRpc {
        SolanaRpc::new(
            self.config.rpc_url(network).to_string(),
            self.http_client.clone(),
        )
    }
}
