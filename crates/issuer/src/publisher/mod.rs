//! # アセット公開
//!
//! トークン画像とメタデータ文書をアセットホストへ順に公開する。
//! メタデータ文書は画像の公開で得たURIを埋め込むため、2つのアップロードは
//! 必ず画像→メタデータの順で直列に行い、並列化しない。
//!
//! アセットホストはトレイトで抽象化し、テストではモック実装に差し替える。

pub mod http;

pub use http::HttpAssetHost;

use std::time::{SystemTime, UNIX_EPOCH};

use quickmint_types::{
    MetadataExtensions, MetadataFile, MetadataProperties, TokenData, TokenMetadataDoc,
    UploadKind, UploadRequest,
};

use crate::error::IssuerError;

/// ミント権限破棄オプションの表示価格（SOL建て）
const MINT_AUTHORITY_PRICE_SOL: &str = "0.05";

/// 公開済みアセット。一度生成されたら変更されない。
#[derive(Debug, Clone)]
pub struct PublishedAsset {
    /// コンテンツの取得URI
    pub uri: String,
}

/// アセットホストの抽象インターフェース。
#[async_trait::async_trait]
pub trait AssetHost: Send + Sync {
    /// 単一アセットをアップロードし、公開URIを返す。
    async fn upload(&self, request: &UploadRequest) -> Result<PublishedAsset, IssuerError>;
}

/// データURL形式（`data:image/png;base64,...`）からBase64本体を取り出す。
/// 素のBase64はそのまま返す。
pub fn strip_data_url_prefix(content: &str) -> &str {
    match content.split_once(',') {
        Some((_, body)) => body,
        None => content,
    }
}

/// 保存ファイル名を生成する。
/// シンボル小文字 + 現在時刻（ミリ秒）の組み合わせでリクエスト間の衝突を避ける。
/// 同一リクエストの再試行では別名になる（新しいアセットが作られる）。
fn asset_file_name(symbol: &str, extension: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}.{}", symbol.to_lowercase(), millis, extension)
}

/// メタデータ文書を構築する。
/// extensionsはソーシャルリンクまたはミント権限破棄が指定された場合のみ付与する。
pub fn build_metadata_doc(token: &TokenData, image_uri: &str) -> TokenMetadataDoc {
    TokenMetadataDoc {
        name: token.name.clone(),
        symbol: token.symbol.clone(),
        description: token.description.clone(),
        image: image_uri.to_string(),
        properties: MetadataProperties {
            files: vec![MetadataFile {
                uri: image_uri.to_string(),
                file_type: "image/png".to_string(),
            }],
        },
        extensions: build_extensions(token),
    }
}

fn build_extensions(token: &TokenData) -> Option<MetadataExtensions> {
    let has_links =
        token.website.is_some() || token.twitter.is_some() || token.telegram.is_some();
    if !has_links && !token.revoke_mint {
        return None;
    }

    let mut extensions = MetadataExtensions {
        website: token.website.clone(),
        twitter: token.twitter.clone(),
        telegram: token.telegram.clone(),
        ..Default::default()
    };
    if token.revoke_mint {
        extensions.revoke_mint = Some(true);
        extensions.mint_authority_price = Some(MINT_AUTHORITY_PRICE_SOL.to_string());
    }
    Some(extensions)
}

/// 画像、メタデータ文書の順にアセットを公開する。
/// 戻り値は（画像アセット, メタデータアセット）。
pub async fn publish_token_assets(
    host: &dyn AssetHost,
    token: &TokenData,
) -> Result<(PublishedAsset, PublishedAsset), IssuerError> {
    let content = strip_data_url_prefix(&token.image_base64);
    let image = host
        .upload(&UploadRequest {
            kind: UploadKind::Image,
            file_name: asset_file_name(&token.symbol, "png"),
            content: Some(content.to_string()),
            metadata: None,
        })
        .await?;

    let doc = build_metadata_doc(token, &image.uri);
    let metadata = host
        .upload(&UploadRequest {
            kind: UploadKind::Metadata,
            file_name: asset_file_name(&token.symbol, "json"),
            content: None,
            metadata: Some(doc),
        })
        .await?;

    Ok((image, metadata))
}
