use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use spl_associated_token_account::get_associated_token_address;

use quickmint_types::{IssuanceStage, UploadKind};

use crate::config::IssuerState;
use crate::endpoints::test_helpers::{
    start_mock_asset_host, start_mock_rpc, start_service, test_state, MockAssetHostState,
    MockLedger,
};
use crate::error::IssuerError;
use crate::payment::REQUIRED_FEE_LAMPORTS;

use super::handler::handle_create_token;

const PAYMENT_SIGNATURE: &str = "3yZe7d4h1sVUsVi5cxD9EBtWcqAAmHyKE65Zxq4uCX3P";

/// supply "1000000" と decimals 9 に対応する基準単位量
const EXPECTED_BASE_UNITS: u64 = 1_000_000 * 1_000_000_000;

struct TestHarness {
    ledger: Arc<MockLedger>,
    host: Arc<MockAssetHostState>,
    state: Arc<IssuerState>,
    platform_pubkey: Pubkey,
}

async fn setup(ledger: MockLedger, host: MockAssetHostState) -> TestHarness {
    let ledger = Arc::new(ledger);
    let host = Arc::new(host);
    let rpc_url = start_mock_rpc(ledger.clone()).await;
    let host_url = start_mock_asset_host(host.clone()).await;

    let platform = Keypair::new();
    let platform_pubkey = platform.pubkey();
    let state = test_state(&rpc_url, &host_url, platform);

    TestHarness {
        ledger,
        host,
        state,
        platform_pubkey,
    }
}

fn request_body(user_wallet: &Pubkey, revoke_mint: bool) -> serde_json::Value {
    serde_json::json!({
        "userWallet": user_wallet.to_string(),
        "paymentSignature": PAYMENT_SIGNATURE,
        "network": "devnet",
        "tokenData": {
            "name": "Quick Token",
            "symbol": "QCK",
            "decimals": 9,
            "supply": "1000000",
            "description": "テスト用トークン",
            "imageBase64": "data:image/png;base64,aGVsbG8=",
            "revokeFreeze": true,
            "revokeMint": revoke_mint,
            "website": "https://example.com",
        },
    })
}

/// 正常系: 支払い検証から権限移譲まで通し、レスポンスと送信された
/// トランザクション列の両方を検証する
#[tokio::test]
async fn test_create_token_full_pipeline() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &h.platform_pubkey,
        REQUIRED_FEE_LAMPORTS,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    assert!(result.is_ok(), "handle_create_token failed: {:?}", result.err());
    let body = result.unwrap().0;

    assert!(body.success);
    assert!(body.finalized);
    assert!(body.warning.is_none());

    // アップロードは画像 → メタデータの順で2件
    let uploads = h.host.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].kind, UploadKind::Image);
    assert_eq!(uploads[1].kind, UploadKind::Metadata);
    assert!(uploads[0].file_name.starts_with("qck-"));
    assert!(uploads[0].file_name.ends_with(".png"));
    // データURLプレフィックスは剥がされている
    assert_eq!(uploads[0].content.as_deref(), Some("aGVsbG8="));
    assert_eq!(
        body.image_uri,
        format!("https://assets.example.com/{}", uploads[0].file_name)
    );
    assert_eq!(
        body.metadata_uri,
        format!("https://assets.example.com/{}", uploads[1].file_name)
    );
    // メタデータ文書は公開済み画像URIを指す
    let doc = uploads[1].metadata.as_ref().unwrap();
    assert_eq!(doc.image, body.image_uri);

    // 送信順: ミント作成、受取アカウント作成、供給量発行、
    // ミント権限破棄、フリーズ権限移譲
    let sent = h.ledger.sent.lock().unwrap();
    assert_eq!(sent.len(), 5);

    // ミント作成: プラットフォームとミントの2署名者
    let mint: Pubkey = body.mint_address.parse().unwrap();
    assert_eq!(sent[0].message.header.num_required_signatures, 2);
    assert_eq!(sent[0].message.account_keys[0], h.platform_pubkey);
    assert_eq!(sent[0].message.account_keys[1], mint);

    // 受取アカウントは決定的に導出される
    assert_eq!(
        body.user_token_account,
        get_associated_token_address(&user, &mint).to_string()
    );

    // 供給量発行: MintTo(tag 7) + リトルエンディアンの発行量
    let mint_to = &sent[2].message.instructions[0];
    assert_eq!(mint_to.data[0], 7);
    assert_eq!(mint_to.data[1..9], EXPECTED_BASE_UNITS.to_le_bytes());
    assert_eq!(body.mint_signature, sent[2].signatures[0].to_string());

    // ミント権限の破棄: SetAuthority(tag 6) + MintTokens(0) + COption::None(0)
    let revoke = &sent[3].message.instructions[0];
    assert_eq!(revoke.data[..3], [6, 0, 0]);

    // フリーズ権限の移譲: SetAuthority(tag 6) + FreezeAccount(1) + COption::Some
    let freeze = &sent[4].message.instructions[0];
    assert_eq!(freeze.data[..3], [6, 1, 1]);
    assert_eq!(freeze.data[3..35], user.to_bytes());
}

/// revokeMint=falseならミント権限はユーザーへ移譲される
#[tokio::test]
async fn test_mint_authority_reassigned_when_not_revoked() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &h.platform_pubkey,
        REQUIRED_FEE_LAMPORTS,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, false))).await;
    assert!(result.is_ok());

    let sent = h.ledger.sent.lock().unwrap();
    let reassign = &sent[3].message.instructions[0];
    assert_eq!(reassign.data[..3], [6, 0, 1]);
    assert_eq!(reassign.data[3..35], user.to_bytes());
}

/// 別の宛先への支払いは拒否され、アセット公開もオンチェーン操作も起きない
#[tokio::test]
async fn test_rejects_wrong_recipient() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();
    let someone_else = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &someone_else,
        REQUIRED_FEE_LAMPORTS,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    let failure = result.unwrap_err();
    assert_eq!(failure.stage, IssuanceStage::Received);
    assert!(matches!(failure.error, IssuerError::WrongRecipient(_)));

    assert_eq!(h.host.upload_count.load(Ordering::SeqCst), 0);
    assert_eq!(h.ledger.send_count.load(Ordering::SeqCst), 0);
}

/// 存在しない支払い署名は拒否される
#[tokio::test]
async fn test_rejects_unknown_payment() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    let failure = result.unwrap_err();
    assert_eq!(failure.stage, IssuanceStage::Received);
    assert!(matches!(failure.error, IssuerError::PaymentNotFound(_)));
}

/// 手数料に満たない支払いは拒否される
#[tokio::test]
async fn test_rejects_underpaid() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &h.platform_pubkey,
        REQUIRED_FEE_LAMPORTS - 1,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    let failure = result.unwrap_err();
    assert!(matches!(failure.error, IssuerError::InsufficientAmount { .. }));
}

/// アップロード拒否はオンチェーン操作の前にパイプラインを止める
#[tokio::test]
async fn test_upload_failure_stops_before_chain() {
    let host = MockAssetHostState {
        reject_uploads: true,
        ..Default::default()
    };
    let h = setup(MockLedger::default(), host).await;
    let user = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &h.platform_pubkey,
        REQUIRED_FEE_LAMPORTS,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    let failure = result.unwrap_err();
    assert_eq!(failure.stage, IssuanceStage::PaymentVerified);
    assert!(matches!(failure.error, IssuerError::UploadRejected(_)));

    assert_eq!(h.ledger.send_count.load(Ordering::SeqCst), 0);
}

/// 不正な入力は副作用の前に拒否される
#[tokio::test]
async fn test_validation_rejects_bad_input() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();

    let mut malformed_wallet = request_body(&user, true);
    malformed_wallet["userWallet"] = serde_json::json!("not-a-pubkey!!");

    let mut decimals_out_of_range = request_body(&user, true);
    decimals_out_of_range["tokenData"]["decimals"] = serde_json::json!(10);

    let mut missing_image = request_body(&user, true);
    missing_image["tokenData"]["imageBase64"] = serde_json::json!("");

    let mut fractional_supply = request_body(&user, true);
    fractional_supply["tokenData"]["supply"] = serde_json::json!("1.5");

    let mut empty_symbol = request_body(&user, true);
    empty_symbol["tokenData"]["symbol"] = serde_json::json!("");

    for body in [
        malformed_wallet,
        decimals_out_of_range,
        missing_image,
        fractional_supply,
        empty_symbol,
    ] {
        let result = handle_create_token(State(h.state.clone()), Json(body)).await;
        let failure = result.unwrap_err();
        assert_eq!(failure.stage, IssuanceStage::Received);
        assert!(matches!(failure.error, IssuerError::InvalidRequest(_)));
    }

    assert_eq!(h.host.upload_count.load(Ordering::SeqCst), 0);
    assert_eq!(h.ledger.send_count.load(Ordering::SeqCst), 0);
}

/// フリーズ権限の移譲だけが失敗した場合、500ではなく
/// finalized=false の警告付き成功で返る
#[tokio::test]
async fn test_partial_authority_failure_returns_degraded_success() {
    let ledger = MockLedger {
        fail_sends_after: Some(4),
        ..Default::default()
    };
    let h = setup(ledger, MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &h.platform_pubkey,
        REQUIRED_FEE_LAMPORTS,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    assert!(result.is_ok(), "degraded case must not fail: {:?}", result.err());
    let body = result.unwrap().0;

    assert!(body.success);
    assert!(!body.finalized);
    let warning = body.warning.unwrap();
    assert!(warning.contains("freeze"), "warning was: {warning}");

    // 受理されたのはミント権限破棄まで
    assert_eq!(h.ledger.sent.lock().unwrap().len(), 4);
}

/// 権限移譲が全滅しても、発行済み供給がある以上は成功として返る
#[tokio::test]
async fn test_authority_failure_after_issuance_never_fails_request() {
    let ledger = MockLedger {
        fail_sends_after: Some(3),
        ..Default::default()
    };
    let h = setup(ledger, MockAssetHostState::default()).await;
    let user = Pubkey::new_unique();
    h.ledger.register_payment(
        PAYMENT_SIGNATURE,
        &user,
        &h.platform_pubkey,
        REQUIRED_FEE_LAMPORTS,
    );

    let result = handle_create_token(State(h.state), Json(request_body(&user, true))).await;
    let body = result.unwrap().0;

    assert!(!body.finalized);
    let warning = body.warning.unwrap();
    assert!(warning.contains("mint"));
    assert!(warning.contains("freeze"));
    assert_eq!(h.ledger.sent.lock().unwrap().len(), 3);
}

/// CORSヘッダがプリフライトと通常レスポンスの両方に付与される
#[tokio::test]
async fn test_cors_headers_applied() {
    let h = setup(MockLedger::default(), MockAssetHostState::default()).await;
    let base_url = start_service(h.state).await;
    let client = reqwest::Client::new();

    let preflight = client
        .request(reqwest::Method::OPTIONS, format!("{base_url}/create-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), reqwest::StatusCode::OK);
    assert_eq!(
        preflight
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let allow_headers = preflight
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(allow_headers.contains("apikey"));
    assert!(allow_headers.contains("content-type"));

    let health = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        health.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
