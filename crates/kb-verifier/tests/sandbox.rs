//! # Sandbox Verifier Tests
//!
//! Every documented sandbox tag, in both its bare (`tag@domain`) and plus
//! (`user+tag@domain`) form, must yield its canned reply.

use kb_verifier::{
    BatchOptions, BatchPayload, Reason, SandboxVerifier, VerificationResult, Verifier,
    VerifierError, VerifyOptions, VerifyResponse, SANDBOX_BATCH_ID, SANDBOX_TEMPLATES,
};
use proptest::prelude::*;

struct Expected {
    tag: &'static str,
    result: Option<VerificationResult>,
    reason: Option<Reason>,
    success: bool,
}

const fn expect(
    tag: &'static str,
    result: VerificationResult,
    reason: Reason,
) -> Expected {
    Expected {
        tag,
        result: Some(result),
        reason: Some(reason),
        success: true,
    }
}

const CASES: [Expected; 14] = [
    expect("deliverable", VerificationResult::Deliverable, Reason::AcceptedEmail),
    expect("undeliverable", VerificationResult::Undeliverable, Reason::RejectedEmail),
    expect("invalid-domain", VerificationResult::Undeliverable, Reason::InvalidDomain),
    expect("invalid-email", VerificationResult::Undeliverable, Reason::InvalidEmail),
    expect("invalid-smtp", VerificationResult::Undeliverable, Reason::InvalidSmtp),
    expect("low-quality", VerificationResult::Risky, Reason::LowQuality),
    expect("accept-all", VerificationResult::Risky, Reason::LowDeliverability),
    expect("role", VerificationResult::Risky, Reason::LowQuality),
    expect("disposable", VerificationResult::Risky, Reason::LowQuality),
    expect("timeout", VerificationResult::Unknown, Reason::Timeout),
    expect("unexpected-error", VerificationResult::Unknown, Reason::UnexpectedError),
    expect("no-connect", VerificationResult::Unknown, Reason::NoConnect),
    expect("unavailable-smtp", VerificationResult::Unknown, Reason::UnavailableSmtp),
    Expected {
        tag: "insufficient-balance",
        result: None,
        reason: None,
        success: false,
    },
];

#[tokio::test]
async fn test_every_tag_in_both_forms() {
    let verifier = SandboxVerifier::new();

    for case in &CASES {
        for email in [
            format!("{}@example.com", case.tag),
            format!("user+{}@example.com", case.tag),
        ] {
            let verification = verifier.verify(&email, VerifyOptions::new()).await.unwrap();
            let response = &verification.response;

            assert_eq!(response.result, case.result, "{email}");
            assert_eq!(response.reason, case.reason, "{email}");
            assert_eq!(response.success, case.success, "{email}");
            assert_eq!(response.email, email);
            assert_eq!(verification.meta.balance, 1);
            assert_eq!(verification.meta.response_time_ms, 1);
            assert_eq!(verification.meta.http_status, 200);
        }
    }
}

#[tokio::test]
async fn test_reply_equals_template_apart_from_address_fields() {
    let verifier = SandboxVerifier::new();

    for (tag, template) in SANDBOX_TEMPLATES {
        for email in [format!("{tag}@Example.com"), format!("Bill+{tag}@example.COM")] {
            let mut expected: VerifyResponse = serde_json::from_str(template).unwrap();
            let lowered = email.to_lowercase();
            let (user, domain) = lowered.split_once('@').unwrap();
            expected.user = user.to_string();
            expected.domain = domain.to_string();
            expected.email = lowered.clone();

            let verification = verifier.verify(&email, VerifyOptions::new()).await.unwrap();
            assert_eq!(verification.response, expected, "{email}");
        }
    }
}

#[tokio::test]
async fn test_flag_fields_follow_tag() {
    let verifier = SandboxVerifier::new();
    let verify = move |email: &'static str| async move {
        verifier.verify(email, VerifyOptions::new()).await.unwrap().response
    };

    let role = verify("role@example.com").await;
    assert!(role.role);
    assert_eq!(role.sendex, 0.7);

    let disposable = verify("user+disposable@example.com").await;
    assert!(disposable.disposable);
    assert!(disposable.accept_all);
    assert_eq!(disposable.sendex, 0.0);

    let free = verify("low-quality@example.com").await;
    assert!(free.free);
    assert_eq!(free.sendex, 0.5);

    let balance = verify("insufficient-balance@example.com").await;
    assert_eq!(balance.message.as_deref(), Some("Insufficient balance"));
}

#[tokio::test]
async fn test_plus_deliverable_address() {
    let verification = SandboxVerifier::new()
        .verify("user+deliverable@example.com", VerifyOptions::new())
        .await
        .unwrap();

    let response = verification.response;
    assert_eq!(response.result, Some(VerificationResult::Deliverable));
    assert_eq!(response.reason, Some(Reason::AcceptedEmail));
    assert_eq!(response.sendex, 1.0);
    assert_eq!(response.email, "user+deliverable@example.com");
    assert_eq!(response.user, "user+deliverable");
    assert_eq!(response.domain, "example.com");
    assert!(response.success);
}

#[tokio::test]
async fn test_reply_fields_are_lowercased() {
    let verification = SandboxVerifier::new()
        .verify("Bill.Lumbergh@Initech.COM", VerifyOptions::new())
        .await
        .unwrap();

    assert_eq!(verification.response.email, "bill.lumbergh@initech.com");
    assert_eq!(verification.response.user, "bill.lumbergh");
    assert_eq!(verification.response.domain, "initech.com");
    assert_eq!(verification.response.result, Some(VerificationResult::Deliverable));
}

#[tokio::test]
async fn test_batch_submission_is_fixed() {
    let submission = SandboxVerifier::new()
        .verify_batch(BatchPayload::from_bytes("email\n"), BatchOptions::new())
        .await
        .unwrap();

    assert_eq!(submission.id, SANDBOX_BATCH_ID);
    assert!(submission.success);
}

#[tokio::test]
async fn test_batch_status_is_unsupported() {
    let err = SandboxVerifier::new().batch_status("123456").await.unwrap_err();
    assert!(matches!(err, VerifierError::Unsupported(_)));
    assert!(err.stage().is_none());
}

proptest! {
    #[test]
    fn prop_untagged_addresses_are_deliverable(
        user in "[a-z0-9.]{1,20}",
        domain in "[a-z0-9]{1,12}\\.[a-z]{2,4}",
    ) {
        prop_assume!(!CASES.iter().any(|c| user.starts_with(c.tag) || user.contains('+')));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let email = format!("{user}@{domain}");
        let verification = runtime
            .block_on(SandboxVerifier::new().verify(&email, VerifyOptions::new()))
            .unwrap();

        prop_assert_eq!(verification.response.result, Some(VerificationResult::Deliverable));
        prop_assert_eq!(verification.response.user, user);
        prop_assert_eq!(verification.response.domain, domain);
    }
}
