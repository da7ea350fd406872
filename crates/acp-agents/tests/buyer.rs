mod common;

use std::sync::Arc;

use acp_agents::{AgentError, BuyerAction, BuyerAgent, BuyerConfig, CommerceError};
use acp_types::{MemoId, Phase};
use chrono::Utc;
use serde_json::json;

use common::{calls, job, memo, seller_profile, Call, CallLog, RecordingClient, BUYER, SELLER};

fn buyer(log: &CallLog, config: BuyerConfig) -> BuyerAgent {
    BuyerAgent::new(Arc::new(RecordingClient::new(BUYER, log.clone())), config)
}

#[tokio::test]
async fn test_pays_when_requirement_proposes_transaction() {
    let log = CallLog::default();
    let agent = buyer(&log, BuyerConfig::default());

    let requirement = memo(10, 1, Phase::Transaction, "Job 1 accepted, please make payment to proceed", SELLER);
    let action = agent
        .on_new_task(job(1, Phase::Negotiation), Some(requirement))
        .await
        .unwrap();

    assert_eq!(action, BuyerAction::PayAndAccept);
    assert_eq!(calls(&log), vec![Call::PayAndAccept(acp_types::JobId(1))]);
}

#[tokio::test]
async fn test_accepts_rejection_memo() {
    let log = CallLog::default();
    let agent = buyer(&log, BuyerConfig::default());

    let rejection = memo(11, 1, Phase::Rejected, "Job requirement does not meet agent capability", SELLER);
    let action = agent
        .on_new_task(job(1, Phase::Transaction), Some(rejection))
        .await
        .unwrap();

    assert_eq!(
        action,
        BuyerAction::SignRejection {
            memo_id: MemoId(11),
            accept: true
        }
    );
    assert_eq!(
        calls(&log),
        vec![Call::SignMemo(MemoId(11), true, "Accepts job rejection".to_string())]
    );
}

#[tokio::test]
async fn test_contests_rejection_when_configured() {
    let log = CallLog::default();
    let agent = buyer(
        &log,
        BuyerConfig {
            accept_rejections: false,
            ..Default::default()
        },
    );

    let rejection = memo(11, 1, Phase::Rejected, "nope", SELLER);
    agent
        .on_new_task(job(1, Phase::Transaction), Some(rejection))
        .await
        .unwrap();

    assert_eq!(
        calls(&log),
        vec![Call::SignMemo(MemoId(11), false, "Buyer contests job rejection".to_string())]
    );
}

#[tokio::test]
async fn test_terminal_phases_make_no_calls() {
    let log = CallLog::default();
    let agent = buyer(&log, BuyerConfig::default());

    let mut completed = job(1, Phase::Completed);
    completed.deliverable = Some(json!({"response": "This is a test response", "is_success": true}));

    assert_eq!(
        agent.on_new_task(completed, None).await.unwrap(),
        BuyerAction::LogDeliverable
    );
    assert_eq!(
        agent.on_new_task(job(2, Phase::Rejected), None).await.unwrap(),
        BuyerAction::LogRejected
    );
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn test_unmatched_pairs_are_ignored() {
    let log = CallLog::default();
    let agent = buyer(&log, BuyerConfig::default());

    let cases = vec![
        (job(1, Phase::Request), None),
        (job(1, Phase::Request), Some(memo(1, 1, Phase::Negotiation, "", SELLER))),
        (job(1, Phase::Negotiation), None),
        (job(1, Phase::Negotiation), Some(memo(2, 1, Phase::Rejected, "", SELLER))),
        (job(1, Phase::Transaction), None),
        (job(1, Phase::Transaction), Some(memo(3, 1, Phase::Evaluation, "", SELLER))),
        (job(1, Phase::Evaluation), Some(memo(4, 1, Phase::Completed, "", SELLER))),
    ];

    for (job, memo) in cases {
        assert_eq!(agent.decide(&job, memo.as_ref()), BuyerAction::Ignore);
        assert_eq!(agent.on_new_task(job, memo).await.unwrap(), BuyerAction::Ignore);
    }
    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn test_commerce_failure_is_returned() {
    let log = CallLog::default();
    let client = RecordingClient::new(BUYER, log.clone()).failing(CommerceError::InvalidTransition {
        job_id: acp_types::JobId(1),
        phase: Phase::Transaction,
        action: "pay".to_string(),
    });
    let agent = BuyerAgent::new(Arc::new(client), BuyerConfig::default());

    let err = agent
        .on_new_task(
            job(1, Phase::Negotiation),
            Some(memo(10, 1, Phase::Transaction, "", SELLER)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AgentError::Commerce(CommerceError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_initiate_job_uses_first_offering() {
    let log = CallLog::default();
    let client = RecordingClient::new(BUYER, log.clone()).with_agents(vec![
        seller_profile("eval-seller", &["meme_generator", "tweet"]),
        seller_profile("other-seller", &["summary"]),
    ]);
    let agent = BuyerAgent::new(Arc::new(client), BuyerConfig::default());

    let before = Utc::now();
    let job_id = agent.initiate_job().await.unwrap();
    assert_eq!(job_id, acp_types::JobId(1));

    let recorded = calls(&log);
    assert_eq!(recorded[0], Call::Browse("Chromia's EVAL".to_string()));
    match &recorded[1] {
        Call::Initiate {
            offering,
            requirement,
            expires_at,
        } => {
            assert_eq!(offering, "meme_generator");
            assert_eq!(requirement, &json!({"details": "testing transaction"}));
            let ttl = *expires_at - before;
            assert!(ttl >= chrono::Duration::hours(23) && ttl <= chrono::Duration::hours(25));
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[tokio::test]
async fn test_initiate_job_without_agents_fails() {
    let log = CallLog::default();
    let agent = buyer(&log, BuyerConfig::default());

    let err = agent.initiate_job().await.unwrap_err();
    assert!(matches!(err, AgentError::NoAgentsFound { ref keyword } if keyword == "Chromia's EVAL"));
}

#[tokio::test]
async fn test_initiate_job_without_offerings_fails() {
    let log = CallLog::default();
    let client = RecordingClient::new(BUYER, log.clone())
        .with_agents(vec![seller_profile("empty-seller", &[])]);
    let agent = BuyerAgent::new(Arc::new(client), BuyerConfig::default());

    let err = agent.initiate_job().await.unwrap_err();
    assert!(matches!(err, AgentError::NoOfferings { ref agent } if agent == "empty-seller"));
}
