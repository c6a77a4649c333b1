use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use insightloop_core::{
    InterviewOutcome, InterviewRunner, SaveOutcome, StepKind, Submission, TranscriptGateway,
    TranscriptRecord,
};
use insightloop_guide::{CoreQuestion, StudyConfig};
use insightloop_logging::Logger;
use insightloop_oracle::{DecisionOracle, DecisionRequest, OracleDecision, OracleError};

/// Oracle that replays scripted results, counting calls
struct ScriptedOracle {
    script: Mutex<VecDeque<Result<OracleDecision, OracleError>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<DecisionRequest>>,
    delay: Duration,
}

impl ScriptedOracle {
    fn new(script: Vec<Result<OracleDecision, OracleError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    fn failing() -> Self {
        Self::new(Vec::new())
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn decide(&self, request: &DecisionRequest) -> Result<OracleDecision, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Unavailable("script exhausted".to_string())))
    }
}

/// Gateway that records every transcript it is handed
#[derive(Default)]
struct RecordingGateway {
    saved: Mutex<Vec<TranscriptRecord>>,
    fail: bool,
}

#[async_trait]
impl TranscriptGateway for RecordingGateway {
    fn name(&self) -> &str {
        "Recording"
    }

    async fn save(&self, record: &TranscriptRecord) -> SaveOutcome {
        self.saved.lock().unwrap().push(record.clone());
        if self.fail {
            SaveOutcome::failed("store offline")
        } else {
            SaveOutcome::saved("stored")
        }
    }
}

fn guide(questions: &[&str]) -> StudyConfig {
    StudyConfig::new(
        "Commute Study",
        "Understand commuting pain",
        questions.iter().map(|q| CoreQuestion::new(*q)).collect(),
    )
}

fn advance(next: &str) -> Result<OracleDecision, OracleError> {
    Ok(OracleDecision {
        next_question: next.to_string(),
        is_probe: false,
        topic_exhausted: false,
        reasoning: "answered fully".to_string(),
    })
}

fn probe(next: &str) -> Result<OracleDecision, OracleError> {
    Ok(OracleDecision {
        next_question: next.to_string(),
        is_probe: true,
        topic_exhausted: false,
        reasoning: "answer was shallow".to_string(),
    })
}

fn finish() -> Result<OracleDecision, OracleError> {
    Ok(OracleDecision {
        next_question: String::new(),
        is_probe: false,
        topic_exhausted: true,
        reasoning: "goal covered".to_string(),
    })
}

fn runner(
    config: StudyConfig,
    oracle: Arc<ScriptedOracle>,
    gateway: Arc<RecordingGateway>,
) -> InterviewRunner {
    InterviewRunner::start(config, oracle, gateway, Arc::new(Logger::silent())).unwrap()
}

#[tokio::test]
async fn test_oracle_advances_then_finishes() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        advance("Q2"),
        advance("Q3"),
        finish(),
    ]));
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2", "Q3"]), oracle.clone(), gateway.clone());

    for answer in ["a1", "a2"] {
        assert!(matches!(runner.submit(answer).await, Submission::Asked { kind: StepKind::Core, .. }));
    }
    let outcome = match runner.submit("a3").await {
        Submission::Completed(outcome) => outcome,
        other => panic!("expected completion, got {other:?}"),
    };

    let state = runner.snapshot();
    assert!(state.is_complete);
    assert_eq!(state.core_question_index, 2);
    assert_eq!(state.steps.len(), 3);
    assert!(state.steps.iter().all(|s| s.response.is_some()));
    assert!(matches!(outcome, InterviewOutcome::Completed { steps: 3, fallbacks: 0, .. }));
    assert_eq!(oracle.calls(), 3);

    let saved = runner.take_persistence().unwrap().await.unwrap();
    assert!(saved.is_saved());
    let records = gateway.saved.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].study_name, "Commute Study");
    assert_eq!(&records[0].respondent_id, outcome.respondent_id());
}

#[tokio::test]
async fn test_probe_keeps_topic_before_advancing() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        probe("What makes it hard?"),
        advance("Q2"),
        finish(),
    ]));
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2", "Q3"]), oracle, gateway);

    match runner.submit("it's fine").await {
        Submission::Asked {
            kind,
            question,
            progress,
        } => {
            assert_eq!(kind, StepKind::Probe);
            assert_eq!(question, "What makes it hard?");
            assert_eq!(progress, 33);
        }
        other => panic!("expected probe, got {other:?}"),
    }
    assert_eq!(runner.snapshot().core_question_index, 0);

    runner.submit("the traffic").await;
    let state = runner.snapshot();
    assert_eq!(state.core_question_index, 1);
    let kinds: Vec<StepKind> = state.steps.iter().map(|s| s.kind).collect();
    assert_eq!(kinds, vec![StepKind::Core, StepKind::Probe, StepKind::Core]);
    assert_eq!(runner.progress(), 67);
}

#[tokio::test]
async fn test_failing_oracle_walks_guide_verbatim() {
    let oracle = Arc::new(ScriptedOracle::failing());
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["First?", "Second?"]), oracle.clone(), gateway.clone());

    match runner.submit("one").await {
        Submission::Asked { kind, question, .. } => {
            assert_eq!(kind, StepKind::Core);
            assert_eq!(question, "Second?");
        }
        other => panic!("expected fallback question, got {other:?}"),
    }

    let outcome = match runner.submit("two").await {
        Submission::Completed(outcome) => outcome,
        other => panic!("expected completion, got {other:?}"),
    };
    assert!(matches!(outcome, InterviewOutcome::Completed { steps: 2, fallbacks: 2, .. }));

    let questions: Vec<String> = runner
        .snapshot()
        .steps
        .into_iter()
        .map(|s| s.question)
        .collect();
    assert_eq!(questions, vec!["First?", "Second?"]);
    assert_eq!(oracle.calls(), 2);

    runner.take_persistence().unwrap().await.unwrap();
    assert_eq!(gateway.saved.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_timeout_feeds_fallback() {
    let oracle = Arc::new(ScriptedOracle::new(vec![advance("never seen")]).with_delay(Duration::from_secs(5)));
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2"]), oracle, gateway)
        .with_decision_timeout(Duration::from_millis(50));

    match runner.submit("answer").await {
        Submission::Asked { question, .. } => assert_eq!(question, "Q2"),
        other => panic!("expected fallback, got {other:?}"),
    }
    assert!(!runner.is_processing());
}

#[tokio::test]
async fn test_single_flight_while_deciding() {
    let oracle = Arc::new(
        ScriptedOracle::new(vec![advance("Q2")]).with_delay(Duration::from_millis(100)),
    );
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2"]), oracle.clone(), gateway);

    let (first, second) = tokio::join!(runner.submit("first"), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(runner.is_processing());
        runner.submit("second").await
    });

    assert!(matches!(first, Submission::Asked { .. }));
    assert!(matches!(second, Submission::Ignored));
    assert_eq!(oracle.calls(), 1);
    assert_eq!(runner.snapshot().steps[0].response.as_deref(), Some("first"));
}

#[tokio::test]
async fn test_blank_answer_never_reaches_oracle() {
    let oracle = Arc::new(ScriptedOracle::new(vec![advance("Q2")]));
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2"]), oracle.clone(), gateway);

    let before = runner.snapshot();
    assert!(matches!(runner.submit("   ").await, Submission::Ignored));
    assert_eq!(runner.snapshot(), before);
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_request_carries_goal_guide_and_transcript() {
    let oracle = Arc::new(ScriptedOracle::new(vec![probe("Why?"), advance("Q2")]));
    let gateway = Arc::new(RecordingGateway::default());
    let config = StudyConfig::new(
        "Study",
        "Find the pain",
        vec![CoreQuestion::new("Q1").with_probe("Really?"), CoreQuestion::new("Q2")],
    );
    let runner = runner(config, oracle.clone(), gateway);

    runner.submit("a1").await;
    runner.submit("a2").await;

    let requests = oracle.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].goal, "Find the pain");
    assert_eq!(requests[1].core_questions[0].predefined_probes, vec!["Really?"]);
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[1].kind, StepKind::Probe);
    assert_eq!(requests[1].history[1].response.as_deref(), Some("a2"));
}

#[tokio::test]
async fn test_failed_save_does_not_block_completion() {
    let oracle = Arc::new(ScriptedOracle::new(vec![finish()]));
    let gateway = Arc::new(RecordingGateway {
        fail: true,
        ..Default::default()
    });
    let runner = runner(guide(&["Q1"]), oracle, gateway);

    assert!(matches!(runner.submit("done").await, Submission::Completed(_)));
    assert!(runner.is_complete());

    let saved = runner.take_persistence().unwrap().await.unwrap();
    assert_eq!(saved, SaveOutcome::failed("store offline"));
    assert!(runner.is_complete());
}

#[tokio::test]
async fn test_exit_persists_nothing() {
    let oracle = Arc::new(ScriptedOracle::new(vec![advance("Q2")]));
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2"]), oracle, gateway.clone());

    runner.submit("a1").await;
    let outcome = runner.exit().unwrap();

    assert!(matches!(outcome, InterviewOutcome::Exited { steps: 1, .. }));
    assert_eq!(outcome.exit_code(), 130);
    assert!(runner.current_question().is_none());
    assert!(matches!(runner.submit("a2").await, Submission::Ignored));
    assert!(runner.take_persistence().is_none());
    assert!(gateway.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_pointer_never_skips() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        probe("P1"),
        Err(OracleError::ResponseInvalid("bad json".to_string())),
        probe("P2"),
        advance("Q3"),
        Err(OracleError::Timeout(Duration::from_secs(1))),
    ]));
    let gateway = Arc::new(RecordingGateway::default());
    let runner = runner(guide(&["Q1", "Q2", "Q3", "Q4"]), oracle, gateway);

    let mut last_index = runner.snapshot().core_question_index;
    let mut last_len = runner.snapshot().steps.len();
    for answer in ["a", "b", "c", "d", "e"] {
        runner.submit(answer).await;
        let state = runner.snapshot();
        assert!(state.core_question_index >= last_index);
        assert!(state.core_question_index - last_index <= 1);
        assert_eq!(state.steps.len(), last_len + 1);
        last_index = state.core_question_index;
        last_len = state.steps.len();
    }

    let state = runner.snapshot();
    assert_eq!(state.core_question_index, 3);
    assert_eq!(state.probe_count(), 2);
    assert_eq!(state.steps.last().map(|s| s.question.as_str()), Some("Q4"));
}
