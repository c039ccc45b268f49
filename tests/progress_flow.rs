use signchat::application_impl::RealProgressService;
use signchat::application_port::*;
use signchat::domain_model::*;
use signchat::infra_memory::MemoryGateway;
use std::sync::Arc;
use uuid::Uuid;

const LEARNER: UserId = UserId(Uuid::from_u128(1));

fn service() -> (Arc<MemoryGateway>, RealProgressService) {
    let gateway = Arc::new(MemoryGateway::default());
    let service = RealProgressService::new(gateway.clone(), gateway.clone());
    (gateway, service)
}

#[tokio::test]
async fn summary_tracks_started_and_completed() {
    let (_, service) = service();
    assert_eq!(
        service.tutorial_summary(LEARNER).await.unwrap(),
        ProgressSummary {
            total_started: 0,
            total_completed: 0,
            completion_percentage: 0,
        }
    );

    for n in 1..=3 {
        service
            .start_tutorial(LEARNER, TutorialId(Uuid::from_u128(n)))
            .await
            .unwrap();
    }
    service
        .mark_tutorial_done(LEARNER, TutorialId(Uuid::from_u128(1)))
        .await
        .unwrap();

    let summary = service.tutorial_summary(LEARNER).await.unwrap();
    assert_eq!(summary.total_started, 3);
    assert_eq!(summary.total_completed, 1);
    assert_eq!(summary.completion_percentage, 33);
}

#[tokio::test]
async fn restarting_a_tutorial_keeps_one_row() {
    let (_, service) = service();
    let tutorial = TutorialId(Uuid::from_u128(7));

    service.start_tutorial(LEARNER, tutorial).await.unwrap();
    service.start_tutorial(LEARNER, tutorial).await.unwrap();

    assert_eq!(service.tutorial_summary(LEARNER).await.unwrap().total_started, 1);
}

#[tokio::test]
async fn failing_quiz_attempt_is_overwritten_by_a_pass() {
    let (gateway, service) = service();
    let quiz = QuizSetId(Uuid::from_u128(40));
    let key: Vec<AnswerKey> = (1..=4)
        .map(|n| AnswerKey {
            question_id: QuizQuestionId(Uuid::from_u128(100 + n)),
            correct_answer: format!("sign-{n}"),
        })
        .collect();
    gateway.seed_quiz(quiz, key.clone());

    let answer = |k: &AnswerKey, text: &str| QuizAnswer {
        question_id: k.question_id,
        answer: text.to_owned(),
    };

    let wrong: Vec<QuizAnswer> = key.iter().map(|k| answer(k, "?")).collect();
    let failed = service.submit_quiz(LEARNER, quiz, &wrong).await.unwrap();
    assert_eq!(failed.score, 0);
    assert!(!failed.passed);

    // pass mark for four questions is three
    let mostly: Vec<QuizAnswer> = key
        .iter()
        .enumerate()
        .map(|(i, k)| if i < 3 { answer(k, &k.correct_answer) } else { answer(k, "?") })
        .collect();
    let passed = service.submit_quiz(LEARNER, quiz, &mostly).await.unwrap();
    assert_eq!(passed.score, 3);
    assert!(passed.passed);

    let saved = service.quiz_progress(LEARNER, quiz).await.unwrap().unwrap();
    assert!(saved.completed);
    assert_eq!(saved.score, 3);
    assert_eq!(service.quiz_history(LEARNER).await.unwrap().len(), 1);
}
