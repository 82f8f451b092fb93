use assess_core::model::{
    Category, CategoryKey, PassThreshold, ProgressRecord, Question, QuestionId, QuestionOption,
    Tier,
};
use assess_core::time::fixed_now;
use storage::repository::{
    ProfileRepository, ProgressRepository, QuestionRepository, ThresholdRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect() -> SqliteRepository {
    let repo = SqliteRepository::connect("sqlite::memory:").await.unwrap();
    repo.migrate().await.unwrap();
    repo
}

fn build_question(id: &str, tier_level: u8, production: bool) -> Question {
    Question {
        id: QuestionId::new(id),
        category: Category::Instrument,
        sub_category: "guitar".to_owned(),
        tier_level,
        question_text: "Which string is tuned to E2?".to_owned(),
        media_url: Some("https://cdn.example.com/audio/e2.mp3".to_owned()),
        options: vec![
            QuestionOption::correct("a", "The sixth string"),
            QuestionOption::incorrect("b", "The first string"),
            QuestionOption::incorrect("c", "The third string"),
        ],
        is_production: production,
    }
}

#[tokio::test]
async fn question_round_trip_preserves_options() {
    let repo = connect().await;
    let question = build_question("q1", 1, true);
    repo.upsert_question(&question).await.unwrap();

    let fetched = repo
        .fetch_questions(Category::Instrument, "guitar", 1, true)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0], question);
    assert!(fetched[0].options[0].is_correct());
    assert!(!fetched[0].options[1].is_correct());
}

#[tokio::test]
async fn production_filter_hides_draft_questions() {
    let repo = connect().await;
    repo.upsert_question(&build_question("q1", 1, true))
        .await
        .unwrap();
    repo.upsert_question(&build_question("q2", 1, false))
        .await
        .unwrap();

    let production = repo
        .fetch_questions(Category::Instrument, "guitar", 1, true)
        .await
        .unwrap();
    assert_eq!(production.len(), 1);

    let all = repo
        .fetch_questions(Category::Instrument, "guitar", 1, false)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn missing_questions_yield_an_empty_list() {
    let repo = connect().await;
    let fetched = repo
        .fetch_questions(Category::Songwriting, "songwriting", 4, true)
        .await
        .unwrap();
    assert!(fetched.is_empty());
}

#[tokio::test]
async fn threshold_round_trip_and_miss() {
    let repo = connect().await;
    repo.upsert_threshold(
        Category::Instrument,
        "guitar",
        "guitar",
        PassThreshold::new(80),
    )
    .await
    .unwrap();

    let hit = repo
        .fetch_threshold(Category::Instrument, "guitar", "guitar")
        .await
        .unwrap();
    assert_eq!(hit, Some(PassThreshold::new(80)));

    let miss = repo
        .fetch_threshold(Category::Theory, "theory", "general")
        .await
        .unwrap();
    assert_eq!(miss, None);
}

#[tokio::test]
async fn progress_upsert_is_keyed_by_user_and_category() {
    let repo = connect().await;
    let key = CategoryKey::new(Category::Instrument, Some("guitar".to_owned()));

    let mut record = ProgressRecord::new("user-1", &key, Tier::Basic, 5, 10);
    repo.upsert_progress(&record).await.unwrap();

    record.current_tier = Tier::Basic.level();
    record.highest_tier_reached = 1;
    record.total_score = 9;
    record.completed_at = Some(fixed_now());
    repo.upsert_progress(&record).await.unwrap();

    let records = repo.fetch_progress("user-1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_score, 9);
    assert_eq!(records[0].completed_at, Some(fixed_now()));

    assert!(repo.fetch_progress("user-2").await.unwrap().is_empty());
}

#[tokio::test]
async fn skill_tier_updates_accumulate_per_user() {
    let repo = connect().await;
    repo.update_skill_tier("user-1", "instrument_guitar", "basic")
        .await
        .unwrap();
    repo.update_skill_tier("user-1", "theory", "intermediate")
        .await
        .unwrap();
    repo.update_skill_tier("user-1", "instrument_guitar", "intermediate")
        .await
        .unwrap();

    let tiers = repo.skill_tiers("user-1").await.unwrap();
    assert_eq!(tiers.len(), 2);
    assert_eq!(
        tiers.get("instrument_guitar").map(String::as_str),
        Some("intermediate")
    );
    assert_eq!(tiers.get("theory").map(String::as_str), Some("intermediate"));
}
