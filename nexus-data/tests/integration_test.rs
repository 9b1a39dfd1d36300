//! Integration tests running the full pipeline over the on-disk fixtures.

use chrono::NaiveDate;
use nexus_core::calculations::{AnalysisInput, NexusEngine, SalesAggregator};
use nexus_core::{AnalysisResult, NexusStatus, RuleRepository, RuleSnapshot};
use nexus_data::{AnalysisContext, JsonRuleRepository, RuleBook, TransactionLoader, parse_settings};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

const TRANSACTIONS_CSV: &str = include_str!("../test-data/transactions.csv");
const RULES_JSON: &str = include_str!("../test-data/rules.json");
const CONTEXT_JSON: &str = include_str!("../test-data/context.json");
const SETTINGS_TOML: &str = include_str!("../test-data/settings.toml");

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn run_fixtures(as_of: NaiveDate) -> AnalysisResult {
    let transactions =
        TransactionLoader::parse(TRANSACTIONS_CSV.as_bytes()).expect("Failed to parse CSV");
    let sales = SalesAggregator::aggregate(&transactions).expect("Failed to aggregate");

    let repo = JsonRuleRepository::from_json(RULES_JSON.as_bytes()).expect("Failed to parse rules");
    let snapshot = RuleSnapshot::load(&repo).await.expect("Failed to load rules");

    let mut input = AnalysisInput::from_aggregated(
        sales,
        snapshot.threshold_rules,
        snapshot.penalty_interest_configs,
        as_of,
    );
    AnalysisContext::from_json(CONTEXT_JSON.as_bytes())
        .expect("Failed to parse context")
        .apply(&mut input);

    let config = parse_settings(SETTINGS_TOML).expect("Failed to parse settings");
    NexusEngine::new(config).evaluate(&input)
}

#[tokio::test]
async fn test_full_analysis_summary() {
    let result = run_fixtures(date(2024, 12, 30)).await;

    assert_eq!(
        result.per_state.keys().cloned().collect::<Vec<_>>(),
        vec!["CA", "NV", "TX", "WA"]
    );
    assert_eq!(result.summary.states_with_nexus, 2);
    assert_eq!(result.summary.states_approaching, 0);
    assert_eq!(result.summary.states_flagged, 1);
    assert_eq!(
        result.summary.headline(),
        "3 of 4 states computed, 1 flagged for manual review"
    );
}

#[tokio::test]
async fn test_california_liability() {
    let result = run_fixtures(date(2024, 12, 30)).await;
    let year = &result.per_state["CA"].years[0];

    assert_eq!(year.year, 2023);
    assert_eq!(year.nexus.status, NexusStatus::HasNexus);
    assert_eq!(year.nexus.first_crossed_date, Some(date(2023, 9, 10)));

    let liability = year.liability.as_ref().unwrap();
    assert_eq!(liability.base_tax, dec!(39875.00));
    assert_eq!(liability.days_outstanding, 365);
    assert_eq!(liability.interest, dec!(2791.25));
    assert_eq!(liability.penalties.total, dec!(3987.50));
    assert_eq!(liability.total_liability, dec!(46653.75));
}

#[tokio::test]
async fn test_marketplace_sales_excluded_in_texas() {
    let result = run_fixtures(date(2024, 12, 30)).await;
    let year = &result.per_state["TX"].years[0];

    assert_eq!(year.nexus.status, NexusStatus::NoNexus);
    assert_eq!(year.nexus.comparison_sales, dec!(250000.00));
    assert_eq!(year.nexus.threshold_percent, dec!(50));
}

#[tokio::test]
async fn test_washington_prior_year_and_registration() {
    let result = run_fixtures(date(2024, 12, 30)).await;
    let years = &result.per_state["WA"].years;

    assert_eq!(years.len(), 2);
    assert_eq!(years[0].liability.as_ref().unwrap().base_tax, dec!(6500.00));

    assert_eq!(years[1].nexus.status, NexusStatus::HasNexus);
    assert_eq!(years[1].nexus.first_crossed_date, Some(date(2023, 1, 1)));
    assert!(!years[1].nexus.carried_forward);

    let liability = years[1].liability.as_ref().unwrap();
    assert_eq!(liability.due_date, date(2023, 6, 1));
    assert_eq!(liability.base_tax, dec!(325.00));
    assert!(!liability.registered);
}

#[tokio::test]
async fn test_state_without_rules_is_flagged() {
    let result = run_fixtures(date(2024, 12, 30)).await;
    let nv = &result.per_state["NV"];

    assert!(nv.years.is_empty());
    assert!(nv.error.is_some());
}

#[tokio::test]
async fn test_result_is_stable_across_runs() {
    let first = serde_json::to_string(&run_fixtures(date(2024, 12, 30)).await).unwrap();
    let second = serde_json::to_string(&run_fixtures(date(2024, 12, 30)).await).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_rules_document_round_trips() {
    let original: serde_json::Value = serde_json::from_str(RULES_JSON).unwrap();

    let book = RuleBook::from_json(RULES_JSON.as_bytes()).unwrap();
    let encoded: serde_json::Value = serde_json::from_str(&book.to_json().unwrap()).unwrap();

    assert_eq!(encoded, original);
}

#[tokio::test]
async fn test_repository_states_from_fixture() {
    let repo = JsonRuleRepository::from_json(RULES_JSON.as_bytes()).unwrap();

    assert_eq!(repo.states().await.unwrap(), vec!["CA", "TX", "WA"]);
    assert_eq!(repo.threshold_rules("WA").await.unwrap().len(), 2);
}
