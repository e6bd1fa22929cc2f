//! Balance check business logic - The weekly reconciliation flow.
//!
//! The bot walks a user through the four wallets in a fixed order, collecting
//! the balance they actually counted for each. When all four are in, counted
//! and recorded balances are compared: a perfect match closes the check,
//! otherwise the user chooses between `!更新` (overwrite the ledger with the
//! counted values) and `!再入力` (start over). Progress is persisted per user
//! in `reconciliation_states`, so a bot restart resumes mid-flow and a
//! mid-flow user can answer with bare numbers from any channel.

use crate::{
    core::{
        clock, ledger, parser,
        report::{format_signed_yen, format_yen},
        wallet::Wallet,
    },
    entities::{ReconciliationState, reconciliation_state},
    errors::{Error, Result},
};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Message that applies the counted balances to the ledger.
pub const APPLY_KEYWORD: &str = "!更新";
/// Message that throws the counted balances away and restarts the check.
pub const RESTART_KEYWORD: &str = "!再入力";

/// Where a user currently is in the check flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    /// No check in progress.
    Idle,
    /// Waiting for the counted balance of this wallet.
    AwaitingWallet(Wallet),
    /// All four counted, a discrepancy was shown, waiting for
    /// `!更新` or `!再入力`.
    AwaitingDecision,
}

impl CheckState {
    fn as_column(self) -> Option<String> {
        match self {
            CheckState::Idle => None,
            CheckState::AwaitingWallet(wallet) => {
                Some(format!("waiting_for_balance_{}", wallet.slug()))
            }
            CheckState::AwaitingDecision => Some("waiting_for_reconciliation".to_string()),
        }
    }

    fn from_column(value: Option<&str>) -> Result<CheckState> {
        match value {
            None => Ok(CheckState::Idle),
            Some("waiting_for_reconciliation") => Ok(CheckState::AwaitingDecision),
            Some(other) => other
                .strip_prefix("waiting_for_balance_")
                .and_then(Wallet::from_slug)
                .map(CheckState::AwaitingWallet)
                .ok_or_else(|| Error::Config {
                    message: format!("Unknown reconciliation state: {other}"),
                }),
        }
    }
}

/// One wallet's counted-vs-recorded comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaRow {
    pub wallet: Wallet,
    pub reported: i64,
    pub recorded: i64,
}

impl DeltaRow {
    /// Positive when more money was counted than the ledger knows about.
    pub const fn delta(self) -> i64 {
        self.reported - self.recorded
    }
}

/// Comparison of all counted wallets against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    pub rows: Vec<DeltaRow>,
}

impl DeltaReport {
    pub fn total(&self) -> i64 {
        self.rows.iter().map(|row| row.delta()).sum()
    }
}

/// What happened when a mid-flow user's message was consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Input wasn't a number; ask for the same wallet again.
    Reprompt { wallet: Wallet },
    /// Input accepted; ask for the next wallet.
    NextWallet { wallet: Wallet },
    /// All four matched the ledger exactly; check closed.
    AllMatched,
    /// Mismatch found; waiting for an apply/restart decision.
    Discrepancy { report: DeltaReport },
    /// User chose `!更新`; ledger overwritten, check closed.
    Applied { report: DeltaReport },
    /// User chose `!再入力`; inputs cleared, asking for the first wallet.
    Restarted { wallet: Wallet },
    /// Input was neither keyword while a decision was pending.
    DecisionReprompt,
}

async fn state_row<C>(db: &C, user_id: &str) -> Result<Option<reconciliation_state::Model>>
where
    C: ConnectionTrait,
{
    ReconciliationState::find()
        .filter(reconciliation_state::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

fn slot(row: &reconciliation_state::Model, wallet: Wallet) -> Option<i64> {
    match wallet {
        Wallet::Pote => row.input_pote,
        Wallet::Nushi => row.input_nushi,
        Wallet::Expedition => row.input_expedition,
        Wallet::Savings => row.input_savings,
    }
}

fn set_slot(active: &mut reconciliation_state::ActiveModel, wallet: Wallet, value: Option<i64>) {
    match wallet {
        Wallet::Pote => active.input_pote = Set(value),
        Wallet::Nushi => active.input_nushi = Set(value),
        Wallet::Expedition => active.input_expedition = Set(value),
        Wallet::Savings => active.input_savings = Set(value),
    }
}

fn clear_slots(active: &mut reconciliation_state::ActiveModel) {
    for wallet in Wallet::SEQUENCE {
        set_slot(active, wallet, None);
    }
}

/// Puts a user at the start of the check flow, clearing any half-finished
/// inputs, and returns the first wallet to ask about.
pub async fn start_check(db: &DatabaseConnection, user_id: &str) -> Result<Wallet> {
    let first = Wallet::SEQUENCE[0];

    match state_row(db, user_id).await? {
        Some(row) => {
            let mut active = reconciliation_state::ActiveModel::from(row);
            active.state = Set(CheckState::AwaitingWallet(first).as_column());
            clear_slots(&mut active);
            active.updated_at = Set(Utc::now());
            active.update(db).await?;
        }
        None => {
            let active = reconciliation_state::ActiveModel {
                user_id: Set(user_id.to_string()),
                state: Set(CheckState::AwaitingWallet(first).as_column()),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            active.insert(db).await?;
        }
    }

    Ok(first)
}

/// Consumes one message from a user who may be mid-check. Returns `Ok(None)`
/// when the user is idle and the message should flow on to the other
/// handlers; otherwise the message belonged to the check and the returned
/// `Advance` says how to answer.
pub async fn handle_message(
    db: &DatabaseConnection,
    user_id: &str,
    text: &str,
) -> Result<Option<Advance>> {
    let Some(row) = state_row(db, user_id).await? else {
        return Ok(None);
    };

    match CheckState::from_column(row.state.as_deref())? {
        CheckState::Idle => Ok(None),
        CheckState::AwaitingWallet(wallet) => {
            let Some(value) = parse_reported_balance(text) else {
                return Ok(Some(Advance::Reprompt { wallet }));
            };
            accept_input(db, row, wallet, value, user_id).await.map(Some)
        }
        CheckState::AwaitingDecision => {
            let trimmed = text.trim();
            if trimmed == APPLY_KEYWORD {
                apply_counted(db, row, user_id).await.map(Some)
            } else if trimmed == RESTART_KEYWORD {
                let first = start_check(db, user_id).await?;
                Ok(Some(Advance::Restarted { wallet: first }))
            } else {
                Ok(Some(Advance::DecisionReprompt))
            }
        }
    }
}

/// Stores one counted balance and moves the flow forward: on to the next
/// wallet, or into comparison once the last slot is filled.
async fn accept_input(
    db: &DatabaseConnection,
    row: reconciliation_state::Model,
    wallet: Wallet,
    value: i64,
    user_id: &str,
) -> Result<Advance> {
    let mut filled = row.clone();
    match wallet {
        Wallet::Pote => filled.input_pote = Some(value),
        Wallet::Nushi => filled.input_nushi = Some(value),
        Wallet::Expedition => filled.input_expedition = Some(value),
        Wallet::Savings => filled.input_savings = Some(value),
    }

    let mut active = reconciliation_state::ActiveModel::from(row);
    set_slot(&mut active, wallet, Some(value));
    active.updated_at = Set(Utc::now());

    if let Some(next_wallet) = wallet.next_in_sequence() {
        active.state = Set(CheckState::AwaitingWallet(next_wallet).as_column());
        active.update(db).await?;
        return Ok(Advance::NextWallet {
            wallet: next_wallet,
        });
    }

    let report = build_report(db, user_id, &filled).await?;
    if report.total() == 0 {
        active.state = Set(CheckState::Idle.as_column());
        active.last_checked_at = Set(Some(Utc::now()));
        active.update(db).await?;
        Ok(Advance::AllMatched)
    } else {
        active.state = Set(CheckState::AwaitingDecision.as_column());
        active.update(db).await?;
        Ok(Advance::Discrepancy { report })
    }
}

/// Applies the counted balances to the ledger and closes the check. The
/// ledger overwrites, the adjustment row, and the state reset share one
/// database transaction.
async fn apply_counted(
    db: &DatabaseConnection,
    row: reconciliation_state::Model,
    user_id: &str,
) -> Result<Advance> {
    let txn = db.begin().await?;

    let report = build_report(&txn, user_id, &row).await?;
    let targets: Vec<(Wallet, i64)> = report
        .rows
        .iter()
        .map(|delta| (delta.wallet, delta.reported))
        .collect();
    ledger::apply_reconciliation(&txn, user_id, &targets).await?;

    let mut active = reconciliation_state::ActiveModel::from(row);
    active.state = Set(CheckState::Idle.as_column());
    clear_slots(&mut active);
    active.last_checked_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(Advance::Applied { report })
}

/// Compares every filled input slot against the ledger.
async fn build_report<C>(
    db: &C,
    user_id: &str,
    row: &reconciliation_state::Model,
) -> Result<DeltaReport>
where
    C: ConnectionTrait,
{
    let mut rows = Vec::new();
    for wallet in Wallet::SEQUENCE {
        let Some(reported) = slot(row, wallet) else {
            continue;
        };
        let recorded = ledger::balance_of(db, user_id, wallet).await?;
        rows.push(DeltaRow {
            wallet,
            reported,
            recorded,
        });
    }
    Ok(DeltaReport { rows })
}

/// Reads a counted balance out of a reply. Accepts full-width digits, comma
/// grouping, and a trailing 円; anything else (including negative numbers)
/// is rejected so typos re-prompt instead of corrupting the check.
fn parse_reported_balance(text: &str) -> Option<i64> {
    let normalized = parser::normalize_digits(text.trim());
    let stripped = normalized.trim_end_matches('円');
    let digits: String = stripped
        .chars()
        .filter(|c| *c != ',' && *c != '，')
        .collect();
    let digits = digits.trim();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Users the weekly kickoff considers: everyone with a wallet row or a past
/// check, de-duplicated and sorted for stable announcement order.
async fn known_users(db: &DatabaseConnection) -> Result<Vec<String>> {
    use crate::entities::{WalletBalance, wallet_balance};

    let mut users: Vec<String> = WalletBalance::find()
        .select_only()
        .column(wallet_balance::Column::UserId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    let checked: Vec<String> = ReconciliationState::find()
        .select_only()
        .column(reconciliation_state::Column::UserId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    users.extend(checked);
    users.sort();
    users.dedup();
    Ok(users)
}

/// Weekly scheduled entry point: starts a check for every known user who
/// hasn't completed one since local Monday 00:00 and isn't already mid-flow.
/// Returns the users whose checks were started.
pub async fn weekly_kickoff(
    db: &DatabaseConnection,
    now_local: DateTime<FixedOffset>,
) -> Result<Vec<String>> {
    let week_start = clock::week_start(now_local);
    let mut started = Vec::new();

    for user_id in known_users(db).await? {
        if let Some(row) = state_row(db, &user_id).await? {
            if CheckState::from_column(row.state.as_deref())? != CheckState::Idle {
                info!(user_id, "skipping weekly check, already mid-flow");
                continue;
            }
            if row.last_checked_at.is_some_and(|at| at >= week_start) {
                continue;
            }
        }
        start_check(db, &user_id).await?;
        started.push(user_id);
    }

    Ok(started)
}

/// First prompt of a check, shared by the slash command and the weekly job.
pub fn prompt_start(wallet: Wallet) -> String {
    format!("💰 残高チェックをはじめるよ！「{wallet}」にいくら入ってるか数えて教えてね")
}

/// User-facing reply for each advance of the flow.
pub fn format_advance(advance: &Advance) -> String {
    use std::fmt::Write;

    match advance {
        Advance::Reprompt { wallet } => {
            format!("🤔 数字が読めなかったよ。「{wallet}」の残高を数字で教えてね（例: 1500）")
        }
        Advance::NextWallet { wallet } => {
            format!("👛 つぎは「{wallet}」の残高を教えてね")
        }
        Advance::AllMatched => "✅ ぜんぶ記録とぴったり！今週のチェックはおしまい。".to_string(),
        Advance::Discrepancy { report } => {
            let mut message = String::from("⚠️ 記録とズレがあったよ:\n");
            for row in &report.rows {
                if row.delta() == 0 {
                    continue;
                }
                let _ = writeln!(
                    &mut message,
                    "・「{}」 記録 {} / 数えた {} （{}）",
                    row.wallet,
                    format_yen(row.recorded),
                    format_yen(row.reported),
                    format_signed_yen(row.delta()),
                );
            }
            let _ = write!(
                &mut message,
                "合計 {}\n数えた残高で上書きするなら「{APPLY_KEYWORD}」、最初からやり直すなら「{RESTART_KEYWORD}」と送ってね",
                format_signed_yen(report.total()),
            );
            message
        }
        Advance::Applied { report } => {
            format!(
                "✅ 数えた残高で更新したよ！（調整 {}）今週のチェックはおしまい。",
                format_signed_yen(report.total())
            )
        }
        Advance::Restarted { wallet } => {
            format!("🔁 やり直すね。「{wallet}」の残高から教えてね")
        }
        Advance::DecisionReprompt => {
            format!("「{APPLY_KEYWORD}」か「{RESTART_KEYWORD}」で答えてね")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::TimeZone;

    async fn answer(db: &DatabaseConnection, text: &str) -> Advance {
        handle_message(db, "user1", text).await.unwrap().unwrap()
    }

    #[test]
    fn test_state_column_round_trip() {
        for state in [
            CheckState::Idle,
            CheckState::AwaitingWallet(Wallet::Pote),
            CheckState::AwaitingWallet(Wallet::Savings),
            CheckState::AwaitingDecision,
        ] {
            let column = state.as_column();
            assert_eq!(CheckState::from_column(column.as_deref()).unwrap(), state);
        }
        assert!(CheckState::from_column(Some("waiting_for_balance_piggy")).is_err());
    }

    #[test]
    fn test_parse_reported_balance() {
        assert_eq!(parse_reported_balance("1500"), Some(1500));
        assert_eq!(parse_reported_balance(" 1500円 "), Some(1500));
        assert_eq!(parse_reported_balance("1,500円"), Some(1500));
        assert_eq!(parse_reported_balance("１５００"), Some(1500));
        assert_eq!(parse_reported_balance("0"), Some(0));
        assert_eq!(parse_reported_balance("-100"), None);
        assert_eq!(parse_reported_balance("500円だよ"), None);
        assert_eq!(parse_reported_balance("たくさん"), None);
        assert_eq!(parse_reported_balance(""), None);
    }

    #[tokio::test]
    async fn test_idle_user_messages_flow_through() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(handle_message(&db, "user1", "1500").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_full_check_all_matching() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 1000).await?;
        seed_balance(&db, "user1", Wallet::Nushi, 500).await?;

        let first = start_check(&db, "user1").await?;
        assert_eq!(first, Wallet::Pote);

        assert_eq!(
            answer(&db, "1000").await,
            Advance::NextWallet {
                wallet: Wallet::Nushi
            }
        );
        assert_eq!(
            answer(&db, "500").await,
            Advance::NextWallet {
                wallet: Wallet::Expedition
            }
        );
        assert_eq!(
            answer(&db, "0").await,
            Advance::NextWallet {
                wallet: Wallet::Savings
            }
        );
        assert_eq!(answer(&db, "0").await, Advance::AllMatched);

        // Flow is closed and stamped
        assert!(handle_message(&db, "user1", "9999").await?.is_none());
        let row = state_row(&db, "user1").await?.unwrap();
        assert!(row.state.is_none());
        assert!(row.last_checked_at.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_non_numeric_input_reprompts_same_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        start_check(&db, "user1").await?;

        assert_eq!(
            answer(&db, "わかんない").await,
            Advance::Reprompt {
                wallet: Wallet::Pote
            }
        );
        // Still waiting for the same wallet
        assert_eq!(
            answer(&db, "300").await,
            Advance::NextWallet {
                wallet: Wallet::Nushi
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_discrepancy_then_apply() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 1000).await?;

        start_check(&db, "user1").await?;
        answer(&db, "900").await; // pote counted 100 short
        answer(&db, "0").await;
        answer(&db, "0").await;
        let got = answer(&db, "0").await;

        let Advance::Discrepancy { report } = got else {
            panic!("expected discrepancy, got {got:?}");
        };
        assert_eq!(report.total(), -100);

        // Random chatter while deciding just re-prompts
        assert_eq!(answer(&db, "どうしよう").await, Advance::DecisionReprompt);

        let got = answer(&db, APPLY_KEYWORD).await;
        let Advance::Applied { report } = got else {
            panic!("expected applied, got {got:?}");
        };
        assert_eq!(report.total(), -100);

        assert_eq!(ledger::balance_of(&db, "user1", Wallet::Pote).await?, 900);
        let adjustments = ledger::history(&db, "user1", 10).await?;
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].kind, "adjustment");
        assert_eq!(adjustments[0].amount, -100);

        Ok(())
    }

    #[tokio::test]
    async fn test_discrepancy_then_restart() -> Result<()> {
        let db = setup_test_db().await?;
        seed_balance(&db, "user1", Wallet::Pote, 1000).await?;

        start_check(&db, "user1").await?;
        answer(&db, "900").await;
        answer(&db, "0").await;
        answer(&db, "0").await;
        answer(&db, "0").await;

        assert_eq!(
            answer(&db, RESTART_KEYWORD).await,
            Advance::Restarted {
                wallet: Wallet::Pote
            }
        );

        // Ledger untouched, inputs cleared, back at the first wallet
        assert_eq!(ledger::balance_of(&db, "user1", Wallet::Pote).await?, 1000);
        let row = state_row(&db, "user1").await?.unwrap();
        assert_eq!(row.input_pote, None);
        assert_eq!(
            CheckState::from_column(row.state.as_deref())?,
            CheckState::AwaitingWallet(Wallet::Pote)
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_weekly_kickoff_starts_stale_users_only() -> Result<()> {
        let db = setup_test_db().await?;
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        // Friday 2024-05-10 20:00 JST
        let now_local = Utc
            .with_ymd_and_hms(2024, 5, 10, 11, 0, 0)
            .unwrap()
            .with_timezone(&offset);

        seed_balance(&db, "user1", Wallet::Pote, 100).await?;
        seed_balance(&db, "user2", Wallet::Pote, 100).await?;
        seed_balance(&db, "user3", Wallet::Pote, 100).await?;

        // user2 already checked this week (Wednesday)
        seed_checked_at(
            &db,
            "user2",
            Utc.with_ymd_and_hms(2024, 5, 8, 3, 0, 0).unwrap(),
        )
        .await?;
        // user3 is mid-flow
        start_check(&db, "user3").await?;

        let started = weekly_kickoff(&db, now_local).await?;
        assert_eq!(started, vec!["user1".to_string()]);

        // user1 is now mid-flow; a second kickoff the same evening is a no-op
        let again = weekly_kickoff(&db, now_local).await?;
        assert!(again.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_weekly_kickoff_reruns_after_week_boundary() -> Result<()> {
        let db = setup_test_db().await?;
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();

        seed_balance(&db, "user1", Wallet::Pote, 100).await?;
        // Checked on Friday 2024-05-10
        seed_checked_at(
            &db,
            "user1",
            Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        )
        .await?;

        // Same week: skipped
        let saturday = Utc
            .with_ymd_and_hms(2024, 5, 11, 11, 0, 0)
            .unwrap()
            .with_timezone(&offset);
        assert!(weekly_kickoff(&db, saturday).await?.is_empty());

        // Next Friday: due again
        let next_friday = Utc
            .with_ymd_and_hms(2024, 5, 17, 11, 0, 0)
            .unwrap()
            .with_timezone(&offset);
        assert_eq!(weekly_kickoff(&db, next_friday).await?.len(), 1);

        Ok(())
    }

    #[test]
    fn test_format_advance_discrepancy_lists_only_mismatches() {
        let report = DeltaReport {
            rows: vec![
                DeltaRow {
                    wallet: Wallet::Pote,
                    reported: 900,
                    recorded: 1000,
                },
                DeltaRow {
                    wallet: Wallet::Nushi,
                    reported: 500,
                    recorded: 500,
                },
            ],
        };
        let text = format_advance(&Advance::Discrepancy { report });
        assert!(text.contains("ぽて財布"));
        assert!(!text.contains("ぬし財布"));
        assert!(text.contains(APPLY_KEYWORD));
        assert!(text.contains(RESTART_KEYWORD));
    }
}
