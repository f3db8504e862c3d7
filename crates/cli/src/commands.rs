//! Command dispatch: builds the infrastructure for each command and prints
//! the outcome to stdout.

use std::time::Duration;

use anyhow::Context;
use clap::{Args, Subcommand};
use tracing::{info, warn};

use github::{RetryingClient, TokenClientFactory};
use predictor::HttpLabelPredictor;
use triage::{
    BoardTriage, CardRule, ColumnId, IssueNumber, Labeler, MoveReport, RepositoryRef, SyncReport,
};

use crate::config::{Config, GithubConfig, Routine};

type Client = RetryingClient<TokenClientFactory>;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Predict area labels for an issue or pull request.
    Predict {
        /// Repository as `owner/name`.
        #[arg(long)]
        repo: RepositoryRef,
        #[arg(long)]
        number: u64,
        /// Add the best label when it clears the threshold.
        #[arg(long)]
        apply: bool,
        /// Print the suggestion as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Project board triage routines.
    Board {
        #[command(subcommand)]
        action: BoardCommand,
    },
}

#[derive(Debug, Args)]
pub struct RepoArg {
    /// Repository as `owner/name`.
    #[arg(long)]
    pub repo: RepositoryRef,
}

#[derive(Debug, Subcommand)]
pub enum BoardCommand {
    /// Add cards for untriaged issues in the configured areas.
    AddUntriaged(RepoArg),
    /// Add cards for open pull requests in the configured areas.
    AddPrs(RepoArg),
    /// Add cards for triaged issues carrying `milestone`.
    AddMilestone {
        #[command(flatten)]
        repo: RepoArg,
        #[arg(long)]
        milestone: String,
        /// Target column; defaults to the matching `milestone_rules` entry.
        #[arg(long)]
        column: Option<u64>,
    },
    /// Move cards whose issue carries the milestone to the future column.
    MoveMilestone {
        #[command(flatten)]
        repo: RepoArg,
        /// Defaults to `board.move_milestone`.
        #[arg(long)]
        milestone: Option<String>,
    },
    /// Run every routine listed in `board.enabled`.
    Run(RepoArg),
}

pub async fn run(command: Command, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Predict {
            repo,
            number,
            apply,
            json,
        } => predict(config, repo, IssueNumber::new(number), apply, json).await,
        Command::Board { action } => board(config, action).await,
    }
}

fn retrying_client(github: &GithubConfig, user: bool) -> Client {
    if user {
        RetryingClient::new(github.user_factory())
    } else {
        RetryingClient::new(github.app_factory())
    }
}

async fn predict(
    config: &Config,
    repo: RepositoryRef,
    number: IssueNumber,
    apply: bool,
    json: bool,
) -> anyhow::Result<()> {
    let predictor = HttpLabelPredictor::new(
        config.labeler.predictor_url.clone(),
        Duration::from_secs(config.labeler.predictor_timeout_secs),
    )
    .context("failed to create label predictor")?;
    let labeler = Labeler::new(
        retrying_client(&config.github, false),
        predictor,
        config.labeler.settings(),
    );

    let outcome = labeler
        .predict_and_apply(&repo, number, apply || config.labeler.apply_labels)
        .await
        .with_context(|| format!("failed to label {repo}#{number}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.suggestion)?);
    } else {
        println!("{repo}#{number}");
        for prediction in &outcome.suggestion.predictions {
            println!("  {:<40} {:.3}", prediction.label, prediction.score.as_f64());
        }
        match &outcome.applied {
            Some(label) => println!("applied: {label}"),
            None => println!("applied: none"),
        }
    }
    Ok(())
}

async fn board(config: &Config, action: BoardCommand) -> anyhow::Result<()> {
    let repo = match &action {
        BoardCommand::AddUntriaged(arg) | BoardCommand::AddPrs(arg) | BoardCommand::Run(arg) => {
            arg.repo.clone()
        }
        BoardCommand::AddMilestone { repo, .. } | BoardCommand::MoveMilestone { repo, .. } => {
            repo.repo.clone()
        }
    };
    let board = &config.board;
    let triage = BoardTriage::new(
        retrying_client(&config.github, true),
        repo,
        board.project()?,
    )?;

    match action {
        BoardCommand::AddUntriaged(_) => add_untriaged(&triage, config).await,
        BoardCommand::AddPrs(_) => add_prs(&triage, config).await,
        BoardCommand::AddMilestone {
            milestone, column, ..
        } => {
            let column = match column {
                Some(id) => ColumnId::new(id),
                None => milestone_column(config, &milestone)?,
            };
            add_milestone(&triage, config, &milestone, column).await
        }
        BoardCommand::MoveMilestone { milestone, .. } => {
            let milestone = milestone.unwrap_or_else(|| board.move_milestone.clone());
            move_milestone(&triage, config, &milestone).await
        }
        BoardCommand::Run(_) => run_enabled(&triage, config).await,
    }
}

fn milestone_column(config: &Config, milestone: &str) -> anyhow::Result<ColumnId> {
    config
        .board
        .milestone_rules
        .iter()
        .find(|rule| rule.milestone == milestone)
        .map(|rule| ColumnId::new(rule.column))
        .with_context(|| format!("no column configured for milestone '{milestone}'"))
}

/// One routine invocation of `board run`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BoardStep {
    AddUntriaged,
    MoveMilestone(String),
    AddPrs,
    AddMilestone { milestone: String, column: ColumnId },
}

/// Expands `board.enabled` into steps, always in the order untriaged,
/// milestone move, pull requests, then one step per milestone rule.
fn plan_board_run(config: &Config) -> Vec<BoardStep> {
    let board = &config.board;
    let mut steps = Vec::new();
    for routine in [
        Routine::AddUntriaged,
        Routine::MoveMilestone,
        Routine::AddPrs,
        Routine::AddMilestone,
    ] {
        if !board.enabled.contains(&routine) {
            continue;
        }
        match routine {
            Routine::AddUntriaged => steps.push(BoardStep::AddUntriaged),
            Routine::MoveMilestone => {
                steps.push(BoardStep::MoveMilestone(board.move_milestone.clone()))
            }
            Routine::AddPrs => steps.push(BoardStep::AddPrs),
            Routine::AddMilestone => {
                steps.extend(board.milestone_rules.iter().map(|rule| BoardStep::AddMilestone {
                    milestone: rule.milestone.clone(),
                    column: ColumnId::new(rule.column),
                }))
            }
        }
    }
    steps
}

async fn run_enabled(triage: &BoardTriage<Client>, config: &Config) -> anyhow::Result<()> {
    let steps = plan_board_run(config);
    if steps.is_empty() {
        warn!("No board routines enabled");
        return Ok(());
    }

    for step in steps {
        info!(?step, "Running board routine");
        match step {
            BoardStep::AddUntriaged => add_untriaged(triage, config).await?,
            BoardStep::MoveMilestone(milestone) => {
                move_milestone(triage, config, &milestone).await?
            }
            BoardStep::AddPrs => add_prs(triage, config).await?,
            BoardStep::AddMilestone { milestone, column } => {
                add_milestone(triage, config, &milestone, column).await?
            }
        }
    }
    Ok(())
}

async fn add_untriaged(triage: &BoardTriage<Client>, config: &Config) -> anyhow::Result<()> {
    let board = &config.board;
    let rule = CardRule::untriaged_issues(
        board.column("board.columns.untriaged", board.columns.untriaged)?,
        board.untriaged_label.clone(),
        board.area_labels()?,
    );
    sync(triage, &rule).await
}

async fn add_prs(triage: &BoardTriage<Client>, config: &Config) -> anyhow::Result<()> {
    let board = &config.board;
    let rule = CardRule::active_pull_requests(
        board.column("board.columns.active_prs", board.columns.active_prs)?,
        board.area_labels()?,
    );
    sync(triage, &rule).await
}

async fn add_milestone(
    triage: &BoardTriage<Client>,
    config: &Config,
    milestone: &str,
    column: ColumnId,
) -> anyhow::Result<()> {
    let board = &config.board;
    let rule = CardRule::triaged_with_milestone(
        column,
        milestone,
        board.area_labels()?,
        board.triage_labels.clone(),
    );
    sync(triage, &rule).await
}

async fn move_milestone(
    triage: &BoardTriage<Client>,
    config: &Config,
    milestone: &str,
) -> anyhow::Result<()> {
    let board = &config.board;
    let from = board.column("board.columns.uncommitted", board.columns.uncommitted)?;
    let to = board.column("board.columns.future", board.columns.future)?;
    let report = triage
        .move_by_milestone(from, to, milestone, &board.skip_set())
        .await
        .with_context(|| format!("failed to move '{milestone}' cards"))?;
    print_move(milestone, &report);
    Ok(())
}

async fn sync(triage: &BoardTriage<Client>, rule: &CardRule) -> anyhow::Result<()> {
    let report = triage
        .sync(rule)
        .await
        .with_context(|| format!("routine '{}' failed", rule.name))?;
    print_sync(&report);
    Ok(())
}

fn print_sync(report: &SyncReport) {
    println!(
        "{}: created {}, already present {}, not admitted {}, failed {}",
        report.rule,
        report.created.len(),
        report.already_present,
        report.not_admitted,
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  #{}: {}", failure.number, failure.error);
    }
}

fn print_move(milestone: &str, report: &MoveReport) {
    println!(
        "move-milestone {milestone}: moved {}, left {}, skipped {}, failed {}",
        report.moved.len(),
        report.left_in_place,
        report.skipped.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  #{}: {}", failure.number, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MilestoneRule;

    #[test]
    fn milestone_column_uses_configured_rule() {
        let mut config = Config::default();
        config.board.milestone_rules = vec![MilestoneRule {
            milestone: "6.0.0".into(),
            column: 9664733,
        }];

        assert_eq!(
            milestone_column(&config, "6.0.0").unwrap(),
            ColumnId::new(9664733)
        );
        assert!(milestone_column(&config, "7.0.0").is_err());
    }

    fn rules() -> Vec<MilestoneRule> {
        vec![
            MilestoneRule {
                milestone: "6.0.0".into(),
                column: 9664733,
            },
            MilestoneRule {
                milestone: "Future".into(),
                column: 12751157,
            },
        ]
    }

    #[test]
    fn board_run_uses_fixed_order_regardless_of_config_order() {
        let mut config = Config::default();
        config.board.milestone_rules = rules();
        config.board.enabled = vec![
            Routine::AddMilestone,
            Routine::AddPrs,
            Routine::MoveMilestone,
            Routine::AddUntriaged,
        ];

        assert_eq!(
            plan_board_run(&config),
            vec![
                BoardStep::AddUntriaged,
                BoardStep::MoveMilestone("Future".into()),
                BoardStep::AddPrs,
                BoardStep::AddMilestone {
                    milestone: "6.0.0".into(),
                    column: ColumnId::new(9664733),
                },
                BoardStep::AddMilestone {
                    milestone: "Future".into(),
                    column: ColumnId::new(12751157),
                },
            ]
        );
    }

    #[test]
    fn board_run_skips_routines_that_are_not_enabled() {
        let mut config = Config::default();
        config.board.milestone_rules = rules();

        assert_eq!(plan_board_run(&config), vec![BoardStep::AddPrs]);

        config.board.enabled = vec![Routine::MoveMilestone];
        config.board.move_milestone = "7.0.0".into();
        assert_eq!(
            plan_board_run(&config),
            vec![BoardStep::MoveMilestone("7.0.0".into())]
        );

        config.board.enabled.clear();
        assert!(plan_board_run(&config).is_empty());
    }
}
