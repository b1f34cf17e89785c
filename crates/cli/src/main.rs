use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use triage_core::{
    config::{match_strategy_from_env_value, match_threshold_from_env_value},
    constants::{DEFAULT_FAILURE_LOG_PATH, DEFAULT_KB_PATH},
    CoreConfig, FailureLog, KnowledgeBase, MatchStrategy, TriageService,
};
use triage_types::Gender;

mod interview;

use interview::Interview;

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Symptom triage questionnaire CLI")]
struct Cli {
    /// Knowledge base CSV (default: $TRIAGE_KB_PATH or data/symptom_kb.csv)
    #[arg(long, global = true)]
    kb: Option<PathBuf>,
    /// Similarity threshold for free-text matching, in (0, 1]
    #[arg(long, global = true)]
    threshold: Option<f64>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the questionnaire interactively
    Check {
        /// Directory the report is saved into when a check completes
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// List primary categories
    Categories {
        /// Hide categories reserved for the other gender
        #[arg(long)]
        gender: Option<Gender>,
    },
    /// Match free-text symptoms against the knowledge base
    Search {
        /// Comma-separated symptoms, e.g. "headache, fever"
        symptoms: String,
        /// `anchored` or `phrase`
        #[arg(long)]
        strategy: Option<MatchStrategy>,
    },
    /// Load the knowledge base and summarise it
    Validate,
    /// Show the failure log
    Failures,
}

fn core_config(cli: &Cli) -> Result<CoreConfig, Box<dyn Error>> {
    let kb_path = cli
        .kb
        .clone()
        .or_else(|| env::var("TRIAGE_KB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KB_PATH));
    let failure_log =
        env::var("TRIAGE_FAILURE_LOG").unwrap_or_else(|_| DEFAULT_FAILURE_LOG_PATH.into());
    let threshold = match cli.threshold {
        Some(t) => t,
        None => match_threshold_from_env_value(env::var("TRIAGE_MATCH_THRESHOLD").ok())?,
    };
    let strategy = match_strategy_from_env_value(env::var("TRIAGE_MATCH_STRATEGY").ok())?;

    Ok(CoreConfig::new(
        kb_path,
        env::var("TRIAGE_KB_URL").ok(),
        PathBuf::from(failure_log),
        threshold,
        strategy,
    )?)
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(core_config(&cli)?);

    match cli.command {
        Some(Commands::Check { report_dir }) => {
            let service = TriageService::load(cfg)?;
            let mut nav = service.start_session();
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            Interview::new(stdin.lock(), stdout.lock(), report_dir.as_deref()).run(&mut nav)?;
        }
        Some(Commands::Categories { gender }) => {
            let service = TriageService::load(cfg)?;
            for category in service.categories(gender) {
                println!("{}", category);
            }
        }
        Some(Commands::Search { symptoms, strategy }) => {
            let service = TriageService::load(cfg)?;
            let matches = service.search(&symptoms, strategy)?;
            if matches.is_empty() {
                println!("No matching conditions.");
            } else {
                for row in matches {
                    println!(
                        "{} / {}: {} (acuity {})",
                        row.primary_category, row.sub_category, row.condition, row.acuity_level
                    );
                }
            }
        }
        Some(Commands::Validate) => {
            let kb = KnowledgeBase::load(&cfg)?;
            for line in summarise(&kb) {
                println!("{}", line);
            }
        }
        Some(Commands::Failures) => {
            let log = FailureLog::new(cfg.failure_log_path());
            let entries = log.entries()?;
            if entries.is_empty() {
                println!("No failures logged.");
            }
            for entry in entries {
                println!(
                    "{} {} {}",
                    entry.timestamp.to_rfc3339(),
                    entry.reason,
                    entry.detail
                );
            }
        }
        None => {
            println!("No command given. Try `triage --help`.");
        }
    }

    Ok(())
}

/// Condition counts per category plus warnings about rows that can never be told apart.
fn summarise(kb: &KnowledgeBase) -> Vec<String> {
    let mut lines = vec![format!(
        "{} conditions in {} categories",
        kb.len(),
        kb.primary_categories().len()
    )];

    for primary in kb.primary_categories() {
        let count = kb
            .records()
            .iter()
            .filter(|r| r.primary_category == primary)
            .count();
        lines.push(format!("  {primary}: {count}"));
    }

    let mut seen: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();
    for row in kb.records() {
        *seen
            .entry((
                row.primary_category.as_str(),
                row.sub_category.as_str(),
                row.condition.as_str(),
            ))
            .or_default() += 1;
    }
    for ((primary, sub, condition), count) in seen {
        if count > 1 {
            lines.push(format!(
                "warning: {condition} is listed {count} times under {primary} / {sub}"
            ));
        }
    }
    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub const KB: &str = "\
Primary Category,SubCategory,Condition,Symptoms,Clarifying Questions 1,Clarifying Questions2,RiskFlags,Acuity Level,Default Recommendation,Escalated Recommendation,Referral
Headache,Throbbing,Migraine,\"headache, nausea\",Is the pain on one side?,Do you see flashing lights?,Pregnancy,2,Rest in a dark room.,See a GP today.,
Headache,Throbbing,Tension Headache,\"headache, neck stiffness\",Is the pain on one side?,Is it worse under stress?,,1,Take simple analgesia.,See a GP.,
Women's Health,Pelvic,Pelvic Inflammatory Disease,\"pelvic pain, fever\",Is there unusual discharge?,,,2,Book a GP visit.,Go to clinic today.,
";

    pub fn service(dir: &TempDir) -> TriageService {
        let cfg = CoreConfig::new(
            dir.path().join("kb.csv"),
            None,
            dir.path().join("failures.csv"),
            0.65,
            MatchStrategy::Anchored,
        )
        .expect("valid config");
        let kb = KnowledgeBase::from_reader(KB.as_bytes()).expect("test knowledge base");
        TriageService::new(Arc::new(cfg), kb)
    }

    #[test]
    fn summary_counts_categories_and_flags_duplicates() {
        let mut csv = KB.to_string();
        csv.push_str("Headache,Throbbing,Migraine,aura,,,,2,Rest.,See a GP.,\n");
        let kb = KnowledgeBase::from_reader(csv.as_bytes()).unwrap();

        let lines = summarise(&kb);
        assert_eq!(lines[0], "4 conditions in 2 categories");
        assert!(lines.contains(&"  Headache: 3".to_string()));
        assert!(lines
            .iter()
            .any(|l| l == "warning: Migraine is listed 2 times under Headache / Throbbing"));
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from(["triage", "--kb", "custom.csv", "--threshold", "0.8", "validate"]);
        let cfg = core_config(&cli).unwrap();
        assert_eq!(cfg.kb_path(), std::path::Path::new("custom.csv"));
        assert_eq!(cfg.match_threshold(), 0.8);
    }

    #[test]
    fn subcommands_parse_typed_arguments() {
        let cli = Cli::parse_from(["triage", "search", "fever", "--strategy", "phrase"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Search {
                strategy: Some(MatchStrategy::Phrase),
                ..
            })
        ));
        let cli = Cli::parse_from(["triage", "categories", "--gender", "female"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Categories {
                gender: Some(Gender::Female)
            })
        ));
    }
}
