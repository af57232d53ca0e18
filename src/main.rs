use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use aisp_lib::case_library::JsonCaseLibrary;
use aisp_lib::config::AppConfig;
use aisp_lib::db::{open_database, SqliteSessionStore};
use aisp_lib::models::ScoreResult;
use aisp_lib::pipeline::dialogue::{
    start_idle_sweeper, ChatCompletionClient, DialogueOrchestrator, GenerationParams, ReplyKind,
};
use aisp_lib::pipeline::scoring::RubricScorer;

#[derive(Parser)]
#[command(name = "aisp")]
#[command(about = "Console practice session with the simulated patient", long_about = None)]
struct Cli {
    /// Student identifier
    #[arg(long)]
    user: String,

    /// Case identifier from the cases directory
    #[arg(long = "case")]
    case_id: String,
}

const END_COMMAND: &str = "/end";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    aisp_lib::init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let conn = open_database(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let cases = JsonCaseLibrary::load_dir(&config.cases_dir)?;
    let client = ChatCompletionClient::new(&config.provider)?;

    let orchestrator = Arc::new(DialogueOrchestrator::new(
        Arc::new(SqliteSessionStore::new(conn)),
        Arc::new(cases),
        Arc::new(client),
        RubricScorer::new(config.rubric),
        config.dialogue.clone(),
        GenerationParams::from(&config.provider),
    ));
    let sweeper = start_idle_sweeper(Arc::clone(&orchestrator));

    let start = orchestrator.start(&cli.user, &cli.case_id).await?;
    let session_id = start.session.id;
    if start.resumed {
        for message in orchestrator.transcript(&session_id)? {
            println!("[{}] {}", message.role, message.content);
        }
    } else {
        println!("[patient] {}", start.opening.content);
    }
    println!("(输入问题开始问诊，输入 `{END_COMMAND} <诊断>` 结束)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(diagnosis) = line.strip_prefix(END_COMMAND) {
            let result = orchestrator.end(&session_id, diagnosis).await?;
            print_report(&result);
            break;
        }

        let reply = orchestrator.turn(&session_id, line).await?;
        let tag = match reply.kind {
            ReplyKind::Reply => reply
                .metadata
                .emotion
                .map(|e| e.label().to_string())
                .unwrap_or_default(),
            ReplyKind::Refusal => "拒答".to_string(),
            ReplyKind::DangerWarning => "提示".to_string(),
            ReplyKind::Fallback => String::new(),
        };
        if tag.is_empty() {
            println!("[{}] {}", reply.role, reply.text);
        } else {
            println!("[{}|{}] {}", reply.role, tag, reply.text);
        }
    }

    sweeper.join().await;
    Ok(())
}

fn print_report(result: &ScoreResult) {
    println!();
    println!(
        "总分 {:.2}  等级 {}  {}",
        result.final_score,
        result.grade,
        if result.passed { "通过" } else { "未通过" }
    );
    println!(
        "问诊 {:.2}（关键问题覆盖 {}/{}）",
        result.inquiry.total, result.inquiry.covered_count, result.inquiry.total_questions
    );
    println!(
        "诊断 {:.2}（{}，鉴别诊断 {} 个）",
        result.diagnosis.total, result.diagnosis.accuracy, result.diagnosis.differential_count
    );
    println!(
        "沟通 {:.2}（{} 轮，礼貌用语 {:.0}%）",
        result.communication.total,
        result.communication.turn_count,
        result.communication.politeness_rate * 100.0
    );
    for suggestion in &result.suggestions {
        println!("- [{}] {}", suggestion.dimension, suggestion.text);
    }
    println!("{}", result.overall_comment);
}
