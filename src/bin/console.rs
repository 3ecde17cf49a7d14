//! Interactive console session against the orchestration core.
//!
//! A thin transport: reads utterances from stdin, routes them, and prints
//! the result. `:commands` drive the stage tree and the audit log.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use eco_bot::{
    CannedCompletion, Classification, DigitalTwin, GeneralManager, OrchestratorConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let twin = Arc::new(DigitalTwin::new());
    let manager = GeneralManager::new(
        OrchestratorConfig::default(),
        Arc::new(CannedCompletion::new()),
        Arc::clone(&twin),
    );

    println!("Eco-Bot console. Type an utterance, or :begin, :advance, :audit, :hunt, :quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            ":quit" | ":exit" => break,
            ":begin" => {
                let stage = manager.begin_conversation();
                let (prompt, guidance) = manager.stage_prompt()?;
                println!("[{stage}] {prompt}");
                println!("  ({guidance})");
            }
            ":advance" => match manager.advance_stage() {
                Ok(stage) => {
                    let (prompt, guidance) = manager.stage_prompt()?;
                    println!("[{stage}] {prompt}");
                    println!("  ({guidance})");
                }
                Err(err) => println!("{err}"),
            },
            ":audit" => {
                for record in twin.records() {
                    println!(
                        "{} [{:?}] {}: {}",
                        record.timestamp, record.severity, record.actor, record.action
                    );
                }
            }
            ":hunt" => {
                let mut clean = true;
                for finding in twin.bug_hunt() {
                    clean = false;
                    println!(
                        "unrecovered failure by {} at record {}: {}",
                        finding.actor, finding.record_index, finding.action
                    );
                }
                if clean {
                    println!("no findings");
                }
            }
            utterance => {
                let result = manager.route(utterance).await;
                match result.classification {
                    Classification::Unclassified => {
                        println!("(unclassified) {}", result.text);
                    }
                    _ => {
                        let agent = result.source_agent.as_deref().unwrap_or("?");
                        println!("[{agent}] {}", result.text);
                    }
                }
            }
        }
    }

    Ok(())
}
