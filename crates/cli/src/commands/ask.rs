//! `lectern ask`: single-question or interactive mode.

use lectern_agent::{CourseAssistant, QueryResponse};
use lectern_config::AppConfig;
use lectern_core::message::SessionId;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(question: Option<String>, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, assistant) = super::load_assistant().await?;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!("No API key configured.");
        eprintln!("Set LECTERN_API_KEY (or ANTHROPIC_API_KEY / OPENAI_API_KEY), or add api_key to");
        eprintln!("  {}", AppConfig::config_dir().join("config.toml").display());
        return Err("No API key found".into());
    }

    let session_id = session.map(SessionId::from);

    match question {
        Some(question) => {
            let response = assistant.query(&question, session_id).await?;
            print_response(&response);
        }
        None => interactive(&assistant, &config, session_id).await?,
    }

    Ok(())
}

async fn interactive(
    assistant: &CourseAssistant,
    config: &AppConfig,
    mut session_id: Option<SessionId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let analytics = assistant.analytics().await?;
    println!();
    println!("  Lectern, interactive mode");
    println!("  Provider: {}", config.default_provider);
    println!("  Model:    {}", config.default_model);
    println!("  Courses:  {}", analytics.total_courses);
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        match assistant.query(line, session_id.clone()).await {
            Ok(response) => {
                session_id = Some(response.session_id.clone());
                print_response(&response);
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!();
    Ok(())
}

fn print_response(response: &QueryResponse) {
    println!();
    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &response.sources {
            match &source.link {
                Some(link) => println!("  - {} ({link})", source.text),
                None => println!("  - {}", source.text),
            }
        }
    }
    println!();
    println!("session: {}", response.session_id);
}
