pub mod ask;
pub mod courses;
pub mod ingest;
pub mod init;
pub mod serve;

use lectern_agent::CourseAssistant;
use lectern_config::AppConfig;

/// Load configuration and build the assistant it describes.
pub async fn load_assistant() -> Result<(AppConfig, CourseAssistant), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let assistant = CourseAssistant::from_config(&config).await?;
    Ok((config, assistant))
}
