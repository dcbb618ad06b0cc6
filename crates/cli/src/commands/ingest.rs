//! `lectern ingest`: load a folder of course documents.

use std::path::PathBuf;

pub async fn run(folder: PathBuf, clear: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_, assistant) = super::load_assistant().await?;

    if !folder.is_dir() {
        return Err(format!("Folder not found: {}", folder.display()).into());
    }

    let report = assistant.add_course_folder(&folder, clear).await?;

    println!(
        "Added {} course(s), {} chunk(s) from {}",
        report.courses_added,
        report.chunks_added,
        folder.display()
    );
    for title in &report.skipped {
        println!("  skipped (already indexed): {title}");
    }

    Ok(())
}
