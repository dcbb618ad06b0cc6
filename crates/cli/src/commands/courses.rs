//! `lectern courses`: list what is in the index.

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (_, assistant) = super::load_assistant().await?;
    let analytics = assistant.analytics().await?;

    if analytics.total_courses == 0 {
        println!("No courses indexed. Run `lectern ingest <folder>` first.");
        return Ok(());
    }

    println!("{} course(s):", analytics.total_courses);
    for title in &analytics.course_titles {
        println!("  - {title}");
    }

    Ok(())
}
