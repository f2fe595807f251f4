//! Courses command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::VectorStore;
use anyhow::Result;
use console::style;

/// Run the courses command.
pub async fn run_courses(settings: &Settings) -> Result<()> {
    let store = VectorStore::from_settings(settings)?;
    let courses = store.get_all_courses_metadata().await?;

    if courses.is_empty() {
        Output::info("No courses indexed yet. Use 'course-rag index <dir>' to add content.");
        return Ok(());
    }

    Output::header(&format!("Indexed Courses ({})", courses.len()));
    println!();

    for course in &courses {
        let instructor = course.instructor.as_deref().unwrap_or("unknown instructor");
        println!(
            "  {} {} ({}, {} lessons)",
            style("*").cyan(),
            style(&course.title).bold(),
            style(instructor).dim(),
            course.lessons.len()
        );
    }

    Ok(())
}
