//! Plain-text rendering for the terminal.
use std::fmt::Write;

use quikthread_core::{JobPhase, JobStatus, ProcessingViewModel, ThreadRecord, ThreadStats};

const BAR_WIDTH: usize = 30;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

// `write!` into a String cannot fail; results are discarded throughout.

pub fn processing_view(view: &ProcessingViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.headline);
    let _ = writeln!(out, "{}", view.subtitle);
    let _ = writeln!(
        out,
        "{} {:>3}%  {}",
        progress_bar(view.progress),
        view.progress,
        view.step
    );
    if let Some(error) = &view.error {
        let _ = writeln!(out, "Error: {error}");
    }
    let actions = actions(view);
    if !actions.is_empty() {
        let _ = writeln!(out, "{}", actions.join("  "));
    }
    out
}

/// Buttons the view offers, with the key that presses each.
fn actions(view: &ProcessingViewModel) -> Vec<&'static str> {
    if view.error.is_some() {
        vec!["[t] Try again", "[d] Go to dashboard"]
    } else if view.can_view_thread {
        vec!["[v] View your thread"]
    } else {
        Vec::new()
    }
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn thread_table(threads: &[&ThreadRecord]) -> String {
    if threads.is_empty() {
        return "No threads found.\n".to_string();
    }
    let id_width = threads
        .iter()
        .map(|thread| thread.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<id_width$}  {:<10}  {:>4}  {:>5}  {:<16}  TITLE",
        "ID", "STATUS", "PCT", "POSTS", "CREATED"
    );
    for thread in threads {
        let posts = thread
            .tweets
            .map_or_else(|| "-".to_string(), |count| count.to_string());
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<10}  {:>4}  {:>5}  {:<16}  {}",
            thread.id,
            thread.status.as_str(),
            format!("{}%", thread.progress),
            posts,
            thread.created_at.format(TIME_FORMAT).to_string(),
            thread.title
        );
    }
    out
}

pub fn thread_details(thread: &ThreadRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ID:       {}", thread.id);
    let _ = writeln!(out, "Title:    {}", thread.title);
    if let Some(topic) = thread.topic.as_deref().filter(|topic| *topic != thread.title) {
        let _ = writeln!(out, "Topic:    {topic}");
    }
    let _ = writeln!(
        out,
        "Status:   {} ({}%)",
        thread.status.as_str(),
        thread.progress
    );
    let _ = writeln!(out, "Created:  {}", thread.created_at.format(TIME_FORMAT));
    if let Some(posts) = thread.tweets {
        let _ = writeln!(out, "Posts:    {posts}");
    }
    if let Some(preview) = &thread.preview {
        let _ = writeln!(out, "Preview:  {preview}");
    }
    if let Some(error) = &thread.error {
        let _ = writeln!(out, "Error:    {error}");
    }
    out
}

pub fn stats(stats: &ThreadStats) -> String {
    format!(
        "Threads: {} ({} processing, {} complete, {} failed)\nPosts generated: {}\n",
        stats.total, stats.processing, stats.complete, stats.failed, stats.posts
    )
}

/// The results view: every format with its posts, in the order received.
pub fn completed_job(status: &JobStatus) -> String {
    let JobPhase::Completed(done) = status.phase() else {
        return "The last job has no generated posts.\n".to_string();
    };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} posts in {} formats",
        done.total_posts(),
        done.posts.len()
    );
    for (format, posts) in &done.posts {
        let _ = writeln!(out, "\n## {} ({})", format, posts.len());
        for (index, post) in posts.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", index + 1, post);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use quikthread_core::{RemoteStage, ThreadStatus};

    use super::*;

    fn view(progress: u8, error: Option<&str>) -> ProcessingViewModel {
        ProcessingViewModel {
            headline: "Generating Your Thread".to_string(),
            subtitle: "Processing: My Topic".to_string(),
            step: "Crafting engaging tweets...".to_string(),
            progress,
            error: error.map(str::to_string),
            can_view_thread: progress == 100,
            dirty: true,
        }
    }

    #[test]
    fn running_view_has_bar_and_no_actions() {
        let text = processing_view(&view(50, None));
        assert_eq!(
            text,
            "Generating Your Thread\nProcessing: My Topic\n\
             [###############---------------]  50%  Crafting engaging tweets...\n"
        );
    }

    #[test]
    fn finished_and_failed_views_offer_buttons() {
        assert!(processing_view(&view(100, None)).ends_with("[v] View your thread\n"));
        let failed = processing_view(&view(0, Some("quota exceeded")));
        assert!(failed.contains("Error: quota exceeded\n"));
        assert!(failed.contains("[t] Try again  [d] Go to dashboard"));
    }

    #[test]
    fn table_lists_rows_under_header() {
        let mut record = ThreadRecord::processing(
            "job-1",
            "My Topic",
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        );
        record.status = ThreadStatus::Complete;
        record.progress = 100;
        record.tweets = Some(4);

        let text = thread_table(&[&record]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID     STATUS"));
        assert_eq!(
            lines[1],
            "job-1  complete    100%      4  2024-05-01 09:30  My Topic"
        );
        assert_eq!(thread_table(&[]), "No threads found.\n");
    }

    #[test]
    fn results_list_formats_in_order() {
        let mut posts = quikthread_core::PostsByFormat::new();
        posts.insert("one_liner".to_string(), vec!["Short".to_string()]);
        posts.insert(
            "thread".to_string(),
            vec!["First".to_string(), "Second".to_string()],
        );
        let status = JobStatus::new(RemoteStage::Completed).with_posts(posts);

        assert_eq!(
            completed_job(&status),
            "3 posts in 2 formats\n\n## one_liner (1)\n1. Short\n\n## thread (2)\n1. First\n2. Second\n"
        );
        assert_eq!(
            completed_job(&JobStatus::new(RemoteStage::Completed)),
            "The last job has no generated posts.\n"
        );
    }

    #[test]
    fn stats_summary() {
        let text = stats(&ThreadStats {
            total: 3,
            processing: 1,
            complete: 1,
            failed: 1,
            posts: 7,
        });
        assert_eq!(
            text,
            "Threads: 3 (1 processing, 1 complete, 1 failed)\nPosts generated: 7\n"
        );
    }
}
