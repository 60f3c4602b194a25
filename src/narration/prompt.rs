//! Cluster description prompt.

/// Default character budget for the titles and summaries block.
pub const DEFAULT_PROMPT_CHAR_BUDGET: usize = 5000;

const PREAMBLE: &str = "You are analyzing a cluster of academic documents. Based on the following \
titles and summaries, provide a concise description of what this cluster represents. What is the \
common theme or research area?";

const INSTRUCTION: &str =
    "Provide a 2-3 sentence summary describing the common theme of these documents:";

/// Titles as bullets followed by summaries separated by blank lines.
#[must_use]
pub fn combined_cluster_text(titles: &[&str], summaries: &[&str]) -> String {
    let bullets: Vec<String> = titles.iter().map(|title| format!("- {title}")).collect();
    format!(
        "DOCUMENT TITLES:\n{}\n\nDOCUMENT SUMMARIES:\n{}",
        bullets.join("\n"),
        summaries.join("\n\n")
    )
}

/// Builds the narration prompt, cutting the document block to
/// `char_budget` characters.
#[must_use]
pub fn build_cluster_prompt(titles: &[&str], summaries: &[&str], char_budget: usize) -> String {
    let combined = combined_cluster_text(titles, summaries);
    let bounded = truncate_chars(&combined, char_budget);
    format!("{PREAMBLE}\n\n{bounded}\n\n{INSTRUCTION}")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
