use once_cell::sync::Lazy;
use regex::Regex;

static BACKTICK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new("`+").unwrap());

pub const UNSUPPORTED_COMMENT_TYPE: &str = "Sorry, file comments are not supported.";

pub fn unauthorized(authorized_actor: &str) -> String {
    format!("Sorry, only @{} can use this action.", authorized_actor)
}

pub fn failure(error: &anyhow::Error, job_link: &str) -> String {
    format!(
        "Sorry, something went wrong while generating a response.\n\n```\n{:#}\n```\n\nJob: {}",
        error, job_link
    )
}

/// The final answer, with the job link and the exact prompt tucked into a
/// collapsed section.
pub fn answer(actor: &str, answer: &str, job_link: &str, prompt: &str) -> String {
    let fence = fence_for(prompt);
    format!(
        "@{actor} {answer}\n\n<details><summary>Info</summary>\n\nJob: {job_link}\nPrompt:\n\n{fence}markdown\n{prompt}\n{fence}\n\n</details>\n"
    )
}

/// A backtick fence longer than any run inside `text`, and never shorter than five.
fn fence_for(text: &str) -> String {
    let longest = BACKTICK_RUN
        .find_iter(text)
        .map(|m| m.len())
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(5))
}
