// Plain-text rendering for the terminal front end
use chrono::{DateTime, Duration, Utc};
use std::fmt::Write as _;

use crate::forms::PostForm;
use crate::models::{ImageRef, Post, User};
use crate::session::SessionState;

/// How long ago a post was created, relative to `now`.
///
/// Server clocks drift: anything up to a minute in the future still reads as
/// "just now", and further ahead falls back to the absolute timestamp.
pub fn posted_at(created: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(*created);
    if age < -Duration::minutes(1) {
        return created.format("%b %-d, %Y %H:%M UTC").to_string();
    }
    if age < Duration::minutes(1) {
        return "just now".to_string();
    }
    if age < Duration::hours(1) {
        return format!("{} min ago", age.num_minutes());
    }
    if age < Duration::days(1) {
        return format!("{}h ago", age.num_hours());
    }
    match age.num_days() {
        1 => "yesterday".to_string(),
        days if days < 7 => format!("{} days ago", days),
        _ => created.format("%b %-d, %Y").to_string(),
    }
}

pub fn session_banner(state: &SessionState) -> String {
    match state {
        SessionState::Resolving => "Loading...".to_string(),
        SessionState::Anonymous => {
            "Not signed in. Run `memories login` or `memories signup`.".to_string()
        }
        SessionState::Authenticated(session) => {
            format!("Signed in as {}", session.user.display_name())
        }
    }
}

/// Heading shown above the post form.
pub fn form_heading(form: &PostForm, user: Option<&User>) -> String {
    format!(
        "{}\nPosting as {}",
        form.mode().heading(),
        user.map(User::display_name).unwrap_or("you")
    )
}

pub fn post_card(post: &Post, owned: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", post.id, post.title);

    let mut byline = Vec::new();
    if let Some(creator) = &post.creator {
        byline.push(creator.label().to_string());
    }
    if let Some(created_at) = &post.created_at {
        byline.push(posted_at(created_at, Utc::now()));
    }
    if !byline.is_empty() {
        let _ = writeln!(out, "  {}", byline.join(" · "));
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t)).collect();
        let _ = writeln!(out, "  {}", tags.join(" "));
    }
    if !post.message.is_empty() {
        let _ = writeln!(out, "  {}", post.message);
    }
    match &post.image {
        Some(ImageRef::Remote { url, .. }) => {
            let _ = writeln!(out, "  image: {}", url);
        }
        Some(ImageRef::Inline(data)) => {
            let _ = writeln!(out, "  image: (inline, {} bytes)", data.len());
        }
        None => {}
    }

    let _ = write!(out, "  Like {}", post.like_count);
    if owned {
        out.push_str("  ·  Edit  ·  Delete");
    }
    out
}

/// Render every post; `owns` decides which cards offer edit and delete.
pub fn post_list(posts: &[Post], owns: impl Fn(&Post) -> bool) -> String {
    if posts.is_empty() {
        return "No memories yet.".to_string();
    }
    posts
        .iter()
        .map(|post| post_card(post, owns(post)))
        .collect::<Vec<_>>()
        .join("\n\n")
}
