use crate::types::JobPosting;

/// Discord rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Appended to a truncated message. Exactly ten characters long.
pub const CONTINUATION_MARKER: &str = "\n[...more]";

pub fn format_posting(posting: &JobPosting, source_label: &str) -> String {
    let mut lines = Vec::with_capacity(8);

    lines.push("🔔".to_string());
    lines.push(if posting.role.is_empty() {
        "(title not found)".to_string()
    } else {
        posting.role.clone()
    });
    lines.push(match &posting.location {
        Some(location) => format!("📍 {}", location),
        None => "📍 (location not found)".to_string(),
    });
    lines.push(format!("- company: {}", posting.company));
    if let Some(percent) = posting.match_percent {
        lines.push(format!("- match: {}%", percent));
    }
    if let Some(pay) = &posting.pay_range {
        lines.push(format!("- pay: {}", pay));
    }
    lines.push(format!("- source: {}", source_label));
    lines.push(format!("- link: [Job link]({})", posting.link));

    truncate_message(lines.join("\n"))
}

pub fn format_postings(postings: &[JobPosting], source_label: &str) -> Vec<String> {
    postings
        .iter()
        .map(|posting| format_posting(posting, source_label))
        .collect()
}

/// Cut `message` to [`MAX_MESSAGE_CHARS`] characters, ending with [`CONTINUATION_MARKER`].
pub fn truncate_message(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message;
    }

    let keep = MAX_MESSAGE_CHARS - CONTINUATION_MARKER.chars().count();
    let mut truncated: String = message.chars().take(keep).collect();
    truncated.push_str(CONTINUATION_MARKER);
    truncated
}
