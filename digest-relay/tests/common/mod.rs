#![allow(dead_code)]

use digest_relay::JOBRIGHT;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn job_link(id: u32) -> String {
    format!("https://jobright.ai/jobs/info/{}?utm_source=digest", id)
}

/// One posting as it appears in the email: a few table cells then the apply button.
pub fn posting_row(id: u32, cells: &[&str]) -> String {
    let cells: String = cells.iter().map(|cell| format!("<td>{}</td>", cell)).collect();
    format!(
        r#"<tr><td><a href="{link}"><img src="https://cdn.jobright.ai/logo/{id}.png" alt=""></a></td>{cells}<td><a class="btn" href="{link}">APPLY NOW</a></td></tr>"#,
        link = job_link(id),
        id = id,
        cells = cells,
    )
}

/// Wrap posting rows in the digest template: greeting, intro sentence, rows, footer.
pub fn digest_html(rows: &[String]) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html><head><title>Your top matches</title>",
            "<style>.btn {{ color: #fff; }}</style></head><body>",
            "<p>Hi Alex,</p><p>{intro}</p>",
            "<table>{rows}</table>",
            r#"<p><a href="https://jobright.ai/jobs?utm_source=digest">View more opportunities</a></p>"#,
            "</body></html>",
        ),
        intro = JOBRIGHT.intro_marker.replace('\'', "&#39;"),
        rows = rows.concat(),
    )
}

/// The three postings used across the integration tests.
pub fn sample_rows() -> Vec<String> {
    vec![
        posting_row(
            101,
            &[
                "Acme Corp &middot; Growth Stage &middot; Computer Software",
                "92%",
                "Senior Backend Engineer",
                "Remote",
                "$140K/yr - $180K/yr",
                "2 hours ago",
                "Be an early applicant",
            ],
        ),
        posting_row(
            102,
            &[
                "Globex &middot; Public Company",
                "78%",
                "Data Analyst &middot; Austin, TX",
                "$45/hr - $60/hr",
                "3 days ago",
            ],
        ),
        posting_row(
            103,
            &[
                "Initech &middot; Late Stage &middot; Finance",
                "Operations Associate &middot; New York, NY",
                "5 days ago",
            ],
        ),
    ]
}
