//! Literal markers of the digest layout.
//!
//! The parser only knows the pairing algorithm; every phrase it looks for
//! comes from a [`LayoutProfile`], so a template change at the provider is a
//! data change here.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutProfile {
    /// Substring identifying a job detail link.
    pub job_link_marker: &'static str,
    /// Sentence ending the email greeting. Text up to and including it is dropped.
    pub intro_marker: &'static str,
    /// Button text repeated after every posting.
    pub block_delimiter: &'static str,
    /// Lowercase prefix of the trailing footer block.
    pub footer_prefix: &'static str,
    /// Separates the company name from the rest of a block.
    pub company_separator: &'static str,
    /// Role text is cut at these, in this order.
    pub terminators: &'static [&'static str],
    /// Stage and industry labels removed from role text.
    pub noise_phrases: &'static [&'static str],
    /// Shown as the `source` line of every notification.
    pub source_label: &'static str,
}

pub const JOBRIGHT: LayoutProfile = LayoutProfile {
    job_link_marker: "jobright.ai/jobs/info/",
    intro_marker: "Explore this today's top matches, curated to align with your preferences, experiences, and skill sets.",
    block_delimiter: "APPLY NOW",
    footer_prefix: "view more opportunities",
    company_separator: " \u{b7} ",
    terminators: &[
        "referrals",
        "hour ago",
        "hours ago",
        "day ago",
        "days ago",
        "Be an early applicant",
    ],
    noise_phrases: &[
        "Public Company",
        "Growth Stage",
        "Late Stage",
        "Early Stage",
        "Consulting",
        "Finance",
        "Digital Media",
        "Telecom & Communications",
        "Artificial Intelligence (AI)",
        "Computer Software",
        "Advertising",
    ],
    source_label: "Jobright",
};

impl Default for LayoutProfile {
    fn default() -> Self {
        JOBRIGHT
    }
}
