//! Markdown rendering of a domain summary
//!
//! Produces a human-readable report with the identity, signals, sections and
//! crawl log of one session.

use crate::output::DomainSummary;
use std::fmt::Write;

fn bullet_list(md: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(md, "## {}\n", heading);
    for item in items {
        let _ = writeln!(md, "- {}", item);
    }
    md.push('\n');
}

/// Formats a domain summary as markdown
///
/// # Arguments
///
/// * `summary` - The domain summary
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_summary(summary: &DomainSummary) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# {} ({})\n", summary.company_name, summary.domain);
    if let Some(description) = &summary.description {
        let _ = writeln!(md, "> {}\n", description);
    }

    md.push_str("## Crawl Information\n\n");
    let _ = writeln!(md, "- **Start URL**: {}", summary.start_url);
    let _ = writeln!(md, "- **Status**: {}", summary.status);
    let _ = writeln!(md, "- **Pages Crawled**: {}", summary.pages_crawled);
    let _ = writeln!(md, "- **Pages Attempted**: {}", summary.crawl_log.pages_attempted);
    let _ = writeln!(md, "- **Confidence**: {:.2}", summary.confidence);
    let _ = writeln!(md, "- **Timestamp**: {}", summary.timestamp.to_rfc3339());
    let _ = writeln!(
        md,
        "- **Lexicon**: {} ({})\n",
        summary.lexicon_version,
        &summary.lexicon_fingerprint[..summary.lexicon_fingerprint.len().min(12)]
    );

    bullet_list(&mut md, "Likely Niches", &summary.likely_niches);
    bullet_list(&mut md, "Partner Names", &summary.partner_names);
    bullet_list(&mut md, "Client Names", &summary.client_names);
    bullet_list(&mut md, "Top Titles", &summary.top_titles);
    bullet_list(&mut md, "Top Headings", &summary.top_headings);

    if !summary.sample_pages.is_empty() {
        md.push_str("## Sample Pages\n\n");
        md.push_str("| URL | Depth | Method | Words |\n");
        md.push_str("|-----|-------|--------|-------|\n");
        for page in &summary.sample_pages {
            let method = serde_json::to_value(page.fetch_method)
                .ok()
                .and_then(|v| v.as_str().map(String::from))
                .unwrap_or_default();
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} |",
                page.url, page.depth, method, page.word_count
            );
        }
        md.push('\n');
    }

    let sections = [
        ("About", &summary.sections.about),
        ("Blog", &summary.sections.blog),
        ("Policies", &summary.sections.policies),
        ("Other", &summary.sections.other),
    ];
    if sections.iter().any(|(_, urls)| !urls.is_empty()) {
        md.push_str("## Sections\n\n");
        for (name, urls) in sections {
            if !urls.is_empty() {
                let _ = writeln!(md, "- **{}**: {}", name, urls.join(", "));
            }
        }
        md.push('\n');
    }

    if !summary.social.is_empty() {
        md.push_str("## Social Profiles\n\n");
        for (network, url) in &summary.social {
            let _ = writeln!(md, "- {}: {}", network, url);
        }
        md.push('\n');
    }

    bullet_list(&mut md, "External Sites", &summary.external_sites);

    if !summary.files.is_empty() {
        md.push_str("## Files\n\n");
        for file in &summary.files {
            match &file.error {
                Some(error) => {
                    let _ = writeln!(md, "- {} (failed: {})", file.url, error);
                }
                None => {
                    let content_type = file.content_type.as_deref().unwrap_or("unknown type");
                    let _ = writeln!(md, "- {} ({})", file.url, content_type);
                    if !file.text_snippet.is_empty() {
                        let preview: String = file.text_snippet.chars().take(200).collect();
                        let _ = writeln!(md, "  > {}", preview);
                    }
                }
            }
        }
        md.push('\n');
    }

    if !summary.crawl_log.errors.is_empty() {
        md.push_str("## Crawl Errors\n\n");
        md.push_str("| Page | Error |\n");
        md.push_str("|------|-------|\n");
        for entry in &summary.crawl_log.errors {
            let _ = writeln!(md, "| {} | {} |", entry.page, entry.error.replace('|', "\\|"));
        }
        md.push('\n');
    }

    md
}
