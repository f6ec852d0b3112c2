//! Bot-protection and CAPTCHA page detection

/// Lowercase fragments that mark a challenge or block page
const BLOCK_SIGNATURES: &[&str] = &[
    "captcha",
    "verify you are human",
    "verify you're human",
    "are you human",
    "are you a human",
    "access denied",
    "please enable javascript",
    "browser check",
    "checking your browser",
    "attention required",
    "bot verification",
    "spf-error",
    "cf_chl",
    "cf-browser-verification",
    "jschl_vc",
    "jschl-answer",
];

/// Returns true when the HTML looks like a bot challenge rather than content
///
/// Matching is case-insensitive over the raw markup, so scripts and hidden
/// form fields count.
pub fn looks_blocked(html: &str) -> bool {
    if html.is_empty() {
        return false;
    }
    let lowered = html.to_lowercase();
    BLOCK_SIGNATURES.iter().any(|sig| lowered.contains(sig))
}
