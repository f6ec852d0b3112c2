//! Keyword lexicon shared by the signal extractor and the link classifier
//!
//! All of the crawler's lexical heuristics live here so that a summary can be
//! traced back to the exact term lists that produced it (see
//! [`Lexicon::fingerprint`]).

use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Typed, versioned keyword configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Human-assigned version label, echoed in every summary
    pub version: String,

    /// Sector/niche vocabulary
    #[serde(rename = "niche-terms")]
    pub niche_terms: Vec<String>,

    /// Phrases that indicate partnerships
    #[serde(rename = "partner-indicators")]
    pub partner_indicators: Vec<String>,

    /// Phrases that indicate a client/customer list
    #[serde(rename = "client-indicators")]
    pub client_indicators: Vec<String>,

    /// General evidence keywords counted in `keyword_hits`
    #[serde(rename = "evidence-keywords")]
    pub evidence_keywords: Vec<String>,

    /// Internal links containing one of these are never followed
    #[serde(rename = "exclude-keywords")]
    pub exclude_keywords: Vec<String>,

    /// Internal links containing one of these are visited first
    #[serde(rename = "important-keywords")]
    pub important_keywords: Vec<String>,
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            version: "2024.1".to_string(),
            niche_terms: owned(&[
                // AI & tech
                "ai",
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "big data",
                "data science",
                "analytics",
                "computer vision",
                "nlp",
                "automation",
                "robotics",
                "iot",
                "cloud",
                "devops",
                "kubernetes",
                "blockchain",
                "saas",
                "web development",
                // Marketing & design
                "seo",
                "digital marketing",
                "branding",
                "ux",
                "graphic design",
                "e-commerce",
                // Finance & business
                "fintech",
                "insurtech",
                "erp",
                "crm",
                "accounting",
                "business intelligence",
                "consulting",
                "outsourcing",
                "travel management",
                // Security
                "cybersecurity",
                "pentest",
                "encryption",
                "zero trust",
                "identity management",
                // Health
                "healthtech",
                "medtech",
                "biotech",
                "pharma",
                "telemedicine",
                // Industry & energy
                "manufacturing",
                "renewable",
                "energy",
                "smart grid",
                "industry 4.0",
                // Education & public sector
                "edtech",
                "govtech",
                "public sector",
            ]),
            partner_indicators: owned(&[
                "our partners",
                "partners",
                "partner with",
                "partnerships",
                "partnered with",
                "collaborators",
            ]),
            client_indicators: owned(&[
                "our clients",
                "clients",
                "customers",
                "customers include",
                "trusted by",
            ]),
            evidence_keywords: owned(&[
                "project",
                "partner",
                "collaboration",
                "award",
                "event",
                "conference",
                "csr",
                "innovation",
                "impact",
                "pricing",
                "product",
                "service",
            ]),
            exclude_keywords: owned(&[
                "privacy",
                "cookie",
                "terms",
                "login",
                "signin",
                "register",
                "careers",
                "jobs",
                "faq",
                "policy",
                "legal",
                "cart",
                "checkout",
            ]),
            important_keywords: owned(&[
                "about",
                "team",
                "pricing",
                "product",
                "service",
                "solutions",
                "features",
                "partner",
                "client",
                "customer",
                "case",
                "portfolio",
                "industries",
                "expertise",
            ]),
        }
    }
}

impl Lexicon {
    /// Returns a hex SHA-256 digest over the version and every term list
    ///
    /// Two lexicons with the same fingerprint produce identical signals for
    /// identical page text.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.as_bytes());
        for list in [
            &self.niche_terms,
            &self.partner_indicators,
            &self.client_indicators,
            &self.evidence_keywords,
            &self.exclude_keywords,
            &self.important_keywords,
        ] {
            hasher.update([0x1e]);
            for term in list {
                hasher.update(term.as_bytes());
                hasher.update([0x1f]);
            }
        }
        hex::encode(hasher.finalize())
    }

    /// Checks a lowercase haystack against the exclusion list
    pub fn is_excluded(&self, haystack: &str) -> bool {
        contains_any(haystack, &self.exclude_keywords)
    }

    /// Checks a lowercase haystack against the important list
    pub fn is_important(&self, haystack: &str) -> bool {
        contains_any(haystack, &self.important_keywords)
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|n| !n.is_empty() && haystack.contains(n.to_lowercase().as_str()))
}
