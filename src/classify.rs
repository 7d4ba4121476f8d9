//! Text classification over extracted article fields.

use regex::Regex;
use std::sync::OnceLock;

/// `$5`, `$5,000.50`, `5 dollars`, `100 USD` — case-insensitive.
fn money_regex() -> &'static Regex {
    static MONEY: OnceLock<Regex> = OnceLock::new();
    MONEY.get_or_init(|| {
        Regex::new(r"(?i)\$\d+(?:,\d{3})*(?:\.\d+)?|\d+\s+(?:dollars|USD)")
            .expect("money regex is valid")
    })
}

/// Non-overlapping, case-sensitive occurrences of `phrase` across the title
/// and description. An empty phrase counts as zero.
pub fn phrase_count(title: &str, description: &str, phrase: &str) -> u32 {
    if phrase.is_empty() {
        return 0;
    }
    (title.matches(phrase).count() + description.matches(phrase).count()) as u32
}

/// Whether either field mentions an amount of money.
pub fn mentions_money(title: &str, description: &str) -> bool {
    let re = money_regex();
    re.is_match(title) || re.is_match(description)
}
