//! Scores remote Xero bank accounts against the user's local accounts and
//! picks a one-to-one assignment.
//!
//! A score combines two kinds of evidence: the account number (digits only,
//! full or last-four match) and the normalized name (token Jaccard, with a
//! floor when one name's tokens appear as a run inside the other). Pairs are
//! assigned greedily from the highest score down; anything below the
//! threshold stays unmatched.

use std::collections::BTreeSet;

pub const AUTO_MATCH_THRESHOLD: f64 = 0.6;

const TAIL_LEN: usize = 4;
const TAIL_SCORE: f64 = 0.8;
const CONTAINMENT_SCORE: f64 = 0.85;
const AGREEMENT_BONUS: f64 = 0.1;
const NAME_EVIDENCE: f64 = 0.5;
const GENERIC_WORDS: &[&str] = &["account", "acct", "the", "bank"];

#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub number: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub xero_index: usize,
    pub local_index: usize,
    pub score: f64,
}

pub fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn tail(d: &str) -> Option<&str> {
    (d.len() >= TAIL_LEN).then(|| &d[d.len() - TAIL_LEN..])
}

/// Returns the number score and whether the last four digits agree.
fn number_score(a: Option<&str>, b: Option<&str>) -> (f64, bool) {
    let (Some(a), Some(b)) = (a.map(digits), b.map(digits)) else { return (0.0, false) };
    if a.is_empty() || b.is_empty() {
        return (0.0, false);
    }
    let tails_agree = matches!((tail(&a), tail(&b)), (Some(x), Some(y)) if x == y);
    if a == b {
        (1.0, tails_agree)
    } else if tails_agree {
        (TAIL_SCORE, true)
    } else {
        (0.0, false)
    }
}

pub fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .replace("a/c", " ")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !GENERIC_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// `needle` appears in `haystack` as a run of whole, adjacent tokens.
fn contains_tokens(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

pub fn name_score(a: &str, b: &str) -> f64 {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    if ta == tb {
        return 1.0;
    }
    let sa: BTreeSet<&str> = ta.iter().map(String::as_str).collect();
    let sb: BTreeSet<&str> = tb.iter().map(String::as_str).collect();
    let inter = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    let jaccard = if union == 0.0 { 0.0 } else { inter / union };
    if contains_tokens(&ta, &tb) || contains_tokens(&tb, &ta) {
        jaccard.max(CONTAINMENT_SCORE)
    } else {
        jaccard
    }
}

/// Similarity in `[0, 1]` between a remote and a local account.
pub fn score(xero: &Candidate<'_>, local: &Candidate<'_>) -> f64 {
    let (num, tails_agree) = number_score(xero.number, local.number);
    let name = name_score(xero.name, local.name);
    let mut s = num.max(name);
    if tails_agree && name >= NAME_EVIDENCE {
        s += AGREEMENT_BONUS;
    }
    s.min(1.0)
}

/// Greedy one-to-one assignment over all scored pairs, best first.
/// Ties break on the lower remote index, then the lower local index.
pub fn assign(xero: &[Candidate<'_>], local: &[Candidate<'_>], threshold: f64) -> Vec<MatchResult> {
    let mut pairs = Vec::with_capacity(xero.len() * local.len());
    for (xi, x) in xero.iter().enumerate() {
        for (li, l) in local.iter().enumerate() {
            let s = score(x, l);
            if s >= threshold {
                pairs.push(MatchResult { xero_index: xi, local_index: li, score: s });
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.xero_index.cmp(&b.xero_index))
            .then(a.local_index.cmp(&b.local_index))
    });

    let mut used_xero = vec![false; xero.len()];
    let mut used_local = vec![false; local.len()];
    let mut out = Vec::new();
    for p in pairs {
        if used_xero[p.xero_index] || used_local[p.local_index] {
            continue;
        }
        used_xero[p.xero_index] = true;
        used_local[p.local_index] = true;
        out.push(p);
    }
    out.sort_by_key(|m| m.xero_index);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c<'a>(name: &'a str, number: Option<&'a str>) -> Candidate<'a> {
        Candidate { name, number }
    }

    #[test]
    fn tokens_drop_generic_words() {
        assert_eq!(name_tokens("The Everyday Bank Account"), vec!["everyday"]);
        assert_eq!(name_tokens("Savings A/C #2"), vec!["savings", "2"]);
        assert!(name_tokens("Bank Account").is_empty());
    }

    #[test]
    fn number_scores() {
        assert_eq!(score(&c("x", Some("062-000 1234 5678")), &c("y", Some("06200012345678"))), 1.0);
        assert_eq!(score(&c("x", Some("99 5678")), &c("y", Some("12345678"))), 0.8);
        assert_eq!(score(&c("x", Some("678")), &c("y", Some("678"))), 1.0);
        assert_eq!(score(&c("x", Some("1111")), &c("y", Some("2222"))), 0.0);
        assert_eq!(score(&c("x", None), &c("y", Some("2222"))), 0.0);
    }

    #[test]
    fn name_scores() {
        assert_eq!(name_score("Everyday Account", "everyday"), 1.0);
        assert_eq!(name_score("Business Online Saver", "Online Saver"), 0.85);
        let j = name_score("Family Offset", "Family Savings");
        assert!((j - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(name_score("Bank", "Account"), 0.0);
    }

    #[test]
    fn containment_needs_whole_tokens() {
        assert!(name_score("Car", "Scar Loan") < CONTAINMENT_SCORE);
        assert_eq!(name_score("Car", "Scar Loan"), 0.0);
        assert_eq!(name_score("Home Loan", "Home Loan Offset"), CONTAINMENT_SCORE);
        // 非相邻的词不算包含
        assert!(name_score("Home Offset", "Home Loan Offset") < CONTAINMENT_SCORE);
    }

    #[test]
    fn tail_and_name_agreement_adds_bonus() {
        let s = score(&c("Joint Saver", Some("11-5678")), &c("Joint Saver Plus", Some("995678")));
        assert!((s - 0.95).abs() < 1e-9, "{s}");
        let capped = score(&c("Offset", Some("12345678")), &c("Offset", Some("12345678")));
        assert_eq!(capped, 1.0);
    }

    #[test]
    fn greedy_assignment_is_one_to_one() {
        let xero = [c("Everyday", Some("1234")), c("Everyday Saver", None), c("Visa", None)];
        let local = [c("Everyday Account", Some("001234")), c("Saver", None)];
        let m = assign(&xero, &local, AUTO_MATCH_THRESHOLD);
        assert_eq!(m.len(), 2);
        assert_eq!((m[0].xero_index, m[0].local_index), (0, 0));
        assert_eq!(m[0].score, 1.0);
        assert_eq!((m[1].xero_index, m[1].local_index), (1, 1));
        assert_eq!(m[1].score, 0.85);
    }

    #[test]
    fn below_threshold_is_never_matched() {
        let xero = [c("Family Offset", None)];
        let local = [c("Family Savings", None)];
        assert!(assign(&xero, &local, AUTO_MATCH_THRESHOLD).is_empty());
    }

    #[test]
    fn ties_prefer_lower_indices() {
        let xero = [c("Cash", None), c("Cash", None)];
        let local = [c("Cash", None)];
        let m = assign(&xero, &local, AUTO_MATCH_THRESHOLD);
        assert_eq!(m, vec![MatchResult { xero_index: 0, local_index: 0, score: 1.0 }]);
    }
}
