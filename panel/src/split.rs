use regex::Regex;
use std::sync::OnceLock;

fn sentence_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.\s+").expect("static regex"))
}

/// Sentences end at a period followed by whitespace; the period stays with its sentence.
fn sentences(script: &str) -> Vec<&str> {
    let text = script.trim();
    let mut out = Vec::new();
    let mut start = 0;
    for m in sentence_break().find_iter(text) {
        out.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    out.push(&text[start..]);
    out
}

/// Groups a script into one to three prompts for image generation.
///
/// Under 6 sentences stays whole, 6 to 13 splits in half, 14 or more in thirds
/// with the last part taking the remainder.
pub fn split_paragraphs(script: &str) -> Vec<String> {
    let s = sentences(script);
    let n = s.len();
    let cuts: Vec<usize> = if n < 6 {
        vec![0, n]
    } else if n < 14 {
        vec![0, n / 2, n]
    } else {
        vec![0, n / 3, 2 * (n / 3), n]
    };
    cuts.windows(2).map(|w| s[w[0]..w[1]].join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(n: usize) -> String {
        (1..=n).map(|i| format!("Sentence {i}.")).collect::<Vec<_>>().join("  \n")
    }

    #[test]
    fn short_script_is_one_part() {
        let parts = split_paragraphs(&script(5));
        assert_eq!(parts.len(), 1);
        assert!(parts[0].starts_with("Sentence 1.") && parts[0].ends_with("Sentence 5."));
    }

    #[test]
    fn medium_script_splits_in_half() {
        let parts = split_paragraphs(&script(7));
        assert_eq!(parts, vec!["Sentence 1. Sentence 2. Sentence 3.", "Sentence 4. Sentence 5. Sentence 6. Sentence 7."]);
        assert_eq!(split_paragraphs(&script(13)).len(), 2);
    }

    #[test]
    fn long_script_splits_in_thirds_with_remainder_last() {
        let parts = split_paragraphs(&script(16));
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].matches("Sentence").count(), 5);
        assert_eq!(parts[1].matches("Sentence").count(), 5);
        assert_eq!(parts[2].matches("Sentence").count(), 6);
        assert_eq!(parts.join(" "), (1..=16).map(|i| format!("Sentence {i}.")).collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn empty_and_unpunctuated_input_stay_single() {
        assert_eq!(split_paragraphs(""), vec![String::new()]);
        assert_eq!(split_paragraphs("no full stops here at all"), vec!["no full stops here at all"]);
        assert_eq!(split_paragraphs("Ends with a period."), vec!["Ends with a period."]);
    }

    #[test]
    fn decimals_do_not_break_sentences() {
        let parts = split_paragraphs("Pi is 3.14 roughly. Next one.");
        assert_eq!(parts, vec!["Pi is 3.14 roughly. Next one."]);
    }
}
