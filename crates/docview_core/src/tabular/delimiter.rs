use super::scan::{count_outside_quotes, is_blank, Records};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Number of non-blank records sampled by [`infer_delimiter`].
const SAMPLE_RECORDS: usize = 10;

/// Field delimiter of a tabular document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Semicolon,
}

impl Delimiter {
    /// Candidates in tie-break order.
    pub const ALL: [Delimiter; 3] = [Self::Comma, Self::Tab, Self::Semicolon];

    pub fn as_char(&self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab => '\t',
            Self::Semicolon => ';',
        }
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comma" | "," => Ok(Self::Comma),
            "tab" | "\t" | "\\t" => Ok(Self::Tab),
            "semicolon" | ";" => Ok(Self::Semicolon),
            other => Err(format!(
                "unknown delimiter `{other}`, expected one of comma, tab, semicolon"
            )),
        }
    }
}

/// Guesses the delimiter of `content`.
///
/// For each candidate, the occurrences outside quoted regions are counted per
/// sampled record. The candidate whose most common non-zero count is shared by
/// the most records wins, then the one with the higher count. Ties and
/// content without any candidate resolve to [`Delimiter::Comma`].
///
/// ```
/// use docview_core::tabular::{infer_delimiter, Delimiter};
///
/// assert_eq!(infer_delimiter("a;b;c\n1;2;3"), Delimiter::Semicolon);
/// assert_eq!(infer_delimiter("plain text"), Delimiter::Comma);
/// ```
pub fn infer_delimiter(content: &str) -> Delimiter {
    // Blank-ness is judged without a delimiter, none is known yet.
    let sample: Vec<&str> = Records::new(content)
        .filter(|record| !is_blank(record, '\0'))
        .take(SAMPLE_RECORDS)
        .collect();

    let mut best: Option<(Delimiter, (usize, usize))> = None;

    for candidate in Delimiter::ALL {
        let counts = sample
            .iter()
            .map(|record| count_outside_quotes(record, candidate.as_char()));

        let mut frequency = HashMap::<usize, usize>::new();
        for count in counts.filter(|&count| count > 0) {
            *frequency.entry(count).or_default() += 1;
        }

        // (records agreeing on the count, the count itself)
        let Some(score) = frequency
            .into_iter()
            .map(|(count, records)| (records, count))
            .max()
        else {
            continue;
        };

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    tracing::trace!(?best, sampled = sample.len(), "Inferred delimiter");

    best.map(|(delimiter, _)| delimiter).unwrap_or_default()
}
