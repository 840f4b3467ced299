//! Filtering and sorting for the sequence list.

use crate::error::SettingsError;
use crate::model::SequenceInfo;
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Eq)]
struct RegionTerm {
    chromosome: String,
    start: i64,
    end: i64,
}

/// Parsed search query. Every term must match for a sequence to be kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceFilter {
    words: Vec<String>,
    regions: Vec<RegionTerm>,
}

fn parse_coordinate(text: &str, term: &str) -> Result<i64, SettingsError> {
    text.replace(',', "")
        .parse()
        .map_err(|_| SettingsError::InvalidRegion(term.to_string()))
}

fn parse_region(term: &str) -> Result<RegionTerm, SettingsError> {
    let invalid = || SettingsError::InvalidRegion(term.to_string());
    let (chromosome, range) = term.split_once(':').ok_or_else(invalid)?;
    let (start, end) = range.split_once('-').ok_or_else(invalid)?;
    if chromosome.is_empty() {
        return Err(invalid());
    }
    let start = parse_coordinate(start, term)?;
    let end = parse_coordinate(end, term)?;
    if start > end {
        return Err(invalid());
    }
    Ok(RegionTerm { chromosome: chromosome.to_ascii_lowercase(), start, end })
}

impl SequenceFilter {
    /// Whitespace separated terms. `chr:start-end` keeps sequences overlapping
    /// that region; anything else is a case-insensitive substring of the name
    /// or chromosome.
    pub fn parse(query: &str) -> Result<Self, SettingsError> {
        let mut filter = Self::default();
        for term in query.split_whitespace() {
            if term.contains(':') {
                filter.regions.push(parse_region(term)?);
            } else {
                filter.words.push(term.to_lowercase());
            }
        }
        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.regions.is_empty()
    }

    pub fn matches(&self, info: &SequenceInfo) -> bool {
        let name = info.name.to_lowercase();
        let chromosome = info.chromosome.to_lowercase();
        let words = self
            .words
            .iter()
            .all(|w| name.contains(w.as_str()) || chromosome.contains(w.as_str()));
        let regions = self.regions.iter().all(|r| {
            r.chromosome == info.chromosome.to_ascii_lowercase()
                && info.region_start <= r.end
                && info.region_end >= r.start
        });
        words && regions
    }

    pub fn apply<'a>(&self, sequences: &'a [SequenceInfo]) -> Vec<&'a SequenceInfo> {
        sequences.iter().filter(|s| self.matches(s)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Location,
}

/// Compare with embedded numbers ordered by value, so `seq2` sorts before `seq10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let mut ldigits = String::new();
                while let Some(c) = left.next_if(|c| c.is_ascii_digit()) {
                    ldigits.push(c);
                }
                let mut rdigits = String::new();
                while let Some(c) = right.next_if(|c| c.is_ascii_digit()) {
                    rdigits.push(c);
                }
                let ltrim = ldigits.trim_start_matches('0');
                let rtrim = rdigits.trim_start_matches('0');
                let ordering = ltrim.len().cmp(&rtrim.len()).then_with(|| ltrim.cmp(rtrim));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                let ordering = l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn compare(a: &SequenceInfo, b: &SequenceInfo, key: SortKey) -> Ordering {
    match key {
        SortKey::Name => natural_cmp(&a.name, &b.name),
        SortKey::Size => a.size().cmp(&b.size()).then_with(|| natural_cmp(&a.name, &b.name)),
        SortKey::Location => natural_cmp(&a.chromosome, &b.chromosome)
            .then(a.region_start.cmp(&b.region_start))
            .then(a.region_end.cmp(&b.region_end)),
    }
}

pub fn sort_sequences(sequences: &mut [SequenceInfo], key: SortKey, ascending: bool) {
    sequences.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}
