//! Attribute extraction.

use std::fmt;
use std::str::FromStr;

use crate::error::StatsError;
use crate::types::Book;

/// The closed set of attributes a run can aggregate by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Title,
    Author,
    YearPublished,
    Genre,
}

/// A `(raw, normalized)` pair emitted for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedValue {
    /// Trimmed value in its original case.
    pub raw: String,
    /// Counting key; see [`normalize`].
    pub normalized: String,
}

impl ExtractedValue {
    fn from_text(text: &str) -> Option<Self> {
        let raw = text.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_owned(),
            normalized: normalize(raw),
        })
    }
}

/// Counting key for a raw value: trimmed and lower-cased.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Title,
        Attribute::Author,
        Attribute::YearPublished,
        Attribute::Genre,
    ];

    /// Canonical lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Title => "title",
            Attribute::Author => "author",
            Attribute::YearPublished => "year_published",
            Attribute::Genre => "genre",
        }
    }

    /// Values this attribute contributes for `book`.
    ///
    /// `title` and `author` give at most one value, `year_published` one value for a positive
    /// year, and `genre` one value per genre token.
    pub fn extract(&self, book: &Book) -> Vec<ExtractedValue> {
        match self {
            Attribute::Title => ExtractedValue::from_text(&book.title).into_iter().collect(),
            Attribute::Author => ExtractedValue::from_text(book.author_name()).into_iter().collect(),
            Attribute::YearPublished => book
                .year_published
                .filter(|y| *y > 0)
                .map(|y| {
                    let s = y.to_string();
                    ExtractedValue {
                        raw: s.clone(),
                        normalized: s,
                    }
                })
                .into_iter()
                .collect(),
            Attribute::Genre => book
                .genres
                .iter()
                .filter_map(|g| ExtractedValue::from_text(g))
                .collect(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = StatsError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.trim().to_lowercase();
        Attribute::ALL
            .into_iter()
            .find(|a| a.as_str() == canonical)
            .ok_or_else(|| StatsError::UnsupportedAttribute {
                attribute: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;

    fn book() -> Book {
        Book {
            title: "  Animal Farm ".to_string(),
            author: Some(Author::new("George Orwell")),
            year_published: Some(1945),
            genres: vec!["Satire".to_string(), "Political Fiction".to_string()],
        }
    }

    #[test]
    fn parses_attribute_names_case_insensitively() {
        assert_eq!("GENRE".parse::<Attribute>().unwrap(), Attribute::Genre);
        assert_eq!("Year_Published".parse::<Attribute>().unwrap(), Attribute::YearPublished);
        assert!(matches!(
            "isbn".parse::<Attribute>(),
            Err(StatsError::UnsupportedAttribute { .. })
        ));
    }

    #[test]
    fn title_is_trimmed_and_normalized() {
        let vals = Attribute::Title.extract(&book());
        assert_eq!(
            vals,
            vec![ExtractedValue {
                raw: "Animal Farm".to_string(),
                normalized: "animal farm".to_string(),
            }]
        );
    }

    #[test]
    fn genre_emits_one_value_per_token() {
        let vals = Attribute::Genre.extract(&book());
        let keys: Vec<_> = vals.iter().map(|v| v.normalized.as_str()).collect();
        assert_eq!(keys, vec!["satire", "political fiction"]);
    }

    #[test]
    fn missing_values_emit_nothing() {
        let empty = Book::default();
        for attr in Attribute::ALL {
            assert!(attr.extract(&empty).is_empty(), "{attr}");
        }
    }

    #[test]
    fn non_positive_years_are_dropped() {
        let mut b = book();
        b.year_published = Some(0);
        assert!(Attribute::YearPublished.extract(&b).is_empty());
        b.year_published = Some(-12);
        assert!(Attribute::YearPublished.extract(&b).is_empty());
        b.year_published = Some(2000);
        assert_eq!(Attribute::YearPublished.extract(&b)[0].normalized, "2000");
    }
}
