//! Polymorphic book fields.
//!
//! `author`, `genre` and `year_published` arrive in several JSON shapes. Each is decoded into a
//! tagged variant by looking at the upcoming token kind (string, number, object, array, null),
//! then reduced to the record model by a separate, infallible-or-[`StatsError::InvalidField`]
//! step. Decoding a field never fails on shape alone, so one bad field drops a single record
//! instead of aborting the file.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::error::{StatsError, StatsResult};
use crate::types::Author;

static GENRE_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[,;/]\s*").expect("genre delimiter regex is valid"));

/// Split a delimited genre string (`"Dystopian, Political Fiction; Satire"`) into trimmed,
/// non-empty tokens, preserving order and casing.
pub fn split_genres(raw: &str) -> Vec<String> {
    GENRE_DELIMITER
        .split(raw)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// String form of a JSON scalar; `None` for `null`.
fn scalar_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn drain_map<'de, A: MapAccess<'de>>(mut map: A) -> Result<(), A::Error> {
    while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
    Ok(())
}

fn drain_seq<'de, A: SeqAccess<'de>>(mut seq: A) -> Result<(), A::Error> {
    while seq.next_element::<IgnoredAny>()?.is_some() {}
    Ok(())
}

/// The `title` field. Only strings are accepted; any other shape yields an empty title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TitleField(pub Option<String>);

impl TitleField {
    pub fn into_title(self) -> String {
        self.0.unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for TitleField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TitleVisitor;

        impl<'de> Visitor<'de> for TitleVisitor {
            type Value = TitleField;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a title string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(TitleField(Some(v.to_owned())))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(TitleField(Some(v)))
            }

            fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
                Ok(TitleField(None))
            }

            fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
                Ok(TitleField(None))
            }

            fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
                Ok(TitleField(None))
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
                Ok(TitleField(None))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(TitleField(None))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                drain_map(map)?;
                Ok(TitleField(None))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                drain_seq(seq)?;
                Ok(TitleField(None))
            }
        }

        deserializer.deserialize_any(TitleVisitor)
    }
}

/// The `author` field as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthorField {
    /// Absent or `null`.
    #[default]
    Missing,
    /// `"author": "George Orwell"`.
    Text(String),
    /// `"author": {"name": ..., "country": ..., "birth_year": ...}`.
    Object {
        name: Option<String>,
        country: Option<String>,
        birth_year: Option<serde_json::Value>,
    },
    /// Any other value, stringified.
    Other(String),
}

impl AuthorField {
    /// Reduce to an [`Author`].
    ///
    /// Blank strings and blank scalars are a missing author; an object with a missing or blank
    /// `name`, or a malformed `birth_year`, is an invalid record.
    pub fn into_author(self) -> StatsResult<Option<Author>> {
        match self {
            AuthorField::Missing => Ok(None),
            AuthorField::Text(s) | AuthorField::Other(s) => {
                let name = s.trim();
                if name.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Author::new(name)))
                }
            }
            AuthorField::Object {
                name,
                country,
                birth_year,
            } => {
                let name = name.as_deref().map(str::trim).unwrap_or("");
                if name.is_empty() {
                    return Err(StatsError::invalid_field(
                        "author.name",
                        "author 'name' is missing or empty in json object",
                    ));
                }
                let country = country
                    .map(|c| c.trim().to_owned())
                    .filter(|c| !c.is_empty());
                let birth_year = match birth_year {
                    None => None,
                    Some(v) => parse_birth_year(&v)?,
                };
                Ok(Some(Author {
                    name: name.to_owned(),
                    country,
                    birth_year,
                }))
            }
        }
    }
}

fn parse_birth_year(v: &serde_json::Value) -> StatsResult<Option<i32>> {
    let invalid = || StatsError::invalid_field("author.birth_year", format!("invalid birth_year format: {v}"));
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(invalid),
        serde_json::Value::String(s) => s.trim().parse::<i32>().map(Some).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

impl<'de> Deserialize<'de> for AuthorField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AuthorVisitor;

        impl<'de> Visitor<'de> for AuthorVisitor {
            type Value = AuthorField;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an author string or object")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(AuthorField::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(AuthorField::Text(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(AuthorField::Other(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(AuthorField::Other(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(AuthorField::Other(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(AuthorField::Other(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(AuthorField::Missing)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                let v = serde_json::Value::deserialize(de::value::SeqAccessDeserializer::new(seq))?;
                Ok(AuthorField::Other(v.to_string()))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut name = None;
                let mut country = None;
                let mut birth_year = None;
                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "name" => name = scalar_text(&map.next_value::<serde_json::Value>()?),
                        "country" => {
                            country = match map.next_value::<serde_json::Value>()? {
                                serde_json::Value::String(s) => Some(s),
                                _ => None,
                            }
                        }
                        "birth_year" => birth_year = Some(map.next_value::<serde_json::Value>()?),
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(AuthorField::Object {
                    name,
                    country,
                    birth_year,
                })
            }
        }

        deserializer.deserialize_any(AuthorVisitor)
    }
}

/// The `genre` / `genres` field as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenreField {
    /// Absent or `null`.
    #[default]
    Missing,
    /// A delimited string, split with [`split_genres`].
    Text(String),
    /// An array; each element's string form, `null`s skipped.
    List(Vec<String>),
    /// Any other scalar, used as a single token.
    Other(String),
}

impl GenreField {
    pub fn is_missing(&self) -> bool {
        matches!(self, GenreField::Missing)
    }

    pub fn into_genres(self) -> Vec<String> {
        match self {
            GenreField::Missing => Vec::new(),
            GenreField::Text(s) => split_genres(&s),
            GenreField::List(items) => items
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty())
                .map(str::to_owned)
                .collect(),
            GenreField::Other(s) => {
                let token = s.trim();
                if token.is_empty() {
                    Vec::new()
                } else {
                    vec![token.to_owned()]
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for GenreField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GenreVisitor;

        impl<'de> Visitor<'de> for GenreVisitor {
            type Value = GenreField;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a delimited genre string or an array of genres")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(GenreField::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(GenreField::Text(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(GenreField::Other(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(GenreField::Other(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(GenreField::Other(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(GenreField::Other(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(GenreField::Missing)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::new();
                while let Some(v) = seq.next_element::<serde_json::Value>()? {
                    if let Some(text) = scalar_text(&v) {
                        items.push(text);
                    }
                }
                Ok(GenreField::List(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                let v = serde_json::Value::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(GenreField::Other(v.to_string()))
            }
        }

        deserializer.deserialize_any(GenreVisitor)
    }
}

/// The `year_published` / `yearPublished` field as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum YearField {
    /// Absent or `null`.
    #[default]
    Missing,
    /// An integer (integral floats included).
    Number(i64),
    /// A string; parsed as an integer when reduced.
    Text(String),
    /// Anything that cannot be a year.
    Other(String),
}

impl YearField {
    /// Reduce to a positive year. Zero, negative, out-of-range, and non-numeric values are
    /// invalid; blank strings count as absent.
    pub fn into_year(self) -> StatsResult<Option<i32>> {
        let n = match self {
            YearField::Missing => return Ok(None),
            YearField::Number(n) => n,
            YearField::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<i64>().map_err(|_| {
                    StatsError::invalid_field("year_published", format!("not an integer: '{s}'"))
                })?
            }
            YearField::Other(raw) => {
                return Err(StatsError::invalid_field(
                    "year_published",
                    format!("not an integer: {raw}"),
                ));
            }
        };
        if n <= 0 {
            return Err(StatsError::invalid_field(
                "year_published",
                format!("year published must be positive, got {n}"),
            ));
        }
        i32::try_from(n)
            .map(Some)
            .map_err(|_| StatsError::invalid_field("year_published", format!("year {n} is out of range")))
    }
}

impl<'de> Deserialize<'de> for YearField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct YearVisitor;

        impl<'de> Visitor<'de> for YearVisitor {
            type Value = YearField;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer year")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(YearField::Number(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(i64::try_from(v)
                    .map(YearField::Number)
                    .unwrap_or_else(|_| YearField::Other(v.to_string())))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
                    Ok(YearField::Number(v as i64))
                } else {
                    Ok(YearField::Other(v.to_string()))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(YearField::Text(v.to_owned()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(YearField::Other(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(YearField::Missing)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                drain_map(map)?;
                Ok(YearField::Other("object".to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                drain_seq(seq)?;
                Ok(YearField::Other("array".to_string()))
            }
        }

        deserializer.deserialize_any(YearVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(json: &str) -> AuthorField {
        serde_json::from_str(json).unwrap()
    }

    fn genres(json: &str) -> Vec<String> {
        serde_json::from_str::<GenreField>(json).unwrap().into_genres()
    }

    fn year(json: &str) -> StatsResult<Option<i32>> {
        serde_json::from_str::<YearField>(json).unwrap().into_year()
    }

    #[test]
    fn split_genres_handles_all_delimiters_and_blank_tokens() {
        assert_eq!(
            split_genres("Dystopian, Political Fiction;Satire / Drama"),
            vec!["Dystopian", "Political Fiction", "Satire", "Drama"]
        );
        assert_eq!(split_genres("  ,,  Fiction  ,, "), vec!["Fiction"]);
        assert!(split_genres("").is_empty());
        assert_eq!(split_genres("  Science Fiction "), vec!["Science Fiction"]);
    }

    #[test]
    fn genre_array_keeps_order_and_drops_blanks() {
        assert_eq!(
            genres(r#"["Romance", "  ", null, " Satire ", 42]"#),
            vec!["Romance", "Satire", "42"]
        );
        assert!(genres("null").is_empty());
        assert_eq!(genres("7"), vec!["7"]);
    }

    #[test]
    fn author_string_and_object_reduce_to_same_name() {
        let from_text = author(r#"" George Orwell ""#).into_author().unwrap().unwrap();
        let from_object = author(r#"{"name":"George Orwell","country":"UK","birth_year":1903}"#)
            .into_author()
            .unwrap()
            .unwrap();
        assert_eq!(from_text.name, from_object.name);
        assert_eq!(from_object.country.as_deref(), Some("UK"));
        assert_eq!(from_object.birth_year, Some(1903));
    }

    #[test]
    fn author_blank_or_null_is_missing() {
        assert_eq!(author(r#""   ""#).into_author().unwrap(), None);
        assert_eq!(author("null").into_author().unwrap(), None);
        assert_eq!(author("12").into_author().unwrap(), Some(Author::new("12")));
    }

    #[test]
    fn author_object_without_name_is_invalid() {
        let err = author(r#"{"country":"UK"}"#).into_author().unwrap_err();
        assert!(matches!(err, StatsError::InvalidField { .. }));
        let err = author(r#"{"name":"  "}"#).into_author().unwrap_err();
        assert!(err.to_string().contains("author.name"));
        let err = author(r#"{"name":"X","birth_year":"soon"}"#).into_author().unwrap_err();
        assert!(err.to_string().contains("birth_year"));
    }

    #[test]
    fn year_accepts_positive_integers_and_rejects_the_rest() {
        assert_eq!(year("1949").unwrap(), Some(1949));
        assert_eq!(year("1949.0").unwrap(), Some(1949));
        assert_eq!(year(r#""2001""#).unwrap(), Some(2001));
        assert_eq!(year("null").unwrap(), None);
        assert!(year("0").is_err());
        assert!(year("-5").is_err());
        assert!(year(r#""abc""#).is_err());
        assert!(year("99999999999").is_err());
        assert!(year("true").is_err());
    }

    #[test]
    fn title_ignores_non_strings() {
        let t: TitleField = serde_json::from_str(r#"{"nested": [1, 2]}"#).unwrap();
        assert_eq!(t.into_title(), "");
        let t: TitleField = serde_json::from_str(r#""1984""#).unwrap();
        assert_eq!(t.into_title(), "1984");
    }
}
