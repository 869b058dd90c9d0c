//! XML statistics writer.
//!
//! Document shape:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <statistics>
//!   <item><value>Romance</value><count>2</count></item>
//! </statistics>
//! ```
//!
//! An empty item list produces a self-closing `<statistics/>` root.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{StatsError, StatsResult};
use crate::types::StatisticsItem;

const ROOT: &str = "statistics";
const ITEM: &str = "item";

/// `statistics_by_<attribute>.xml`, with the attribute lower-cased and every character
/// outside `[a-z0-9_-]` replaced by `_`.
pub fn output_file_name(attribute: &str) -> String {
    let safe: String = attribute
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' | '-' => c,
            _ => '_',
        })
        .collect();
    format!("statistics_by_{safe}.xml")
}

/// Write `items` to `path`, creating missing parent directories.
///
/// On failure a partial file may be left behind.
pub fn write_statistics(path: impl AsRef<Path>, items: &[StatisticsItem]) -> StatsResult<()> {
    let path = path.as_ref();
    let fail = |e: io::Error| StatsError::OutputWrite {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    let file = File::create(path).map_err(fail)?;
    let mut out = write_statistics_to(BufWriter::new(file), items).map_err(fail)?;
    out.flush().map_err(fail)?;
    Ok(())
}

/// Serialize `items` into `out` and hand the writer back.
pub fn write_statistics_to<W: Write>(out: W, items: &[StatisticsItem]) -> io::Result<W> {
    let mut writer = Writer::new(out);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_io)?;
    writer.get_mut().write_all(b"\n")?;

    if items.is_empty() {
        writer
            .write_event(Event::Empty(BytesStart::new(ROOT)))
            .map_err(xml_io)?;
    } else {
        writer
            .write_event(Event::Start(BytesStart::new(ROOT)))
            .map_err(xml_io)?;
        for item in items {
            writer.get_mut().write_all(b"\n  ")?;
            writer
                .write_event(Event::Start(BytesStart::new(ITEM)))
                .map_err(xml_io)?;
            writer
                .create_element("value")
                .write_text_content(BytesText::new(&item.value))
                .map_err(xml_io)?;
            writer
                .create_element("count")
                .write_text_content(BytesText::new(&item.count.to_string()))
                .map_err(xml_io)?;
            writer
                .write_event(Event::End(BytesEnd::new(ITEM)))
                .map_err(xml_io)?;
        }
        writer.get_mut().write_all(b"\n")?;
        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(xml_io)?;
    }
    writer.get_mut().write_all(b"\n")?;
    Ok(writer.into_inner())
}

fn xml_io<E: fmt::Display>(e: E) -> io::Error {
    io::Error::other(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(items: &[StatisticsItem]) -> String {
        String::from_utf8(write_statistics_to(Vec::new(), items).unwrap()).unwrap()
    }

    #[test]
    fn writes_items_in_order() {
        let xml = render(&[StatisticsItem::new("Romance", 2), StatisticsItem::new("Dystopian", 1)]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <statistics>\n  \
             <item><value>Romance</value><count>2</count></item>\n  \
             <item><value>Dystopian</value><count>1</count></item>\n\
             </statistics>\n"
        );
    }

    #[test]
    fn empty_list_is_self_closing_root() {
        assert_eq!(
            render(&[]),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<statistics/>\n"
        );
    }

    #[test]
    fn values_are_escaped() {
        let xml = render(&[StatisticsItem::new("Tom & Jerry <Vol 1>", 1)]);
        assert!(xml.contains("<value>Tom &amp; Jerry &lt;Vol 1&gt;</value>"));
    }

    #[test]
    fn file_name_is_sanitized() {
        assert_eq!(output_file_name("genre"), "statistics_by_genre.xml");
        assert_eq!(output_file_name("Year_Published"), "statistics_by_year_published.xml");
        assert_eq!(output_file_name("a b/c.d"), "statistics_by_a_b_c_d.xml");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.xml");
        write_statistics(&path, &[StatisticsItem::new("Fiction", 1)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<item><value>Fiction</value><count>1</count></item>"));
    }
}
