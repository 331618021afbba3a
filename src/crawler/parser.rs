//! HTML parser for catalog item pages
//!
//! This module handles parsing item page content to extract:
//! - The model, backdrop and symbol of an item with their rarities
//! - The two gradient color stops of the item background
//! - The collection quantity shown in the summary table
//! - References to the animation and pattern assets

use crate::record::{Category, ItemRecord, NO_COLOR, UNKNOWN};
use crate::{HarvestError, Result};
use scraper::{ElementRef, Html, Selector};

const GIFT_TABLE_ROWS: &str = "table.tgme_gift_table tr";
const GRADIENT_STOPS: &str = "#giftGradient stop";
const PATTERN_IMAGE: &str = "#giftPattern";
const ANIMATION_SOURCE: &str = r#"source[type="application/x-tgsticker"]"#;

/// Header text of the summary row carrying the collection size
const QUANTITY_HEADER: &str = "quantity";

/// One `<th>`/`<td>` row of the gift table
struct TableRow<'a> {
    header: String,
    cell: ElementRef<'a>,
}

/// Collects every header/cell row of the gift table
fn table_rows(document: &Html) -> Vec<TableRow<'_>> {
    let (Ok(rows), Ok(th), Ok(td)) = (
        Selector::parse(GIFT_TABLE_ROWS),
        Selector::parse("th"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    document
        .select(&rows)
        .filter_map(|row| {
            let header = row.select(&th).next()?;
            let cell = row.select(&td).next()?;
            Some(TableRow {
                header: header.text().collect::<String>().to_lowercase(),
                cell,
            })
        })
        .collect()
}

/// Parses an item page into a record
///
/// Missing rows default to "Unknown" with a rarity of 0, a missing or
/// malformed rarity marker gives 0, and fewer than two gradient stops leave
/// both colors at "None". Parsing never fails: a page that renders at all
/// yields a record.
///
/// # Arguments
///
/// * `html` - The page content
/// * `collection` - Lower-cased collection name
/// * `number` - Sequence number of the item
///
/// # Example
///
/// ```
/// use gift_harvest::crawler::parse_item_page;
///
/// let html = r#"<table class="tgme_gift_table">
///     <tr><th>Model</th><td>Cozy <mark>1.5%</mark></td></tr>
/// </table>"#;
/// let record = parse_item_page(html, "plushpepe", 3);
/// assert_eq!(record.model, "Cozy");
/// assert_eq!(record.model_rarity, 150);
/// assert_eq!(record.symbol, "Unknown");
/// ```
pub fn parse_item_page(html: &str, collection: &str, number: u64) -> ItemRecord {
    let document = Html::parse_document(html);
    let rows = table_rows(&document);
    let mut record = ItemRecord::unknown(collection, number);

    for category in Category::ALL {
        let Some(row) = rows.iter().find(|r| r.header.contains(category.header())) else {
            continue;
        };

        let (name, rarity) = extract_attribute(row.cell);
        match category {
            Category::Model => {
                record.model = name;
                record.model_rarity = rarity;
            }
            Category::Backdrop => {
                record.backdrop = name;
                record.backdrop_rarity = rarity;
            }
            Category::Symbol => {
                record.symbol = name;
                record.symbol_rarity = rarity;
            }
        }
    }

    if let Some((hex1, hex2)) = extract_gradient(&document) {
        record.hex1 = hex1;
        record.hex2 = hex2;
    }

    record
}

/// Reads the display name and rarity out of one attribute cell
fn extract_attribute(cell: ElementRef<'_>) -> (String, u32) {
    let full = cell.text().collect::<String>();

    let mark = Selector::parse("mark")
        .ok()
        .and_then(|s| cell.select(&s).next())
        .map(|m| m.text().collect::<String>());

    let (name, rarity) = match mark {
        Some(mark) => (full.replacen(&mark, "", 1), parse_rarity(&mark)),
        None => (full, 0),
    };

    let name = name.trim();
    let name = if name.is_empty() { UNKNOWN } else { name };
    (name.to_string(), rarity)
}

/// Reads the first two gradient stop colors
fn extract_gradient(document: &Html) -> Option<(String, String)> {
    let selector = Selector::parse(GRADIENT_STOPS).ok()?;
    let mut stops = document
        .select(&selector)
        .filter_map(|stop| stop.value().attr("stop-color"))
        .map(|color| color.trim().to_string());

    match (stops.next(), stops.next()) {
        (Some(first), Some(second)) => Some((first, second)),
        _ => Some((NO_COLOR.to_string(), NO_COLOR.to_string())),
    }
}

/// Converts a rarity marker such as "12.5%" to hundredths of a percent
///
/// Digits past the second decimal place are truncated. Anything that is not
/// a plain non-negative decimal number gives 0.
///
/// # Example
///
/// ```
/// use gift_harvest::crawler::parse_rarity;
///
/// assert_eq!(parse_rarity("12.5%"), 1250);
/// assert_eq!(parse_rarity(" 0.29 % "), 29);
/// assert_eq!(parse_rarity("rare"), 0);
/// ```
pub fn parse_rarity(text: &str) -> u32 {
    let cleaned = text.replace('%', "");
    let cleaned = cleaned.trim();

    let (whole, fraction) = cleaned.split_once('.').unwrap_or((cleaned, ""));
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if whole.is_empty() && fraction.is_empty() {
        return 0;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return 0;
    }

    let whole: u32 = if whole.is_empty() {
        0
    } else {
        match whole.parse() {
            Ok(value) => value,
            Err(_) => return 0,
        }
    };

    let hundredths: u32 = fraction
        .chars()
        .chain(std::iter::repeat('0'))
        .take(2)
        .filter_map(|c| c.to_digit(10))
        .fold(0, |acc, d| acc * 10 + d);

    whole.saturating_mul(100).saturating_add(hundredths)
}

/// Extracts the live item count from the collection summary table
///
/// The quantity cell reads like "1,234/5,000 issued"; the part before the
/// slash is the number of items published so far.
///
/// # Returns
///
/// * `Ok(u64)` - The published item count
/// * `Err(HarvestError::NotFound)` - The page has no quantity row
/// * `Err(HarvestError::Parse)` - The quantity row does not hold a number
pub fn parse_quantity(html: &str, url: &str) -> Result<u64> {
    let document = Html::parse_document(html);

    let row = table_rows(&document)
        .into_iter()
        .find(|r| r.header.contains(QUANTITY_HEADER))
        .ok_or_else(|| HarvestError::NotFound {
            field: QUANTITY_HEADER.to_string(),
            url: url.to_string(),
        })?;

    let text = row.cell.text().collect::<String>();
    parse_quantity_text(&text)
}

/// Parses quantity cell text such as "1,234 / 5,000"
pub fn parse_quantity_text(text: &str) -> Result<u64> {
    let issued = text.split('/').next().unwrap_or_default();
    let digits: String = issued
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    digits.parse().map_err(|_| HarvestError::Parse {
        field: QUANTITY_HEADER.to_string(),
        value: text.trim().to_string(),
    })
}

/// Extracts the URL of the animated model asset
pub fn extract_animation_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(ANIMATION_SOURCE).ok()?;

    document
        .select(&selector)
        .filter_map(|source| source.value().attr("srcset"))
        .map(str::trim)
        .find(|srcset| !srcset.is_empty())
        .map(str::to_string)
}

/// Extracts the URL of the pattern image
///
/// The image is an SVG `<image>` whose reference usually lives in the
/// namespaced `xlink:href` attribute, so attributes are matched on their
/// local name.
pub fn extract_pattern_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(PATTERN_IMAGE).ok()?;
    let image = document.select(&selector).next()?;

    image
        .value()
        .attrs()
        .find(|(name, _)| *name == "href")
        .map(|(_, value)| value.trim().to_string())
        .filter(|href| !href.is_empty())
}
