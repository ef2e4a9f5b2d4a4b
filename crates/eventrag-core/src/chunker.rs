//! Turns event records into retrievable chunks.
//!
//! Every event yields a `main` chunk (title, place, date and the start of the
//! description) and a `practical` chunk (dates, address, age, price, themes).
//! Descriptions longer than [`SHORT_DESCRIPTION_CHARS`] are additionally split
//! into overlapping `description` chunks.
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::{Chunk, ChunkMetadata, ChunkType, EventRecord};

/// Characters of description kept in the `main` chunk.
pub const SHORT_DESCRIPTION_CHARS: usize = 400;
const MAX_KEYWORDS: usize = 5;
const DATE_FORMAT: &str = "%d/%m/%Y à %H:%M";

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Window size in characters for description splitting.
    pub chunk_size: usize,
    /// Characters shared by consecutive description segments.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 300, overlap: 50 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventChunker {
    config: ChunkingConfig,
}

impl EventChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn create_chunks(&self, events: &[EventRecord]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for event in events {
            self.chunk_event(event, &mut chunks);
        }
        chunks
    }

    fn chunk_event(&self, event: &EventRecord, out: &mut Vec<Chunk>) {
        let text = |v: &Option<String>| v.as_deref().unwrap_or("").to_string();
        let title = event.title_fr.clone().unwrap_or_else(|| "Sans titre".to_string());
        let description = text(&event.description_fr);
        let city = text(&event.location_city);
        let region = text(&event.location_region);
        let address = text(&event.location_address);
        let date_begin = text(&event.firstdate_begin);
        let date_end = text(&event.lastdate_end);
        let begin_fmt = if date_begin.is_empty() { String::new() } else { normalize_date(&date_begin) };
        let end_fmt = if date_end.is_empty() { String::new() } else { normalize_date(&date_end) };

        let base = ChunkMetadata {
            event_id: text(&event.uid),
            title: title.clone(),
            location_city: city.clone(),
            location_region: region.clone(),
            firstdate_begin: date_begin,
            lastdate_end: date_end,
            url: text(&event.canonicalurl),
            latitude: event.location_lat,
            longitude: event.location_lon,
            chunk_type: ChunkType::Main,
            part: None,
        };

        let desc_short = if description.is_empty() {
            "Pas de description".to_string()
        } else {
            description.chars().take(SHORT_DESCRIPTION_CHARS).collect()
        };
        out.push(Chunk {
            content: format!("Événement: {title}\nLieu: {city}, {region}\nDate: {begin_fmt}\nDescription: {desc_short}"),
            metadata: base.clone(),
        });

        let place = if address.is_empty() { city.as_str() } else { address.as_str() };
        let mut practical = format!("Événement: {title} à {city}\nDates: du {begin_fmt} au {end_fmt}\nAdresse: {place}");
        let (age_min, age_max) = (age_bound(&event.age_min), age_bound(&event.age_max));
        if age_min.is_some() || age_max.is_some() {
            let min = age_min.unwrap_or("?");
            let max = age_max.unwrap_or("?");
            practical.push_str(&format!("\nÂge: {min}-{max} ans"));
        }
        practical.push_str(if event.free { "\nGratuit: Oui" } else { "\nGratuit: Non" });
        if let Some(keywords) = event.keywords_fr.as_ref().filter(|k| !k.is_empty()) {
            practical.push_str(&format!("\nThèmes: {}", keywords.joined(MAX_KEYWORDS)));
        }
        out.push(Chunk {
            content: practical,
            metadata: ChunkMetadata { chunk_type: ChunkType::Practical, ..base.clone() },
        });

        if description.chars().count() > SHORT_DESCRIPTION_CHARS {
            let parts = split_text(&description, self.config.chunk_size, self.config.overlap);
            for (i, part) in parts.into_iter().enumerate() {
                out.push(Chunk {
                    content: format!(
                        "Événement: {title}\nLieu: {city}\nDate: {begin_fmt}\nDescription complète (partie {}): {part}",
                        i + 1
                    ),
                    metadata: ChunkMetadata { chunk_type: ChunkType::Description, part: Some(i), ..base.clone() },
                });
            }
        }
    }
}

/// Formats an ISO-8601 timestamp as `dd/mm/YYYY à HH:MM`.
///
/// Accepts offsets and a trailing `Z`, naive date-times and bare dates.
/// Anything else is returned unchanged.
pub fn normalize_date(raw: &str) -> String {
    parse_iso_datetime(raw.trim())
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    // Wall-clock time in the record's own offset, no conversion.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// An age bound of zero or blank counts as absent.
fn age_bound(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.parse::<f64>().map_or(true, |n| n != 0.0))
}

/// Splits `text` into windows of `size` characters overlapping by `overlap`
/// characters, preferring to cut on whitespace.
///
/// A window ending before the text does is shortened to its last whitespace
/// when that whitespace lies past half the window. The next window starts
/// `overlap` characters before the (unclamped) window end, so a short trailing
/// fragment repeating the overlap can be emitted. Segments are trimmed.
/// Always returns at least one segment.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return vec![text.to_string()];
    }
    let size = size.max(1);
    let mut segments = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let mut end = start + size;
        if end < chars.len() {
            if let Some(offset) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if offset > size / 2 {
                    end = start + offset;
                }
            }
        }
        let segment: String = chars[start..end.min(chars.len())].iter().collect();
        segments.push(segment.trim().to_string());
        // a window that would not move forward restarts at its end
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }
    segments
}
