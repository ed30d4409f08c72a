use html_escape::decode_html_entities;

use crate::provider::Segment;

/// Normalizes raw caption text: decodes HTML entities and folds line breaks
/// into spaces so a segment always reads as a single line.
pub fn clean_caption_text(raw: &str) -> String {
    // Captions are sometimes escaped twice, leaving a literal `&#39;` behind.
    decode_html_entities(raw)
        .replace("&#39;", "'")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

/// Flattens segments into one line of text, skipping blank segments.
pub fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
