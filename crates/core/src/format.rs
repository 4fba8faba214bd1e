use std::time::Duration;

use crate::{news::NewsResult, types::Transcript};

/// Render a transcript the way it is persisted and handed to analysis.
pub fn format_transcript(transcript: &Transcript) -> String {
    let mut output = String::new();
    output.push_str("Full Transcript:\n");
    output.push_str(&transcript.text);
    output.push_str("\n\n");

    if !transcript.utterances.is_empty() {
        output.push_str("Speaker Breakdown:\n");
        for utterance in &transcript.utterances {
            output.push_str(&format!(
                "Speaker {}: {}\n",
                utterance.speaker, utterance.text
            ));
        }
    }

    output
}

/// Numbered digest of news hits, fed to the analyst.
pub fn format_news_digest(results: &[NewsResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() * 6);
    for (i, result) in results.iter().enumerate() {
        lines.push(format!("Result {}:", i + 1));
        lines.push(format!(
            "  Title : {}",
            result.title.as_deref().unwrap_or("No title")
        ));
        lines.push(format!("  Source: {}", result.source_name()));
        lines.push(format!(
            "  Date  : {}",
            result.date.as_deref().unwrap_or("No date provided")
        ));
        lines.push(format!(
            "  Link  : {}",
            result.link.as_deref().unwrap_or("No link provided")
        ));
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = secs.round() as u64;
        format!("{}m {}s", whole / 60, whole % 60)
    }
}
