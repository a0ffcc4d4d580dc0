//! Word frequency counter pipeline
//!
//! Reads lines from stdin, splits into words, groups by word, and prints
//! the top-N words by count.
//!
//! Usage: cargo run --example word_count --release
//!        (Then type lines of text and press Ctrl-D to finish)

use std::io::{self, BufRead};
use stream_stages::{to_stream, Emitter, GroupByStage, MapStage, Result};

const TOP_N: usize = 10;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let lines: Vec<String> = io::stdin()
        .lock()
        .lines()
        .map_while(|line| line.ok())
        .collect();

    let counts = to_stream(lines)
        .pipe(MapStage::new(
            "split_words",
            |line: String, out: &mut Emitter<String>| {
                for word in line.split_whitespace() {
                    let cleaned: String = word
                        .chars()
                        .filter(|c| c.is_alphanumeric())
                        .collect::<String>()
                        .to_lowercase();
                    if cleaned.len() > 2 {
                        out.emit(cleaned);
                    }
                }
                Ok(())
            },
        ))
        .pipe(GroupByStage::new(
            Some("word".to_string()),
            Some("occurrences".to_string()),
            |word: &String| Ok(word.clone()),
        ))
        .finish()?;

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|record| (record.key().to_string(), record.members().len()))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    println!("Top {} words:", TOP_N);
    for (word, count) in ranked.into_iter().take(TOP_N) {
        println!("  {:<20} {}", word, count);
    }

    Ok(())
}
