//! Side table of display fields for the items being ranked
//!
//! The ranking core only ever sees item indices; titles live here.

use crate::error::{RankContext, RankResult};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub subtitle: Option<String>,
}

impl Item {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: None,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subtitle {
            Some(subtitle) => write!(f, "{} ({})", self.title, subtitle),
            None => write!(f, "{}", self.title),
        }
    }
}

/// One item per non-empty line, `title<TAB>subtitle`; `#` starts a comment line
pub fn parse_items(text: &str) -> Vec<Item> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once('\t') {
            Some((title, subtitle)) if !subtitle.trim().is_empty() => Item {
                title: title.trim().to_string(),
                subtitle: Some(subtitle.trim().to_string()),
            },
            Some((title, _)) => Item::new(title.trim()),
            None => Item::new(line),
        })
        .collect()
}

pub fn load_items(path: &Path) -> RankResult<Vec<Item>> {
    let text = fs::read_to_string(path).with_file_context(&path.to_string_lossy())?;
    Ok(parse_items(&text))
}
