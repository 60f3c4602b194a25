//! Word-cloud rasterizer.
//!
//! Words are ranked by frequency and drawn largest first with the built-in
//! bitmap glyphs. Each word takes the free slot whose centre is closest to
//! the canvas centre; when no slot fits, the font shrinks until it drops
//! below the minimum size, at which point layout stops.

use crate::narration::glyphs::{self, GLYPH_HEIGHT, GLYPH_SPACING, GLYPH_WIDTH};
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Pixel rows per bitmap cell step: glyph height plus one blank row.
const CELL_PITCH: u32 = GLYPH_HEIGHT + 1;
/// Blank pixels kept around every placed word.
const MARGIN: u32 = 2;
/// Candidate positions are probed on this pixel grid.
const PROBE_STEP: usize = 2;

const PALETTE: [[u8; 3]; 6] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [49, 104, 142],
    [53, 183, 121],
];

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between",
    "both", "but", "by", "can", "can't", "cannot", "com", "could", "couldn't", "did", "didn't",
    "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "else", "ever", "few",
    "for", "from", "further", "get", "had", "hadn't", "has", "hasn't", "have", "haven't",
    "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "however",
    "http", "i", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "k",
    "like", "me", "more", "most", "my", "myself", "no", "nor", "not", "of", "off", "on", "once",
    "only", "or", "other", "otherwise", "ought", "our", "ours", "ourselves", "out", "over", "own",
    "r", "same", "shall", "she", "should", "shouldn't", "since", "so", "some", "such", "than",
    "that", "the", "their", "theirs", "them", "themselves", "then", "there", "therefore",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "wasn't", "we", "were", "weren't", "what", "when", "where", "which", "while", "who",
    "whom", "why", "with", "won't", "would", "wouldn't", "www", "you", "your", "yours",
    "yourself", "yourselves",
];

/// Errors from word-cloud rendering.
#[derive(Debug, Error)]
pub enum WordCloudError {
    #[error("No text to build a word cloud from")]
    EmptyText,

    #[error("Text contains no words after stop-word removal")]
    NoWords,

    #[error("Unsupported background color '{0}'\nSuggestion: Use 'white', 'black' or a '#rrggbb' value")]
    InvalidColor(String),

    #[error("Failed to write word cloud image: {0}")]
    Image(#[from] image::ImageError),
}

/// Word-cloud canvas and layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCloudParams {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Upper bound on the number of distinct words drawn
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    /// Layout stops once a word would need a smaller font than this
    #[serde(default = "default_min_font_size")]
    pub min_font_size: u32,

    /// 0 sizes words by rank only, 1 strictly by relative frequency
    #[serde(default = "default_relative_scaling")]
    pub relative_scaling: f64,

    #[serde(default = "default_background")]
    pub background: String,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    400
}
fn default_max_words() -> usize {
    100
}
fn default_min_font_size() -> u32 {
    10
}
fn default_relative_scaling() -> f64 {
    0.5
}
fn default_background() -> String {
    "white".to_string()
}

impl Default for WordCloudParams {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            max_words: default_max_words(),
            min_font_size: default_min_font_size(),
            relative_scaling: default_relative_scaling(),
            background: default_background(),
        }
    }
}

/// A word as laid out on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub font_size: u32,
    pub x: u32,
    pub y: u32,
}

/// Renders `text` and writes it as a PNG at `path`.
///
/// # Errors
/// Any [`render_wordcloud`] error, or [`WordCloudError::Image`] when the
/// file cannot be written.
pub fn write_wordcloud(
    text: &str,
    path: &Path,
    params: &WordCloudParams,
) -> Result<(), WordCloudError> {
    let (image, _) = render_wordcloud(text, params)?;
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Lays out and rasterizes `text`, returning the image and the placed
/// words in drawing order.
///
/// # Errors
/// [`WordCloudError::EmptyText`] for blank input, [`WordCloudError::NoWords`]
/// when tokenizing leaves nothing, [`WordCloudError::InvalidColor`] for an
/// unknown background.
pub fn render_wordcloud(
    text: &str,
    params: &WordCloudParams,
) -> Result<(RgbImage, Vec<PlacedWord>), WordCloudError> {
    if text.trim().is_empty() {
        return Err(WordCloudError::EmptyText);
    }
    let words = word_frequencies(text, params.max_words);
    let Some(&(_, top_count)) = words.first() else {
        return Err(WordCloudError::NoWords);
    };
    let background = parse_color(&params.background)?;

    let mut image = RgbImage::from_pixel(params.width, params.height, background);
    let mut occupancy = Occupancy::new(params.width as usize, params.height as usize);
    let mut placed = Vec::new();

    let rs = params.relative_scaling;
    let top = top_count as f64;
    let mut font_size = params.height;
    let mut last_freq = 1.0;

    'words: for (rank, (word, count)) in words.iter().enumerate() {
        let freq = *count as f64 / top;
        if rs != 0.0 {
            let scaled = (rs * (freq / last_freq) + (1.0 - rs)) * f64::from(font_size);
            font_size = scaled.round().max(0.0) as u32;
        }

        loop {
            let scale = font_size / CELL_PITCH;
            if font_size < params.min_font_size || scale == 0 {
                break 'words;
            }
            let box_width = glyphs::text_cells_wide(word) * scale + 2 * MARGIN;
            let box_height = GLYPH_HEIGHT * scale + 2 * MARGIN;
            if let Some((x, y)) =
                occupancy.nearest_free(box_width as usize, box_height as usize)
            {
                let color = Rgb(PALETTE[rank % PALETTE.len()]);
                draw_word(&mut image, word, x as u32 + MARGIN, y as u32 + MARGIN, scale, color);
                occupancy.occupy(x, y, box_width as usize, box_height as usize);
                placed.push(PlacedWord {
                    word: word.clone(),
                    font_size,
                    x: x as u32,
                    y: y as u32,
                });
                break;
            }
            // Next font size that changes the bitmap scale.
            font_size = scale * CELL_PITCH - 1;
        }
        last_freq = freq;
    }

    Ok((image, placed))
}

/// Tokens of two or more word characters, lower-cased, stop words and
/// pure numbers removed, ordered by count and then first appearance.
#[must_use]
pub fn word_frequencies(text: &str, max_words: usize) -> Vec<(String, usize)> {
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for raw in text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '\'')) {
        let token = raw.trim_matches('\'');
        let token = token.strip_suffix("'s").unwrap_or(token).to_lowercase();
        if token.chars().count() < 2
            || token.chars().all(|c| c.is_numeric())
            || stopwords.contains(token.as_str())
        {
            continue;
        }
        let count = counts.entry(token.clone()).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|word| {
            let count = counts.get(&word).copied().unwrap_or(0);
            (word, count)
        })
        .collect();
    // Stable sort keeps first appearance order among equal counts.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(max_words);
    ranked
}

fn parse_color(name: &str) -> Result<Rgb<u8>, WordCloudError> {
    let normalized = name.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "white" => return Ok(Rgb([255, 255, 255])),
        "black" => return Ok(Rgb([0, 0, 0])),
        _ => {}
    }
    let hex = normalized
        .strip_prefix('#')
        .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| WordCloudError::InvalidColor(name.to_string()))?;
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| WordCloudError::InvalidColor(name.to_string()))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

fn draw_word(image: &mut RgbImage, word: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
    let advance = (GLYPH_WIDTH + GLYPH_SPACING) * scale;
    for (i, c) in word.chars().enumerate() {
        let glyph = glyphs::glyph(c);
        let origin_x = x + i as u32 * advance;
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                if !glyphs::is_set(glyph, col, row) {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + col * scale + dx;
                        let py = y + row * scale + dy;
                        if px < image.width() && py < image.height() {
                            image.put_pixel(px, py, color);
                        }
                    }
                }
            }
        }
    }
}

/// Occupied-pixel mask with a summed-area table for O(1) box queries.
struct Occupancy {
    width: usize,
    height: usize,
    filled: Vec<bool>,
    integral: Vec<u32>,
}

impl Occupancy {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            filled: vec![false; width * height],
            integral: vec![0; (width + 1) * (height + 1)],
        }
    }

    fn occupied_in(&self, x: usize, y: usize, w: usize, h: usize) -> u32 {
        let stride = self.width + 1;
        let at = |col: usize, row: usize| self.integral[row * stride + col];
        (at(x + w, y + h) + at(x, y)) - (at(x + w, y) + at(x, y + h))
    }

    /// Free top-left corner whose box centre is nearest the canvas centre.
    fn nearest_free(&self, w: usize, h: usize) -> Option<(usize, usize)> {
        if w > self.width || h > self.height {
            return None;
        }
        let center_x = self.width as f64 / 2.0;
        let center_y = self.height as f64 / 2.0;
        let mut best: Option<((usize, usize), f64)> = None;
        for y in (0..=self.height - h).step_by(PROBE_STEP) {
            for x in (0..=self.width - w).step_by(PROBE_STEP) {
                if self.occupied_in(x, y, w, h) != 0 {
                    continue;
                }
                let dx = x as f64 + w as f64 / 2.0 - center_x;
                let dy = y as f64 + h as f64 / 2.0 - center_y;
                let distance = dx * dx + dy * dy;
                if best.is_none_or(|(_, d)| distance < d) {
                    best = Some(((x, y), distance));
                }
            }
        }
        best.map(|(position, _)| position)
    }

    fn occupy(&mut self, x: usize, y: usize, w: usize, h: usize) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.filled[row * self.width + col] = true;
            }
        }
        self.rebuild_integral();
    }

    fn rebuild_integral(&mut self) {
        let stride = self.width + 1;
        for row in 0..self.height {
            let mut row_sum = 0;
            for col in 0..self.width {
                row_sum += u32::from(self.filled[row * self.width + col]);
                self.integral[(row + 1) * stride + col + 1] =
                    self.integral[row * stride + col + 1] + row_sum;
            }
        }
    }
}
