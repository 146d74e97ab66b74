//! Codepoint to glyph cache
//!
//! A fixed array of buckets, each an append-only vector of entries. A cache
//! is bound to one font and size; changing either means building a new one.
//! Nothing is ever evicted, the whole cache goes away with its owner.

use super::Glyph;

/// Number of hash buckets
pub const BUCKETS: usize = 255;

#[derive(Debug)]
struct Entry {
    codepoint: char,
    glyph: Glyph,
    hits: u64,
}

/// Owns every rendered glyph of one font at one size
///
/// Not synchronised; share it between threads only behind a lock.
#[derive(Debug)]
pub struct GlyphCache {
    font_id: String,
    size: u32,
    buckets: Vec<Vec<Entry>>,
    len: usize,
}

/// Fibonacci hash so that runs of neighbouring codepoints spread out
fn bucket_of(codepoint: char) -> usize {
    (u32::from(codepoint).wrapping_mul(0x9E37_79B9) >> 8) as usize % BUCKETS
}

impl GlyphCache {
    /// Create an empty cache for `font_id` rendered at `size` pixels
    pub fn new(font_id: impl Into<String>, size: u32) -> Self {
        let font_id = font_id.into();
        log::debug!("Creating glyph cache for {font_id} at {size}px");
        GlyphCache {
            font_id,
            size,
            buckets: (0..BUCKETS).map(|_| Vec::new()).collect(),
            len: 0,
        }
    }

    /// Font this cache belongs to
    pub fn font_id(&self) -> &str {
        &self.font_id
    }

    /// Pixel size this cache belongs to
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of cached glyphs
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn entry(&self, codepoint: char) -> Option<&Entry> {
        self.buckets[bucket_of(codepoint)]
            .iter()
            .find(|e| e.codepoint == codepoint)
    }

    /// Borrow the glyph for `codepoint`. Never allocates and never counts a hit.
    pub fn lookup(&self, codepoint: char) -> Option<&Glyph> {
        self.entry(codepoint).map(|e| &e.glyph)
    }

    /// Times `codepoint` was served from the cache by [`Self::get_or_try_insert_with`]
    pub fn hits(&self, codepoint: char) -> Option<u64> {
        self.entry(codepoint).map(|e| e.hits)
    }

    /// Store `glyph` for `codepoint`
    ///
    /// Inserting a codepoint that is already cached replaces its glyph in
    /// place and returns the old one, so there is never more than one entry
    /// per codepoint. The hit count survives the replacement.
    pub fn insert(&mut self, codepoint: char, glyph: Glyph) -> Option<Glyph> {
        let bucket = &mut self.buckets[bucket_of(codepoint)];
        if let Some(entry) = bucket.iter_mut().find(|e| e.codepoint == codepoint) {
            log::debug!("Replacing cached glyph for {codepoint:?}");
            return Some(std::mem::replace(&mut entry.glyph, glyph));
        }
        bucket.push(Entry {
            codepoint,
            glyph,
            hits: 0,
        });
        self.len += 1;
        None
    }

    /// Return the cached glyph, rendering and caching it on a miss
    ///
    /// A failed render caches nothing, so the next call tries again.
    pub fn get_or_try_insert_with<E, F>(&mut self, codepoint: char, render: F) -> Result<&Glyph, E>
    where
        F: FnOnce(char) -> Result<Glyph, E>,
    {
        let bucket = &mut self.buckets[bucket_of(codepoint)];
        let index = match bucket.iter().position(|e| e.codepoint == codepoint) {
            Some(index) => {
                bucket[index].hits += 1;
                index
            }
            None => {
                let glyph = render(codepoint)?;
                bucket.push(Entry {
                    codepoint,
                    glyph,
                    hits: 0,
                });
                self.len += 1;
                bucket.len() - 1
            }
        };
        Ok(&bucket[index].glyph)
    }
}

impl Drop for GlyphCache {
    fn drop(&mut self) {
        log::debug!(
            "Dropping glyph cache for {} at {}px with {} glyphs",
            self.font_id,
            self.size,
            self.len
        );
    }
}
