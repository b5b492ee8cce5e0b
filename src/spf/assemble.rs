//! TXT chunk assembly (RFC 7208 Section 3.3).
//!
//! A TXT answer arrives as 255-byte character-strings; the logical record
//! is their concatenation in answer order, with no added separators.

/// Chunk length ceiling after stripping a delimiting quote pair.
const MAX_CHUNK_LEN: usize = 255;
/// Aggregate length ceiling across all chunks of one record.
const MAX_TOTAL_LEN: usize = 512;

/// One assembled record plus the length facts derived during assembly.
/// The two limit flags are independent: a record can blow the total limit
/// while every individual chunk stays under 255, and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledRecord {
    pub text: String,
    pub exceeds_chunk_limit: bool,
    pub exceeds_total_limit: bool,
    pub multiple_spf_records: bool,
}

impl AssembledRecord {
    /// The record text to resolve, or `None` when the domain published more
    /// than one `v=spf1` answer. An ambiguous policy is unusable per RFC;
    /// merging the candidates would invent a policy nobody declared.
    pub fn resolvable_text(&self) -> Option<&str> {
        if self.multiple_spf_records {
            None
        } else {
            Some(&self.text)
        }
    }
}

/// Concatenate TXT chunks into one logical record and derive the length
/// diagnostics. Chunk lengths are measured after removing one delimiting
/// quote pair, if present; some servers hand back the quotes verbatim.
pub fn assemble(chunks: &[String]) -> AssembledRecord {
    let mut text = String::new();
    let mut total_len = 0usize;
    let mut exceeds_chunk_limit = false;
    let mut spf_starts = 0usize;

    for chunk in chunks {
        let unquoted = strip_quote_pair(chunk);
        if unquoted.len() > MAX_CHUNK_LEN {
            exceeds_chunk_limit = true;
        }
        total_len += unquoted.len();
        if unquoted.to_ascii_lowercase().starts_with("v=spf1") {
            spf_starts += 1;
        }
        text.push_str(unquoted);
    }

    AssembledRecord {
        text,
        exceeds_chunk_limit,
        exceeds_total_limit: total_len > MAX_TOTAL_LEN,
        multiple_spf_records: spf_starts > 1,
    }
}

fn strip_quote_pair(chunk: &str) -> &str {
    if chunk.len() >= 2 && chunk.starts_with('"') && chunk.ends_with('"') {
        &chunk[1..chunk.len() - 1]
    } else {
        chunk
    }
}
