//! JSON chunk codec for membership snapshots.
//!
//! A member list is serialized as one JSON array of strings, then cut into
//! slices of at most `width` characters so each slice fits one key/value
//! record. Slicing ignores JSON structure: a chunk may end inside a string
//! literal or escape sequence. Only the concatenation of all chunks, in index
//! order, is meaningful.
//!
//! Widths are counted in `char`s, matching a character-length value column,
//! so a chunk never splits a UTF-8 sequence.

use rolesync_storage::{ChunkKey, ChunkRecord};

/// Errors produced while encoding or decoding a chunked member list.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Chunk width must be at least one character.
    #[error("chunk width must be greater than zero")]
    ZeroWidth,

    /// No chunks were supplied. Callers treat this as "no prior snapshot".
    #[error("no chunks to decode")]
    EmptyInput,

    /// The member list could not be serialized.
    #[error("failed to encode member list: {0}")]
    Encode(#[source] serde_json::Error),

    /// The reassembled text is not a JSON array of strings.
    #[error("reassembled snapshot is not a JSON string array: {0}")]
    Decode(#[source] serde_json::Error),
}

impl CodecError {
    pub fn is_empty_input(&self) -> bool {
        matches!(self, CodecError::EmptyInput)
    }
}

/// Splits and rejoins serialized member lists at a fixed character width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCodec {
    width: usize,
}

impl ChunkCodec {
    pub fn new(width: usize) -> Result<Self, CodecError> {
        if width == 0 {
            return Err(CodecError::ZeroWidth);
        }
        Ok(Self { width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Serialize `members` and slice the JSON text into chunks.
    ///
    /// Chunk `i` holds characters `[i * width, (i + 1) * width)`. An empty
    /// list encodes to the single chunk `[]`.
    pub fn encode(&self, members: &[String]) -> Result<Vec<String>, CodecError> {
        let json = serde_json::to_string(members).map_err(CodecError::Encode)?;
        Ok(self.split(&json))
    }

    /// Encode `members` as the keyed records `group[0]`, `group[1]`, ...
    pub fn records(&self, group: &str, members: &[String]) -> Result<Vec<ChunkRecord>, CodecError> {
        Ok(self
            .encode(members)?
            .into_iter()
            .enumerate()
            .map(|(index, value)| ChunkRecord::new(&ChunkKey::new(group, index), value))
            .collect())
    }

    /// Concatenate `chunks` in order and parse the result.
    pub fn decode(&self, chunks: &[String]) -> Result<Vec<String>, CodecError> {
        if chunks.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        let json = chunks.concat();
        serde_json::from_str(&json).map_err(CodecError::Decode)
    }

    /// Number of chunks `members` would occupy.
    pub fn chunk_count(&self, members: &[String]) -> Result<usize, CodecError> {
        let json = serde_json::to_string(members).map_err(CodecError::Encode)?;
        Ok(json.chars().count().div_ceil(self.width))
    }

    fn split(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut len = 0;
        for c in text.chars() {
            current.push(c);
            len += 1;
            if len == self.width {
                chunks.push(std::mem::take(&mut current));
                len = 0;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn records_are_keyed_by_group_and_index() {
        let codec = ChunkCodec::new(8).unwrap();
        let records = codec.records("Ops [EU]", &members(&["u1", "u2", "u3"])).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Ops [EU][0]", "Ops [EU][1]"]);
        assert_eq!(records[1].value, "2\",\"u3\"]");
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(matches!(ChunkCodec::new(0), Err(CodecError::ZeroWidth)));
    }

    #[test]
    fn empty_list_encodes_to_single_chunk() {
        let codec = ChunkCodec::new(10).unwrap();
        let chunks = codec.encode(&[]).unwrap();
        assert_eq!(chunks, vec!["[]".to_string()]);
        assert!(codec.decode(&chunks).unwrap().is_empty());
    }

    #[test]
    fn empty_list_round_trips_at_width_one() {
        let codec = ChunkCodec::new(1).unwrap();
        let chunks = codec.encode(&[]).unwrap();
        assert_eq!(chunks, vec!["[".to_string(), "]".to_string()]);
        assert!(codec.decode(&chunks).unwrap().is_empty());
    }

    #[test]
    fn chunks_are_fixed_width_except_last() {
        let codec = ChunkCodec::new(4).unwrap();
        let m = members(&["u1", "u2", "u3"]);
        // ["u1","u2","u3"] is 16 characters.
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json.len(), 16);

        let chunks = codec.encode(&m).unwrap();
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() == 4));

        let m = members(&["u1", "u2", "u33"]);
        let chunks = codec.encode(&m).unwrap();
        // 17 characters -> ceil(17 / 4) = 5 chunks, last one holds 1.
        assert_eq!(chunks.len(), 5);
        assert!(chunks[..4].iter().all(|c| c.chars().count() == 4));
        assert_eq!(chunks[4], "]");
        assert_eq!(codec.chunk_count(&m).unwrap(), 5);
    }

    #[test]
    fn chunk_i_is_the_ith_window_of_the_json() {
        let codec = ChunkCodec::new(5).unwrap();
        let m = members(&["alpha", "beta"]);
        let json = serde_json::to_string(&m).unwrap();
        let chunks = codec.encode(&m).unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            let end = (i * 5 + 5).min(json.len());
            assert_eq!(chunk, &json[i * 5..end]);
        }
        assert_eq!(chunks.concat(), json);
    }

    #[test]
    fn splits_on_characters_not_bytes() {
        let codec = ChunkCodec::new(3).unwrap();
        let m = members(&["Müller", "Åsa", "日本"]);
        let chunks = codec.encode(&m).unwrap();
        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.chars().count(), 3);
        }
        assert_eq!(codec.decode(&chunks).unwrap(), m);
    }

    #[test]
    fn round_trips_identifiers_with_json_metacharacters() {
        let codec = ChunkCodec::new(2).unwrap();
        let m = members(&[
            "cn=Smith\\, John,ou=People",
            "quote\"inside",
            "",
            "[brackets]",
            "tab\tnewline\n",
        ]);
        let chunks = codec.encode(&m).unwrap();
        assert_eq!(codec.decode(&chunks).unwrap(), m);
    }

    #[test]
    fn round_trip_preserves_order_and_duplicates() {
        let codec = ChunkCodec::new(7).unwrap();
        let m = members(&["z", "a", "z", "m"]);
        assert_eq!(codec.decode(&codec.encode(&m).unwrap()).unwrap(), m);
    }

    #[test]
    fn decode_without_chunks_is_empty_input() {
        let codec = ChunkCodec::new(8).unwrap();
        let err = codec.decode(&[]).unwrap_err();
        assert!(err.is_empty_input());
    }

    #[test]
    fn decode_rejects_truncated_sequence() {
        let codec = ChunkCodec::new(4).unwrap();
        let mut chunks = codec.encode(&members(&["u1", "u2", "u3"])).unwrap();
        chunks.pop();
        assert!(matches!(codec.decode(&chunks), Err(CodecError::Decode(_))));
    }

    #[test]
    fn decode_rejects_non_string_arrays() {
        let codec = ChunkCodec::new(4).unwrap();
        let chunks = vec!["[1,2]".to_string()];
        assert!(matches!(codec.decode(&chunks), Err(CodecError::Decode(_))));
    }
}
