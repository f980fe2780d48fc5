use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::posting::{Posting, PostingList};
use crate::text::bitbuf::{BitReader, BitWriter};

/// Posting-list encoding scheme. The choice is persisted in the store
/// settings under [`COMPRESS_METHOD_KEY`] so readers and writers of a
/// database always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressMethod {
    /// Flat little-endian u32 words: `document_id, positions_count,
    /// position...` repeated per posting, no length prefix.
    None,
    /// Golomb-Rice coding over document-id and position gaps.
    #[default]
    Golomb,
}

pub const COMPRESS_METHOD_KEY: &str = "compress_method";

impl CompressMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CompressMethod::None => "none",
            CompressMethod::Golomb => "golomb",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "none" => Some(CompressMethod::None),
            "golomb" => Some(CompressMethod::Golomb),
            _ => None,
        }
    }
}

/// Golomb-Rice parameters derived from `m`: `b = ceil(log2(m))` and
/// `t = 2^b - m`. With `m == 1` no remainder bits are emitted at all.
struct GolombParams {
    m: u32,
    b: u32,
    t: u32,
}

impl GolombParams {
    fn derive(m: u32) -> Self {
        debug_assert!(m > 0);
        let mut b = 0u32;
        let mut pow = 1u64;
        while u64::from(m) > pow {
            b += 1;
            pow <<= 1;
        }
        GolombParams {
            m,
            b,
            t: (pow - u64::from(m)) as u32,
        }
    }
}

fn golomb_encode(p: &GolombParams, n: u32, out: &mut BitWriter) {
    // quotient in unary, terminated by a zero bit
    for _ in 0..n / p.m {
        out.put_bit(true);
    }
    out.put_bit(false);
    if p.m > 1 {
        // truncated-binary remainder, MSB first
        let r = n % p.m;
        if r < p.t {
            let mut mask = 1u32 << (p.b - 2);
            while mask > 0 {
                out.put_bit(r & mask != 0);
                mask >>= 1;
            }
        } else {
            let r = r + p.t;
            let mut mask = 1u32 << (p.b - 1);
            while mask > 0 {
                out.put_bit(r & mask != 0);
                mask >>= 1;
            }
        }
    }
}

fn golomb_decode(p: &GolombParams, input: &mut BitReader) -> Result<u32> {
    let mut n = 0u64;
    loop {
        match input.get_bit() {
            Some(true) => n += u64::from(p.m),
            Some(false) => break,
            None => return Err(truncated()),
        }
    }
    if p.m > 1 {
        let mut r = 0u32;
        for _ in 0..p.b - 1 {
            let bit = input.get_bit().ok_or_else(truncated)?;
            r = (r << 1) | u32::from(bit);
        }
        if r >= p.t {
            let bit = input.get_bit().ok_or_else(truncated)?;
            r = ((r << 1) | u32::from(bit)) - p.t;
        }
        n += u64::from(r);
    }
    u32::try_from(n).map_err(|_| {
        Error::new(ErrorKind::Decode, "golomb value out of range".to_string())
    })
}

fn truncated() -> Error {
    Error::new(
        ErrorKind::Decode,
        "encoded postings truncated".to_string(),
    )
}

/// Encode a posting list for storage. `indexed_count` (the total number of
/// indexed documents) parameterizes the Golomb code for document-id gaps.
pub fn encode_postings(
    method: CompressMethod,
    indexed_count: u32,
    postings: &PostingList,
) -> Vec<u8> {
    match method {
        CompressMethod::None => encode_none(postings),
        CompressMethod::Golomb => encode_golomb(indexed_count, postings),
    }
}

/// Decode a stored posting list. The caller is responsible for checking the
/// decoded length against the stored docs_count.
pub fn decode_postings(method: CompressMethod, bytes: &[u8]) -> Result<PostingList> {
    match method {
        CompressMethod::None => decode_none(bytes),
        CompressMethod::Golomb => decode_golomb(bytes),
    }
}

fn encode_none(postings: &PostingList) -> Vec<u8> {
    let mut out = BitWriter::new();
    for posting in postings {
        out.put_u32(posting.document_id.value());
        out.put_u32(posting.positions_count());
        for &position in &posting.positions {
            out.put_u32(position);
        }
    }
    out.into_bytes()
}

fn decode_none(bytes: &[u8]) -> Result<PostingList> {
    let mut input = BitReader::new(bytes);
    let mut postings = Vec::new();
    while input.remaining() > 0 {
        let document_id = input.get_u32().ok_or_else(truncated)?;
        let positions_count = input.get_u32().ok_or_else(truncated)?;
        let mut positions = Vec::new();
        try_reserve(&mut positions, positions_count as usize)?;
        for _ in 0..positions_count {
            positions.push(input.get_u32().ok_or_else(truncated)?);
        }
        postings.push(Posting {
            document_id: DocId::new(document_id),
            positions,
        });
    }
    Ok(postings)
}

fn encode_golomb(indexed_count: u32, postings: &PostingList) -> Vec<u8> {
    let mut out = BitWriter::new();
    out.put_u32(postings.len() as u32);
    if !postings.is_empty() {
        let m = (indexed_count / postings.len() as u32).max(1);
        out.put_u32(m);
        let params = GolombParams::derive(m);
        let mut prev = 0u32;
        for posting in postings {
            let id = posting.document_id.value();
            golomb_encode(&params, id - prev - 1, &mut out);
            prev = id;
        }
        out.align();
    }
    for posting in postings {
        out.put_u32(posting.positions_count());
        if let Some(&last) = posting.positions.last() {
            let m = ((last + 1) / posting.positions_count()).max(1);
            out.put_u32(m);
            let params = GolombParams::derive(m);
            let mut prev = -1i64;
            for &position in &posting.positions {
                golomb_encode(&params, (i64::from(position) - prev - 1) as u32, &mut out);
                prev = i64::from(position);
            }
            out.align();
        }
    }
    out.into_bytes()
}

fn decode_golomb(bytes: &[u8]) -> Result<PostingList> {
    let mut input = BitReader::new(bytes);
    let docs_count = input.get_u32().ok_or_else(truncated)?;
    if docs_count == 0 {
        return Ok(Vec::new());
    }
    let mut postings = Vec::new();
    try_reserve(&mut postings, docs_count as usize)?;
    {
        let m = input.get_u32().ok_or_else(truncated)?;
        let params = checked_params(m)?;
        let mut prev = 0u64;
        for _ in 0..docs_count {
            let gap = golomb_decode(&params, &mut input)?;
            let id = checked_id(prev + u64::from(gap) + 1)?;
            postings.push(Posting {
                document_id: DocId::new(id),
                positions: Vec::new(),
            });
            prev = u64::from(id);
        }
        input.align();
    }
    for posting in &mut postings {
        let positions_count = input.get_u32().ok_or_else(truncated)?;
        if positions_count == 0 {
            continue;
        }
        let m = input.get_u32().ok_or_else(truncated)?;
        let params = checked_params(m)?;
        try_reserve(&mut posting.positions, positions_count as usize)?;
        let mut prev = -1i64;
        for _ in 0..positions_count {
            let gap = golomb_decode(&params, &mut input)?;
            let position = checked_id((prev + i64::from(gap) + 1) as u64)?;
            posting.positions.push(position);
            prev = i64::from(position);
        }
        input.align();
    }
    Ok(postings)
}

fn checked_params(m: u32) -> Result<GolombParams> {
    if m == 0 {
        return Err(Error::new(
            ErrorKind::Decode,
            "invalid golomb parameter".to_string(),
        ));
    }
    Ok(GolombParams::derive(m))
}

fn checked_id(value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::new(ErrorKind::Decode, "decoded value overflows".to_string()))
}

fn try_reserve<T>(vec: &mut Vec<T>, additional: usize) -> Result<()> {
    vec.try_reserve_exact(additional).map_err(|_| {
        Error::new(
            ErrorKind::OutOfMemory,
            format!("cannot reserve {additional} postings entries"),
        )
    })
}
