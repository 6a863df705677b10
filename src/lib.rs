//! # id3edit
//!
//! View and edit ID3v2 text frames in MP3 files.
//!
//! Edits happen at the byte level: exactly one frame's size field and payload
//! change, and every other byte of the file (header, other frames, padding,
//! audio stream) is carried over verbatim.
//!
//! ## Example
//!
//! ```no_run
//! use id3edit::{view_tags, edit_tag, EditRequest, TagSlot};
//! use std::path::Path;
//!
//! let summary = view_tags(Path::new("song.mp3")).unwrap();
//! for field in &summary.fields {
//!     println!("{}: {}", field.label, field.text);
//! }
//!
//! let request = EditRequest::new(TagSlot::Title, "New Title", "song.mp3").unwrap();
//! edit_tag(&request).unwrap();
//! ```
//!
//! ## Technical Details
//!
//! Frame sizes are 4-byte synchsafe integers (7 bits per byte), so a size
//! field can never mimic an MPEG sync pattern. Text frame payloads carry a
//! leading encoding-marker byte that is dropped on display and written back
//! as `0x00` (ISO-8859-1) on edit.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// ID3v2 header length in bytes
pub const HEADER_SIZE: usize = 10;

/// Largest value a 4-byte synchsafe integer can hold (2^28 - 1)
pub const SYNCHSAFE_MAX: u32 = 0x0FFF_FFFF;

/// Sanity cap on a single frame payload, checked before allocating
pub const MAX_FRAME_SIZE: u32 = 1 << 24;

/// Maximum number of frames scanned per tag (one per known tag type)
pub const MAX_FRAMES: usize = 6;

// =============================================================================
// Tag slots
// =============================================================================

/// The six editable tag slots, in edit-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSlot {
    Title = 0,
    Artist = 1,
    Album = 2,
    Year = 3,
    Comment = 4,
    Genre = 5,
}

impl TagSlot {
    pub const ALL: [TagSlot; MAX_FRAMES] = [
        TagSlot::Title,
        TagSlot::Artist,
        TagSlot::Album,
        TagSlot::Year,
        TagSlot::Comment,
        TagSlot::Genre,
    ];

    /// ID3v2.3 frame identifier for this slot
    pub fn frame_id(self) -> &'static [u8; 4] {
        match self {
            TagSlot::Title => b"TIT2",
            TagSlot::Artist => b"TPE1",
            TagSlot::Album => b"TALB",
            TagSlot::Year => b"TYER",
            TagSlot::Comment => b"COMM",
            TagSlot::Genre => b"TCON",
        }
    }

    /// Display label for this slot
    pub fn label(self) -> &'static str {
        match self {
            TagSlot::Title => "Title",
            TagSlot::Artist => "Artist",
            TagSlot::Album => "Album",
            TagSlot::Year => "Year",
            TagSlot::Comment => "Comment",
            TagSlot::Genre => "Genre",
        }
    }

    /// Map a CLI tag option (`-t`, `-a`, `-A`, `-y`, `-m`, `-c`) to its slot
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-t" => Some(TagSlot::Title),
            "-a" => Some(TagSlot::Artist),
            "-A" => Some(TagSlot::Album),
            "-y" => Some(TagSlot::Year),
            "-m" => Some(TagSlot::Comment),
            "-c" => Some(TagSlot::Genre),
            _ => None,
        }
    }

    /// Map a frame identifier to its slot, if it is one of the known six
    pub fn from_frame_id(id: &[u8; 4]) -> Option<Self> {
        Self::ALL.iter().copied().find(|slot| slot.frame_id() == id)
    }

    /// Position of this slot within a canonically ordered tag
    pub fn index(self) -> usize {
        self as usize
    }
}

// =============================================================================
// Synchsafe integers
// =============================================================================

/// Decode a 4-byte synchsafe integer (7 bits per byte, high bits ignored)
pub fn decode_synchsafe(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32 & 0x7F) << 21)
        | ((bytes[1] as u32 & 0x7F) << 14)
        | ((bytes[2] as u32 & 0x7F) << 7)
        | (bytes[3] as u32 & 0x7F)
}

/// Encode a value as a 4-byte synchsafe integer
///
/// Fails for values that need more than 28 bits.
pub fn encode_synchsafe(value: u32) -> Result<[u8; 4]> {
    if value > SYNCHSAFE_MAX {
        bail!("value {} does not fit in a synchsafe integer", value);
    }
    Ok([
        (value >> 21) as u8 & 0x7F,
        (value >> 14) as u8 & 0x7F,
        (value >> 7) as u8 & 0x7F,
        value as u8 & 0x7F,
    ])
}

// =============================================================================
// ID3v2 header
// =============================================================================

/// The fixed 10-byte ID3v2 header
#[derive(Debug, Clone)]
pub struct Id3Header {
    /// Major version and revision, e.g. (3, 0) for ID3v2.3.0
    pub version: (u8, u8),
    pub flags: u8,
    /// Declared total tag size; informational only, copied verbatim on edit
    pub tag_size: u32,
    raw: [u8; HEADER_SIZE],
}

impl Id3Header {
    /// Read and validate the header. A missing "ID3" signature is a hard
    /// failure: no tag operation can proceed without it.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut raw = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut raw)
            .context("could not read ID3v2 header")?;

        if &raw[0..3] != b"ID3" {
            bail!("no ID3v2 tag found");
        }

        Ok(Id3Header {
            version: (raw[3], raw[4]),
            flags: raw[5],
            tag_size: decode_synchsafe([raw[6], raw[7], raw[8], raw[9]]),
            raw,
        })
    }

    /// The header exactly as it appeared on disk
    pub fn raw_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.raw
    }
}

// =============================================================================
// Frame scanning
// =============================================================================

/// One frame header: 4-byte identifier + 4-byte synchsafe size + 2 flag bytes
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub id: [u8; 4],
    /// Decoded payload byte count
    pub size: u32,
    pub flags: [u8; 2],
    raw_size: [u8; 4],
}

impl FrameHeader {
    /// Write the header back out byte-for-byte as it was read
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.id)?;
        writer.write_all(&self.raw_size)?;
        writer.write_all(&self.flags)
    }
}

fn frame_id_str(id: &[u8; 4]) -> String {
    String::from_utf8_lossy(id).into_owned()
}

/// Read the next frame header from a stream positioned at a frame boundary.
///
/// Returns `Ok(None)` when the scan hits padding (first identifier byte
/// outside 'A'..'Z'). A short read is a hard error, not end-of-frames.
pub fn read_frame_header<R: Read>(reader: &mut R) -> Result<Option<FrameHeader>> {
    let mut id = [0u8; 4];
    reader
        .read_exact(&mut id)
        .context("could not read frame identifier")?;

    // Padding or invalid frame terminates the scan.
    if !id[0].is_ascii_uppercase() {
        return Ok(None);
    }

    let mut raw_size = [0u8; 4];
    reader
        .read_exact(&mut raw_size)
        .with_context(|| format!("could not read size of frame {}", frame_id_str(&id)))?;
    let size = decode_synchsafe(raw_size);

    if size > MAX_FRAME_SIZE {
        bail!(
            "frame {} declares {} bytes, above the {} byte limit",
            frame_id_str(&id),
            size,
            MAX_FRAME_SIZE
        );
    }

    let mut flags = [0u8; 2];
    reader
        .read_exact(&mut flags)
        .with_context(|| format!("could not read flags of frame {}", frame_id_str(&id)))?;

    Ok(Some(FrameHeader {
        id,
        size,
        flags,
        raw_size,
    }))
}

/// Read a frame's full payload into an owned buffer
fn read_payload<R: Read>(reader: &mut R, frame: &FrameHeader) -> Result<Vec<u8>> {
    let mut payload = vec![0u8; frame.size as usize];
    reader
        .read_exact(&mut payload)
        .with_context(|| format!("truncated payload for frame {}", frame_id_str(&frame.id)))?;
    Ok(payload)
}

/// Advance the reader past `count` bytes, failing if the stream ends early
fn skip_bytes<R: Read>(reader: &mut R, count: u64) -> Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(count), &mut io::sink())?;
    if skipped != count {
        bail!("unexpected end of file ({} of {} bytes)", skipped, count);
    }
    Ok(())
}

// =============================================================================
// Viewing
// =============================================================================

/// One rendered tag field
#[derive(Debug, Clone, Serialize)]
pub struct TagField {
    pub label: &'static str,
    pub text: String,
}

/// Result of reading the known tags of one file
#[derive(Debug, Serialize)]
pub struct TagSummary {
    pub file: String,
    /// ID3v2 version string, e.g. "2.3.0"
    pub version: String,
    /// Known frames in file order
    pub fields: Vec<TagField>,
}

/// Render payload bytes for display.
///
/// Printable ASCII and newline/carriage-return/tab pass through; every other
/// byte becomes '.'.
pub fn sanitize_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            32..=126 => b as char,
            b'\n' | b'\r' | b'\t' => b as char,
            _ => '.',
        })
        .collect()
}

/// Read up to [`MAX_FRAMES`] frames and render the known ones.
///
/// Unknown identifiers are scanned (to advance the cursor) but not reported.
/// The leading byte of each payload is an encoding marker and is excluded
/// from the rendered text.
pub fn view_tags(path: &Path) -> Result<TagSummary> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let header =
        Id3Header::read(&mut reader).with_context(|| path.display().to_string())?;

    let mut fields = Vec::new();
    for _ in 0..MAX_FRAMES {
        let frame = match read_frame_header(&mut reader)? {
            Some(frame) => frame,
            None => break,
        };
        let payload = read_payload(&mut reader, &frame)?;

        if let Some(slot) = TagSlot::from_frame_id(&frame.id) {
            let text = if payload.is_empty() {
                String::new()
            } else {
                sanitize_text(&payload[1..])
            };
            fields.push(TagField {
                label: slot.label(),
                text,
            });
        }
    }

    Ok(TagSummary {
        file: path.display().to_string(),
        version: format!("2.{}.{}", header.version.0, header.version.1),
        fields,
    })
}

// =============================================================================
// Editing
// =============================================================================

/// A validated, immutable edit request: which slot, the new text, which file
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub slot: TagSlot,
    pub value: String,
    pub path: PathBuf,
}

impl EditRequest {
    /// Validate and build a request. Fails on an empty value, a Year value
    /// that is not exactly 4 ASCII digits, or a path not ending in ".mp3".
    pub fn new(
        slot: TagSlot,
        value: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let value = value.into();
        let path = path.into();
        validate_mp3_path(&path)?;
        validate_value(slot, &value)?;
        Ok(EditRequest { slot, value, path })
    }
}

/// Check that a path names an .mp3 file
pub fn validate_mp3_path(path: &Path) -> Result<()> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.len() < 5 || !name.ends_with(".mp3") {
        bail!("{} is not an .mp3 file", path.display());
    }
    Ok(())
}

/// Check a new tag value against the rules for its slot
pub fn validate_value(slot: TagSlot, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("new tag value cannot be empty");
    }
    if value.len() >= MAX_FRAME_SIZE as usize {
        bail!("new tag value is too long ({} bytes)", value.len());
    }
    if slot == TagSlot::Year
        && (value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()))
    {
        bail!("year must be a 4-digit number, got {:?}", value);
    }
    Ok(())
}

/// Replace one frame's payload, leaving every other byte of the file intact.
///
/// The rewritten file is assembled in a sibling temporary file and renamed
/// over the original in one step, so a failure at any point leaves the
/// original untouched.
pub fn edit_tag(request: &EditRequest) -> Result<()> {
    let source = fs::File::open(&request.path)
        .with_context(|| format!("failed to open {}", request.path.display()))?;
    let mut reader = BufReader::new(source);

    let tmp_path = request.path.with_extension("mp3.tmp");
    let dest = fs::File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(dest);

    let outcome = rewrite_tag(&mut reader, &mut writer, request.slot, &request.value)
        .and_then(|()| writer.flush().context("failed to flush rewritten file"));
    drop(writer);

    if let Err(err) = outcome {
        let _ = fs::remove_file(&tmp_path);
        return Err(err.context(format!("failed to edit {}", request.path.display())));
    }

    fs::rename(&tmp_path, &request.path)
        .with_context(|| format!("failed to replace {}", request.path.display()))?;
    Ok(())
}

/// The three-phase rewrite: copy frames before the target verbatim, replace
/// the target frame's size and payload, then stream the rest through.
fn rewrite_tag<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    slot: TagSlot,
    new_value: &str,
) -> Result<()> {
    let header = Id3Header::read(reader)?;
    writer
        .write_all(header.raw_bytes())
        .context("failed to write ID3v2 header")?;

    // Phase 1: frames ahead of the target pass through unchanged.
    for _ in 0..slot.index() {
        let frame = read_frame_header(reader)?.ok_or_else(|| {
            anyhow!("frame {} not found in tag", frame_id_str(slot.frame_id()))
        })?;
        frame.write_to(writer)?;
        let payload = read_payload(reader, &frame)?;
        writer.write_all(&payload)?;
    }

    // Phase 2: rewrite the target frame's size field and payload. The payload
    // becomes an ISO-8859-1 marker byte followed by the new text.
    let frame = read_frame_header(reader)?.ok_or_else(|| {
        anyhow!("frame {} not found in tag", frame_id_str(slot.frame_id()))
    })?;
    let new_size = new_value.len() as u32 + 1;
    writer.write_all(&frame.id)?;
    writer.write_all(&encode_synchsafe(new_size)?)?;
    writer.write_all(&frame.flags)?;
    writer.write_all(&[0])?;
    writer.write_all(new_value.as_bytes())?;
    skip_bytes(reader, frame.size as u64)
        .with_context(|| format!("truncated payload for frame {}", frame_id_str(&frame.id)))?;

    // Phase 3: remaining frames, padding and the audio stream.
    io::copy(reader, writer).context("failed to copy remainder of file")?;

    Ok(())
}
