//! BIFF8 record building for the single-sheet `.xls` files we emit.
//!
//! Each record is `[id: u16][len: u16][payload]`, little endian. Payloads are
//! capped at 8224 bytes; the shared string table spills into CONTINUE records.

use crate::utils::error::{Result, WorkflowError};
use std::collections::HashMap;
use std::io::{Cursor, Write};

pub const RECORD_BOF: u16 = 0x0809;
pub const RECORD_EOF: u16 = 0x000A;
pub const RECORD_CODEPAGE: u16 = 0x0042;
pub const RECORD_DATEMODE: u16 = 0x0022;
pub const RECORD_WINDOW1: u16 = 0x003D;
pub const RECORD_FONT: u16 = 0x0031;
pub const RECORD_FORMAT: u16 = 0x041E;
pub const RECORD_XF: u16 = 0x00E0;
pub const RECORD_STYLE: u16 = 0x0293;
pub const RECORD_BOUNDSHEET: u16 = 0x0085;
pub const RECORD_SST: u16 = 0x00FC;
pub const RECORD_CONTINUE: u16 = 0x003C;
pub const RECORD_DIMENSIONS: u16 = 0x0200;
pub const RECORD_WINDOW2: u16 = 0x023E;
pub const RECORD_BLANK: u16 = 0x0201;
pub const RECORD_NUMBER: u16 = 0x0203;
pub const RECORD_LABELSST: u16 = 0x00FD;

pub const MAX_RECORD_DATA: usize = 8224;
pub const MAX_ROWS: usize = 65_536;
pub const MAX_COLUMNS: usize = 256;
pub const MAX_CELL_CHARS: usize = 32_767;

const BOF_VERSION_BIFF8: u16 = 0x0600;
pub const BOF_DT_WORKBOOK_GLOBALS: u16 = 0x0005;
pub const BOF_DT_WORKSHEET: u16 = 0x0010;

const CODEPAGE_UTF16: u16 = 0x04B0;
const COLOR_AUTOMATIC: u16 = 0x7FFF;
const XF_FLAG_LOCKED: u16 = 0x0001;
const XF_FLAG_STYLE: u16 = 0x0004;

/// Custom number formats start at this index; lower ones are built in.
pub const FIRST_CUSTOM_FORMAT: u16 = 164;
/// Excel expects 15 style XFs before the first cell XF.
pub const XF_GENERAL: u16 = 15;
pub const XF_DATE: u16 = 16;

/// Excel refuses a Workbook stream that lives in the OLE mini stream.
const MIN_WORKBOOK_STREAM: usize = 4096;

#[derive(Debug, Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn push(&mut self, id: u16, data: &[u8]) -> Result<()> {
        if data.len() > MAX_RECORD_DATA {
            return Err(WorkflowError::SerializationError {
                message: format!(
                    "record 0x{:04X} payload of {} bytes exceeds the BIFF8 limit",
                    id,
                    data.len()
                ),
            });
        }
        self.buf.extend_from_slice(&id.to_le_bytes());
        self.buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Overwrites four bytes at `offset`, used to back-patch stream positions.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn extend(&mut self, other: RecordWriter) {
        self.buf.extend_from_slice(&other.buf);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub fn bof(dt: u16) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..2].copy_from_slice(&BOF_VERSION_BIFF8.to_le_bytes());
    out[2..4].copy_from_slice(&dt.to_le_bytes());
    out[4..6].copy_from_slice(&0x0DBBu16.to_le_bytes()); // build
    out[6..8].copy_from_slice(&0x07CCu16.to_le_bytes()); // year
    out[12..16].copy_from_slice(&0x0006u32.to_le_bytes()); // lowest BIFF version
    out
}

pub fn codepage() -> [u8; 2] {
    CODEPAGE_UTF16.to_le_bytes()
}

/// 1900 date system.
pub fn datemode() -> [u8; 2] {
    0u16.to_le_bytes()
}

pub fn window1() -> [u8; 18] {
    let mut out = [0u8; 18];
    out[4..6].copy_from_slice(&0x3000u16.to_le_bytes()); // width
    out[6..8].copy_from_slice(&0x1E00u16.to_le_bytes()); // height
    out[8..10].copy_from_slice(&0x0038u16.to_le_bytes()); // scroll bars + tabs
    out[14..16].copy_from_slice(&1u16.to_le_bytes()); // selected tabs
    out[16..18].copy_from_slice(&600u16.to_le_bytes()); // tab ratio
    out
}

pub fn font(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&200u16.to_le_bytes()); // 10pt in twips
    out.extend_from_slice(&0u16.to_le_bytes()); // no italic/strike
    out.extend_from_slice(&COLOR_AUTOMATIC.to_le_bytes());
    out.extend_from_slice(&400u16.to_le_bytes()); // normal weight
    out.extend_from_slice(&0u16.to_le_bytes()); // escapement
    out.extend_from_slice(&[0, 0, 0, 0]); // underline, family, charset, reserved
    write_short_unicode_string(&mut out, name);
    out
}

pub fn format_record(index: u16, code: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&index.to_le_bytes());
    write_unicode_string(&mut out, code);
    out
}

pub fn xf_record(font_idx: u16, fmt_idx: u16, is_style_xf: bool) -> [u8; 20] {
    let mut out = [0u8; 20];
    out[0..2].copy_from_slice(&font_idx.to_le_bytes());
    out[2..4].copy_from_slice(&fmt_idx.to_le_bytes());
    let flags = if is_style_xf {
        XF_FLAG_LOCKED | XF_FLAG_STYLE | 0xFFF0 // style XFs have no parent
    } else {
        XF_FLAG_LOCKED
    };
    out[4..6].copy_from_slice(&flags.to_le_bytes());
    out[6] = 0x20; // general alignment, bottom
    out[9] = if is_style_xf { 0x00 } else { 0x3F };
    out[18..20].copy_from_slice(&0x20C0u16.to_le_bytes()); // default pattern colours
    out
}

/// Built-in "Normal" style bound to XF 0.
pub fn style_normal() -> [u8; 4] {
    let mut out = [0u8; 4];
    out[0..2].copy_from_slice(&0x8000u16.to_le_bytes());
    out[2] = 0x00; // Normal
    out[3] = 0xFF;
    out
}

/// BOUNDSHEET with a zero stream position; the caller patches it later.
pub fn boundsheet(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // visible worksheet
    let name: String = name.chars().take(31).collect();
    write_short_unicode_string(&mut out, &name);
    out
}

pub fn dimensions(rows: u32, cols: u16) -> [u8; 14] {
    let mut out = [0u8; 14];
    out[4..8].copy_from_slice(&rows.to_le_bytes());
    out[10..12].copy_from_slice(&cols.to_le_bytes());
    out
}

pub fn window2() -> [u8; 18] {
    let mut out = [0u8; 18];
    // gridlines, headings, zeros, default header colour, outline symbols, selected, active
    out[0..2].copy_from_slice(&0x06B6u16.to_le_bytes());
    out[6..8].copy_from_slice(&0x0040u16.to_le_bytes());
    out
}

pub fn number_cell(row: u16, col: u16, xf: u16, value: f64) -> [u8; 14] {
    let mut out = [0u8; 14];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&col.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out[6..14].copy_from_slice(&value.to_le_bytes());
    out
}

pub fn labelsst_cell(row: u16, col: u16, xf: u16, sst_index: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&col.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out[6..10].copy_from_slice(&sst_index.to_le_bytes());
    out
}

pub fn blank_cell(row: u16, col: u16, xf: u16) -> [u8; 6] {
    let mut out = [0u8; 6];
    out[0..2].copy_from_slice(&row.to_le_bytes());
    out[2..4].copy_from_slice(&col.to_le_bytes());
    out[4..6].copy_from_slice(&xf.to_le_bytes());
    out
}

/// String characters as they are stored: one byte each when ASCII, else UTF-16LE.
fn encode_chars(s: &str) -> (u8, Vec<u8>, usize) {
    if s.is_ascii() {
        (0x00, s.as_bytes().to_vec(), s.len())
    } else {
        let units: Vec<u16> = s.encode_utf16().collect();
        let bytes = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        (0x01, bytes, units.len())
    }
}

fn write_short_unicode_string(out: &mut Vec<u8>, s: &str) {
    let (flags, bytes, cch) = encode_chars(s);
    out.push(cch.min(u8::MAX as usize) as u8);
    out.push(flags);
    let width = if flags == 0x01 { 2 } else { 1 };
    out.extend_from_slice(&bytes[..cch.min(u8::MAX as usize) * width]);
}

fn write_unicode_string(out: &mut Vec<u8>, s: &str) {
    let (flags, bytes, cch) = encode_chars(s);
    out.extend_from_slice(&(cch.min(u16::MAX as usize) as u16).to_le_bytes());
    out.push(flags);
    out.extend_from_slice(&bytes);
}

/// Shared string table in first-use order, with the total reference count.
#[derive(Debug, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    index: HashMap<String, u32>,
    total: u32,
}

impl SharedStrings {
    pub fn intern(&mut self, s: &str) -> Result<u32> {
        let chars = s.encode_utf16().count();
        if chars > MAX_CELL_CHARS {
            return Err(WorkflowError::SerializationError {
                message: format!(
                    "text of {} characters exceeds the {} character cell limit",
                    chars, MAX_CELL_CHARS
                ),
            });
        }

        self.total += 1;
        if let Some(&i) = self.index.get(s) {
            return Ok(i);
        }
        let i = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        Ok(i)
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn unique(&self) -> usize {
        self.strings.len()
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Writes SST plus as many CONTINUE records as needed. A string header never
    /// straddles a record; character data may, and then the continuation starts
    /// with the string's encoding flag. UTF-16 units are never split.
    pub fn write_to(&self, writer: &mut RecordWriter) -> Result<()> {
        let mut record_id = RECORD_SST;
        let mut payload: Vec<u8> = Vec::with_capacity(MAX_RECORD_DATA);
        payload.extend_from_slice(&self.total.to_le_bytes());
        payload.extend_from_slice(&(self.strings.len() as u32).to_le_bytes());

        for s in &self.strings {
            let (flags, bytes, cch) = encode_chars(s);
            let width = if flags == 0x01 { 2 } else { 1 };

            if MAX_RECORD_DATA - payload.len() < 3 + width {
                writer.push(record_id, &payload)?;
                record_id = RECORD_CONTINUE;
                payload.clear();
            }
            payload.extend_from_slice(&(cch as u16).to_le_bytes());
            payload.push(flags);

            let mut rest = bytes.as_slice();
            while !rest.is_empty() {
                let room = (MAX_RECORD_DATA - payload.len()) / width * width;
                if room == 0 {
                    writer.push(record_id, &payload)?;
                    record_id = RECORD_CONTINUE;
                    payload.clear();
                    payload.push(flags);
                    continue;
                }
                let take = room.min(rest.len());
                payload.extend_from_slice(&rest[..take]);
                rest = &rest[take..];
            }
        }

        writer.push(record_id, &payload)
    }
}

/// Wraps a finished Workbook stream in an OLE compound file.
pub fn into_compound_file(mut workbook_stream: Vec<u8>) -> Result<Vec<u8>> {
    if workbook_stream.len() < MIN_WORKBOOK_STREAM {
        workbook_stream.resize(MIN_WORKBOOK_STREAM, 0);
    }

    // version 3, 512-byte sectors
    let mut ole =
        cfb::CompoundFile::create_with_version(cfb::Version::V3, Cursor::new(Vec::new()))?;
    {
        let mut stream = ole.create_stream("Workbook")?;
        stream.write_all(&workbook_stream)?;
        stream.flush()?;
    }
    ole.flush()?;
    Ok(ole.into_inner().into_inner())
}
