//! Minimal wasm binary reader: header check and export table.
//!
//! Only the export section is decoded; every other section is skipped by
//! its declared size.

use crate::error::ModuleError;

pub const WASM_MAGIC: [u8; 4] = *b"\0asm";
pub const WASM_VERSION: u32 = 1;

const EXPORT_SECTION_ID: u8 = 7;

/// What an export refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Function,
    Table,
    Memory,
    Global,
    Tag,
    Unknown(u8),
}

impl ExportKind {
    const fn from_byte(b: u8) -> Self {
        match b {
            0 => Self::Function,
            1 => Self::Table,
            2 => Self::Memory,
            3 => Self::Global,
            4 => Self::Tag,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
    pub index: u32,
}

/// What the loader knows about a module before running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleManifest {
    pub size: usize,
    pub version: u32,
    pub exports: Vec<Export>,
}

impl ModuleManifest {
    /// Read the header and export table of a wasm binary.
    ///
    /// # Errors
    /// Returns a [`ModuleError`] describing the first structural problem found.
    pub fn parse(bytes: &[u8]) -> Result<Self, ModuleError> {
        let mut reader = Reader::new(bytes);
        let magic = reader.take(4, "magic")?;
        if magic != WASM_MAGIC {
            return Err(ModuleError::BadMagic);
        }
        let version_bytes = reader.take(4, "version")?;
        let version = u32::from_le_bytes([
            version_bytes[0],
            version_bytes[1],
            version_bytes[2],
            version_bytes[3],
        ]);
        if version != WASM_VERSION {
            return Err(ModuleError::UnsupportedVersion(version));
        }

        let mut exports = Vec::new();
        while !reader.is_empty() {
            let id = reader.byte("section id")?;
            let size = reader.leb_u32("section size")? as usize;
            let start = reader.pos;
            let body = reader.take(size, "section body")?;
            if id == EXPORT_SECTION_ID {
                exports.extend(parse_exports(body, start)?);
            }
        }

        Ok(Self {
            size: bytes.len(),
            version,
            exports,
        })
    }

    /// The exported function called `name`, if any.
    pub fn function(&self, name: &str) -> Option<&Export> {
        self.exports
            .iter()
            .find(|e| e.kind == ExportKind::Function && e.name == name)
    }

    /// Like [`ModuleManifest::function`] but a missing entry is an error.
    ///
    /// # Errors
    /// Returns [`ModuleError::MissingEntry`] if no function export matches.
    pub fn require_entry(&self, name: &str) -> Result<&Export, ModuleError> {
        self.function(name)
            .ok_or_else(|| ModuleError::MissingEntry(name.to_string()))
    }
}

fn parse_exports(body: &[u8], base: usize) -> Result<Vec<Export>, ModuleError> {
    let mut reader = Reader::with_base(body, base);
    let count = reader.leb_u32("export count")?;
    let mut exports = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let len = reader.leb_u32("export name length")? as usize;
        let at = reader.offset();
        let raw = reader.take(len, "export name")?;
        let name = std::str::from_utf8(raw)
            .map_err(|_| ModuleError::InvalidUtf8(at))?
            .to_string();
        let kind = ExportKind::from_byte(reader.byte("export kind")?);
        let index = reader.leb_u32("export index")?;
        exports.push(Export { name, kind, index });
    }
    if !reader.is_empty() {
        return Err(ModuleError::Malformed {
            offset: reader.offset(),
            what: "export section (trailing bytes)",
        });
    }
    Ok(exports)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self::with_base(bytes, 0)
    }

    const fn with_base(bytes: &'a [u8], base: usize) -> Self {
        Self {
            bytes,
            pos: 0,
            base,
        }
    }

    const fn offset(&self) -> usize {
        self.base + self.pos
    }

    const fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn byte(&mut self, what: &'static str) -> Result<u8, ModuleError> {
        let b = *self.bytes.get(self.pos).ok_or(ModuleError::Truncated {
            offset: self.offset(),
            what,
        })?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], ModuleError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ModuleError::Truncated {
                offset: self.offset(),
                what,
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Unsigned LEB128, at most five bytes.
    fn leb_u32(&mut self, what: &'static str) -> Result<u32, ModuleError> {
        let start = self.offset();
        let mut result: u32 = 0;
        for shift in (0..35).step_by(7) {
            let b = self.byte(what)?;
            let low = u32::from(b & 0x7f);
            if shift == 28 && low > 0x0f {
                return Err(ModuleError::Malformed {
                    offset: start,
                    what,
                });
            }
            result |= low << shift;
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(ModuleError::Malformed {
            offset: start,
            what,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leb(mut value: usize, out: &mut Vec<u8>) {
        loop {
            let mut b = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                b |= 0x80;
            }
            out.push(b);
            if value == 0 {
                break;
            }
        }
    }

    fn section(id: u8, body: &[u8], out: &mut Vec<u8>) {
        out.push(id);
        leb(body.len(), out);
        out.extend_from_slice(body);
    }

    fn module(exports: &[(&str, u8)]) -> Vec<u8> {
        let mut body = Vec::new();
        leb(exports.len(), &mut body);
        for (i, (name, kind)) in exports.iter().enumerate() {
            leb(name.len(), &mut body);
            body.extend_from_slice(name.as_bytes());
            body.push(*kind);
            leb(i, &mut body);
        }
        let mut out = WASM_MAGIC.to_vec();
        out.extend_from_slice(&WASM_VERSION.to_le_bytes());
        section(0, b"\x04namexyz", &mut out);
        section(EXPORT_SECTION_ID, &body, &mut out);
        out
    }

    #[test]
    fn test_parse_reads_function_exports() {
        let bytes = module(&[("memory", 2), ("run_app", 0), ("__wbindgen_malloc", 0)]);
        let manifest = ModuleManifest::parse(&bytes).unwrap();
        assert_eq!(manifest.size, bytes.len());
        assert_eq!(manifest.exports.len(), 3);
        let entry = manifest.require_entry("run_app").unwrap();
        assert_eq!(entry.index, 1);
        assert_eq!(entry.kind, ExportKind::Function);
    }

    #[test]
    fn test_memory_export_does_not_count_as_entry() {
        let bytes = module(&[("run_app", 2)]);
        let manifest = ModuleManifest::parse(&bytes).unwrap();
        assert!(matches!(
            manifest.require_entry("run_app"),
            Err(ModuleError::MissingEntry(name)) if name == "run_app"
        ));
    }

    #[test]
    fn test_header_only_module_has_no_exports() {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&WASM_VERSION.to_le_bytes());
        let manifest = ModuleManifest::parse(&bytes).unwrap();
        assert!(manifest.exports.is_empty());
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let err = ModuleManifest::parse(b"\x7fELF\x01\x00\x00\x00").unwrap_err();
        assert!(matches!(err, ModuleError::BadMagic));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        let err = ModuleManifest::parse(&bytes).unwrap_err();
        assert!(matches!(err, ModuleError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_short_file_is_truncated() {
        let err = ModuleManifest::parse(b"\0as").unwrap_err();
        assert!(matches!(err, ModuleError::Truncated { what: "magic", .. }));
    }

    #[test]
    fn test_section_longer_than_file_is_truncated() {
        let mut bytes = module(&[("run_app", 0)]);
        bytes.truncate(bytes.len() - 2);
        let err = ModuleManifest::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::Truncated {
                what: "section body",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_export_name() {
        let mut body = Vec::new();
        leb(1, &mut body);
        leb(2, &mut body);
        body.extend_from_slice(&[0xff, 0xfe]);
        body.push(0);
        leb(0, &mut body);
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&WASM_VERSION.to_le_bytes());
        section(EXPORT_SECTION_ID, &body, &mut bytes);
        let err = ModuleManifest::parse(&bytes).unwrap_err();
        assert!(matches!(err, ModuleError::InvalidUtf8(_)));
    }

    #[test]
    fn test_overlong_leb_is_malformed() {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend_from_slice(&WASM_VERSION.to_le_bytes());
        bytes.push(EXPORT_SECTION_ID);
        bytes.extend_from_slice(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        let err = ModuleManifest::parse(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::Malformed {
                what: "section size",
                ..
            }
        ));
    }
}
