use std::collections::BTreeMap;
use std::path::Path;

use mx86_types::Inst;
use thiserror::Error;

use crate::flat_memory::FlatMemory;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed memory map at line {line}: {text}")]
    BadMemoryMapLine { line: usize, text: String },
    #[error("memory map is missing a {0} region")]
    MissingRegion(&'static str),
    #[error("failed to decode the instruction stream: {0}")]
    BadInstructionStream(String),
    #[error("malformed instructions-map line {line}: {text}")]
    BadInstructionsMapLine { line: usize, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegionKind {
    Text,
    Rom,
    Ram,
    Stack,
}

#[derive(Debug, Clone, Copy)]
struct RegionEntry {
    kind: RegionKind,
    start: u32,
    size: u32,
}

/// Parsed memory-map file: one line per region, `KIND START_HEX SIZE_HEX`.
/// `#`-prefixed and blank lines are ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    text: Option<(u32, u32)>,
    rom: Option<(u32, u32)>,
    ram: Option<(u32, u32)>,
    stack: Option<(u32, u32)>,
}

pub fn parse_memory_map(contents: &str) -> Result<MemoryMap, LoaderError> {
    let mut map = MemoryMap::default();
    for (line_no, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [kind_str, start_str, size_str] = fields[..] else {
            return Err(LoaderError::BadMemoryMapLine { line: line_no + 1, text: raw_line.to_string() });
        };
        let kind = match kind_str.to_ascii_uppercase().as_str() {
            "TEXT" => RegionKind::Text,
            "ROM" => RegionKind::Rom,
            "RAM" => RegionKind::Ram,
            "STACK" => RegionKind::Stack,
            _ => return Err(LoaderError::BadMemoryMapLine { line: line_no + 1, text: raw_line.to_string() }),
        };
        let start = parse_hex(start_str)
            .ok_or_else(|| LoaderError::BadMemoryMapLine { line: line_no + 1, text: raw_line.to_string() })?;
        let size = parse_hex(size_str)
            .ok_or_else(|| LoaderError::BadMemoryMapLine { line: line_no + 1, text: raw_line.to_string() })?;
        let entry = RegionEntry { kind, start, size };
        match entry.kind {
            RegionKind::Text => map.text = Some((entry.start, entry.size)),
            RegionKind::Rom => map.rom = Some((entry.start, entry.size)),
            RegionKind::Ram => map.ram = Some((entry.start, entry.size)),
            RegionKind::Stack => map.stack = Some((entry.start, entry.size)),
        }
    }
    Ok(map)
}

fn parse_hex(field: &str) -> Option<u32> {
    let field = field.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(field, 16).ok()
}

/// Decode a packed little-endian stream of `Inst` records.
pub fn decode_instructions(bytes: &[u8]) -> Result<Vec<Inst>, LoaderError> {
    let mut cursor = std::io::Cursor::new(bytes);
    let mut instructions = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        let inst: Inst = bincode::deserialize_from(&mut cursor)
            .map_err(|e| LoaderError::BadInstructionStream(e.to_string()))?;
        instructions.push(inst);
    }
    Ok(instructions)
}

/// `HEXADDRESS,HEXINDEX` per line — the on-disk field order used by the
/// original comparator tool's parser, the reverse of the glossary's prose
/// description (see DESIGN.md's Open Question resolution).
pub fn parse_instructions_map(contents: &str) -> Result<BTreeMap<u32, u32>, LoaderError> {
    let mut map = BTreeMap::new();
    for (line_no, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, ',');
        let (addr_str, index_str) = match (parts.next(), parts.next()) {
            (Some(a), Some(i)) => (a, i),
            _ => return Err(LoaderError::BadInstructionsMapLine { line: line_no + 1, text: raw_line.to_string() }),
        };
        let address = parse_hex(addr_str.trim())
            .ok_or_else(|| LoaderError::BadInstructionsMapLine { line: line_no + 1, text: raw_line.to_string() })?;
        let index = parse_hex(index_str.trim())
            .ok_or_else(|| LoaderError::BadInstructionsMapLine { line: line_no + 1, text: raw_line.to_string() })?;
        map.insert(index, address);
    }
    Ok(map)
}

fn read_to_string(path: &Path) -> Result<String, LoaderError> {
    std::fs::read_to_string(path).map_err(|source| LoaderError::Io { path: path.display().to_string(), source })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, LoaderError> {
    std::fs::read(path).map_err(|source| LoaderError::Io { path: path.display().to_string(), source })
}

/// Load a complete `FlatMemory` from the three on-disk files named in the
/// memory-map format: region layout, ROM/RAM contents, and the packed
/// instruction stream.
pub fn load_program(
    memory_map_path: &Path,
    memory_contents_path: &Path,
    instructions_path: &Path,
) -> Result<FlatMemory, LoaderError> {
    let map = parse_memory_map(&read_to_string(memory_map_path)?)?;
    let (text_pos, _) = map.text.ok_or(LoaderError::MissingRegion("TEXT"))?;
    let (rom_pos, rom_size) = map.rom.ok_or(LoaderError::MissingRegion("ROM"))?;
    let (ram_pos, ram_size) = map.ram.ok_or(LoaderError::MissingRegion("RAM"))?;
    let (stack_pos, stack_size) = map.stack.ok_or(LoaderError::MissingRegion("STACK"))?;

    let contents = read_bytes(memory_contents_path)?;
    let (rom_bytes, ram_bytes) = contents.split_at(contents.len().min(rom_size as usize));
    let mut rom = rom_bytes.to_vec();
    rom.resize(rom_size as usize, 0);
    let mut ram = ram_bytes.to_vec();
    ram.resize(ram_size as usize, 0);

    let instructions = decode_instructions(&read_bytes(instructions_path)?)?;

    Ok(FlatMemory::new(text_pos, instructions, rom_pos, rom, ram_pos, ram, stack_pos, stack_size))
}
