//! Volume loading.
//!
//! [`VolumeLoader`] is the seam between the session driver and file formats.
//! [`NrrdLoader`] reads the NRRD files the batch mode consumes by default.

use std::io::Read;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::GzDecoder;
use glam::Vec3;

use crate::error::LoadError;
use crate::volume::Volume;

/// Turns a file into a [`Volume`].
pub trait VolumeLoader {
    /// File extensions (without the dot) this loader understands.
    fn supported_extensions(&self) -> &[&'static str];

    /// Returns whether `path` has one of the supported extensions.
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.supported_extensions()
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(ext))
            })
    }

    /// Loads the volume stored at `path`.
    fn load(&self, path: &Path) -> Result<Volume, LoadError>;

    /// Loader name for log messages.
    fn name(&self) -> &'static str;
}

/// Loader for NRRD (`NRRD0001`..`NRRD0005`) files with attached or detached data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NrrdLoader;

impl VolumeLoader for NrrdLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["nrrd", "nhdr"]
    }

    fn load(&self, path: &Path) -> Result<Volume, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let volume = self.parse_bytes(path, &bytes)?;
        log::debug!(
            "{}: loaded {:?} voxels from {}",
            self.name(),
            volume.dimensions(),
            path.display()
        );
        Ok(volume)
    }

    fn name(&self) -> &'static str {
        "nrrd"
    }
}

impl NrrdLoader {
    /// Parses an in-memory NRRD file. `path` names the file in errors and
    /// anchors relative detached data files.
    pub fn parse_bytes(&self, path: &Path, bytes: &[u8]) -> Result<Volume, LoadError> {
        let malformed = |reason: String| LoadError::Malformed {
            path: path.to_path_buf(),
            reason,
        };
        let unsupported = |reason: String| LoadError::Unsupported {
            path: path.to_path_buf(),
            reason,
        };

        let (header_bytes, attached) = split_header(bytes);
        let header_text = std::str::from_utf8(header_bytes)
            .map_err(|_| malformed("header is not valid ASCII".to_string()))?;
        let header = Header::parse(header_text).map_err(|e| e.into_load_error(path))?;

        let element_count = header
            .sizes
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| malformed(format!("sizes {:?} overflow the voxel count", header.sizes)))?;
        let expected_bytes = element_count
            .checked_mul(header.element_type.size())
            .ok_or_else(|| malformed(format!("{element_count} voxels overflow the payload size")))?;

        let raw = match &header.data_file {
            Some(name) => {
                if name.contains('%') || name.starts_with("LIST") {
                    return Err(unsupported(format!("multi-file data '{name}'")));
                }
                let data_path = resolve_data_file(path, name);
                std::fs::read(&data_path).map_err(|source| LoadError::Io {
                    path: data_path,
                    source,
                })?
            }
            None => attached.to_vec(),
        };

        let samples = match header.encoding {
            Encoding::Ascii => decode_ascii(&raw, element_count).map_err(malformed)?,
            Encoding::Raw | Encoding::Gzip => {
                let payload = if header.encoding == Encoding::Gzip {
                    let mut out = Vec::new();
                    GzDecoder::new(raw.as_slice())
                        .read_to_end(&mut out)
                        .map_err(|e| malformed(format!("gzip payload: {e}")))?;
                    out
                } else {
                    raw
                };

                let payload = skip_bytes(&payload, header.byte_skip, expected_bytes)
                    .map_err(malformed)?;
                if payload.len() < expected_bytes {
                    return Err(malformed(format!(
                        "payload holds {} bytes, expected {expected_bytes}",
                        payload.len()
                    )));
                }
                let payload = &payload[..expected_bytes];
                match header.endian {
                    Endian::Little => decode_binary::<LittleEndian>(payload, header.element_type),
                    Endian::Big => decode_binary::<BigEndian>(payload, header.element_type),
                }
            }
        };

        let [sx, sy, sz] = header.sizes;
        let [px, py, pz] = header.spacings;
        Volume::new([sz, sy, sx], [pz, py, px], samples)
            .map(|v| v.with_origin(header.origin))
            .map_err(|e| malformed(e.to_string()))
    }
}

fn resolve_data_file(header_path: &Path, name: &str) -> PathBuf {
    let data = Path::new(name);
    if data.is_absolute() {
        return data.to_path_buf();
    }
    header_path
        .parent()
        .map_or_else(|| data.to_path_buf(), |dir| dir.join(data))
}

/// Splits at the first empty line. A file without one is all header.
fn split_header(bytes: &[u8]) -> (&[u8], &[u8]) {
    let mut start = 0;
    while let Some(offset) = bytes[start..].iter().position(|&b| b == b'\n') {
        let end = start + offset;
        let line = &bytes[start..end];
        if line.is_empty() || line == b"\r" {
            return (&bytes[..start], &bytes[end + 1..]);
        }
        start = end + 1;
    }
    (bytes, &[])
}

fn skip_bytes(payload: &[u8], skip: i64, expected: usize) -> Result<&[u8], String> {
    match skip {
        // Data sits at the end of the payload.
        -1 => Ok(payload.get(payload.len().saturating_sub(expected)..).unwrap_or(payload)),
        n if n >= 0 => payload
            .get(n as usize..)
            .ok_or_else(|| format!("byte skip {n} exceeds payload of {} bytes", payload.len())),
        n => Err(format!("invalid byte skip {n}")),
    }
}

fn decode_ascii(raw: &[u8], count: usize) -> Result<Vec<f32>, String> {
    let text = std::str::from_utf8(raw).map_err(|_| "ascii payload is not text".to_string())?;
    let samples = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .take(count)
        .map(|t| t.parse::<f64>().map(|v| v as f32).map_err(|_| format!("bad sample '{t}'")))
        .collect::<Result<Vec<_>, _>>()?;
    if samples.len() < count {
        return Err(format!("payload holds {} samples, expected {count}", samples.len()));
    }
    Ok(samples)
}

fn decode_binary<B: ByteOrder>(payload: &[u8], element_type: ElementType) -> Vec<f32> {
    let size = element_type.size();
    payload
        .chunks_exact(size)
        .map(|c| match element_type {
            ElementType::I8 => f32::from(c[0] as i8),
            ElementType::U8 => f32::from(c[0]),
            ElementType::I16 => f32::from(B::read_i16(c)),
            ElementType::U16 => f32::from(B::read_u16(c)),
            ElementType::I32 => B::read_i32(c) as f32,
            ElementType::U32 => B::read_u32(c) as f32,
            ElementType::I64 => B::read_i64(c) as f32,
            ElementType::U64 => B::read_u64(c) as f32,
            ElementType::F32 => B::read_f32(c),
            ElementType::F64 => B::read_f64(c) as f32,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ElementType {
    fn parse(name: &str) -> Option<Self> {
        let ty = match name {
            "signed char" | "int8" | "int8_t" => Self::I8,
            "uchar" | "unsigned char" | "uint8" | "uint8_t" => Self::U8,
            "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
                Self::I16
            }
            "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => Self::U16,
            "int" | "signed int" | "int32" | "int32_t" => Self::I32,
            "uint" | "unsigned int" | "uint32" | "uint32_t" => Self::U32,
            "longlong" | "long long" | "long long int" | "signed long long"
            | "signed long long int" | "int64" | "int64_t" => Self::I64,
            "ulonglong" | "unsigned long long" | "unsigned long long int" | "uint64"
            | "uint64_t" => Self::U64,
            "float" => Self::F32,
            "double" => Self::F64,
            _ => return None,
        };
        Some(ty)
    }

    fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Gzip,
    Ascii,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endian {
    Little,
    Big,
}

enum HeaderError {
    Malformed(String),
    Unsupported(String),
}

impl HeaderError {
    fn into_load_error(self, path: &Path) -> LoadError {
        let path = path.to_path_buf();
        match self {
            HeaderError::Malformed(reason) => LoadError::Malformed { path, reason },
            HeaderError::Unsupported(reason) => LoadError::Unsupported { path, reason },
        }
    }
}

#[derive(Debug)]
struct Header {
    element_type: ElementType,
    /// Fastest axis first.
    sizes: [usize; 3],
    spacings: [f32; 3],
    origin: Vec3,
    encoding: Encoding,
    endian: Endian,
    byte_skip: i64,
    data_file: Option<String>,
}

impl Header {
    fn parse(text: &str) -> Result<Self, HeaderError> {
        use HeaderError::{Malformed, Unsupported};

        let mut lines = text.lines();
        let magic = lines.next().unwrap_or_default().trim();
        match magic.strip_prefix("NRRD000") {
            Some(v) if matches!(v, "1" | "2" | "3" | "4" | "5") => {}
            Some(v) => return Err(Unsupported(format!("NRRD version '{v}'"))),
            None => return Err(Malformed("missing NRRD magic".to_string())),
        }

        let mut element_type = None;
        let mut dimension = None;
        let mut sizes = None;
        let mut spacings = None;
        let mut origin = Vec3::ZERO;
        let mut encoding = None;
        let mut endian = None;
        let mut byte_skip = 0;
        let mut data_file = None;

        for line in lines {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') || line.contains(":=") {
                continue;
            }
            let Some((field, value)) = line.split_once(": ") else {
                return Err(Malformed(format!("bad header line '{line}'")));
            };
            let value = value.trim();

            match field.trim().to_ascii_lowercase().as_str() {
                "type" => {
                    element_type = Some(
                        ElementType::parse(value)
                            .ok_or_else(|| Unsupported(format!("sample type '{value}'")))?,
                    );
                }
                "dimension" => {
                    dimension = Some(
                        value
                            .parse::<usize>()
                            .map_err(|_| Malformed(format!("bad dimension '{value}'")))?,
                    );
                }
                "sizes" => sizes = Some(value),
                "spacings" => {
                    let s = parse_triple::<f32>(value, "spacings")?;
                    spacings = Some(s.map(|v| if v.is_nan() { 1.0 } else { v }));
                }
                "space directions" => spacings = Some(parse_directions(value)?),
                "space origin" => {
                    let [x, y, z] = parse_vector(value)?;
                    origin = Vec3::new(x, y, z);
                }
                "encoding" => {
                    encoding = Some(match value {
                        "raw" => Encoding::Raw,
                        "gzip" | "gz" => Encoding::Gzip,
                        "ascii" | "text" | "txt" => Encoding::Ascii,
                        other => return Err(Unsupported(format!("encoding '{other}'"))),
                    });
                }
                "endian" => {
                    endian = Some(match value {
                        "little" => Endian::Little,
                        "big" => Endian::Big,
                        other => return Err(Malformed(format!("bad endian '{other}'"))),
                    });
                }
                "byte skip" | "byteskip" => {
                    byte_skip = value
                        .parse()
                        .map_err(|_| Malformed(format!("bad byte skip '{value}'")))?;
                }
                "data file" | "datafile" => data_file = Some(value.to_string()),
                _ => {}
            }
        }

        let element_type = element_type.ok_or_else(|| Malformed("missing 'type'".to_string()))?;
        match dimension {
            Some(3) => {}
            Some(d) => return Err(Unsupported(format!("dimension {d}, only 3 is supported"))),
            None => return Err(Malformed("missing 'dimension'".to_string())),
        }
        let sizes = parse_triple::<usize>(
            sizes.ok_or_else(|| Malformed("missing 'sizes'".to_string()))?,
            "sizes",
        )?;
        let encoding = encoding.ok_or_else(|| Malformed("missing 'encoding'".to_string()))?;
        let endian = match endian {
            Some(e) => e,
            None if element_type.size() > 1 && encoding != Encoding::Ascii => {
                return Err(Malformed("missing 'endian'".to_string()));
            }
            None => Endian::Little,
        };

        Ok(Self {
            element_type,
            sizes,
            spacings: spacings.unwrap_or([1.0; 3]),
            origin,
            encoding,
            endian,
            byte_skip,
            data_file,
        })
    }
}

fn parse_triple<T: std::str::FromStr>(value: &str, field: &str) -> Result<[T; 3], HeaderError> {
    let parts: Vec<T> = value
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| HeaderError::Malformed(format!("bad {field} '{value}'")))?;
    <[T; 3]>::try_from(parts)
        .map_err(|_| HeaderError::Malformed(format!("{field} must have 3 entries, got '{value}'")))
}

/// Parses `(x,y,z)`.
fn parse_vector(value: &str) -> Result<[f32; 3], HeaderError> {
    let inner = value
        .trim()
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| HeaderError::Malformed(format!("bad vector '{value}'")))?;
    parse_triple(&inner.replace(',', " "), "vector")
}

/// Spacing per axis is the length of that axis' direction vector.
fn parse_directions(value: &str) -> Result<[f32; 3], HeaderError> {
    let vectors: Vec<&str> = value.split_whitespace().collect();
    if vectors.len() != 3 {
        return Err(HeaderError::Malformed(format!(
            "space directions must have 3 vectors, got '{value}'"
        )));
    }
    let mut spacings = [1.0; 3];
    for (spacing, vector) in spacings.iter_mut().zip(vectors) {
        if vector != "none" {
            *spacing = Vec3::from_array(parse_vector(vector)?).length();
        }
    }
    Ok(spacings)
}
