use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use tracing::warn;

/// Charset of a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Latin1 => "ISO-8859-1",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "utf-16" | "utf-16le" => Ok(Encoding::Utf16Le),
            "utf-16be" => Ok(Encoding::Utf16Be),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            other => Err(format!("unsupported encoding '{other}'")),
        }
    }
}

/// Reads `path` and decodes it with `encoding`. A byte order mark is
/// dropped. Malformed UTF-8 is replaced rather than rejected.
pub fn read_source(path: &Path, encoding: Encoding) -> anyhow::Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read source file: {}", path.display()))?;
    Ok(match encoding {
        Encoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(&bytes);
            match std::str::from_utf8(bytes) {
                Ok(text) => text.to_string(),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "Invalid UTF-8 in source");
                    String::from_utf8_lossy(bytes).into_owned()
                }
            }
        }
        Encoding::Utf16Le | Encoding::Utf16Be => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if encoding == Encoding::Utf16Le {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    }
                })
                .collect();
            let units = units.strip_prefix(&[0xfeff]).unwrap_or(&units);
            String::from_utf16_lossy(units)
        }
        Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
    })
}
