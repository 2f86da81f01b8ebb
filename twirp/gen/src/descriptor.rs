//! Packing of the source descriptor into the generated file.
//!
//! The descriptor is embedded so servers can expose their schema at runtime.
//! Source locations and comments are stripped first; they are only useful to
//! the generator itself and make up most of the descriptor's size.

use std::io::Write as _;

use flate2::Compression;
use flate2::write::GzEncoder;
use prost::Message;
use prost_types::FileDescriptorProto;
use tracing::debug;

use crate::errors::GeneratorError;

/// Bytes rendered per line of the array literal.
const BYTES_PER_LINE: usize = 16;

/// A gzipped descriptor ready to be emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedDescriptor {
    /// Name of the static holding the bytes.
    pub var_name: String,
    pub compressed: Vec<u8>,
    /// Size of the encoded descriptor before compression.
    pub uncompressed_len: usize,
}

/// Name of the descriptor static for the `files_handled`-th file of a run.
///
/// The BLAKE3 digest of the file name keeps the name unique when several
/// generators embed descriptors into the same module.
pub fn descriptor_var_name(files_handled: usize, file_name: &str) -> String {
    let digest = blake3::hash(file_name.as_bytes()).to_hex().to_uppercase();
    format!("TWIRP_FILE_DESCRIPTOR_{}_SHA{}", files_handled, digest)
}

/// Strips `descriptor`, encodes it and gzips it at maximum compression.
///
/// ## Errors
///
/// Returns `GeneratorError::Io` if compression fails.
pub fn pack(
    descriptor: &FileDescriptorProto,
    files_handled: usize,
) -> Result<PackedDescriptor, GeneratorError> {
    let mut stripped = descriptor.clone();
    stripped.source_code_info = None;
    let encoded = stripped.encode_to_vec();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&encoded)?;
    let compressed = encoder.finish()?;

    debug!(
        file = descriptor.name(),
        compressed = compressed.len(),
        uncompressed = encoded.len(),
        "packed descriptor"
    );

    Ok(PackedDescriptor {
        var_name: descriptor_var_name(files_handled, descriptor.name()),
        compressed,
        uncompressed_len: encoded.len(),
    })
}

impl PackedDescriptor {
    /// Renders the static item, sixteen bytes per line.
    ///
    /// The layout is final; the result is emitted verbatim and skipped by the
    /// formatter.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "/// {} bytes of a gzipped FileDescriptorProto ({} bytes uncompressed)\n",
            self.compressed.len(),
            self.uncompressed_len
        ));
        out.push_str(&format!("static {}: &[u8] = &[\n", self.var_name));
        for chunk in self.compressed.chunks(BYTES_PER_LINE) {
            let line: Vec<String> = chunk.iter().map(|b| format!("0x{:02x},", b)).collect();
            out.push_str(&format!("    {}\n", line.join(" ")));
        }
        out.push_str("];\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::greeter_file;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn round_trip_drops_source_info_only() {
        let file = greeter_file();
        assert!(file.source_code_info.is_some());

        let packed = pack(&file, 0).unwrap();
        let decoded = FileDescriptorProto::decode(gunzip(&packed.compressed).as_slice()).unwrap();

        let mut expected = file.clone();
        expected.source_code_info = None;
        assert_eq!(decoded, expected);
        assert_eq!(decoded.encode_to_vec(), expected.encode_to_vec());
        assert_eq!(packed.uncompressed_len, expected.encoded_len());
    }

    #[test]
    fn var_name_depends_on_counter_and_file_name() {
        let a = descriptor_var_name(0, "greeter.proto");
        assert!(a.starts_with("TWIRP_FILE_DESCRIPTOR_0_SHA"));
        assert_eq!(a.len(), "TWIRP_FILE_DESCRIPTOR_0_SHA".len() + 64);
        assert_eq!(a, a.to_uppercase());

        assert_eq!(a, descriptor_var_name(0, "greeter.proto"));
        assert_ne!(a, descriptor_var_name(1, "greeter.proto"));
        assert_ne!(a, descriptor_var_name(0, "other.proto"));
    }

    #[test]
    fn packing_is_deterministic() {
        let file = greeter_file();
        assert_eq!(pack(&file, 3).unwrap(), pack(&file, 3).unwrap());
    }

    #[test]
    fn render_groups_sixteen_bytes_per_line() {
        let packed = PackedDescriptor {
            var_name: "X".to_string(),
            compressed: (0u8..20).collect(),
            uncompressed_len: 99,
        };
        let text = packed.render();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "/// 20 bytes of a gzipped FileDescriptorProto (99 bytes uncompressed)"
        );
        assert_eq!(lines[1], "static X: &[u8] = &[");
        assert_eq!(lines[2].matches("0x").count(), 16);
        assert_eq!(lines[3], "    0x10, 0x11, 0x12, 0x13,");
        assert_eq!(lines[4], "];");
        assert!(text.ends_with("];\n"));
        assert!(syn::parse_file(&text).is_ok());
    }

    #[test]
    fn render_of_an_exact_multiple_has_no_short_line() {
        let packed = PackedDescriptor {
            var_name: "Y".to_string(),
            compressed: vec![0xab; 32],
            uncompressed_len: 32,
        };
        let text = packed.render();

        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().skip(2).take(2).all(|l| l.matches("0xab,").count() == 16));
    }
}
