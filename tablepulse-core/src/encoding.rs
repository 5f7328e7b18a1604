use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use std::io::Read;
use std::path::Path;
use tablepulse_common::Result;

/// How much of a file is sniffed before picking a charset.
pub const ENCODING_SAMPLE_BYTES: usize = 10_000;

/// Best-effort charset detection. The guess can be wrong on short or
/// ambiguous samples; decode failures downstream are handled per file.
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    detector.guess(None, true)
}

/// Sniff the leading bytes of `path` and detect its encoding.
pub fn sniff_encoding(path: &Path) -> Result<&'static Encoding> {
    let mut file = std::fs::File::open(path)?;
    let mut sample = vec![0u8; ENCODING_SAMPLE_BYTES];
    let mut filled = 0;
    while filled < sample.len() {
        let n = file.read(&mut sample[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(detect_encoding(&sample[..filled]))
}

/// Wrap `reader` so the stream comes out as UTF-8 regardless of the
/// source encoding.
pub fn decoding_reader<R: Read>(reader: R, encoding: &'static Encoding) -> DecodeReaderBytes<R, Vec<u8>> {
    DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(reader)
}
