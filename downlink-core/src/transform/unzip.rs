use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use bytes::Bytes;
use zip::ZipArchive;

use super::Transform;
use crate::datasource::PipelineError;

/// Unpack a zip archive held in memory into a mapping of member name to
/// member content.  Directory entries are skipped.
///
/// Compose with [crate::metadata::keep_meta] to carry provenance of the
/// archive over to the extracted buffers.
#[derive(Debug, Clone, Default)]
pub struct UnzipBuffer;

impl UnzipBuffer {
    pub fn new() -> Self {
        UnzipBuffer
    }
}

impl Transform for UnzipBuffer {
    type Input = Bytes;
    type Output = BTreeMap<String, Bytes>;

    fn apply(&self, input: Self::Input) -> Result<Self::Output, PipelineError> {
        let mut archive = ZipArchive::new(Cursor::new(input.as_ref()))
            .map_err(|er| PipelineError::deserialize(er, "zip archive"))?;

        let mut files = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|er| PipelineError::deserialize(er, "zip archive entry"))?;
            if entry.is_dir() {
                continue;
            }
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut content)
                .map_err(|er| PipelineError::FatalIO(er.to_string()))?;
            files.insert(entry.name().to_string(), Bytes::from(content));
        }
        log::debug!("unpacked {} files from zip buffer", files.len());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn zip_fixture() -> Bytes {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file::<_, ()>("first.txt", FileOptions::default())
            .unwrap();
        writer.write_all(b"first content").unwrap();
        writer
            .start_file::<_, ()>("nested/second.txt", FileOptions::default())
            .unwrap();
        writer.write_all(b"second content").unwrap();
        let cursor = writer.finish().unwrap();
        Bytes::from(cursor.into_inner())
    }

    #[test]
    fn test_unzip_buffer() {
        let files = UnzipBuffer::new().apply(zip_fixture()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files["first.txt"].as_ref(), b"first content");
        assert_eq!(files["nested/second.txt"].as_ref(), b"second content");
    }

    #[test]
    fn test_unzip_rejects_garbage() {
        let result = UnzipBuffer::new().apply(Bytes::from_static(b"not a zip"));
        match result {
            Err(PipelineError::Deserialize { .. }) => {}
            other => panic!("expected a Deserialize error, got {:?}", other),
        }
    }

    #[test]
    fn test_unzip_keeps_metadata_when_lifted() {
        use crate::metadata::{keep_meta, Envelope, Metadata};
        use crate::transform::Transform;

        let transform = keep_meta(UnzipBuffer::new());
        let input = Envelope::with_meta(
            zip_fixture(),
            Metadata::new().with("source", "archive-17"),
        );
        let output = transform.apply(input).unwrap();
        assert_eq!(output.value().len(), 2);
        assert_eq!(
            output.metadata().get("source"),
            Some(&serde_json::json!("archive-17"))
        );
    }
}
