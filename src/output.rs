//! Output of processed records for the one-shot CLI.

use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info};

use crate::record::CanonicalRecord;
use crate::stats::BatchStats;

/// Logs batch statistics as pretty-printed JSON.
pub fn print_stats(stats: &BatchStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

/// Writes records as a pretty JSON array followed by a newline.
pub fn write_records<W: Write>(mut writer: W, records: &[CanonicalRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes records to `path`, replacing any existing file.
pub fn write_records_to_file(path: &str, records: &[CanonicalRecord]) -> Result<()> {
    debug!(path, count = records.len(), "Writing records");
    let file = File::create(path)?;
    write_records(BufWriter::new(file), records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::Path;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn sample() -> CanonicalRecord {
        CanonicalRecord {
            ordem: Some("A1".into()),
            linha: Some("474".into()),
            latitude: -22.9,
            longitude: -43.2,
            velocidade: 15,
            datahora_captura: "2023-11-14 19:13:20".into(),
            atraso_transmissao_segundos: None,
        }
    }

    #[test]
    fn test_print_stats_does_not_panic() {
        print_stats(&BatchStats::new()).unwrap();
    }

    #[test]
    fn test_write_records_emits_json_array() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[sample(), sample()]).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["ordem"], "A1");
        assert!(parsed[0]["atraso_transmissao_segundos"].is_null());
    }

    #[test]
    fn test_write_records_empty_is_empty_array() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().trim(), "[]");
    }

    #[test]
    fn test_write_records_to_file_replaces_content() {
        let path = temp_path("rio_bus_proxy_test_output.json");
        let _ = fs::remove_file(&path);

        write_records_to_file(&path, &[sample(), sample()]).unwrap();
        write_records_to_file(&path, &[sample()]).unwrap();

        assert!(Path::new(&path).exists());
        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);

        fs::remove_file(&path).unwrap();
    }
}
