use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: usize,
    pub score: u64,
    pub max_tile: u32,
    pub store_len: usize,
    pub last_loss: Option<f32>,
}

/// CSV sink with one row per finished episode.
pub struct EpisodeLog {
    writer: csv::Writer<File>
}

impl EpisodeLog {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { writer: csv::Writer::from_path(path)? })
    }

    pub fn record(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.writer.serialize(summary)?;
        // rows survive an interrupted run
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.csv");

        let mut log = EpisodeLog::create(&path).unwrap();
        log.record(&EpisodeSummary { episode: 1, steps: 120, score: 1024, max_tile: 128, store_len: 90, last_loss: None }).unwrap();
        log.record(&EpisodeSummary { episode: 2, steps: 80, score: 512, max_tile: 64, store_len: 150, last_loss: Some(0.5) }).unwrap();
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "episode,steps,score,max_tile,store_len,last_loss");
        assert_eq!(lines[1], "1,120,1024,128,90,");
        assert_eq!(lines[2], "2,80,512,64,150,0.5");
    }
}
