use super::normalize::NormalizedRecord;
use super::IngestError;
use crate::store::OfferSink;
use log::info;

/// Buffers records and writes them to the sink in bulk.
///
/// Writes are strictly sequential. A failed write aborts the import; batches
/// already written stay written.
pub struct BatchWriter<'a, S: OfferSink + ?Sized> {
    sink: &'a S,
    threshold: usize,
    buffer: Vec<NormalizedRecord>,
    saved: u64,
}

impl<'a, S: OfferSink + ?Sized> BatchWriter<'a, S> {
    pub fn new(sink: &'a S, threshold: usize) -> Self {
        let threshold = threshold.max(1);
        BatchWriter {
            sink,
            threshold,
            buffer: Vec::with_capacity(threshold),
            saved: 0,
        }
    }

    /// Adds one record. Returns `Some(saved)` when this push triggered a flush.
    pub fn push(&mut self, record: NormalizedRecord) -> Result<Option<u64>, IngestError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.threshold {
            self.flush()?;
            return Ok(Some(self.saved));
        }
        Ok(None)
    }

    /// Records committed so far.
    pub fn saved(&self) -> u64 {
        self.saved
    }

    fn flush(&mut self) -> Result<(), IngestError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.threshold));
        let written = self.sink.bulk_insert(&batch)?;
        self.saved += written as u64;
        info!("saved batch of {} records ({} total)", written, self.saved);
        Ok(())
    }

    /// Writes whatever is left below the threshold and returns the final count.
    pub fn finish(mut self) -> Result<u64, IngestError> {
        self.flush()?;
        Ok(self.saved)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::StoreError;
    use std::sync::Mutex;

    /// Sink that records batch sizes and can be told to fail on the n-th write.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub batches: Mutex<Vec<usize>>,
        pub fail_on_write: Option<usize>,
    }

    impl OfferSink for RecordingSink {
        fn bulk_insert(&self, records: &[NormalizedRecord]) -> Result<usize, StoreError> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on_write == Some(batches.len() + 1) {
                return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            batches.push(records.len());
            Ok(records.len())
        }
    }

    pub(crate) fn sample(n: u64) -> NormalizedRecord {
        NormalizedRecord {
            brand: "Toyota".into(),
            model: format!("Model {n}"),
            year: "2024".into(),
            offers: [("AXA".to_string(), 100 + n)].into_iter().collect(),
        }
    }

    #[test]
    fn flushes_at_threshold_and_remainder_on_finish() {
        let sink = RecordingSink::default();
        let mut writer = BatchWriter::new(&sink, 3);
        let mut flushes = Vec::new();
        for n in 0..7 {
            if let Some(saved) = writer.push(sample(n)).unwrap() {
                flushes.push(saved);
            }
        }
        assert_eq!(flushes, vec![3, 6]);
        assert_eq!(*sink.batches.lock().unwrap(), vec![3, 3]);
        assert_eq!(writer.finish().unwrap(), 7);
        assert_eq!(*sink.batches.lock().unwrap(), vec![3, 3, 1]);
    }

    #[test]
    fn finish_with_empty_buffer_writes_nothing() {
        let sink = RecordingSink::default();
        let writer = BatchWriter::new(&sink, 2);
        assert_eq!(writer.finish().unwrap(), 0);
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_write_keeps_earlier_batches() {
        let sink = RecordingSink {
            fail_on_write: Some(2),
            ..Default::default()
        };
        let mut writer = BatchWriter::new(&sink, 2);
        writer.push(sample(0)).unwrap();
        writer.push(sample(1)).unwrap();
        writer.push(sample(2)).unwrap();
        let err = writer.push(sample(3)).unwrap_err();
        assert!(matches!(err, IngestError::Persistence(_)));
        assert_eq!(writer.saved(), 2);
        assert_eq!(*sink.batches.lock().unwrap(), vec![2]);
    }
}
