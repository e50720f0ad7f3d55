//! Lazy, batched access to the first worksheet of a spreadsheet.
//!
//! A producer thread parses the workbook and pushes row batches through a
//! bounded channel, so only a couple of batches exist in memory at once no
//! matter how large the sheet is. `.xlsx` files are streamed cell by cell;
//! other formats (`.xls`) go through calamine's whole-sheet reader, which the
//! 65 536-row limit of that format keeps bounded.

use super::IngestError;
use calamine::{open_workbook, open_workbook_auto, Data, DataRef, Reader, Xlsx};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread;

/// Batches buffered between the producer thread and the consumer.
const CHANNEL_DEPTH: usize = 2;

/// Raw cell content, before any normalisation.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Text rendering; whole numbers lose their `.0`.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&Data> for CellValue {
    fn from(value: &Data) -> Self {
        match value {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Text(b.to_string()),
            _ => CellValue::Empty,
        }
    }
}

impl From<&DataRef<'_>> for CellValue {
    fn from(value: &DataRef<'_>) -> Self {
        match value {
            DataRef::Int(i) => CellValue::Number(*i as f64),
            DataRef::Float(f) => CellValue::Number(*f),
            DataRef::String(s) => CellValue::Text(s.clone()),
            DataRef::SharedString(s) => CellValue::Text(s.to_string()),
            DataRef::Bool(b) => CellValue::Text(b.to_string()),
            _ => CellValue::Empty,
        }
    }
}

/// One data row. `cells[i]` belongs to header column `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// 1-based row number in the sheet.
    pub line: u32,
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn get(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Empty)
    }
}

#[derive(Debug)]
enum Chunk {
    SizeHint(u64),
    Header(Vec<String>),
    Rows(Vec<Row>),
    Failed(IngestError),
    Done,
}

/// Groups positioned cells into rows, the first non-empty row being the header.
struct RowAssembler {
    batch_rows: usize,
    header: Option<Vec<String>>,
    current_row: Option<u32>,
    current: Vec<(u32, CellValue)>,
    batch: Vec<Row>,
}

impl RowAssembler {
    fn new(batch_rows: usize) -> Self {
        RowAssembler {
            batch_rows: batch_rows.max(1),
            header: None,
            current_row: None,
            current: Vec::new(),
            batch: Vec::with_capacity(batch_rows.max(1)),
        }
    }

    fn push(&mut self, row: u32, col: u32, value: CellValue) -> Option<Chunk> {
        let mut ready = None;
        if self.current_row != Some(row) {
            ready = self.close_row();
            self.current_row = Some(row);
        }
        self.current.push((col, value));
        ready
    }

    fn close_row(&mut self) -> Option<Chunk> {
        let cells = std::mem::take(&mut self.current);
        let row = self.current_row?;
        if cells.iter().all(|(_, v)| v.is_blank()) {
            return None;
        }

        let Some(width) = self.header.as_ref().map(Vec::len) else {
            let width = cells.iter().map(|(c, _)| *c as usize + 1).max().unwrap_or(0);
            let mut names = vec![String::new(); width];
            for (col, value) in cells {
                names[col as usize] = value.to_text().trim().to_string();
            }
            self.header = Some(names.clone());
            return Some(Chunk::Header(names));
        };

        let mut values = vec![CellValue::Empty; width];
        for (col, value) in cells {
            if let Some(slot) = values.get_mut(col as usize) {
                *slot = value;
            }
        }
        self.batch.push(Row {
            line: row + 1,
            cells: values,
        });
        if self.batch.len() >= self.batch_rows {
            let full = std::mem::replace(&mut self.batch, Vec::with_capacity(self.batch_rows));
            Some(Chunk::Rows(full))
        } else {
            None
        }
    }

    fn finish(mut self) -> Vec<Chunk> {
        let mut out = Vec::new();
        if let Some(chunk) = self.close_row() {
            out.push(chunk);
        }
        if !self.batch.is_empty() {
            out.push(Chunk::Rows(std::mem::take(&mut self.batch)));
        }
        out
    }
}

enum Stop {
    Failed(IngestError),
    Disconnected,
}

impl From<IngestError> for Stop {
    fn from(err: IngestError) -> Self {
        Stop::Failed(err)
    }
}

fn malformed<E: std::fmt::Display>(err: E) -> IngestError {
    IngestError::MalformedInput(err.to_string())
}

fn emit(tx: &SyncSender<Chunk>, chunk: Chunk) -> Result<(), Stop> {
    tx.send(chunk).map_err(|_| Stop::Disconnected)
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false)
}

fn stream_xlsx(path: &Path, batch_rows: usize, tx: &SyncSender<Chunk>) -> Result<(), Stop> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(malformed)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::MalformedInput("workbook has no worksheets".to_string()))?;
    let mut cells = workbook.worksheet_cells_reader(&sheet).map_err(malformed)?;

    let mut assembler = RowAssembler::new(batch_rows);
    while let Some(cell) = cells.next_cell().map_err(malformed)? {
        let (row, col) = cell.get_position();
        if let Some(chunk) = assembler.push(row, col, CellValue::from(cell.get_value())) {
            emit(tx, chunk)?;
        }
    }
    for chunk in assembler.finish() {
        emit(tx, chunk)?;
    }
    Ok(())
}

fn load_workbook(path: &Path, batch_rows: usize, tx: &SyncSender<Chunk>) -> Result<(), Stop> {
    let mut workbook = open_workbook_auto(path).map_err(malformed)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IngestError::MalformedInput("workbook has no worksheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet).map_err(malformed)?;
    emit(tx, Chunk::SizeHint(range.height().saturating_sub(1) as u64))?;

    let (row0, col0) = range.start().unwrap_or((0, 0));
    let mut assembler = RowAssembler::new(batch_rows);
    for (r, row) in range.rows().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if let Some(chunk) =
                assembler.push(row0 + r as u32, col0 + c as u32, CellValue::from(value))
            {
                emit(tx, chunk)?;
            }
        }
    }
    for chunk in assembler.finish() {
        emit(tx, chunk)?;
    }
    Ok(())
}

fn produce(path: PathBuf, batch_rows: usize, tx: SyncSender<Chunk>) {
    let result = if is_xlsx(&path) {
        stream_xlsx(&path, batch_rows, &tx)
    } else {
        load_workbook(&path, batch_rows, &tx)
    };
    match result {
        Ok(()) => {
            let _ = tx.send(Chunk::Done);
        }
        Err(Stop::Failed(err)) => {
            let _ = tx.send(Chunk::Failed(err));
        }
        Err(Stop::Disconnected) => debug!("reader for {} abandoned by consumer", path.display()),
    }
}

/// Header plus a lazy, non-restartable sequence of row batches.
///
/// Iterating yields `Err` at most once, after which the sequence ends.
pub struct TabularReader {
    header: Vec<String>,
    size_hint: Option<u64>,
    rx: Receiver<Chunk>,
    finished: bool,
}

impl TabularReader {
    /// Opens `path` and waits until the header row has been read.
    pub fn open(path: &Path, batch_rows: usize) -> Result<Self, IngestError> {
        let (tx, rx) = sync_channel(CHANNEL_DEPTH);
        let owned = path.to_path_buf();
        thread::Builder::new()
            .name("sheet-reader".to_string())
            .spawn(move || produce(owned, batch_rows, tx))?;

        let mut size_hint = None;
        loop {
            match rx.recv() {
                Ok(Chunk::SizeHint(n)) => size_hint = Some(n),
                Ok(Chunk::Header(header)) => {
                    return Ok(TabularReader {
                        header,
                        size_hint,
                        rx,
                        finished: false,
                    })
                }
                Ok(Chunk::Done) => {
                    return Ok(TabularReader {
                        header: Vec::new(),
                        size_hint,
                        rx,
                        finished: true,
                    })
                }
                Ok(Chunk::Failed(err)) => return Err(err),
                Ok(Chunk::Rows(_)) | Err(_) => {
                    return Err(IngestError::MalformedInput(
                        "spreadsheet reader stopped before the header row".to_string(),
                    ))
                }
            }
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data row count when the format reports it up front.
    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }
}

impl Iterator for TabularReader {
    type Item = Result<Vec<Row>, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.rx.recv() {
                Ok(Chunk::Rows(rows)) => return Some(Ok(rows)),
                Ok(Chunk::SizeHint(_)) | Ok(Chunk::Header(_)) => continue,
                Ok(Chunk::Done) => {
                    self.finished = true;
                    return None;
                }
                Ok(Chunk::Failed(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                Err(_) => {
                    self.finished = true;
                    return Some(Err(IngestError::MalformedInput(
                        "spreadsheet reader stopped unexpectedly".to_string(),
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn assembler_uses_first_non_empty_row_as_header() {
        let mut asm = RowAssembler::new(10);
        assert!(asm.push(0, 0, CellValue::Empty).is_none());
        assert!(asm.push(1, 0, text(" MARKA ")).is_none());
        assert!(asm.push(1, 2, text("YIL")).is_none());
        match asm.push(2, 0, text("Toyota")) {
            Some(Chunk::Header(h)) => assert_eq!(h, vec!["MARKA", "", "YIL"]),
            other => panic!("expected header, got {other:?}"),
        }
        asm.push(2, 2, CellValue::Number(2024.0));
        asm.push(2, 7, text("beyond header"));
        let chunks = asm.finish();
        assert_eq!(chunks.len(), 1);
        match &chunks[0] {
            Chunk::Rows(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].line, 3);
                assert_eq!(rows[0].cells, vec![text("Toyota"), CellValue::Empty, CellValue::Number(2024.0)]);
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn assembler_emits_full_batches_and_skips_blank_rows() {
        let mut asm = RowAssembler::new(2);
        let mut emitted = Vec::new();
        asm.push(0, 0, text("A"));
        for r in 1..=5u32 {
            let value = if r == 3 { text("   ") } else { CellValue::Number(r as f64) };
            if let Some(chunk) = asm.push(r, 0, value) {
                emitted.push(chunk);
            }
        }
        emitted.extend(asm.finish());
        let sizes: Vec<usize> = emitted
            .iter()
            .filter_map(|c| match c {
                Chunk::Rows(rows) => Some(rows.len()),
                _ => None,
            })
            .collect();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(CellValue::Number(2024.0).to_text(), "2024");
        assert_eq!(CellValue::Number(2.5).to_text(), "2.5");
    }

    #[test]
    fn streams_an_xlsx_file_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, name) in ["MARKA", "MODEL", "YIL", "AXA"].iter().enumerate() {
            sheet.write_string(0, c as u16, *name).unwrap();
        }
        for r in 1..=5u32 {
            sheet.write_string(r, 0, "Fiat").unwrap();
            sheet.write_string(r, 1, "Egea").unwrap();
            sheet.write_number(r, 2, 2020.0 + r as f64).unwrap();
            sheet.write_number(r, 3, 1000.0 * r as f64).unwrap();
        }
        workbook.save(&path).unwrap();

        let reader = TabularReader::open(&path, 2).unwrap();
        assert_eq!(reader.header(), ["MARKA", "MODEL", "YIL", "AXA"]);
        let batches: Vec<Vec<Row>> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 2, 1]);
        assert_eq!(batches[2][0].get(3), &CellValue::Number(5000.0));
        assert_eq!(batches[0][0].get(0), &text("Fiat"));
    }

    #[test]
    fn corrupt_file_is_malformed_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();
        match TabularReader::open(&path, 10) {
            Err(IngestError::MalformedInput(_)) => {}
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("corrupt workbook was accepted"),
        }
    }
}
