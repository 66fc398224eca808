use core::fmt::Write;

use heapless::String;

use crate::config::{SAMPLE_QUEUE_DEPTH, TELEMETRY_BATCH};
use crate::error::{HwError, TaskFault};
use crate::hal::SerialTx;
use crate::scheduler::Task;
use crate::share::Queue;
use crate::state::TelemetryRecord;

/// Longest formatted record: two signed numbers, a comma and CRLF.
pub const LINE_CAPACITY: usize = 48;

/// Format one record as it goes on the wire: `"<position>,<value>\r\n"` for a
/// sample, the marker byte alone for an end record.
pub fn format_record(record: TelemetryRecord, line: &mut String<LINE_CAPACITY>) -> Result<(), HwError> {
    line.clear();
    match record {
        TelemetryRecord::Sample { position, value } => {
            write!(line, "{},{}\r\n", position, value).map_err(|_| HwError::Serial)
        }
        TelemetryRecord::End(marker) => line.push(marker as char).map_err(|_| HwError::Serial),
    }
}

/// Drains the sample queue onto a serial link, a bounded batch per tick.
pub struct TelemetryTask<'a, W: SerialTx> {
    serial: W,
    samples: &'a Queue<TelemetryRecord, SAMPLE_QUEUE_DEPTH>,
    line: String<LINE_CAPACITY>,
    written: u32,
}

impl<'a, W: SerialTx> TelemetryTask<'a, W> {
    pub fn new(serial: W, samples: &'a Queue<TelemetryRecord, SAMPLE_QUEUE_DEPTH>) -> Self {
        Self {
            serial,
            samples,
            line: String::new(),
            written: 0,
        }
    }

    /// Records written since start.
    pub fn written(&self) -> u32 {
        self.written
    }

    pub fn serial(&self) -> &W {
        &self.serial
    }
}

impl<'a, W: SerialTx> Task for TelemetryTask<'a, W> {
    fn step(&mut self, _now_ms: u64) -> Result<&'static str, TaskFault> {
        let mut sent = 0;
        while sent < TELEMETRY_BATCH {
            let Some(record) = self.samples.try_get() else {
                break;
            };
            format_record(record, &mut self.line)?;
            self.serial.write_all(self.line.as_bytes())?;
            sent += 1;
        }
        self.written += sent as u32;
        Ok(if sent == 0 { "idle" } else { "streaming" })
    }
}
