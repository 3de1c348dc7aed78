//! ITM-backed `log` backend.
//!
//! Records go to ITM stimulus port 0 as `[LEVEL target] message`. Read them
//! with any SWO viewer (e.g. `itmdump`).

use cortex_m::itm;
use cortex_m::peripheral::{itm::RegisterBlock, ITM};
use log::{Log, Metadata, Record, SetLoggerError};

use crate::config::LOG_LEVEL;
use crate::sync;

struct ItmLogger;

static LOGGER: ItmLogger = ItmLogger;

impl Log for ItmLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LOG_LEVEL
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        sync::critical_section(|_cs| {
            // SAFETY: ITM writes are serialized by the critical section and
            // stimulus port 0 is owned by this logger.
            let itm = unsafe { &mut *(ITM::PTR as *mut RegisterBlock) };
            itm::write_fmt(
                &mut itm.stim[0],
                format_args!("[{} {}] {}\n", record.level(), record.target(), record.args()),
            );
        });
    }

    fn flush(&self) {}
}

/// Install the ITM logger. Fails if a logger is already set.
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LOG_LEVEL);
    Ok(())
}
