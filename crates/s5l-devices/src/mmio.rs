use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use memory::MmioHandler;

/// A register block mapped at a fixed base in the SoC address space.
///
/// The composer maps `size()` bytes of the device and calls [`MappedDevice::reset`] on every
/// machine reset, in construction order.
pub trait MappedDevice: MmioHandler {
    fn name(&self) -> &str;
    fn size(&self) -> u64;
    /// Restore every modeled register to its power-on value.
    fn reset(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
        })
    }
}

/// One access to an offset the device does not model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnimplementedAccess {
    pub device: Arc<str>,
    /// Architectural register name, when the offset is documented but not modeled.
    pub register: Option<&'static str>,
    pub offset: u64,
    pub size: usize,
    pub kind: AccessKind,
    /// Written value, `None` for reads.
    pub value: Option<u64>,
}

/// Diagnostic channel for unmodeled register accesses.
///
/// Reporting is never an error: the access has already been answered with zero (read) or dropped
/// (write) by the time the sink sees it.
pub trait UnimpSink: Send + Sync {
    fn record(&self, access: &UnimplementedAccess);
}

pub type SharedUnimpSink = Arc<dyn UnimpSink>;

/// Emits every unimplemented access as a `tracing` event on the `unimp` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUnimpSink;

impl TracingUnimpSink {
    pub fn shared() -> SharedUnimpSink {
        Arc::new(Self)
    }
}

impl UnimpSink for TracingUnimpSink {
    fn record(&self, access: &UnimplementedAccess) {
        match (access.kind, access.value) {
            (AccessKind::Write, Some(value)) => tracing::debug!(
                target: "unimp",
                device = %access.device,
                register = access.register,
                offset = %format_args!("0x{:08x}", access.offset),
                size = access.size,
                value = %format_args!("0x{value:x}"),
                "unimplemented write"
            ),
            _ => tracing::debug!(
                target: "unimp",
                device = %access.device,
                register = access.register,
                offset = %format_args!("0x{:08x}", access.offset),
                size = access.size,
                "unimplemented {}",
                access.kind
            ),
        }
    }
}

/// Sink that keeps every reported access in memory.
#[derive(Debug, Default)]
pub struct UnimpLog {
    entries: Mutex<Vec<UnimplementedAccess>>,
}

impl UnimpLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<UnimplementedAccess> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<UnimplementedAccess> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UnimplementedAccess>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnimpSink for UnimpLog {
    fn record(&self, access: &UnimplementedAccess) {
        self.lock().push(access.clone());
    }
}

/// Per-device front end to an [`UnimpSink`]: answers the access with the safe default and reports
/// it.
#[derive(Clone)]
pub(crate) struct UnimpReporter {
    device: Arc<str>,
    sink: SharedUnimpSink,
}

impl fmt::Debug for UnimpReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnimpReporter")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl UnimpReporter {
    pub(crate) fn new(device: impl Into<Arc<str>>, sink: SharedUnimpSink) -> Self {
        Self {
            device: device.into(),
            sink,
        }
    }

    pub(crate) fn device(&self) -> &str {
        &self.device
    }

    pub(crate) fn read(&self, register: Option<&'static str>, offset: u64, size: usize) -> u64 {
        self.sink.record(&UnimplementedAccess {
            device: Arc::clone(&self.device),
            register,
            offset,
            size,
            kind: AccessKind::Read,
            value: None,
        });
        0
    }

    pub(crate) fn write(
        &self,
        register: Option<&'static str>,
        offset: u64,
        size: usize,
        value: u64,
    ) {
        self.sink.record(&UnimplementedAccess {
            device: Arc::clone(&self.device),
            register,
            offset,
            size,
            kind: AccessKind::Write,
            value: Some(value),
        });
    }
}

/// Truncate a register value to an access of `size` bytes.
pub fn truncate(value: u64, size: usize) -> u64 {
    match size {
        0 => 0,
        n if n >= 8 => value,
        n => value & ((1u64 << (n * 8)) - 1),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(level: tracing::Level, f: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn truncate_keeps_only_the_accessed_bytes() {
        assert_eq!(truncate(0x8FFF_FFFF, 1), 0xFF);
        assert_eq!(truncate(0x8FFF_FFFF, 2), 0xFFFF);
        assert_eq!(truncate(0x8FFF_FFFF, 4), 0x8FFF_FFFF);
        assert_eq!(truncate(u64::MAX, 8), u64::MAX);
        assert_eq!(truncate(u64::MAX, 0), 0);
    }

    #[test]
    fn reporter_answers_zero_and_records_both_directions() {
        let log = UnimpLog::new();
        let reporter = UnimpReporter::new("spi0", log.clone());

        assert_eq!(reporter.read(None, 0x10, 4), 0);
        reporter.write(Some("CTRL"), 0x0, 2, 0xbeef);

        assert_eq!(
            log.take(),
            vec![
                UnimplementedAccess {
                    device: "spi0".into(),
                    register: None,
                    offset: 0x10,
                    size: 4,
                    kind: AccessKind::Read,
                    value: None,
                },
                UnimplementedAccess {
                    device: "spi0".into(),
                    register: Some("CTRL"),
                    offset: 0,
                    size: 2,
                    kind: AccessKind::Write,
                    value: Some(0xbeef),
                },
            ]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn tracing_sink_logs_on_the_unimp_target_at_debug() {
        let out = capture(tracing::Level::DEBUG, || {
            let reporter = UnimpReporter::new("uart0", TracingUnimpSink::shared());
            reporter.write(None, 0x20, 4, 0x41);
            reporter.read(Some("UTRSTAT"), 0x10, 4);
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2, "{out}");

        let write = lines[0];
        assert!(write.contains("DEBUG"), "{write}");
        assert!(write.contains("unimp:"), "{write}");
        assert!(write.contains("unimplemented write"), "{write}");
        assert!(write.contains("device=uart0"), "{write}");
        assert!(write.contains("offset=0x00000020"), "{write}");
        assert!(write.contains("size=4"), "{write}");
        assert!(write.contains("value=0x41"), "{write}");

        let read = lines[1];
        assert!(read.contains("unimp:"), "{read}");
        assert!(read.contains("unimplemented read"), "{read}");
        assert!(read.contains("register=") && read.contains("UTRSTAT"), "{read}");
        assert!(read.contains("offset=0x00000010"), "{read}");
        assert!(!read.contains("value="), "{read}");
    }

    #[test]
    fn tracing_sink_is_silent_above_debug() {
        let out = capture(tracing::Level::INFO, || {
            UnimpReporter::new("uart0", TracingUnimpSink::shared()).write(None, 0, 4, 1);
        });
        assert!(out.is_empty(), "{out}");
    }
}
