//! Chrome Trace ("flame style") span profiling.
//!
//! Feature-gated with `--features profiling`; every function below is a
//! no-op otherwise.
//!
//! Usage:
//!
//! ```ignore
//! corral::profiling::profiler::init("profile/trace.json");
//! {
//!     let _g = corral::profiling::profiler::span("Schedule::execute");
//!     // run the schedule...
//! }
//! corral::profiling::profiler::shutdown();
//! ```
//!
//! The output loads in Perfetto or `chrome://tracing`.

use std::path::Path;

/// Argument value attached to a span.
///
/// Serialised into the `args` object of the emitted trace event.
pub enum Arg {
    /// UTF-8 string value.
    Str(String),
    /// Unsigned 64-bit integer value.
    U64(u64),
    /// Signed 64-bit integer value.
    I64(i64),
    /// 64-bit floating-point value.
    F64(f64),
    /// Boolean value.
    Bool(bool),
}

#[cfg(feature = "profiling")]
mod enabled {
    use std::fs::File;
    use std::io::{BufWriter, Write};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, OnceLock};
    use std::time::Instant;

    use super::*;

    struct Event {
        name: &'static str,
        ts_us: u64,
        dur_us: u64,
        tid: u64,
        args: Vec<(&'static str, Arg)>,
    }

    struct State {
        start: Instant,
        out_path: PathBuf,
        accepting: AtomicBool,
        events: Mutex<Vec<Event>>,
    }

    static STATE: OnceLock<State> = OnceLock::new();
    static NEXT_TID: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static TID: u64 = NEXT_TID.fetch_add(1, Ordering::Relaxed);
    }

    /// Initialises the profiler; spans recorded before this are dropped.
    pub fn init<P: AsRef<Path>>(path: P) {
        let _ = STATE.set(State {
            start: Instant::now(),
            out_path: path.as_ref().to_path_buf(),
            accepting: AtomicBool::new(true),
            events: Mutex::new(Vec::new()),
        });
    }

    /// Stops recording and writes the collected trace.
    pub fn shutdown() {
        let Some(state) = STATE.get() else { return };
        state.accepting.store(false, Ordering::Release);
        if let Err(error) = write_trace(state) {
            eprintln!("profiler: failed to write trace: {error}");
        }
    }

    /// Opens a span; it closes (and records) when the guard drops.
    pub fn span(name: &'static str) -> SpanGuard {
        let Some(state) = STATE.get() else {
            return SpanGuard::disabled();
        };
        if !state.accepting.load(Ordering::Acquire) {
            return SpanGuard::disabled();
        }
        SpanGuard {
            name,
            ts_us: Some(state.start.elapsed().as_micros() as u64),
            args: Vec::new(),
        }
    }

    /// RAII guard recording one complete trace event on drop.
    pub struct SpanGuard {
        name: &'static str,
        ts_us: Option<u64>,
        args: Vec<(&'static str, Arg)>,
    }

    impl SpanGuard {
        fn disabled() -> Self {
            Self {
                name: "",
                ts_us: None,
                args: Vec::new(),
            }
        }

        /// Attaches an argument to this span (builder style).
        pub fn arg(mut self, key: &'static str, value: Arg) -> Self {
            if self.ts_us.is_some() {
                self.args.push((key, value));
            }
            self
        }
    }

    impl Drop for SpanGuard {
        fn drop(&mut self) {
            let Some(ts_us) = self.ts_us else { return };
            let Some(state) = STATE.get() else { return };
            let dur_us = (state.start.elapsed().as_micros() as u64).saturating_sub(ts_us);
            let event = Event {
                name: self.name,
                ts_us,
                dur_us,
                tid: TID.with(|tid| *tid),
                args: std::mem::take(&mut self.args),
            };
            let mut events = state.events.lock().unwrap_or_else(|e| e.into_inner());
            events.push(event);
        }
    }

    fn write_trace(state: &State) -> std::io::Result<()> {
        let events = {
            let mut guard = state.events.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        if let Some(parent) = state.out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&state.out_path)?);

        write!(out, "{{\"traceEvents\":[")?;
        for (i, event) in events.iter().enumerate() {
            if i > 0 {
                write!(out, ",")?;
            }
            write!(out, "{{\"name\":")?;
            write_json_str(&mut out, event.name)?;
            write!(
                out,
                ",\"cat\":\"ecs\",\"ph\":\"X\",\"ts\":{},\"dur\":{},\"pid\":1,\"tid\":{}",
                event.ts_us, event.dur_us, event.tid
            )?;
            if !event.args.is_empty() {
                write!(out, ",\"args\":{{")?;
                for (j, (key, value)) in event.args.iter().enumerate() {
                    if j > 0 {
                        write!(out, ",")?;
                    }
                    write_json_str(&mut out, key)?;
                    write!(out, ":")?;
                    write_arg(&mut out, value)?;
                }
                write!(out, "}}")?;
            }
            write!(out, "}}")?;
        }
        write!(out, "]}}")?;
        out.flush()
    }

    fn write_arg<W: Write>(out: &mut W, value: &Arg) -> std::io::Result<()> {
        match value {
            Arg::Str(s) => write_json_str(out, s),
            Arg::U64(v) => write!(out, "{v}"),
            Arg::I64(v) => write!(out, "{v}"),
            Arg::F64(v) => {
                if v.is_finite() {
                    write!(out, "{v}")
                } else {
                    write_json_str(out, &format!("{v}"))
                }
            }
            Arg::Bool(v) => write!(out, "{v}"),
        }
    }

    fn write_json_str<W: Write>(out: &mut W, s: &str) -> std::io::Result<()> {
        write!(out, "\"")?;
        for ch in s.chars() {
            match ch {
                '"' => write!(out, "\\\"")?,
                '\\' => write!(out, "\\\\")?,
                '\n' => write!(out, "\\n")?,
                '\r' => write!(out, "\\r")?,
                '\t' => write!(out, "\\t")?,
                c if c.is_control() => write!(out, "\\u{:04x}", c as u32)?,
                c => write!(out, "{c}")?,
            }
        }
        write!(out, "\"")
    }
}

#[cfg(not(feature = "profiling"))]
mod disabled {
    use super::*;

    /// Initialises the profiler (no-op without the `profiling` feature).
    #[inline]
    pub fn init<P: AsRef<Path>>(_path: P) {}

    /// Writes the collected trace (no-op).
    #[inline]
    pub fn shutdown() {}

    /// Opens a span (no-op).
    #[inline]
    pub fn span(_name: &'static str) -> SpanGuard {
        SpanGuard
    }

    /// No-op span guard.
    pub struct SpanGuard;

    impl SpanGuard {
        /// Attaches an argument to this span (no-op).
        #[inline]
        pub fn arg(self, _key: &'static str, _value: Arg) -> Self {
            self
        }
    }
}

#[cfg(feature = "profiling")]
pub use enabled::{init, shutdown, span, SpanGuard};

#[cfg(not(feature = "profiling"))]
pub use disabled::{init, shutdown, span, SpanGuard};
