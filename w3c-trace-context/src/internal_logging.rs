//! Events emitted while headers are parsed, shortened or written.
//!
//! Every event has a dotted `name` such as `TraceState.Parse.DroppedMember`
//! and is recorded under the emitting package's target. The name is repeated
//! as a field because `tracing`'s fmt layer does not print event names yet
//! (<https://github.com/tokio-rs/tracing/issues/2774>).
//!
//! With `internal-logs` disabled the macros expand to nothing observable. In
//! unit tests the event is also printed, which shows up with `--nocapture`.

/// Shared expansion of [`tc_debug!`] and [`tc_warn!`]. `$level` names the
/// `tracing` macro to forward to.
#[doc(hidden)]
#[macro_export]
macro_rules! __tc_event {
    ($level:ident, $name:expr $(, $key:ident = $value:expr)*) => {{
        #[cfg(feature = "internal-logs")]
        {
            $crate::_private::$level!(
                name: $name,
                target: env!("CARGO_PKG_NAME"),
                name = $name
                $(, $key = $value)*
            );
        }

        #[cfg(test)]
        {
            print!("{}: name={}", stringify!($level), $name);
            $(print!(", {}={}", stringify!($key), $value);)*
            println!();
        }

        #[cfg(all(not(feature = "internal-logs"), not(test)))]
        {
            let _ = ($name $(, $value)*);
        }
    }};
}

/// Records a debug event, e.g. a header member that was dropped.
///
/// ```rust
/// use w3c_trace_context::tc_debug;
/// tc_debug!(name: "TraceState.Parse.DroppedMember", reason = "invalid key", member = "Foo=bar");
/// ```
#[macro_export]
macro_rules! tc_debug {
    (name: $name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__tc_event!(debug, $name $(, $key = $value)*)
    };
}

/// Records a warning, e.g. a header a carrier could not store.
///
/// ```rust
/// use w3c_trace_context::tc_warn;
/// tc_warn!(name: "HeaderInjector.InvalidValue", header = "tracestate");
/// ```
#[macro_export]
macro_rules! tc_warn {
    (name: $name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::__tc_event!(warn, $name $(, $key = $value)*)
    };
}
