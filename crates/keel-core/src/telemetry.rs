// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Best-effort JSONL diagnostics behind the `telemetry` feature.
// Manually formats JSON to avoid a non-deterministic serde_json dependency;
// never called on the hot path, never consulted by simulation logic.

/// Emits a soft warning as a JSON line on stdout.
///
/// Compiled to a no-op without the `telemetry` feature. I/O errors are
/// ignored; a peer that cannot log must still simulate identically.
#[cfg(feature = "telemetry")]
pub(crate) fn warn(kind: &str, detail: &str) {
    use std::io::Write as _;
    let mut out = std::io::stdout().lock();
    let _ = write!(
        out,
        r#"{{"level":"warn","kind":"{}","detail":"{}"}}"#,
        escape(kind),
        escape(detail)
    );
    let _ = out.write_all(b"\n");
}

#[cfg(not(feature = "telemetry"))]
pub(crate) fn warn(_kind: &str, _detail: &str) {}

#[cfg(feature = "telemetry")]
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
