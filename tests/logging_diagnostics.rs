//! Confirms status-change logging actually reaches a subscriber, by
//! installing a real `tracing_subscriber::fmt` subscriber over a capturing
//! writer instead of just trusting the `tracing::warn!`/`info!` call sites
//! are reachable.

use std::sync::{Arc, Mutex};

use opendaq_core::component::{StatusValue, COMPONENT_STATUS_KEY};
use opendaq_core::prelude::*;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
struct CapturingWriter(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturingWriter {
    type Writer = CapturingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture(f: impl FnOnce()) -> String {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(CapturingWriter(buffer.clone()))
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    String::from_utf8(buffer.lock().unwrap().clone()).unwrap()
}

#[test]
fn a_non_ok_status_change_logs_a_warning_with_the_status_and_message() {
    let signal = Signal::new("v0", None).unwrap();
    let owner = signal.clone() as Arc<dyn Component>;

    let output = capture(|| {
        owner
            .status_container()
            .set(&owner, COMPONENT_STATUS_KEY, StatusValue::new("Error").with_message("sensor disconnected"))
            .unwrap();
    });

    assert!(output.contains("opendaq.status"), "log line must carry the status target, got: {output}");
    assert!(output.contains("status changed"));
    assert!(output.contains("sensor disconnected"));
}

#[test]
fn an_ok_status_change_logs_at_info_not_warn() {
    let signal = Signal::new("v0", None).unwrap();
    let owner = signal.clone() as Arc<dyn Component>;
    owner
        .status_container()
        .set(&owner, COMPONENT_STATUS_KEY, StatusValue::new("Error").with_message("broken"))
        .unwrap();

    let output = capture(|| {
        owner.status_container().set(&owner, COMPONENT_STATUS_KEY, StatusValue::ok()).unwrap();
    });

    assert!(output.contains("INFO"));
    assert!(!output.contains("WARN"));
}
