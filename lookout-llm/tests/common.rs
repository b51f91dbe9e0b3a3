use lookout_common::observability::{LogConfig, LogFormat, init_logging};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Route client events into a scratch log dir once per test binary.
///
/// `LOOKOUT_TEST_LOG=json` switches the encoding; any value mirrors events
/// to stderr so `cargo test -- --nocapture` shows them.
#[allow(dead_code)]
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let requested = std::env::var("LOOKOUT_TEST_LOG").ok();
        let format = requested
            .as_deref()
            .and_then(|raw| raw.parse::<LogFormat>().ok())
            .unwrap_or_default();

        let config = LogConfig {
            app_name: "lookout-llm-tests",
            log_dir: Some(std::env::temp_dir().join("lookout-llm-tests")),
            emit_stderr: requested.is_some(),
            format,
            default_filter: "lookout_llm=debug,lookout_http=debug,warn",
        };
        if let Err(e) = init_logging(config) {
            eprintln!("test tracing unavailable: {e:#}");
        }
    });
}
