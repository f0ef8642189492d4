pub mod fake_gemini;
pub mod fake_relay;
pub mod fake_resend;
pub mod fake_turnstile;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/// Installs a terminal logger for tests. Repeated calls are harmless.
pub fn setup_logging() {
    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}
