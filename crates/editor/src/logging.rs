use std::any::Any;
use std::backtrace::Backtrace;
use std::panic;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const LOG_FILE: &str = "hexed.log";

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join(LOG_FILE)
}

/// Message carried by a panic payload, `panic!` produces either a `&str` or
/// a `String`
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown cause"
    }
}

/// Log to `log_file` and log panics before they take the process down.
pub fn setup(log_file: &Path, debug: bool) -> anyhow::Result<()> {
    panic::set_hook(Box::new(|info| {
        let msg = panic_message(info.payload());
        match info.location() {
            Some(loc) => log::error!("Panicked at {loc}: {msg}"),
            None => log::error!("Panicked: {msg}"),
        }
        log::error!("{}", Backtrace::capture());
        log::logger().flush();
        eprintln!("hexed: {msg}");
    }));

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{l} {d(%H:%M:%S.%3f)} {f}:{L} {m}{n}",
        )))
        .build(log_file)?;

    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let config = Config::builder()
        .appender(Appender::builder().build("file-appender", Box::new(file_appender)))
        .build(Root::builder().appender("file-appender").build(level))?;

    let _handle = log4rs::init_config(config)?;
    Ok(())
}
