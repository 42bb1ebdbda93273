use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::stdout;
use std::path::Path;

use tracing::dispatcher::Dispatch;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::Layer as TraceLayer;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::{Layer as LayerIntf, Registry};

use crate::config::{AppBasepathCfg, AppLogHandlerCfg, AppLoggerCfg, AppLoggingCfg};
use crate::constant::logging::{Destination as DstOption, Level as AppLogLevelInner};
use crate::AppLogAlias;

pub type AppLogLevel = AppLogLevelInner;
type DefaultHandler = (NonBlocking, tracing::Level, WorkerGuard);

/// Routes log events to per-module dispatchers. Each logger alias in the
/// config is a module path, e.g. `mrmilk_order::usecase::place_order`.
pub struct AppLogContext {
    _io_guards: Vec<WorkerGuard>,
    loggers: HashMap<AppLogAlias, Dispatch>,
}

// exposed because binaries and other crates expand `app_log_event` which
// refers to this macro through `$crate`
#[macro_export]
macro_rules! to_3rdparty_level {
    ($lvlin:expr) => {
        match $lvlin {
            $crate::logging::AppLogLevel::FATAL | $crate::logging::AppLogLevel::ERROR => {
                tracing::Level::ERROR
            }
            $crate::logging::AppLogLevel::WARNING => tracing::Level::WARN,
            $crate::logging::AppLogLevel::INFO => tracing::Level::INFO,
            $crate::logging::AppLogLevel::DEBUG => tracing::Level::DEBUG,
            $crate::logging::AppLogLevel::TRACE => tracing::Level::TRACE,
        }
    };
}

fn _gen_localfile_writer(basepath: &str, rpath: &str) -> (NonBlocking, WorkerGuard) {
    let mut fullpath = basepath.to_string();
    if !basepath.ends_with('/') && !rpath.starts_with('/') {
        fullpath += "/";
    }
    fullpath += rpath;
    let p = Path::new(&fullpath);
    let dir = p.parent().unwrap_or(Path::new("."));
    let fname_prefix = p.file_name().unwrap_or(OsStr::new("app.log"));
    let wr_dst = RollingFileAppender::new(Rotation::NEVER, dir, fname_prefix);
    tracing_appender::non_blocking(wr_dst)
}

fn _init_handler(basepath: &AppBasepathCfg, cfg: &AppLogHandlerCfg) -> DefaultHandler {
    let lvl = to_3rdparty_level!(&cfg.min_level);
    // the config loader rejects local-file handlers without path
    let (io_wr, guard) = match (&cfg.destination, cfg.path.as_ref()) {
        (DstOption::LOCALFS, Some(rpath)) => _gen_localfile_writer(&basepath.system, rpath),
        _others => tracing_appender::non_blocking(stdout()),
    };
    // the guard has to live as long as the writer, otherwise buffered
    // messages are lost
    (io_wr, lvl, guard)
}

fn _init_logger(cfg: &AppLoggerCfg, hdlrs: &HashMap<AppLogAlias, DefaultHandler>) -> Dispatch {
    let layers = cfg
        .handlers
        .iter()
        .filter_map(|alias| {
            let (wr_ptr, default_lvl, _guard) = hdlrs.get(alias)?;
            let lvl = cfg
                .level
                .as_ref()
                .map(|l| to_3rdparty_level!(l))
                .unwrap_or(*default_lvl);
            let layer = TraceLayer::new()
                .with_writer(wr_ptr.clone())
                .with_file(false) // to prevent full path exposed
                .with_line_number(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(LevelFilter::from_level(lvl));
            Some(layer)
        })
        .collect::<Vec<_>>();
    let subscriber = Registry::default().with(layers);
    Dispatch::new(subscriber)
}

impl AppLogContext {
    pub fn new(basepath: &AppBasepathCfg, cfg: &AppLoggingCfg) -> Self {
        let hdlrs: HashMap<AppLogAlias, DefaultHandler> = cfg
            .handlers
            .iter()
            .map(|item| (item.alias.clone(), _init_handler(basepath, item)))
            .collect();
        let loggers = cfg
            .loggers
            .iter()
            .map(|item| (item.alias.clone(), _init_logger(item, &hdlrs)))
            .collect();
        Self {
            loggers,
            _io_guards: hdlrs.into_values().map(|(_, _, g)| g).collect(),
        }
    }

    pub fn get_assigner(&self, key: &str) -> Option<&Dispatch> {
        self.loggers.get(&key.to_string())
    }
} // end of impl AppLogContext

#[macro_export]
macro_rules! app_log_event {
    ( $ctx:ident, $lvl:expr, $($arg:tt)+ ) => {{
        const MOD_PATH:&str = module_path!();
        if let Some(assigner) = $ctx.get_assigner(MOD_PATH) {
            const LVL_INNER: tracing::Level = $crate::logging::to_3rdparty_level!($lvl);
            tracing::dispatcher::with_default(assigner, || {
                tracing::event!(LVL_INNER, $($arg)+);
            });
        } else {
            println!("[WARN] log dispatcher not found at the module path: {}", MOD_PATH);
            println!($($arg)+);
        }
    }};
}

pub use app_log_event;
pub use to_3rdparty_level;
