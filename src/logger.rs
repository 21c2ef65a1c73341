use simplelog::{ConfigBuilder, LevelFilter, SimpleLogger};

/// Route `log` output to the terminal. Only this crate's records are shown so
/// HTTP client chatter stays out of the kitchen prompt.
pub fn init(verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("kitchen_copilot")
        .set_time_level(LevelFilter::Off)
        .build();
    let _ = SimpleLogger::init(level, config);
}
