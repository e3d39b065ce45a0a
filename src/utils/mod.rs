pub mod readers;

pub use readers::{GroupedAlignmentReader, ReadGroup};

pub type Result<T, E = String> = std::result::Result<T, E>;

pub fn handle_error_and_exit(err: String) -> ! {
    log::error!("{}", err);
    std::process::exit(1);
}
