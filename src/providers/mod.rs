pub mod cbr;
pub mod util;

pub use cbr::CbrRateSource;
pub use util::RetryPolicy;
