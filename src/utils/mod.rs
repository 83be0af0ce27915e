pub mod clock;
pub mod deduplication;
pub mod format;
pub mod time;
pub mod timeline;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deduplication::filter_duplicate_records;
pub use format::{calculate_change, format_price, format_volume, week52_stats, Week52Stats};
pub use time::market_date;
pub use timeline::TimelineOption;
