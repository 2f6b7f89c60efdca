//! CLI command implementations.

pub mod helpers;
pub mod key_results;
pub mod logs;
pub mod objectives;
pub mod stats;
pub mod sync;

pub use key_results::{run_kr_add, run_kr_delete, run_kr_edit};
pub use logs::{run_log_add, run_log_list};
pub use objectives::{
    run_objectives_add, run_objectives_delete, run_objectives_list, run_objectives_show,
    run_objectives_update,
};
pub use stats::run_stats;
pub use sync::run_sync;
