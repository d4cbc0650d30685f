mod report;
mod run;

pub use report::{
    DurationRow, clear, collect_durations, durations, render_durations, select_durations, show,
    show_config,
};
pub use run::{
    BatchSummary, ItemResult, PlanItem, ProgramFailed, default_identity, format_item,
    format_outcome, format_summary, load_plan, run_batch, run_command, run_program,
};
