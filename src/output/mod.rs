//! Output formatting.
//!
//! - [`terminal`] - VM lists, rule dumps and run summaries

mod terminal;

pub use terminal::{
    format_field, print_rules, print_rules_header, print_summary, print_vm_list, rule_lines,
    summary_lines, vm_list_lines,
};
