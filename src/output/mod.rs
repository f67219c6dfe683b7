pub mod formatter;

pub use formatter::{
    format_age, format_ingest_report, format_partition, format_ranked_table, format_score_detail,
    format_tsv, should_use_colors,
};
