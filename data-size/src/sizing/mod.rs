mod prefix;
mod table;
mod vectors;

pub use prefix::scan_prefix;
pub use table::{estimate_record_size, scan_table};
pub use vectors::{
    classify, count_combined_vectors, count_jsonl_vectors, estimate_vectors, size_per_vector,
    VectorFormat, COMBINED_OUTPUT_FIELD, COMBINED_OUTPUT_SUFFIX,
};
