pub mod document;
pub mod experiment;

pub use document::{DocumentSource, LabDocument, SKELETON_SECTIONS};
pub use experiment::{
    docx_file_name, docx_path, markdown_file_name, markdown_path, parse_range, parse_selection,
    ExperimentItem, ExperimentList,
};
